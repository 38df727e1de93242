//! The movie catalog: movies, users, tokens and the HTTP handlers serving them.
//!
//! [`Catalog`] bundles the stores, the mailer and the background task manager, and builds
//! the axum router for the `/v1` resources. Authentication of bearer tokens happens in the
//! server's middleware through [`Catalog::authenticate`]; handlers only check permissions.

#![deny(missing_docs)]

mod error;
mod extract;
pub mod filters;
mod handlers;
pub mod mailer;
pub mod movies;
pub mod permissions;
pub mod store;
pub mod tokens;
pub mod users;
pub mod validator;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};
use background::BackgroundTaskManager;
use config::{AuthConfig, MailerConfig};
use jiff::Timestamp;

pub use error::ApiError;
use mailer::{LogMailer, Mailer};
use permissions::Principal;
use store::{
    MovieStore, PermissionStore, TokenStore, UserStore,
    memory::{InMemoryMovieStore, InMemoryPermissionStore, InMemoryTokenStore, InMemoryUserStore},
};
use tokens::Scope;
use users::User;
use validator::Validator;

/// Shared state of the catalog handlers. Cloning is cheap.
#[derive(Clone)]
pub struct Catalog {
    inner: Arc<Inner>,
}

struct Inner {
    movies: Arc<dyn MovieStore>,
    users: Arc<dyn UserStore>,
    tokens: Arc<dyn TokenStore>,
    permissions: Arc<dyn PermissionStore>,
    mailer: Arc<dyn Mailer>,
    tasks: BackgroundTaskManager,
    auth: AuthConfig,
}

impl Catalog {
    /// Starts building a catalog whose background work runs on `tasks`.
    pub fn builder(tasks: BackgroundTaskManager) -> CatalogBuilder {
        CatalogBuilder {
            tasks,
            auth: AuthConfig::default(),
            mailer: None,
        }
    }

    /// Routes for movies, users and tokens.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/v1/movies", get(handlers::movies::list).post(handlers::movies::create))
            .route(
                "/v1/movies/{id}",
                get(handlers::movies::show)
                    .patch(handlers::movies::update)
                    .delete(handlers::movies::delete),
            )
            .route("/v1/users", post(handlers::users::register))
            .route("/v1/users/activated", put(handlers::users::activate))
            .route("/v1/tokens/authentication", post(handlers::tokens::authentication))
            .with_state(self.clone())
    }

    /// Resolves a bearer token to its user.
    pub async fn authenticate(&self, plaintext: &str) -> Result<User, ApiError> {
        let mut v = Validator::default();
        tokens::validate_plaintext(&mut v, plaintext);

        if !v.is_valid() {
            return Err(ApiError::InvalidAuthenticationToken);
        }

        let hash = tokens::hash(plaintext);

        let Some(user_id) = self
            .inner
            .tokens
            .find_user_id(Scope::Authentication, &hash, Timestamp::now())
            .await?
        else {
            return Err(ApiError::InvalidAuthenticationToken);
        };

        match self.inner.users.get(user_id).await {
            Ok(user) => Ok(user),
            Err(store::StoreError::NotFound) => Err(ApiError::InvalidAuthenticationToken),
            Err(error) => Err(error.into()),
        }
    }

    /// Number of movies in the catalog.
    pub async fn movie_count(&self) -> Result<usize, ApiError> {
        Ok(self.inner.movies.count().await?)
    }

    /// The manager running this catalog's background work.
    pub fn tasks(&self) -> &BackgroundTaskManager {
        &self.inner.tasks
    }

    /// The user behind `principal`, provided they are activated and hold `code`.
    pub(crate) async fn require_permission<'a>(&self, principal: &'a Principal, code: &str) -> Result<&'a User, ApiError> {
        let Some(user) = principal.user() else {
            return Err(ApiError::AuthenticationRequired);
        };

        if !user.activated {
            return Err(ApiError::InactiveAccount);
        }

        let permissions = self.inner.permissions.for_user(user.id).await?;

        if !permissions.includes(code) {
            log::debug!("User {} lacks permission '{code}'", user.id);
            return Err(ApiError::NotPermitted);
        }

        Ok(user)
    }
}

/// Configures a [`Catalog`]. Stores are in memory.
pub struct CatalogBuilder {
    tasks: BackgroundTaskManager,
    auth: AuthConfig,
    mailer: Option<Arc<dyn Mailer>>,
}

impl CatalogBuilder {
    /// Token lifetimes.
    pub fn auth(mut self, auth: AuthConfig) -> Self {
        self.auth = auth;
        self
    }

    /// Where outgoing email goes. Defaults to a [`LogMailer`] with default settings.
    pub fn mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = Some(mailer);
        self
    }

    /// Builds the catalog.
    pub fn build(self) -> Catalog {
        let mailer = self
            .mailer
            .unwrap_or_else(|| Arc::new(LogMailer::new(&MailerConfig::default())));

        Catalog {
            inner: Arc::new(Inner {
                movies: Arc::new(InMemoryMovieStore::default()),
                users: Arc::new(InMemoryUserStore::default()),
                tokens: Arc::new(InMemoryTokenStore::default()),
                permissions: Arc::new(InMemoryPermissionStore::default()),
                mailer,
                tasks: self.tasks,
                auth: self.auth,
            }),
        }
    }
}
