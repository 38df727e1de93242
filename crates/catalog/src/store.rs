//! Persistence seams for the catalog.
//!
//! Handlers only talk to these traits. The in-memory implementations in [`memory`] back the
//! server today; a relational backend would implement the same traits.

pub mod memory;

use async_trait::async_trait;
use jiff::Timestamp;

use crate::{
    filters::{Metadata, MovieQuery},
    movies::{Movie, NewMovie},
    permissions::Permissions,
    tokens::{Scope, Token, TokenHash},
    users::{NewUser, User},
};

/// Errors that can occur in storage backends.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No record with this key.
    #[error("record not found")]
    NotFound,
    /// The record's version moved on since it was read.
    #[error("edit conflict")]
    EditConflict,
    /// Another user already registered this email address.
    #[error("duplicate email")]
    DuplicateEmail,
    /// Backend failure.
    #[error("storage error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Movie records.
#[async_trait]
pub trait MovieStore: Send + Sync {
    /// Stores a new movie and returns it with its id, creation time and version 1.
    async fn insert(&self, movie: NewMovie) -> Result<Movie, StoreError>;

    /// Fetches one movie.
    async fn get(&self, id: u64) -> Result<Movie, StoreError>;

    /// Replaces a movie if its version still matches, returning it with the version bumped.
    async fn update(&self, movie: Movie) -> Result<Movie, StoreError>;

    /// Removes a movie.
    async fn delete(&self, id: u64) -> Result<(), StoreError>;

    /// One page of movies matching the query, plus paging metadata.
    async fn list(&self, query: &MovieQuery) -> Result<(Vec<Movie>, Metadata), StoreError>;

    /// Total number of movies.
    async fn count(&self) -> Result<usize, StoreError>;
}

/// User accounts.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Stores a new user; fails with [`StoreError::DuplicateEmail`] if the email is taken.
    async fn insert(&self, user: NewUser) -> Result<User, StoreError>;

    /// Fetches a user by id.
    async fn get(&self, id: u64) -> Result<User, StoreError>;

    /// Fetches a user by email address.
    async fn get_by_email(&self, email: &str) -> Result<User, StoreError>;

    /// Replaces a user if its version still matches, returning it with the version bumped.
    async fn update(&self, user: User) -> Result<User, StoreError>;
}

/// Hashed activation and authentication tokens.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Stores a token's hash, owner, scope and expiry.
    async fn insert(&self, token: &Token) -> Result<(), StoreError>;

    /// The owner of a token in `scope` that has not expired at `now`.
    async fn find_user_id(&self, scope: Scope, hash: &TokenHash, now: Timestamp) -> Result<Option<u64>, StoreError>;

    /// Removes every token of `scope` owned by `user_id`.
    async fn delete_all_for_user(&self, scope: Scope, user_id: u64) -> Result<(), StoreError>;
}

/// Permission codes granted to users.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// All codes granted to `user_id`.
    async fn for_user(&self, user_id: u64) -> Result<Permissions, StoreError>;

    /// Grants additional codes to `user_id`.
    async fn add_for_user(&self, user_id: u64, codes: &[&str]) -> Result<(), StoreError>;
}
