//! Reel server library.
//!
//! Provides a reusable server function to serve Reel either for the binary, or for the integration tests.

#![deny(missing_docs)]

mod admission;
mod auth;
mod client_key;
mod cors;
mod debug_vars;
mod health;
mod metrics;

use std::{any::Any, net::SocketAddr, sync::Arc};

use admission::AdmissionLayer;
use anyhow::anyhow;
use auth::AuthLayer;
use axum::{
    Router,
    body::Body,
    response::{IntoResponse, Response},
    routing::get,
};
use background::BackgroundTaskManager;
use catalog::{
    ApiError, Catalog,
    mailer::{LogMailer, Mailer},
};
use config::Config;
use debug_vars::DebugVars;
use http::{HeaderValue, Method, header};
use metrics::MetricsLayer;
use rate_limit::RateLimiterRegistry;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::catch_panic::CatchPanicLayer;

pub(crate) const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Configuration for serving Reel.
pub struct ServeConfig {
    /// The socket address (IP and port) the server will bind to
    pub listen_address: SocketAddr,
    /// The deserialized Reel TOML configuration.
    pub config: Config,
    /// Cancelling this token stops accepting connections and starts the background drain.
    pub shutdown: CancellationToken,
    /// Overrides the mailer built from the `[mailer]` section.
    pub mailer: Option<Arc<dyn Mailer>>,
}

/// Starts and runs the Reel server with the provided configuration.
///
/// Returns once `shutdown` has been cancelled, in-flight requests have completed and the
/// background tasks have drained or the drain deadline has passed.
pub async fn serve(
    ServeConfig {
        listen_address,
        config,
        shutdown,
        mailer,
    }: ServeConfig,
) -> anyhow::Result<()> {
    let limits = &config.server.rate_limits;
    let registry = Arc::new(RateLimiterRegistry::new(limits));

    if registry.is_enabled() {
        log::info!(
            "Rate limiting clients to {} requests per second with bursts of {}",
            limits.requests_per_second,
            limits.burst
        );
    } else {
        log::info!("Rate limiting disabled");
    }

    let eviction = registry.spawn_eviction(limits.eviction_interval, shutdown.child_token());

    let tasks = BackgroundTaskManager::new();
    let mailer = mailer.unwrap_or_else(|| Arc::new(LogMailer::new(&config.mailer)));

    let catalog = Catalog::builder(tasks.clone())
        .auth(config.auth.clone())
        .mailer(mailer)
        .build();

    let app = router(&config, &catalog, &registry, &tasks);

    let listener = TcpListener::bind(listen_address)
        .await
        .map_err(|e| anyhow!("Failed to bind to {listen_address}: {e}"))?;

    log::info!(
        "Reel listening on http://{listen_address} ({} environment)",
        config.server.environment
    );

    let signal = shutdown.clone();

    let served = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move { signal.cancelled().await })
        .await
        .map_err(|e| anyhow!("Failed to run HTTP server: {e}"));

    log::info!("Stopped accepting connections");

    // Also reached when the server failed, so make sure the sweep stops either way.
    shutdown.cancel();

    tasks.shutdown(config.server.shutdown.drain_deadline).await;

    if let Some(eviction) = eviction
        && let Err(e) = eviction.await
    {
        log::error!("Rate limit eviction sweep ended abnormally: {e}");
    }

    log::info!("Shutdown complete");

    served
}

/// Assembles every route with the middleware stack, outermost first:
/// metrics, CORS, panic recovery, admission, authentication.
fn router(
    config: &Config,
    catalog: &Catalog,
    registry: &Arc<RateLimiterRegistry>,
    tasks: &BackgroundTaskManager,
) -> Router {
    let mut app = catalog.router();

    let health_config = &config.server.health;

    if health_config.enabled {
        let environment = config.server.environment;
        app = app.route(health_config.path.as_ref(), get(move || health::health(environment)));
    }

    let debug_vars_config = &config.server.debug_vars;

    if debug_vars_config.enabled {
        let vars = DebugVars {
            registry: registry.clone(),
            tasks: tasks.clone(),
            catalog: catalog.clone(),
        };

        app = app.route(
            debug_vars_config.path.as_ref(),
            get(move || debug_vars::debug_vars(vars.clone())),
        );
    }

    let trust_forwarded = config.server.rate_limits.trust_forwarded_headers;

    app = app
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(AuthLayer::new(catalog.clone()))
        .layer(AdmissionLayer::new(registry.clone(), trust_forwarded))
        .layer(CatchPanicLayer::custom(panic_response));

    if let Some(cors_config) = &config.server.cors {
        app = app.layer(cors::generate(cors_config));
    }

    app.layer(MetricsLayer)
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

async fn method_not_allowed(method: Method) -> ApiError {
    ApiError::MethodNotAllowed(method.to_string())
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let message = panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload");

    let mut response = ApiError::Internal(anyhow!("request handler panicked: {message}")).into_response();

    response
        .headers_mut()
        .insert(header::CONNECTION, HeaderValue::from_static("close"));

    response
}
