//! Operational variables, in the spirit of an expvar endpoint.

use std::sync::Arc;

use axum::Json;
use background::BackgroundTaskManager;
use catalog::{ApiError, Catalog};
use jiff::Timestamp;
use rate_limit::RateLimiterRegistry;
use serde::Serialize;

/// What the endpoint reads from.
#[derive(Clone)]
pub(crate) struct DebugVars {
    pub(crate) registry: Arc<RateLimiterRegistry>,
    pub(crate) tasks: BackgroundTaskManager,
    pub(crate) catalog: Catalog,
}

#[derive(Debug, Serialize)]
pub(crate) struct Snapshot {
    version: &'static str,
    timestamp: i64,
    rate_limiter: RateLimiterVars,
    background_tasks: BackgroundVars,
    movies: usize,
}

#[derive(Debug, Serialize)]
struct RateLimiterVars {
    enabled: bool,
    tracked_clients: usize,
}

#[derive(Debug, Serialize)]
struct BackgroundVars {
    outstanding: usize,
    state: &'static str,
}

pub(crate) async fn debug_vars(vars: DebugVars) -> Result<Json<Snapshot>, ApiError> {
    let movies = vars.catalog.movie_count().await?;

    Ok(Json(Snapshot {
        version: crate::VERSION,
        timestamp: Timestamp::now().as_second(),
        rate_limiter: RateLimiterVars {
            enabled: vars.registry.is_enabled(),
            tracked_clients: vars.registry.len(),
        },
        background_tasks: BackgroundVars {
            outstanding: vars.tasks.outstanding(),
            state: vars.tasks.state().as_str(),
        },
        movies,
    }))
}

#[cfg(test)]
mod tests {
    use config::RateLimitConfig;
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn reports_limiter_and_task_state() {
        let registry = Arc::new(RateLimiterRegistry::new(&RateLimitConfig::default()));
        registry.allow("192.0.2.1");
        registry.allow("192.0.2.2");

        let tasks = BackgroundTaskManager::new();
        let catalog = Catalog::builder(tasks.clone()).build();

        let vars = DebugVars {
            registry,
            tasks,
            catalog,
        };

        let Json(snapshot) = debug_vars(vars).await.unwrap();
        let mut value = serde_json::to_value(snapshot).unwrap();

        assert!(value["timestamp"].as_i64().unwrap() > 0);
        value["timestamp"] = 0.into();

        assert_eq!(
            value,
            json!({
                "version": crate::VERSION,
                "timestamp": 0,
                "rate_limiter": { "enabled": true, "tracked_clients": 2 },
                "background_tasks": { "outstanding": 0, "state": "running" },
                "movies": 0,
            })
        );
    }
}
