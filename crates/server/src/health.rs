use axum::Json;
use config::Environment;
use http::StatusCode;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Status {
    /// The server is accepting requests.
    Available,
}

#[derive(Debug, Serialize)]
pub(crate) struct SystemInfo {
    environment: Environment,
    version: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct HealthState {
    status: Status,
    system_info: SystemInfo,
}

/// Reports that the server is up, with its environment and version.
pub(crate) async fn health(environment: Environment) -> (StatusCode, Json<HealthState>) {
    let state = HealthState {
        status: Status::Available,
        system_info: SystemInfo {
            environment,
            version: crate::VERSION,
        },
    };

    (StatusCode::OK, Json(state))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn reports_environment_and_version() {
        let (status, Json(state)) = health(Environment::Staging).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            serde_json::to_value(state).unwrap(),
            json!({
                "status": "available",
                "system_info": { "environment": "staging", "version": crate::VERSION },
            })
        );
    }
}
