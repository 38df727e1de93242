use indoc::indoc;
use integration_tests::TestServer;
use serde_json::{Value, json};

#[tokio::test]
async fn health_endpoint_enabled_by_default() {
    let server = TestServer::start("").await;

    let response = server.client.get("/v1/healthcheck").await;
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();

    assert_eq!(body["status"], "available");
    assert_eq!(body["system_info"]["environment"], "development");
}

#[tokio::test]
async fn health_endpoint_custom_path() {
    let config = indoc! {r#"
        [server]
        environment = "staging"

        [server.health]
        path = "/status"
    "#};

    let server = TestServer::start(config).await;

    let response = server.client.get("/status").await;
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["system_info"]["environment"], "staging");

    let response = server.client.get("/v1/healthcheck").await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn health_endpoint_disabled() {
    let config = indoc! {r#"
        [server.health]
        enabled = false
    "#};

    let server = TestServer::start(config).await;

    let response = server.client.get("/v1/healthcheck").await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn debug_vars_track_clients_and_movies() {
    let config = indoc! {r#"
        [server.rate_limits]
        burst = 100

        [auth]
        default_permissions = ["movies:read", "movies:write"]
    "#};

    let server = TestServer::start(config).await;
    let client = server.signed_in_client("ops@example.com").await;

    let response = client
        .post(
            "/v1/movies",
            &json!({ "title": "Heat", "year": 1995, "runtime": "170 mins", "genres": ["crime"] }),
        )
        .await;
    assert_eq!(response.status(), 201);

    let body: Value = server.client.get("/debug/vars").await.json().await.unwrap();

    assert_eq!(body["movies"], 1);
    assert_eq!(body["rate_limiter"], json!({ "enabled": true, "tracked_clients": 1 }));
    assert_eq!(body["background_tasks"]["state"], "running");
}

#[tokio::test]
async fn unknown_routes_and_methods() {
    let server = TestServer::start("").await;

    let response = server.client.get("/v1/nothing-here").await;
    assert_eq!(response.status(), 404);
    insta::assert_snapshot!(response.text().await.unwrap(), @r#"{"error":"the requested resource could not be found"}"#);

    let response = server.client.delete("/v1/healthcheck").await;
    assert_eq!(response.status(), 405);
    insta::assert_snapshot!(response.text().await.unwrap(), @r#"{"error":"the DELETE method is not supported for this resource"}"#);
}

#[tokio::test]
async fn graceful_shutdown_drains_welcome_emails() {
    let server = TestServer::start("").await;

    server.register("Dana", "dana@example.com", "pa55word").await;

    let mailer = server.mailer.clone();
    server.stop().await.unwrap();

    assert_eq!(mailer.sent().len(), 1);
    assert_eq!(mailer.sent()[0].to, "dana@example.com");
}
