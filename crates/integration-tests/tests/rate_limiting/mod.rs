use std::time::Duration;

use indoc::indoc;
use integration_tests::TestServer;

#[tokio::test]
async fn burst_then_429() {
    let config = indoc! {r#"
        [server.rate_limits]
        requests_per_second = 0.01
        burst = 3
    "#};

    let server = TestServer::start(config).await;

    let mut statuses = Vec::new();

    for _ in 0..5 {
        statuses.push(server.client.get("/v1/healthcheck").await.status().as_u16());
    }

    assert_eq!(statuses, [200, 200, 200, 429, 429]);

    let response = server.client.get("/v1/healthcheck").await;
    assert_eq!(response.status(), 429);
    insta::assert_snapshot!(response.text().await.unwrap(), @r#"{"error":"rate limit exceeded"}"#);
}

#[tokio::test]
async fn rejected_requests_never_reach_handlers() {
    let config = indoc! {r#"
        [server.rate_limits]
        requests_per_second = 0.01
        burst = 1
    "#};

    let server = TestServer::start(config).await;

    let response = server.client.get("/v1/healthcheck").await;
    assert_eq!(response.status(), 200);

    // A registration that would otherwise succeed is refused before it is processed.
    let response = server
        .client
        .post(
            "/v1/users",
            &serde_json::json!({ "name": "Eve", "email": "eve@example.com", "password": "pa55word" }),
        )
        .await;

    assert_eq!(response.status(), 429);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(server.mailer.sent().is_empty());
}

#[tokio::test]
async fn tokens_refill_over_time() {
    let config = indoc! {r#"
        [server.rate_limits]
        requests_per_second = 2.0
        burst = 1
    "#};

    let server = TestServer::start(config).await;

    assert_eq!(server.client.get("/v1/healthcheck").await.status(), 200);
    assert_eq!(server.client.get("/v1/healthcheck").await.status(), 429);

    tokio::time::sleep(Duration::from_millis(600)).await;

    assert_eq!(server.client.get("/v1/healthcheck").await.status(), 200);
}

#[tokio::test]
async fn disabled_limiter_admits_everything() {
    let config = indoc! {r#"
        [server.rate_limits]
        enabled = false
        burst = 1
    "#};

    let server = TestServer::start(config).await;

    for _ in 0..20 {
        assert_eq!(server.client.get("/v1/healthcheck").await.status(), 200);
    }

    let body: serde_json::Value = server.client.get("/debug/vars").await.json().await.unwrap();
    assert_eq!(body["rate_limiter"]["enabled"], false);
    assert_eq!(body["rate_limiter"]["tracked_clients"], 0);
}
