use indoc::indoc;
use integration_tests::TestServer;
use serde_json::{Value, json};

const CONFIG: &str = indoc! {r#"
    [server.rate_limits]
    burst = 100
"#};

#[tokio::test]
async fn registration_sends_an_activation_email() {
    let server = TestServer::start(CONFIG).await;

    let body = server.register("Faith Lehane", "faith@example.com", "pa55word").await;

    assert_eq!(body["user"]["name"], "Faith Lehane");
    assert_eq!(body["user"]["activated"], false);

    let token = server.activation_token("faith@example.com").await;
    assert_eq!(token.len(), 22);

    let sent = server.mailer.sent();
    assert_eq!(sent[0].subject, "Welcome to Reel!");
}

#[tokio::test]
async fn inactive_users_are_forbidden() {
    let server = TestServer::start(CONFIG).await;

    server.register("Gus", "gus@example.com", "pa55word").await;

    let response = server
        .client
        .post(
            "/v1/tokens/authentication",
            &json!({ "email": "gus@example.com", "password": "pa55word" }),
        )
        .await;

    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.unwrap();
    let token = body["authentication_token"]["token"].as_str().unwrap();

    let response = server.client.with_token(token).get("/v1/movies").await;
    assert_eq!(response.status(), 403);
    insta::assert_snapshot!(
        response.text().await.unwrap(),
        @r#"{"error":"your user account must be activated to access this resource"}"#
    );
}

#[tokio::test]
async fn activation_token_is_single_use() {
    let server = TestServer::start(CONFIG).await;

    server.register("Hal", "hal@example.com", "pa55word").await;
    let token = server.activation_token("hal@example.com").await;

    let response = server.client.put("/v1/users/activated", &json!({ "token": token })).await;
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["user"]["activated"], true);

    let response = server.client.put("/v1/users/activated", &json!({ "token": token })).await;
    assert_eq!(response.status(), 422);
}

#[tokio::test]
async fn wrong_credentials() {
    let server = TestServer::start(CONFIG).await;

    server.register("Ivy", "ivy@example.com", "pa55word").await;

    let response = server
        .client
        .post(
            "/v1/tokens/authentication",
            &json!({ "email": "ivy@example.com", "password": "not-the-password" }),
        )
        .await;

    assert_eq!(response.status(), 401);
    insta::assert_snapshot!(response.text().await.unwrap(), @r#"{"error":"invalid authentication credentials"}"#);
}

#[tokio::test]
async fn duplicate_registration() {
    let server = TestServer::start(CONFIG).await;

    server.register("Jo", "jo@example.com", "pa55word").await;

    let response = server
        .client
        .post(
            "/v1/users",
            &json!({ "name": "Jo Again", "email": "jo@example.com", "password": "pa55word" }),
        )
        .await;

    assert_eq!(response.status(), 422);
    insta::assert_snapshot!(
        response.text().await.unwrap(),
        @r#"{"error":{"email":"a user with this email address already exists"}}"#
    );
}
