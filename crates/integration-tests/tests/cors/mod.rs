use indoc::indoc;
use integration_tests::TestServer;

#[tokio::test]
async fn trusted_origin_is_allowed() {
    let config = indoc! {r#"
        [server.cors]
        allow_origins = ["https://reel.example.com"]
        allow_methods = ["GET", "POST", "PATCH", "DELETE"]
        allow_headers = ["Authorization", "Content-Type"]
    "#};

    let server = TestServer::start(config).await;

    let response = server
        .client
        .request(reqwest::Method::GET, "/v1/healthcheck")
        .header("Origin", "https://reel.example.com")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "https://reel.example.com"
    );

    let response = server
        .client
        .request(reqwest::Method::GET, "/v1/healthcheck")
        .header("Origin", "https://elsewhere.example.com")
        .send()
        .await
        .unwrap();

    assert!(!response.headers().contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn preflight_lists_methods() {
    let config = indoc! {r#"
        [server.cors]
        allow_origins = "*"
        allow_methods = ["GET", "PATCH"]
    "#};

    let server = TestServer::start(config).await;

    let response = server
        .client
        .request(reqwest::Method::OPTIONS, "/v1/movies/1")
        .header("Origin", "https://reel.example.com")
        .header("Access-Control-Request-Method", "PATCH")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);

    let methods = response.headers()["access-control-allow-methods"].to_str().unwrap();
    assert!(methods.contains("PATCH"));
    assert!(!methods.contains("DELETE"));
}

#[tokio::test]
async fn no_cors_headers_without_configuration() {
    let server = TestServer::start("").await;

    let response = server
        .client
        .request(reqwest::Method::GET, "/v1/healthcheck")
        .header("Origin", "https://reel.example.com")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert!(!response.headers().contains_key("access-control-allow-origin"));
}
