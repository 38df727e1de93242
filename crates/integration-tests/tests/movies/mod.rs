use indoc::indoc;
use integration_tests::{TestClient, TestServer};
use serde_json::{Value, json};

const CONFIG: &str = indoc! {r#"
    [server.rate_limits]
    burst = 200

    [auth]
    default_permissions = ["movies:read", "movies:write"]
"#};

async fn editor() -> (TestServer, TestClient) {
    let server = TestServer::start(CONFIG).await;
    let client = server.signed_in_client("editor@example.com").await;

    (server, client)
}

async fn create(client: &TestClient, movie: Value) -> Value {
    let response = client.post("/v1/movies", &movie).await;
    assert_eq!(response.status(), 201);

    response.json().await.unwrap()
}

#[tokio::test]
async fn crud_round_trip() {
    let (_server, client) = editor().await;

    let response = client
        .post(
            "/v1/movies",
            &json!({ "title": "Casablanca", "year": 1942, "runtime": "102 mins", "genres": ["drama", "romance"] }),
        )
        .await;

    assert_eq!(response.status(), 201);
    assert_eq!(response.headers()["location"], "/v1/movies/1");

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["movie"]["id"], 1);
    assert_eq!(body["movie"]["version"], 1);

    let body: Value = client.get("/v1/movies/1").await.json().await.unwrap();
    assert_eq!(body["movie"]["title"], "Casablanca");
    assert_eq!(body["movie"]["runtime"], "102 mins");

    let response = client.patch("/v1/movies/1", &json!({ "year": 1943 })).await;
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["movie"]["year"], 1943);
    assert_eq!(body["movie"]["version"], 2);

    let response = client.delete("/v1/movies/1").await;
    assert_eq!(response.status(), 200);
    insta::assert_snapshot!(response.text().await.unwrap(), @r#"{"message":"movie successfully deleted"}"#);

    let response = client.get("/v1/movies/1").await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn listing_filters_sorts_and_pages() {
    let (_server, client) = editor().await;

    create(&client, json!({ "title": "Alien", "year": 1979, "runtime": "117 mins", "genres": ["horror", "sci-fi"] })).await;
    create(&client, json!({ "title": "Aliens", "year": 1986, "runtime": "137 mins", "genres": ["action", "sci-fi"] })).await;
    create(&client, json!({ "title": "Arrival", "year": 2016, "runtime": "116 mins", "genres": ["drama", "sci-fi"] })).await;

    let body: Value = client
        .get("/v1/movies?title=alien&sort=-year")
        .await
        .json()
        .await
        .unwrap();

    let titles: Vec<&str> = body["movies"]
        .as_array()
        .unwrap()
        .iter()
        .map(|movie| movie["title"].as_str().unwrap())
        .collect();

    assert_eq!(titles, ["Aliens", "Alien"]);

    let body: Value = client
        .get("/v1/movies?genres=sci-fi&sort=runtime&page=2&page_size=2")
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(body["movies"][0]["title"], "Aliens");
    assert_eq!(
        body["metadata"],
        json!({ "current_page": 2, "page_size": 2, "first_page": 1, "last_page": 2, "total_records": 3 })
    );
}

#[tokio::test]
async fn invalid_query_parameters() {
    let (_server, client) = editor().await;

    let response = client.get("/v1/movies?page=zero").await;
    assert_eq!(response.status(), 422);
    insta::assert_snapshot!(response.text().await.unwrap(), @r#"{"error":{"page":"must be an integer value"}}"#);

    let response = client.get("/v1/movies?page_size=1000&sort=budget").await;
    assert_eq!(response.status(), 422);

    let body: Value = response.json().await.unwrap();

    assert_eq!(
        body,
        json!({
            "error": {
                "page_size": "must be a maximum of 100",
                "sort": "invalid sort value",
            }
        })
    );
}

#[tokio::test]
async fn edit_conflict_on_stale_version() {
    let (_server, client) = editor().await;

    create(&client, json!({ "title": "Vertigo", "year": 1958, "runtime": "128 mins", "genres": ["thriller"] })).await;

    let response = client
        .request(reqwest::Method::PATCH, "/v1/movies/1")
        .header("X-Expected-Version", "1")
        .json(&json!({ "runtime": "129 mins" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);

    let response = client
        .request(reqwest::Method::PATCH, "/v1/movies/1")
        .header("X-Expected-Version", "1")
        .json(&json!({ "runtime": "130 mins" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 409);
    insta::assert_snapshot!(
        response.text().await.unwrap(),
        @r#"{"error":"unable to update the record due to an edit conflict, please try again"}"#
    );
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let (_server, client) = editor().await;

    let response = client
        .request(reqwest::Method::POST, "/v1/movies")
        .header("Content-Type", "application/json")
        .body(r#"{"title": "Unterminated"#)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());

    let response = client
        .post("/v1/movies", &json!({ "title": "Rocky", "rating": 5 }))
        .await;

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn readers_cannot_write() {
    let config = indoc! {r#"
        [server.rate_limits]
        burst = 200
    "#};

    let server = TestServer::start(config).await;
    let reader = server.signed_in_client("reader@example.com").await;

    let response = reader.get("/v1/movies").await;
    assert_eq!(response.status(), 200);

    let response = reader
        .post(
            "/v1/movies",
            &json!({ "title": "Jaws", "year": 1975, "runtime": "124 mins", "genres": ["thriller"] }),
        )
        .await;

    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn anonymous_and_bad_tokens() {
    let server = TestServer::start(CONFIG).await;

    let response = server.client.get("/v1/movies").await;
    assert_eq!(response.status(), 401);
    insta::assert_snapshot!(
        response.text().await.unwrap(),
        @r#"{"error":"you must be authenticated to access this resource"}"#
    );

    let response = server.client.with_token("AAAAAAAAAAAAAAAAAAAAAA").get("/v1/movies").await;
    assert_eq!(response.status(), 401);
    assert_eq!(response.headers()["www-authenticate"], "Bearer");
}
