//! End-to-end test harness: a real server on an ephemeral port and a reqwest client.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use catalog::mailer::MemoryMailer;
use config::Config;
use reqwest::{Method, RequestBuilder, Response};
use serde_json::{Value, json};
use server::ServeConfig;
use tokio::{
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

/// Test client for making HTTP requests to the test server
#[derive(Clone)]
pub struct TestClient {
    base_url: String,
    client: reqwest::Client,
    token: Option<String>,
}

impl TestClient {
    /// Create a new test client for the given base URL
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
            token: None,
        }
    }

    /// A copy of this client sending `Authorization: Bearer <token>` with every request
    pub fn with_token(&self, token: &str) -> Self {
        Self {
            token: Some(token.to_string()),
            ..self.clone()
        }
    }

    /// Start building a request to the given path
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, format!("{}{}", self.base_url, path));

        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a GET request to the given path
    pub async fn get(&self, path: &str) -> Response {
        self.request(Method::GET, path).send().await.unwrap()
    }

    /// Send a POST request to the given path with JSON body
    pub async fn post<T: serde::Serialize>(&self, path: &str, body: &T) -> Response {
        self.request(Method::POST, path).json(body).send().await.unwrap()
    }

    /// Send a PUT request to the given path with JSON body
    pub async fn put<T: serde::Serialize>(&self, path: &str, body: &T) -> Response {
        self.request(Method::PUT, path).json(body).send().await.unwrap()
    }

    /// Send a PATCH request to the given path with JSON body
    pub async fn patch<T: serde::Serialize>(&self, path: &str, body: &T) -> Response {
        self.request(Method::PATCH, path).json(body).send().await.unwrap()
    }

    /// Send a DELETE request to the given path
    pub async fn delete(&self, path: &str) -> Response {
        self.request(Method::DELETE, path).send().await.unwrap()
    }
}

/// Test server that manages the lifecycle of a server instance
pub struct TestServer {
    /// Anonymous client for this server.
    pub client: TestClient,
    /// Where the server listens.
    pub address: SocketAddr,
    /// Every email the server sent.
    pub mailer: Arc<MemoryMailer>,
    shutdown: CancellationToken,
    handle: Option<JoinHandle<anyhow::Result<()>>>,
}

impl TestServer {
    /// Start a new test server with the given TOML configuration
    pub async fn start(config_toml: &str) -> Self {
        let config: Config = toml::from_str(config_toml).unwrap();
        config.validate().unwrap();

        // Find an available port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        let mailer = Arc::new(MemoryMailer::default());
        let shutdown = CancellationToken::new();

        let serve_config = ServeConfig {
            listen_address: address,
            config,
            shutdown: shutdown.clone(),
            mailer: Some(mailer.clone()),
        };

        // Drop the listener so the server can bind to the address
        drop(listener);

        let handle = tokio::spawn(server::serve(serve_config));

        // Connecting does not go through the rate limiter, unlike a probe request would.
        let mut retries = 50;

        while TcpStream::connect(address).await.is_err() {
            retries -= 1;

            if retries == 0 || handle.is_finished() {
                eprintln!("Server failed to start on {address}");
                std::process::exit(1);
            }

            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        TestServer {
            client: TestClient::new(format!("http://{address}")),
            address,
            mailer,
            shutdown,
            handle: Some(handle),
        }
    }

    /// Trigger a graceful shutdown and wait for the server to finish draining.
    pub async fn stop(mut self) -> anyhow::Result<()> {
        self.shutdown.cancel();

        match self.handle.take() {
            Some(handle) => handle.await?,
            None => Ok(()),
        }
    }

    /// Register a user and return the response body.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Value {
        let response = self
            .client
            .post("/v1/users", &json!({ "name": name, "email": email, "password": password }))
            .await;

        assert_eq!(response.status(), 202, "registration of {email} failed");

        response.json().await.unwrap()
    }

    /// The activation token mailed to `email`, waiting for the background send to happen.
    pub async fn activation_token(&self, email: &str) -> String {
        for _ in 0..100 {
            let token = self
                .mailer
                .sent()
                .iter()
                .rev()
                .find(|message| message.to == email)
                .and_then(|message| extract_token(&message.body));

            if let Some(token) = token {
                return token;
            }

            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        eprintln!("No welcome email was sent to {email}");
        std::process::exit(1);
    }

    /// Register, activate and log in a user, returning a client carrying their bearer token.
    pub async fn signed_in_client(&self, email: &str) -> TestClient {
        let password = "pa55word";

        self.register("Test User", email, password).await;

        let token = self.activation_token(email).await;
        let response = self.client.put("/v1/users/activated", &json!({ "token": token })).await;
        assert_eq!(response.status(), 200, "activation of {email} failed");

        let response = self
            .client
            .post(
                "/v1/tokens/authentication",
                &json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(response.status(), 201, "login of {email} failed");

        let body: Value = response.json().await.unwrap();
        let token = body["authentication_token"]["token"].as_str().unwrap();

        self.client.with_token(token)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn extract_token(body: &str) -> Option<String> {
    let rest = body.split(r#"{"token": ""#).nth(1)?;
    rest.split('"').next().map(str::to_string)
}
