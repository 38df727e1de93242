use axum::{Json, extract::State, response::IntoResponse};
use http::StatusCode;
use jiff::Timestamp;
use serde_json::json;
use telemetry::metrics::{MAIL_SEND_DURATION, Recorder};

use crate::{
    ApiError, Catalog,
    extract::JsonBody,
    mailer::Email,
    store::StoreError,
    tokens::{self, Activation, Scope, Token},
    users::{NewUser, Registration, hash_password},
    validator::Validator,
};

pub(crate) async fn register(
    State(catalog): State<Catalog>,
    JsonBody(input): JsonBody<Registration>,
) -> Result<impl IntoResponse, ApiError> {
    let mut v = Validator::default();
    input.validate(&mut v);
    v.finish()?;

    let Registration { name, email, password } = input;

    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| anyhow::anyhow!("Password hashing task failed: {e}"))??;

    let user = catalog
        .inner
        .users
        .insert(NewUser {
            name,
            email,
            password_hash,
            activated: false,
        })
        .await?;

    let codes: Vec<&str> = catalog.inner.auth.default_permissions.iter().map(String::as_str).collect();
    catalog.inner.permissions.add_for_user(user.id, &codes).await?;

    let token = Token::generate(user.id, catalog.inner.auth.activation_ttl, Scope::Activation)?;
    catalog.inner.tokens.insert(&token).await?;

    log::info!("Registered user {}", user.id);

    let mailer = catalog.inner.mailer.clone();
    let email = Email::welcome(&user, &token.plaintext);

    let sending = catalog.inner.tasks.spawn("welcome email", async move {
        let mut recorder = Recorder::new(MAIL_SEND_DURATION);
        recorder.push_attribute("template", "user_welcome");

        let result = mailer.send(email).await;

        recorder.push_attribute("status", if result.is_ok() { "ok" } else { "error" });
        recorder.record();

        result
    });

    if let Err(error) = sending {
        log::error!("Welcome email for user {} was not sent: {error}", user.id);
    }

    Ok((StatusCode::ACCEPTED, Json(json!({ "user": user }))))
}

pub(crate) async fn activate(
    State(catalog): State<Catalog>,
    JsonBody(input): JsonBody<Activation>,
) -> Result<impl IntoResponse, ApiError> {
    let mut v = Validator::default();
    tokens::validate_plaintext(&mut v, &input.token);
    v.finish()?;

    let hash = tokens::hash(&input.token);

    let user_id = catalog
        .inner
        .tokens
        .find_user_id(Scope::Activation, &hash, Timestamp::now())
        .await?;

    let user = match user_id {
        Some(user_id) => catalog.inner.users.get(user_id).await,
        None => Err(StoreError::NotFound),
    };

    let mut user = match user {
        Ok(user) => user,
        Err(StoreError::NotFound) => {
            return Err(ApiError::invalid("token", "invalid or expired activation token"));
        }
        Err(error) => return Err(error.into()),
    };

    user.activated = true;

    let user = catalog.inner.users.update(user).await?;

    catalog
        .inner
        .tokens
        .delete_all_for_user(Scope::Activation, user.id)
        .await?;

    log::info!("Activated user {}", user.id);

    Ok(Json(json!({ "user": user })))
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use axum::{
        Router,
        body::{Body, to_bytes},
    };
    use background::BackgroundTaskManager;
    use http::{Method, Request, header};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::mailer::MemoryMailer;

    async fn send(router: Router, method: Method, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn activation_token(body: &str) -> String {
        body.split(r#"{"token": ""#)
            .nth(1)
            .and_then(|rest| rest.split('"').next())
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn register_then_activate() {
        let mailer = Arc::new(MemoryMailer::default());
        let tasks = BackgroundTaskManager::new();
        let catalog = Catalog::builder(tasks.clone()).mailer(mailer.clone()).build();

        let registration = json!({
            "name": "Alice Smith",
            "email": "alice@example.com",
            "password": "pa55word",
        });

        let (status, body) = send(catalog.router(), Method::POST, "/v1/users", registration).await;

        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["user"]["email"], "alice@example.com");
        assert_eq!(body["user"]["activated"], false);
        assert!(body["user"].get("password_hash").is_none());

        assert!(tasks.shutdown(Duration::from_secs(5)).await.is_drained());

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "alice@example.com");

        let token = activation_token(&sent[0].body);

        let (status, body) = send(
            catalog.router(),
            Method::PUT,
            "/v1/users/activated",
            json!({ "token": token }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user"]["activated"], true);

        // Activation tokens are single use.
        let (status, body) = send(
            catalog.router(),
            Method::PUT,
            "/v1/users/activated",
            json!({ "token": token }),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body, json!({"error": {"token": "invalid or expired activation token"}}));
    }

    #[tokio::test]
    async fn duplicate_email() {
        let catalog = Catalog::builder(BackgroundTaskManager::new())
            .mailer(Arc::new(MemoryMailer::default()))
            .build();

        let registration = json!({
            "name": "Bob",
            "email": "bob@example.com",
            "password": "pa55word",
        });

        let (status, _) = send(catalog.router(), Method::POST, "/v1/users", registration.clone()).await;
        assert_eq!(status, StatusCode::ACCEPTED);

        let (status, body) = send(catalog.router(), Method::POST, "/v1/users", registration).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body,
            json!({"error": {"email": "a user with this email address already exists"}})
        );
    }

    #[tokio::test]
    async fn invalid_registration() {
        let catalog = Catalog::builder(BackgroundTaskManager::new()).build();

        let registration = json!({ "name": "", "email": "bob@", "password": "short" });
        let (status, body) = send(catalog.router(), Method::POST, "/v1/users", registration).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body,
            json!({
                "error": {
                    "name": "must be provided",
                    "email": "must be a valid email address",
                    "password": "must be at least 8 bytes long",
                }
            })
        );
    }

    #[tokio::test]
    async fn malformed_activation_token() {
        let catalog = Catalog::builder(BackgroundTaskManager::new()).build();

        let (status, body) = send(
            catalog.router(),
            Method::PUT,
            "/v1/users/activated",
            json!({ "token": "abc" }),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body, json!({"error": {"token": "must be 22 bytes long"}}));
    }
}
