use axum::{Json, extract::State, response::IntoResponse};
use http::StatusCode;
use serde_json::json;

use crate::{
    ApiError, Catalog,
    extract::JsonBody,
    store::StoreError,
    tokens::{Credentials, Scope, Token},
    users::{validate_email, validate_password, verify_password},
    validator::Validator,
};

pub(crate) async fn authentication(
    State(catalog): State<Catalog>,
    JsonBody(input): JsonBody<Credentials>,
) -> Result<impl IntoResponse, ApiError> {
    let mut v = Validator::default();
    validate_email(&mut v, &input.email);
    validate_password(&mut v, &input.password);
    v.finish()?;

    let user = match catalog.inner.users.get_by_email(&input.email).await {
        Ok(user) => user,
        Err(StoreError::NotFound) => return Err(ApiError::InvalidCredentials),
        Err(error) => return Err(error.into()),
    };

    let hash = user.password_hash.clone();
    let password = input.password;

    let matches = tokio::task::spawn_blocking(move || verify_password(&hash, &password))
        .await
        .map_err(|e| anyhow::anyhow!("Password verification task failed: {e}"))??;

    if !matches {
        log::debug!("Wrong password for user {}", user.id);
        return Err(ApiError::InvalidCredentials);
    }

    let token = Token::generate(user.id, catalog.inner.auth.token_ttl, Scope::Authentication)?;
    catalog.inner.tokens.insert(&token).await?;

    Ok((StatusCode::CREATED, Json(json!({ "authentication_token": token }))))
}
