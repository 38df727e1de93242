//! Request extractors that reject with the JSON error envelope.

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Path, Request, rejection::JsonRejection},
};
use http::request::Parts;
use serde::de::DeserializeOwned;

use crate::{ApiError, permissions::Principal};

/// A JSON request body. Malformed input becomes a 400 with the parser's message.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(bad_request(rejection)),
        }
    }
}

fn bad_request(rejection: JsonRejection) -> ApiError {
    log::debug!("Rejected request body: {rejection}");

    match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::BadRequest("body must be JSON with a Content-Type of application/json".to_string())
        }
        rejection => ApiError::BadRequest(rejection.body_text()),
    }
}

/// A movie id from the path. Anything but a positive integer is a 404.
pub struct MovieId(pub u64);

impl<S> FromRequestParts<S> for MovieId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::NotFound)?;

        match raw.parse::<u64>() {
            Ok(id) if id >= 1 => Ok(Self(id)),
            _ => Err(ApiError::NotFound),
        }
    }
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Principal>()
            .cloned()
            .unwrap_or(Principal::Anonymous))
    }
}
