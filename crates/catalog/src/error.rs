use std::collections::BTreeMap;

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use http::{HeaderValue, StatusCode, header};
use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;

/// Errors returned by the catalog API, each mapping to one HTTP status.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request body or a parameter could not be parsed.
    #[error("{0}")]
    BadRequest(String),

    /// No resource at this path.
    #[error("the requested resource could not be found")]
    NotFound,

    /// The route exists, but not for this method.
    #[error("the {0} method is not supported for this resource")]
    MethodNotAllowed(String),

    /// The record changed between read and write.
    #[error("unable to update the record due to an edit conflict, please try again")]
    EditConflict,

    /// Input was well-formed but failed validation, keyed by field.
    #[error("failed validation")]
    FailedValidation(BTreeMap<String, String>),

    /// Wrong email or password.
    #[error("invalid authentication credentials")]
    InvalidCredentials,

    /// The bearer token was malformed, unknown or expired.
    #[error("invalid or missing authentication token")]
    InvalidAuthenticationToken,

    /// The route requires an authenticated user.
    #[error("you must be authenticated to access this resource")]
    AuthenticationRequired,

    /// The user has not activated their account yet.
    #[error("your user account must be activated to access this resource")]
    InactiveAccount,

    /// The user lacks the permission this route requires.
    #[error("your user account doesn't have the necessary permissions to access this resource")]
    NotPermitted,

    /// The client ran out of rate limit tokens.
    #[error("rate limit exceeded")]
    RateLimitExceeded,

    /// Anything unexpected. Details are logged, never returned.
    #[error("the server encountered a problem and could not process your request")]
    Internal(#[source] anyhow::Error),
}

impl ApiError {
    /// Get the appropriate HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::EditConflict => StatusCode::CONFLICT,
            Self::FailedValidation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InvalidCredentials | Self::InvalidAuthenticationToken | Self::AuthenticationRequired => {
                StatusCode::UNAUTHORIZED
            }
            Self::InactiveAccount | Self::NotPermitted => StatusCode::FORBIDDEN,
            Self::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// A single-field validation failure.
    pub fn invalid(field: &str, message: &str) -> Self {
        Self::FailedValidation(BTreeMap::from([(field.to_string(), message.to_string())]))
    }
}

impl From<StoreError> for ApiError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound => Self::NotFound,
            StoreError::EditConflict => Self::EditConflict,
            StoreError::DuplicateEmail => Self::invalid("email", "a user with this email address already exists"),
            StoreError::Internal(error) => Self::Internal(error),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        Self::Internal(error)
    }
}

#[derive(Serialize)]
#[serde(untagged)]
enum ErrorMessage {
    Text(String),
    Fields(BTreeMap<String, String>),
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: ErrorMessage,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if let Self::Internal(ref error) = self {
            log::error!("Internal server error: {error:#}");
        }

        let unauthorized_token = matches!(self, Self::InvalidAuthenticationToken);

        let error = match self {
            Self::FailedValidation(fields) => ErrorMessage::Fields(fields),
            other => ErrorMessage::Text(other.to_string()),
        };

        let mut response = (status, Json(ErrorEnvelope { error })).into_response();

        if unauthorized_token {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }

        response
    }
}
