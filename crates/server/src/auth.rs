//! Bearer token authentication.
//!
//! Every request leaves this layer with a [`Principal`] in its extensions. Requests without an
//! `Authorization` header become [`Principal::Anonymous`]; handlers decide whether that is
//! enough. A header that is present but malformed, or a token that is unknown or expired, is
//! answered with 401 right here.

use std::{
    fmt::Display,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use axum::{body::Body, response::IntoResponse};
use catalog::{ApiError, Catalog, permissions::Principal};
use http::{HeaderMap, HeaderValue, Request, Response, header};
use tower::Layer;

#[derive(Clone)]
pub(crate) struct AuthLayer(Catalog);

impl AuthLayer {
    pub(crate) fn new(catalog: Catalog) -> Self {
        Self(catalog)
    }
}

impl<Service> Layer<Service> for AuthLayer
where
    Service: Send + Clone,
{
    type Service = AuthService<Service>;

    fn layer(&self, next: Service) -> Self::Service {
        AuthService {
            next,
            catalog: self.0.clone(),
        }
    }
}

#[derive(Clone)]
pub(crate) struct AuthService<Service> {
    next: Service,
    catalog: Catalog,
}

impl<Service, ReqBody> tower::Service<Request<ReqBody>> for AuthService<Service>
where
    Service: tower::Service<Request<ReqBody>, Response = Response<Body>> + Send + Clone + 'static,
    Service::Future: Send,
    Service::Error: Display + 'static,
    ReqBody: http_body::Body + Send + 'static,
{
    type Response = Response<Body>;
    type Error = Service::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response<Body>, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.next.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let mut next = self.next.clone();
        let catalog = self.catalog.clone();

        let (mut parts, body) = req.into_parts();

        Box::pin(async move {
            let principal = match bearer_token(&parts.headers) {
                Credential::Missing => Principal::Anonymous,
                Credential::Malformed => return Ok(with_vary(ApiError::InvalidAuthenticationToken.into_response())),
                Credential::Bearer(token) => match catalog.authenticate(&token).await {
                    Ok(user) => Principal::User(Box::new(user)),
                    Err(error) => {
                        log::debug!("Bearer token rejected: {error}");
                        return Ok(with_vary(error.into_response()));
                    }
                },
            };

            parts.extensions.insert(principal);

            let response = next.call(Request::from_parts(parts, body)).await?;

            Ok(with_vary(response))
        })
    }
}

enum Credential {
    Missing,
    Malformed,
    Bearer(String),
}

fn bearer_token(headers: &HeaderMap) -> Credential {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Credential::Missing;
    };

    let Ok(value) = value.to_str() else {
        return Credential::Malformed;
    };

    match value.split_once(' ') {
        Some(("Bearer", token)) if !token.is_empty() => Credential::Bearer(token.to_string()),
        _ => Credential::Malformed,
    }
}

// Responses differ per caller, so caches must key on the Authorization header.
fn with_vary(mut response: Response<Body>) -> Response<Body> {
    response
        .headers_mut()
        .append(header::VARY, HeaderValue::from_static("Authorization"));

    response
}
