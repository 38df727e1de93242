//! Per-client admission control in front of every route.

use std::{
    fmt::Display,
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use axum::{body::Body, response::IntoResponse};
use catalog::ApiError;
use http::{Request, Response};
use rate_limit::RateLimiterRegistry;
use telemetry::metrics;
use tower::Layer;

use crate::client_key::client_key;

#[derive(Clone)]
pub(crate) struct AdmissionLayer {
    registry: Arc<RateLimiterRegistry>,
    trust_forwarded: bool,
}

impl AdmissionLayer {
    pub(crate) fn new(registry: Arc<RateLimiterRegistry>, trust_forwarded: bool) -> Self {
        Self {
            registry,
            trust_forwarded,
        }
    }
}

impl<Service> Layer<Service> for AdmissionLayer
where
    Service: Send + Clone,
{
    type Service = AdmissionService<Service>;

    fn layer(&self, next: Service) -> Self::Service {
        AdmissionService {
            next,
            registry: self.registry.clone(),
            trust_forwarded: self.trust_forwarded,
        }
    }
}

#[derive(Clone)]
pub(crate) struct AdmissionService<Service> {
    next: Service,
    registry: Arc<RateLimiterRegistry>,
    trust_forwarded: bool,
}

impl<Service, ReqBody> tower::Service<Request<ReqBody>> for AdmissionService<Service>
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

        // The check is synchronous, so rejected requests never reach the inner service.
        let key = client_key(&req, self.trust_forwarded);

        if self.registry.allow(&key) {
            return Box::pin(async move { next.call(req).await });
        }

        log::debug!(client = key.as_str(), method = req.method().as_str(); "Request rejected by the rate limiter");
        metrics::increment(metrics::RATE_LIMIT_REJECTED, &[]);

        Box::pin(async move { Ok(ApiError::RateLimitExceeded.into_response()) })
    }
}
