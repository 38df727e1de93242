//! Identifying clients for rate limiting.

use std::net::{IpAddr, SocketAddr};

use axum::extract::ConnectInfo;
use http::{HeaderMap, Request};

/// Key shared by every request whose origin cannot be determined.
pub(crate) const UNKNOWN_CLIENT: &str = "unknown";

/// Derives the rate limiting key of a request: the remote IP address without its port.
///
/// Forwarding headers are only consulted when `trust_forwarded` is set, since any client can
/// send them. Requests without a usable origin all share [`UNKNOWN_CLIENT`].
pub(crate) fn client_key<B>(req: &Request<B>, trust_forwarded: bool) -> String {
    if trust_forwarded && let Some(ip) = forwarded_ip(req.headers()) {
        return ip.to_string();
    }

    match req.extensions().get::<ConnectInfo<SocketAddr>>() {
        Some(ConnectInfo(address)) => address.ip().to_string(),
        None => {
            log::debug!("Request has no remote address, using the shared fallback key");
            UNKNOWN_CLIENT.to_string()
        }
    }
}

fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    // The left-most entry is the original client.
    let forwarded_for = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .and_then(|first| first.trim().parse().ok());

    forwarded_for.or_else(|| headers.get("x-real-ip")?.to_str().ok()?.trim().parse().ok())
}
