pub mod auth;
pub mod sessions;

use std::net::SocketAddr;

use axum::http::HeaderMap;

/// Client address and User-Agent for session bookkeeping. The rate-limiting
/// reverse proxy in front of this service sets `x-forwarded-for`; without a
/// proxy the socket peer address is used.
pub(crate) fn client_meta(headers: &HeaderMap, peer: SocketAddr) -> (String, String) {
    let ip = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_owned())
        .unwrap_or_else(|| peer.ip().to_string());
    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    (ip, user_agent)
}
