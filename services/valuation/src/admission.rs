//! Admission gates, in the order a request meets them: blacklist, rate
//! limit (prediction only), API key.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::{ApiError, SharedState};

pub const API_KEY_HEADER: &str = "authorization";

pub async fn reject_blacklisted(
    State(st): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if st.config.ip_blacklist.contains(&addr.ip()) {
        warn!(client = %addr.ip(), path = %req.uri().path(), "blacklisted client rejected");
        return Err(ApiError::Forbidden);
    }
    Ok(next.run(req).await)
}

/// Counts every request that reaches it, whether or not its key is valid.
pub async fn enforce_rate_limit(
    State(st): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !st.limiter.check_and_record(addr.ip()).await {
        warn!(client = %addr.ip(), "rate limit exceeded");
        return Err(ApiError::RateLimited);
    }
    Ok(next.run(req).await)
}

pub async fn require_api_key(
    State(st): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let key = supplied_key(req.headers()).map(str::to_owned);
    let valid = match key {
        Some(key) => st.api_key.verify(&key).await,
        None => false,
    };
    if !valid {
        warn!(client = %addr.ip(), path = %req.uri().path(), "unauthorized access attempt");
        return Err(ApiError::Unauthorized);
    }
    Ok(next.run(req).await)
}

/// The raw header value, or the token of a `Bearer` value.
fn supplied_key(headers: &HeaderMap) -> Option<&str> {
    let raw = headers.get(API_KEY_HEADER)?.to_str().ok()?.trim();
    Some(raw.strip_prefix("Bearer ").map(str::trim).unwrap_or(raw))
}
