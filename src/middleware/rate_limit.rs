//! Per-client rate limiting backed by `governor` keyed token buckets.
//!
//! Requests under `/api/auth` draw from the stricter auth bucket, everything
//! else from the general bucket. Clients are keyed by the first address in
//! `x-forwarded-for`, then `x-real-ip`, then the socket address when the
//! server was started with connect info.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use scholaris_core::AppError;
use scholaris_observability::track_rate_limited;

use crate::state::AppState;

const UNKNOWN_CLIENT: &str = "unknown";

pub fn client_key(headers: &HeaderMap, remote: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    forwarded
        .or(real_ip)
        .map(str::to_string)
        .or_else(|| remote.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

fn is_auth_path(path: &str) -> bool {
    path == "/api/auth" || path.starts_with("/api/auth/")
}

pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    if !state.rate_limit_config.enabled {
        return next.run(req).await;
    }

    let remote = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = client_key(req.headers(), remote);

    let (bucket, limiter) = if is_auth_path(req.uri().path()) {
        ("auth", &state.rate_limiters.auth)
    } else {
        ("general", &state.rate_limiters.general)
    };

    if limiter.check_key(&key).is_err() {
        tracing::warn!(client = %key, bucket, "Rate limit exceeded");
        track_rate_limited(bucket);
        return AppError::too_many_requests(
            "Too many requests, please try again later".to_string(),
        )
        .into_response();
    }

    next.run(req).await
}
