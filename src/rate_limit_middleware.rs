// rate_limit_middleware.rs
use crate::common::SharedState;
use crate::services::audit::RequestMeta;
use crate::services::rate_limit::{RateLimitResult, RateLimitService};
use axum::{
    extract::{ConnectInfo, Extension, Request},
    http::{Extensions, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::net::{IpAddr, SocketAddr};
use tracing::{debug, warn};

#[derive(Serialize)]
struct RateLimitErrorResponse {
    error: String,
    code: String,
    retry_after: u64,
}

/// Client address for this request, resolved once by `client_ip_middleware`
#[derive(Debug, Clone, PartialEq)]
pub struct ClientIp(pub String);

/// Resolve the client address from the connecting peer.
///
/// Proxy headers are only believed when the peer itself is a trusted proxy.
/// X-Forwarded-For is then walked from the right, skipping trusted hops, so a
/// client cannot pick its own address by prepending entries.
pub fn resolve_client_ip(
    headers: &HeaderMap,
    peer: Option<IpAddr>,
    trusted_proxies: &[IpAddr],
) -> Option<String> {
    let peer = peer?;
    if !trusted_proxies.contains(&peer) {
        return Some(peer.to_string());
    }

    if let Some(forwarded) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        for hop in forwarded.rsplit(',').map(str::trim) {
            match hop.parse::<IpAddr>() {
                Ok(ip) if trusted_proxies.contains(&ip) => continue,
                Ok(ip) => return Some(ip.to_string()),
                Err(_) => break,
            }
        }
    }

    if let Some(real_ip) = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<IpAddr>().ok())
    {
        return Some(real_ip.to_string());
    }

    Some(peer.to_string())
}

/// The resolved client address, or the raw peer when the resolving layer
/// did not run. Headers are never consulted here.
pub fn client_ip(extensions: &Extensions) -> Option<String> {
    extensions
        .get::<ClientIp>()
        .map(|ip| ip.0.clone())
        .or_else(|| {
            extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|info| info.0.ip().to_string())
        })
}

/// Stores the request's `ClientIp` for the rate limiter and audit log
pub async fn client_ip_middleware(
    Extension(state_lock): Extension<SharedState>,
    mut request: Request,
    next: Next,
) -> Response {
    let trusted_proxies = state_lock
        .read()
        .await
        .rate_limit_service
        .config()
        .trusted_proxies
        .clone();

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip());

    if let Some(ip) = resolve_client_ip(request.headers(), peer, &trusted_proxies) {
        request.extensions_mut().insert(ClientIp(ip));
    }

    next.run(request).await
}

/// Per-IP, per-path fixed window limiter for the guarded endpoints.
/// Storage failures let the request through.
pub async fn rate_limit_middleware(
    Extension(state_lock): Extension<SharedState>,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let path = request.uri().path().to_string();

    if !RateLimitService::applies_to(&path) {
        return Ok(next.run(request).await);
    }

    let state = state_lock.read().await.clone();
    let ip_address = client_ip(request.extensions()).unwrap_or_else(|| "unknown".to_string());

    match state
        .rate_limit_service
        .check_rate_limit(&path, &ip_address)
        .await
    {
        Ok(RateLimitResult::Allowed) => {
            debug!(ip = %ip_address, path = %path, "Request allowed by rate limiter");
            Ok(next.run(request).await)
        }
        Ok(RateLimitResult::Limited { retry_after }) => {
            warn!(
                ip = %ip_address,
                path = %path,
                retry_after = retry_after,
                "Request blocked by rate limiter"
            );

            let (parts, _body) = request.into_parts();
            state
                .audit
                .record(
                    "security.rate_limited",
                    None,
                    &format!("Rate limit exceeded on {}", path),
                    &RequestMeta::from_parts(&parts),
                )
                .await;

            let error_response = RateLimitErrorResponse {
                error: "Rate limit exceeded. Please try again later.".to_string(),
                code: "RATE_LIMIT_EXCEEDED".to_string(),
                retry_after,
            };

            let mut response =
                (StatusCode::TOO_MANY_REQUESTS, Json(error_response)).into_response();

            if let Ok(retry_header) = HeaderValue::from_str(&retry_after.to_string()) {
                response.headers_mut().insert("retry-after", retry_header);
            }

            Err(response)
        }
        Err(e) => {
            warn!(
                error = %e,
                path = %path,
                "Error checking rate limit, allowing request"
            );
            Ok(next.run(request).await)
        }
    }
}
