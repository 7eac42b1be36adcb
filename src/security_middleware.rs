// src/security_middleware.rs
//! Hardening headers and the per-request CSP nonce

use axum::{
    extract::{Extension, Request},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;

use crate::common::SharedState;

/// Nonce allowed by this response's Content-Security-Policy
#[derive(Debug, Clone)]
pub struct CspNonce(pub String);

impl CspNonce {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(STANDARD.encode(bytes))
    }
}

pub fn content_security_policy(nonce: &str) -> String {
    [
        "default-src 'self'".to_string(),
        format!("script-src 'self' 'nonce-{}'", nonce),
        format!("style-src 'self' 'nonce-{}'", nonce),
        "img-src 'self' data: https://*.googleusercontent.com".to_string(),
        "connect-src 'self'".to_string(),
        "font-src 'self'".to_string(),
        "object-src 'none'".to_string(),
        "base-uri 'self'".to_string(),
        "form-action 'self' https://accounts.google.com".to_string(),
        "frame-ancestors 'none'".to_string(),
        "report-uri /csp-report".to_string(),
    ]
    .join("; ")
}

fn set(headers: &mut HeaderMap, name: &'static str, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(HeaderName::from_static(name), value);
    }
}

pub fn apply_security_headers(headers: &mut HeaderMap, nonce: &str, send_hsts: bool) {
    set(headers, "content-security-policy", &content_security_policy(nonce));
    set(headers, "x-frame-options", "DENY");
    set(headers, "x-content-type-options", "nosniff");
    set(headers, "referrer-policy", "strict-origin-when-cross-origin");
    set(
        headers,
        "permissions-policy",
        "camera=(), microphone=(), geolocation=(), payment=()",
    );
    if send_hsts {
        set(
            headers,
            "strict-transport-security",
            "max-age=31536000; includeSubDomains",
        );
    }
}

pub async fn security_headers_middleware(
    Extension(state_lock): Extension<SharedState>,
    mut request: Request,
    next: Next,
) -> Response {
    let send_hsts = state_lock.read().await.dev_mode.send_hsts();

    let nonce = CspNonce::generate();
    request.extensions_mut().insert(nonce.clone());

    let mut response = next.run(request).await;
    apply_security_headers(response.headers_mut(), &nonce.0, send_hsts);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonces_are_unique() {
        let a = CspNonce::generate();
        let b = CspNonce::generate();
        assert_ne!(a.0, b.0);
        assert_eq!(a.0.len(), 24);
    }

    #[test]
    fn test_policy_carries_nonce_and_report_uri() {
        let policy = content_security_policy("abc==");
        assert!(policy.contains("script-src 'self' 'nonce-abc=='"));
        assert!(policy.contains("report-uri /csp-report"));
        assert!(policy.contains("frame-ancestors 'none'"));
    }

    #[test]
    fn test_hsts_only_when_requested() {
        let mut headers = HeaderMap::new();
        apply_security_headers(&mut headers, "n", false);
        assert!(headers.get("strict-transport-security").is_none());
        assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
        assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");

        apply_security_headers(&mut headers, "n", true);
        assert!(headers.get("strict-transport-security").is_some());
    }
}
