// Helper functions for safe logging, token generation and request inspection

use axum::http::{header, HeaderMap};
use chrono::{DateTime, SecondsFormat, Utc};
use rand::RngCore;
use regex::{Captures, Regex};
use std::sync::OnceLock;
use subtle::ConstantTimeEq;

/// Masks email addresses for safe logging
/// Prevents sensitive data exposure while preserving debugging utility
///
/// # Example
/// ```ignore
/// let masked = safe_email_log("user@example.com");
/// // Returns: "u***@example.com"
/// ```
pub fn safe_email_log(email: &str) -> String {
    let parts: Vec<&str> = email.split('@').collect();
    if email.len() > 3 && parts.len() == 2 {
        match parts[0].chars().next() {
            Some(first) => format!("{}***@{}", first, parts[1]),
            None => format!("***@{}", parts[1]),
        }
    } else {
        "***@***.***".to_string()
    }
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}")
            .expect("email redaction pattern is valid")
    })
}

/// Replaces every email address in free text with its masked form.
/// Applied to audit log details before they are stored.
pub fn redact_emails(text: &str) -> String {
    email_pattern()
        .replace_all(text, |caps: &Captures| safe_email_log(&caps[0]))
        .into_owned()
}

/// Random token of `bytes` bytes, hex encoded
pub fn random_hex(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut buf);
    hex::encode(buf)
}

/// Constant-time string comparison for secrets (CSRF tokens, OAuth state)
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// True when the client expects a JSON answer rather than an HTML page
pub fn wants_json(headers: &HeaderMap) -> bool {
    let header_contains = |name: header::HeaderName, needle: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_ascii_lowercase().contains(needle))
            .unwrap_or(false)
    };

    let is_xhr = headers
        .get("x-requested-with")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("xmlhttprequest"))
        .unwrap_or(false);

    is_xhr
        || header_contains(header::ACCEPT, "application/json")
        || header_contains(header::CONTENT_TYPE, "application/json")
}

/// Current time as RFC 3339 UTC with second precision ("2024-01-01T10:00:00Z")
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parses an RFC 3339 timestamp and normalises it to UTC with a `Z` suffix,
/// so stored timestamps compare correctly as strings.
pub fn normalize_timestamp(input: &str) -> Option<String> {
    DateTime::parse_from_rfc3339(input.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// `2024-06-01T18:00:00Z` -> `Sat 1 Jun 2024, 18:00 UTC`; unparseable input is returned as is
pub fn display_time(timestamp: &str) -> String {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|t| t.with_timezone(&Utc).format("%a %-d %b %Y, %H:%M UTC").to_string())
        .unwrap_or_else(|_| timestamp.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_safe_email_log_masks_local_part() {
        assert_eq!(safe_email_log("user@example.com"), "u***@example.com");
        assert_eq!(safe_email_log("bad"), "***@***.***");
        assert_eq!(safe_email_log("no-at-sign-here"), "***@***.***");
    }

    #[test]
    fn test_redact_emails_in_free_text() {
        let redacted = redact_emails("login denied for Alice@Example.com from 10.0.0.1");
        assert_eq!(redacted, "login denied for A***@Example.com from 10.0.0.1");
        assert!(!redacted.contains("Alice"));
    }

    #[test]
    fn test_random_hex_length_and_uniqueness() {
        let a = random_hex(32);
        let b = random_hex(32);
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "abcd"));
        assert!(!constant_time_eq("", "a"));
    }

    #[test]
    fn test_wants_json_detection() {
        let mut headers = HeaderMap::new();
        assert!(!wants_json(&headers));

        headers.insert("x-requested-with", HeaderValue::from_static("XMLHttpRequest"));
        assert!(wants_json(&headers));

        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        assert!(wants_json(&headers));
    }

    #[test]
    fn test_normalize_timestamp() {
        assert_eq!(
            normalize_timestamp("2024-03-01T10:00:00+02:00").as_deref(),
            Some("2024-03-01T08:00:00Z")
        );
        assert!(normalize_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_display_time() {
        assert_eq!(display_time("2024-06-01T18:00:00Z"), "Sat 1 Jun 2024, 18:00 UTC");
        assert_eq!(display_time("2024-06-01T20:00:00+02:00"), "Sat 1 Jun 2024, 18:00 UTC");
        assert_eq!(display_time("soon"), "soon");
    }
}
