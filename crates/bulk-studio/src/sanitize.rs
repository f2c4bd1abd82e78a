//! Helpers for sanitizing data before it enters tracing span attributes.
//!
//! Logs are safe to share for debugging: these functions keep full local
//! paths and credentials out of spans.

use std::path::Path;

/// Returns only the filename component of a path (no directory).
///
/// Safe for span fields. Reveals the file name without exposing the full path.
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Strips userinfo and query parameters from a service URL.
///
/// - `https://user:pw@host/v1?key=abc` → `https://****@host/v1`
/// - `https://host/v1?key=abc` → `https://host/v1`
pub fn redact_url(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);

    if let Some(scheme_end) = without_query.find("://") {
        let after_scheme = &without_query[scheme_end + 3..];
        let authority_end = after_scheme.find('/').unwrap_or(after_scheme.len());
        if let Some(at_pos) = after_scheme[..authority_end].find('@') {
            let scheme = &without_query[..scheme_end + 3];
            let after_at = &after_scheme[at_pos + 1..];
            return format!("{}****@{}", scheme, after_at);
        }
    }

    without_query.to_string()
}
