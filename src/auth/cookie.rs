//! Cookie parsing and building for authentication.

use axum::http::header;
use percent_encoding::percent_decode_str;

/// Cookie name for the access token (short-lived).
pub const ACCESS_COOKIE_NAME: &str = "accessToken";

/// Cookie name for the refresh token (long-lived).
pub const REFRESH_COOKIE_NAME: &str = "refreshToken";

/// Cookie name for the legacy client-composed session snapshot.
/// Written by the client after login, never by the server; consumed only
/// as a fallback source of a refresh token.
pub const LEGACY_COOKIE_NAME: &str = "userInfo";

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a axum::http::HeaderMap, name: &str) -> Option<&'a str> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in cookie_header.split(';') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            if key.trim() == name {
                return Some(value.trim());
            }
        }
    }
    None
}

/// Extract the refresh token embedded in the legacy cookie value.
/// The value is percent-encoded JSON of `{user fields, refreshToken}`.
/// The embedded token is advisory only; it goes through the same
/// validation as a first-class refresh cookie.
pub fn legacy_refresh_token(raw: &str) -> Option<String> {
    let decoded = percent_decode_str(raw).decode_utf8().ok()?;
    let value: serde_json::Value = serde_json::from_str(&decoded).ok()?;
    value
        .get("refreshToken")
        .and_then(|t| t.as_str())
        .map(str::to_string)
}

/// Build a Set-Cookie value for an auth token.
/// Cross-site capable (SameSite=None) requires Secure; local HTTP
/// development falls back to SameSite=Lax.
pub fn auth_cookie(name: &str, value: &str, max_age: u64, secure: bool) -> String {
    if secure {
        format!(
            "{}={}; HttpOnly; SameSite=None; Path=/; Max-Age={}; Secure",
            name, value, max_age
        )
    } else {
        format!(
            "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
            name, value, max_age
        )
    }
}

/// Build a Set-Cookie value that clears an auth cookie.
pub fn clear_cookie(name: &str, secure: bool) -> String {
    auth_cookie(name, "", 0, secure)
}
