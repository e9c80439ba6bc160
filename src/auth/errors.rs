//! Authentication and authorization error types.
//!
//! Every failure maps to a safe reason code; internal detail (store errors,
//! token contents) is logged server-side and never sent to the caller.
//! `refresh_expired` is the distinguished code the client uses to route the
//! user to a full re-login instead of retrying.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Internal error kind used by the session resolver and the role gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// No credential carrier was present on the request
    NoCredentials,
    /// The refresh token (or embedded legacy token) has expired; the
    /// caller must go through a full re-login
    RefreshExpired,
    /// Malformed, mis-signed, wrong-kind, unknown-subject or replayed token
    InvalidToken,
    /// The session is valid but the user lacks the required role
    Forbidden,
    /// Credential store I/O failure. Never reinterpreted as
    /// unauthenticated: a storage outage must not log out live sessions.
    StoreUnavailable,
}

impl AuthErrorKind {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthErrorKind::NoCredentials
            | AuthErrorKind::RefreshExpired
            | AuthErrorKind::InvalidToken => StatusCode::UNAUTHORIZED,
            AuthErrorKind::Forbidden => StatusCode::FORBIDDEN,
            AuthErrorKind::StoreUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable reason code sent to the client.
    pub fn code(&self) -> &'static str {
        match self {
            AuthErrorKind::NoCredentials => "no_credentials",
            AuthErrorKind::RefreshExpired => "refresh_expired",
            AuthErrorKind::InvalidToken => "invalid_token",
            AuthErrorKind::Forbidden => "forbidden",
            AuthErrorKind::StoreUnavailable => "store_unavailable",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            AuthErrorKind::NoCredentials => "Not authenticated",
            AuthErrorKind::RefreshExpired => "Refresh token expired",
            AuthErrorKind::InvalidToken => "Invalid token",
            AuthErrorKind::Forbidden => "Insufficient permissions",
            AuthErrorKind::StoreUnavailable => "Credential store unavailable",
        }
    }
}

/// HTTP-facing authentication error.
#[derive(Debug)]
pub struct ApiAuthError(pub AuthErrorKind);

impl From<AuthErrorKind> for ApiAuthError {
    fn from(kind: AuthErrorKind) -> Self {
        Self(kind)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    code: &'static str,
}

impl IntoResponse for ApiAuthError {
    fn into_response(self) -> Response {
        (
            self.0.status_code(),
            Json(ErrorBody {
                error: self.0.message(),
                code: self.0.code(),
            }),
        )
            .into_response()
    }
}
