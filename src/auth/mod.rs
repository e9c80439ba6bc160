//! Credential and session lifecycle management.
//!
//! Dual-token system: short-lived access tokens (stateless) and long-lived
//! refresh tokens, of which exactly one per user is valid - the one stored
//! on the user record. An expired access token is transparently rotated
//! when a valid refresh carrier (dedicated cookie or legacy client-composed
//! cookie) accompanies the request.

mod cookie;
mod errors;
mod extractors;
mod gate;
mod issuer;
mod resolver;
mod state;

pub use cookie::{
    ACCESS_COOKIE_NAME, LEGACY_COOKIE_NAME, REFRESH_COOKIE_NAME, auth_cookie, clear_cookie,
    get_cookie, legacy_refresh_token,
};
pub use errors::{ApiAuthError, AuthErrorKind};
pub use extractors::{
    AdminAuth, Auth, ROTATED_ACCESS_COOKIE, propagate_rotated_access_cookie,
};
pub use gate::require_role;
pub use issuer::{IssueError, SessionTokens, issue_session};
pub use resolver::{ResolvedSession, SessionCarriers, SessionError, resolve_session};
pub use state::HasAuthState;
