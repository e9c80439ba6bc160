//! Axum extractors wiring the session resolver into request handling.
//!
//! The resolver returns a value; nothing mutates shared request state.
//! When resolution rotates the access token, the new cookie travels to the
//! response through a task-local cell drained by
//! `propagate_rotated_access_cookie`.

use std::cell::RefCell;

use axum::{
    extract::{FromRequestParts, Request},
    http::{HeaderValue, header::SET_COOKIE, request::Parts},
    middleware::Next,
    response::Response,
};

use super::cookie::{ACCESS_COOKIE_NAME, auth_cookie};
use super::errors::{ApiAuthError, AuthErrorKind};
use super::gate::require_role;
use super::resolver::{ResolvedSession, SessionCarriers, SessionError, resolve_session};
use super::state::HasAuthState;
use crate::db::{User, UserRole};

tokio::task_local! {
    /// Task-local storage for the rotated access token cookie.
    /// Written by the auth extractors, drained by the response middleware.
    pub static ROTATED_ACCESS_COOKIE: RefCell<Option<String>>;
}

impl From<SessionError> for AuthErrorKind {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NoCredentials => AuthErrorKind::NoCredentials,
            SessionError::RefreshExpired => AuthErrorKind::RefreshExpired,
            SessionError::InvalidToken => AuthErrorKind::InvalidToken,
            SessionError::Store(e) => {
                tracing::error!(error = %e, "Credential store failure during session resolution");
                AuthErrorKind::StoreUnavailable
            }
        }
    }
}

/// Resolve the session from the request and stash a rotated access cookie
/// for the response middleware, if any.
async fn authenticate<S>(parts: &Parts, state: &S) -> Result<User, AuthErrorKind>
where
    S: HasAuthState + Send + Sync,
{
    let carriers = SessionCarriers::from_headers(&parts.headers);
    let ResolvedSession {
        user,
        rotated_access,
    } = resolve_session(&carriers, state.jwt(), &state.db().users()).await?;

    if let Some(rotated) = rotated_access {
        let cookie = auth_cookie(
            ACCESS_COOKIE_NAME,
            &rotated.token,
            rotated.ttl,
            state.secure_cookies(),
        );
        let _ = ROTATED_ACCESS_COOKIE.try_with(|cell| {
            cell.borrow_mut().replace(cookie);
        });
    }

    Ok(user)
}

/// Extractor for endpoints that require an authenticated session.
/// Transparently rotates an expired access token when a valid refresh
/// carrier is present.
pub struct Auth(pub User);

impl<S> FromRequestParts<S> for Auth
where
    S: HasAuthState + Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authenticate(parts, state)
            .await
            .map(Auth)
            .map_err(ApiAuthError::from)
    }
}

/// Extractor for admin-only endpoints: the role gate layered after
/// session resolution.
pub struct AdminAuth(pub User);

impl<S> FromRequestParts<S> for AdminAuth
where
    S: HasAuthState + Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = authenticate(parts, state).await.map_err(ApiAuthError::from)?;
        require_role(&user, UserRole::Admin).map_err(ApiAuthError::from)?;
        Ok(AdminAuth(user))
    }
}

/// Response middleware appending the rotated access token cookie, if the
/// auth extractor minted one while handling this request.
pub async fn propagate_rotated_access_cookie(request: Request, next: Next) -> Response {
    ROTATED_ACCESS_COOKIE
        .scope(RefCell::new(None), async move {
            let mut response = next.run(request).await;

            let rotated = ROTATED_ACCESS_COOKIE.with(|cell| cell.borrow_mut().take());
            if let Some(cookie) = rotated {
                if let Ok(value) = HeaderValue::from_str(&cookie) {
                    response.headers_mut().append(SET_COOKIE, value);
                }
            }

            response
        })
        .await
}
