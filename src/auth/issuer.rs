//! Session issuance: mint both tokens and persist the refresh token.
//!
//! Called on login, registration and identity-provider sign-in. Overwriting
//! the stored refresh token is the single point of session invalidation:
//! every previously issued refresh token stops working here.

use super::cookie::{ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME, auth_cookie};
use crate::db::UserStore;
use crate::jwt::{IssuedToken, JwtConfig, JwtError, TokenKind};

/// Both tokens of a freshly issued session.
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

impl SessionTokens {
    /// Cookie values for transport: http-only, cross-site-capable, max-age
    /// equal to each token's TTL.
    pub fn cookies(&self, secure: bool) -> (String, String) {
        (
            auth_cookie(ACCESS_COOKIE_NAME, &self.access.token, self.access.ttl, secure),
            auth_cookie(
                REFRESH_COOKIE_NAME,
                &self.refresh.token,
                self.refresh.ttl,
                secure,
            ),
        )
    }
}

/// Errors from issuing a session.
#[derive(Debug)]
pub enum IssueError {
    /// Token minting failed
    Token(JwtError),
    /// The user record does not exist
    UserNotFound,
    /// Credential store I/O failure
    Store(sqlx::Error),
}

impl std::fmt::Display for IssueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueError::Token(e) => write!(f, "Failed to mint token: {}", e),
            IssueError::UserNotFound => write!(f, "User not found"),
            IssueError::Store(e) => write!(f, "Credential store error: {}", e),
        }
    }
}

impl std::error::Error for IssueError {}

/// Mint a fresh access/refresh pair for a user and persist the refresh
/// token on the user record, overwriting any prior value.
pub async fn issue_session(
    jwt: &JwtConfig,
    users: &UserStore,
    user_uuid: &str,
) -> Result<SessionTokens, IssueError> {
    let access = jwt
        .issue(TokenKind::Access, user_uuid)
        .map_err(IssueError::Token)?;
    let refresh = jwt
        .issue(TokenKind::Refresh, user_uuid)
        .map_err(IssueError::Token)?;

    let updated = users
        .set_refresh_token(user_uuid, Some(&refresh.token))
        .await
        .map_err(IssueError::Store)?;
    if !updated {
        return Err(IssueError::UserNotFound);
    }

    Ok(SessionTokens { access, refresh })
}
