//! The session resolution state machine.
//!
//! Given the credential carriers present on a request (access cookie,
//! refresh cookie, legacy fallback cookie), produces either an
//! authenticated user or a rejection reason. This is the single place
//! session decisions are made.
//!
//! Rotation policy: refresh resolution rotates the access token only.
//! The refresh token rotates solely on explicit login, so two concurrent
//! refresh resolutions from the same stale browser race benignly - both
//! mint short-lived access tokens and neither orphans a refresh token.

use axum::http::HeaderMap;

use super::cookie::{
    ACCESS_COOKIE_NAME, LEGACY_COOKIE_NAME, REFRESH_COOKIE_NAME, get_cookie, legacy_refresh_token,
};
use crate::db::{User, UserStore};
use crate::jwt::{IssuedToken, JwtConfig, TokenKind, unix_now};

/// The credential carriers extracted from a request.
#[derive(Debug, Clone, Default)]
pub struct SessionCarriers {
    pub access: Option<String>,
    pub refresh: Option<String>,
    pub legacy: Option<String>,
}

impl SessionCarriers {
    /// Pull all three carriers out of the request headers.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            access: get_cookie(headers, ACCESS_COOKIE_NAME).map(str::to_string),
            refresh: get_cookie(headers, REFRESH_COOKIE_NAME).map(str::to_string),
            legacy: get_cookie(headers, LEGACY_COOKIE_NAME).map(str::to_string),
        }
    }
}

/// A successfully resolved session.
#[derive(Debug, Clone)]
pub struct ResolvedSession {
    /// The canonical current user for downstream authorization checks.
    pub user: User,
    /// Freshly minted access token, set when the access carrier was absent,
    /// expired or malformed and the refresh path succeeded. The caller
    /// attaches it as the outgoing access cookie.
    pub rotated_access: Option<IssuedToken>,
}

/// Rejection reasons. `RefreshExpired` is distinguished from
/// `InvalidToken` so the client can route to re-login instead of retrying.
#[derive(Debug)]
pub enum SessionError {
    NoCredentials,
    RefreshExpired,
    InvalidToken,
    /// Credential store I/O failure - surfaced as a server error, never as
    /// an authentication failure.
    Store(sqlx::Error),
}

/// Resolve the session for one request.
///
/// 1. An unexpired access token goes straight to verification; a malformed
///    or expired one falls open into the refresh path.
/// 2. The refresh candidate comes from the refresh cookie, or failing that
///    from the token embedded in the legacy cookie. It must be unexpired,
///    verify against the refresh secret, name a known user, and equal the
///    refresh token currently stored on that user (replay rejection - this
///    applies to the legacy path too).
/// 3. On refresh success a new access token is minted and verified like any
///    other.
pub async fn resolve_session(
    carriers: &SessionCarriers,
    jwt: &JwtConfig,
    users: &UserStore,
) -> Result<ResolvedSession, SessionError> {
    let now = unix_now().map_err(|_| SessionError::InvalidToken)?;

    // Access fast path: only an unexpired, parseable access token skips
    // refresh resolution. Expiry is re-checked against the wall clock on
    // every request, never cached.
    if let Some(access) = &carriers.access {
        if matches!(jwt.peek_expiry(access), Ok(exp) if exp > now) {
            let user = verify_access(access, jwt, users).await?;
            return Ok(ResolvedSession {
                user,
                rotated_access: None,
            });
        }
        // Malformed or expired: fall through to the refresh path.
    }

    // Refresh resolution.
    let candidate = match (&carriers.refresh, &carriers.legacy) {
        (Some(refresh), _) => refresh.clone(),
        (None, Some(legacy)) => {
            // A present but unreadable legacy cookie is a bad credential,
            // not a missing one.
            legacy_refresh_token(legacy).ok_or(SessionError::InvalidToken)?
        }
        (None, None) => return Err(SessionError::NoCredentials),
    };

    let exp = jwt
        .peek_expiry(&candidate)
        .map_err(|_| SessionError::InvalidToken)?;
    if exp <= now {
        return Err(SessionError::RefreshExpired);
    }

    let claims = jwt
        .verify(TokenKind::Refresh, &candidate)
        .map_err(|_| SessionError::InvalidToken)?;

    let user = users
        .get_by_uuid(&claims.sub)
        .await
        .map_err(SessionError::Store)?
        .ok_or(SessionError::InvalidToken)?;

    // Trust check: the candidate must still be the stored refresh token.
    // A token surviving its own rotation (stale cookie replay) is rejected,
    // regardless of which carrier delivered it.
    if user.refresh_token.as_deref() != Some(candidate.as_str()) {
        return Err(SessionError::InvalidToken);
    }

    let rotated = jwt
        .issue(TokenKind::Access, &user.uuid)
        .map_err(|_| SessionError::InvalidToken)?;

    // The rotated token goes through the same verification as any other.
    let user = verify_access(&rotated.token, jwt, users).await?;

    Ok(ResolvedSession {
        user,
        rotated_access: Some(rotated),
    })
}

async fn verify_access(
    token: &str,
    jwt: &JwtConfig,
    users: &UserStore,
) -> Result<User, SessionError> {
    let claims = jwt
        .verify(TokenKind::Access, token)
        .map_err(|_| SessionError::InvalidToken)?;

    users
        .get_by_uuid(&claims.sub)
        .await
        .map_err(SessionError::Store)?
        .ok_or(SessionError::InvalidToken)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::jwt::Claims;
    use jsonwebtoken::{EncodingKey, Header};

    const ACCESS_SECRET: &[u8] = b"access-secret-for-resolver-tests";
    const REFRESH_SECRET: &[u8] = b"refresh-secret-for-resolver-tests";

    async fn setup() -> (Database, JwtConfig, String) {
        let db = Database::open(":memory:").await.unwrap();
        let jwt = JwtConfig::new(ACCESS_SECRET, REFRESH_SECRET);
        db.users()
            .create("uuid-1", "Alice", "alice@example.com", "phc-hash")
            .await
            .unwrap();
        (db, jwt, "uuid-1".to_string())
    }

    /// Mint a refresh token and store it as the user's current one.
    async fn store_refresh(db: &Database, jwt: &JwtConfig, uuid: &str) -> String {
        let issued = jwt.issue(TokenKind::Refresh, uuid).unwrap();
        db.users()
            .set_refresh_token(uuid, Some(&issued.token))
            .await
            .unwrap();
        issued.token
    }

    /// Encode claims directly, bypassing the codec, to build expired or
    /// foreign tokens.
    fn raw_token(secret: &[u8], sub: &str, kind: TokenKind, exp_offset: i64) -> String {
        let now = unix_now().unwrap() as i64;
        let claims = Claims {
            sub: sub.to_string(),
            kind,
            iat: (now - 1000) as u64,
            exp: (now + exp_offset) as u64,
        };
        jsonwebtoken::encode(&Header::default(), &claims, &EncodingKey::from_secret(secret))
            .unwrap()
    }

    fn legacy_cookie_value(refresh_token: &str) -> String {
        let json = serde_json::json!({
            "name": "Alice",
            "email": "alice@example.com",
            "refreshToken": refresh_token,
        })
        .to_string();
        percent_encoding::utf8_percent_encode(&json, percent_encoding::NON_ALPHANUMERIC).to_string()
    }

    #[tokio::test]
    async fn test_valid_access_token() {
        let (db, jwt, uuid) = setup().await;
        let access = jwt.issue(TokenKind::Access, &uuid).unwrap();

        let carriers = SessionCarriers {
            access: Some(access.token),
            ..Default::default()
        };
        let session = resolve_session(&carriers, &jwt, &db.users()).await.unwrap();
        assert_eq!(session.user.uuid, uuid);
        assert!(session.rotated_access.is_none());
    }

    #[tokio::test]
    async fn test_no_credentials() {
        let (db, jwt, _) = setup().await;
        let result = resolve_session(&SessionCarriers::default(), &jwt, &db.users()).await;
        assert!(matches!(result, Err(SessionError::NoCredentials)));
    }

    #[tokio::test]
    async fn test_expired_access_with_valid_refresh_rotates() {
        let (db, jwt, uuid) = setup().await;
        let refresh = store_refresh(&db, &jwt, &uuid).await;
        let expired_access = raw_token(ACCESS_SECRET, &uuid, TokenKind::Access, -10);

        let carriers = SessionCarriers {
            access: Some(expired_access),
            refresh: Some(refresh),
            ..Default::default()
        };
        let session = resolve_session(&carriers, &jwt, &db.users()).await.unwrap();
        assert_eq!(session.user.uuid, uuid);

        let rotated = session.rotated_access.expect("access token rotated");
        assert!(jwt.verify(TokenKind::Access, &rotated.token).is_ok());
    }

    #[tokio::test]
    async fn test_rotation_yields_fresh_tokens_for_same_user() {
        let (db, jwt, uuid) = setup().await;
        let refresh = store_refresh(&db, &jwt, &uuid).await;

        let carriers = SessionCarriers {
            refresh: Some(refresh),
            ..Default::default()
        };
        let first = resolve_session(&carriers, &jwt, &db.users()).await.unwrap();
        // Force distinct iat/exp so the encoded tokens differ.
        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
        let second = resolve_session(&carriers, &jwt, &db.users()).await.unwrap();

        let t1 = first.rotated_access.unwrap();
        let t2 = second.rotated_access.unwrap();
        assert_ne!(t1.token, t2.token);
        assert_eq!(first.user.uuid, second.user.uuid);
        // Both remain independently valid: access tokens are not single-use.
        assert!(jwt.verify(TokenKind::Access, &t1.token).is_ok());
        assert!(jwt.verify(TokenKind::Access, &t2.token).is_ok());
    }

    #[tokio::test]
    async fn test_malformed_access_falls_open_to_refresh() {
        let (db, jwt, uuid) = setup().await;
        let refresh = store_refresh(&db, &jwt, &uuid).await;

        let carriers = SessionCarriers {
            access: Some("garbage".to_string()),
            refresh: Some(refresh),
            ..Default::default()
        };
        let session = resolve_session(&carriers, &jwt, &db.users()).await.unwrap();
        assert_eq!(session.user.uuid, uuid);
        assert!(session.rotated_access.is_some());
    }

    #[tokio::test]
    async fn test_unexpired_access_with_bad_signature_rejected() {
        let (db, jwt, uuid) = setup().await;
        // Unexpired, so the fast path takes it; verification then fails and
        // the refresh path is NOT consulted.
        let forged = raw_token(b"some-other-secret", &uuid, TokenKind::Access, 600);
        let refresh = store_refresh(&db, &jwt, &uuid).await;

        let carriers = SessionCarriers {
            access: Some(forged),
            refresh: Some(refresh),
            ..Default::default()
        };
        let result = resolve_session(&carriers, &jwt, &db.users()).await;
        assert!(matches!(result, Err(SessionError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_refresh_expired_is_distinguished() {
        let (db, jwt, uuid) = setup().await;
        let expired_refresh = raw_token(REFRESH_SECRET, &uuid, TokenKind::Refresh, -10);
        db.users()
            .set_refresh_token(&uuid, Some(&expired_refresh))
            .await
            .unwrap();

        let carriers = SessionCarriers {
            refresh: Some(expired_refresh),
            ..Default::default()
        };
        let result = resolve_session(&carriers, &jwt, &db.users()).await;
        assert!(matches!(result, Err(SessionError::RefreshExpired)));
    }

    #[tokio::test]
    async fn test_refresh_expiry_boundary_is_exclusive() {
        let (db, jwt, uuid) = setup().await;
        let boundary_refresh = raw_token(REFRESH_SECRET, &uuid, TokenKind::Refresh, 0);
        db.users()
            .set_refresh_token(&uuid, Some(&boundary_refresh))
            .await
            .unwrap();

        let carriers = SessionCarriers {
            refresh: Some(boundary_refresh),
            ..Default::default()
        };
        let result = resolve_session(&carriers, &jwt, &db.users()).await;
        assert!(matches!(result, Err(SessionError::RefreshExpired)));
    }

    #[tokio::test]
    async fn test_replayed_refresh_rejected() {
        let (db, jwt, uuid) = setup().await;
        let old_refresh = store_refresh(&db, &jwt, &uuid).await;
        // Another session rotates the stored token; the old cookie is now a
        // replay even though its signature and expiry are still valid.
        db.users()
            .set_refresh_token(&uuid, Some("a-newer-token"))
            .await
            .unwrap();

        let carriers = SessionCarriers {
            refresh: Some(old_refresh),
            ..Default::default()
        };
        let result = resolve_session(&carriers, &jwt, &db.users()).await;
        assert!(matches!(result, Err(SessionError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_mis_signed_refresh_rejected() {
        let (db, jwt, uuid) = setup().await;
        let forged = raw_token(b"attacker-secret", &uuid, TokenKind::Refresh, 600);
        db.users()
            .set_refresh_token(&uuid, Some(&forged))
            .await
            .unwrap();

        let carriers = SessionCarriers {
            refresh: Some(forged),
            ..Default::default()
        };
        let result = resolve_session(&carriers, &jwt, &db.users()).await;
        assert!(matches!(result, Err(SessionError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_refresh_for_unknown_user_rejected() {
        let (db, jwt, _) = setup().await;
        let refresh = jwt.issue(TokenKind::Refresh, "ghost-uuid").unwrap();

        let carriers = SessionCarriers {
            refresh: Some(refresh.token),
            ..Default::default()
        };
        let result = resolve_session(&carriers, &jwt, &db.users()).await;
        assert!(matches!(result, Err(SessionError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_legacy_fallback_authenticates() {
        let (db, jwt, uuid) = setup().await;
        let refresh = store_refresh(&db, &jwt, &uuid).await;

        let carriers = SessionCarriers {
            legacy: Some(legacy_cookie_value(&refresh)),
            ..Default::default()
        };
        let session = resolve_session(&carriers, &jwt, &db.users()).await.unwrap();
        assert_eq!(session.user.uuid, uuid);
        assert!(session.rotated_access.is_some());
    }

    #[tokio::test]
    async fn test_legacy_path_applies_replay_check() {
        let (db, jwt, uuid) = setup().await;
        let old_refresh = store_refresh(&db, &jwt, &uuid).await;
        db.users()
            .set_refresh_token(&uuid, Some("a-newer-token"))
            .await
            .unwrap();

        // The legacy snapshot still embeds the superseded token.
        let carriers = SessionCarriers {
            legacy: Some(legacy_cookie_value(&old_refresh)),
            ..Default::default()
        };
        let result = resolve_session(&carriers, &jwt, &db.users()).await;
        assert!(matches!(result, Err(SessionError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_legacy_cookie_unparseable() {
        let (db, jwt, _) = setup().await;

        let carriers = SessionCarriers {
            legacy: Some("definitely-not-json".to_string()),
            ..Default::default()
        };
        let result = resolve_session(&carriers, &jwt, &db.users()).await;
        assert!(matches!(result, Err(SessionError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_refresh_cookie_wins_over_legacy() {
        let (db, jwt, uuid) = setup().await;
        let refresh = store_refresh(&db, &jwt, &uuid).await;

        // Legacy carries stale garbage; the dedicated cookie is used.
        let carriers = SessionCarriers {
            refresh: Some(refresh),
            legacy: Some("stale-garbage".to_string()),
            ..Default::default()
        };
        let session = resolve_session(&carriers, &jwt, &db.users()).await.unwrap();
        assert_eq!(session.user.uuid, uuid);
    }
}
