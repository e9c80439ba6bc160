//! Token encoding, decoding and verification.
//!
//! Two token kinds with independent signing secrets:
//! - Access tokens: short-lived, stateless, verified on every request
//! - Refresh tokens: long-lived, the single valid value is stored on the
//!   user record and checked by the session resolver
//!
//! The expiry boundary is exclusive: a token whose `exp` equals the current
//! time is already expired.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Default access token duration: 10 minutes
pub const DEFAULT_ACCESS_TTL_SECS: u64 = 10 * 60;

/// Default refresh token duration: 30 days
pub const DEFAULT_REFRESH_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// Token kind for distinguishing access vs refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Short-lived access token - stateless, validity is signature + expiry
    Access,
    /// Long-lived refresh token - the stored copy on the user record is the
    /// only valid one
    Refresh,
}

/// JWT claims shared by both token kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user UUID)
    pub sub: String,
    /// Token kind
    #[serde(rename = "typ")]
    pub kind: TokenKind,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp, exclusive)
    pub exp: u64,
}

/// A freshly minted token with its transport metadata.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The encoded JWT string
    pub token: String,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: u64,
    /// Token duration in seconds (cookie max-age)
    pub ttl: u64,
}

/// Configuration for token operations. Pure over the configured secrets;
/// the only inputs are the token string and the wall clock.
#[derive(Clone)]
pub struct JwtConfig {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: u64,
    refresh_ttl: u64,
}

impl JwtConfig {
    /// Create a new configuration with one secret per token kind and the
    /// default TTLs. An access token never validates as a refresh token or
    /// vice versa: the secrets differ and the `typ` claim is checked.
    pub fn new(access_secret: &[u8], refresh_secret: &[u8]) -> Self {
        Self::with_ttls(
            access_secret,
            refresh_secret,
            DEFAULT_ACCESS_TTL_SECS,
            DEFAULT_REFRESH_TTL_SECS,
        )
    }

    /// Create a configuration with explicit token TTLs.
    pub fn with_ttls(
        access_secret: &[u8],
        refresh_secret: &[u8],
        access_ttl: u64,
        refresh_ttl: u64,
    ) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(access_secret),
            access_decoding: DecodingKey::from_secret(access_secret),
            refresh_encoding: EncodingKey::from_secret(refresh_secret),
            refresh_decoding: DecodingKey::from_secret(refresh_secret),
            access_ttl,
            refresh_ttl,
        }
    }

    /// Configured access token TTL in seconds.
    pub fn access_ttl(&self) -> u64 {
        self.access_ttl
    }

    /// Configured refresh token TTL in seconds.
    pub fn refresh_ttl(&self) -> u64 {
        self.refresh_ttl
    }

    /// Mint a token of the given kind for a subject, using the configured
    /// TTL for that kind.
    pub fn issue(&self, kind: TokenKind, subject: &str) -> Result<IssuedToken, JwtError> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        self.issue_with_ttl(kind, subject, ttl)
    }

    /// Mint a token of the given kind with an explicit TTL.
    pub fn issue_with_ttl(
        &self,
        kind: TokenKind,
        subject: &str,
        ttl: u64,
    ) -> Result<IssuedToken, JwtError> {
        let now = unix_now()?;
        let exp = now + ttl;

        let claims = Claims {
            sub: subject.to_string(),
            kind,
            iat: now,
            exp,
        };

        let key = match kind {
            TokenKind::Access => &self.access_encoding,
            TokenKind::Refresh => &self.refresh_encoding,
        };

        let token =
            jsonwebtoken::encode(&Header::default(), &claims, key).map_err(JwtError::Encoding)?;

        Ok(IssuedToken {
            token,
            expires_at: exp,
            ttl,
        })
    }

    /// Decode the payload without verifying the signature and return the
    /// embedded expiry. Used only to pick a branch in the session resolver,
    /// never to authorize access.
    pub fn peek_expiry(&self, token: &str) -> Result<u64, JwtError> {
        let data = jsonwebtoken::dangerous::insecure_decode::<Claims>(token)
            .map_err(|_| JwtError::Malformed)?;
        Ok(data.claims.exp)
    }

    /// Verify signature, kind and expiry, returning the claims.
    /// Fails if the signature does not match the secret for `kind`, the
    /// token carries the wrong kind tag, or `exp <= now`.
    pub fn verify(&self, kind: TokenKind, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        // Expiry is checked explicitly below so that exp == now is rejected.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let key = match kind {
            TokenKind::Access => &self.access_decoding,
            TokenKind::Refresh => &self.refresh_decoding,
        };

        let data =
            jsonwebtoken::decode::<Claims>(token, key, &validation).map_err(JwtError::Decoding)?;

        if data.claims.kind != kind {
            return Err(JwtError::WrongTokenKind);
        }

        if data.claims.exp <= unix_now()? {
            return Err(JwtError::Expired);
        }

        Ok(data.claims)
    }
}

/// Current Unix timestamp in seconds.
pub fn unix_now() -> Result<u64, JwtError> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| JwtError::TimeError)?
        .as_secs())
}

/// Errors that can occur during token operations.
#[derive(Debug)]
pub enum JwtError {
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// Signature mismatch or undecodable token
    Decoding(jsonwebtoken::errors::Error),
    /// Payload could not be parsed at all
    Malformed,
    /// System time error
    TimeError,
    /// Wrong token kind (e.g., a refresh token presented as an access token)
    WrongTokenKind,
    /// Token expiry has passed
    Expired,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            JwtError::Decoding(e) => write!(f, "Failed to decode token: {}", e),
            JwtError::Malformed => write!(f, "Malformed token payload"),
            JwtError::TimeError => write!(f, "System time error"),
            JwtError::WrongTokenKind => write!(f, "Wrong token kind"),
            JwtError::Expired => write!(f, "Token expired"),
        }
    }
}

impl std::error::Error for JwtError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> JwtConfig {
        JwtConfig::new(b"access-secret-for-testing", b"refresh-secret-for-testing")
    }

    #[test]
    fn test_issue_and_verify_access_token() {
        let config = test_config();

        let issued = config.issue(TokenKind::Access, "uuid-123").unwrap();
        assert_eq!(issued.ttl, DEFAULT_ACCESS_TTL_SECS);

        let claims = config.verify(TokenKind::Access, &issued.token).unwrap();
        assert_eq!(claims.sub, "uuid-123");
        assert_eq!(claims.kind, TokenKind::Access);
        assert_eq!(claims.exp, issued.expires_at);
    }

    #[test]
    fn test_issue_and_verify_refresh_token() {
        let config = test_config();

        let issued = config.issue(TokenKind::Refresh, "uuid-123").unwrap();
        assert_eq!(issued.ttl, DEFAULT_REFRESH_TTL_SECS);

        let claims = config.verify(TokenKind::Refresh, &issued.token).unwrap();
        assert_eq!(claims.sub, "uuid-123");
        assert_eq!(claims.kind, TokenKind::Refresh);
    }

    #[test]
    fn test_wrong_kind_rejected() {
        let config = test_config();

        let access = config.issue(TokenKind::Access, "uuid-123").unwrap();
        let refresh = config.issue(TokenKind::Refresh, "uuid-123").unwrap();

        // Each kind is signed with its own secret, so cross-verification
        // fails at the signature check already.
        assert!(config.verify(TokenKind::Refresh, &access.token).is_err());
        assert!(config.verify(TokenKind::Access, &refresh.token).is_err());
    }

    #[test]
    fn test_kind_tag_rejected_with_shared_secret() {
        // Same secret for both kinds: the typ claim still rejects cross-use.
        let config = JwtConfig::new(b"shared-secret-for-tests", b"shared-secret-for-tests");

        let access = config.issue(TokenKind::Access, "uuid-123").unwrap();
        let result = config.verify(TokenKind::Refresh, &access.token);
        assert!(matches!(result, Err(JwtError::WrongTokenKind)));
    }

    #[test]
    fn test_wrong_secret() {
        let config1 = JwtConfig::new(b"access-secret-1", b"refresh-secret-1");
        let config2 = JwtConfig::new(b"access-secret-2", b"refresh-secret-2");

        let issued = config1.issue(TokenKind::Access, "uuid-123").unwrap();
        assert!(config2.verify(TokenKind::Access, &issued.token).is_err());
    }

    #[test]
    fn test_invalid_token() {
        let config = test_config();
        assert!(config.verify(TokenKind::Access, "not-a-token").is_err());
        assert!(matches!(
            config.peek_expiry("not-a-token"),
            Err(JwtError::Malformed)
        ));
    }

    #[test]
    fn test_expired_token() {
        let config = test_config();
        let now = unix_now().unwrap();

        let claims = Claims {
            sub: "uuid-123".to_string(),
            kind: TokenKind::Access,
            iat: now - 100,
            exp: now - 50,
        };
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"access-secret-for-testing"),
        )
        .unwrap();

        let result = config.verify(TokenKind::Access, &token);
        assert!(matches!(result, Err(JwtError::Expired)));
    }

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        let config = test_config();

        // exp == now must be treated as already expired.
        let issued = config
            .issue_with_ttl(TokenKind::Access, "uuid-123", 0)
            .unwrap();
        let result = config.verify(TokenKind::Access, &issued.token);
        assert!(matches!(result, Err(JwtError::Expired)));
    }

    #[test]
    fn test_peek_expiry_ignores_signature() {
        let config = test_config();
        let other = JwtConfig::new(b"other-access-secret", b"other-refresh-secret");

        let issued = other.issue(TokenKind::Access, "uuid-123").unwrap();

        // Signed with a different secret, but the payload still decodes.
        assert_eq!(
            config.peek_expiry(&issued.token).unwrap(),
            issued.expires_at
        );
    }
}
