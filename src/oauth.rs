//! Identity-provider seam for third-party sign-in.
//!
//! The session layer never talks to Google or Facebook directly; it only
//! sees the `{email, name}` pair an exchanged assertion resolves to. The
//! actual token exchange lives behind this trait so deployments can wire
//! their own client.

use async_trait::async_trait;
use std::collections::HashMap;

/// Claims resolved from a verified identity assertion.
#[derive(Debug, Clone)]
pub struct IdentityClaims {
    pub email: String,
    pub name: String,
}

/// Errors from exchanging a provider code for identity claims.
#[derive(Debug)]
pub enum IdentityError {
    /// The code was rejected by the provider
    InvalidCode,
    /// No provider is configured or the provider could not be reached
    Unavailable,
}

impl std::fmt::Display for IdentityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentityError::InvalidCode => write!(f, "Identity code rejected"),
            IdentityError::Unavailable => write!(f, "Identity provider unavailable"),
        }
    }
}

impl std::error::Error for IdentityError {}

/// Exchange a provider-issued code for verified identity claims.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn exchange(&self, code: &str) -> Result<IdentityClaims, IdentityError>;
}

/// Provider used when no identity integration is configured.
/// Every exchange fails with `Unavailable`.
#[derive(Debug, Default)]
pub struct DisabledIdentityProvider;

#[async_trait]
impl IdentityProvider for DisabledIdentityProvider {
    async fn exchange(&self, _code: &str) -> Result<IdentityClaims, IdentityError> {
        Err(IdentityError::Unavailable)
    }
}

/// In-memory provider mapping fixed codes to claims. Used in tests and
/// local demos.
#[derive(Debug, Default)]
pub struct StaticIdentityProvider {
    codes: HashMap<String, IdentityClaims>,
}

impl StaticIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a code that exchanges to the given identity.
    pub fn with_code(mut self, code: &str, email: &str, name: &str) -> Self {
        self.codes.insert(
            code.to_string(),
            IdentityClaims {
                email: email.to_string(),
                name: name.to_string(),
            },
        );
        self
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn exchange(&self, code: &str) -> Result<IdentityClaims, IdentityError> {
        self.codes
            .get(code)
            .cloned()
            .ok_or(IdentityError::InvalidCode)
    }
}
