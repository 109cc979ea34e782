pub mod managed_identity;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub use managed_identity::{IdentitySource, ManagedIdentityCredential};

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("no ambient identity available: {0}")]
    IdentityUnavailable(String),

    #[error("token endpoint request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("token endpoint rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("token endpoint returned an unusable response: {0}")]
    InvalidResponse(String),
}

/// Bearer credential for a downstream API.
///
/// The secret is kept out of `Debug` output so tokens never reach logs.
#[derive(Clone)]
pub struct AccessToken {
    token: String,
    pub expires_on: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_on: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_on,
        }
    }

    pub fn secret(&self) -> &str {
        &self.token
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

/// Source of service-scoped bearer tokens
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn acquire(&self, scope: &str) -> Result<AccessToken, CredentialError>;
}

/// Resource URI for a `.default` scope (`https://graph.microsoft.com/.default`
/// becomes `https://graph.microsoft.com`).
pub fn scope_to_resource(scope: &str) -> &str {
    scope.strip_suffix("/.default").unwrap_or(scope)
}
