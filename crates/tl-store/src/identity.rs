//! Session-token verification, kept outside the core so the
//! orchestrator never hardcodes a JWT or OAuth library choice.
use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use async_trait::async_trait;
use tl_core::PlayerId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    InvalidToken,
    SubjectMismatch,
    OriginRejected,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidToken => write!(f, "token failed verification"),
            Self::SubjectMismatch => write!(f, "token subject does not match asserted player"),
            Self::OriginRejected => write!(f, "origin not in allow-list"),
        }
    }
}

impl std::error::Error for AuthError {}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verifies a session token and returns the player it authenticates.
    async fn verify(&self, token: &str) -> Result<PlayerId, AuthError>;
}

/// Test double backed by a fixed token → player map, standing in for a
/// real JWT/OAuth verifier in unit tests.
pub struct StaticTokenProvider {
    tokens: RwLock<HashMap<String, PlayerId>>,
}

impl StaticTokenProvider {
    pub fn new() -> Self {
        Self {
            tokens: RwLock::new(HashMap::new()),
        }
    }

    pub fn issue(&self, token: impl Into<String>, player: PlayerId) {
        self.tokens
            .write()
            .expect("token map lock poisoned")
            .insert(token.into(), player);
    }
}

impl Default for StaticTokenProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for StaticTokenProvider {
    async fn verify(&self, token: &str) -> Result<PlayerId, AuthError> {
        self.tokens
            .read()
            .expect("token map lock poisoned")
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn issued_token_verifies_to_its_player() {
        let provider = StaticTokenProvider::new();
        let player = PlayerId("alice".to_string());
        provider.issue("tok-1", player.clone());
        let verified = provider.verify("tok-1").await.unwrap();
        assert_eq!(verified, player);
    }

    #[tokio::test]
    async fn unknown_token_is_rejected() {
        let provider = StaticTokenProvider::new();
        let err = provider.verify("nope").await.unwrap_err();
        assert_eq!(err, AuthError::InvalidToken);
    }
}
