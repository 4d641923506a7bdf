//! The identity boundary.
//!
//! Wordspy does not mint identities; a connecting client presents a
//! token issued elsewhere and the [`Authenticator`] resolves it to a
//! stable [`PlayerId`]. The same id across reconnects is what lets a
//! dropped player re-attach to their seat mid-round.

use std::collections::HashMap;

use wordspy_protocol::PlayerId;

/// Why a token was refused.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid or expired token")]
    InvalidToken,

    #[error("auth backend unavailable: {0}")]
    Unavailable(String),
}

/// Resolves a presented token to a player identity.
///
/// Implementations may call out to an identity service; the trait is
/// async for that reason.
pub trait Authenticator: Send + Sync + 'static {
    fn validate(&self, token: &str) -> impl Future<Output = Result<PlayerId, AuthError>> + Send;
}

/// A fixed token table for development and tests.
#[derive(Debug, Clone, Default)]
pub struct TokenMap {
    tokens: HashMap<String, PlayerId>,
}

impl TokenMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>, player: PlayerId) -> Self {
        self.tokens.insert(token.into(), player);
        self
    }
}

impl Authenticator for TokenMap {
    async fn validate(&self, token: &str) -> Result<PlayerId, AuthError> {
        self.tokens.get(token).copied().ok_or(AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_token_map_resolves_known_tokens() {
        let auth = TokenMap::new().with_token("t-ana", PlayerId(1));
        assert_eq!(auth.validate("t-ana").await.unwrap(), PlayerId(1));
    }

    #[tokio::test]
    async fn test_token_map_rejects_unknown_tokens() {
        let auth = TokenMap::new();
        assert!(matches!(auth.validate("nope").await, Err(AuthError::InvalidToken)));
    }
}
