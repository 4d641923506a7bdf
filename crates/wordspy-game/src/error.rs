//! Error types for the game-rules layer.

/// Errors from the pure game rules.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// A round needs at least three players.
    #[error("need at least {need} players to deal roles, have {have}")]
    InsufficientPlayers { have: usize, need: usize },
}

/// Errors from the word catalog collaborator.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The requested category does not exist or holds no words.
    #[error("no words available (category: {})", .0.as_deref().unwrap_or("any"))]
    NoWords(Option<String>),

    /// The backing catalog service could not be reached.
    #[error("word catalog unavailable: {0}")]
    Unavailable(String),
}
