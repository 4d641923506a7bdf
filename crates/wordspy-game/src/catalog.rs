//! The category/word catalog boundary.
//!
//! Wordspy does not own the word catalog - persistence and CRUD live in
//! another service. The orchestrator only needs one operation: draw a
//! random word, optionally from a specific category, optionally
//! avoiding the word used last round.

use std::collections::HashMap;

use rand::Rng;

use crate::CatalogError;

/// One drawn word and the category it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordCard {
    pub category: String,
    pub word: String,
}

/// Draws random words from the external category/word catalog.
///
/// Implementations may hit a database or remote service; the trait is
/// async for that reason. The room layer awaits this before mutating
/// any state, so a slow catalog delays only the `start_game` that asked
/// for it.
pub trait WordCatalog: Send + Sync + 'static {
    /// Draws one random word.
    ///
    /// - `category` - restrict to this category, or pick one at random.
    /// - `exclude` - avoid returning this word when any alternative
    ///   exists (no-repeat across consecutive rounds).
    fn random_word(
        &self,
        category: Option<&str>,
        exclude: Option<&str>,
    ) -> impl Future<Output = Result<WordCard, CatalogError>> + Send;
}

/// An in-memory catalog for development and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    categories: HashMap<String, Vec<String>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a category with its words, replacing any previous entry.
    pub fn with_category(
        mut self,
        category: impl Into<String>,
        words: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.categories
            .insert(category.into(), words.into_iter().map(Into::into).collect());
        self
    }
}

impl WordCatalog for MemoryCatalog {
    async fn random_word(
        &self,
        category: Option<&str>,
        exclude: Option<&str>,
    ) -> Result<WordCard, CatalogError> {
        let mut rng = rand::rng();

        let (name, words) = match category {
            Some(name) => {
                let words = self
                    .categories
                    .get(name)
                    .filter(|words| !words.is_empty())
                    .ok_or_else(|| CatalogError::NoWords(Some(name.to_string())))?;
                (name.to_string(), words)
            }
            None => {
                let names: Vec<&String> = self
                    .categories
                    .iter()
                    .filter(|(_, words)| !words.is_empty())
                    .map(|(name, _)| name)
                    .collect();
                if names.is_empty() {
                    return Err(CatalogError::NoWords(None));
                }
                let name = names[rng.random_range(0..names.len())].clone();
                let words = &self.categories[&name];
                (name, words)
            }
        };

        // Drop the excluded word unless it is the only one left.
        let all: Vec<&String> = words.iter().collect();
        let eligible: Vec<&String> = all
            .iter()
            .copied()
            .filter(|word| exclude.is_none_or(|ex| !word.eq_ignore_ascii_case(ex)))
            .collect();
        let pool = if eligible.is_empty() { &all } else { &eligible };

        let word = pool[rng.random_range(0..pool.len())].clone();
        Ok(WordCard { category: name, word })
    }
}

// =========================================================================
// Tests
// =========================================================================
