//! Pure game rules for Wordspy.
//!
//! Everything here is synchronous and deterministic given its inputs:
//! no clocks, no channels, no room state. The room layer calls into
//! this crate and owns all sequencing.
//!
//! # Key pieces
//!
//! - [`assign_roles`] - deterministic seeded role deal
//! - [`tally`] / [`winner_for`] - verdict and win condition
//! - [`WordCatalog`] - the category/word collaborator boundary

#![allow(async_fn_in_trait)]

mod catalog;
mod error;
mod roles;
mod tally;

pub use catalog::{MemoryCatalog, WordCard, WordCatalog};
pub use error::{CatalogError, GameError};
pub use roles::{assign_roles, RoleOptions, MIN_PLAYERS};
pub use tally::{tally, winner_for};
