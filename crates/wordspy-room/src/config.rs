//! Per-room settings and the phase schedule.

use std::time::Duration;

use wordspy_protocol::StartOptions;

/// Settings fixed at room creation, plus the host-adjustable round
/// options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomOptions {
    /// Hard cap on members; joins beyond it are rejected.
    pub max_players: usize,
    /// Whether the room appears in public listings.
    pub public: bool,
    /// Deal a Detective each round.
    pub detective: bool,
    /// Deal a Joker each round.
    pub joker: bool,
    /// Draw words from this category; `None` picks one per round.
    pub category: Option<String>,
}

impl Default for RoomOptions {
    fn default() -> Self {
        Self {
            max_players: 8,
            public: true,
            detective: false,
            joker: false,
            category: None,
        }
    }
}

impl RoomOptions {
    /// Overlays host-chosen start options onto the room settings.
    pub fn apply(&mut self, options: &StartOptions) {
        self.detective = options.detective;
        self.joker = options.joker;
        self.category = options.category.clone();
    }
}

/// How long each timed phase lasts.
///
/// All phases except Waiting and Closed expire on a timer; Voting can
/// additionally finish early once every connected member has voted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseSchedule {
    pub role_reveal: Duration,
    pub playing: Duration,
    pub voting: Duration,
    pub results: Duration,
}

impl Default for PhaseSchedule {
    fn default() -> Self {
        Self {
            role_reveal: Duration::from_secs(10),
            playing: Duration::from_secs(300),
            voting: Duration::from_secs(30),
            results: Duration::from_secs(15),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_overlays_start_options() {
        let mut options = RoomOptions::default();
        options.apply(&StartOptions {
            detective: true,
            joker: false,
            category: Some("nature".into()),
        });
        assert!(options.detective);
        assert!(!options.joker);
        assert_eq!(options.category.as_deref(), Some("nature"));
        // Creation-time settings are untouched.
        assert_eq!(options.max_players, 8);
        assert!(options.public);
    }
}
