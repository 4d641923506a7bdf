//! Vote tallying and winner determination.

use std::collections::HashMap;

use wordspy_protocol::{PlayerId, Verdict, Winner};

/// Tallies a voting phase's ballots.
///
/// Returns [`Verdict::Eliminated`] only when one candidate's count
/// strictly exceeds every other candidate's; any tie among the top
/// vote-getters - including zero ballots cast - is a [`Verdict::Tie`]
/// with no elimination. Abstaining members simply contribute nothing;
/// they never invalidate the tally.
///
/// Tie candidates are sorted by id so the verdict is deterministic.
pub fn tally(votes: &HashMap<PlayerId, PlayerId>) -> Verdict {
    let mut counts: HashMap<PlayerId, usize> = HashMap::new();
    for target in votes.values() {
        *counts.entry(*target).or_insert(0) += 1;
    }

    let Some(top) = counts.values().copied().max() else {
        return Verdict::Tie { candidates: Vec::new() };
    };

    let mut leaders: Vec<PlayerId> = counts
        .iter()
        .filter(|(_, count)| **count == top)
        .map(|(id, _)| *id)
        .collect();
    leaders.sort();

    match leaders.as_slice() {
        [single] => Verdict::Eliminated { player: *single },
        _ => Verdict::Tie { candidates: leaders },
    }
}

/// The win condition: Civilians (and Detective/Joker) win only by
/// eliminating the Impostor. The Impostor wins every other outcome,
/// ties included.
pub fn winner_for(verdict: &Verdict, impostor: PlayerId) -> Winner {
    match verdict {
        Verdict::Eliminated { player } if *player == impostor => Winner::Civilians,
        _ => Winner::Impostor,
    }
}

// =========================================================================
// Tests
// =========================================================================
