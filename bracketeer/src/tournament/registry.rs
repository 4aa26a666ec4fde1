//! Match result validation.

use super::errors::{TournamentError, TournamentResult};
use super::models::{Match, UserId};

/// Outcome of recording a winner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultChange {
    /// No winner was recorded before
    Recorded,
    /// Same winner already recorded
    Unchanged,
    /// A different winner was recorded and gets replaced
    Overwritten { previous: UserId },
}

/// Check that `winner` is one of the match's contestants and describe the
/// effect of storing it. An absent second player never matches.
pub fn validate_winner(record: &Match, winner: UserId) -> TournamentResult<ResultChange> {
    if !record.has_player(winner) {
        return Err(TournamentError::validation(
            "Winner must be player1 or player2",
        ));
    }

    Ok(match record.winner {
        None => ResultChange::Recorded,
        Some(previous) if previous == winner => ResultChange::Unchanged,
        Some(previous) => ResultChange::Overwritten { previous },
    })
}
