//! Tournament status state machine and creation rules.
//!
//! Status moves `Draft -> Started -> Finished`, but only explicit calls move
//! it and no target is refused from any current status. Starting a finished
//! tournament puts it back into `Started`.

use chrono::{DateTime, Utc};

use super::errors::{TournamentError, TournamentResult};
use super::models::{NewTournament, TournamentStatus};

/// Result of applying a status change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusChange {
    pub from: TournamentStatus,
    pub to: TournamentStatus,
}

impl StatusChange {
    /// True when the target equals the current status
    pub fn is_noop(&self) -> bool {
        self.from == self.to
    }
}

impl TournamentStatus {
    /// Status assigned to freshly created tournaments
    pub const INITIAL: TournamentStatus = TournamentStatus::Draft;

    /// Apply a transition to `target`. Always accepted.
    pub fn transition(self, target: TournamentStatus) -> StatusChange {
        StatusChange {
            from: self,
            to: target,
        }
    }
}

/// Trim a tournament name, rejecting blank input
pub fn normalize_name(name: &str) -> TournamentResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(TournamentError::validation("Name is required"));
    }
    Ok(trimmed.to_string())
}

/// Build the record for a new tournament in `Draft`
pub fn draft(name: &str, start_date: DateTime<Utc>) -> TournamentResult<NewTournament> {
    Ok(NewTournament {
        name: normalize_name(name)?,
        start_date,
        status: TournamentStatus::INITIAL,
    })
}
