//! Tournament data models: tournaments, enrollments, brackets and matches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tournament ID type
pub type TournamentId = i64;

/// Opaque user identifier issued by the identity service
pub type UserId = i64;

/// Bracket ID type
pub type BracketId = i64;

/// Match ID type
pub type MatchId = i64;

/// Round number within a bracket (1-indexed)
pub type Round = u32;

/// The only round a bracket ever materializes
pub const FIRST_ROUND: Round = 1;

/// Tournament status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TournamentStatus {
    /// Created, not yet started
    Draft,
    /// Tournament in progress
    Started,
    /// Tournament finished
    Finished,
}

impl TournamentStatus {
    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            TournamentStatus::Draft => "draft",
            TournamentStatus::Started => "started",
            TournamentStatus::Finished => "finished",
        }
    }
}

impl fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TournamentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(TournamentStatus::Draft),
            "started" => Ok(TournamentStatus::Started),
            "finished" => Ok(TournamentStatus::Finished),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Returned when a stored status string is not recognized
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown tournament status: {0}")]
pub struct UnknownStatus(pub String);

/// Tournament record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub status: TournamentStatus,
}

/// Tournament waiting to be persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTournament {
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub status: TournamentStatus,
}

/// Enrollment of a user in a tournament, keyed by `(tournament_id, user_id)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Participant {
    pub tournament_id: TournamentId,
    pub user_id: UserId,
}

/// Tournament with its enrollments and bracket reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentDetail {
    pub tournament: Tournament,
    /// Participants in enrollment order
    pub participants: Vec<UserId>,
    pub bracket_id: Option<BracketId>,
}

/// Bracket owned by exactly one tournament
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bracket {
    pub id: BracketId,
    pub tournament_id: TournamentId,
    /// Matches in creation order
    pub matches: Vec<Match>,
}

impl Bracket {
    /// Matches belonging to `round`, in creation order
    pub fn round(&self, round: Round) -> impl Iterator<Item = &Match> {
        self.matches.iter().filter(move |m| m.round == round)
    }
}

/// A single match. `player2 == None` denotes a bye.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub bracket_id: BracketId,
    pub round: Round,
    pub player1: UserId,
    pub player2: Option<UserId>,
    pub winner: Option<UserId>,
}

impl Match {
    /// Whether this match is a bye
    pub fn is_bye(&self) -> bool {
        self.player2.is_none()
    }

    /// Whether `user_id` is one of the recorded contestants
    pub fn has_player(&self, user_id: UserId) -> bool {
        self.player1 == user_id || self.player2 == Some(user_id)
    }
}

/// Match to be inserted by the store, produced by the bracket generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pairing {
    pub round: Round,
    pub player1: UserId,
    pub player2: Option<UserId>,
    pub winner: Option<UserId>,
}

/// Public profile of a user, resolved from the identity service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub display_name: String,
}

/// Match with its contestants and winner resolved to profiles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchDetail {
    #[serde(flatten)]
    pub record: Match,
    pub player1_profile: Option<UserProfile>,
    pub player2_profile: Option<UserProfile>,
    pub winner_profile: Option<UserProfile>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_match(player2: Option<UserId>) -> Match {
        Match {
            id: 1,
            bracket_id: 1,
            round: FIRST_ROUND,
            player1: 10,
            player2,
            winner: None,
        }
    }

    #[test]
    fn test_status_round_trips_through_storage_string() {
        for status in [
            TournamentStatus::Draft,
            TournamentStatus::Started,
            TournamentStatus::Finished,
        ] {
            assert_eq!(status.as_str().parse::<TournamentStatus>(), Ok(status));
        }
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let err = "cancelled".parse::<TournamentStatus>().unwrap_err();
        assert_eq!(err, UnknownStatus("cancelled".to_string()));
        assert!(err.to_string().contains("cancelled"));
    }

    #[test]
    fn test_has_player() {
        let m = sample_match(Some(20));
        assert!(m.has_player(10));
        assert!(m.has_player(20));
        assert!(!m.has_player(30));
        assert!(!m.is_bye());
    }

    #[test]
    fn test_bye_has_only_first_player() {
        let m = sample_match(None);
        assert!(m.is_bye());
        assert!(m.has_player(10));
        assert!(!m.has_player(0));
    }

    #[test]
    fn test_bracket_round_filter_keeps_creation_order() {
        let mut second = sample_match(Some(30));
        second.id = 2;
        let mut later = sample_match(None);
        later.id = 3;
        later.round = 2;

        let bracket = Bracket {
            id: 1,
            tournament_id: 1,
            matches: vec![sample_match(Some(20)), second, later],
        };

        let ids: Vec<MatchId> = bracket.round(FIRST_ROUND).map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(bracket.round(2).count(), 1);
    }

    #[test]
    fn test_match_detail_serializes_flat() {
        let detail = MatchDetail {
            record: sample_match(None),
            player1_profile: Some(UserProfile {
                id: 10,
                display_name: "Ten".to_string(),
            }),
            player2_profile: None,
            winner_profile: None,
        };

        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["player1"], 10);
        assert!(json["player2"].is_null());
        assert_eq!(json["player1_profile"]["display_name"], "Ten");
    }
}
