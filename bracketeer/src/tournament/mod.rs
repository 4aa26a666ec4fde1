//! Tournament module for single-elimination tournaments.
//!
//! This module provides tournament management functionality including:
//! - Tournament creation and the Draft/Started/Finished status machine
//! - Participant enrollment
//! - Opening-round bracket generation with byes
//! - Match result recording
//!
//! ## Example
//!
//! ```
//! use bracketeer::db::InMemoryTournamentRepository;
//! use bracketeer::tournament::TournamentManager;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let repo = InMemoryTournamentRepository::new().with_users([1, 2, 3]).await;
//!     let manager = TournamentManager::new(Arc::new(repo));
//!
//!     let cup = manager.create_tournament("Cup", chrono::Utc::now()).await?;
//!     for user_id in [1, 2, 3] {
//!         manager.add_participant(cup.id, user_id).await?;
//!     }
//!
//!     let bracket = manager.generate_bracket(cup.id).await?;
//!     assert_eq!(bracket.matches.len(), 2);
//!
//!     manager.play_match(bracket.matches[0].id, 1).await?;
//!     Ok(())
//! }
//! ```

pub mod bracket;
pub mod errors;
pub mod lifecycle;
pub mod manager;
pub mod models;
pub mod registry;

pub use errors::{Entity, ErrorKind, TournamentError, TournamentResult};
pub use lifecycle::StatusChange;
pub use manager::TournamentManager;
pub use models::{
    Bracket, BracketId, FIRST_ROUND, Match, MatchDetail, MatchId, NewTournament, Pairing,
    Participant, Round, Tournament, TournamentDetail, TournamentId, TournamentStatus,
    UnknownStatus, UserId, UserProfile,
};
pub use registry::ResultChange;
