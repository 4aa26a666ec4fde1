//! # Bracketeer
//!
//! Single-elimination tournament management: a tournament status machine,
//! participant enrollment, opening-round bracket generation and match
//! result recording, on top of a pluggable entity store.
//!
//! ## Architecture
//!
//! The [`tournament::TournamentManager`] is the facade a transport layer
//! calls. It composes three pieces of pure domain logic:
//!
//! - **Lifecycle**: tournament creation and Draft/Started/Finished transitions
//! - **Bracket**: pairing enrolled participants into round-1 matches with byes
//! - **Registry**: validating recorded winners against match contestants
//!
//! Storage goes through the [`db::TournamentRepository`] trait, implemented
//! for PostgreSQL and in memory.
//!
//! ## Core Modules
//!
//! - [`tournament`]: Domain models, rules and the manager
//! - [`db`]: Connection pooling, configuration and repositories

/// Connection pooling, configuration and entity stores.
pub mod db;

/// Tournament domain logic and the operation facade.
pub mod tournament;

pub use db::{Database, DatabaseConfig, InMemoryTournamentRepository, PgTournamentRepository};
pub use tournament::{TournamentError, TournamentManager, TournamentResult};
