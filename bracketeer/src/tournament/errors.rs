//! Tournament error types.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::db::timeouts::TimeoutError;

/// Entity that a lookup failed to resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Tournament,
    User,
    Bracket,
    Match,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Tournament => write!(f, "Tournament"),
            Entity::User => write!(f, "User"),
            Entity::Bracket => write!(f, "Bracket"),
            Entity::Match => write!(f, "Match"),
        }
    }
}

/// Broad classification used by callers to map errors onto responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Infrastructure,
}

/// Tournament errors
#[derive(Debug, Error)]
pub enum TournamentError {
    /// Caller input violates a precondition
    #[error("{0}")]
    Validation(String),

    /// Referenced entity does not exist
    #[error("{0} not found")]
    NotFound(Entity),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Store did not answer in time
    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),

    /// Store returned data the domain cannot interpret
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),
}

impl TournamentError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        TournamentError::Validation(message.into())
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            TournamentError::Validation(_) => ErrorKind::Validation,
            TournamentError::NotFound(_) => ErrorKind::NotFound,
            TournamentError::Database(_)
            | TournamentError::Timeout(_)
            | TournamentError::CorruptRecord(_) => ErrorKind::Infrastructure,
        }
    }

    /// Get a client-safe error message that doesn't leak sensitive information
    ///
    /// Infrastructure failures are collapsed into a generic message; domain
    /// errors are safe to expose verbatim.
    pub fn client_message(&self) -> String {
        match self.kind() {
            ErrorKind::Infrastructure => "Internal server error".to_string(),
            ErrorKind::Validation | ErrorKind::NotFound => self.to_string(),
        }
    }
}

impl From<TimeoutError> for TournamentError {
    fn from(err: TimeoutError) -> Self {
        match err {
            TimeoutError::Timeout(duration) => TournamentError::Timeout(duration),
            TimeoutError::Database(e) => TournamentError::Database(e),
        }
    }
}

/// Result type for tournament operations
pub type TournamentResult<T> = Result<T, TournamentError>;
