//! Database module providing PostgreSQL connection pooling and the
//! tournament entity store.
//!
//! This module manages the database connection pool using sqlx and provides
//! the [`TournamentRepository`] trait with a PostgreSQL and an in-memory
//! implementation.

use log::debug;
use sqlx::Row;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::sync::Arc;
use std::time::Duration;

use crate::tournament::{TournamentError, TournamentResult};
use timeouts::with_timeout;

pub mod config;
pub mod memory;
pub mod repository;
pub mod timeouts;

pub use config::{ConfigError, DatabaseConfig};
pub use memory::InMemoryTournamentRepository;
pub use repository::{PgTournamentRepository, TournamentRepository};

/// Tables the PostgreSQL store reads and writes
const REQUIRED_TABLES: [&str; 5] = [
    "users",
    "tournaments",
    "tournament_participants",
    "brackets",
    "matches",
];

/// Shared PostgreSQL pool plus the per-query timeout its stores use
#[derive(Clone)]
pub struct Database {
    pool: Arc<PgPool>,
    query_timeout: Duration,
}

impl Database {
    /// Open the pool described by `config`
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use bracketeer::db::{Database, DatabaseConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let config = DatabaseConfig::from_env()?;
    ///     let db = Database::new(&config).await?;
    ///     db.health_check().await?;
    ///     let _repo = db.repository();
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let options = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs));

        debug!(
            "Opening pool ({}..={} connections)",
            config.min_connections, config.max_connections
        );
        let pool = options.connect(&config.database_url).await?;

        Ok(Self {
            pool: Arc::new(pool),
            query_timeout: config.query_timeout(),
        })
    }

    /// Underlying connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Tournament store sharing this pool and its query timeout
    pub fn repository(&self) -> PgTournamentRepository {
        PgTournamentRepository::new(Arc::clone(&self.pool)).with_query_timeout(self.query_timeout)
    }

    /// Verify the server answers and the tournament schema is installed
    ///
    /// # Errors
    ///
    /// * `TournamentError::CorruptRecord` - A required table is missing
    /// * `TournamentError::Database` / `Timeout` - The server is unreachable
    pub async fn health_check(&self) -> TournamentResult<()> {
        let row = with_timeout(
            self.query_timeout,
            sqlx::query(
                "SELECT ARRAY(SELECT t FROM UNNEST($1::TEXT[]) AS t WHERE to_regclass(t) IS NULL) AS missing",
            )
            .bind(&REQUIRED_TABLES[..])
            .fetch_one(self.pool.as_ref()),
        )
        .await?;

        let missing: Vec<String> = row.try_get("missing")?;
        if !missing.is_empty() {
            return Err(TournamentError::CorruptRecord(format!(
                "schema is missing tables: {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }

    /// Close every connection once in-flight queries finish
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
