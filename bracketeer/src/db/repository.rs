//! Repository trait definitions for testability and dependency injection.
//!
//! [`TournamentRepository`] is the entity store the tournament manager talks
//! to. Every mutating method is one atomic unit: it is either fully applied
//! or not applied at all.
#![allow(clippy::needless_raw_string_hashes)]

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};
use std::sync::Arc;
use std::time::Duration;

use super::timeouts::{DEFAULT_QUERY_TIMEOUT, DEFAULT_TRANSACTION_TIMEOUT, with_timeout};
use crate::tournament::{
    Bracket, BracketId, Entity, Match, MatchId, NewTournament, Pairing, Participant, Round,
    Tournament, TournamentError, TournamentId, TournamentResult, TournamentStatus, UserId,
    UserProfile,
};

/// Trait for tournament entity storage
#[async_trait]
pub trait TournamentRepository: Send + Sync {
    /// Check that a user is known to the identity service
    async fn user_exists(&self, user_id: UserId) -> TournamentResult<bool>;

    /// Resolve profiles for the given users; unknown ids are skipped
    async fn find_users(&self, user_ids: &[UserId]) -> TournamentResult<Vec<UserProfile>>;

    /// Persist a tournament and return it with its assigned id
    async fn insert_tournament(&self, tournament: &NewTournament) -> TournamentResult<Tournament>;

    /// Find tournament by ID
    async fn find_tournament(&self, id: TournamentId) -> TournamentResult<Option<Tournament>>;

    /// List tournaments ordered by id, optionally filtered by status
    async fn list_tournaments(
        &self,
        status: Option<TournamentStatus>,
    ) -> TournamentResult<Vec<Tournament>>;

    /// Overwrite a tournament's status; `None` if the tournament is missing
    async fn update_tournament_status(
        &self,
        id: TournamentId,
        status: TournamentStatus,
    ) -> TournamentResult<Option<Tournament>>;

    /// Delete a tournament together with its enrollments, bracket and matches
    async fn delete_tournament(&self, id: TournamentId) -> TournamentResult<bool>;

    /// Enroll a user unless already enrolled; returns whether a record was created
    async fn insert_participant(&self, participant: Participant) -> TournamentResult<bool>;

    /// Enrolled user ids in insertion order. The order is stable across calls.
    async fn list_participants(&self, tournament_id: TournamentId)
    -> TournamentResult<Vec<UserId>>;

    /// Find the bracket of a tournament, with all matches in creation order
    async fn find_bracket(&self, tournament_id: TournamentId) -> TournamentResult<Option<Bracket>>;

    /// Create the tournament's bracket if missing, otherwise purge its
    /// matches, then insert `pairings` in order.
    /// Fails with `NotFound(Tournament)` if the tournament does not exist.
    async fn replace_bracket_matches(
        &self,
        tournament_id: TournamentId,
        pairings: &[Pairing],
    ) -> TournamentResult<Bracket>;

    /// Find match by ID
    async fn find_match(&self, id: MatchId) -> TournamentResult<Option<Match>>;

    /// Record a match winner; `None` if the match is missing
    async fn set_match_winner(
        &self,
        id: MatchId,
        winner: UserId,
    ) -> TournamentResult<Option<Match>>;

    /// Matches of one round ordered by id
    async fn matches_for_round(
        &self,
        bracket_id: BracketId,
        round: Round,
    ) -> TournamentResult<Vec<Match>>;

    /// Matches the user plays in, ordered by round then id
    async fn matches_for_user(&self, user_id: UserId) -> TournamentResult<Vec<Match>>;

    /// Every match across all brackets, ordered by id
    async fn list_matches(&self) -> TournamentResult<Vec<Match>>;
}

const TOURNAMENT_COLUMNS: &str = "id, name, start_date, status";
const MATCH_COLUMNS: &str = "id, bracket_id, round, player1_id, player2_id, winner_id";

fn tournament_from_row(row: &PgRow) -> TournamentResult<Tournament> {
    let status: String = row.try_get("status")?;
    let status = status
        .parse::<TournamentStatus>()
        .map_err(|e| TournamentError::CorruptRecord(e.to_string()))?;

    Ok(Tournament {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        start_date: row.try_get("start_date")?,
        status,
    })
}

fn match_from_row(row: &PgRow) -> TournamentResult<Match> {
    let id: MatchId = row.try_get("id")?;
    let round: i32 = row.try_get("round")?;
    let round = Round::try_from(round).map_err(|_| {
        TournamentError::CorruptRecord(format!("match {id} has negative round {round}"))
    })?;

    Ok(Match {
        id,
        bracket_id: row.try_get("bracket_id")?,
        round,
        player1: row.try_get("player1_id")?,
        player2: row.try_get("player2_id")?,
        winner: row.try_get("winner_id")?,
    })
}

/// Default PostgreSQL implementation of `TournamentRepository`
///
/// Expects the schema in `migrations/0001_tournaments.sql`. The `users`
/// table belongs to the identity service and is only read.
#[derive(Clone)]
pub struct PgTournamentRepository {
    pool: Arc<PgPool>,
    query_timeout: Duration,
}

impl PgTournamentRepository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self {
            pool,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    /// Override the per-query timeout
    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    async fn load_matches(&self, bracket_id: BracketId) -> TournamentResult<Vec<Match>> {
        let rows = with_timeout(
            self.query_timeout,
            sqlx::query(&format!(
                "SELECT {MATCH_COLUMNS} FROM matches WHERE bracket_id = $1 ORDER BY id"
            ))
            .bind(bracket_id)
            .fetch_all(self.pool.as_ref()),
        )
        .await?;

        rows.iter().map(match_from_row).collect()
    }
}

/// Body of `replace_bracket_matches`, run inside one transaction.
/// `None` when the tournament is gone.
async fn rebuild_bracket(
    conn: &mut PgConnection,
    tournament_id: TournamentId,
    pairings: &[Pairing],
) -> Result<Option<(BracketId, Vec<PgRow>)>, sqlx::Error> {
    // Lock the tournament row so concurrent rebuilds of the same bracket serialize
    let locked = sqlx::query("SELECT id FROM tournaments WHERE id = $1 FOR UPDATE")
        .bind(tournament_id)
        .fetch_optional(&mut *conn)
        .await?;
    if locked.is_none() {
        return Ok(None);
    }

    let existing = sqlx::query("SELECT id FROM brackets WHERE tournament_id = $1")
        .bind(tournament_id)
        .fetch_optional(&mut *conn)
        .await?;

    let bracket_id: BracketId = match existing {
        Some(row) => {
            let id: BracketId = row.get("id");
            sqlx::query("DELETE FROM matches WHERE bracket_id = $1")
                .bind(id)
                .execute(&mut *conn)
                .await?;
            id
        }
        None => {
            sqlx::query("INSERT INTO brackets (tournament_id) VALUES ($1) RETURNING id")
                .bind(tournament_id)
                .fetch_one(&mut *conn)
                .await?
                .get("id")
        }
    };

    let mut rows = Vec::with_capacity(pairings.len());
    for pairing in pairings {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO matches (bracket_id, round, player1_id, player2_id, winner_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {MATCH_COLUMNS}
            "#
        ))
        .bind(bracket_id)
        .bind(i32::try_from(pairing.round).map_err(|e| sqlx::Error::Encode(Box::new(e)))?)
        .bind(pairing.player1)
        .bind(pairing.player2)
        .bind(pairing.winner)
        .fetch_one(&mut *conn)
        .await?;
        rows.push(row);
    }

    Ok(Some((bracket_id, rows)))
}

#[async_trait]
impl TournamentRepository for PgTournamentRepository {
    async fn user_exists(&self, user_id: UserId) -> TournamentResult<bool> {
        let row = with_timeout(
            self.query_timeout,
            sqlx::query("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1) AS present")
                .bind(user_id)
                .fetch_one(self.pool.as_ref()),
        )
        .await?;

        Ok(row.try_get("present")?)
    }

    async fn find_users(&self, user_ids: &[UserId]) -> TournamentResult<Vec<UserProfile>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = with_timeout(
            self.query_timeout,
            sqlx::query(
                r#"
                SELECT id, TRIM(first_name || ' ' || last_name) AS display_name
                FROM users
                WHERE id = ANY($1)
                ORDER BY id
                "#,
            )
            .bind(user_ids)
            .fetch_all(self.pool.as_ref()),
        )
        .await?;

        rows.iter()
            .map(|r| {
                Ok(UserProfile {
                    id: r.try_get("id")?,
                    display_name: r.try_get("display_name")?,
                })
            })
            .collect()
    }

    async fn insert_tournament(&self, tournament: &NewTournament) -> TournamentResult<Tournament> {
        let row = with_timeout(
            self.query_timeout,
            sqlx::query(&format!(
                r#"
                INSERT INTO tournaments (name, start_date, status)
                VALUES ($1, $2, $3)
                RETURNING {TOURNAMENT_COLUMNS}
                "#
            ))
            .bind(&tournament.name)
            .bind(tournament.start_date)
            .bind(tournament.status.as_str())
            .fetch_one(self.pool.as_ref()),
        )
        .await?;

        tournament_from_row(&row)
    }

    async fn find_tournament(&self, id: TournamentId) -> TournamentResult<Option<Tournament>> {
        let row = with_timeout(
            self.query_timeout,
            sqlx::query(&format!(
                "SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE id = $1"
            ))
            .bind(id)
            .fetch_optional(self.pool.as_ref()),
        )
        .await?;

        row.as_ref().map(tournament_from_row).transpose()
    }

    async fn list_tournaments(
        &self,
        status: Option<TournamentStatus>,
    ) -> TournamentResult<Vec<Tournament>> {
        let rows = with_timeout(
            self.query_timeout,
            sqlx::query(&format!(
                r#"
                SELECT {TOURNAMENT_COLUMNS}
                FROM tournaments
                WHERE $1::TEXT IS NULL OR status = $1
                ORDER BY id
                "#
            ))
            .bind(status.map(|s| s.as_str()))
            .fetch_all(self.pool.as_ref()),
        )
        .await?;

        rows.iter().map(tournament_from_row).collect()
    }

    async fn update_tournament_status(
        &self,
        id: TournamentId,
        status: TournamentStatus,
    ) -> TournamentResult<Option<Tournament>> {
        let row = with_timeout(
            self.query_timeout,
            sqlx::query(&format!(
                "UPDATE tournaments SET status = $1 WHERE id = $2 RETURNING {TOURNAMENT_COLUMNS}"
            ))
            .bind(status.as_str())
            .bind(id)
            .fetch_optional(self.pool.as_ref()),
        )
        .await?;

        row.as_ref().map(tournament_from_row).transpose()
    }

    async fn delete_tournament(&self, id: TournamentId) -> TournamentResult<bool> {
        // Enrollments, bracket and matches go with it through ON DELETE CASCADE
        let result = with_timeout(
            self.query_timeout,
            sqlx::query("DELETE FROM tournaments WHERE id = $1")
                .bind(id)
                .execute(self.pool.as_ref()),
        )
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_participant(&self, participant: Participant) -> TournamentResult<bool> {
        let result = with_timeout(
            self.query_timeout,
            sqlx::query(
                r#"
                INSERT INTO tournament_participants (tournament_id, user_id)
                VALUES ($1, $2)
                ON CONFLICT (tournament_id, user_id) DO NOTHING
                "#,
            )
            .bind(participant.tournament_id)
            .bind(participant.user_id)
            .execute(self.pool.as_ref()),
        )
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_participants(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<UserId>> {
        let rows = with_timeout(
            self.query_timeout,
            sqlx::query(
                "SELECT user_id FROM tournament_participants WHERE tournament_id = $1 ORDER BY seq",
            )
            .bind(tournament_id)
            .fetch_all(self.pool.as_ref()),
        )
        .await?;

        rows.iter()
            .map(|r| r.try_get("user_id").map_err(TournamentError::from))
            .collect()
    }

    async fn find_bracket(&self, tournament_id: TournamentId) -> TournamentResult<Option<Bracket>> {
        let row = with_timeout(
            self.query_timeout,
            sqlx::query("SELECT id FROM brackets WHERE tournament_id = $1")
                .bind(tournament_id)
                .fetch_optional(self.pool.as_ref()),
        )
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let id: BracketId = row.try_get("id")?;
        let matches = self.load_matches(id).await?;

        Ok(Some(Bracket {
            id,
            tournament_id,
            matches,
        }))
    }

    async fn replace_bracket_matches(
        &self,
        tournament_id: TournamentId,
        pairings: &[Pairing],
    ) -> TournamentResult<Bracket> {
        let rebuilt = with_timeout(DEFAULT_TRANSACTION_TIMEOUT, async {
            let mut tx = self.pool.begin().await?;
            let rebuilt = rebuild_bracket(&mut *tx, tournament_id, pairings).await?;
            if rebuilt.is_some() {
                tx.commit().await?;
            }
            Ok::<_, sqlx::Error>(rebuilt)
        })
        .await?;

        let (bracket_id, rows) = rebuilt.ok_or(TournamentError::NotFound(Entity::Tournament))?;

        let matches = rows.iter().map(match_from_row).collect::<TournamentResult<_>>()?;

        Ok(Bracket {
            id: bracket_id,
            tournament_id,
            matches,
        })
    }

    async fn find_match(&self, id: MatchId) -> TournamentResult<Option<Match>> {
        let row = with_timeout(
            self.query_timeout,
            sqlx::query(&format!("SELECT {MATCH_COLUMNS} FROM matches WHERE id = $1"))
                .bind(id)
                .fetch_optional(self.pool.as_ref()),
        )
        .await?;

        row.as_ref().map(match_from_row).transpose()
    }

    async fn set_match_winner(
        &self,
        id: MatchId,
        winner: UserId,
    ) -> TournamentResult<Option<Match>> {
        let row = with_timeout(
            self.query_timeout,
            sqlx::query(&format!(
                "UPDATE matches SET winner_id = $1 WHERE id = $2 RETURNING {MATCH_COLUMNS}"
            ))
            .bind(winner)
            .bind(id)
            .fetch_optional(self.pool.as_ref()),
        )
        .await?;

        row.as_ref().map(match_from_row).transpose()
    }

    async fn matches_for_round(
        &self,
        bracket_id: BracketId,
        round: Round,
    ) -> TournamentResult<Vec<Match>> {
        // The column is INT; a round past its range has no matches
        let Ok(round) = i32::try_from(round) else {
            return Ok(Vec::new());
        };

        let rows = with_timeout(
            self.query_timeout,
            sqlx::query(&format!(
                "SELECT {MATCH_COLUMNS} FROM matches WHERE bracket_id = $1 AND round = $2 ORDER BY id"
            ))
            .bind(bracket_id)
            .bind(round)
            .fetch_all(self.pool.as_ref()),
        )
        .await?;

        rows.iter().map(match_from_row).collect()
    }

    async fn matches_for_user(&self, user_id: UserId) -> TournamentResult<Vec<Match>> {
        let rows = with_timeout(
            self.query_timeout,
            sqlx::query(&format!(
                r#"
                SELECT {MATCH_COLUMNS}
                FROM matches
                WHERE player1_id = $1 OR player2_id = $1
                ORDER BY round, id
                "#
            ))
            .bind(user_id)
            .fetch_all(self.pool.as_ref()),
        )
        .await?;

        rows.iter().map(match_from_row).collect()
    }

    async fn list_matches(&self) -> TournamentResult<Vec<Match>> {
        let rows = with_timeout(
            self.query_timeout,
            sqlx::query(&format!("SELECT {MATCH_COLUMNS} FROM matches ORDER BY id"))
                .fetch_all(self.pool.as_ref()),
        )
        .await?;

        rows.iter().map(match_from_row).collect()
    }
}
