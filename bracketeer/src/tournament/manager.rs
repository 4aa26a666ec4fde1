//! Tournament manager: the operations exposed to the transport layer.
//!
//! Each operation loads what it needs from the repository, delegates the
//! decision to the lifecycle, bracket or registry rules, and commits its
//! mutation through a single repository call. Domain errors are returned
//! unchanged for the caller to map onto its own responses.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::Arc;

use super::bracket;
use super::errors::{Entity, TournamentError, TournamentResult};
use super::lifecycle;
use super::models::{
    Bracket, Match, MatchDetail, MatchId, Participant, Round, Tournament, TournamentDetail,
    TournamentId, TournamentStatus, UserId, UserProfile,
};
use super::registry::{self, ResultChange};
use crate::db::TournamentRepository;

/// Tournament manager
pub struct TournamentManager<R: ?Sized = dyn TournamentRepository> {
    repo: Arc<R>,
}

impl<R: ?Sized> Clone for TournamentManager<R> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
        }
    }
}

impl<R> TournamentManager<R>
where
    R: TournamentRepository + ?Sized,
{
    /// Create a new tournament manager
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Underlying repository
    pub fn repository(&self) -> &Arc<R> {
        &self.repo
    }

    /// Create a new tournament in `Draft`
    ///
    /// # Errors
    ///
    /// * `TournamentError::Validation` - Name is empty or whitespace
    pub async fn create_tournament(
        &self,
        name: &str,
        start_date: DateTime<Utc>,
    ) -> TournamentResult<Tournament> {
        let draft = lifecycle::draft(name, start_date).inspect_err(|e| {
            warn!("Rejected tournament creation: {e}");
        })?;

        let tournament = self.repo.insert_tournament(&draft).await?;
        info!(
            "Created tournament {} '{}' starting {}",
            tournament.id, tournament.name, tournament.start_date
        );
        Ok(tournament)
    }

    /// Enroll a user. Enrolling twice leaves a single record.
    ///
    /// No status check is made: users may join at any point.
    ///
    /// # Errors
    ///
    /// * `TournamentError::NotFound` - Tournament or user does not exist
    pub async fn add_participant(
        &self,
        tournament_id: TournamentId,
        user_id: UserId,
    ) -> TournamentResult<Tournament> {
        let tournament = self.require_tournament(tournament_id).await?;

        if !self.repo.user_exists(user_id).await? {
            return Err(TournamentError::NotFound(Entity::User));
        }

        let created = self
            .repo
            .insert_participant(Participant {
                tournament_id,
                user_id,
            })
            .await?;

        if created {
            info!("User {user_id} joined tournament {tournament_id}");
        } else {
            debug!("User {user_id} already enrolled in tournament {tournament_id}");
        }

        Ok(tournament)
    }

    /// Move the tournament to `Started`, whatever its current status
    ///
    /// # Errors
    ///
    /// * `TournamentError::NotFound` - Tournament does not exist
    pub async fn start_tournament(&self, tournament_id: TournamentId) -> TournamentResult<Tournament> {
        self.set_status(tournament_id, TournamentStatus::Started)
            .await
    }

    /// Move the tournament to `Finished`, whatever its current status
    ///
    /// # Errors
    ///
    /// * `TournamentError::NotFound` - Tournament does not exist
    pub async fn finish_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Tournament> {
        self.set_status(tournament_id, TournamentStatus::Finished)
            .await
    }

    async fn set_status(
        &self,
        tournament_id: TournamentId,
        target: TournamentStatus,
    ) -> TournamentResult<Tournament> {
        let current = self.require_tournament(tournament_id).await?;
        let change = current.status.transition(target);

        if change.is_noop() {
            debug!("Tournament {tournament_id} already {}", change.to);
            return Ok(current);
        }

        let updated = self
            .repo
            .update_tournament_status(tournament_id, change.to)
            .await?
            .ok_or(TournamentError::NotFound(Entity::Tournament))?;

        info!(
            "Tournament {tournament_id} moved from {} to {}",
            change.from, change.to
        );
        Ok(updated)
    }

    /// Build (or rebuild) the opening round from the current enrollments.
    ///
    /// An existing bracket keeps its id but all of its matches, recorded
    /// results included, are replaced.
    ///
    /// # Errors
    ///
    /// * `TournamentError::NotFound` - Tournament does not exist
    /// * `TournamentError::Validation` - Fewer than 2 participants
    pub async fn generate_bracket(&self, tournament_id: TournamentId) -> TournamentResult<Bracket> {
        self.require_tournament(tournament_id).await?;

        let participants = self.repo.list_participants(tournament_id).await?;
        let pairings = bracket::first_round(&participants).inspect_err(|e| {
            warn!(
                "Cannot generate bracket for tournament {tournament_id} with {} participants: {e}",
                participants.len()
            );
        })?;

        let bracket = self
            .repo
            .replace_bracket_matches(tournament_id, &pairings)
            .await?;

        info!(
            "Generated bracket {} for tournament {tournament_id}: {} participants, {} matches",
            bracket.id,
            participants.len(),
            bracket.matches.len()
        );
        Ok(bracket)
    }

    /// Matches of one round, in creation order, with players resolved.
    /// A round with no matches, round 0 included, yields an empty list.
    ///
    /// # Errors
    ///
    /// * `TournamentError::NotFound` - Tournament has no bracket
    pub async fn get_matches_for_round(
        &self,
        tournament_id: TournamentId,
        round: Round,
    ) -> TournamentResult<Vec<MatchDetail>> {
        let bracket = self.require_bracket(tournament_id).await?;
        let matches = self.repo.matches_for_round(bracket.id, round).await?;
        self.resolve(matches).await
    }

    /// Record the winner of a match.
    ///
    /// The bracket is not advanced: no later-round match is created.
    ///
    /// # Errors
    ///
    /// * `TournamentError::NotFound` - Match does not exist
    /// * `TournamentError::Validation` - Winner is not one of the players
    pub async fn play_match(
        &self,
        match_id: MatchId,
        winner: UserId,
    ) -> TournamentResult<MatchDetail> {
        let record = self
            .repo
            .find_match(match_id)
            .await?
            .ok_or(TournamentError::NotFound(Entity::Match))?;

        let change = registry::validate_winner(&record, winner).inspect_err(|e| {
            warn!("Rejected result for match {match_id}: {e} (got {winner})");
        })?;

        let record = match change {
            ResultChange::Unchanged => {
                debug!("Match {match_id} already won by {winner}");
                record
            }
            ResultChange::Recorded | ResultChange::Overwritten { .. } => {
                if let ResultChange::Overwritten { previous } = change {
                    warn!("Match {match_id} winner changed from {previous} to {winner}");
                }
                let updated = self
                    .repo
                    .set_match_winner(match_id, winner)
                    .await?
                    .ok_or(TournamentError::NotFound(Entity::Match))?;
                info!("Match {match_id} won by {winner}");
                updated
            }
        };

        let mut resolved = self.resolve(vec![record]).await?;
        resolved
            .pop()
            .ok_or(TournamentError::NotFound(Entity::Match))
    }

    /// Tournament with its participants and bracket reference
    ///
    /// # Errors
    ///
    /// * `TournamentError::NotFound` - Tournament does not exist
    pub async fn get_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<TournamentDetail> {
        let tournament = self.require_tournament(tournament_id).await?;
        let participants = self.repo.list_participants(tournament_id).await?;
        let bracket_id = self.repo.find_bracket(tournament_id).await?.map(|b| b.id);

        Ok(TournamentDetail {
            tournament,
            participants,
            bracket_id,
        })
    }

    /// List tournaments, optionally only those in `status`
    pub async fn list_tournaments(
        &self,
        status: Option<TournamentStatus>,
    ) -> TournamentResult<Vec<Tournament>> {
        self.repo.list_tournaments(status).await
    }

    /// Delete a tournament with its enrollments, bracket and matches
    ///
    /// # Errors
    ///
    /// * `TournamentError::NotFound` - Tournament does not exist
    pub async fn delete_tournament(&self, tournament_id: TournamentId) -> TournamentResult<()> {
        if !self.repo.delete_tournament(tournament_id).await? {
            return Err(TournamentError::NotFound(Entity::Tournament));
        }
        info!("Deleted tournament {tournament_id}");
        Ok(())
    }

    /// The tournament's bracket with every match
    ///
    /// # Errors
    ///
    /// * `TournamentError::NotFound` - Tournament has no bracket
    pub async fn get_bracket(&self, tournament_id: TournamentId) -> TournamentResult<Bracket> {
        self.require_bracket(tournament_id).await
    }

    /// Every match the user plays in, ordered by round
    pub async fn matches_for_user(&self, user_id: UserId) -> TournamentResult<Vec<MatchDetail>> {
        let matches = self.repo.matches_for_user(user_id).await?;
        self.resolve(matches).await
    }

    /// Every match of every bracket, in creation order
    pub async fn list_matches(&self) -> TournamentResult<Vec<MatchDetail>> {
        let matches = self.repo.list_matches().await?;
        self.resolve(matches).await
    }

    async fn require_tournament(&self, tournament_id: TournamentId) -> TournamentResult<Tournament> {
        self.repo
            .find_tournament(tournament_id)
            .await?
            .ok_or(TournamentError::NotFound(Entity::Tournament))
    }

    async fn require_bracket(&self, tournament_id: TournamentId) -> TournamentResult<Bracket> {
        self.repo
            .find_bracket(tournament_id)
            .await?
            .ok_or(TournamentError::NotFound(Entity::Bracket))
    }

    /// Attach player and winner profiles, preserving match order
    async fn resolve(&self, matches: Vec<Match>) -> TournamentResult<Vec<MatchDetail>> {
        let mut ids: Vec<UserId> = matches
            .iter()
            .flat_map(|m| std::iter::once(m.player1).chain(m.player2))
            .collect();
        ids.sort_unstable();
        ids.dedup();

        let profiles: HashMap<UserId, UserProfile> = self
            .repo
            .find_users(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        let lookup = |id: Option<UserId>| id.and_then(|id| profiles.get(&id).cloned());

        Ok(matches
            .into_iter()
            .map(|record| MatchDetail {
                player1_profile: lookup(Some(record.player1)),
                player2_profile: lookup(record.player2),
                winner_profile: lookup(record.winner),
                record,
            })
            .collect())
    }
}
