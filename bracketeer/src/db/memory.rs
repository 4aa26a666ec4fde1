//! In-memory implementation of `TournamentRepository`.
//!
//! Every operation takes a single lock over the whole store, so each call is
//! atomic. Ids are assigned from monotonically increasing counters and all
//! collections keep insertion order.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::repository::TournamentRepository;
use crate::tournament::{
    Bracket, BracketId, Entity, Match, MatchId, NewTournament, Pairing, Participant, Round,
    Tournament, TournamentError, TournamentId, TournamentResult, TournamentStatus, UserId,
    UserProfile,
};

#[derive(Default)]
struct Store {
    users: BTreeMap<UserId, UserProfile>,
    tournaments: BTreeMap<TournamentId, Tournament>,
    /// Enrollments in insertion order
    participants: Vec<Participant>,
    /// tournament id -> bracket id
    brackets: HashMap<TournamentId, BracketId>,
    /// Ordered by id, which is creation order
    matches: BTreeMap<MatchId, Match>,
    next_tournament_id: TournamentId,
    next_bracket_id: BracketId,
    next_match_id: MatchId,
}

impl Store {
    fn next_id(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }

    fn bracket_matches(&self, bracket_id: BracketId) -> Vec<Match> {
        self.matches
            .values()
            .filter(|m| m.bracket_id == bracket_id)
            .cloned()
            .collect()
    }
}

/// Mutex-guarded store for tests, demos and single-process use
#[derive(Clone, Default)]
pub struct InMemoryTournamentRepository {
    store: Arc<Mutex<Store>>,
}

impl InMemoryTournamentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user with the stand-in identity service
    pub async fn add_user(&self, id: UserId, display_name: impl Into<String>) {
        let profile = UserProfile {
            id,
            display_name: display_name.into(),
        };
        self.store.lock().await.users.insert(id, profile);
    }

    /// Register users `ids`, named after their id
    pub async fn with_users(self, ids: impl IntoIterator<Item = UserId>) -> Self {
        for id in ids {
            self.add_user(id, format!("User {id}")).await;
        }
        self
    }

    /// Number of enrollment records held for a tournament
    pub async fn participant_count(&self, tournament_id: TournamentId) -> usize {
        self.store
            .lock()
            .await
            .participants
            .iter()
            .filter(|p| p.tournament_id == tournament_id)
            .count()
    }

    /// Total number of stored matches across all brackets
    pub async fn match_count(&self) -> usize {
        self.store.lock().await.matches.len()
    }
}

#[async_trait]
impl TournamentRepository for InMemoryTournamentRepository {
    async fn user_exists(&self, user_id: UserId) -> TournamentResult<bool> {
        Ok(self.store.lock().await.users.contains_key(&user_id))
    }

    async fn find_users(&self, user_ids: &[UserId]) -> TournamentResult<Vec<UserProfile>> {
        let store = self.store.lock().await;
        Ok(store
            .users
            .values()
            .filter(|u| user_ids.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn insert_tournament(&self, tournament: &NewTournament) -> TournamentResult<Tournament> {
        let mut store = self.store.lock().await;
        let id = Store::next_id(&mut store.next_tournament_id);
        let record = Tournament {
            id,
            name: tournament.name.clone(),
            start_date: tournament.start_date,
            status: tournament.status,
        };
        store.tournaments.insert(id, record.clone());
        Ok(record)
    }

    async fn find_tournament(&self, id: TournamentId) -> TournamentResult<Option<Tournament>> {
        Ok(self.store.lock().await.tournaments.get(&id).cloned())
    }

    async fn list_tournaments(
        &self,
        status: Option<TournamentStatus>,
    ) -> TournamentResult<Vec<Tournament>> {
        let store = self.store.lock().await;
        Ok(store
            .tournaments
            .values()
            .filter(|t| status.is_none_or(|s| t.status == s))
            .cloned()
            .collect())
    }

    async fn update_tournament_status(
        &self,
        id: TournamentId,
        status: TournamentStatus,
    ) -> TournamentResult<Option<Tournament>> {
        let mut store = self.store.lock().await;
        Ok(store.tournaments.get_mut(&id).map(|t| {
            t.status = status;
            t.clone()
        }))
    }

    async fn delete_tournament(&self, id: TournamentId) -> TournamentResult<bool> {
        let mut store = self.store.lock().await;
        if store.tournaments.remove(&id).is_none() {
            return Ok(false);
        }

        store.participants.retain(|p| p.tournament_id != id);
        if let Some(bracket_id) = store.brackets.remove(&id) {
            store.matches.retain(|_, m| m.bracket_id != bracket_id);
        }
        Ok(true)
    }

    async fn insert_participant(&self, participant: Participant) -> TournamentResult<bool> {
        let mut store = self.store.lock().await;
        if store.participants.contains(&participant) {
            return Ok(false);
        }
        store.participants.push(participant);
        Ok(true)
    }

    async fn list_participants(
        &self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<UserId>> {
        let store = self.store.lock().await;
        Ok(store
            .participants
            .iter()
            .filter(|p| p.tournament_id == tournament_id)
            .map(|p| p.user_id)
            .collect())
    }

    async fn find_bracket(&self, tournament_id: TournamentId) -> TournamentResult<Option<Bracket>> {
        let store = self.store.lock().await;
        Ok(store.brackets.get(&tournament_id).map(|&id| Bracket {
            id,
            tournament_id,
            matches: store.bracket_matches(id),
        }))
    }

    async fn replace_bracket_matches(
        &self,
        tournament_id: TournamentId,
        pairings: &[Pairing],
    ) -> TournamentResult<Bracket> {
        let mut store = self.store.lock().await;
        if !store.tournaments.contains_key(&tournament_id) {
            return Err(TournamentError::NotFound(Entity::Tournament));
        }

        let bracket_id = match store.brackets.get(&tournament_id).copied() {
            Some(id) => {
                store.matches.retain(|_, m| m.bracket_id != id);
                id
            }
            None => {
                let id = Store::next_id(&mut store.next_bracket_id);
                store.brackets.insert(tournament_id, id);
                id
            }
        };

        for pairing in pairings {
            let id = Store::next_id(&mut store.next_match_id);
            store.matches.insert(
                id,
                Match {
                    id,
                    bracket_id,
                    round: pairing.round,
                    player1: pairing.player1,
                    player2: pairing.player2,
                    winner: pairing.winner,
                },
            );
        }

        Ok(Bracket {
            id: bracket_id,
            tournament_id,
            matches: store.bracket_matches(bracket_id),
        })
    }

    async fn find_match(&self, id: MatchId) -> TournamentResult<Option<Match>> {
        Ok(self.store.lock().await.matches.get(&id).cloned())
    }

    async fn set_match_winner(
        &self,
        id: MatchId,
        winner: UserId,
    ) -> TournamentResult<Option<Match>> {
        let mut store = self.store.lock().await;
        Ok(store.matches.get_mut(&id).map(|m| {
            m.winner = Some(winner);
            m.clone()
        }))
    }

    async fn matches_for_round(
        &self,
        bracket_id: BracketId,
        round: Round,
    ) -> TournamentResult<Vec<Match>> {
        let store = self.store.lock().await;
        Ok(store
            .matches
            .values()
            .filter(|m| m.bracket_id == bracket_id && m.round == round)
            .cloned()
            .collect())
    }

    async fn matches_for_user(&self, user_id: UserId) -> TournamentResult<Vec<Match>> {
        let store = self.store.lock().await;
        let mut matches: Vec<Match> = store
            .matches
            .values()
            .filter(|m| m.player1 == user_id || m.player2 == Some(user_id))
            .cloned()
            .collect();
        // Stable sort keeps id order within a round
        matches.sort_by_key(|m| m.round);
        Ok(matches)
    }

    async fn list_matches(&self) -> TournamentResult<Vec<Match>> {
        Ok(self.store.lock().await.matches.values().cloned().collect())
    }
}
