//! Round pairing for single-elimination brackets.

use super::errors::{TournamentError, TournamentResult};
use super::models::{FIRST_ROUND, Pairing, Round, UserId};

/// Minimum number of distinct participants needed to build a bracket
pub const MIN_PARTICIPANTS: usize = 2;

/// Pair participants for a round, in the order given.
///
/// Consecutive participants are paired `(0, 1)`, `(2, 3)`, ... and an odd
/// participant out receives a bye, which is pre-won. Repeated ids are
/// dropped, keeping the first occurrence.
pub fn pair_round(participants: &[UserId], round: Round) -> TournamentResult<Vec<Pairing>> {
    let mut distinct: Vec<UserId> = Vec::with_capacity(participants.len());
    for &id in participants {
        if !distinct.contains(&id) {
            distinct.push(id);
        }
    }

    if distinct.len() < MIN_PARTICIPANTS {
        return Err(TournamentError::validation(
            "At least 2 participants required",
        ));
    }

    let pairings = distinct
        .chunks(2)
        .map(|pair| {
            let player1 = pair[0];
            let player2 = pair.get(1).copied();
            Pairing {
                round,
                player1,
                player2,
                // Byes are decided up front
                winner: player2.is_none().then_some(player1),
            }
        })
        .collect();

    Ok(pairings)
}

/// Pair participants for the opening round
pub fn first_round(participants: &[UserId]) -> TournamentResult<Vec<Pairing>> {
    pair_round(participants, FIRST_ROUND)
}
