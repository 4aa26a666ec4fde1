//! Integration tests for tournament functionality
//!
//! These tests drive the manager through complete tournament lifecycles
//! against the in-memory store.

use bracketeer::db::InMemoryTournamentRepository;
use bracketeer::tournament::{
    Entity, ErrorKind, FIRST_ROUND, MatchDetail, TournamentError, TournamentId, TournamentManager,
    TournamentStatus, UserId,
};
use chrono::{TimeZone, Utc};
use std::sync::Arc;

type Manager = TournamentManager<InMemoryTournamentRepository>;

/// Helper to create a manager whose identity service knows `users`
async fn setup_manager(users: &[UserId]) -> Manager {
    let repo = InMemoryTournamentRepository::new()
        .with_users(users.iter().copied())
        .await;
    TournamentManager::new(Arc::new(repo))
}

/// Helper to create a tournament and enroll `users` in order
async fn setup_tournament(manager: &Manager, name: &str, users: &[UserId]) -> TournamentId {
    let start = Utc.with_ymd_and_hms(2026, 6, 1, 18, 0, 0).unwrap();
    let tournament = manager
        .create_tournament(name, start)
        .await
        .expect("Failed to create tournament");

    for &user_id in users {
        manager
            .add_participant(tournament.id, user_id)
            .await
            .expect("Failed to enroll participant");
    }

    tournament.id
}

fn players(detail: &MatchDetail) -> (UserId, Option<UserId>, Option<UserId>) {
    (
        detail.record.player1,
        detail.record.player2,
        detail.record.winner,
    )
}

#[tokio::test]
async fn test_cup_three_players_with_bye() {
    let manager = setup_manager(&[1, 2, 3]).await;
    let id = setup_tournament(&manager, "Cup", &[1, 2, 3]).await;

    let bracket = manager.generate_bracket(id).await.unwrap();
    assert_eq!(bracket.tournament_id, id);
    assert_eq!(bracket.matches.len(), 2);

    let first = &bracket.matches[0];
    assert_eq!((first.player1, first.player2, first.winner), (1, Some(2), None));
    let bye = &bracket.matches[1];
    assert_eq!((bye.player1, bye.player2, bye.winner), (3, None, Some(3)));

    let played = manager.play_match(first.id, 1).await.unwrap();
    assert_eq!(played.record.winner, Some(1));
    assert_eq!(played.winner_profile.as_ref().unwrap().id, 1);

    let round = manager.get_matches_for_round(id, FIRST_ROUND).await.unwrap();
    assert_eq!(round.len(), 2);
    assert_eq!(players(&round[0]), (1, Some(2), Some(1)));
    assert_eq!(players(&round[1]), (3, None, Some(3)));

    assert_eq!(round[0].player1_profile.as_ref().unwrap().display_name, "User 1");
    assert_eq!(round[0].player2_profile.as_ref().unwrap().display_name, "User 2");
    assert_eq!(round[0].winner_profile.as_ref().unwrap().display_name, "User 1");
    assert!(round[1].player2_profile.is_none());
    assert_eq!(round[1].winner_profile.as_ref().unwrap().id, 3);
}

#[tokio::test]
async fn test_duo_rejects_outside_winner() {
    let manager = setup_manager(&[10, 20, 30]).await;
    let id = setup_tournament(&manager, "Duo", &[10, 20]).await;

    let bracket = manager.generate_bracket(id).await.unwrap();
    assert_eq!(bracket.matches.len(), 1);
    let only = &bracket.matches[0];
    assert_eq!((only.player1, only.player2, only.winner), (10, Some(20), None));

    let err = manager.play_match(only.id, 30).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.to_string(), "Winner must be player1 or player2");

    // Rejected result leaves the match untouched
    let round = manager.get_matches_for_round(id, 1).await.unwrap();
    assert_eq!(round[0].record.winner, None);
}

#[tokio::test]
async fn test_play_match_is_idempotent() {
    let manager = setup_manager(&[1, 2]).await;
    let id = setup_tournament(&manager, "Repeat", &[1, 2]).await;
    let bracket = manager.generate_bracket(id).await.unwrap();
    let match_id = bracket.matches[0].id;

    let first = manager.play_match(match_id, 2).await.unwrap();
    let second = manager.play_match(match_id, 2).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(second.record.winner, Some(2));
}

#[tokio::test]
async fn test_play_match_can_replace_winner() {
    let manager = setup_manager(&[1, 2]).await;
    let id = setup_tournament(&manager, "Correction", &[1, 2]).await;
    let bracket = manager.generate_bracket(id).await.unwrap();
    let match_id = bracket.matches[0].id;

    manager.play_match(match_id, 1).await.unwrap();
    let corrected = manager.play_match(match_id, 2).await.unwrap();
    assert_eq!(corrected.record.winner, Some(2));
}

#[tokio::test]
async fn test_regenerate_replaces_matches() {
    let manager = setup_manager(&[1, 2, 3, 4]).await;
    let id = setup_tournament(&manager, "Redo", &[1, 2]).await;

    let first = manager.generate_bracket(id).await.unwrap();
    manager.play_match(first.matches[0].id, 1).await.unwrap();

    manager.add_participant(id, 3).await.unwrap();
    manager.add_participant(id, 4).await.unwrap();
    let second = manager.generate_bracket(id).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.matches.len(), 2);
    assert!(second.matches.iter().all(|m| m.winner.is_none()));

    let round = manager.get_matches_for_round(id, 1).await.unwrap();
    let old_id = first.matches[0].id;
    assert!(round.iter().all(|m| m.record.id != old_id));

    let err = manager.play_match(old_id, 1).await.unwrap_err();
    assert!(matches!(err, TournamentError::NotFound(Entity::Match)));
}

#[tokio::test]
async fn test_generate_requires_two_participants() {
    let manager = setup_manager(&[1]).await;

    let empty = setup_tournament(&manager, "Empty", &[]).await;
    let err = manager.generate_bracket(empty).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.to_string(), "At least 2 participants required");

    let solo = setup_tournament(&manager, "Solo", &[1]).await;
    let err = manager.generate_bracket(solo).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    // Failed generation creates no bracket
    let err = manager.get_bracket(solo).await.unwrap_err();
    assert!(matches!(err, TournamentError::NotFound(Entity::Bracket)));
}

#[tokio::test]
async fn test_generate_for_missing_tournament() {
    let manager = setup_manager(&[]).await;
    let err = manager.generate_bracket(404).await.unwrap_err();
    assert!(matches!(err, TournamentError::NotFound(Entity::Tournament)));
}

#[tokio::test]
async fn test_matches_for_round_without_bracket() {
    let manager = setup_manager(&[1, 2]).await;
    let id = setup_tournament(&manager, "NoBracket", &[1, 2]).await;

    let err = manager.get_matches_for_round(id, 1).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.to_string(), "Bracket not found");
}

#[tokio::test]
async fn test_later_rounds_are_empty() {
    let manager = setup_manager(&[1, 2, 3, 4]).await;
    let id = setup_tournament(&manager, "NoAdvance", &[1, 2, 3, 4]).await;
    let bracket = manager.generate_bracket(id).await.unwrap();

    for m in &bracket.matches {
        manager.play_match(m.id, m.player1).await.unwrap();
    }

    assert!(manager.get_matches_for_round(id, 2).await.unwrap().is_empty());
    assert_eq!(manager.get_bracket(id).await.unwrap().matches.len(), 2);
}

#[tokio::test]
async fn test_pairing_follows_enrollment_order() {
    let manager = setup_manager(&[5, 6, 7, 8]).await;
    let id = setup_tournament(&manager, "Order", &[8, 5, 7, 6]).await;

    let bracket = manager.generate_bracket(id).await.unwrap();
    let pairs: Vec<(UserId, Option<UserId>)> = bracket
        .matches
        .iter()
        .map(|m| (m.player1, m.player2))
        .collect();
    assert_eq!(pairs, vec![(8, Some(5)), (7, Some(6))]);
}

#[tokio::test]
async fn test_full_lifecycle() {
    let manager = setup_manager(&[1, 2]).await;
    let id = setup_tournament(&manager, "  Lifecycle  ", &[1, 2, 1]).await;

    let detail = manager.get_tournament(id).await.unwrap();
    assert_eq!(detail.tournament.name, "Lifecycle");
    assert_eq!(detail.tournament.status, TournamentStatus::Draft);
    assert_eq!(detail.participants, vec![1, 2]);

    let started = manager.start_tournament(id).await.unwrap();
    assert_eq!(started.status, TournamentStatus::Started);

    let bracket = manager.generate_bracket(id).await.unwrap();
    manager.play_match(bracket.matches[0].id, 2).await.unwrap();

    let finished = manager.finish_tournament(id).await.unwrap();
    assert_eq!(finished.status, TournamentStatus::Finished);

    let detail = manager.get_tournament(id).await.unwrap();
    assert_eq!(detail.bracket_id, Some(bracket.id));

    let finished_list = manager
        .list_tournaments(Some(TournamentStatus::Finished))
        .await
        .unwrap();
    assert_eq!(finished_list.len(), 1);
    assert_eq!(finished_list[0].id, id);
}

#[tokio::test]
async fn test_participants_can_join_after_finish() {
    let manager = setup_manager(&[1]).await;
    let id = setup_tournament(&manager, "Late", &[]).await;
    manager.finish_tournament(id).await.unwrap();

    let t = manager.add_participant(id, 1).await.unwrap();
    assert_eq!(t.status, TournamentStatus::Finished);
    assert_eq!(manager.get_tournament(id).await.unwrap().participants, vec![1]);
}

#[tokio::test]
async fn test_matches_for_user_across_tournaments() {
    let manager = setup_manager(&[1, 2, 3]).await;
    let a = setup_tournament(&manager, "A", &[1, 2]).await;
    let b = setup_tournament(&manager, "B", &[3, 1]).await;
    manager.generate_bracket(a).await.unwrap();
    manager.generate_bracket(b).await.unwrap();

    let mine = manager.matches_for_user(1).await.unwrap();
    assert_eq!(mine.len(), 2);
    assert!(mine.iter().all(|m| m.record.has_player(1)));

    assert!(manager.matches_for_user(99).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_round_zero_without_and_with_bracket() {
    let manager = setup_manager(&[1, 2]).await;
    let id = setup_tournament(&manager, "Zero", &[1, 2]).await;

    let err = manager.get_matches_for_round(id, 0).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.to_string(), "Bracket not found");

    manager.generate_bracket(id).await.unwrap();
    assert!(manager.get_matches_for_round(id, 0).await.unwrap().is_empty());
    assert!(manager.get_matches_for_round(id, u32::MAX).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_matches_across_brackets() {
    let manager = setup_manager(&[1, 2, 3]).await;
    let a = setup_tournament(&manager, "A", &[1, 2, 3]).await;
    let b = setup_tournament(&manager, "B", &[2, 3]).await;
    let first = manager.generate_bracket(a).await.unwrap();
    let second = manager.generate_bracket(b).await.unwrap();

    let all = manager.list_matches().await.unwrap();
    let ids: Vec<_> = all.iter().map(|m| m.record.id).collect();
    let expected: Vec<_> = first
        .matches
        .iter()
        .chain(&second.matches)
        .map(|m| m.id)
        .collect();
    assert_eq!(ids, expected);
    assert_eq!(all[1].winner_profile.as_ref().unwrap().id, 3);

    // Regeneration purges the old matches from the listing too
    manager.generate_bracket(a).await.unwrap();
    let all = manager.list_matches().await.unwrap();
    assert_eq!(all.len(), 3);
    assert!(all.iter().all(|m| m.record.id != first.matches[0].id));
}

#[tokio::test]
async fn test_delete_tournament_cascades() {
    let manager = setup_manager(&[1, 2]).await;
    let id = setup_tournament(&manager, "Gone", &[1, 2]).await;
    let bracket = manager.generate_bracket(id).await.unwrap();

    manager.delete_tournament(id).await.unwrap();

    assert_eq!(
        manager.get_tournament(id).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(
        manager.play_match(bracket.matches[0].id, 1).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(manager.repository().participant_count(id).await, 0);
    assert!(manager.matches_for_user(1).await.unwrap().is_empty());
}
