// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Badge evaluation tests against the in-memory store.

use chrono::{DateTime, Duration, TimeZone, Utc};
use fitness_badges::config::Config;
use fitness_badges::db::{ActivityStore, GamificationStore, MemoryDb};
use fitness_badges::models::{Badge, BadgeCategory, Rarity, Session, SportType, UserBadge};
use fitness_badges::services::UnlockOutcome;
use fitness_badges::time_utils::{local_date, month_start};
use std::collections::HashSet;
use std::time::Duration as StdDuration;

mod common;

fn codes(unlocks: &[UserBadge]) -> Vec<String> {
    let mut codes: Vec<String> = unlocks.iter().map(|u| u.badge_code.clone()).collect();
    codes.sort();
    codes
}

async fn log_session_at(db: &MemoryDb, user_id: &str, sport: SportType, at: DateTime<Utc>) {
    let offset = Config::test_default().local_offset;
    let session = Session::new(user_id, sport, at, offset);
    db.record_session(&session, local_date(at, offset))
        .await
        .unwrap();
}

/// Noon on the first day of the month `back` months before the current one.
fn month_noon(back: u32) -> DateTime<Utc> {
    let offset = Config::test_default().local_offset;
    let first = month_start(local_date(Utc::now(), offset), back);
    first.and_hms_opt(12, 0, 0).unwrap().and_utc()
}

/// Log `count` sessions at noon on the first of the current month.
async fn log_sessions(db: &MemoryDb, user_id: &str, sport: SportType, count: usize) {
    for _ in 0..count {
        log_session_at(db, user_id, sport, month_noon(0)).await;
    }
}

#[tokio::test]
async fn test_no_activity_unlocks_nothing() {
    let db = common::seeded_memory_db();
    let state = common::test_state(&db);

    let evaluation = state.badge_service.check("u1").await;
    assert!(!evaluation.timed_out);
    assert!(evaluation.unlocked.is_empty());
    assert_eq!(db.unlock_count("u1"), 0);
}

#[tokio::test]
async fn test_first_session_unlocks_only_first_workout() {
    let db = common::seeded_memory_db();
    let state = common::test_state(&db);
    let ten_am = Utc.with_ymd_and_hms(2024, 5, 14, 10, 0, 0).unwrap();

    let first = state
        .badge_service
        .record_session("u1", SportType::Running, ten_am)
        .await
        .unwrap();
    assert_eq!(codes(&first.unlocked), vec!["first_workout"]);

    let second = state.badge_service.check("u1").await;
    assert!(second.unlocked.is_empty());
    assert_eq!(db.unlock_count("u1"), 1);
}

#[tokio::test]
async fn test_oversized_catalog_goal_run_is_harmless() {
    let db = common::seeded_memory_db();
    let state = common::test_state(&db);
    db.insert_badge(Badge {
        code: "goal_forever".to_string(),
        name: "Goal forever".to_string(),
        description: None,
        icon: None,
        image_url: None,
        category: Some(BadgeCategory::Special),
        rarity: Rarity::Legendary,
        points: 100,
        condition_type: Some("monthly_goal_streak".to_string()),
        condition_value: Some(1e12),
        created_at: None,
    });
    db.set_monthly_target("u1", 1);
    db.set_note_count("u1", 1);
    log_sessions(&db, "u1", SportType::Velo, 1).await;

    let evaluation = state.badge_service.check("u1").await;
    assert!(!evaluation.timed_out);
    let unlocked = codes(&evaluation.unlocked);
    assert!(unlocked.contains(&"monthly_goal".to_string()));
    assert!(unlocked.contains(&"note_taker".to_string()));
    assert!(!unlocked.contains(&"goal_forever".to_string()));
}

#[tokio::test]
async fn test_repeated_evaluation_is_idempotent() {
    let db = common::seeded_memory_db();
    let state = common::test_state(&db);
    db.set_note_count("u1", 1);

    let first = state.badge_service.check("u1").await;
    assert_eq!(codes(&first.unlocked), vec!["note_taker"]);

    for _ in 0..3 {
        let again = state.badge_service.check("u1").await;
        assert!(again.unlocked.is_empty());
    }
    assert_eq!(db.unlock_count("u1"), 1);
}

#[tokio::test]
async fn test_concurrent_evaluations_unlock_once() {
    let db = common::seeded_memory_db();
    let state = common::test_state(&db);
    db.set_note_count("u1", 50);
    db.set_weight_entries("u1", 12);

    let runs = (0..8).map(|_| state.badge_service.check("u1"));
    let results = futures_util::future::join_all(runs).await;

    let mut all: Vec<String> = results
        .iter()
        .flat_map(|r| r.unlocked.iter().map(|u| u.badge_code.clone()))
        .collect();
    all.sort();
    // Each badge returned as new by exactly one of the runs
    assert_eq!(all, vec!["note_master", "note_taker", "weight_tracker"]);
    assert_eq!(db.unlock_count("u1"), 3);
}

#[tokio::test]
async fn test_concurrent_unlock_of_same_badge() {
    let db = common::seeded_memory_db();
    let state = common::test_state(&db);

    let attempts = (0..16).map(|_| state.recorder.unlock("u1", "first_workout"));
    let outcomes = futures_util::future::join_all(attempts).await;

    let unlocked = outcomes
        .iter()
        .filter(|o| matches!(o, Ok(UnlockOutcome::Unlocked(_))))
        .count();
    let already = outcomes
        .iter()
        .filter(|o| matches!(o, Ok(UnlockOutcome::AlreadyUnlocked)))
        .count();
    assert_eq!(unlocked, 1);
    assert_eq!(already, 15);
    assert_eq!(db.unlock_count("u1"), 1);
}

#[tokio::test]
async fn test_thresholds_are_exact() {
    let db = common::seeded_memory_db();
    let state = common::test_state(&db);

    log_sessions(&db, "u1", SportType::Musculation, 9).await;
    let unlocked = state.badge_service.check("u1").await.unlocked;
    assert!(unlocked.iter().any(|u| u.badge_code == "first_workout"));
    assert!(!unlocked.iter().any(|u| u.badge_code == "workout_10"));

    log_sessions(&db, "u1", SportType::Musculation, 1).await;
    let unlocked = state.badge_service.check("u1").await.unlocked;
    assert!(unlocked.iter().any(|u| u.badge_code == "workout_10"));
}

#[tokio::test]
async fn test_cross_category_minimum() {
    let db = common::seeded_memory_db();
    let state = common::test_state(&db);

    log_sessions(&db, "u1", SportType::Musculation, 10).await;
    log_sessions(&db, "u1", SportType::Crossfit, 10).await;
    log_sessions(&db, "u1", SportType::Velo, 10).await;
    log_sessions(&db, "u1", SportType::Running, 9).await;
    let first = codes(&state.badge_service.check("u1").await.unlocked);
    assert!(!first.contains(&"versatile_athlete".to_string()));
    assert!(first.contains(&"strength_warrior".to_string()));

    log_sessions(&db, "u1", SportType::Running, 1).await;
    let second = codes(&state.badge_service.check("u1").await.unlocked);
    assert!(second.contains(&"versatile_athlete".to_string()));
    assert!(second.contains(&"endurance_runner".to_string()));
}

#[tokio::test]
async fn test_best_streak_unlocks_after_streak_broke() {
    let db = common::seeded_memory_db();
    let state = common::test_state(&db);
    let today = Utc::now().date_naive();
    let start = today - Duration::days(40);
    db.add_streak_dates("u1", (0..7).map(|i| start + Duration::days(i)));

    let summary = state.badge_service.streak_summary("u1").await.unwrap();
    assert_eq!(summary.current, 0);
    assert_eq!(summary.best, 7);

    let unlocked = state.badge_service.check("u1").await.unlocked;
    assert_eq!(codes(&unlocked), vec!["streak_7"]);
}

#[tokio::test]
async fn test_monthly_goal_boundary() {
    let db = common::seeded_memory_db();
    let state = common::test_state(&db);
    db.set_monthly_target("u1", 10);

    log_sessions(&db, "u1", SportType::Running, 9).await;
    let unlocked = codes(&state.badge_service.check("u1").await.unlocked);
    assert!(!unlocked.contains(&"monthly_goal".to_string()));

    log_sessions(&db, "u1", SportType::Running, 1).await;
    let unlocked = codes(&state.badge_service.check("u1").await.unlocked);
    assert!(unlocked.contains(&"monthly_goal".to_string()));
    assert!(!unlocked.contains(&"monthly_goal_3".to_string()));
}

#[tokio::test]
async fn test_three_consecutive_goal_months() {
    let db = common::seeded_memory_db();
    let state = common::test_state(&db);
    db.set_monthly_target("u1", 2);

    // The first of the current and two previous months
    for back in 0..3 {
        let at = month_noon(back);
        log_session_at(&db, "u1", SportType::Velo, at).await;
        log_session_at(&db, "u1", SportType::Velo, at).await;
    }

    let unlocked = codes(&state.badge_service.check("u1").await.unlocked);
    assert!(unlocked.contains(&"monthly_goal".to_string()));
    assert!(unlocked.contains(&"monthly_goal_3".to_string()));
}

#[tokio::test]
async fn test_failed_source_does_not_block_others() {
    let db = common::seeded_memory_db();
    let state = common::test_state(&db);
    db.set_note_count("u1", 1);
    db.set_weight_entries("u1", 10);
    db.fail_operation("weight_entry_count");
    db.fail_operation("streak_dates");

    let unlocked = state.badge_service.check("u1").await.unlocked;
    assert_eq!(codes(&unlocked), vec!["note_taker"]);
}

#[tokio::test]
async fn test_slow_source_is_skipped_not_awaited() {
    let db = common::seeded_memory_db();
    let state = common::test_state(&db);
    db.set_note_count("u1", 1);
    // Longer than the per-source timeout, shorter than the overall one
    db.delay_operation(
        "performance_bests",
        state.config.source_timeout + StdDuration::from_secs(1),
    );

    let evaluation = state.badge_service.check("u1").await;
    assert!(!evaluation.timed_out);
    assert_eq!(codes(&evaluation.unlocked), vec!["note_taker"]);
}

#[tokio::test]
async fn test_catalog_badge_with_condition_tag() {
    let db = common::seeded_memory_db();
    let state = common::test_state(&db);
    db.insert_badge(Badge {
        code: "note_legend".to_string(),
        name: "Note legend".to_string(),
        description: None,
        icon: None,
        image_url: None,
        category: Some(BadgeCategory::Special),
        rarity: Rarity::Legendary,
        points: 100,
        condition_type: Some("note_count".to_string()),
        condition_value: Some(200.0),
        created_at: None,
    });
    db.set_note_count("u1", 200);

    let unlocked = state.badge_service.check("u1").await.unlocked;
    let got: HashSet<String> = unlocked.into_iter().map(|u| u.badge_code).collect();
    assert!(got.contains("note_legend"));
    assert!(got.contains("note_master"));

    let joined = state.badge_service.user_badges("u1").await.unwrap();
    let legend = joined.iter().find(|u| u.badge_code == "note_legend").unwrap();
    assert_eq!(legend.badge.as_ref().unwrap().rarity, Rarity::Legendary);
}

#[tokio::test]
async fn test_unlock_feed_receives_new_unlocks() {
    let db = common::seeded_memory_db();
    let state = common::test_state(&db);
    let mut subscription = state.unlock_feed.subscribe("u1");
    db.set_note_count("u1", 1);

    state.badge_service.check("u1").await;

    let event = subscription.next().await.unwrap();
    assert_eq!(event.badge_code, "note_taker");
    assert!(event.badge.is_some());

    // Stored rows do not carry the joined badge
    let stored = db.user_badges("u1").await.unwrap();
    assert!(stored[0].badge.is_none());
}
