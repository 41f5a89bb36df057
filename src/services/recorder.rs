// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Unlock recording and acknowledgement.

use std::sync::Arc;

use chrono::Utc;

use crate::db::GamificationStore;
use crate::error::{AppError, Result};
use crate::models::UserBadge;
use crate::services::notifications::UnlockFeed;

/// Result of a single unlock attempt.
#[derive(Debug, Clone)]
pub enum UnlockOutcome {
    /// This call created the unlock (badge joined)
    Unlocked(UserBadge),
    /// The user already had the badge; nothing was written
    AlreadyUnlocked,
    /// No catalog entry for the code; nothing was written
    BadgeNotFound,
}

/// Writes unlock records, at most one per (user, badge).
#[derive(Clone)]
pub struct UnlockRecorder {
    store: Arc<dyn GamificationStore>,
    feed: UnlockFeed,
}

impl UnlockRecorder {
    pub fn new(store: Arc<dyn GamificationStore>, feed: UnlockFeed) -> Self {
        Self { store, feed }
    }

    /// Record that `user_id` earned `badge_code`.
    ///
    /// Safe to call repeatedly and concurrently: only the first call for a
    /// pair returns `Unlocked`, and only that call publishes to the feed.
    pub async fn unlock(&self, user_id: &str, badge_code: &str) -> Result<UnlockOutcome> {
        let Some(badge) = self.store.badge_by_code(badge_code).await? else {
            tracing::warn!(user_id, badge_code, "Badge not in catalog, skipping unlock");
            return Ok(UnlockOutcome::BadgeNotFound);
        };

        let mut unlock = UserBadge::new(user_id, &badge, Utc::now());
        if !self.store.insert_unlock_if_absent(&unlock).await? {
            tracing::debug!(user_id, badge_code, "Badge already unlocked");
            return Ok(UnlockOutcome::AlreadyUnlocked);
        }

        tracing::info!(
            user_id,
            badge_code,
            rarity = ?badge.rarity,
            points = badge.points,
            "Badge unlocked"
        );

        unlock.badge = Some(badge);
        self.feed.publish(unlock.clone());
        Ok(UnlockOutcome::Unlocked(unlock))
    }

    /// Acknowledge one unlock so it is no longer reported as new.
    pub async fn mark_seen(&self, user_id: &str, unlock_id: &str) -> Result<()> {
        if self.store.mark_unlock_seen(user_id, unlock_id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound(format!("Unlock {}", unlock_id)))
        }
    }

    /// Acknowledge every pending unlock. Returns how many were pending.
    pub async fn mark_all_seen(&self, user_id: &str) -> Result<u32> {
        let count = self.store.mark_all_unlocks_seen(user_id).await?;
        tracing::debug!(user_id, count, "Marked unlocks as seen");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDb;
    use crate::services::catalog::default_catalog;

    fn recorder() -> (MemoryDb, UnlockRecorder, UnlockFeed) {
        let db = MemoryDb::new();
        for badge in default_catalog() {
            db.insert_badge(badge);
        }
        let feed = UnlockFeed::default();
        let recorder = UnlockRecorder::new(Arc::new(db.clone()), feed.clone());
        (db, recorder, feed)
    }

    #[tokio::test]
    async fn test_unlock_is_idempotent() {
        let (db, recorder, _) = recorder();

        let first = recorder.unlock("u1", "first_workout").await.unwrap();
        let UnlockOutcome::Unlocked(unlock) = first else {
            panic!("expected Unlocked, got {:?}", first);
        };
        assert!(unlock.is_new);
        assert_eq!(unlock.badge.as_ref().unwrap().code, "first_workout");

        let second = recorder.unlock("u1", "first_workout").await.unwrap();
        assert!(matches!(second, UnlockOutcome::AlreadyUnlocked));
        assert_eq!(db.unlock_count("u1"), 1);
    }

    #[tokio::test]
    async fn test_unknown_badge_writes_nothing() {
        let (db, recorder, _) = recorder();
        let outcome = recorder.unlock("u1", "does_not_exist").await.unwrap();
        assert!(matches!(outcome, UnlockOutcome::BadgeNotFound));
        assert_eq!(db.unlock_count("u1"), 0);
    }

    #[tokio::test]
    async fn test_only_new_unlocks_are_published() {
        let (_, recorder, feed) = recorder();
        let mut sub = feed.subscribe("u1");

        recorder.unlock("u1", "first_workout").await.unwrap();
        recorder.unlock("u1", "first_workout").await.unwrap();
        recorder.unlock("u1", "note_taker").await.unwrap();

        assert_eq!(sub.next().await.unwrap().badge_code, "first_workout");
        assert_eq!(sub.next().await.unwrap().badge_code, "note_taker");
    }

    #[tokio::test]
    async fn test_mark_seen() {
        let (db, recorder, _) = recorder();
        recorder.unlock("u1", "first_workout").await.unwrap();
        recorder.unlock("u1", "note_taker").await.unwrap();

        let id = UserBadge::document_id("u1", "first_workout");
        recorder.mark_seen("u1", &id).await.unwrap();

        let unlocks = db.user_badges("u1").await.unwrap();
        let seen = unlocks.iter().find(|u| u.id == id).unwrap();
        assert!(!seen.is_new);

        // Another user cannot acknowledge it
        let err = recorder.mark_seen("u2", &id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        assert_eq!(recorder.mark_all_seen("u1").await.unwrap(), 1);
        assert_eq!(recorder.mark_all_seen("u1").await.unwrap(), 0);
    }
}
