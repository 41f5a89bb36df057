// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory store implementing the same traits as Firestore.
//!
//! Used by tests and local runs without the emulator. Individual operations
//! can be made to fail or stall, which is how evaluator failure isolation is
//! exercised.

use crate::db::{ActivityStore, GamificationStore};
use crate::error::AppError;
use crate::models::badge::sort_catalog;
use crate::models::{
    Badge, PerformanceBests, Session, SessionCounter, SportType, UserBadge, UserLevel,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct Tables {
    badges: DashMap<String, Badge>,
    /// Keyed by `UserBadge::document_id`
    unlocks: DashMap<String, UserBadge>,
    sessions: DashMap<String, Vec<Session>>,
    /// Keyed by `SessionCounter::document_id`
    counters: DashMap<String, SessionCounter>,
    streak_days: DashMap<String, BTreeSet<NaiveDate>>,
    notes: DashMap<String, u32>,
    weight_entries: DashMap<String, u32>,
    performances: DashMap<String, PerformanceBests>,
    monthly_targets: DashMap<String, u32>,
    levels: DashMap<String, UserLevel>,
    /// Operation names that return a database error
    failing: DashMap<String, ()>,
    /// Operation names that sleep before answering
    delays: DashMap<String, Duration>,
}

/// Shared in-memory database. Clones share the same tables.
#[derive(Clone, Default)]
pub struct MemoryDb {
    tables: Arc<Tables>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call to `operation` fail with a database error.
    pub fn fail_operation(&self, operation: &str) {
        self.tables.failing.insert(operation.to_string(), ());
    }

    /// Make every call to `operation` sleep for `delay` first.
    pub fn delay_operation(&self, operation: &str, delay: Duration) {
        self.tables.delays.insert(operation.to_string(), delay);
    }

    async fn enter(&self, operation: &str) -> Result<(), AppError> {
        let delay = self.tables.delays.get(operation).map(|d| *d);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.tables.failing.contains_key(operation) {
            return Err(AppError::Database(format!(
                "{} unavailable (injected failure)",
                operation
            )));
        }
        Ok(())
    }

    // ─── Seeding ─────────────────────────────────────────────────

    pub fn insert_badge(&self, badge: Badge) {
        self.tables.badges.insert(badge.code.clone(), badge);
    }

    pub fn set_note_count(&self, user_id: &str, count: u32) {
        self.tables.notes.insert(user_id.to_string(), count);
    }

    pub fn set_weight_entries(&self, user_id: &str, count: u32) {
        self.tables.weight_entries.insert(user_id.to_string(), count);
    }

    pub fn set_performance_bests(&self, user_id: &str, bests: PerformanceBests) {
        self.tables.performances.insert(user_id.to_string(), bests);
    }

    pub fn set_monthly_target(&self, user_id: &str, target: u32) {
        self.tables
            .monthly_targets
            .insert(user_id.to_string(), target);
    }

    /// Add days to the streak history without logging sessions.
    pub fn add_streak_dates(&self, user_id: &str, dates: impl IntoIterator<Item = NaiveDate>) {
        self.tables
            .streak_days
            .entry(user_id.to_string())
            .or_default()
            .extend(dates);
    }

    /// Number of unlock rows stored for a user.
    pub fn unlock_count(&self, user_id: &str) -> usize {
        self.tables
            .unlocks
            .iter()
            .filter(|u| u.user_id == user_id)
            .count()
    }
}

#[async_trait]
impl ActivityStore for MemoryDb {
    async fn total_sessions(&self, user_id: &str) -> Result<u32, AppError> {
        self.enter("total_sessions").await?;
        Ok(self
            .tables
            .counters
            .iter()
            .filter(|c| c.user_id == user_id)
            .map(|c| c.count)
            .sum())
    }

    async fn sessions_by_sport(
        &self,
        user_id: &str,
    ) -> Result<HashMap<SportType, u32>, AppError> {
        self.enter("sessions_by_sport").await?;
        let mut by_sport = HashMap::new();
        for counter in self.tables.counters.iter().filter(|c| c.user_id == user_id) {
            *by_sport.entry(counter.sport_type).or_insert(0) += counter.count;
        }
        Ok(by_sport)
    }

    async fn note_count(&self, user_id: &str) -> Result<u32, AppError> {
        self.enter("note_count").await?;
        Ok(self.tables.notes.get(user_id).map(|n| *n).unwrap_or(0))
    }

    async fn weight_entry_count(&self, user_id: &str) -> Result<u32, AppError> {
        self.enter("weight_entry_count").await?;
        Ok(self
            .tables
            .weight_entries
            .get(user_id)
            .map(|n| *n)
            .unwrap_or(0))
    }

    async fn performance_bests(
        &self,
        user_id: &str,
    ) -> Result<Option<PerformanceBests>, AppError> {
        self.enter("performance_bests").await?;
        Ok(self.tables.performances.get(user_id).map(|p| p.clone()))
    }

    async fn session_times(&self, user_id: &str) -> Result<Vec<DateTime<Utc>>, AppError> {
        self.enter("session_times").await?;
        Ok(self
            .tables
            .sessions
            .get(user_id)
            .map(|sessions| sessions.iter().map(|s| s.started_at).collect())
            .unwrap_or_default())
    }

    async fn streak_dates(&self, user_id: &str) -> Result<Vec<NaiveDate>, AppError> {
        self.enter("streak_dates").await?;
        Ok(self
            .tables
            .streak_days
            .get(user_id)
            .map(|days| days.iter().rev().copied().collect())
            .unwrap_or_default())
    }

    async fn monthly_target(&self, user_id: &str) -> Result<Option<u32>, AppError> {
        self.enter("monthly_target").await?;
        Ok(self.tables.monthly_targets.get(user_id).map(|t| *t))
    }

    async fn monthly_counters(
        &self,
        user_id: &str,
        month_key: &str,
    ) -> Result<Vec<SessionCounter>, AppError> {
        self.enter("monthly_counters").await?;
        Ok(self
            .tables
            .counters
            .iter()
            .filter(|c| c.user_id == user_id && c.month_key == month_key)
            .map(|c| c.clone())
            .collect())
    }

    async fn sessions_between(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u32, AppError> {
        self.enter("sessions_between").await?;
        Ok(self
            .tables
            .sessions
            .get(user_id)
            .map(|sessions| {
                sessions
                    .iter()
                    .filter(|s| s.started_at >= start && s.started_at < end)
                    .count() as u32
            })
            .unwrap_or(0))
    }

    async fn record_session(
        &self,
        session: &Session,
        local_date: NaiveDate,
    ) -> Result<(), AppError> {
        self.enter("record_session").await?;

        let counter_id =
            SessionCounter::document_id(&session.user_id, &session.month_key, session.sport_type);
        let now = crate::time_utils::format_utc_rfc3339(Utc::now());
        self.tables
            .counters
            .entry(counter_id)
            .and_modify(|c| {
                c.count += 1;
                c.updated_at = now.clone();
            })
            .or_insert_with(|| SessionCounter {
                user_id: session.user_id.clone(),
                month_key: session.month_key.clone(),
                sport_type: session.sport_type,
                count: 1,
                updated_at: now.clone(),
            });

        self.tables
            .sessions
            .entry(session.user_id.clone())
            .or_default()
            .push(session.clone());

        self.tables
            .streak_days
            .entry(session.user_id.clone())
            .or_default()
            .insert(local_date);

        Ok(())
    }
}

#[async_trait]
impl GamificationStore for MemoryDb {
    async fn all_badges(&self) -> Result<Vec<Badge>, AppError> {
        self.enter("all_badges").await?;
        let mut badges: Vec<Badge> = self.tables.badges.iter().map(|b| b.clone()).collect();
        sort_catalog(&mut badges);
        Ok(badges)
    }

    async fn badge_by_code(&self, code: &str) -> Result<Option<Badge>, AppError> {
        self.enter("badge_by_code").await?;
        Ok(self.tables.badges.get(code).map(|b| b.clone()))
    }

    async fn insert_unlock_if_absent(&self, unlock: &UserBadge) -> Result<bool, AppError> {
        self.enter("insert_unlock_if_absent").await?;
        // The entry guard holds the shard lock, so check-and-insert is atomic
        match self.tables.unlocks.entry(unlock.id.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(unlock.without_badge());
                Ok(true)
            }
        }
    }

    async fn user_badges(&self, user_id: &str) -> Result<Vec<UserBadge>, AppError> {
        self.enter("user_badges").await?;
        let mut unlocks: Vec<UserBadge> = self
            .tables
            .unlocks
            .iter()
            .filter(|u| u.user_id == user_id)
            .map(|u| u.clone())
            .collect();
        unlocks.sort_by(|a, b| b.unlocked_at.cmp(&a.unlocked_at));
        Ok(unlocks)
    }

    async fn mark_unlock_seen(&self, user_id: &str, unlock_id: &str) -> Result<bool, AppError> {
        self.enter("mark_unlock_seen").await?;
        match self.tables.unlocks.get_mut(unlock_id) {
            Some(mut unlock) if unlock.user_id == user_id => {
                unlock.is_new = false;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_all_unlocks_seen(&self, user_id: &str) -> Result<u32, AppError> {
        self.enter("mark_all_unlocks_seen").await?;
        let mut changed = 0;
        for mut unlock in self.tables.unlocks.iter_mut() {
            if unlock.user_id == user_id && unlock.is_new {
                unlock.is_new = false;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn get_user_level(&self, user_id: &str) -> Result<Option<UserLevel>, AppError> {
        self.enter("get_user_level").await?;
        Ok(self.tables.levels.get(user_id).map(|l| l.clone()))
    }

    async fn add_user_xp(
        &self,
        user_id: &str,
        xp: u32,
        now: &str,
    ) -> Result<(UserLevel, UserLevel), AppError> {
        self.enter("add_user_xp").await?;
        // The entry guard holds the shard lock for the whole update
        let mut row = self
            .tables
            .levels
            .entry(user_id.to_string())
            .or_insert_with(|| UserLevel::initial(user_id, now));
        let previous = row.clone();
        *row = previous.with_xp_added(xp, now);
        Ok((previous, row.clone()))
    }
}
