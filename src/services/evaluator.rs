// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Badge evaluation.
//!
//! Evaluating a user:
//! 1. Load the rule set (built-in rules plus catalog-driven ones)
//! 2. Fetch every activity source concurrently, each with its own timeout
//! 3. Check each rule whose source is available
//! 4. Hand every satisfied, not-yet-held badge to the unlock recorder
//!
//! A failing source or a failing unlock write only loses the badges that
//! depend on it. Evaluation itself never fails.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{FixedOffset, NaiveDate, Utc};
use futures_util::{stream, StreamExt};
use serde::Serialize;

use crate::db::{ActivityStore, GamificationStore};
use crate::error::AppError;
use crate::models::{ActivitySnapshot, MonthlyGoalHistory, UserBadge};
use crate::services::recorder::{UnlockOutcome, UnlockRecorder};
use crate::services::rules::{DataSource, RuleSet};
use crate::time_utils::{local_date, month_window};

/// Unlock writes in flight at once for one evaluation.
const MAX_CONCURRENT_UNLOCKS: usize = 4;

/// Why a source is missing from a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("{source_name} failed: {error}")]
    Failed {
        source_name: DataSource,
        error: AppError,
    },

    #[error("{source_name} timed out after {timeout:?}")]
    TimedOut {
        source_name: DataSource,
        timeout: Duration,
    },
}

/// Result of an evaluation run under an overall deadline.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Evaluation {
    /// Badges unlocked by this run, with catalog entries joined
    pub unlocked: Vec<UserBadge>,
    /// True if the deadline expired; `unlocked` is then empty
    pub timed_out: bool,
}

/// Decides which badges a user has earned and records new unlocks.
#[derive(Clone)]
pub struct BadgeEvaluator {
    activity: Arc<dyn ActivityStore>,
    gamification: Arc<dyn GamificationStore>,
    recorder: UnlockRecorder,
    offset: FixedOffset,
    source_timeout: Duration,
}

impl BadgeEvaluator {
    pub fn new(
        activity: Arc<dyn ActivityStore>,
        gamification: Arc<dyn GamificationStore>,
        recorder: UnlockRecorder,
        offset: FixedOffset,
        source_timeout: Duration,
    ) -> Self {
        Self {
            activity,
            gamification,
            recorder,
            offset,
            source_timeout,
        }
    }

    /// Evaluate every rule for `user_id` and return the newly unlocked badges.
    pub async fn evaluate(&self, user_id: &str) -> Vec<UserBadge> {
        let today = local_date(Utc::now(), self.offset);

        let (rules, held) = tokio::join!(self.rule_set(), self.held_codes(user_id));
        let snapshot = self.snapshot(user_id, today, rules.months_needed()).await;

        let candidates: Vec<String> = rules
            .satisfied(&snapshot)
            .into_iter()
            .filter(|code| held.as_ref().is_none_or(|held| !held.contains(*code)))
            .map(str::to_string)
            .collect();

        if candidates.is_empty() {
            tracing::debug!(user_id, "No new badges earned");
            return Vec::new();
        }

        let unlocked: Vec<UserBadge> = stream::iter(candidates)
            .map(|code| async move { self.unlock_one(user_id, &code).await })
            .buffer_unordered(MAX_CONCURRENT_UNLOCKS)
            .filter_map(|unlock| async move { unlock })
            .collect()
            .await;

        tracing::info!(
            user_id,
            count = unlocked.len(),
            badges = ?unlocked.iter().map(|u| u.badge_code.as_str()).collect::<Vec<_>>(),
            "Badge evaluation complete"
        );
        unlocked
    }

    /// Run [`evaluate`](Self::evaluate) under an overall deadline.
    ///
    /// Unlocks already written when the deadline hits stay written and remain
    /// visible through the pending-unlock query.
    pub async fn evaluate_within(&self, user_id: &str, deadline: Duration) -> Evaluation {
        match tokio::time::timeout(deadline, self.evaluate(user_id)).await {
            Ok(unlocked) => Evaluation {
                unlocked,
                timed_out: false,
            },
            Err(_) => {
                tracing::warn!(
                    user_id,
                    timeout_ms = deadline.as_millis() as u64,
                    "Badge evaluation timed out"
                );
                Evaluation {
                    unlocked: Vec::new(),
                    timed_out: true,
                }
            }
        }
    }

    /// Assemble the activity snapshot, one failure boundary per source.
    pub async fn snapshot(&self, user_id: &str, today: NaiveDate, months: u32) -> ActivitySnapshot {
        let store = &self.activity;
        let (
            total_sessions,
            sessions_by_sport,
            note_count,
            weight_entries,
            performance,
            session_times,
            streak_dates,
            monthly_goal,
        ) = tokio::join!(
            self.fetch(user_id, DataSource::TotalSessions, store.total_sessions(user_id)),
            self.fetch(
                user_id,
                DataSource::SessionsBySport,
                store.sessions_by_sport(user_id)
            ),
            self.fetch(user_id, DataSource::Notes, store.note_count(user_id)),
            self.fetch(
                user_id,
                DataSource::WeightEntries,
                store.weight_entry_count(user_id)
            ),
            self.fetch(
                user_id,
                DataSource::Performance,
                store.performance_bests(user_id)
            ),
            self.fetch(user_id, DataSource::SessionTimes, store.session_times(user_id)),
            self.fetch(user_id, DataSource::StreakHistory, store.streak_dates(user_id)),
            self.fetch(
                user_id,
                DataSource::MonthlyGoal,
                self.monthly_goal(user_id, today, months)
            ),
        );

        ActivitySnapshot {
            today,
            offset: self.offset,
            total_sessions,
            sessions_by_sport,
            note_count,
            weight_entries,
            // No performance row means nothing lifted yet
            performance: performance.map(Option::unwrap_or_default),
            session_times,
            streak_dates,
            monthly_goal,
        }
    }

    /// Await one source under the per-source timeout, logging failures.
    async fn fetch<T>(
        &self,
        user_id: &str,
        source_name: DataSource,
        fut: impl Future<Output = Result<T, AppError>>,
    ) -> Option<T> {
        let result = match tokio::time::timeout(self.source_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(error)) => Err(SourceError::Failed { source_name, error }),
            Err(_) => Err(SourceError::TimedOut {
                source_name,
                timeout: self.source_timeout,
            }),
        };

        result
            .map_err(|e| {
                tracing::warn!(
                    user_id,
                    source = %source_name,
                    error = %e,
                    "Activity source unavailable, dependent badges skipped"
                );
            })
            .ok()
    }

    /// Monthly target plus session counts for the last `months` months.
    async fn monthly_goal(
        &self,
        user_id: &str,
        today: NaiveDate,
        months: u32,
    ) -> Result<MonthlyGoalHistory, AppError> {
        if months == 0 {
            return Ok(MonthlyGoalHistory::default());
        }

        let target = self.activity.monthly_target(user_id).await?;
        let mut history = MonthlyGoalHistory {
            target,
            counts: Vec::new(),
        };
        if history.effective_target().is_none() {
            return Ok(history);
        }

        let counts = (0..months).map(|back| {
            let (start, end) = month_window(today, back, self.offset);
            self.activity.sessions_between(user_id, start, end)
        });
        history.counts = futures_util::future::try_join_all(counts).await?;
        Ok(history)
    }

    /// Built-in rules plus catalog rules; built-in only if the catalog is
    /// unavailable.
    async fn rule_set(&self) -> RuleSet {
        match tokio::time::timeout(self.source_timeout, self.gamification.all_badges()).await {
            Ok(Ok(catalog)) => RuleSet::from_catalog(&catalog),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Badge catalog unavailable, using built-in rules");
                RuleSet::builtin()
            }
            Err(_) => {
                tracing::warn!("Badge catalog timed out, using built-in rules");
                RuleSet::builtin()
            }
        }
    }

    /// Codes the user already holds, so satisfied rules skip the write.
    ///
    /// `None` if unknown; every satisfied badge is then attempted and the
    /// recorder's insert-if-absent keeps it idempotent.
    async fn held_codes(&self, user_id: &str) -> Option<HashSet<String>> {
        match tokio::time::timeout(self.source_timeout, self.gamification.user_badges(user_id))
            .await
        {
            Ok(Ok(unlocks)) => Some(unlocks.into_iter().map(|u| u.badge_code).collect()),
            Ok(Err(e)) => {
                tracing::warn!(user_id, error = %e, "Could not load existing unlocks");
                None
            }
            Err(_) => {
                tracing::warn!(user_id, "Loading existing unlocks timed out");
                None
            }
        }
    }

    async fn unlock_one(&self, user_id: &str, badge_code: &str) -> Option<UserBadge> {
        match self.recorder.unlock(user_id, badge_code).await {
            Ok(UnlockOutcome::Unlocked(unlock)) => Some(unlock),
            Ok(UnlockOutcome::AlreadyUnlocked | UnlockOutcome::BadgeNotFound) => None,
            Err(e) => {
                tracing::warn!(user_id, badge_code, error = %e, "Failed to record unlock");
                None
            }
        }
    }
}
