// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Badge queries and session logging for the API layer.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, Utc};

use crate::db::{ActivityStore, GamificationStore};
use crate::error::{AppError, Result};
use crate::models::{Badge, BadgeStats, MonthlyStats, Session, SportType, UserBadge};
use crate::services::evaluator::{BadgeEvaluator, Evaluation};
use crate::services::streak::StreakSummary;
use crate::time_utils::{local_date, month_key, parse_month_key};

#[derive(Clone)]
pub struct BadgeService {
    activity: Arc<dyn ActivityStore>,
    gamification: Arc<dyn GamificationStore>,
    evaluator: BadgeEvaluator,
    offset: FixedOffset,
    evaluation_timeout: Duration,
}

impl BadgeService {
    pub fn new(
        activity: Arc<dyn ActivityStore>,
        gamification: Arc<dyn GamificationStore>,
        evaluator: BadgeEvaluator,
        offset: FixedOffset,
        evaluation_timeout: Duration,
    ) -> Self {
        Self {
            activity,
            gamification,
            evaluator,
            offset,
            evaluation_timeout,
        }
    }

    /// Full catalog, by rarity then points.
    pub async fn all_badges(&self) -> Result<Vec<Badge>> {
        self.gamification.all_badges().await
    }

    /// A user's unlocks with their catalog entries, newest first.
    ///
    /// Unlocks whose badge has left the catalog are returned without one.
    pub async fn user_badges(&self, user_id: &str) -> Result<Vec<UserBadge>> {
        let (unlocks, catalog) = tokio::try_join!(
            self.gamification.user_badges(user_id),
            self.gamification.all_badges()
        )?;

        let by_code: HashMap<String, Badge> =
            catalog.into_iter().map(|b| (b.code.clone(), b)).collect();

        Ok(unlocks
            .into_iter()
            .map(|mut unlock| {
                unlock.badge = by_code.get(&unlock.badge_code).cloned();
                unlock
            })
            .collect())
    }

    /// Unlocks the user has not acknowledged yet.
    pub async fn new_badges(&self, user_id: &str) -> Result<Vec<UserBadge>> {
        let mut unlocks = self.user_badges(user_id).await?;
        unlocks.retain(|u| u.is_new);
        Ok(unlocks)
    }

    pub async fn badge_stats(&self, user_id: &str) -> Result<BadgeStats> {
        let unlocks = self.user_badges(user_id).await?;
        Ok(BadgeStats::from_unlocks(&unlocks))
    }

    pub async fn has_badge(&self, user_id: &str, badge_code: &str) -> Result<bool> {
        let unlocks = self.gamification.user_badges(user_id).await?;
        Ok(unlocks.iter().any(|u| u.badge_code == badge_code))
    }

    /// Evaluate the user under the configured deadline.
    pub async fn check(&self, user_id: &str) -> Evaluation {
        self.evaluator
            .evaluate_within(user_id, self.evaluation_timeout)
            .await
    }

    /// Log a session, then evaluate.
    ///
    /// The session is stored even if the evaluation times out.
    pub async fn record_session(
        &self,
        user_id: &str,
        sport: SportType,
        at: DateTime<Utc>,
    ) -> Result<Evaluation> {
        let session = Session::new(user_id, sport, at, self.offset);
        self.activity
            .record_session(&session, local_date(at, self.offset))
            .await?;

        tracing::info!(
            user_id,
            sport = %sport,
            month = %session.month_key,
            "Session recorded"
        );

        Ok(self.check(user_id).await)
    }

    /// Per-sport session totals for a `YYYY-MM` month, the current local
    /// month when `month` is `None`.
    pub async fn monthly_stats(&self, user_id: &str, month: Option<&str>) -> Result<MonthlyStats> {
        let month = match month {
            Some(raw) => parse_month_key(raw)
                .map(month_key)
                .ok_or_else(|| AppError::BadRequest(format!("Invalid month: {}", raw)))?,
            None => month_key(local_date(Utc::now(), self.offset)),
        };
        let counters = self.activity.monthly_counters(user_id, &month).await?;
        Ok(MonthlyStats::from_counters(&month, &counters))
    }

    /// Current and best streak as of today.
    pub async fn streak_summary(&self, user_id: &str) -> Result<StreakSummary> {
        let dates = self.activity.streak_dates(user_id).await?;
        let today = local_date(Utc::now(), self.offset);
        Ok(StreakSummary::from_dates(&dates, today))
    }
}
