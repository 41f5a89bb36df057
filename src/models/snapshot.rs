//! Per-evaluation activity aggregates.
//!
//! An `ActivitySnapshot` is assembled from scratch for every badge evaluation
//! and never stored. Each field is fetched independently; `None` means that
//! source failed or timed out, and every rule reading it is skipped.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use std::collections::HashMap;

use crate::models::{PerformanceBests, SportType};

/// Monthly target plus trailing monthly session counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonthlyGoalHistory {
    /// Configured target; `None` (or zero) means no goal set
    pub target: Option<u32>,
    /// Session counts per month, index 0 = current month, going back in time
    pub counts: Vec<u32>,
}

impl MonthlyGoalHistory {
    /// Target, if one is configured and non-zero.
    pub fn effective_target(&self) -> Option<u32> {
        self.target.filter(|t| *t > 0)
    }
}

/// Aggregated activity for one user at evaluation time.
#[derive(Debug, Clone)]
pub struct ActivitySnapshot {
    /// Local calendar date the evaluation runs on
    pub today: NaiveDate,
    /// Local offset used for time-of-day checks
    pub offset: FixedOffset,

    pub total_sessions: Option<u32>,
    pub sessions_by_sport: Option<HashMap<SportType, u32>>,
    pub note_count: Option<u32>,
    pub weight_entries: Option<u32>,
    /// Best lifts; a user with no performance row has all-zero bests
    pub performance: Option<PerformanceBests>,
    pub session_times: Option<Vec<DateTime<Utc>>>,
    pub streak_dates: Option<Vec<NaiveDate>>,
    pub monthly_goal: Option<MonthlyGoalHistory>,
}

impl ActivitySnapshot {
    /// Snapshot with every source missing.
    pub fn empty(today: NaiveDate, offset: FixedOffset) -> Self {
        Self {
            today,
            offset,
            total_sessions: None,
            sessions_by_sport: None,
            note_count: None,
            weight_entries: None,
            performance: None,
            session_times: None,
            streak_dates: None,
            monthly_goal: None,
        }
    }

    /// Session count for one sport, if the breakdown is available.
    pub fn sport_count(&self, sport: SportType) -> Option<u32> {
        self.sessions_by_sport
            .as_ref()
            .map(|by_sport| by_sport.get(&sport).copied().unwrap_or(0))
    }
}
