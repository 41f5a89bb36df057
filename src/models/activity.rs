// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Workout activity records read by the badge evaluator.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::time_utils::{local_date, month_key};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Tracked workout disciplines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum SportType {
    Musculation,
    Crossfit,
    Running,
    Velo,
}

impl SportType {
    pub const ALL: [SportType; 4] = [
        SportType::Musculation,
        SportType::Crossfit,
        SportType::Running,
        SportType::Velo,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SportType::Musculation => "musculation",
            SportType::Crossfit => "crossfit",
            SportType::Running => "running",
            SportType::Velo => "velo",
        }
    }
}

impl fmt::Display for SportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SportType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SportType::ALL
            .into_iter()
            .find(|sport| sport.as_str() == s)
            .ok_or_else(|| format!("unknown sport type: {}", s))
    }
}

/// A logged workout session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub sport_type: SportType,
    /// When the session was logged (UTC)
    pub started_at: DateTime<Utc>,
    /// `started_at` as Unix seconds, for range queries
    pub started_at_unix: i64,
    /// Local calendar month ("YYYY-MM")
    pub month_key: String,
}

impl Session {
    /// A session logged at `at`, bucketed into the local month for `offset`.
    pub fn new(
        user_id: &str,
        sport_type: SportType,
        at: DateTime<Utc>,
        offset: FixedOffset,
    ) -> Self {
        Self {
            user_id: user_id.to_string(),
            sport_type,
            started_at: at,
            started_at_unix: at.timestamp(),
            month_key: month_key(local_date(at, offset)),
        }
    }
}

/// Per-user, per-month, per-sport session counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCounter {
    pub user_id: String,
    pub month_key: String,
    pub sport_type: SportType,
    pub count: u32,
    pub updated_at: String,
}

impl SessionCounter {
    /// Document ID for a counter: one per (user, month, sport).
    pub fn document_id(user_id: &str, month_key: &str, sport: SportType) -> String {
        format!("{}_{}_{}", urlencoding::encode(user_id), month_key, sport)
    }
}

/// Session totals per sport for one month.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MonthlyStats {
    /// `YYYY-MM`
    pub month: String,
    pub musculation: u32,
    pub crossfit: u32,
    pub running: u32,
    pub velo: u32,
    pub total: u32,
}

impl MonthlyStats {
    /// Fold the month's counters; sports with no counter are zero.
    pub fn from_counters(month: &str, counters: &[SessionCounter]) -> Self {
        let mut stats = Self {
            month: month.to_string(),
            ..Self::default()
        };
        for counter in counters.iter().filter(|c| c.month_key == month) {
            let slot = match counter.sport_type {
                SportType::Musculation => &mut stats.musculation,
                SportType::Crossfit => &mut stats.crossfit,
                SportType::Running => &mut stats.running,
                SportType::Velo => &mut stats.velo,
            };
            *slot += counter.count;
            stats.total += counter.count;
        }
        stats
    }
}

/// One day on which the user performed a qualifying action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreakDay {
    pub user_id: String,
    pub date: NaiveDate,
}

impl StreakDay {
    /// One document per (user, day), which deduplicates the history.
    pub fn document_id(user_id: &str, date: NaiveDate) -> String {
        format!("{}_{}", urlencoding::encode(user_id), date.format("%Y-%m-%d"))
    }
}

/// Strength lifts tracked in the performance record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lift {
    Squat,
    Bench,
    Deadlift,
}

/// Best recorded lifts for a user, in kilograms.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PerformanceBests {
    #[serde(default)]
    pub squat: f64,
    #[serde(default)]
    pub bench: f64,
    #[serde(default)]
    pub deadlift: f64,
}

impl PerformanceBests {
    pub fn get(&self, lift: Lift) -> f64 {
        match lift {
            Lift::Squat => self.squat,
            Lift::Bench => self.bench,
            Lift::Deadlift => self.deadlift,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sport_type_round_trips_through_str() {
        for sport in SportType::ALL {
            assert_eq!(sport.as_str().parse::<SportType>(), Ok(sport));
        }
        assert!("yoga".parse::<SportType>().is_err());
    }

    #[test]
    fn test_streak_day_document_id_is_per_day() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(StreakDay::document_id("u1", date), "u1_2024-03-09");
    }

    #[test]
    fn test_counter_document_id() {
        assert_eq!(
            SessionCounter::document_id("u1", "2024-03", SportType::Velo),
            "u1_2024-03_velo"
        );
    }

    #[test]
    fn test_session_month_uses_local_offset() {
        use chrono::TimeZone;

        // 23:30 UTC on Jan 31 is already February at UTC+1
        let at = Utc.with_ymd_and_hms(2024, 1, 31, 23, 30, 0).unwrap();
        let utc = Session::new("u1", SportType::Running, at, FixedOffset::east_opt(0).unwrap());
        let cet = Session::new("u1", SportType::Running, at, FixedOffset::east_opt(3600).unwrap());

        assert_eq!(utc.month_key, "2024-01");
        assert_eq!(cet.month_key, "2024-02");
        assert_eq!(cet.started_at_unix, at.timestamp());
    }

    #[test]
    fn test_monthly_stats_from_counters() {
        let counter = |month: &str, sport, count| SessionCounter {
            user_id: "u1".to_string(),
            month_key: month.to_string(),
            sport_type: sport,
            count,
            updated_at: String::new(),
        };
        let counters = vec![
            counter("2024-03", SportType::Running, 4),
            counter("2024-03", SportType::Musculation, 2),
            counter("2024-02", SportType::Velo, 9),
        ];

        let stats = MonthlyStats::from_counters("2024-03", &counters);
        assert_eq!(stats.running, 4);
        assert_eq!(stats.musculation, 2);
        assert_eq!(stats.velo, 0);
        assert_eq!(stats.total, 6);
        assert_eq!(MonthlyStats::from_counters("2023-12", &counters).total, 0);
    }
}
