// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Streak metrics over a per-day activity history.
//!
//! Two metrics are computed from the same history and can disagree:
//! - the *current* streak is the still-active run ending today or yesterday,
//!   shown to the user;
//! - the *best* streak is the longest run anywhere in the history, and is
//!   what streak badges are checked against. A badge earned during a past
//!   run stays earned after that run breaks.

use chrono::NaiveDate;
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Both streak metrics for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct StreakSummary {
    pub current: u32,
    pub best: u32,
}

impl StreakSummary {
    pub fn from_dates(dates: &[NaiveDate], today: NaiveDate) -> Self {
        Self {
            current: current_streak(dates, today),
            best: best_streak(dates),
        }
    }
}

/// Length of the active run of consecutive days.
///
/// The most recent day must be `today` or yesterday; every earlier day must
/// be exactly one day before the previously counted one. Days after `today`
/// are ignored and duplicates count once.
pub fn current_streak(dates: &[NaiveDate], today: NaiveDate) -> u32 {
    let mut days: Vec<NaiveDate> = dates.iter().copied().filter(|d| *d <= today).collect();
    days.sort_unstable_by(|a, b| b.cmp(a));
    days.dedup();

    let Some(&latest) = days.first() else {
        return 0;
    };
    if (today - latest).num_days() > 1 {
        return 0;
    }

    let mut streak = 1;
    let mut previous = latest;
    for &day in &days[1..] {
        if (previous - day).num_days() != 1 {
            break;
        }
        streak += 1;
        previous = day;
    }
    streak
}

/// Longest run of consecutive calendar days anywhere in the history.
pub fn best_streak(dates: &[NaiveDate]) -> u32 {
    let mut days = dates.to_vec();
    days.sort_unstable();
    days.dedup();

    let mut best = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;
    for day in days {
        run = match previous {
            Some(prev) if (day - prev).num_days() == 1 => run + 1,
            _ => 1,
        };
        best = best.max(run);
        previous = Some(day);
    }
    best
}
