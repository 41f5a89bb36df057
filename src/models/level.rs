// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! XP level progression.
//!
//! Leveling from `n` to `n + 1` costs `50 + 50 * n` XP, so level 1 needs
//! 100 XP (five daily challenges), level 2 needs 150, and so on.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// XP granted for completing a daily challenge.
pub const XP_PER_CHALLENGE: u32 = 20;

/// Stored level state for a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserLevel {
    pub user_id: String,
    pub level: u32,
    /// XP accumulated toward the next level
    pub current_xp: u32,
    pub total_xp: u32,
    pub updated_at: String,
}

impl UserLevel {
    /// Level-one state with no XP.
    pub fn initial(user_id: &str, now: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            level: 1,
            current_xp: 0,
            total_xp: 0,
            updated_at: now.to_string(),
        }
    }
}

impl UserLevel {
    /// Copy with `xp` added to the lifetime total and the level recomputed.
    pub fn with_xp_added(&self, xp: u32, now: &str) -> Self {
        let total_xp = self.total_xp.saturating_add(xp);
        let (level, current_xp) = level_from_total_xp(total_xp);
        Self {
            user_id: self.user_id.clone(),
            level,
            current_xp,
            total_xp,
            updated_at: now.to_string(),
        }
    }
}

/// XP needed to go from `level` to `level + 1`.
pub fn xp_required_for_level(level: u32) -> u32 {
    50 + level * 50
}

/// Compute `(level, current_xp)` from lifetime XP.
pub fn level_from_total_xp(total_xp: u32) -> (u32, u32) {
    let mut level = 1;
    let mut remaining = total_xp;

    while remaining >= xp_required_for_level(level) {
        remaining -= xp_required_for_level(level);
        level += 1;
    }

    (level, remaining)
}

/// Progress toward the next level, as a rounded percentage capped at 100.
pub fn progress_percentage(current_xp: u32, level: u32) -> u32 {
    let required = xp_required_for_level(level) as f64;
    let pct = (current_xp as f64 / required * 100.0).round() as u32;
    pct.min(100)
}

/// Level summary for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LevelInfo {
    pub level: u32,
    pub current_xp: u32,
    pub xp_required: u32,
    pub progress_percentage: u32,
    pub total_xp: u32,
}

impl LevelInfo {
    /// Build display info; a user with no level row is shown at level one.
    pub fn from_level(level: Option<&UserLevel>) -> Self {
        match level {
            Some(l) => Self {
                level: l.level,
                current_xp: l.current_xp,
                xp_required: xp_required_for_level(l.level),
                progress_percentage: progress_percentage(l.current_xp, l.level),
                total_xp: l.total_xp,
            },
            None => Self {
                level: 1,
                current_xp: 0,
                xp_required: xp_required_for_level(1),
                progress_percentage: 0,
                total_xp: 0,
            },
        }
    }
}
