// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! XP and level bookkeeping.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::db::GamificationStore;
use crate::error::Result;
use crate::models::LevelInfo;
use crate::time_utils::format_utc_rfc3339;

/// Result of granting XP.
#[derive(Debug, Clone, Serialize)]
pub struct XpGrant {
    pub xp_added: u32,
    pub leveled_up: bool,
    pub previous_level: u32,
    pub level: LevelInfo,
}

#[derive(Clone)]
pub struct LevelService {
    store: Arc<dyn GamificationStore>,
}

impl LevelService {
    pub fn new(store: Arc<dyn GamificationStore>) -> Self {
        Self { store }
    }

    pub async fn level_info(&self, user_id: &str) -> Result<LevelInfo> {
        let level = self.store.get_user_level(user_id).await?;
        Ok(LevelInfo::from_level(level.as_ref()))
    }

    /// Add `xp` to the user's total and recompute the level.
    ///
    /// A user without a level row starts at level one. Concurrent grants
    /// all land.
    pub async fn add_xp(&self, user_id: &str, xp: u32) -> Result<XpGrant> {
        let now = format_utc_rfc3339(Utc::now());
        let (previous, state) = self.store.add_user_xp(user_id, xp, &now).await?;
        let previous_level = previous.level;

        let leveled_up = state.level > previous_level;
        if leveled_up {
            tracing::info!(user_id, level = state.level, previous_level, "Level up");
        }

        Ok(XpGrant {
            xp_added: xp,
            leveled_up,
            previous_level,
            level: LevelInfo::from_level(Some(&state)),
        })
    }
}
