// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Badge catalog entries and per-user unlock records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Prestige tier of a badge. Variant order is the prestige order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    /// Display color (hex) used by clients for the badge frame.
    pub fn color(self) -> &'static str {
        match self {
            Rarity::Common => "#9CA3AF",
            Rarity::Rare => "#3B82F6",
            Rarity::Epic => "#A855F7",
            Rarity::Legendary => "#F59E0B",
        }
    }

    /// Localized display label.
    pub fn label(self) -> &'static str {
        match self {
            Rarity::Common => "Commun",
            Rarity::Rare => "Rare",
            Rarity::Epic => "Épique",
            Rarity::Legendary => "Légendaire",
        }
    }
}

/// Cosmetic grouping of badges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "snake_case")]
pub enum BadgeCategory {
    Workout,
    Consistency,
    Performance,
    Special,
    WorkoutType,
}

/// Catalog entry, stored in the `badges` collection keyed by `code`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Badge {
    /// Stable identifier (also used as document ID)
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub category: Option<BadgeCategory>,
    pub rarity: Rarity,
    #[serde(default)]
    pub points: u32,
    /// Rule tag for catalog-driven badges (see `services::rules`)
    #[serde(default)]
    pub condition_type: Option<String>,
    /// Threshold for `condition_type`
    #[serde(default)]
    pub condition_value: Option<f64>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Sort badges the way the catalog is presented: rarity, then points.
pub fn sort_catalog(badges: &mut [Badge]) {
    badges.sort_by(|a, b| {
        a.rarity
            .cmp(&b.rarity)
            .then(a.points.cmp(&b.points))
            .then_with(|| a.code.cmp(&b.code))
    });
}

/// A badge earned by a user. At most one exists per (user, badge).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserBadge {
    /// Document ID, derived from (user_id, badge_code)
    pub id: String,
    pub user_id: String,
    pub badge_code: String,
    pub unlocked_at: DateTime<Utc>,
    /// True until the user has seen the unlock notification
    pub is_new: bool,
    #[serde(default)]
    pub progress: Option<f64>,
    /// Joined catalog entry (never persisted)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<Badge>,
}

impl UserBadge {
    /// Build a fresh, unseen unlock record.
    pub fn new(user_id: &str, badge: &Badge, now: DateTime<Utc>) -> Self {
        Self {
            id: Self::document_id(user_id, &badge.code),
            user_id: user_id.to_string(),
            badge_code: badge.code.clone(),
            unlocked_at: now,
            is_new: true,
            progress: None,
            badge: None,
        }
    }

    /// Document ID for a (user, badge) pair.
    ///
    /// The unlock collection is keyed by this, so the pair is unique by construction.
    pub fn document_id(user_id: &str, badge_code: &str) -> String {
        format!(
            "{}_{}",
            urlencoding::encode(user_id),
            urlencoding::encode(badge_code)
        )
    }

    /// Copy without the joined badge, for storage.
    pub fn without_badge(&self) -> Self {
        Self {
            badge: None,
            ..self.clone()
        }
    }
}

/// Aggregate counts over a user's unlocked badges.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct BadgeStats {
    pub total_badges: u32,
    pub total_points: u32,
    pub common_badges: u32,
    pub rare_badges: u32,
    pub epic_badges: u32,
    pub legendary_badges: u32,
}

impl BadgeStats {
    /// Tally unlocks. Unlocks without a joined badge count toward the total only.
    pub fn from_unlocks(unlocks: &[UserBadge]) -> Self {
        let mut stats = Self {
            total_badges: unlocks.len() as u32,
            ..Self::default()
        };

        for badge in unlocks.iter().filter_map(|u| u.badge.as_ref()) {
            stats.total_points += badge.points;
            match badge.rarity {
                Rarity::Common => stats.common_badges += 1,
                Rarity::Rare => stats.rare_badges += 1,
                Rarity::Epic => stats.epic_badges += 1,
                Rarity::Legendary => stats.legendary_badges += 1,
            }
        }

        stats
    }
}
