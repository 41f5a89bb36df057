// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod activity;
pub mod badge;
pub mod level;
pub mod snapshot;
pub mod user;

pub use activity::{
    Lift, MonthlyStats, PerformanceBests, Session, SessionCounter, SportType, StreakDay,
};
pub use badge::{Badge, BadgeCategory, BadgeStats, Rarity, UserBadge};
pub use level::{LevelInfo, UserLevel};
pub use snapshot::{ActivitySnapshot, MonthlyGoalHistory};
pub use user::UserProfile;
