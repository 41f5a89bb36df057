// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod badges;
pub mod catalog;
pub mod evaluator;
pub mod level;
pub mod notifications;
pub mod recorder;
pub mod rules;
pub mod streak;

pub use badges::BadgeService;
pub use evaluator::{BadgeEvaluator, Evaluation, SourceError};
pub use level::{LevelService, XpGrant};
pub use notifications::{UnlockFeed, UnlockSubscription};
pub use recorder::{UnlockOutcome, UnlockRecorder};
pub use rules::{BadgeRule, Condition, DataSource, RuleSet};
pub use streak::StreakSummary;
