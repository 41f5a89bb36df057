// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Fitness badges: gamification backend for a workout tracker
//!
//! This crate decides which badges a user has earned from their logged
//! activity, records each unlock exactly once, and serves badges, streaks
//! and XP levels over an authenticated HTTP API.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use std::sync::Arc;

use config::Config;
use db::{ActivityStore, GamificationStore};
use services::{BadgeEvaluator, BadgeService, LevelService, UnlockFeed, UnlockRecorder};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub badge_service: BadgeService,
    pub recorder: UnlockRecorder,
    pub level_service: LevelService,
    pub unlock_feed: UnlockFeed,
}

impl AppState {
    /// Wire up the services over the given stores.
    pub fn new(
        config: Config,
        activity: Arc<dyn ActivityStore>,
        gamification: Arc<dyn GamificationStore>,
    ) -> Self {
        let unlock_feed = UnlockFeed::default();
        let recorder = UnlockRecorder::new(gamification.clone(), unlock_feed.clone());
        let evaluator = BadgeEvaluator::new(
            activity.clone(),
            gamification.clone(),
            recorder.clone(),
            config.local_offset,
            config.source_timeout,
        );
        let badge_service = BadgeService::new(
            activity,
            gamification.clone(),
            evaluator,
            config.local_offset,
            config.evaluation_timeout,
        );
        let level_service = LevelService::new(gamification);

        Self {
            config,
            badge_service,
            recorder,
            level_service,
            unlock_feed,
        }
    }
}
