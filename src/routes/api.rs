// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::level::XP_PER_CHALLENGE;
use crate::models::{Badge, BadgeStats, LevelInfo, MonthlyStats, SportType, UserBadge};
use crate::services::{Evaluation, StreakSummary, XpGrant};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use futures_util::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::{Validate, ValidationError};

/// Allowed clock skew for client-supplied session times.
const MAX_FUTURE_SKEW_MINUTES: i64 = 5;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/badges", get(list_badges))
        .route("/api/badges/events", get(badge_events))
        .route("/api/me/badges", get(my_badges))
        .route("/api/me/badges/new", get(new_badges))
        .route("/api/me/badges/stats", get(badge_stats))
        .route("/api/me/badges/check", post(check_badges))
        .route("/api/me/badges/seen", post(mark_all_seen))
        .route("/api/me/badges/{unlock_id}/seen", post(mark_seen))
        .route("/api/me/sessions", post(record_session))
        .route("/api/me/sessions/stats", get(session_stats))
        .route("/api/me/streak", get(get_streak))
        .route("/api/me/level", get(get_level))
        .route("/api/me/challenges/complete", post(complete_challenge))
}

// ─── Catalog ─────────────────────────────────────────────────

async fn list_badges(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Badge>>> {
    Ok(Json(state.badge_service.all_badges().await?))
}

/// Server-sent events for the caller's new unlocks.
async fn badge_events(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    tracing::debug!(user_id = %user.user_id, "Unlock stream opened");
    let subscription = state.unlock_feed.subscribe(&user.user_id);

    let events = stream::unfold(subscription, |mut subscription| async move {
        let unlock = subscription.next().await?;
        let event = Event::default()
            .event("badge_unlocked")
            .id(unlock.id.clone())
            .json_data(&unlock)
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Failed to serialize unlock event");
                Event::default().comment("unserializable unlock")
            });
        Some((Ok(event), subscription))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

// ─── User Badges ─────────────────────────────────────────────

async fn my_badges(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<UserBadge>>> {
    Ok(Json(state.badge_service.user_badges(&user.user_id).await?))
}

async fn new_badges(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<UserBadge>>> {
    Ok(Json(state.badge_service.new_badges(&user.user_id).await?))
}

async fn badge_stats(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<BadgeStats>> {
    Ok(Json(state.badge_service.badge_stats(&user.user_id).await?))
}

/// Evaluate the caller's badges (app start, or after saving a note,
/// weight entry or performance).
///
/// Always succeeds; a slow evaluation returns `timed_out: true`.
async fn check_badges(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Json<Evaluation> {
    Json(state.badge_service.check(&user.user_id).await)
}

/// Response for marking every pending unlock as seen.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MarkSeenResponse {
    pub marked: u32,
}

async fn mark_all_seen(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<MarkSeenResponse>> {
    let marked = state.recorder.mark_all_seen(&user.user_id).await?;
    Ok(Json(MarkSeenResponse { marked }))
}

async fn mark_seen(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(unlock_id): Path<String>,
) -> Result<StatusCode> {
    state.recorder.mark_seen(&user.user_id, &unlock_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ─── Sessions & Streak ───────────────────────────────────────

/// Request body for logging a workout session.
#[derive(Debug, Deserialize, Validate)]
pub struct RecordSessionRequest {
    pub sport_type: SportType,
    /// Defaults to the time of the request
    #[serde(default)]
    #[validate(custom(function = "not_in_future"))]
    pub started_at: Option<DateTime<Utc>>,
}

fn not_in_future(at: &DateTime<Utc>) -> std::result::Result<(), ValidationError> {
    if *at > Utc::now() + chrono::Duration::minutes(MAX_FUTURE_SKEW_MINUTES) {
        return Err(ValidationError::new("started_at_in_future"));
    }
    Ok(())
}

async fn record_session(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<RecordSessionRequest>,
) -> Result<(StatusCode, Json<Evaluation>)> {
    body.validate()?;
    let at = body.started_at.unwrap_or_else(Utc::now);

    let evaluation = state
        .badge_service
        .record_session(&user.user_id, body.sport_type, at)
        .await?;
    Ok((StatusCode::CREATED, Json(evaluation)))
}

/// Query parameters for monthly session stats.
#[derive(Debug, Deserialize)]
pub struct SessionStatsQuery {
    /// `YYYY-MM`; the current month if absent
    pub month: Option<String>,
}

async fn session_stats(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<SessionStatsQuery>,
) -> Result<Json<MonthlyStats>> {
    let stats = state
        .badge_service
        .monthly_stats(&user.user_id, query.month.as_deref())
        .await?;
    Ok(Json(stats))
}

async fn get_streak(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<StreakSummary>> {
    Ok(Json(state.badge_service.streak_summary(&user.user_id).await?))
}

// ─── Levels ──────────────────────────────────────────────────

async fn get_level(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<LevelInfo>> {
    Ok(Json(state.level_service.level_info(&user.user_id).await?))
}

/// Request body for a completed daily challenge.
#[derive(Debug, Deserialize, Validate)]
pub struct CompleteChallengeRequest {
    #[validate(length(min = 1, max = 100))]
    pub challenge_id: String,
}

async fn complete_challenge(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<CompleteChallengeRequest>,
) -> Result<Json<XpGrant>> {
    body.validate()?;
    if body.challenge_id.trim().is_empty() {
        return Err(AppError::BadRequest("challenge_id is blank".to_string()));
    }

    tracing::info!(
        user_id = %user.user_id,
        challenge_id = %body.challenge_id,
        "Daily challenge completed"
    );
    let grant = state
        .level_service
        .add_xp(&user.user_id, XP_PER_CHALLENGE)
        .await?;
    Ok(Json(grant))
}
