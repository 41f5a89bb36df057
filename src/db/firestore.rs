// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Activity history (sessions, counters, notes, weights, performances, streak days)
//! - Badge catalog and per-user unlocks
//! - XP levels

use crate::db::{collections, ActivityStore, GamificationStore};
use crate::error::AppError;
use crate::models::badge::sort_catalog;
use crate::models::{
    Badge, PerformanceBests, Session, SessionCounter, SportType, StreakDay, UserBadge, UserLevel,
    UserProfile,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use firestore::errors::{BackoffError, FirestoreError};
use serde::Deserialize;
use std::collections::HashMap;

// Firestore limits batch/transaction writes to 500 operations.
// We use a safe limit of 400 to allow headroom.
const BATCH_SIZE: usize = 400;

/// Projection used when only the number of matching documents matters.
#[derive(Deserialize)]
struct CountedDoc {}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// Count documents in `collection` owned by `user_id`.
    async fn count_owned(
        &self,
        collection: &str,
        owner_field: &str,
        user_id: &str,
    ) -> Result<u32, AppError> {
        let docs: Vec<CountedDoc> = self
            .get_client()?
            .fluent()
            .select()
            .from(collection)
            .filter(|q| q.for_all([q.field(owner_field).eq(user_id)]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(docs.len() as u32)
    }

    /// All session counters for a user.
    async fn counters_for_user(&self, user_id: &str) -> Result<Vec<SessionCounter>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::SESSION_COUNTERS)
            .filter(|q| q.for_all([q.field("user_id").eq(user_id)]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Profile & Catalog Administration ───────────────────────

    /// Create or update a user profile.
    pub async fn upsert_user_profile(&self, profile: &UserProfile) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&profile.user_id)
            .object(profile)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Store the best-lifts record for a user.
    pub async fn set_performance_bests(
        &self,
        user_id: &str,
        bests: &PerformanceBests,
    ) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::PERFORMANCES)
            .document_id(user_id)
            .object(bests)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Create or replace a catalog badge (keyed by code).
    pub async fn upsert_badge(&self, badge: &Badge) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::BADGES)
            .document_id(&badge.code)
            .object(badge)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Helper Methods ────────────────────────────────────────────

    /// Helper to batch-write documents using transactions.
    async fn batch_update<T, F>(
        &self,
        items: &[T],
        collection: &str,
        id_extractor: F,
    ) -> Result<(), AppError>
    where
        T: serde::Serialize + for<'de> serde::Deserialize<'de> + Sync + Send,
        F: Fn(&T) -> String,
    {
        let client = self.get_client()?;

        for chunk in items.chunks(BATCH_SIZE) {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            for item in chunk {
                let doc_id = id_extractor(item);
                client
                    .fluent()
                    .update()
                    .in_col(collection)
                    .document_id(&doc_id)
                    .object(item)
                    .add_to_transaction(&mut transaction)
                    .map_err(|e| {
                        AppError::Database(format!(
                            "Failed to add update to transaction for {}: {}",
                            collection, e
                        ))
                    })?;
            }

            transaction.commit().await.map_err(|e| {
                AppError::Database(format!("Failed to commit batch update: {}", e))
            })?;
        }

        Ok(())
    }
}

#[async_trait]
impl ActivityStore for FirestoreDb {
    async fn total_sessions(&self, user_id: &str) -> Result<u32, AppError> {
        let counters = self.counters_for_user(user_id).await?;
        Ok(counters.iter().map(|c| c.count).sum())
    }

    async fn sessions_by_sport(
        &self,
        user_id: &str,
    ) -> Result<HashMap<SportType, u32>, AppError> {
        let counters = self.counters_for_user(user_id).await?;
        let mut by_sport = HashMap::new();
        for counter in counters {
            *by_sport.entry(counter.sport_type).or_insert(0) += counter.count;
        }
        Ok(by_sport)
    }

    async fn note_count(&self, user_id: &str) -> Result<u32, AppError> {
        self.count_owned(collections::NOTES, "user_id", user_id)
            .await
    }

    async fn weight_entry_count(&self, user_id: &str) -> Result<u32, AppError> {
        self.count_owned(collections::WEIGHT_ENTRIES, "user_id", user_id)
            .await
    }

    async fn performance_bests(
        &self,
        user_id: &str,
    ) -> Result<Option<PerformanceBests>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::PERFORMANCES)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn session_times(&self, user_id: &str) -> Result<Vec<DateTime<Utc>>, AppError> {
        let sessions: Vec<Session> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::SESSIONS)
            .filter(|q| q.for_all([q.field("user_id").eq(user_id)]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(sessions.into_iter().map(|s| s.started_at).collect())
    }

    async fn streak_dates(&self, user_id: &str) -> Result<Vec<NaiveDate>, AppError> {
        let days: Vec<StreakDay> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::STREAK_HISTORY)
            .filter(|q| q.for_all([q.field("user_id").eq(user_id)]))
            .order_by([("date", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(days.into_iter().map(|d| d.date).collect())
    }

    async fn monthly_target(&self, user_id: &str) -> Result<Option<u32>, AppError> {
        let profile: Option<UserProfile> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(profile.and_then(|p| p.monthly_target))
    }

    async fn monthly_counters(
        &self,
        user_id: &str,
        month_key: &str,
    ) -> Result<Vec<SessionCounter>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::SESSION_COUNTERS)
            .filter(|q| {
                q.for_all([
                    q.field("user_id").eq(user_id),
                    q.field("month_key").eq(month_key),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn sessions_between(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u32, AppError> {
        let start = start.timestamp();
        let end = end.timestamp();

        let docs: Vec<CountedDoc> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::SESSIONS)
            .filter(|q| {
                q.for_all([
                    q.field("user_id").eq(user_id),
                    q.field("started_at_unix").greater_than_or_equal(start),
                    q.field("started_at_unix").less_than(end),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(docs.len() as u32)
    }

    /// Store the session, its counter increment and the streak day in one transaction.
    async fn record_session(
        &self,
        session: &Session,
        local_date: NaiveDate,
    ) -> Result<(), AppError> {
        let client = self.get_client()?;
        let counter_id =
            SessionCounter::document_id(&session.user_id, &session.month_key, session.sport_type);

        let current: Option<SessionCounter> = client
            .fluent()
            .select()
            .by_id_in(collections::SESSION_COUNTERS)
            .obj()
            .one(&counter_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to read session counter: {}", e)))?;

        let now = crate::time_utils::format_utc_rfc3339(Utc::now());
        let counter = SessionCounter {
            user_id: session.user_id.clone(),
            month_key: session.month_key.clone(),
            sport_type: session.sport_type,
            count: current.map(|c| c.count).unwrap_or(0) + 1,
            updated_at: now,
        };
        let streak_day = StreakDay {
            user_id: session.user_id.clone(),
            date: local_date,
        };
        let session_id = format!(
            "{}_{}",
            urlencoding::encode(&session.user_id),
            session.started_at.timestamp_nanos_opt().unwrap_or(session.started_at_unix)
        );

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        client
            .fluent()
            .update()
            .in_col(collections::SESSIONS)
            .document_id(&session_id)
            .object(session)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add session to transaction: {}", e))
            })?;

        client
            .fluent()
            .update()
            .in_col(collections::SESSION_COUNTERS)
            .document_id(&counter_id)
            .object(&counter)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add counter to transaction: {}", e))
            })?;

        client
            .fluent()
            .update()
            .in_col(collections::STREAK_HISTORY)
            .document_id(StreakDay::document_id(&session.user_id, local_date))
            .object(&streak_day)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add streak day to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(
            user_id = %session.user_id,
            sport = %session.sport_type,
            month = %session.month_key,
            count = counter.count,
            "Session recorded"
        );

        Ok(())
    }
}

#[async_trait]
impl GamificationStore for FirestoreDb {
    async fn all_badges(&self) -> Result<Vec<Badge>, AppError> {
        let mut badges: Vec<Badge> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::BADGES)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        // Rarity is stored as a string, so Firestore ordering would be alphabetical
        sort_catalog(&mut badges);
        Ok(badges)
    }

    async fn badge_by_code(&self, code: &str) -> Result<Option<Badge>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::BADGES)
            .obj()
            .one(code)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create-only write: Firestore rejects the insert if the document exists.
    async fn insert_unlock_if_absent(&self, unlock: &UserBadge) -> Result<bool, AppError> {
        let record = unlock.without_badge();
        let result: Result<(), FirestoreError> = self
            .get_client()?
            .fluent()
            .insert()
            .into(collections::USER_BADGES)
            .document_id(&record.id)
            .object(&record)
            .execute()
            .await;

        match result {
            Ok(()) => Ok(true),
            Err(FirestoreError::DataConflictError(_)) => Ok(false),
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    async fn user_badges(&self, user_id: &str) -> Result<Vec<UserBadge>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::USER_BADGES)
            .filter(|q| q.for_all([q.field("user_id").eq(user_id)]))
            .order_by([(
                "unlocked_at",
                firestore::FirestoreQueryDirection::Descending,
            )])
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn mark_unlock_seen(&self, user_id: &str, unlock_id: &str) -> Result<bool, AppError> {
        let existing: Option<UserBadge> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USER_BADGES)
            .obj()
            .one(unlock_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let Some(mut unlock) = existing.filter(|u| u.user_id == user_id) else {
            return Ok(false);
        };

        if unlock.is_new {
            unlock.is_new = false;
            let _: () = self
                .get_client()?
                .fluent()
                .update()
                .in_col(collections::USER_BADGES)
                .document_id(unlock_id)
                .object(&unlock)
                .execute()
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        Ok(true)
    }

    async fn mark_all_unlocks_seen(&self, user_id: &str) -> Result<u32, AppError> {
        let pending: Vec<UserBadge> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::USER_BADGES)
            .filter(|q| {
                q.for_all([
                    q.field("user_id").eq(user_id),
                    q.field("is_new").eq(true),
                ])
            })
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let seen: Vec<UserBadge> = pending
            .into_iter()
            .map(|u| UserBadge { is_new: false, ..u })
            .collect();

        self.batch_update(&seen, collections::USER_BADGES, |u: &UserBadge| {
            u.id.clone()
        })
        .await?;

        tracing::debug!(user_id, count = seen.len(), "Marked unlocks as seen");
        Ok(seen.len() as u32)
    }

    async fn get_user_level(&self, user_id: &str) -> Result<Option<UserLevel>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collections::USER_LEVELS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Read and write the level row in one transaction, retried on contention.
    async fn add_user_xp(
        &self,
        user_id: &str,
        xp: u32,
        now: &str,
    ) -> Result<(UserLevel, UserLevel), AppError> {
        let user_id = user_id.to_string();
        let now = now.to_string();

        self.get_client()?
            .run_transaction(|db, transaction| {
                let user_id = user_id.clone();
                let now = now.clone();
                Box::pin(async move {
                    let previous: UserLevel = db
                        .fluent()
                        .select()
                        .by_id_in(collections::USER_LEVELS)
                        .obj()
                        .one(&user_id)
                        .await?
                        .unwrap_or_else(|| UserLevel::initial(&user_id, &now));
                    let updated = previous.with_xp_added(xp, &now);

                    db.fluent()
                        .update()
                        .in_col(collections::USER_LEVELS)
                        .document_id(&user_id)
                        .object(&updated)
                        .add_to_transaction(transaction)?;

                    Ok::<_, BackoffError<FirestoreError>>((previous, updated))
                })
            })
            .await
            .map_err(|e| AppError::Database(format!("Level transaction failed: {}", e)))
    }
}
