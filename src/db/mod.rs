//! Database layer.
//!
//! The badge engine only talks to storage through [`ActivityStore`] and
//! [`GamificationStore`]. Firestore is the production backend; the in-memory
//! backend implements the same traits for tests and local runs.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::AppError;
use crate::models::{
    Badge, PerformanceBests, Session, SessionCounter, SportType, UserBadge, UserLevel,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    pub const SESSIONS: &str = "sessions";
    /// Session counters keyed by (user, month, sport)
    pub const SESSION_COUNTERS: &str = "session_counters";
    pub const NOTES: &str = "notes";
    pub const WEIGHT_ENTRIES: &str = "weight_entries";
    /// Best lifts, keyed by user ID
    pub const PERFORMANCES: &str = "performances";
    /// One document per (user, day) with a qualifying action
    pub const STREAK_HISTORY: &str = "streak_history";
    pub const BADGES: &str = "badges";
    /// Unlocks keyed by (user, badge code)
    pub const USER_BADGES: &str = "user_badges";
    pub const USER_LEVELS: &str = "user_levels";
}

/// Read access to a user's activity history, plus session logging.
#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// Total sessions across all months and sports.
    async fn total_sessions(&self, user_id: &str) -> Result<u32, AppError>;

    /// Total sessions per sport across all months.
    async fn sessions_by_sport(&self, user_id: &str)
        -> Result<HashMap<SportType, u32>, AppError>;

    async fn note_count(&self, user_id: &str) -> Result<u32, AppError>;

    async fn weight_entry_count(&self, user_id: &str) -> Result<u32, AppError>;

    /// Latest best-lifts record, if the user ever saved one.
    async fn performance_bests(&self, user_id: &str)
        -> Result<Option<PerformanceBests>, AppError>;

    /// Timestamps of every logged session.
    async fn session_times(&self, user_id: &str) -> Result<Vec<DateTime<Utc>>, AppError>;

    /// Distinct days in the streak history.
    async fn streak_dates(&self, user_id: &str) -> Result<Vec<NaiveDate>, AppError>;

    /// Configured monthly session target.
    async fn monthly_target(&self, user_id: &str) -> Result<Option<u32>, AppError>;

    /// Counters for one `YYYY-MM` month, one per sport logged that month.
    async fn monthly_counters(
        &self,
        user_id: &str,
        month_key: &str,
    ) -> Result<Vec<SessionCounter>, AppError>;

    /// Sessions with `start <= started_at < end`.
    async fn sessions_between(
        &self,
        user_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u32, AppError>;

    /// Store a session, bump its month/sport counter and mark `local_date`
    /// in the streak history.
    async fn record_session(&self, session: &Session, local_date: NaiveDate)
        -> Result<(), AppError>;
}

/// Badge catalog, unlock table and XP levels.
#[async_trait]
pub trait GamificationStore: Send + Sync {
    /// Every catalog badge, ordered by rarity then points.
    async fn all_badges(&self) -> Result<Vec<Badge>, AppError>;

    async fn badge_by_code(&self, code: &str) -> Result<Option<Badge>, AppError>;

    /// Create the unlock unless one already exists for its (user, badge).
    ///
    /// Returns `true` if this call created the record.
    async fn insert_unlock_if_absent(&self, unlock: &UserBadge) -> Result<bool, AppError>;

    /// A user's unlocks (without joined badges), newest first.
    async fn user_badges(&self, user_id: &str) -> Result<Vec<UserBadge>, AppError>;

    /// Clear `is_new` on one unlock owned by `user_id`.
    ///
    /// Returns `false` if no such unlock exists.
    async fn mark_unlock_seen(&self, user_id: &str, unlock_id: &str) -> Result<bool, AppError>;

    /// Clear `is_new` on every pending unlock. Returns how many changed.
    async fn mark_all_unlocks_seen(&self, user_id: &str) -> Result<u32, AppError>;

    async fn get_user_level(&self, user_id: &str) -> Result<Option<UserLevel>, AppError>;

    /// Atomically add `xp` to the user's level row, creating it at level one
    /// if missing. Returns the row before and after the grant.
    async fn add_user_xp(
        &self,
        user_id: &str,
        xp: u32,
        now: &str,
    ) -> Result<(UserLevel, UserLevel), AppError>;
}
