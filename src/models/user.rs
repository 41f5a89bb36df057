//! User profile model.

use serde::{Deserialize, Serialize};

/// User profile stored in Firestore (keyed by user ID).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    /// Opaque user ID from the auth provider (also used as document ID)
    pub user_id: String,
    /// Display name
    #[serde(default)]
    pub display_name: Option<String>,
    /// Target number of sessions per calendar month
    #[serde(default)]
    pub monthly_target: Option<u32>,
    /// When the profile was created (ISO 8601)
    #[serde(default)]
    pub created_at: String,
}
