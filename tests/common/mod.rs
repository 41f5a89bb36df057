// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use fitness_badges::config::Config;
use fitness_badges::db::{FirestoreDb, MemoryDb};
use fitness_badges::routes::create_router;
use fitness_badges::services::catalog::default_catalog;
use fitness_badges::AppState;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Generate a unique user ID for test isolation.
#[allow(dead_code)]
pub fn unique_user_id(prefix: &str) -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}-{}", prefix, nanos)
}

/// In-memory database with the launch catalog loaded.
#[allow(dead_code)]
pub fn seeded_memory_db() -> MemoryDb {
    let db = MemoryDb::new();
    for badge in default_catalog() {
        db.insert_badge(badge);
    }
    db
}

/// Shared state over an in-memory database.
#[allow(dead_code)]
pub fn test_state(db: &MemoryDb) -> Arc<AppState> {
    let store = Arc::new(db.clone());
    Arc::new(AppState::new(Config::test_default(), store.clone(), store))
}

/// Create a test app backed by a seeded in-memory database.
/// Returns the router, the shared state and the database for seeding.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, MemoryDb) {
    let db = seeded_memory_db();
    let state = test_state(&db);
    (create_router(state.clone()), state, db)
}

/// Create a session token for `user_id`.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: &str, signing_key: &[u8]) -> String {
    fitness_badges::middleware::auth::create_jwt(user_id, signing_key)
        .expect("Failed to create JWT")
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}
