// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fitness Badges API Server
//!
//! Evaluates workout activity against the badge rules and serves unlocks,
//! streaks and levels to the mobile app.

use fitness_badges::{config::Config, db::FirestoreDb, AppState};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        local_offset = %config.local_offset,
        evaluation_timeout_ms = config.evaluation_timeout.as_millis() as u64,
        source_timeout_ms = config.source_timeout.as_millis() as u64,
        "Starting Fitness Badges API"
    );

    // Initialize Firestore database
    let db = Arc::new(FirestoreDb::new(&config.gcp_project_id).await?);

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), db.clone(), db));

    // Build router
    let app = fitness_badges::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fitness_badges=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
