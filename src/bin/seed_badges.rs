// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Badge catalog seeder.
//!
//! Writes the launch catalog into the `badges` collection. Existing entries
//! with the same code are replaced, so the command can be re-run after the
//! catalog changes.
//!
//! Usage:
//! ```bash
//! # Against the emulator
//! FIRESTORE_EMULATOR_HOST=localhost:8081 cargo run --bin seed_badges
//!
//! # List what would be written
//! cargo run --bin seed_badges -- --dry-run
//! ```

use anyhow::Context;
use clap::Parser;
use fitness_badges::db::FirestoreDb;
use fitness_badges::services::catalog::default_catalog;

#[derive(Parser)]
#[command(name = "seed_badges", about = "Seed the badge catalog into Firestore")]
struct SeedArgs {
    /// GCP project ID (defaults to GCP_PROJECT_ID)
    #[arg(long)]
    project_id: Option<String>,

    /// Print the catalog without writing it
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = SeedArgs::parse();
    let catalog = default_catalog();

    if args.dry_run {
        for badge in &catalog {
            println!(
                "{:<20} {:<10} {:>3} pts  {}",
                badge.code,
                badge.rarity.label(),
                badge.points,
                badge.name
            );
        }
        return Ok(());
    }

    let project_id = args
        .project_id
        .or_else(|| std::env::var("GCP_PROJECT_ID").ok())
        .context("no project ID: pass --project-id or set GCP_PROJECT_ID")?;

    let db = FirestoreDb::new(&project_id)
        .await
        .context("failed to connect to Firestore")?;

    for badge in &catalog {
        db.upsert_badge(badge)
            .await
            .with_context(|| format!("failed to write badge {}", badge.code))?;
    }

    tracing::info!(project_id = %project_id, count = catalog.len(), "Badge catalog seeded");
    Ok(())
}
