// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Launch badge catalog.
//!
//! Seeded into the `badges` collection by the `seed_badges` binary. Every
//! built-in rule has an entry here.

use crate::models::{Badge, BadgeCategory, Rarity};

fn points(rarity: Rarity) -> u32 {
    match rarity {
        Rarity::Common => 10,
        Rarity::Rare => 25,
        Rarity::Epic => 50,
        Rarity::Legendary => 100,
    }
}

fn badge(
    code: &str,
    name: &str,
    description: &str,
    icon: &str,
    category: BadgeCategory,
    rarity: Rarity,
) -> Badge {
    Badge {
        code: code.to_string(),
        name: name.to_string(),
        description: Some(description.to_string()),
        icon: Some(icon.to_string()),
        image_url: None,
        category: Some(category),
        rarity,
        points: points(rarity),
        condition_type: None,
        condition_value: None,
        created_at: None,
    }
}

/// All launch badges, in catalog order.
pub fn default_catalog() -> Vec<Badge> {
    use BadgeCategory::*;
    use Rarity::*;

    let mut catalog = vec![
        badge("first_workout", "Premier pas", "Complete your first session", "🎯", Workout, Common),
        badge("workout_10", "Habitué", "Complete 10 sessions", "💪", Workout, Common),
        badge("note_taker", "Carnet ouvert", "Write your first note", "📝", Special, Common),
        badge("weight_tracker", "Sur la balance", "Log your weight 10 times", "⚖️", Consistency, Common),
        badge("monthly_goal", "Objectif atteint", "Reach your monthly session target", "📅", Consistency, Common),
        badge("workout_50", "Assidu", "Complete 50 sessions", "🔥", Workout, Rare),
        badge("early_bird", "Lève-tôt", "Start a session before 8am", "🌅", Special, Rare),
        badge("heavy_lifter", "Gros squat", "Squat 100 kg", "🏋️", Performance, Rare),
        badge("bench_king", "Roi du développé", "Bench press 100 kg", "👑", Performance, Rare),
        badge("note_master", "Plume d'or", "Write 50 notes", "🖋️", Special, Rare),
        badge("strength_warrior", "Guerrier", "20 strength sessions (musculation or crossfit)", "⚔️", WorkoutType, Rare),
        badge("endurance_runner", "Coureur", "20 endurance sessions (running or cycling)", "🏃", WorkoutType, Rare),
        badge("streak_7", "Semaine parfaite", "Train 7 days in a row", "📆", Consistency, Rare),
        badge("workout_100", "Centurion", "Complete 100 sessions", "💯", Workout, Epic),
        badge("streak_30", "Mois parfait", "Train 30 days in a row", "🗓️", Consistency, Epic),
        badge("deadlift_beast", "Bête du soulevé", "Deadlift 150 kg", "🦍", Performance, Epic),
        badge("monthly_goal_3", "Régularité", "Reach your monthly target 3 months in a row", "🏅", Consistency, Epic),
        badge("strength_master", "Maître de la force", "50 strength sessions (musculation or crossfit)", "🛡️", WorkoutType, Epic),
        badge("endurance_beast", "Infatigable", "50 endurance sessions (running or cycling)", "🚴", WorkoutType, Epic),
        badge("workout_250", "Légende", "Complete 250 sessions", "🏆", Workout, Legendary),
        badge("versatile_athlete", "Polyvalent", "10 sessions in each sport", "🌟", WorkoutType, Legendary),
    ];

    crate::models::badge::sort_catalog(&mut catalog);
    catalog
}
