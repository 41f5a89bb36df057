// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Badge rule table.
//!
//! Every badge the engine can award is a [`BadgeRule`]: a badge code plus a
//! [`Condition`] over an [`ActivitySnapshot`]. The built-in table covers the
//! launch catalog; catalog badges carrying a recognised `condition_type`
//! become extra rules without code changes.

use std::collections::HashSet;
use std::fmt;

use chrono::Timelike;

use crate::models::{ActivitySnapshot, Badge, Lift, MonthlyGoalHistory, SportType};
use crate::services::streak::best_streak;

/// Extra months scanned beyond the required run for consecutive goals.
const MONTH_SCAN_SLACK: u32 = 3;
/// Longest run of goal months a catalog badge may ask for.
pub const MAX_GOAL_MONTHS: u32 = 24;

const STRENGTH_SPORTS: &[SportType] = &[SportType::Musculation, SportType::Crossfit];
const ENDURANCE_SPORTS: &[SportType] = &[SportType::Running, SportType::Velo];

/// One independently fetched part of the snapshot.
///
/// A failed source only disables the rules that read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataSource {
    TotalSessions,
    SessionsBySport,
    Notes,
    WeightEntries,
    Performance,
    SessionTimes,
    StreakHistory,
    MonthlyGoal,
}

impl DataSource {
    pub fn as_str(self) -> &'static str {
        match self {
            DataSource::TotalSessions => "total_sessions",
            DataSource::SessionsBySport => "sessions_by_sport",
            DataSource::Notes => "notes",
            DataSource::WeightEntries => "weight_entries",
            DataSource::Performance => "performance",
            DataSource::SessionTimes => "session_times",
            DataSource::StreakHistory => "streak_history",
            DataSource::MonthlyGoal => "monthly_goal",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unlock condition. Thresholds are inclusive.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    TotalSessions(u32),
    Notes(u32),
    WeightEntries(u32),
    LiftAtLeast { lift: Lift, kg: f64 },
    /// Sum of sessions over `sports` reaches `min`
    CombinedSessions {
        sports: &'static [SportType],
        min: u32,
    },
    /// Every sport in `sports` individually reaches `min`
    EverySport {
        sports: &'static [SportType],
        min: u32,
    },
    /// Any session started before `hour` local time
    SessionBeforeHour(u32),
    /// Longest historical run of consecutive days
    BestStreak(u32),
    /// Current month reaches the configured target
    MonthlyGoal,
    /// Target reached in `n` consecutive months
    ConsecutiveMonthlyGoals(u32),
}

impl Condition {
    /// The snapshot field this condition reads.
    pub fn source(&self) -> DataSource {
        match self {
            Condition::TotalSessions(_) => DataSource::TotalSessions,
            Condition::Notes(_) => DataSource::Notes,
            Condition::WeightEntries(_) => DataSource::WeightEntries,
            Condition::LiftAtLeast { .. } => DataSource::Performance,
            Condition::CombinedSessions { .. } | Condition::EverySport { .. } => {
                DataSource::SessionsBySport
            }
            Condition::SessionBeforeHour(_) => DataSource::SessionTimes,
            Condition::BestStreak(_) => DataSource::StreakHistory,
            Condition::MonthlyGoal | Condition::ConsecutiveMonthlyGoals(_) => {
                DataSource::MonthlyGoal
            }
        }
    }

    /// Check the condition.
    ///
    /// Returns `None` when the source it reads is missing from the snapshot.
    pub fn evaluate(&self, snapshot: &ActivitySnapshot) -> Option<bool> {
        match self {
            Condition::TotalSessions(min) => snapshot.total_sessions.map(|n| n >= *min),
            Condition::Notes(min) => snapshot.note_count.map(|n| n >= *min),
            Condition::WeightEntries(min) => snapshot.weight_entries.map(|n| n >= *min),
            Condition::LiftAtLeast { lift, kg } => {
                snapshot.performance.as_ref().map(|p| p.get(*lift) >= *kg)
            }
            Condition::CombinedSessions { sports, min } => {
                snapshot.sessions_by_sport.as_ref()?;
                let total: u32 = sports
                    .iter()
                    .filter_map(|s| snapshot.sport_count(*s))
                    .sum();
                Some(total >= *min)
            }
            Condition::EverySport { sports, min } => {
                snapshot.sessions_by_sport.as_ref()?;
                Some(
                    sports
                        .iter()
                        .all(|s| snapshot.sport_count(*s).unwrap_or(0) >= *min),
                )
            }
            Condition::SessionBeforeHour(hour) => snapshot.session_times.as_ref().map(|times| {
                times
                    .iter()
                    .any(|t| t.with_timezone(&snapshot.offset).hour() < *hour)
            }),
            Condition::BestStreak(days) => snapshot
                .streak_dates
                .as_ref()
                .map(|dates| best_streak(dates) >= *days),
            Condition::MonthlyGoal => snapshot.monthly_goal.as_ref().map(|history| {
                match (history.effective_target(), history.counts.first()) {
                    (Some(target), Some(count)) => *count >= target,
                    _ => false,
                }
            }),
            Condition::ConsecutiveMonthlyGoals(required) => snapshot
                .monthly_goal
                .as_ref()
                .map(|history| consecutive_goal_months(history, *required)),
        }
    }

    /// Trailing months of session counts this condition needs, counting the
    /// current month.
    pub fn months_needed(&self) -> u32 {
        match self {
            Condition::MonthlyGoal => 1,
            Condition::ConsecutiveMonthlyGoals(required) => {
                required.saturating_add(MONTH_SCAN_SLACK)
            }
            _ => 0,
        }
    }

    /// Build a condition from a catalog `condition_type` tag and value.
    pub fn from_catalog(tag: &str, value: Option<f64>) -> Option<Self> {
        let value = value.filter(|v| v.is_finite() && *v >= 0.0);
        // Counts compare against integers, so 2.5 sessions means 3
        let count = || value.map(|v| v.ceil().min(u32::MAX as f64) as u32);

        let condition = match tag {
            "workout_count" => Condition::TotalSessions(count()?),
            "note_count" => Condition::Notes(count()?),
            "weight_count" => Condition::WeightEntries(count()?),
            "squat_kg" => Condition::LiftAtLeast {
                lift: Lift::Squat,
                kg: value?,
            },
            "bench_kg" => Condition::LiftAtLeast {
                lift: Lift::Bench,
                kg: value?,
            },
            "deadlift_kg" => Condition::LiftAtLeast {
                lift: Lift::Deadlift,
                kg: value?,
            },
            "streak_days" => Condition::BestStreak(count()?),
            "early_session_hour" => Condition::SessionBeforeHour(count()?.min(24)),
            "monthly_goal" => Condition::MonthlyGoal,
            "monthly_goal_streak" => {
                Condition::ConsecutiveMonthlyGoals(count()?.clamp(1, MAX_GOAL_MONTHS))
            }
            _ => return None,
        };
        Some(condition)
    }
}

/// Whether the monthly target was met in `required` consecutive months,
/// scanning back from the current month.
///
/// Only the most recent `required + 3` months are considered. A missing or
/// zero target never succeeds.
pub fn consecutive_goal_months(history: &MonthlyGoalHistory, required: u32) -> bool {
    let Some(target) = history.effective_target() else {
        return false;
    };

    let mut run = 0;
    for count in history
        .counts
        .iter()
        .take(required.saturating_add(MONTH_SCAN_SLACK) as usize)
    {
        if *count >= target {
            run += 1;
            if run >= required {
                return true;
            }
        } else {
            run = 0;
        }
    }
    false
}

/// A badge code and the condition that unlocks it.
#[derive(Debug, Clone, PartialEq)]
pub struct BadgeRule {
    pub code: String,
    pub condition: Condition,
}

impl BadgeRule {
    fn new(code: &str, condition: Condition) -> Self {
        Self {
            code: code.to_string(),
            condition,
        }
    }
}

/// Rules for the launch catalog.
pub fn builtin_rules() -> Vec<BadgeRule> {
    use Condition::*;

    let mut rules = vec![
        BadgeRule::new("first_workout", TotalSessions(1)),
        BadgeRule::new("workout_10", TotalSessions(10)),
        BadgeRule::new("workout_50", TotalSessions(50)),
        BadgeRule::new("workout_100", TotalSessions(100)),
        BadgeRule::new("workout_250", TotalSessions(250)),
        BadgeRule::new("note_taker", Notes(1)),
        BadgeRule::new("note_master", Notes(50)),
        BadgeRule::new("weight_tracker", WeightEntries(10)),
        BadgeRule::new(
            "heavy_lifter",
            LiftAtLeast {
                lift: Lift::Squat,
                kg: 100.0,
            },
        ),
        BadgeRule::new(
            "bench_king",
            LiftAtLeast {
                lift: Lift::Bench,
                kg: 100.0,
            },
        ),
        BadgeRule::new(
            "deadlift_beast",
            LiftAtLeast {
                lift: Lift::Deadlift,
                kg: 150.0,
            },
        ),
    ];

    for (code, min) in [("strength_warrior", 20), ("strength_master", 50)] {
        rules.push(BadgeRule::new(
            code,
            CombinedSessions {
                sports: STRENGTH_SPORTS,
                min,
            },
        ));
    }
    for (code, min) in [("endurance_runner", 20), ("endurance_beast", 50)] {
        rules.push(BadgeRule::new(
            code,
            CombinedSessions {
                sports: ENDURANCE_SPORTS,
                min,
            },
        ));
    }

    rules.extend([
        BadgeRule::new(
            "versatile_athlete",
            EverySport {
                sports: &SportType::ALL,
                min: 10,
            },
        ),
        BadgeRule::new("early_bird", SessionBeforeHour(8)),
        BadgeRule::new("streak_7", BestStreak(7)),
        BadgeRule::new("streak_30", BestStreak(30)),
        BadgeRule::new("monthly_goal", MonthlyGoal),
        BadgeRule::new("monthly_goal_3", ConsecutiveMonthlyGoals(3)),
    ]);
    rules
}

/// The rules in effect for one evaluation.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<BadgeRule>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RuleSet {
    pub fn builtin() -> Self {
        Self {
            rules: builtin_rules(),
        }
    }

    /// Built-in rules plus one rule per catalog badge that has a recognised
    /// condition and no built-in rule of its own.
    pub fn from_catalog(catalog: &[Badge]) -> Self {
        let mut rules = builtin_rules();
        let mut known: HashSet<String> = rules.iter().map(|r| r.code.clone()).collect();

        for badge in catalog {
            if known.contains(&badge.code) {
                continue;
            }
            let Some(tag) = badge.condition_type.as_deref() else {
                continue;
            };
            match Condition::from_catalog(tag, badge.condition_value) {
                Some(condition) => {
                    known.insert(badge.code.clone());
                    rules.push(BadgeRule {
                        code: badge.code.clone(),
                        condition,
                    });
                }
                None => tracing::debug!(
                    badge_code = %badge.code,
                    condition_type = tag,
                    condition_value = ?badge.condition_value,
                    "Ignoring catalog badge with unusable condition"
                ),
            }
        }

        Self { rules }
    }

    pub fn rules(&self) -> &[BadgeRule] {
        &self.rules
    }

    /// Trailing months of session counts any rule needs.
    pub fn months_needed(&self) -> u32 {
        self.rules
            .iter()
            .map(|r| r.condition.months_needed())
            .max()
            .unwrap_or(0)
    }

    /// Codes of every rule the snapshot satisfies.
    ///
    /// Rules whose source is missing are skipped.
    pub fn satisfied<'a>(&'a self, snapshot: &ActivitySnapshot) -> Vec<&'a str> {
        let mut codes = Vec::new();
        for rule in &self.rules {
            match rule.condition.evaluate(snapshot) {
                Some(true) => codes.push(rule.code.as_str()),
                Some(false) => {}
                None => tracing::debug!(
                    badge_code = %rule.code,
                    source = %rule.condition.source(),
                    "Skipping rule, source unavailable"
                ),
            }
        }
        codes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BadgeCategory, PerformanceBests, Rarity};
    use chrono::{Duration, FixedOffset, NaiveDate, TimeZone, Utc};
    use std::collections::HashMap;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn snapshot() -> ActivitySnapshot {
        ActivitySnapshot::empty(today(), FixedOffset::east_opt(0).unwrap())
    }

    fn satisfied(rules: &RuleSet, snapshot: &ActivitySnapshot) -> Vec<String> {
        rules
            .satisfied(snapshot)
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    fn catalog_badge(code: &str, tag: Option<&str>, value: Option<f64>) -> Badge {
        Badge {
            code: code.to_string(),
            name: code.to_string(),
            description: None,
            icon: Some("🏅".to_string()),
            image_url: None,
            category: Some(BadgeCategory::Special),
            rarity: Rarity::Rare,
            points: 10,
            condition_type: tag.map(str::to_string),
            condition_value: value,
            created_at: None,
        }
    }

    #[test]
    fn test_total_session_thresholds_are_inclusive() {
        let rules = RuleSet::builtin();
        let mut snap = snapshot();

        snap.total_sessions = Some(9);
        assert_eq!(satisfied(&rules, &snap), vec!["first_workout"]);

        snap.total_sessions = Some(10);
        assert_eq!(satisfied(&rules, &snap), vec!["first_workout", "workout_10"]);
    }

    #[test]
    fn test_missing_source_skips_only_its_rules() {
        let rules = RuleSet::builtin();
        let mut snap = snapshot();
        snap.note_count = Some(1);
        // total_sessions is None, so no workout badge can be decided
        assert_eq!(satisfied(&rules, &snap), vec!["note_taker"]);
        assert_eq!(Condition::TotalSessions(1).evaluate(&snap), None);
    }

    #[test]
    fn test_lift_thresholds() {
        let mut snap = snapshot();
        snap.performance = Some(PerformanceBests {
            squat: 100.0,
            bench: 99.5,
            deadlift: 150.0,
        });
        let codes = satisfied(&RuleSet::builtin(), &snap);
        assert_eq!(codes, vec!["heavy_lifter", "deadlift_beast"]);
    }

    #[test]
    fn test_versatile_needs_every_sport() {
        let rules = RuleSet::builtin();
        let mut snap = snapshot();
        let mut by_sport = HashMap::from([
            (SportType::Musculation, 10),
            (SportType::Crossfit, 10),
            (SportType::Running, 9),
            (SportType::Velo, 12),
        ]);
        snap.sessions_by_sport = Some(by_sport.clone());
        assert!(!satisfied(&rules, &snap).contains(&"versatile_athlete".to_string()));

        by_sport.insert(SportType::Running, 10);
        snap.sessions_by_sport = Some(by_sport);
        assert!(satisfied(&rules, &snap).contains(&"versatile_athlete".to_string()));
    }

    #[test]
    fn test_versatile_missing_sport_counts_as_zero() {
        let mut snap = snapshot();
        snap.sessions_by_sport = Some(HashMap::from([
            (SportType::Musculation, 30),
            (SportType::Crossfit, 30),
            (SportType::Running, 30),
        ]));
        let condition = Condition::EverySport {
            sports: &SportType::ALL,
            min: 10,
        };
        assert_eq!(condition.evaluate(&snap), Some(false));
    }

    #[test]
    fn test_combined_category_sessions() {
        let mut snap = snapshot();
        snap.sessions_by_sport = Some(HashMap::from([
            (SportType::Musculation, 12),
            (SportType::Crossfit, 8),
            (SportType::Running, 19),
        ]));
        let codes = satisfied(&RuleSet::builtin(), &snap);
        assert_eq!(codes, vec!["strength_warrior"]);
    }

    #[test]
    fn test_early_bird_uses_local_offset() {
        let mut snap = snapshot();
        // 06:30 UTC is 08:30 at UTC+2
        snap.session_times = Some(vec![Utc.with_ymd_and_hms(2024, 6, 1, 6, 30, 0).unwrap()]);
        assert_eq!(Condition::SessionBeforeHour(8).evaluate(&snap), Some(true));

        snap.offset = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(Condition::SessionBeforeHour(8).evaluate(&snap), Some(false));
    }

    #[test]
    fn test_streak_badge_uses_best_streak() {
        let mut snap = snapshot();
        let start = today() - Duration::days(60);
        snap.streak_dates = Some((0..7).map(|i| start + Duration::days(i)).collect());
        let codes = satisfied(&RuleSet::builtin(), &snap);
        assert_eq!(codes, vec!["streak_7"]);
    }

    #[test]
    fn test_monthly_goal_boundary() {
        let mut snap = snapshot();
        snap.monthly_goal = Some(MonthlyGoalHistory {
            target: Some(10),
            counts: vec![10],
        });
        assert_eq!(Condition::MonthlyGoal.evaluate(&snap), Some(true));

        snap.monthly_goal = Some(MonthlyGoalHistory {
            target: Some(10),
            counts: vec![9],
        });
        assert_eq!(Condition::MonthlyGoal.evaluate(&snap), Some(false));
    }

    #[test]
    fn test_monthly_goal_without_target_never_succeeds() {
        let mut snap = snapshot();
        for target in [None, Some(0)] {
            snap.monthly_goal = Some(MonthlyGoalHistory {
                target,
                counts: vec![40, 40, 40, 40],
            });
            assert_eq!(Condition::MonthlyGoal.evaluate(&snap), Some(false));
            assert_eq!(
                Condition::ConsecutiveMonthlyGoals(3).evaluate(&snap),
                Some(false)
            );
        }
    }

    #[test]
    fn test_consecutive_goal_months_resets_on_miss() {
        let history = |counts: Vec<u32>| MonthlyGoalHistory {
            target: Some(8),
            counts,
        };
        assert!(consecutive_goal_months(&history(vec![8, 9, 10]), 3));
        assert!(!consecutive_goal_months(&history(vec![8, 2, 10, 9]), 3));
        // A run that is not the current one still counts if inside the window
        assert!(consecutive_goal_months(&history(vec![0, 8, 8, 8]), 3));
        // Outside the required + 3 window
        assert!(!consecutive_goal_months(
            &history(vec![0, 0, 0, 0, 8, 8, 8]),
            3
        ));
    }

    #[test]
    fn test_months_needed() {
        assert_eq!(RuleSet::builtin().months_needed(), 6);
        assert_eq!(Condition::MonthlyGoal.months_needed(), 1);
        assert_eq!(Condition::Notes(3).months_needed(), 0);
    }

    #[test]
    fn test_catalog_adds_rules_for_unknown_codes() {
        let catalog = vec![
            catalog_badge("workout_500", Some("workout_count"), Some(500.0)),
            catalog_badge("squat_140", Some("squat_kg"), Some(140.0)),
            catalog_badge("mystery", Some("lunar_phase"), Some(1.0)),
            catalog_badge("no_condition", None, None),
            // Built-in rule wins over catalog metadata
            catalog_badge("first_workout", Some("workout_count"), Some(99.0)),
        ];
        let rules = RuleSet::from_catalog(&catalog);
        assert_eq!(rules.rules().len(), builtin_rules().len() + 2);

        let mut snap = snapshot();
        snap.total_sessions = Some(500);
        snap.performance = Some(PerformanceBests {
            squat: 140.0,
            ..Default::default()
        });
        let codes = satisfied(&rules, &snap);
        assert!(codes.contains(&"workout_500".to_string()));
        assert!(codes.contains(&"squat_140".to_string()));
        assert!(codes.contains(&"first_workout".to_string()));
    }

    #[test]
    fn test_catalog_condition_parsing() {
        assert_eq!(
            Condition::from_catalog("note_count", Some(2.5)),
            Some(Condition::Notes(3))
        );
        assert_eq!(
            Condition::from_catalog("monthly_goal", None),
            Some(Condition::MonthlyGoal)
        );
        assert_eq!(
            Condition::from_catalog("early_session_hour", Some(6.0)),
            Some(Condition::SessionBeforeHour(6))
        );
        assert_eq!(Condition::from_catalog("streak_days", None), None);
        assert_eq!(Condition::from_catalog("streak_days", Some(-4.0)), None);
        assert_eq!(Condition::from_catalog("bench_kg", Some(f64::NAN)), None);
    }

    #[test]
    fn test_catalog_goal_months_are_clamped() {
        assert_eq!(
            Condition::from_catalog("monthly_goal_streak", Some(1e12)),
            Some(Condition::ConsecutiveMonthlyGoals(MAX_GOAL_MONTHS))
        );
        assert_eq!(
            Condition::from_catalog("monthly_goal_streak", Some(0.0)),
            Some(Condition::ConsecutiveMonthlyGoals(1))
        );

        let catalog = vec![catalog_badge(
            "goal_forever",
            Some("monthly_goal_streak"),
            Some(1e12),
        )];
        assert_eq!(
            RuleSet::from_catalog(&catalog).months_needed(),
            MAX_GOAL_MONTHS + MONTH_SCAN_SLACK
        );
    }

    #[test]
    fn test_huge_goal_run_does_not_overflow() {
        assert_eq!(
            Condition::ConsecutiveMonthlyGoals(u32::MAX).months_needed(),
            u32::MAX
        );
        let history = MonthlyGoalHistory {
            target: Some(8),
            counts: vec![8, 8, 8],
        };
        assert!(!consecutive_goal_months(&history, u32::MAX));
    }
}
