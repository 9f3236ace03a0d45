use std::collections::{BTreeMap, HashSet};

use chrono::{Duration, NaiveDate};
use eyeradar_algo::{round_to, DeficitArea};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::db::operations::{self, Student};
use crate::db::DbError;

pub const POINTS_PER_CORRECT: i64 = 10;
pub const POINTS_PARTICIPATION: i64 = 2;
pub const POINTS_PER_WRONG_ITEM: i64 = 2;
const ACCURACY_BONUS_THRESHOLD: f64 = 0.80;
const PERFECT_SCORE_BONUS: i64 = 50;
const SESSION_COMPLETION_BONUS: i64 = 20;
pub const MAX_XP_LEVEL: i64 = 50;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BadgeCategory {
    Progress,
    Mastery,
    Consistency,
    Special,
}

#[derive(Debug, Clone, Copy)]
pub struct BadgeDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub category: BadgeCategory,
    pub requirement: &'static str,
}

const fn badge(
    id: &'static str,
    name: &'static str,
    description: &'static str,
    icon: &'static str,
    category: BadgeCategory,
    requirement: &'static str,
) -> BadgeDefinition {
    BadgeDefinition {
        id,
        name,
        description,
        icon,
        category,
        requirement,
    }
}

pub static BADGES: [BadgeDefinition; 21] = [
    badge("first_steps", "First Steps", "Complete your first exercise session", "👶", BadgeCategory::Progress, "Complete 1 session"),
    badge("getting_started", "Getting Started", "Complete 5 exercise sessions", "🚶", BadgeCategory::Progress, "Complete 5 sessions"),
    badge("dedicated_learner", "Dedicated Learner", "Complete 25 exercise sessions", "📚", BadgeCategory::Progress, "Complete 25 sessions"),
    badge("champion", "Champion", "Complete 100 exercise sessions", "🏆", BadgeCategory::Progress, "Complete 100 sessions"),
    badge("sound_master", "Sound Master", "Achieve 90% accuracy in Phonological Awareness exercises", "🔊", BadgeCategory::Mastery, "90% accuracy in phonological_awareness (5+ sessions)"),
    badge("speed_demon", "Speed Demon", "Achieve 90% accuracy in Rapid Naming exercises", "⚡", BadgeCategory::Mastery, "90% accuracy in rapid_naming (5+ sessions)"),
    badge("memory_champion", "Memory Champion", "Achieve 90% accuracy in Working Memory exercises", "🧠", BadgeCategory::Mastery, "90% accuracy in working_memory (5+ sessions)"),
    badge("eagle_eye", "Eagle Eye", "Achieve 90% accuracy in Visual Processing exercises", "🦅", BadgeCategory::Mastery, "90% accuracy in visual_processing (5+ sessions)"),
    badge("fluent_reader", "Fluent Reader", "Achieve 90% accuracy in Reading Fluency exercises", "📖", BadgeCategory::Mastery, "90% accuracy in reading_fluency (5+ sessions)"),
    badge("comprehension_king", "Comprehension King", "Achieve 90% accuracy in Reading Comprehension exercises", "👑", BadgeCategory::Mastery, "90% accuracy in comprehension (5+ sessions)"),
    badge("three_day_streak", "3-Day Streak", "Practice for 3 days in a row", "🔥", BadgeCategory::Consistency, "3-day streak"),
    badge("week_warrior", "Week Warrior", "Practice for 7 days in a row", "⚔️", BadgeCategory::Consistency, "7-day streak"),
    badge("two_week_champion", "Two Week Champion", "Practice for 14 days in a row", "🛡️", BadgeCategory::Consistency, "14-day streak"),
    badge("month_master", "Month Master", "Practice for 30 days in a row", "🌟", BadgeCategory::Consistency, "30-day streak"),
    badge("perfect_score", "Perfect Score", "Get 100% accuracy in any exercise session", "💯", BadgeCategory::Special, "100% accuracy in any session"),
    badge("level_up", "Level Up", "Reach level 5", "⬆️", BadgeCategory::Special, "Reach level 5"),
    badge("level_up_10", "Double Digits", "Reach level 10", "🔟", BadgeCategory::Special, "Reach level 10"),
    badge("all_rounder", "All-Rounder", "Complete at least one session in every deficit area", "🎯", BadgeCategory::Special, "Play all 6 deficit areas"),
    badge("point_collector", "Point Collector", "Earn 500 total points", "💰", BadgeCategory::Special, "Earn 500 points"),
    badge("point_master", "Point Master", "Earn 5000 total points", "💎", BadgeCategory::Special, "Earn 5000 points"),
    badge("speed_learner", "Speed Learner", "Complete 5 sessions in one day", "🚀", BadgeCategory::Special, "5 sessions in one day"),
];

const MASTERY_BADGES: [(DeficitArea, &str); 6] = [
    (DeficitArea::PhonologicalAwareness, "sound_master"),
    (DeficitArea::RapidNaming, "speed_demon"),
    (DeficitArea::WorkingMemory, "memory_champion"),
    (DeficitArea::VisualProcessing, "eagle_eye"),
    (DeficitArea::ReadingFluency, "fluent_reader"),
    (DeficitArea::Comprehension, "comprehension_king"),
];

const LEVEL_TITLES: [(i64, &str); 11] = [
    (1, "Beginner"),
    (5, "Apprentice"),
    (10, "Reader"),
    (15, "Scholar"),
    (20, "Expert"),
    (25, "Master"),
    (30, "Champion"),
    (35, "Legend"),
    (40, "Grandmaster"),
    (45, "Mythic"),
    (50, "Transcendent"),
];

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Badge {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub category: BadgeCategory,
    pub requirement: String,
    pub earned: bool,
    pub earned_at: Option<String>,
}

impl Badge {
    fn from_definition(def: &BadgeDefinition, earned: bool) -> Self {
        Self {
            id: def.id.to_string(),
            name: def.name.to_string(),
            description: def.description.to_string(),
            icon: def.icon.to_string(),
            category: def.category,
            requirement: def.requirement.to_string(),
            earned,
            earned_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LevelInfo {
    pub level: i64,
    pub title: String,
    pub xp: i64,
    pub xp_for_next_level: i64,
    pub progress_percent: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GamificationSummary {
    pub student_id: String,
    pub total_points: i64,
    pub level_info: LevelInfo,
    pub current_streak: i64,
    pub longest_streak: i64,
    pub badges: Vec<Badge>,
    pub total_sessions: i64,
    pub total_correct: i64,
}

/// Facts about a student at the moment a session finishes
#[derive(Debug, Clone, Default)]
pub struct BadgeContext {
    pub completed_sessions: i64,
    /// (completed sessions, average accuracy) per deficit area
    pub area_stats: BTreeMap<String, (i64, f64)>,
    pub current_streak: i64,
    pub session_accuracy: Option<f64>,
    pub level: i64,
    pub total_points: i64,
    pub areas_played: usize,
    pub sessions_today: i64,
}

pub fn session_points(correct_count: i64, total_items: i64, accuracy: f64) -> i64 {
    let base = correct_count * POINTS_PER_CORRECT;
    let participation = total_items * POINTS_PARTICIPATION;
    let bonus = if accuracy >= ACCURACY_BONUS_THRESHOLD {
        (base as f64 * 0.5) as i64
    } else {
        0
    };
    let perfect = if accuracy >= 1.0 { PERFECT_SCORE_BONUS } else { 0 };
    base + participation + bonus + perfect + SESSION_COMPLETION_BONUS
}

pub fn xp_for_level(level: i64) -> i64 {
    (100.0 * (level as f64).powf(1.5)) as i64
}

pub fn level_title(level: i64) -> &'static str {
    LEVEL_TITLES
        .iter()
        .rev()
        .find(|(threshold, _)| level >= *threshold)
        .map_or("Beginner", |(_, title)| title)
}

pub fn level_info(xp: i64) -> LevelInfo {
    let mut level = 1;
    while level < MAX_XP_LEVEL && xp >= xp_for_level(level + 1) {
        level += 1;
    }

    let current = xp_for_level(level);
    let next = xp_for_level(level + 1);
    let needed = next - current;
    let progress = if needed > 0 {
        (xp - current) as f64 / needed as f64 * 100.0
    } else {
        100.0
    };

    LevelInfo {
        level,
        title: level_title(level).to_string(),
        xp,
        xp_for_next_level: next,
        progress_percent: round_to(progress.clamp(0.0, 100.0), 1),
    }
}

/// Returns (current_streak, longest_streak) after practising on `today`.
pub fn advance_streak(
    last_session_date: Option<&str>,
    today: NaiveDate,
    current_streak: i64,
    longest_streak: i64,
) -> (i64, i64) {
    let last = last_session_date.and_then(|raw| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok());

    let current = match last {
        Some(day) if day == today => return (current_streak, longest_streak),
        Some(day) if day == today - Duration::days(1) => current_streak + 1,
        _ => 1,
    };
    (current, longest_streak.max(current))
}

/// Badge ids newly satisfied by `ctx`, in catalog order
pub fn evaluate_badges(ctx: &BadgeContext, owned: &[String]) -> Vec<String> {
    let owned: HashSet<&str> = owned.iter().map(String::as_str).collect();
    let mut earned: Vec<&'static str> = Vec::new();

    for (threshold, id) in [
        (1, "first_steps"),
        (5, "getting_started"),
        (25, "dedicated_learner"),
        (100, "champion"),
    ] {
        if ctx.completed_sessions >= threshold {
            earned.push(id);
        }
    }

    for (area, id) in MASTERY_BADGES {
        if let Some((sessions, avg)) = ctx.area_stats.get(area.as_str()) {
            if *sessions >= 5 && *avg >= 0.90 {
                earned.push(id);
            }
        }
    }

    for (threshold, id) in [
        (3, "three_day_streak"),
        (7, "week_warrior"),
        (14, "two_week_champion"),
        (30, "month_master"),
    ] {
        if ctx.current_streak >= threshold {
            earned.push(id);
        }
    }

    if ctx.session_accuracy.is_some_and(|acc| acc >= 1.0) {
        earned.push("perfect_score");
    }
    if ctx.level >= 5 {
        earned.push("level_up");
    }
    if ctx.level >= 10 {
        earned.push("level_up_10");
    }
    if ctx.areas_played >= DeficitArea::ALL.len() {
        earned.push("all_rounder");
    }
    if ctx.total_points >= 500 {
        earned.push("point_collector");
    }
    if ctx.total_points >= 5000 {
        earned.push("point_master");
    }
    if ctx.sessions_today >= 5 {
        earned.push("speed_learner");
    }

    earned
        .into_iter()
        .filter(|id| !owned.contains(id))
        .map(str::to_string)
        .collect()
}

pub fn badge_catalog() -> Vec<Badge> {
    BADGES.iter().map(|def| Badge::from_definition(def, false)).collect()
}

pub fn student_badges(student: &Student) -> Vec<Badge> {
    let owned: HashSet<&str> = student.badges.iter().map(String::as_str).collect();
    BADGES
        .iter()
        .map(|def| Badge::from_definition(def, owned.contains(def.id)))
        .collect()
}

pub async fn summary(pool: &SqlitePool, student: &Student) -> Result<GamificationSummary, DbError> {
    let stats = operations::student_stats(pool, &student.id).await?;
    Ok(GamificationSummary {
        student_id: student.id.clone(),
        total_points: student.total_points,
        level_info: level_info(student.xp),
        current_streak: student.current_streak,
        longest_streak: student.longest_streak,
        badges: student_badges(student),
        total_sessions: stats.completed_sessions,
        total_correct: stats.total_correct,
    })
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn points_for(correct: i64, total: i64) -> i64 {
        let accuracy = if total > 0 { correct as f64 / total as f64 } else { 0.0 };
        session_points(correct, total, accuracy)
    }

    proptest! {
        #[test]
        fn points_include_completion_bonus(total in 0i64..60, correct_share in 0.0f64..=1.0) {
            let correct = (total as f64 * correct_share).floor() as i64;
            prop_assert!(points_for(correct, total) >= SESSION_COMPLETION_BONUS + total * POINTS_PARTICIPATION);
        }

        #[test]
        fn one_more_correct_never_costs_points(total in 1i64..60, correct_share in 0.0f64..1.0) {
            let correct = ((total as f64 * correct_share).floor() as i64).min(total - 1);
            prop_assert!(points_for(correct + 1, total) > points_for(correct, total));
        }

        #[test]
        fn level_never_drops_as_xp_grows(xp in 0i64..2_000_000, gain in 0i64..50_000) {
            let before = level_info(xp);
            let after = level_info(xp + gain);
            prop_assert!(after.level >= before.level);
            prop_assert!((1..=MAX_XP_LEVEL).contains(&after.level));
            prop_assert!((0.0..=100.0).contains(&after.progress_percent));
        }
    }
}
