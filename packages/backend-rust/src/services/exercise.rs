use std::collections::BTreeMap;

use chrono::Utc;
use eyeradar_algo::sanitize::{clamp_level, normalize_severity, sanitize_accuracies};
use eyeradar_algo::{
    compute_difficulty, prioritize_areas, session_parameters, AreaHistory, DeficitArea, NEUTRAL_SEVERITY,
    RECOMMENDATION_HISTORY, SESSION_START_HISTORY,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::now_iso;
use crate::db::operations::{
    self, ExerciseItemResult, ExerciseSession, SessionCompletion, SessionStatus, Student,
};
use crate::services::content::ContentGenerator;
use crate::services::games::{self, GameDefinition};
use crate::services::gamification::{self, BadgeContext};
use crate::services::ServiceError;

pub const POINTS_CORRECT_ITEM: i64 = 10;
pub const POINTS_WRONG_ITEM: i64 = gamification::POINTS_PER_WRONG_ITEM;
const LEVEL_UP_ACCURACY: f64 = 0.85;
const LEVEL_DOWN_ACCURACY: f64 = 0.50;
const MAX_RECOMMENDATIONS: usize = 10;
const STARTER_GAMES: usize = 6;
const GAMES_PER_AREA: usize = 2;

#[derive(Debug, Clone, Deserialize)]
pub struct StartSession {
    pub student_id: String,
    pub game_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitAnswer {
    pub item_index: i64,
    pub student_answer: String,
    #[serde(default)]
    pub response_time_ms: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExerciseRecommendation {
    pub game_id: String,
    pub game_name: String,
    pub deficit_area: DeficitArea,
    pub priority: i32,
    pub reason: String,
    pub suggested_difficulty: i64,
}

/// Assessed severity for an area, neutral when the student was never assessed
fn area_severity(student: &Student, area: &str) -> i32 {
    student
        .assessment
        .as_ref()
        .and_then(|a| a.severity_for(area))
        .map_or(NEUTRAL_SEVERITY, normalize_severity)
}

fn answers_match(given: &str, expected: &str) -> bool {
    given.trim().to_lowercase() == expected.trim().to_lowercase()
}

/// Per-area level after a finished session. The difficulty engine only sizes
/// the next session; the stored level moves by at most one step here.
pub fn adjust_area_level(level: i64, accuracy: f64) -> i64 {
    if accuracy > LEVEL_UP_ACCURACY {
        (level + 1).min(10)
    } else if accuracy < LEVEL_DOWN_ACCURACY {
        (level - 1).max(1)
    } else {
        level
    }
}

pub async fn start_session(
    pool: &SqlitePool,
    content: &ContentGenerator,
    request: &StartSession,
) -> Result<ExerciseSession, ServiceError> {
    let student = operations::get_student(pool, &request.student_id)
        .await?
        .ok_or(ServiceError::NotFound("Student not found"))?;
    let game: &GameDefinition = games::get_game(&request.game_id).ok_or(ServiceError::NotFound("Game not found"))?;

    let area = game.deficit_area.as_str();
    let current_level = clamp_level(student.current_level(area).unwrap_or(1));
    let history = operations::recent_accuracies(pool, &student.id, area, SESSION_START_HISTORY as i64).await?;
    let history = sanitize_accuracies(&history);
    let severity = area_severity(&student, area);

    let difficulty = compute_difficulty(student.age as i32, severity, current_level, &history);
    let params = session_parameters(difficulty);
    let items = content
        .generate_items(game.id, difficulty, params.item_count.max(0) as usize)
        .await;

    let session = ExerciseSession {
        id: Uuid::new_v4().to_string(),
        student_id: student.id.clone(),
        game_id: game.id.to_string(),
        game_name: game.name.to_string(),
        deficit_area: area.to_string(),
        difficulty_level: i64::from(difficulty),
        total_items: items.len() as i64,
        items,
        results: Vec::new(),
        started_at: now_iso(),
        completed_at: None,
        correct_count: 0,
        accuracy: 0.0,
        avg_response_time_ms: 0.0,
        points_earned: 0,
        badges_earned: Vec::new(),
        status: SessionStatus::InProgress,
    };
    operations::insert_session(pool, &session).await?;

    info!(
        session_id = %session.id,
        student_id = %session.student_id,
        game_id = %session.game_id,
        difficulty,
        history_len = history.len(),
        "exercise session started"
    );
    Ok(session)
}

pub async fn submit_answer(
    pool: &SqlitePool,
    session_id: &str,
    answer: &SubmitAnswer,
) -> Result<ExerciseItemResult, ServiceError> {
    let mut tx = pool.begin().await?;

    if !operations::lock_in_progress(&mut *tx, session_id).await? {
        return match operations::get_session(&mut *tx, session_id).await? {
            Some(_) => Err(ServiceError::BadRequest("Session is not in progress".to_string())),
            None => Err(ServiceError::NotFound("Session not found")),
        };
    }
    let mut session = operations::get_session(&mut *tx, session_id)
        .await?
        .ok_or(ServiceError::NotFound("Session not found"))?;

    let item = session
        .items
        .iter()
        .find(|item| item.index == answer.item_index)
        .ok_or(ServiceError::NotFound("Item not found"))?;

    let is_correct = answers_match(&answer.student_answer, &item.correct_answer);
    let result = ExerciseItemResult {
        item_index: answer.item_index,
        is_correct,
        student_answer: answer.student_answer.clone(),
        correct_answer: item.correct_answer.clone(),
        response_time_ms: answer.response_time_ms,
        points_earned: if is_correct { POINTS_CORRECT_ITEM } else { POINTS_WRONG_ITEM },
    };

    session.results.push(result.clone());
    let correct_count = session.results.iter().filter(|r| r.is_correct).count() as i64;
    operations::save_results(&mut *tx, session_id, &session.results, correct_count).await?;
    tx.commit().await?;

    debug!(session_id, item_index = answer.item_index, is_correct, "answer submitted");
    Ok(result)
}

/// Finalizes a session and credits the student. All reads and writes of the
/// student's progress happen in one transaction.
pub async fn complete_session(pool: &SqlitePool, session_id: &str) -> Result<ExerciseSession, ServiceError> {
    let mut tx = pool.begin().await?;

    let mut session = operations::get_session(&mut *tx, session_id)
        .await?
        .ok_or(ServiceError::NotFound("Session not found"))?;
    if session.status != SessionStatus::InProgress {
        return Err(ServiceError::BadRequest("Session is not in progress".to_string()));
    }

    let correct_count = session.results.iter().filter(|r| r.is_correct).count() as i64;
    let accuracy = if session.total_items > 0 {
        correct_count as f64 / session.total_items as f64
    } else {
        0.0
    };
    let timed: Vec<i64> = session
        .results
        .iter()
        .map(|r| r.response_time_ms)
        .filter(|ms| *ms != 0)
        .collect();
    let avg_response_time = if timed.is_empty() {
        0.0
    } else {
        timed.iter().sum::<i64>() as f64 / timed.len() as f64
    };
    let points = gamification::session_points(correct_count, session.total_items, accuracy);

    let completion = SessionCompletion {
        completed_at: now_iso(),
        correct_count,
        accuracy: eyeradar_algo::round_to(accuracy, 4),
        avg_response_time_ms: eyeradar_algo::round_to(avg_response_time, 2),
        points_earned: points,
    };
    if !operations::mark_completed(&mut *tx, session_id, &completion).await? {
        return Err(ServiceError::BadRequest("Session is not in progress".to_string()));
    }

    let mut badges_earned = Vec::new();
    if let Some(mut student) = operations::get_student(&mut *tx, &session.student_id).await? {
        student.total_points += points;
        student.xp += points;
        student.level = gamification::level_info(student.xp).level;

        let area = session.deficit_area.clone();
        let level = student.current_level(&area).unwrap_or(1);
        student.current_levels.insert(area, adjust_area_level(level, accuracy));

        let today = Utc::now().date_naive();
        let (current, longest) = gamification::advance_streak(
            student.last_session_date.as_deref(),
            today,
            student.current_streak,
            student.longest_streak,
        );
        student.current_streak = current;
        student.longest_streak = longest;
        student.last_session_date = Some(today.format("%Y-%m-%d").to_string());

        let stats = operations::student_stats(&mut *tx, &student.id).await?;
        let areas = operations::completed_areas(&mut *tx, &student.id).await?;
        let mut area_stats = BTreeMap::new();
        for area in &areas {
            let s = operations::area_stats(&mut *tx, &student.id, area).await?;
            area_stats.insert(area.clone(), (s.sessions, s.avg_accuracy));
        }
        let sessions_today = operations::completed_on_date(&mut *tx, &student.id, &today.to_string()).await?;

        let ctx = BadgeContext {
            completed_sessions: stats.completed_sessions,
            area_stats,
            current_streak: student.current_streak,
            session_accuracy: Some(accuracy),
            level: student.level,
            total_points: student.total_points,
            areas_played: areas.len(),
            sessions_today,
        };
        badges_earned = gamification::evaluate_badges(&ctx, &student.badges);
        student.badges.extend(badges_earned.iter().cloned());

        operations::save_progress(&mut *tx, &student).await?;
        operations::save_badges_earned(&mut *tx, session_id, &badges_earned).await?;
    }
    tx.commit().await?;

    session.status = SessionStatus::Completed;
    session.completed_at = Some(completion.completed_at);
    session.correct_count = completion.correct_count;
    session.accuracy = completion.accuracy;
    session.avg_response_time_ms = completion.avg_response_time_ms;
    session.points_earned = points;
    session.badges_earned = badges_earned;

    info!(
        session_id,
        student_id = %session.student_id,
        accuracy = session.accuracy,
        points,
        badges = session.badges_earned.len(),
        "exercise session completed"
    );
    Ok(session)
}

pub async fn recommendations(pool: &SqlitePool, student_id: &str) -> Result<Vec<ExerciseRecommendation>, ServiceError> {
    let student = operations::get_student(pool, student_id)
        .await?
        .ok_or(ServiceError::NotFound("Student not found"))?;

    let Some(assessment) = student.assessment.as_ref() else {
        return Ok(games::games_for_student(student.age, None)
            .into_iter()
            .take(STARTER_GAMES)
            .map(|game| recommendation(game, 1, "Try this game to get started!".to_string(), 1))
            .collect());
    };

    let mut histories = Vec::with_capacity(assessment.deficits.len());
    for (area, info) in &assessment.deficits {
        let raw = operations::recent_accuracies(pool, student_id, area, RECOMMENDATION_HISTORY as i64).await?;
        histories.push(AreaHistory::new(
            area.clone(),
            normalize_severity(info.severity),
            sanitize_accuracies(&raw),
        ));
    }

    let mut recs = Vec::new();
    for ranked in prioritize_areas(&histories) {
        let Some(area) = DeficitArea::parse(&ranked.area) else {
            continue;
        };
        let reason = format!(
            "Severity: {}/5, Accuracy: {}%",
            ranked.severity,
            (ranked.avg_accuracy * 100.0).round() as i64
        );
        let level = student.current_level(area.as_str()).unwrap_or(1);
        for game in games::games_for_student(student.age, Some(&[area]))
            .into_iter()
            .take(GAMES_PER_AREA)
        {
            recs.push(recommendation(game, ranked.priority, reason.clone(), level));
        }
    }

    recs.sort_by(|a, b| b.priority.cmp(&a.priority));
    recs.truncate(MAX_RECOMMENDATIONS);
    Ok(recs)
}

fn recommendation(game: &GameDefinition, priority: i32, reason: String, suggested_difficulty: i64) -> ExerciseRecommendation {
    ExerciseRecommendation {
        game_id: game.id.to_string(),
        game_name: game.name.to_string(),
        deficit_area: game.deficit_area,
        priority,
        reason,
        suggested_difficulty,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answers_match_ignores_case_and_spaces() {
        assert!(answers_match("  Cat ", "cat"));
        assert!(answers_match("BAT", " bat"));
        assert!(!answers_match("cat", "cot"));
    }

    #[test]
    fn test_adjust_area_level() {
        assert_eq!(adjust_area_level(3, 0.9), 4);
        assert_eq!(adjust_area_level(10, 1.0), 10);
        assert_eq!(adjust_area_level(3, 0.85), 3);
        assert_eq!(adjust_area_level(3, 0.5), 3);
        assert_eq!(adjust_area_level(3, 0.49), 2);
        assert_eq!(adjust_area_level(1, 0.0), 1);
    }

    #[test]
    fn test_area_severity_defaults_to_neutral() {
        let student = Student::new("s1".into(), "Ana".into(), 8, 3, now_iso());
        assert_eq!(area_severity(&student, "rapid_naming"), NEUTRAL_SEVERITY);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn area_level_stays_in_range(level in 1i64..=10, accuracy in 0.0f64..=1.0) {
            let next = adjust_area_level(level, accuracy);
            prop_assert!((1..=10).contains(&next));
            prop_assert!((next - level).abs() <= 1);
        }

        #[test]
        fn area_level_follows_accuracy(level in 1i64..=10, low in 0.0f64..=1.0, high in 0.0f64..=1.0) {
            let (low, high) = if low <= high { (low, high) } else { (high, low) };
            prop_assert!(adjust_area_level(level, low) <= adjust_area_level(level, high));
        }
    }
}
