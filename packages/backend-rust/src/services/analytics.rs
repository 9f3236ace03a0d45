use std::collections::BTreeMap;

use eyeradar_algo::sanitize::{clamp_level, normalize_severity, sanitize_accuracies};
use eyeradar_algo::{difficulty_preview, round_to, AreaHistory, DeficitArea, DifficultyPreview, NEUTRAL_SEVERITY};
use futures::future::try_join_all;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::db::operations::{self, AreaStats, ExerciseSession, SessionStatus, Student};
use crate::db::{now_iso, DbError};
use crate::services::ServiceError;

/// Rough time credited per session when no timing data is kept
const MINUTES_PER_SESSION: i64 = 10;
const OVERVIEW_HISTORY: i64 = 10;
const REPORT_HISTORY: i64 = 20;
const TREND_MARGIN: f64 = 0.05;

#[derive(Debug, Clone, Serialize)]
pub struct DeficitProgress {
    pub area: DeficitArea,
    pub initial_severity: i64,
    pub current_level: i64,
    pub sessions_completed: i64,
    pub accuracy_trend: Vec<f64>,
    pub avg_accuracy: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub id: String,
    pub game_name: String,
    pub deficit_area: String,
    pub accuracy: f64,
    pub points_earned: i64,
    pub completed_at: Option<String>,
    pub status: SessionStatus,
}

impl From<&ExerciseSession> for SessionSnapshot {
    fn from(s: &ExerciseSession) -> Self {
        Self {
            id: s.id.clone(),
            game_name: s.game_name.clone(),
            deficit_area: s.deficit_area.clone(),
            accuracy: s.accuracy,
            points_earned: s.points_earned,
            completed_at: s.completed_at.clone(),
            status: s.status,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ImprovementTrend {
    Improving,
    Stable,
    Declining,
    New,
    NoData,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsOverview {
    pub student_id: String,
    pub student_name: String,
    pub total_sessions: i64,
    pub total_time_minutes: i64,
    pub overall_accuracy: f64,
    pub deficit_progress: Vec<DeficitProgress>,
    pub difficulty_preview: BTreeMap<String, DifficultyPreview>,
    pub recent_sessions: Vec<SessionSnapshot>,
    pub improvement_trend: ImprovementTrend,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportStudent {
    pub id: String,
    pub name: String,
    pub age: i64,
    pub grade: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub total_sessions: i64,
    pub completed_sessions: i64,
    pub overall_accuracy: f64,
    pub total_points: i64,
    pub level: i64,
    pub current_streak: i64,
    pub badges_earned: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AreaReport {
    pub area: DeficitArea,
    pub area_name: &'static str,
    pub sessions_completed: i64,
    pub current_level: i64,
    pub avg_accuracy: f64,
    pub accuracy_trend: Vec<f64>,
    pub status: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentReport {
    pub student: ReportStudent,
    pub summary: ReportSummary,
    pub deficit_areas: Vec<AreaReport>,
    pub generated_at: String,
}

/// Educator-facing label for an area's progress
pub fn area_status(sessions: i64, avg_accuracy: f64) -> &'static str {
    if sessions == 0 {
        "Not started"
    } else if avg_accuracy >= 0.85 {
        "Excelling"
    } else if avg_accuracy >= 0.70 {
        "On track"
    } else if avg_accuracy >= 0.50 {
        "Needs practice"
    } else {
        "Needs support"
    }
}

/// Compares the newest five sessions with the five before them.
pub fn improvement_trend(sessions_newest_first: &[ExerciseSession]) -> ImprovementTrend {
    let mean = |s: &[ExerciseSession]| s.iter().map(|x| x.accuracy).sum::<f64>() / s.len() as f64;

    let recent = &sessions_newest_first[..sessions_newest_first.len().min(5)];
    let older = sessions_newest_first.get(5..sessions_newest_first.len().min(10)).unwrap_or(&[]);

    match (recent.is_empty(), older.is_empty()) {
        (true, _) => ImprovementTrend::NoData,
        (false, true) => ImprovementTrend::New,
        (false, false) => {
            let (recent_avg, older_avg) = (mean(recent), mean(older));
            if recent_avg > older_avg + TREND_MARGIN {
                ImprovementTrend::Improving
            } else if recent_avg < older_avg - TREND_MARGIN {
                ImprovementTrend::Declining
            } else {
                ImprovementTrend::Stable
            }
        }
    }
}

async fn area_snapshot(
    pool: &SqlitePool,
    student_id: &str,
    area: DeficitArea,
    history: i64,
) -> Result<(DeficitArea, AreaStats, Vec<f64>), DbError> {
    let stats = operations::area_stats(pool, student_id, area.as_str()).await?;
    let trend = operations::recent_accuracies(pool, student_id, area.as_str(), history).await?;
    Ok((area, stats, trend))
}

async fn load_student(pool: &SqlitePool, student_id: &str) -> Result<Student, ServiceError> {
    operations::get_student(pool, student_id)
        .await?
        .ok_or(ServiceError::NotFound("Student not found"))
}

pub async fn overview(pool: &SqlitePool, student_id: &str) -> Result<AnalyticsOverview, ServiceError> {
    let student = load_student(pool, student_id).await?;
    let stats = operations::student_stats(pool, student_id).await?;
    let mut sessions = operations::list_student_sessions(pool, student_id, None).await?;
    sessions.truncate(10);

    let snapshots = try_join_all(
        DeficitArea::ALL
            .into_iter()
            .map(|area| area_snapshot(pool, student_id, area, OVERVIEW_HISTORY)),
    )
    .await?;

    let mut progress = Vec::with_capacity(snapshots.len());
    let mut histories = Vec::with_capacity(snapshots.len());
    for (area, area_stats, trend) in snapshots {
        let severity = student.assessment.as_ref().and_then(|a| a.severity_for(area.as_str()));
        histories.push(AreaHistory::new(
            area.as_str(),
            severity.map_or(NEUTRAL_SEVERITY, normalize_severity),
            sanitize_accuracies(&trend),
        ));
        progress.push(DeficitProgress {
            area,
            initial_severity: severity.unwrap_or(0),
            current_level: student.current_level(area.as_str()).unwrap_or(0),
            sessions_completed: area_stats.sessions,
            accuracy_trend: trend,
            avg_accuracy: round_to(area_stats.avg_accuracy, 4),
        });
    }

    let levels: BTreeMap<String, i32> = student
        .current_levels
        .iter()
        .map(|(area, level)| (area.clone(), clamp_level(*level)))
        .collect();

    Ok(AnalyticsOverview {
        student_id: student.id.clone(),
        student_name: student.name.clone(),
        total_sessions: stats.total_sessions,
        total_time_minutes: stats.total_sessions * MINUTES_PER_SESSION,
        overall_accuracy: round_to(stats.avg_accuracy, 4),
        deficit_progress: progress,
        difficulty_preview: difficulty_preview(student.age as i32, &levels, &histories),
        recent_sessions: sessions.iter().map(SessionSnapshot::from).collect(),
        improvement_trend: improvement_trend(&sessions),
    })
}

pub async fn report(pool: &SqlitePool, student_id: &str) -> Result<StudentReport, ServiceError> {
    let student = load_student(pool, student_id).await?;
    let stats = operations::student_stats(pool, student_id).await?;

    let snapshots = try_join_all(
        DeficitArea::ALL
            .into_iter()
            .map(|area| area_snapshot(pool, student_id, area, REPORT_HISTORY)),
    )
    .await?;

    let deficit_areas = snapshots
        .into_iter()
        .map(|(area, area_stats, trend)| AreaReport {
            area,
            area_name: area.display_name(),
            sessions_completed: area_stats.sessions,
            current_level: student.current_level(area.as_str()).unwrap_or(0),
            avg_accuracy: round_to(area_stats.avg_accuracy, 4),
            accuracy_trend: trend,
            status: area_status(area_stats.sessions, area_stats.avg_accuracy),
        })
        .collect();

    Ok(StudentReport {
        student: ReportStudent {
            id: student.id.clone(),
            name: student.name.clone(),
            age: student.age,
            grade: student.grade,
        },
        summary: ReportSummary {
            total_sessions: stats.total_sessions,
            completed_sessions: stats.completed_sessions,
            overall_accuracy: round_to(stats.avg_accuracy, 4),
            total_points: student.total_points,
            level: student.level,
            current_streak: student.current_streak,
            badges_earned: student.badges.len(),
        },
        deficit_areas,
        generated_at: now_iso(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(accuracy: f64) -> ExerciseSession {
        ExerciseSession {
            id: "s".into(),
            student_id: "st".into(),
            game_id: "g".into(),
            game_name: "Game".into(),
            deficit_area: "rapid_naming".into(),
            difficulty_level: 1,
            items: vec![],
            results: vec![],
            started_at: now_iso(),
            completed_at: None,
            total_items: 10,
            correct_count: 0,
            accuracy,
            avg_response_time_ms: 0.0,
            points_earned: 0,
            badges_earned: vec![],
            status: SessionStatus::Completed,
        }
    }

    #[test]
    fn test_area_status_labels() {
        assert_eq!(area_status(0, 0.0), "Not started");
        assert_eq!(area_status(3, 0.9), "Excelling");
        assert_eq!(area_status(3, 0.7), "On track");
        assert_eq!(area_status(3, 0.55), "Needs practice");
        assert_eq!(area_status(3, 0.2), "Needs support");
    }

    #[test]
    fn test_improvement_trend() {
        assert_eq!(improvement_trend(&[]), ImprovementTrend::NoData);
        assert_eq!(improvement_trend(&[session(0.5), session(0.6)]), ImprovementTrend::New);

        let mut rising: Vec<_> = (0..5).map(|_| session(0.9)).collect();
        rising.extend((0..5).map(|_| session(0.6)));
        assert_eq!(improvement_trend(&rising), ImprovementTrend::Improving);

        let mut flat: Vec<_> = (0..5).map(|_| session(0.7)).collect();
        flat.push(session(0.72));
        assert_eq!(improvement_trend(&flat), ImprovementTrend::Stable);

        rising.reverse();
        assert_eq!(improvement_trend(&rising), ImprovementTrend::Declining);
    }
}
