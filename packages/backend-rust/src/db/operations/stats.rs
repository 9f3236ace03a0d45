use serde::Serialize;
use sqlx::{Executor, Row, Sqlite};

use crate::db::DbError;

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct StudentStats {
    pub total_sessions: i64,
    pub completed_sessions: i64,
    pub avg_accuracy: f64,
    pub total_correct: i64,
    pub total_items: i64,
    pub total_points_earned: i64,
}

/// Completed-session aggregate for one deficit area
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct AreaStats {
    pub sessions: i64,
    pub avg_accuracy: f64,
    pub correct: i64,
    pub total: i64,
}

pub async fn student_stats<'e, E>(executor: E, student_id: &str) -> Result<StudentStats, DbError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        r#"
        SELECT
            COUNT(*) AS "total_sessions",
            COALESCE(SUM(CASE WHEN "status" = 'completed' THEN 1 ELSE 0 END), 0) AS "completed_sessions",
            COALESCE(AVG(CASE WHEN "status" = 'completed' THEN "accuracy" END), 0.0) AS "avg_accuracy",
            COALESCE(SUM("correct_count"), 0) AS "total_correct",
            COALESCE(SUM("total_items"), 0) AS "total_items",
            COALESCE(SUM("points_earned"), 0) AS "total_points_earned"
        FROM "exercise_sessions" WHERE "student_id" = ?
        "#,
    )
    .bind(student_id)
    .fetch_one(executor)
    .await?;

    Ok(StudentStats {
        total_sessions: row.try_get("total_sessions")?,
        completed_sessions: row.try_get("completed_sessions")?,
        avg_accuracy: row.try_get("avg_accuracy")?,
        total_correct: row.try_get("total_correct")?,
        total_items: row.try_get("total_items")?,
        total_points_earned: row.try_get("total_points_earned")?,
    })
}

pub async fn area_stats<'e, E>(executor: E, student_id: &str, deficit_area: &str) -> Result<AreaStats, DbError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        r#"
        SELECT
            COUNT(*) AS "sessions",
            COALESCE(AVG("accuracy"), 0.0) AS "avg_accuracy",
            COALESCE(SUM("correct_count"), 0) AS "correct",
            COALESCE(SUM("total_items"), 0) AS "total"
        FROM "exercise_sessions"
        WHERE "student_id" = ? AND "deficit_area" = ? AND "status" = 'completed'
        "#,
    )
    .bind(student_id)
    .bind(deficit_area)
    .fetch_one(executor)
    .await?;

    Ok(AreaStats {
        sessions: row.try_get("sessions")?,
        avg_accuracy: row.try_get("avg_accuracy")?,
        correct: row.try_get("correct")?,
        total: row.try_get("total")?,
    })
}

/// Distinct deficit areas with at least one completed session
pub async fn completed_areas<'e, E>(executor: E, student_id: &str) -> Result<Vec<String>, DbError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let areas = sqlx::query_scalar(
        r#"
        SELECT DISTINCT "deficit_area" FROM "exercise_sessions"
        WHERE "student_id" = ? AND "status" = 'completed'
        ORDER BY "deficit_area"
        "#,
    )
    .bind(student_id)
    .fetch_all(executor)
    .await?;
    Ok(areas)
}

/// Completed sessions whose completion timestamp falls on `date` (YYYY-MM-DD)
pub async fn completed_on_date<'e, E>(executor: E, student_id: &str, date: &str) -> Result<i64, DbError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let count = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM "exercise_sessions"
        WHERE "student_id" = ? AND "status" = 'completed' AND substr("completed_at", 1, 10) = ?
        "#,
    )
    .bind(student_id)
    .bind(date)
    .fetch_one(executor)
    .await?;
    Ok(count)
}
