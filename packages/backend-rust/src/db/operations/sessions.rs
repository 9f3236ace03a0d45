use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite, SqlitePool};

use crate::db::{decode_json, encode_json, DbError};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
    Abandoned,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Abandoned => "abandoned",
        }
    }

    fn parse(value: &str) -> Self {
        match value {
            "completed" => Self::Completed,
            "abandoned" => Self::Abandoned,
            _ => Self::InProgress,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExerciseItem {
    pub index: i64,
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default = "default_item_type")]
    pub item_type: String,
    #[serde(default)]
    pub extra_data: serde_json::Map<String, serde_json::Value>,
}

fn default_item_type() -> String {
    "multiple_choice".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExerciseItemResult {
    pub item_index: i64,
    pub is_correct: bool,
    pub student_answer: String,
    pub correct_answer: String,
    pub response_time_ms: i64,
    pub points_earned: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExerciseSession {
    pub id: String,
    pub student_id: String,
    pub game_id: String,
    pub game_name: String,
    pub deficit_area: String,
    pub difficulty_level: i64,
    pub items: Vec<ExerciseItem>,
    pub results: Vec<ExerciseItemResult>,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub total_items: i64,
    pub correct_count: i64,
    pub accuracy: f64,
    pub avg_response_time_ms: f64,
    pub points_earned: i64,
    pub badges_earned: Vec<String>,
    pub status: SessionStatus,
}

/// Outcome written when a session is finalized
#[derive(Debug, Clone)]
pub struct SessionCompletion {
    pub completed_at: String,
    pub correct_count: i64,
    pub accuracy: f64,
    pub avg_response_time_ms: f64,
    pub points_earned: i64,
}

fn session_from_row(row: &SqliteRow) -> Result<ExerciseSession, DbError> {
    let status: String = row.try_get("status")?;
    Ok(ExerciseSession {
        id: row.try_get("id")?,
        student_id: row.try_get("student_id")?,
        game_id: row.try_get("game_id")?,
        game_name: row.try_get("game_name")?,
        deficit_area: row.try_get("deficit_area")?,
        difficulty_level: row.try_get("difficulty_level")?,
        items: decode_json("items", row.try_get("items")?)?,
        results: decode_json("results", row.try_get("results")?)?,
        started_at: row.try_get("started_at")?,
        completed_at: row.try_get("completed_at")?,
        total_items: row.try_get("total_items")?,
        correct_count: row.try_get("correct_count")?,
        accuracy: row.try_get("accuracy")?,
        avg_response_time_ms: row.try_get("avg_response_time_ms")?,
        points_earned: row.try_get("points_earned")?,
        badges_earned: decode_json("badges_earned", row.try_get("badges_earned")?)?,
        status: SessionStatus::parse(&status),
    })
}

pub async fn insert_session(pool: &SqlitePool, session: &ExerciseSession) -> Result<(), DbError> {
    sqlx::query(
        r#"
        INSERT INTO "exercise_sessions" (
            "id", "student_id", "game_id", "game_name", "deficit_area", "difficulty_level",
            "items", "results", "started_at", "completed_at", "total_items", "correct_count",
            "accuracy", "avg_response_time_ms", "points_earned", "badges_earned", "status"
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&session.id)
    .bind(&session.student_id)
    .bind(&session.game_id)
    .bind(&session.game_name)
    .bind(&session.deficit_area)
    .bind(session.difficulty_level)
    .bind(encode_json("items", &session.items)?)
    .bind(encode_json("results", &session.results)?)
    .bind(&session.started_at)
    .bind(&session.completed_at)
    .bind(session.total_items)
    .bind(session.correct_count)
    .bind(session.accuracy)
    .bind(session.avg_response_time_ms)
    .bind(session.points_earned)
    .bind(encode_json("badges_earned", &session.badges_earned)?)
    .bind(session.status.as_str())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_session<'e, E>(executor: E, session_id: &str) -> Result<Option<ExerciseSession>, DbError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(r#"SELECT * FROM "exercise_sessions" WHERE "id" = ?"#)
        .bind(session_id)
        .fetch_optional(executor)
        .await?;
    row.as_ref().map(session_from_row).transpose()
}

/// Most recent 50 sessions of a student, optionally limited to one area
pub async fn list_student_sessions(
    pool: &SqlitePool,
    student_id: &str,
    deficit_area: Option<&str>,
) -> Result<Vec<ExerciseSession>, DbError> {
    let rows = match deficit_area {
        Some(area) => {
            sqlx::query(
                r#"
                SELECT * FROM "exercise_sessions"
                WHERE "student_id" = ? AND "deficit_area" = ?
                ORDER BY "started_at" DESC LIMIT 50
                "#,
            )
            .bind(student_id)
            .bind(area)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query(
                r#"
                SELECT * FROM "exercise_sessions"
                WHERE "student_id" = ?
                ORDER BY "started_at" DESC LIMIT 50
                "#,
            )
            .bind(student_id)
            .fetch_all(pool)
            .await?
        }
    };
    rows.iter().map(session_from_row).collect()
}

/// Takes the write lock on an in-progress session. Returns false when the
/// session is missing or no longer in progress.
pub async fn lock_in_progress<'e, E>(executor: E, session_id: &str) -> Result<bool, DbError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let affected = sqlx::query(
        r#"UPDATE "exercise_sessions" SET "status" = "status" WHERE "id" = ? AND "status" = 'in_progress'"#,
    )
    .bind(session_id)
    .execute(executor)
    .await?
    .rows_affected();
    Ok(affected > 0)
}

pub async fn save_results<'e, E>(
    executor: E,
    session_id: &str,
    results: &[ExerciseItemResult],
    correct_count: i64,
) -> Result<(), DbError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(r#"UPDATE "exercise_sessions" SET "results" = ?, "correct_count" = ? WHERE "id" = ?"#)
        .bind(encode_json("results", &results)?)
        .bind(correct_count)
        .bind(session_id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Marks an in-progress session completed. Returns false if it was not in
/// progress.
pub async fn mark_completed<'e, E>(
    executor: E,
    session_id: &str,
    completion: &SessionCompletion,
) -> Result<bool, DbError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let affected = sqlx::query(
        r#"
        UPDATE "exercise_sessions"
        SET "status" = 'completed', "completed_at" = ?, "correct_count" = ?, "accuracy" = ?,
            "avg_response_time_ms" = ?, "points_earned" = ?
        WHERE "id" = ? AND "status" = 'in_progress'
        "#,
    )
    .bind(&completion.completed_at)
    .bind(completion.correct_count)
    .bind(completion.accuracy)
    .bind(completion.avg_response_time_ms)
    .bind(completion.points_earned)
    .bind(session_id)
    .execute(executor)
    .await?
    .rows_affected();
    Ok(affected > 0)
}

pub async fn save_badges_earned<'e, E>(executor: E, session_id: &str, badges: &[String]) -> Result<(), DbError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(r#"UPDATE "exercise_sessions" SET "badges_earned" = ? WHERE "id" = ?"#)
        .bind(encode_json("badges_earned", &badges)?)
        .bind(session_id)
        .execute(executor)
        .await?;
    Ok(())
}

/// Accuracies of the last `limit` completed sessions in an area, oldest first
pub async fn recent_accuracies<'e, E>(
    executor: E,
    student_id: &str,
    deficit_area: &str,
    limit: i64,
) -> Result<Vec<f64>, DbError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let mut values: Vec<f64> = sqlx::query_scalar(
        r#"
        SELECT "accuracy" FROM "exercise_sessions"
        WHERE "student_id" = ? AND "deficit_area" = ? AND "status" = 'completed'
        ORDER BY "completed_at" DESC LIMIT ?
        "#,
    )
    .bind(student_id)
    .bind(deficit_area)
    .bind(limit)
    .fetch_all(executor)
    .await?;
    values.reverse();
    Ok(values)
}
