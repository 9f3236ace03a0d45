use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite, SqlitePool};

use crate::db::{decode_json, encode_json, DbError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeficitInfo {
    /// 1 = mild, 5 = severe
    pub severity: i64,
    pub percentile: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReadingMetrics {
    pub fixation_duration_ms: f64,
    pub fixation_count_per_line: f64,
    pub regression_rate: f64,
    pub words_per_minute: f64,
}

/// Eye-tracking assessment imported from EyeRadar
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Assessment {
    pub assessment_date: String,
    pub overall_severity: i64,
    pub deficits: BTreeMap<String, DeficitInfo>,
    pub reading_metrics: ReadingMetrics,
}

impl Assessment {
    /// Severity recorded for an area, if the assessment covers it
    pub fn severity_for(&self, area: &str) -> Option<i64> {
        self.deficits.get(area).map(|info| info.severity)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Student {
    pub id: String,
    pub name: String,
    pub age: i64,
    pub grade: i64,
    pub language: String,
    pub interests: Vec<String>,
    pub assessment: Option<Assessment>,
    pub diagnostic: serde_json::Map<String, serde_json::Value>,
    pub current_levels: BTreeMap<String, i64>,
    pub total_points: i64,
    pub current_streak: i64,
    pub longest_streak: i64,
    pub badges: Vec<String>,
    pub level: i64,
    pub xp: i64,
    pub last_session_date: Option<String>,
    pub created_at: String,
}

impl Student {
    pub fn new(id: String, name: String, age: i64, grade: i64, created_at: String) -> Self {
        Self {
            id,
            name,
            age,
            grade,
            language: "en".to_string(),
            interests: Vec::new(),
            assessment: None,
            diagnostic: serde_json::Map::new(),
            current_levels: BTreeMap::new(),
            total_points: 0,
            current_streak: 0,
            longest_streak: 0,
            badges: Vec::new(),
            level: 1,
            xp: 0,
            last_session_date: None,
            created_at,
        }
    }

    pub fn current_level(&self, area: &str) -> Option<i64> {
        self.current_levels.get(area).copied()
    }
}

fn student_from_row(row: &SqliteRow) -> Result<Student, DbError> {
    let assessment_raw: Option<String> = row.try_get("assessment")?;
    let assessment = match assessment_raw {
        Some(text) if !text.trim().is_empty() && text.trim() != "null" => Some(
            serde_json::from_str(&text).map_err(|source| DbError::Json {
                column: "assessment",
                source,
            })?,
        ),
        _ => None,
    };

    // A malformed diagnostic never blocks reading the student.
    let diagnostic_raw: Option<String> = row.try_get("diagnostic")?;
    let diagnostic = diagnostic_raw
        .and_then(|text| serde_json::from_str(&text).ok())
        .unwrap_or_default();

    Ok(Student {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        age: row.try_get("age")?,
        grade: row.try_get("grade")?,
        language: row
            .try_get::<Option<String>, _>("language")?
            .unwrap_or_else(|| "en".to_string()),
        interests: decode_json("interests", row.try_get("interests")?)?,
        assessment,
        diagnostic,
        current_levels: decode_json("current_levels", row.try_get("current_levels")?)?,
        total_points: row.try_get::<Option<i64>, _>("total_points")?.unwrap_or(0),
        current_streak: row.try_get::<Option<i64>, _>("current_streak")?.unwrap_or(0),
        longest_streak: row.try_get::<Option<i64>, _>("longest_streak")?.unwrap_or(0),
        badges: decode_json("badges", row.try_get("badges")?)?,
        level: row.try_get::<Option<i64>, _>("level")?.unwrap_or(1),
        xp: row.try_get::<Option<i64>, _>("xp")?.unwrap_or(0),
        last_session_date: row.try_get("last_session_date")?,
        created_at: row.try_get("created_at")?,
    })
}

pub async fn insert_student(pool: &SqlitePool, student: &Student) -> Result<(), DbError> {
    sqlx::query(
        r#"
        INSERT INTO "students" (
            "id", "name", "age", "grade", "language", "interests", "assessment",
            "diagnostic", "current_levels", "total_points", "current_streak",
            "longest_streak", "badges", "level", "xp", "last_session_date", "created_at"
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&student.id)
    .bind(&student.name)
    .bind(student.age)
    .bind(student.grade)
    .bind(&student.language)
    .bind(encode_json("interests", &student.interests)?)
    .bind(
        student
            .assessment
            .as_ref()
            .map(|a| encode_json("assessment", a))
            .transpose()?,
    )
    .bind(encode_json("diagnostic", &student.diagnostic)?)
    .bind(encode_json("current_levels", &student.current_levels)?)
    .bind(student.total_points)
    .bind(student.current_streak)
    .bind(student.longest_streak)
    .bind(encode_json("badges", &student.badges)?)
    .bind(student.level)
    .bind(student.xp)
    .bind(&student.last_session_date)
    .bind(&student.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_student<'e, E>(executor: E, student_id: &str) -> Result<Option<Student>, DbError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(r#"SELECT * FROM "students" WHERE "id" = ?"#)
        .bind(student_id)
        .fetch_optional(executor)
        .await?;
    row.as_ref().map(student_from_row).transpose()
}

pub async fn list_students(pool: &SqlitePool) -> Result<Vec<Student>, DbError> {
    let rows = sqlx::query(r#"SELECT * FROM "students" ORDER BY "created_at" DESC"#)
        .fetch_all(pool)
        .await?;
    rows.iter().map(student_from_row).collect()
}

/// Writes the editable profile fields
pub async fn update_profile(pool: &SqlitePool, student: &Student) -> Result<(), DbError> {
    sqlx::query(
        r#"
        UPDATE "students"
        SET "name" = ?, "age" = ?, "grade" = ?, "language" = ?, "interests" = ?, "diagnostic" = ?
        WHERE "id" = ?
        "#,
    )
    .bind(&student.name)
    .bind(student.age)
    .bind(student.grade)
    .bind(&student.language)
    .bind(encode_json("interests", &student.interests)?)
    .bind(encode_json("diagnostic", &student.diagnostic)?)
    .bind(&student.id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Stores an assessment and the per-area starting levels derived from it
pub async fn save_assessment(
    pool: &SqlitePool,
    student_id: &str,
    assessment: &Assessment,
    current_levels: &BTreeMap<String, i64>,
) -> Result<(), DbError> {
    sqlx::query(r#"UPDATE "students" SET "assessment" = ?, "current_levels" = ? WHERE "id" = ?"#)
        .bind(encode_json("assessment", assessment)?)
        .bind(encode_json("current_levels", current_levels)?)
        .bind(student_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Writes points, levels, streaks and badges after a completed session
pub async fn save_progress<'e, E>(executor: E, student: &Student) -> Result<(), DbError>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        UPDATE "students"
        SET "total_points" = ?, "xp" = ?, "level" = ?, "current_levels" = ?,
            "current_streak" = ?, "longest_streak" = ?, "last_session_date" = ?, "badges" = ?
        WHERE "id" = ?
        "#,
    )
    .bind(student.total_points)
    .bind(student.xp)
    .bind(student.level)
    .bind(encode_json("current_levels", &student.current_levels)?)
    .bind(student.current_streak)
    .bind(student.longest_streak)
    .bind(&student.last_session_date)
    .bind(encode_json("badges", &student.badges)?)
    .bind(&student.id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Deletes a student with its sessions and adventure maps. Returns false if
/// the student did not exist.
pub async fn delete_student(pool: &SqlitePool, student_id: &str) -> Result<bool, DbError> {
    let mut tx = pool.begin().await?;

    sqlx::query(r#"DELETE FROM "exercise_sessions" WHERE "student_id" = ?"#)
        .bind(student_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query(r#"DELETE FROM "adventure_maps" WHERE "student_id" = ?"#)
        .bind(student_id)
        .execute(&mut *tx)
        .await?;
    let deleted = sqlx::query(r#"DELETE FROM "students" WHERE "id" = ?"#)
        .bind(student_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;
    Ok(deleted > 0)
}
