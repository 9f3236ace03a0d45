use std::collections::BTreeMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::now_iso;
use crate::db::operations::{self, Assessment, Student};
use crate::response::{message, ok, AppError};
use crate::routes::json_body;
use crate::services::profiles::validate_diagnostic;
use crate::state::AppState;

const MAX_NAME_CHARS: usize = 100;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_student).get(list_students))
        .route(
            "/:id",
            get(get_student)
                .patch(update_student)
                .put(upsert_student)
                .delete(delete_student),
        )
        .route("/:id/assessment", post(import_assessment))
}

#[derive(Debug, Clone, Deserialize)]
pub struct StudentCreate {
    pub name: String,
    pub age: i64,
    pub grade: i64,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub diagnostic: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentUpdate {
    pub name: Option<String>,
    pub age: Option<i64>,
    pub grade: Option<i64>,
    pub language: Option<String>,
    pub interests: Option<Vec<String>>,
    pub diagnostic: Option<serde_json::Map<String, serde_json::Value>>,
}

fn default_language() -> String {
    "en".to_string()
}

fn validate_name(name: &str) -> Result<(), AppError> {
    let len = name.chars().count();
    if len == 0 || len > MAX_NAME_CHARS {
        return Err(AppError::validation("name must be 1-100 characters"));
    }
    Ok(())
}

fn validate_age(age: i64) -> Result<(), AppError> {
    if !(4..=18).contains(&age) {
        return Err(AppError::validation("age must be between 4 and 18"));
    }
    Ok(())
}

fn validate_grade(grade: i64) -> Result<(), AppError> {
    if !(0..=12).contains(&grade) {
        return Err(AppError::validation("grade must be between 0 and 12"));
    }
    Ok(())
}

impl StudentCreate {
    fn validate(&self) -> Result<(), AppError> {
        validate_name(&self.name)?;
        validate_age(self.age)?;
        validate_grade(self.grade)?;
        if let Some(diagnostic) = &self.diagnostic {
            validate_diagnostic(diagnostic).map_err(AppError::validation)?;
        }
        Ok(())
    }

    fn into_student(self, id: String) -> Student {
        let mut student = Student::new(id, self.name, self.age, self.grade, now_iso());
        student.language = self.language;
        student.interests = self.interests;
        student.diagnostic = self.diagnostic.unwrap_or_default();
        student
    }

    fn into_update(self) -> StudentUpdate {
        StudentUpdate {
            name: Some(self.name),
            age: Some(self.age),
            grade: Some(self.grade),
            language: Some(self.language),
            interests: Some(self.interests),
            diagnostic: self.diagnostic,
        }
    }
}

impl StudentUpdate {
    fn validate(&self) -> Result<(), AppError> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(age) = self.age {
            validate_age(age)?;
        }
        if let Some(grade) = self.grade {
            validate_grade(grade)?;
        }
        if let Some(diagnostic) = &self.diagnostic {
            validate_diagnostic(diagnostic).map_err(AppError::validation)?;
        }
        Ok(())
    }

    fn apply(self, student: &mut Student) {
        if let Some(name) = self.name {
            student.name = name;
        }
        if let Some(age) = self.age {
            student.age = age;
        }
        if let Some(grade) = self.grade {
            student.grade = grade;
        }
        if let Some(language) = self.language {
            student.language = language;
        }
        if let Some(interests) = self.interests {
            student.interests = interests;
        }
        if let Some(diagnostic) = self.diagnostic {
            student.diagnostic = diagnostic;
        }
    }
}

fn validate_assessment(assessment: &Assessment) -> Result<(), AppError> {
    if chrono::DateTime::parse_from_rfc3339(&assessment.assessment_date).is_err()
        && chrono::NaiveDateTime::parse_from_str(&assessment.assessment_date, "%Y-%m-%dT%H:%M:%S%.f").is_err()
    {
        return Err(AppError::validation("assessment_date must be an ISO-8601 timestamp"));
    }
    if !(1..=5).contains(&assessment.overall_severity) {
        return Err(AppError::validation("overall_severity must be between 1 and 5"));
    }
    for (area, info) in &assessment.deficits {
        if !(1..=5).contains(&info.severity) {
            return Err(AppError::validation(format!("deficits.{area}.severity must be between 1 and 5")));
        }
        if !(0..=100).contains(&info.percentile) {
            return Err(AppError::validation(format!("deficits.{area}.percentile must be between 0 and 100")));
        }
    }
    if !(0.0..=1.0).contains(&assessment.reading_metrics.regression_rate) {
        return Err(AppError::validation("reading_metrics.regression_rate must be between 0 and 1"));
    }
    Ok(())
}

/// Starting level per assessed area: the more severe, the lower the start
fn starting_levels(assessment: &Assessment) -> BTreeMap<String, i64> {
    assessment
        .deficits
        .iter()
        .map(|(area, info)| (area.clone(), (6 - info.severity).max(1)))
        .collect()
}

async fn load_student(state: &AppState, student_id: &str) -> Result<Student, AppError> {
    operations::get_student(state.db()?.pool(), student_id)
        .await?
        .ok_or_else(|| AppError::not_found("Student not found"))
}

async fn create_student(
    State(state): State<AppState>,
    body: Result<Json<StudentCreate>, JsonRejection>,
) -> Result<Response, AppError> {
    let payload = json_body(body)?;
    payload.validate()?;

    let student = payload.into_student(Uuid::new_v4().to_string());
    operations::insert_student(state.db()?.pool(), &student).await?;
    tracing::info!(student_id = %student.id, "student created");
    Ok(ok(student).into_response())
}

async fn list_students(State(state): State<AppState>) -> Result<Response, AppError> {
    let students = operations::list_students(state.db()?.pool()).await?;
    Ok(ok(students).into_response())
}

async fn get_student(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response, AppError> {
    let student = load_student(&state, &id).await?;
    Ok(ok(student).into_response())
}

async fn update_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<StudentUpdate>, JsonRejection>,
) -> Result<Response, AppError> {
    let update = json_body(body)?;
    update.validate()?;

    let mut student = load_student(&state, &id).await?;
    update.apply(&mut student);
    operations::update_profile(state.db()?.pool(), &student).await?;
    Ok(ok(student).into_response())
}

/// Create-or-update by id, used to provision a student on first login
async fn upsert_student(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<StudentCreate>, JsonRejection>,
) -> Result<Response, AppError> {
    let payload = json_body(body)?;
    payload.validate()?;
    let pool = state.db()?.pool();

    let student = match operations::get_student(pool, &id).await? {
        Some(mut existing) => {
            payload.into_update().apply(&mut existing);
            operations::update_profile(pool, &existing).await?;
            existing
        }
        None => {
            let student = payload.into_student(id);
            operations::insert_student(pool, &student).await?;
            tracing::info!(student_id = %student.id, "student provisioned");
            student
        }
    };
    Ok(ok(student).into_response())
}

async fn import_assessment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Assessment>, JsonRejection>,
) -> Result<Response, AppError> {
    let assessment = json_body(body)?;
    validate_assessment(&assessment)?;

    let mut student = load_student(&state, &id).await?;
    let levels = starting_levels(&assessment);
    operations::save_assessment(state.db()?.pool(), &id, &assessment, &levels).await?;

    tracing::info!(student_id = %id, areas = levels.len(), "assessment imported");
    student.assessment = Some(assessment);
    student.current_levels = levels;
    Ok(ok(student).into_response())
}

async fn delete_student(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response, AppError> {
    if !operations::delete_student(state.db()?.pool(), &id).await? {
        return Err(AppError::not_found("Student not found"));
    }
    tracing::info!(student_id = %id, "student deleted");
    Ok(message("Student deleted").into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::operations::{DeficitInfo, ReadingMetrics};

    fn assessment(severities: &[(&str, i64)]) -> Assessment {
        Assessment {
            assessment_date: "2026-03-01T10:00:00Z".to_string(),
            overall_severity: 3,
            deficits: severities
                .iter()
                .map(|(area, severity)| {
                    (
                        area.to_string(),
                        DeficitInfo {
                            severity: *severity,
                            percentile: 40,
                        },
                    )
                })
                .collect(),
            reading_metrics: ReadingMetrics {
                fixation_duration_ms: 250.0,
                fixation_count_per_line: 9.0,
                regression_rate: 0.2,
                words_per_minute: 80.0,
            },
        }
    }

    #[test]
    fn test_starting_levels_invert_severity() {
        let levels = starting_levels(&assessment(&[("phonological_awareness", 5), ("rapid_naming", 1)]));
        assert_eq!(levels["phonological_awareness"], 1);
        assert_eq!(levels["rapid_naming"], 5);
    }

    #[test]
    fn test_assessment_validation() {
        assert!(validate_assessment(&assessment(&[("rapid_naming", 3)])).is_ok());
        assert!(validate_assessment(&assessment(&[("rapid_naming", 6)])).is_err());

        let mut bad_date = assessment(&[]);
        bad_date.assessment_date = "yesterday".to_string();
        assert!(validate_assessment(&bad_date).is_err());

        let mut naive = assessment(&[]);
        naive.assessment_date = "2026-03-01T10:00:00".to_string();
        assert!(validate_assessment(&naive).is_ok());
    }

    #[test]
    fn test_create_validation_bounds() {
        let base = StudentCreate {
            name: "Maria".to_string(),
            age: 8,
            grade: 3,
            language: "el".to_string(),
            interests: vec![],
            diagnostic: None,
        };
        assert!(base.validate().is_ok());
        assert!(StudentCreate { age: 3, ..base.clone() }.validate().is_err());
        assert!(StudentCreate { grade: 13, ..base.clone() }.validate().is_err());
        assert!(StudentCreate { name: String::new(), ..base.clone() }.validate().is_err());
        assert!(StudentCreate { name: "x".repeat(101), ..base }.validate().is_err());
    }

    #[test]
    fn test_update_applies_only_present_fields() {
        let mut student = Student::new("s1".into(), "Nikos".into(), 9, 4, now_iso());
        StudentUpdate {
            grade: Some(5),
            ..Default::default()
        }
        .apply(&mut student);
        assert_eq!(student.name, "Nikos");
        assert_eq!(student.grade, 5);
    }
}
