use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::db::operations::{self, Student};
use crate::response::{ok, AppError};
use crate::services::gamification;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/badges/all", get(all_badges))
        .route("/:student_id/summary", get(summary))
        .route("/:student_id/badges", get(student_badges))
}

async fn load_student(state: &AppState, student_id: &str) -> Result<Student, AppError> {
    operations::get_student(state.db()?.pool(), student_id)
        .await?
        .ok_or_else(|| AppError::not_found("Student not found"))
}

async fn summary(State(state): State<AppState>, Path(student_id): Path<String>) -> Result<Response, AppError> {
    let student = load_student(&state, &student_id).await?;
    let summary = gamification::summary(state.db()?.pool(), &student).await?;
    Ok(ok(summary).into_response())
}

async fn student_badges(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> Result<Response, AppError> {
    let student = load_student(&state, &student_id).await?;
    Ok(ok(gamification::student_badges(&student)).into_response())
}

async fn all_badges() -> Response {
    ok(gamification::badge_catalog()).into_response()
}
