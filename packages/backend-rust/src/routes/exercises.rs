use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::db::operations;
use crate::response::{ok, AppError};
use crate::routes::json_body;
use crate::services::exercise::{self, StartSession, SubmitAnswer};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/start", post(start_session))
        .route("/student/:student_id", get(student_sessions))
        .route("/recommendations/:student_id", get(recommendations))
        .route("/:id", get(get_session))
        .route("/:id/submit", post(submit_item))
        .route("/:id/complete", post(complete_session))
}

#[derive(Debug, Deserialize)]
struct SessionFilter {
    deficit_area: Option<String>,
}

async fn start_session(
    State(state): State<AppState>,
    body: Result<Json<StartSession>, JsonRejection>,
) -> Result<Response, AppError> {
    let request = json_body(body)?;
    let session = exercise::start_session(state.db()?.pool(), state.content(), &request).await?;
    Ok(ok(session).into_response())
}

async fn get_session(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response, AppError> {
    let session = operations::get_session(state.db()?.pool(), &id)
        .await?
        .ok_or_else(|| AppError::not_found("Session not found"))?;
    Ok(ok(session).into_response())
}

async fn submit_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<SubmitAnswer>, JsonRejection>,
) -> Result<Response, AppError> {
    let answer = json_body(body)?;
    let result = exercise::submit_answer(state.db()?.pool(), &id, &answer).await?;
    Ok(ok(result).into_response())
}

async fn complete_session(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response, AppError> {
    let session = exercise::complete_session(state.db()?.pool(), &id).await?;
    Ok(ok(session).into_response())
}

async fn student_sessions(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
    Query(filter): Query<SessionFilter>,
) -> Result<Response, AppError> {
    let sessions = operations::list_student_sessions(
        state.db()?.pool(),
        &student_id,
        filter.deficit_area.as_deref().filter(|a| !a.is_empty()),
    )
    .await?;
    Ok(ok(sessions).into_response())
}

async fn recommendations(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> Result<Response, AppError> {
    let recs = exercise::recommendations(state.db()?.pool(), &student_id).await?;
    Ok(ok(recs).into_response())
}
