use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::response::{ok, AppError};
use crate::services::analytics;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:student_id/overview", get(overview))
        .route("/:student_id/report", get(report))
}

async fn overview(State(state): State<AppState>, Path(student_id): Path<String>) -> Result<Response, AppError> {
    let overview = analytics::overview(state.db()?.pool(), &student_id).await?;
    Ok(ok(overview).into_response())
}

async fn report(State(state): State<AppState>, Path(student_id): Path<String>) -> Result<Response, AppError> {
    let report = analytics::report(state.db()?.pool(), &student_id).await?;
    Ok(ok(report).into_response())
}
