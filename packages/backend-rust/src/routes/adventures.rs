use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use eyeradar_algo::DeficitArea;
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::db::operations;
use crate::response::{message, ok, AppError};
use crate::routes::json_body;
use crate::services::adventure::{self, CreateAdventure, SuggestRequest, UpdateAdventure};
use crate::services::profiles::SeverityLevel;
use crate::state::AppState;

const DEFAULT_AREA_AGE: i64 = 8;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_adventure))
        .route("/status/all", get(all_statuses))
        .route("/suggest", post(suggest))
        .route("/games-for-area/:area", get(games_for_area))
        .route("/student/:student_id", get(active_for_student))
        .route("/student/:student_id/all", get(all_for_student))
        .route(
            "/:id",
            get(get_adventure).put(update_adventure).delete(delete_adventure),
        )
}

#[derive(Debug, Deserialize)]
struct AreaGamesQuery {
    age: Option<i64>,
    severity: Option<String>,
}

async fn all_statuses(State(state): State<AppState>) -> Result<Response, AppError> {
    let statuses = operations::active_adventure_statuses(state.db()?.pool()).await?;
    Ok(ok(statuses).into_response())
}

async fn create_adventure(
    State(state): State<AppState>,
    user: Option<Extension<AuthUser>>,
    body: Result<Json<CreateAdventure>, JsonRejection>,
) -> Result<Response, AppError> {
    let mut request = json_body(body)?;
    if request.created_by.is_none() {
        request.created_by = user.map(|Extension(user)| user.id);
    }
    let map = adventure::create(state.db()?.pool(), request).await?;
    Ok(ok(map).into_response())
}

/// Active map, or `null` data when the student has none
async fn active_for_student(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> Result<Response, AppError> {
    let map = operations::get_active_adventure(state.db()?.pool(), &student_id).await?;
    Ok(ok(map).into_response())
}

async fn all_for_student(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> Result<Response, AppError> {
    let maps = operations::list_student_adventures(state.db()?.pool(), &student_id).await?;
    Ok(ok(maps).into_response())
}

async fn get_adventure(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response, AppError> {
    let map = operations::get_adventure(state.db()?.pool(), &id)
        .await?
        .ok_or_else(|| AppError::not_found("Adventure not found"))?;
    Ok(ok(map).into_response())
}

async fn update_adventure(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<UpdateAdventure>, JsonRejection>,
) -> Result<Response, AppError> {
    let request = json_body(body)?;
    let map = adventure::update(state.db()?.pool(), &id, request).await?;
    Ok(ok(map).into_response())
}

async fn delete_adventure(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response, AppError> {
    if !operations::delete_adventure(state.db()?.pool(), &id).await? {
        return Err(AppError::not_found("Adventure not found"));
    }
    Ok(message("Adventure deleted").into_response())
}

async fn suggest(
    State(state): State<AppState>,
    body: Result<Json<SuggestRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let request = json_body(body)?;
    let suggestion = adventure::suggest(state.db()?.pool(), state.llm(), &request).await?;
    Ok(ok(suggestion).into_response())
}

async fn games_for_area(Path(area): Path<String>, Query(query): Query<AreaGamesQuery>) -> Result<Response, AppError> {
    let parsed = DeficitArea::parse(&area)
        .ok_or_else(|| AppError::bad_request(format!("Invalid deficit area: {area}")))?;
    let severity = match query.severity.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => Some(
            SeverityLevel::parse(raw)
                .ok_or_else(|| AppError::bad_request(format!("Invalid severity level: {raw}")))?,
        ),
        None => None,
    };

    let games = adventure::games_for_area(parsed, query.age.unwrap_or(DEFAULT_AREA_AGE), severity);
    Ok(ok(games).into_response())
}
