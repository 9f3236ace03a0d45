mod adventures;
mod analytics;
mod exercises;
mod games;
mod gamification;
mod health;
mod students;
mod tts;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};

use crate::middleware::auth::{optional_auth, require_auth};
use crate::response::{json_error, AppError};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    // Learner data sits behind authentication; the catalog and speech do not.
    let protected = Router::new()
        .nest("/students", students::router())
        .nest("/exercises", exercises::router())
        .nest("/gamification", gamification::router())
        .nest("/analytics", analytics::router())
        .nest("/adventures", adventures::router())
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let public = Router::new()
        .nest("/games", games::router())
        .nest("/tts", tts::router())
        .layer(middleware::from_fn_with_state(state.clone(), optional_auth));

    Router::new()
        .merge(health::router())
        .nest("/api/v1", protected.merge(public))
        .fallback(fallback_handler)
        .with_state(state)
}

/// Unwraps a JSON body, turning extractor rejections into the error envelope
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AppError::validation(rejection.body_text()))
}

async fn fallback_handler() -> Response {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "Not found").into_response()
}
