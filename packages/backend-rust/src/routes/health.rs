use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;

use crate::state::AppState;

const SERVICE_BANNER: &str = "EyeRadar Dyslexia Exercise API";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/ai-status", get(ai_status))
}

#[derive(Debug, Serialize)]
struct RootResponse {
    message: &'static str,
    version: &'static str,
    documentation: &'static str,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    db: &'static str,
    ai_provider: String,
    ai_status: String,
    uptime: u64,
}

async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: SERVICE_BANNER,
        version: env!("CARGO_PKG_VERSION"),
        documentation: "/docs",
    })
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_ready = match state.database() {
        Some(db) => db.ping().await,
        None => false,
    };
    let ai = state.llm().status();

    Json(HealthResponse {
        status: if db_ready { "healthy" } else { "degraded" },
        db: if db_ready { "connected" } else { "unavailable" },
        ai_provider: ai
            .as_ref()
            .map_or_else(|| "none".to_string(), |s| s.provider.clone()),
        ai_status: ai.map_or_else(|| "unknown".to_string(), |s| s.status),
        uptime: state.uptime_seconds(),
    })
}

async fn ai_status(State(state): State<AppState>) -> Response {
    match state.llm().status() {
        Some(status) => Json(status).into_response(),
        None => Json(json!({ "status": "not_initialized" })).into_response(),
    }
}
