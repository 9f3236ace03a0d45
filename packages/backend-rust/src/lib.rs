pub mod auth;
pub mod config;
pub mod db;
pub mod logging;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;

use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::db::Database;
use crate::services::llm_provider::LlmProvider;
use crate::state::AppState;

/// Opens the database, probes the LLM provider and wires the router.
/// A database that fails to open leaves the service running in degraded mode.
pub async fn create_app(config: Config) -> axum::Router {
    let db = match Database::connect(&config.database_path).await {
        Ok(db) => Some(db),
        Err(err) => {
            tracing::error!(error = %err, path = %config.database_path.display(), "database init failed");
            None
        }
    };

    let llm = LlmProvider::from_env();
    llm.probe().await;

    build_router(AppState::new(config, db, llm))
}

pub fn build_router(state: AppState) -> axum::Router {
    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
