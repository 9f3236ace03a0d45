use axum::extract::Path;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use eyeradar_algo::DeficitArea;

use crate::response::{ok, AppError};
use crate::services::games;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_games))
        .route("/by-area/:area", get(games_by_area))
        .route("/:id", get(get_game))
}

async fn list_games() -> Response {
    ok(games::all_games()).into_response()
}

async fn games_by_area(Path(area): Path<String>) -> Result<Response, AppError> {
    let area = DeficitArea::parse(&area)
        .ok_or_else(|| AppError::bad_request(format!("Invalid deficit area: {area}")))?;
    Ok(ok(games::games_by_area(area)).into_response())
}

async fn get_game(Path(id): Path<String>) -> Result<Response, AppError> {
    let game = games::get_game(&id).ok_or_else(|| AppError::not_found("Game not found"))?;
    Ok(ok(game).into_response())
}
