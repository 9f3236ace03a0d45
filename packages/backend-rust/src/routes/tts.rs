use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use crate::response::AppError;
use crate::state::AppState;

const AUDIO_CACHE_CONTROL: &str = "public, max-age=86400";

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(synthesize))
}

#[derive(Debug, Deserialize)]
struct SpeechQuery {
    #[serde(default)]
    text: String,
    lang: Option<String>,
    rate: Option<String>,
}

async fn synthesize(State(state): State<AppState>, Query(query): Query<SpeechQuery>) -> Result<Response, AppError> {
    let audio = state
        .tts()
        .speak(&query.text, query.lang.as_deref(), query.rate.as_deref())
        .await?;

    Ok((
        [
            (header::CONTENT_TYPE, "audio/mpeg"),
            (header::CACHE_CONTROL, AUDIO_CACHE_CONTROL),
        ],
        audio,
    )
        .into_response())
}
