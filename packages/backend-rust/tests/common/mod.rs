#![allow(dead_code)]

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use eyeradar_backend::config::Config;
use eyeradar_backend::db::Database;
use eyeradar_backend::services::content::ContentGenerator;
use eyeradar_backend::services::llm_provider::{LlmConfig, LlmProvider, ProviderKind};
use eyeradar_backend::state::AppState;

/// Router over a throwaway SQLite file. Keep the `TempDir` alive for the test.
pub struct TestApp {
    pub router: Router,
    _dir: TempDir,
}

fn offline_llm() -> LlmProvider {
    LlmProvider::new(LlmConfig {
        kind: ProviderKind::Ollama,
        api_key: None,
        openai_endpoint: "http://127.0.0.1:9".to_string(),
        openai_model: "unused".to_string(),
        adventure_model: "unused".to_string(),
        ollama_url: "http://127.0.0.1:9".to_string(),
        heavy_model: "unused".to_string(),
        light_model: "unused".to_string(),
        timeout: Duration::from_secs(1),
    })
}

pub async fn create_test_app() -> TestApp {
    let dir = TempDir::new().unwrap();
    let config = Config {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        log_level: "warn".to_string(),
        database_path: dir.path().join("eyeradar-test.db"),
        tts_cache_dir: dir.path().join("tts"),
        tts_endpoint: None,
        keycloak: None,
    };
    let db = Database::connect(&config.database_path).await.unwrap();
    let state = AppState::new(config, Some(db), offline_llm()).with_content(ContentGenerator::templates_only());

    TestApp {
        router: eyeradar_backend::build_router(state),
        _dir: dir,
    }
}

impl TestApp {
    pub async fn request(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    pub async fn create_student(&self, name: &str, age: i64) -> String {
        let (status, body) = self
            .request(
                "POST",
                "/api/v1/students",
                Some(serde_json::json!({ "name": name, "age": age, "grade": 3, "interests": ["space"] })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"]["id"].as_str().unwrap().to_string()
    }

    /// Plays one session of `game_id`, answering every item right or leaving
    /// all of them unanswered, and returns the completed session.
    pub async fn play_session(&self, student_id: &str, game_id: &str, all_correct: bool) -> Value {
        let (status, body) = self
            .request(
                "POST",
                "/api/v1/exercises/start",
                Some(serde_json::json!({ "student_id": student_id, "game_id": game_id })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        let session_id = body["data"]["id"].as_str().unwrap().to_string();

        if all_correct {
            for item in body["data"]["items"].as_array().unwrap() {
                let (status, _) = self
                    .request(
                        "POST",
                        &format!("/api/v1/exercises/{session_id}/submit"),
                        Some(serde_json::json!({
                            "item_index": item["index"],
                            "student_answer": item["correct_answer"],
                            "response_time_ms": 1200
                        })),
                    )
                    .await;
                assert_eq!(status, StatusCode::OK);
            }
        }

        let (status, body) = self
            .request("POST", &format!("/api/v1/exercises/{session_id}/complete"), None)
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"].clone()
    }
}
