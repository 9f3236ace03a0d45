use axum::http::StatusCode;
use serde_json::json;

use eyeradar_algo::{compute_difficulty, DeficitArea};
use eyeradar_backend::services::games::games_for_student;

mod common;

#[tokio::test]
async fn test_root_banner_and_health() {
    let app = common::create_test_app().await;

    let (status, body) = app.request("GET", "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "EyeRadar Dyslexia Exercise API");

    let (status, body) = app.request("GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["db"], "connected");
    assert_eq!(body["ai_provider"], "none");

    let (_, body) = app.request("GET", "/ai-status", None).await;
    assert_eq!(body["status"], "not_initialized");
}

#[tokio::test]
async fn test_student_crud_round_trip() {
    let app = common::create_test_app().await;
    let id = app.create_student("Eleni", 8).await;

    let (status, body) = app.request("GET", &format!("/api/v1/students/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Eleni");
    assert_eq!(body["data"]["level"], 1);

    let (status, body) = app
        .request("PATCH", &format!("/api/v1/students/{id}"), Some(json!({ "grade": 4 })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["grade"], 4);
    assert_eq!(body["data"]["name"], "Eleni");

    let (_, body) = app.request("GET", "/api/v1/students", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = app.request("DELETE", &format!("/api/v1/students/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Student deleted");

    let (status, body) = app.request("GET", &format!("/api/v1/students/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "NOT_FOUND");
    assert_eq!(body["error"], "Student not found");
}

#[tokio::test]
async fn test_student_validation_rejects_out_of_range_age() {
    let app = common::create_test_app().await;
    let (status, body) = app
        .request("POST", "/api/v1/students", Some(json!({ "name": "Tiny", "age": 2, "grade": 0 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_upsert_creates_then_updates() {
    let app = common::create_test_app().await;
    let payload = json!({ "name": "Kostas", "age": 10, "grade": 5 });

    let (status, body) = app.request("PUT", "/api/v1/students/kc-user-1", Some(payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], "kc-user-1");

    let (_, body) = app
        .request(
            "PUT",
            "/api/v1/students/kc-user-1",
            Some(json!({ "name": "Kostas P.", "age": 10, "grade": 5 })),
        )
        .await;
    assert_eq!(body["data"]["name"], "Kostas P.");

    let (_, body) = app.request("GET", "/api/v1/students", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_assessment_import_sets_starting_levels() {
    let app = common::create_test_app().await;
    let id = app.create_student("Sofia", 9).await;

    let assessment = json!({
        "assessment_date": "2026-02-10T09:30:00Z",
        "overall_severity": 4,
        "deficits": {
            "phonological_awareness": { "severity": 4, "percentile": 12 },
            "rapid_naming": { "severity": 1, "percentile": 70 }
        },
        "reading_metrics": {
            "fixation_duration_ms": 310.0,
            "fixation_count_per_line": 11.0,
            "regression_rate": 0.31,
            "words_per_minute": 64.0
        }
    });
    let (status, body) = app
        .request("POST", &format!("/api/v1/students/{id}/assessment"), Some(assessment))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["current_levels"]["phonological_awareness"], 2);
    assert_eq!(body["data"]["current_levels"]["rapid_naming"], 5);
}

#[tokio::test]
async fn test_session_flow_updates_points_and_level() {
    let app = common::create_test_app().await;
    let student_id = app.create_student("Giorgos", 7).await;

    let (status, body) = app
        .request(
            "POST",
            "/api/v1/exercises/start",
            Some(json!({ "student_id": student_id, "game_id": "sound_safari" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let session = &body["data"];
    let session_id = session["id"].as_str().unwrap().to_string();
    let area = session["deficit_area"].as_str().unwrap().to_string();
    let items = session["items"].as_array().unwrap().clone();
    assert!(!items.is_empty());
    assert_eq!(session["status"], "in_progress");

    for item in &items {
        let answer = item["correct_answer"].as_str().unwrap();
        let (status, body) = app
            .request(
                "POST",
                &format!("/api/v1/exercises/{session_id}/submit"),
                Some(json!({
                    "item_index": item["index"],
                    "student_answer": format!("  {}  ", answer.to_uppercase()),
                    "response_time_ms": 1500
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["data"]["is_correct"], true);
        assert_eq!(body["data"]["points_earned"], 10);
    }

    let (status, body) = app
        .request("POST", &format!("/api/v1/exercises/{session_id}/complete"), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let completed = &body["data"];
    assert_eq!(completed["status"], "completed");
    assert_eq!(completed["accuracy"], 1.0);
    let points = completed["points_earned"].as_i64().unwrap();
    assert!(points > 0);
    let badges = completed["badges_earned"].as_array().unwrap();
    assert!(badges.iter().any(|b| b == "first_steps"));

    let (_, body) = app.request("GET", &format!("/api/v1/students/{student_id}"), None).await;
    let student = &body["data"];
    assert_eq!(student["total_points"].as_i64().unwrap(), points);
    assert_eq!(student["xp"].as_i64().unwrap(), points);
    assert_eq!(student["current_levels"][area.as_str()], 2);
    assert_eq!(student["current_streak"], 1);

    // A finished session accepts no more answers.
    let (status, body) = app
        .request(
            "POST",
            &format!("/api/v1/exercises/{session_id}/submit"),
            Some(json!({ "item_index": 0, "student_answer": "x" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Session is not in progress");

    let (_, body) = app
        .request("GET", &format!("/api/v1/exercises/student/{student_id}"), None)
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_submit_unknown_item_is_not_found() {
    let app = common::create_test_app().await;
    let student_id = app.create_student("Anna", 7).await;
    let (_, body) = app
        .request(
            "POST",
            "/api/v1/exercises/start",
            Some(json!({ "student_id": student_id, "game_id": "sound_safari" })),
        )
        .await;
    let session_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .request(
            "POST",
            &format!("/api/v1/exercises/{session_id}/submit"),
            Some(json!({ "item_index": 999, "student_answer": "cat" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Item not found");
}

#[tokio::test]
async fn test_unknown_ids_return_error_envelope() {
    let app = common::create_test_app().await;

    for uri in [
        "/api/v1/exercises/missing-session",
        "/api/v1/games/no_such_game",
        "/api/v1/adventures/missing-adventure",
        "/api/v1/gamification/missing-student/summary",
        "/api/v1/analytics/missing-student/overview",
    ] {
        let (status, body) = app.request("GET", uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(body["success"], false, "{uri}");
        assert_eq!(body["code"], "NOT_FOUND", "{uri}");
    }

    let (status, _) = app.request("GET", "/api/v1/nothing-here", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_game_catalog_routes() {
    let app = common::create_test_app().await;

    let (status, body) = app.request("GET", "/api/v1/games", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 36);

    let (status, body) = app.request("GET", "/api/v1/games/by-area/rapid_naming", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]
        .as_array()
        .unwrap()
        .iter()
        .all(|g| g["deficit_area"] == "rapid_naming"));

    let (status, _) = app.request("GET", "/api/v1/games/by-area/juggling", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.request("GET", "/api/v1/games/sound_safari", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], "sound_safari");
}

#[tokio::test]
async fn test_recommendations_without_assessment() {
    let app = common::create_test_app().await;
    let student_id = app.create_student("Petros", 8).await;

    let (status, body) = app
        .request("GET", &format!("/api/v1/exercises/recommendations/{student_id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let recs = body["data"].as_array().unwrap();
    assert_eq!(recs.len(), 6);
    assert!(recs.iter().all(|r| r["priority"] == 1 && r["suggested_difficulty"] == 1));
}

#[tokio::test]
async fn test_recommendations_follow_assessment_and_history() {
    let app = common::create_test_app().await;
    let student_id = app.create_student("Eleni", 7).await;

    let assessment = json!({
        "assessment_date": "2026-03-02T10:00:00Z",
        "overall_severity": 4,
        "deficits": {
            "phonological_awareness": { "severity": 5, "percentile": 3 },
            "rapid_naming": { "severity": 4, "percentile": 9 },
            "working_memory": { "severity": 1, "percentile": 60 },
            "visual_processing": { "severity": 1, "percentile": 55 },
            "reading_fluency": { "severity": 1, "percentile": 58 },
            "comprehension": { "severity": 1, "percentile": 66 }
        },
        "reading_metrics": {
            "fixation_duration_ms": 340.0,
            "fixation_count_per_line": 13.0,
            "regression_rate": 0.38,
            "words_per_minute": 48.0
        }
    });
    let (status, body) = app
        .request("POST", &format!("/api/v1/students/{student_id}/assessment"), Some(assessment))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let perfect = app.play_session(&student_id, "sound_safari", true).await;
    assert_eq!(perfect["deficit_area"], "phonological_awareness");
    assert_eq!(perfect["accuracy"], 1.0);
    let missed = app.play_session(&student_id, "speed_namer", false).await;
    assert_eq!(missed["deficit_area"], "rapid_naming");
    assert_eq!(missed["accuracy"], 0.0);

    let (status, body) = app
        .request("GET", &format!("/api/v1/exercises/recommendations/{student_id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let recs = body["data"].as_array().unwrap();

    let offered: usize = DeficitArea::ALL
        .iter()
        .map(|area| games_for_student(7, Some(&[*area])).len().min(2))
        .sum();
    assert_eq!(recs.len(), offered.min(10));

    let priorities: Vec<i64> = recs.iter().map(|r| r["priority"].as_i64().unwrap()).collect();
    assert!(priorities.windows(2).all(|w| w[0] >= w[1]), "{priorities:?}");

    // severity 5 with one session: 5 * 2 + 3 for under-practice
    let phonological: Vec<_> = recs
        .iter()
        .filter(|r| r["deficit_area"] == "phonological_awareness")
        .collect();
    assert!(!phonological.is_empty() && phonological.len() <= 2);
    assert_eq!(recs[0]["deficit_area"], "phonological_awareness");
    for rec in &phonological {
        assert_eq!(rec["priority"], 13);
        assert_eq!(rec["reason"], "Severity: 5/5, Accuracy: 100%");
        assert_eq!(rec["suggested_difficulty"], 2);
    }

    let rapid: Vec<_> = recs.iter().filter(|r| r["deficit_area"] == "rapid_naming").collect();
    assert!(!rapid.is_empty() && rapid.len() <= 2);
    assert_eq!(recs[phonological.len()]["deficit_area"], "rapid_naming");
    for rec in &rapid {
        assert_eq!(rec["priority"], 11);
        assert_eq!(rec["reason"], "Severity: 4/5, Accuracy: 0%");
        assert_eq!(rec["suggested_difficulty"], 1);
    }

    for rec in &recs[phonological.len() + rapid.len()..] {
        assert_eq!(rec["priority"], 5);
        assert_eq!(rec["reason"], "Severity: 1/5, Accuracy: 0%");
    }
}

#[tokio::test]
async fn test_analytics_overview_after_one_session() {
    let app = common::create_test_app().await;
    let student_id = app.create_student("Nikos", 7).await;
    let completed = app.play_session(&student_id, "sound_safari", true).await;
    let area = completed["deficit_area"].as_str().unwrap().to_string();

    let (status, body) = app
        .request("GET", &format!("/api/v1/analytics/{student_id}/overview"), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let overview = &body["data"];
    assert_eq!(overview["student_id"], student_id.as_str());
    assert_eq!(overview["total_sessions"], 1);
    assert_eq!(overview["improvement_trend"], "new");
    assert_eq!(overview["deficit_progress"].as_array().unwrap().len(), 6);
    assert_eq!(overview["recent_sessions"].as_array().unwrap().len(), 1);

    let preview = overview["difficulty_preview"].as_object().unwrap();
    assert_eq!(preview.len(), 6);
    for area in DeficitArea::ALL {
        assert_eq!(preview[area.as_str()]["area"], area.as_str());
    }

    // no assessment, so the neutral severity of 3 applies
    let played = &preview[area.as_str()];
    assert_eq!(played["current_level"], 2);
    assert_eq!(played["sessions_completed"], 1);
    assert_eq!(played["recent_accuracy"], 1.0);
    assert_eq!(played["trend"], "insufficient_data");
    assert_eq!(played["recommended_level"], compute_difficulty(7, 3, 2, &[1.0]));

    let idle = &preview["comprehension"];
    assert_eq!(idle["current_level"], 1);
    assert_eq!(idle["sessions_completed"], 0);
    assert!(idle["recent_accuracy"].is_null());
    assert_eq!(idle["recommended_level"], compute_difficulty(7, 3, 1, &[]));
}

#[tokio::test]
async fn test_adventure_suggest_falls_back_to_rules_and_persists() {
    let app = common::create_test_app().await;
    let student_id = app.create_student("Dimitra", 8).await;

    let (status, body) = app
        .request(
            "POST",
            "/api/v1/adventures/suggest",
            Some(json!({ "student_id": student_id, "severity_level": "severe" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let suggestion = &body["data"];
    assert_eq!(suggestion["source"], "rules");
    let worlds = suggestion["suggested_worlds"].as_array().unwrap().clone();
    assert!(!worlds.is_empty());
    assert!(worlds
        .iter()
        .all(|w| w["game_ids"].as_array().unwrap().len() <= 3));

    let (status, body) = app
        .request(
            "POST",
            "/api/v1/adventures",
            Some(json!({ "student_id": student_id, "worlds": worlds, "theme_config": suggestion["theme_config"] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let first_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["title"], "My Adventure");
    assert_eq!(body["data"]["created_by"], "local");

    let (_, body) = app
        .request(
            "POST",
            "/api/v1/adventures",
            Some(json!({ "student_id": student_id, "title": "Second", "worlds": [] })),
        )
        .await;
    let second_id = body["data"]["id"].as_str().unwrap().to_string();

    let (_, body) = app
        .request("GET", &format!("/api/v1/adventures/student/{student_id}"), None)
        .await;
    assert_eq!(body["data"]["id"], second_id.as_str());

    let (_, body) = app.request("GET", &format!("/api/v1/adventures/{first_id}"), None).await;
    assert_eq!(body["data"]["status"], "archived");

    let (status, body) = app
        .request("DELETE", &format!("/api/v1/adventures/{first_id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Adventure deleted");
}

#[tokio::test]
async fn test_adventure_suggest_rejects_unknown_override() {
    let app = common::create_test_app().await;
    let student_id = app.create_student("Ilias", 8).await;

    let (status, _) = app
        .request(
            "POST",
            "/api/v1/adventures/suggest",
            Some(json!({ "student_id": student_id, "severity_level": "extreme" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_games_for_area_filters() {
    let app = common::create_test_app().await;

    let (status, body) = app
        .request("GET", "/api/v1/adventures/games-for-area/phonological_awareness?age=12", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let games = body["data"].as_array().unwrap();
    assert!(games.iter().all(|g| g["id"] != "sound_safari"));

    let (status, _) = app
        .request("GET", "/api/v1/adventures/games-for-area/unknown_area", None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_tts_without_endpoint() {
    let app = common::create_test_app().await;

    let (status, _) = app.request("GET", "/api/v1/tts?text=", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.request("GET", "/api/v1/tts?text=hello&lang=en", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);
}
