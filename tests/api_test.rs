use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::Value;
use tower::util::ServiceExt; // for `oneshot`

use habitquest::infrastructure::AppState;
use habitquest::{auth, db, server};

async fn setup_app() -> Router {
    let db = db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB");
    let state = AppState::new(db).with_tick_interval(None);
    server::build_app(state, &[])
}

fn token_for(user_id: &str) -> String {
    auth::create_jwt(user_id, Some(user_id)).expect("Failed to create token")
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_is_public() {
    let app = setup_app().await;
    let response = app
        .oneshot(request("GET", "/api/health", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["service"], "habitquest");
}

#[tokio::test]
async fn test_requires_authentication() {
    let app = setup_app().await;

    let response = app
        .clone()
        .oneshot(request("GET", "/api/habits", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("Not authenticated"));

    let response = app
        .oneshot(request("GET", "/api/habits", Some("garbage"), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_first_request_provisions_profile() {
    let app = setup_app().await;
    let token = token_for("new-user");

    let response = app
        .oneshot(request("GET", "/api/profile", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["profile"]["id"], "new-user");
    assert_eq!(body["profile"]["level"], 1);
    assert_eq!(body["profile"]["xp"], 0);
    assert_eq!(body["profile"]["coins"], 0);
    assert_eq!(body["progress"]["xp_per_level"], 1000);
}

#[tokio::test]
async fn test_create_and_list_habits() {
    let app = setup_app().await;
    let token = token_for("alice");

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/habits",
            Some(&token),
            Some(serde_json::json!({ "title": "Journal", "duration_minutes": 15 })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["habit"]["title"], "Journal");
    assert_eq!(body["habit"]["frequency"], "daily");
    assert_eq!(body["message"], "Habit created");
    let stale: Vec<&str> = body["stale"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(stale.contains(&"habits"));
    assert!(stale.contains(&"stats"));

    let response = app
        .oneshot(request("GET", "/api/habits", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["total"], 1);
}

#[tokio::test]
async fn test_invalid_habit_is_bad_request() {
    let app = setup_app().await;
    let token = token_for("alice");

    let response = app
        .oneshot(request(
            "POST",
            "/api/habits",
            Some(&token),
            Some(serde_json::json!({ "title": "", "priority": 9 })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Title is required");
}

#[tokio::test]
async fn test_stats_without_habits_has_no_percentage() {
    let app = setup_app().await;
    let token = token_for("alice");

    let response = app
        .oneshot(request(
            "GET",
            "/api/stats?tz_offset_minutes=60",
            Some(&token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["stats"]["total_habits"], 0);
    assert!(body["stats"]["completion_percentage"].is_null());
    assert_eq!(body["stats"]["completion_label"], "N/A");
    assert_eq!(body["stats"]["highest_streak"], 0);
}

#[tokio::test]
async fn test_team_creation_without_coins_is_payment_required() {
    let app = setup_app().await;
    let token = token_for("alice");

    let response = app
        .oneshot(request(
            "POST",
            "/api/teams",
            Some(&token),
            Some(serde_json::json!({ "name": "Night Owls" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    let body = body_json(response).await;
    assert_eq!(body["required"], 1000);
    assert_eq!(body["shortfall"], 1000);
    assert!(body["error"].as_str().unwrap().contains("1000"));
}

#[tokio::test]
async fn test_session_endpoints() {
    let app = setup_app().await;
    let token = token_for("alice");

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/habits",
            Some(&token),
            Some(serde_json::json!({ "title": "Stretch", "duration_minutes": 2 })),
        ))
        .await
        .unwrap();
    let habit_id = body_json(response).await["habit"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let uri = format!("/api/habits/{}/session", habit_id);
    let response = app
        .clone()
        .oneshot(request("POST", &uri, Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["session"]["remaining_secs"], 120);

    let response = app
        .clone()
        .oneshot(request("POST", &uri, Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .clone()
        .oneshot(request("GET", "/api/session", Some(&token), None))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["session"]["habit_id"], habit_id.as_str());

    let response = app
        .clone()
        .oneshot(request("DELETE", "/api/session", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(request("DELETE", "/api/session", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_foreign_habit_is_forbidden() {
    let app = setup_app().await;
    let alice = token_for("alice");
    let mallory = token_for("mallory");

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/habits",
            Some(&alice),
            Some(serde_json::json!({ "title": "Private" })),
        ))
        .await
        .unwrap();
    let habit_id = body_json(response).await["habit"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .oneshot(request(
            "PUT",
            &format!("/api/habits/{}", habit_id),
            Some(&mallory),
            Some(serde_json::json!({ "title": "Mine" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_onboarding_with_template() {
    let app = setup_app().await;
    let token = token_for("alice");

    let response = app
        .clone()
        .oneshot(request("GET", "/api/templates", Some(&token), None))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert!(!body["templates"].as_array().unwrap().is_empty());

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/onboarding",
            Some(&token),
            Some(serde_json::json!({
                "display_name": "Alice",
                "category": "mindfulness",
                "target": "Calmer mornings",
                "template_id": "tpl-meditate"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["goal"]["category"], "mindfulness");
    assert_eq!(body["habit"]["title"], "Meditate");
    assert_eq!(body["habit"]["category"], "mindfulness");
    assert_eq!(body["habit"]["duration_minutes"], 10);

    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/onboarding",
            Some(&token),
            Some(serde_json::json!({ "category": "x", "template_id": "tpl-missing" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(request("GET", "/api/profile", Some(&token), None))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["profile"]["display_name"], "Alice");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = setup_app().await;
    let response = app
        .oneshot(request("GET", "/api-docs/openapi.json", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    for path in [
        "/api/habits",
        "/api/profile",
        "/api/leaderboard",
        "/api/session",
        "/api/teams",
        "/api/teams/{id}/members",
        "/api/goals",
        "/api/templates",
        "/api/achievements",
    ] {
        assert!(body["paths"][path].is_object(), "{} is not documented", path);
    }
    assert!(body["paths"]["/api/session"]["get"].is_object());
    assert!(body["paths"]["/api/teams"]["get"].is_object());
}

#[tokio::test]
async fn test_profile_preferences_and_achievements() {
    let app = setup_app().await;
    let token = token_for("carol");

    let response = app
        .clone()
        .oneshot(request(
            "PUT",
            "/api/profile",
            Some(&token),
            Some(serde_json::json!({
                "bio": "Night owl",
                "notification_preferences": { "email": false, "push": false },
                "timezone": "-03:00"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["profile"]["bio"], "Night owl");
    assert_eq!(body["profile"]["theme"], "default");
    assert_eq!(body["profile"]["notification_preferences"]["email"], false);
    assert_eq!(body["profile"]["timezone"], "-03:00");

    let response = app
        .clone()
        .oneshot(request(
            "PUT",
            "/api/profile",
            Some(&token),
            Some(serde_json::json!({ "timezone": "somewhere" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(request("GET", "/api/achievements", Some(&token), None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["achievements"], serde_json::json!([]));
}
