//! Profile and leaderboard handlers

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

use super::{CurrentUser, error_response};
use crate::domain::ProfileUpdate;
use crate::infrastructure::AppState;
use crate::services::economy_service::level_progress;
use crate::services::profile_service;

#[utoipa::path(
    get,
    path = "/api/profile",
    responses(
        (status = 200, description = "The caller's profile with level progress"),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer" = []))
)]
pub async fn get_profile(State(state): State<AppState>, user: CurrentUser) -> impl IntoResponse {
    match profile_service::ensure_profile(&state, &user.id, None).await {
        Ok(profile) => {
            let progress = level_progress(profile.xp, profile.level);
            (
                StatusCode::OK,
                Json(json!({ "profile": profile, "progress": progress })),
            )
                .into_response()
        }
        Err(e) => error_response(e),
    }
}

#[utoipa::path(
    put,
    path = "/api/profile",
    responses(
        (status = 200, description = "Profile updated. Accepts username, display_name, avatar_url, bio, theme, notification_preferences {email, push} and timezone (UTC offset such as +02:00)"),
        (status = 400, description = "Empty username, display name or theme, or an unusable time zone")
    ),
    security(("bearer" = []))
)]
pub async fn update_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<ProfileUpdate>,
) -> impl IntoResponse {
    match profile_service::update_profile(&state, &user.id, payload).await {
        Ok(done) => (
            StatusCode::OK,
            Json(json!({
                "profile": done.value,
                "message": done.message,
                "stale": done.stale
            })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

#[utoipa::path(
    get,
    path = "/api/leaderboard",
    responses(
        (status = 200, description = "Top 100 profiles by xp with their highest streak")
    ),
    security(("bearer" = []))
)]
pub async fn leaderboard(State(state): State<AppState>, _user: CurrentUser) -> impl IntoResponse {
    match profile_service::leaderboard(&state).await {
        Ok(entries) => (StatusCode::OK, Json(json!({ "leaderboard": entries }))).into_response(),
        Err(e) => error_response(e),
    }
}
