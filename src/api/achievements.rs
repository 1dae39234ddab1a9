//! Achievement handlers

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

use super::{CurrentUser, error_response};
use crate::infrastructure::AppState;
use crate::services::achievement_service;

#[utoipa::path(
    get,
    path = "/api/achievements",
    responses(
        (status = 200, description = "The caller's achievements with progress_fraction (null when target is 0)")
    ),
    security(("bearer" = []))
)]
pub async fn list_achievements(
    State(state): State<AppState>,
    user: CurrentUser,
) -> impl IntoResponse {
    match achievement_service::list_achievements(&state, &user.id).await {
        Ok(achievements) => {
            (StatusCode::OK, Json(json!({ "achievements": achievements }))).into_response()
        }
        Err(e) => error_response(e),
    }
}
