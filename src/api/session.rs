//! Timed session handlers

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use super::{CurrentUser, error_response};
use crate::infrastructure::AppState;
use crate::services::session_service;

#[utoipa::path(
    post,
    path = "/api/habits/{id}/session",
    params(("id" = String, Path, description = "Habit id")),
    responses(
        (status = 201, description = "Session started"),
        (status = 409, description = "A session is already active")
    ),
    security(("bearer" = []))
)]
pub async fn start_session(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match session_service::start_session(&state, &user.id, &id).await {
        Ok(done) => (
            StatusCode::CREATED,
            Json(json!({
                "session": done.value,
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
    path = "/api/session",
    responses(
        (status = 200, description = "The active session, or null")
    ),
    security(("bearer" = []))
)]
pub async fn session_status(State(state): State<AppState>, user: CurrentUser) -> impl IntoResponse {
    let session = session_service::session_status(&state, &user.id);
    (StatusCode::OK, Json(json!({ "session": session })))
}

#[utoipa::path(
    delete,
    path = "/api/session",
    responses(
        (status = 200, description = "Session cancelled, nothing rewarded"),
        (status = 409, description = "No session is active")
    ),
    security(("bearer" = []))
)]
pub async fn cancel_session(State(state): State<AppState>, user: CurrentUser) -> impl IntoResponse {
    match session_service::cancel_session(&state, &user.id) {
        Ok(done) => (
            StatusCode::OK,
            Json(json!({
                "session": done.value,
                "message": done.message,
                "stale": done.stale
            })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}
