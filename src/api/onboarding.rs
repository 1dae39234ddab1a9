//! Goals, template catalog and first-run onboarding

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

use super::{CurrentUser, error_response};
use crate::infrastructure::AppState;
use crate::services::onboarding_service::{self, GoalForm, OnboardingForm};

#[utoipa::path(
    get,
    path = "/api/goals",
    responses((status = 200, description = "The caller's goals")),
    security(("bearer" = []))
)]
pub async fn list_goals(State(state): State<AppState>, user: CurrentUser) -> impl IntoResponse {
    match onboarding_service::list_goals(&state, &user.id).await {
        Ok(goals) => (StatusCode::OK, Json(json!({ "goals": goals }))).into_response(),
        Err(e) => error_response(e),
    }
}

#[utoipa::path(
    post,
    path = "/api/goals",
    request_body = GoalForm,
    responses(
        (status = 201, description = "Goal added"),
        (status = 400, description = "Missing category")
    ),
    security(("bearer" = []))
)]
pub async fn add_goal(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(form): Json<GoalForm>,
) -> impl IntoResponse {
    match onboarding_service::add_goal(&state, &user.id, form).await {
        Ok(done) => (
            StatusCode::CREATED,
            Json(json!({
                "goal": done.value,
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
    path = "/api/templates",
    responses((status = 200, description = "Habit template catalog")),
    security(("bearer" = []))
)]
pub async fn list_templates(State(state): State<AppState>, _user: CurrentUser) -> impl IntoResponse {
    match onboarding_service::list_templates(&state).await {
        Ok(templates) => (StatusCode::OK, Json(json!({ "templates": templates }))).into_response(),
        Err(e) => error_response(e),
    }
}

#[utoipa::path(
    post,
    path = "/api/onboarding",
    request_body = OnboardingForm,
    responses(
        (status = 201, description = "Goal recorded, optional first habit created"),
        (status = 404, description = "Unknown template")
    ),
    security(("bearer" = []))
)]
pub async fn complete_onboarding(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(form): Json<OnboardingForm>,
) -> impl IntoResponse {
    match onboarding_service::complete_onboarding(&state, &user.id, form).await {
        Ok(done) => (
            StatusCode::CREATED,
            Json(json!({
                "goal": done.value.goal,
                "habit": done.value.habit,
                "message": done.message,
                "stale": done.stale
            })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}
