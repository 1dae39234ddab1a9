//! Habit handlers: CRUD and streak recovery

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use super::{CurrentUser, error_response};
use crate::infrastructure::AppState;
use crate::services::economy_service;
use crate::services::habit_service::{self, HabitForm};

#[utoipa::path(
    get,
    path = "/api/habits",
    responses(
        (status = 200, description = "The caller's habits, by priority then title"),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer" = []))
)]
pub async fn list_habits(State(state): State<AppState>, user: CurrentUser) -> impl IntoResponse {
    match habit_service::list_habits(&state, &user.id).await {
        Ok(habits) => (
            StatusCode::OK,
            Json(json!({ "habits": habits, "total": habits.len() })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

#[utoipa::path(
    post,
    path = "/api/habits",
    request_body = HabitForm,
    responses(
        (status = 201, description = "Habit created"),
        (status = 400, description = "Invalid habit fields")
    ),
    security(("bearer" = []))
)]
pub async fn create_habit(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(form): Json<HabitForm>,
) -> impl IntoResponse {
    match habit_service::create_habit(&state, &user.id, form).await {
        Ok(done) => (
            StatusCode::CREATED,
            Json(json!({
                "habit": done.value,
                "message": done.message,
                "stale": done.stale
            })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

#[utoipa::path(
    put,
    path = "/api/habits/{id}",
    request_body = HabitForm,
    params(("id" = String, Path, description = "Habit id")),
    responses(
        (status = 200, description = "Habit updated; a changed duration resets the streak"),
        (status = 403, description = "Habit belongs to another user"),
        (status = 404, description = "Habit not found")
    ),
    security(("bearer" = []))
)]
pub async fn edit_habit(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(form): Json<HabitForm>,
) -> impl IntoResponse {
    match habit_service::edit_habit(&state, &user.id, &id, form).await {
        Ok(done) => (
            StatusCode::OK,
            Json(json!({
                "habit": done.value,
                "message": done.message,
                "stale": done.stale
            })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

#[utoipa::path(
    delete,
    path = "/api/habits/{id}",
    params(("id" = String, Path, description = "Habit id")),
    responses(
        (status = 200, description = "Habit deleted"),
        (status = 403, description = "Habit belongs to another user")
    ),
    security(("bearer" = []))
)]
pub async fn delete_habit(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match habit_service::delete_habit(&state, &user.id, &id).await {
        Ok(done) => (
            StatusCode::OK,
            Json(json!({ "message": done.message, "stale": done.stale })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

#[utoipa::path(
    get,
    path = "/api/habits/{id}/recovery",
    params(("id" = String, Path, description = "Habit id")),
    responses(
        (status = 200, description = "Current recovery price and availability")
    ),
    security(("bearer" = []))
)]
pub async fn get_recovery_cost(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match economy_service::get_recovery_cost(&state, &user.id, &id).await {
        Ok(quote) => (StatusCode::OK, Json(json!({ "recovery": quote }))).into_response(),
        Err(e) => error_response(e),
    }
}

#[utoipa::path(
    post,
    path = "/api/habits/{id}/recover",
    params(("id" = String, Path, description = "Habit id")),
    responses(
        (status = 200, description = "Streak recovered, coins debited"),
        (status = 402, description = "Not enough coins"),
        (status = 409, description = "Streak is not broken")
    ),
    security(("bearer" = []))
)]
pub async fn recover_streak(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match economy_service::recover_streak(&state, &user.id, &id).await {
        Ok(done) => (
            StatusCode::OK,
            Json(json!({
                "habit": done.value.habit,
                "cost": done.value.cost,
                "coins": done.value.coin_balance,
                "message": done.message,
                "stale": done.stale
            })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}
