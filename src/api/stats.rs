use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

use super::{CurrentUser, error_response};
use crate::infrastructure::AppState;
use crate::services::stats_service;

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StatsQuery {
    /// Minutes east of UTC of the caller's time zone
    pub tz_offset_minutes: Option<i32>,
}

#[utoipa::path(
    get,
    path = "/api/stats",
    params(StatsQuery),
    responses(
        (status = 200, description = "Dashboard figures; completion_percentage is null without habits")
    ),
    security(("bearer" = []))
)]
pub async fn get_stats(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<StatsQuery>,
) -> impl IntoResponse {
    match stats_service::get_aggregate_stats(&state, &user.id, query.tz_offset_minutes).await {
        Ok(stats) => (StatusCode::OK, Json(json!({ "stats": stats }))).into_response(),
        Err(e) => error_response(e),
    }
}
