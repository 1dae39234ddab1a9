//! Team handlers. Creating and joining cost coins.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

use super::{CurrentUser, error_response};
use crate::infrastructure::AppState;
use crate::services::economy_service::{self, TeamForm};

#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TeamQuery {
    /// Case-insensitive name fragment
    pub search: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/teams",
    params(TeamQuery),
    responses(
        (status = 200, description = "Teams with member counts")
    ),
    security(("bearer" = []))
)]
pub async fn list_teams(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<TeamQuery>,
) -> impl IntoResponse {
    match economy_service::list_teams(&state, query.search).await {
        Ok(teams) => (StatusCode::OK, Json(json!({ "teams": teams }))).into_response(),
        Err(e) => error_response(e),
    }
}

#[utoipa::path(
    post,
    path = "/api/teams",
    request_body = TeamForm,
    responses(
        (status = 201, description = "Team created, caller is leader, 1000 coins debited"),
        (status = 402, description = "Not enough coins")
    ),
    security(("bearer" = []))
)]
pub async fn create_team(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(form): Json<TeamForm>,
) -> impl IntoResponse {
    match economy_service::create_team(&state, &user.id, form).await {
        Ok(done) => (
            StatusCode::CREATED,
            Json(json!({
                "team": done.value.value.team,
                "membership": done.value.value.leader,
                "fee": done.value.fee,
                "coins": done.value.coin_balance,
                "message": done.message,
                "stale": done.stale
            })),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}

#[utoipa::path(
    post,
    path = "/api/teams/{id}/join",
    params(("id" = String, Path, description = "Team id")),
    responses(
        (status = 201, description = "Joined as member, 500 coins debited"),
        (status = 402, description = "Not enough coins"),
        (status = 404, description = "Team not found"),
        (status = 409, description = "Already a member")
    ),
    security(("bearer" = []))
)]
pub async fn join_team(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match economy_service::join_team(&state, &user.id, &id).await {
        Ok(done) => (
            StatusCode::CREATED,
            Json(json!({
                "membership": done.value.value,
                "fee": done.value.fee,
                "coins": done.value.coin_balance,
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
    path = "/api/teams/{id}/members",
    params(("id" = String, Path, description = "Team id")),
    responses(
        (status = 200, description = "Members with their roles"),
        (status = 404, description = "Team not found")
    ),
    security(("bearer" = []))
)]
pub async fn list_members(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match economy_service::team_members(&state, &id).await {
        Ok(members) => (StatusCode::OK, Json(json!({ "members": members }))).into_response(),
        Err(e) => error_response(e),
    }
}
