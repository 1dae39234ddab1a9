pub mod achievements;
pub mod habits;
pub mod health;
pub mod onboarding;
pub mod profile;
pub mod session;
pub mod stats;
pub mod teams;

use axum::{
    Json, Router, async_trait,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde_json::json;

use crate::domain::{DomainError, StaleView};
use crate::infrastructure::AppState;
use crate::infrastructure::auth::Claims;
use crate::services::profile_service::ensure_profile;

pub fn api_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Profile
        .route(
            "/profile",
            get(profile::get_profile).put(profile::update_profile),
        )
        .route("/leaderboard", get(profile::leaderboard))
        // Habits
        .route("/habits", get(habits::list_habits).post(habits::create_habit))
        .route(
            "/habits/:id",
            put(habits::edit_habit).delete(habits::delete_habit),
        )
        .route("/habits/:id/recovery", get(habits::get_recovery_cost))
        .route("/habits/:id/recover", post(habits::recover_streak))
        // Sessions
        .route("/habits/:id/session", post(session::start_session))
        .route(
            "/session",
            get(session::session_status).delete(session::cancel_session),
        )
        // Stats
        .route("/stats", get(stats::get_stats))
        // Teams
        .route("/teams", get(teams::list_teams).post(teams::create_team))
        .route("/teams/:id/join", post(teams::join_team))
        .route("/teams/:id/members", get(teams::list_members))
        // Onboarding
        .route(
            "/goals",
            get(onboarding::list_goals).post(onboarding::add_goal),
        )
        .route("/templates", get(onboarding::list_templates))
        .route("/onboarding", post(onboarding::complete_onboarding))
        // Achievements
        .route("/achievements", get(achievements::list_achievements))
        .with_state(state)
}

/// The signed-in user. Extracting it verifies the bearer token and
/// provisions the profile on first sight.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = Claims::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        ensure_profile(state, claims.user_id(), Some(&claims.default_username()))
            .await
            .map_err(error_response)?;

        Ok(CurrentUser { id: claims.sub })
    }
}

pub fn status_for(error: &DomainError) -> StatusCode {
    match error {
        DomainError::Validation(_) => StatusCode::BAD_REQUEST,
        DomainError::Unauthenticated => StatusCode::UNAUTHORIZED,
        DomainError::Forbidden(_) => StatusCode::FORBIDDEN,
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::InsufficientCoins { .. } => StatusCode::PAYMENT_REQUIRED,
        DomainError::SessionAlreadyActive { .. }
        | DomainError::NoActiveSession
        | DomainError::Precondition(_) => StatusCode::CONFLICT,
        DomainError::PartiallyApplied(_) => StatusCode::MULTI_STATUS,
        DomainError::Database(_) | DomainError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Map a domain error to `{"error": ...}` with its status code
pub fn error_response(error: DomainError) -> Response {
    let status = status_for(&error);
    if status.is_server_error() {
        tracing::error!("Request failed: {}", error);
    }

    let mut body = json!({ "error": error.to_string() });
    match &error {
        DomainError::InsufficientCoins { required, .. } => {
            body["required"] = json!(required);
            body["shortfall"] = json!(error.shortfall());
        }
        DomainError::PartiallyApplied(_) => {
            // The completion part was written
            body["stale"] = json!([
                StaleView::Habits,
                StaleView::Stats,
                StaleView::Session,
                StaleView::Leaderboard
            ]);
        }
        _ => {}
    }

    (status, Json(body)).into_response()
}
