use crate::api;
use crate::services::economy_service::TeamForm;
use crate::services::habit_service::HabitForm;
use crate::services::onboarding_service::{GoalForm, OnboardingForm};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    paths(
        api::health::health_check,
        api::profile::get_profile,
        api::profile::update_profile,
        api::profile::leaderboard,
        api::habits::list_habits,
        api::habits::create_habit,
        api::habits::edit_habit,
        api::habits::delete_habit,
        api::habits::get_recovery_cost,
        api::habits::recover_streak,
        api::session::start_session,
        api::session::session_status,
        api::session::cancel_session,
        api::stats::get_stats,
        api::teams::list_teams,
        api::teams::create_team,
        api::teams::join_team,
        api::teams::list_members,
        api::onboarding::list_goals,
        api::onboarding::add_goal,
        api::onboarding::list_templates,
        api::onboarding::complete_onboarding,
        api::achievements::list_achievements,
    ),
    components(schemas(HabitForm, TeamForm, GoalForm, OnboardingForm)),
    modifiers(&BearerAuth),
    tags(
        (name = "habitquest", description = "HabitQuest API")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
