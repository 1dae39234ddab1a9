//! Onboarding Service - goals, the template catalog and first-run setup

use serde::{Deserialize, Serialize};

use super::Mutation;
use super::habit_service::{
    DEFAULT_COIN_REWARD, DEFAULT_DURATION_MINUTES, DEFAULT_PRIORITY, DEFAULT_RECOVERY_COST,
};
use super::profile_service::ensure_profile;
use crate::domain::{
    DomainError, Habit, HabitFields, HabitTemplate, NewGoal, NewHabit, ProfileUpdate, StaleView,
    UserGoal,
};
use crate::infrastructure::AppState;

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct GoalForm {
    pub category: Option<String>,
    pub description: Option<String>,
    pub target: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct OnboardingForm {
    pub display_name: Option<String>,
    #[serde(flatten)]
    pub goal: GoalForm,
    /// Catalog entry to turn into a first habit
    pub template_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OnboardingResult {
    pub goal: UserGoal,
    pub habit: Option<Habit>,
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn validate_goal(form: GoalForm) -> Result<NewGoal, DomainError> {
    let category = clean(form.category)
        .ok_or_else(|| DomainError::Validation("Goal category is required".to_string()))?;
    Ok(NewGoal {
        category,
        description: clean(form.description),
        target: clean(form.target),
    })
}

pub async fn list_goals(state: &AppState, user_id: &str) -> Result<Vec<UserGoal>, DomainError> {
    state.goal_repo.find_by_owner(user_id).await
}

pub async fn add_goal(
    state: &AppState,
    user_id: &str,
    form: GoalForm,
) -> Result<Mutation<UserGoal>, DomainError> {
    let input = validate_goal(form)?;
    let goal = state.goal_repo.create(user_id, input).await?;
    tracing::info!("User {} added goal '{}'", user_id, goal.category);
    Ok(Mutation::new(goal, "Goal added", &[StaleView::Goals]))
}

pub async fn list_templates(state: &AppState) -> Result<Vec<HabitTemplate>, DomainError> {
    state.template_repo.find_all().await
}

/// First-run setup: optional display name, a goal, and optionally a habit
/// seeded from a catalog template under the goal's category
pub async fn complete_onboarding(
    state: &AppState,
    user_id: &str,
    form: OnboardingForm,
) -> Result<Mutation<OnboardingResult>, DomainError> {
    let input = validate_goal(form.goal)?;
    let display_name = clean(form.display_name);

    // Resolve the template before writing anything
    let template = match clean(form.template_id) {
        Some(id) => Some(
            state
                .template_repo
                .find_by_id(&id)
                .await?
                .ok_or(DomainError::NotFound("Template"))?,
        ),
        None => None,
    };

    ensure_profile(state, user_id, None).await?;
    if display_name.is_some() {
        state
            .profile_repo
            .update(
                user_id,
                ProfileUpdate {
                    display_name,
                    ..Default::default()
                },
            )
            .await?;
    }

    let goal = state.goal_repo.create(user_id, input).await?;

    let habit = match template {
        Some(template) => Some(
            state
                .habit_repo
                .create(NewHabit {
                    user_id: user_id.to_string(),
                    fields: HabitFields {
                        title: template.title,
                        description: template.description,
                        category: Some(goal.category.clone()),
                        priority: DEFAULT_PRIORITY,
                        scheduled_time: None,
                        duration_minutes: template
                            .duration_minutes
                            .filter(|d| *d > 0)
                            .unwrap_or(DEFAULT_DURATION_MINUTES),
                        frequency: template.frequency,
                        theme: template.theme,
                    },
                    coin_reward: DEFAULT_COIN_REWARD,
                    streak_recovery_cost: DEFAULT_RECOVERY_COST,
                })
                .await?,
        ),
        None => None,
    };

    tracing::info!(
        "User {} finished onboarding (goal '{}', habit: {})",
        user_id,
        goal.category,
        habit.as_ref().map(|h| h.id.as_str()).unwrap_or("none")
    );
    Ok(Mutation::new(
        OnboardingResult { goal, habit },
        "Welcome aboard!",
        &[
            StaleView::Profile,
            StaleView::Goals,
            StaleView::Habits,
            StaleView::Stats,
        ],
    ))
}
