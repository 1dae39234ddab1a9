//! Habit Service - create, edit, delete and list habits

use chrono::NaiveTime;
use serde::Deserialize;

use super::Mutation;
use crate::domain::{DomainError, Frequency, Habit, HabitFields, NewHabit, StaleView};
use crate::infrastructure::AppState;

pub const DEFAULT_COIN_REWARD: i64 = 10;
pub const DEFAULT_RECOVERY_COST: i64 = 50;
pub const DEFAULT_DURATION_MINUTES: i32 = 30;
pub const DEFAULT_PRIORITY: i32 = 1;

/// Habit fields as submitted by a client.
///
/// On edit, an absent field keeps the stored value and an empty string
/// clears an optional one.
#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct HabitForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    /// 1 (highest) to 5
    pub priority: Option<i32>,
    /// `HH:MM` or `HH:MM:SS`
    pub scheduled_time: Option<String>,
    pub duration_minutes: Option<i32>,
    /// `daily`, `weekly` or `monthly`
    pub frequency: Option<String>,
    pub theme: Option<String>,
}

fn optional_text(submitted: Option<String>, stored: Option<&Option<String>>) -> Option<String> {
    match submitted {
        Some(value) => Some(value.trim().to_string()).filter(|v| !v.is_empty()),
        None => stored.cloned().flatten(),
    }
}

fn validate_scheduled_time(raw: &str) -> Result<(), DomainError> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map(|_| ())
        .map_err(|_| {
            DomainError::Validation(format!(
                "Invalid scheduled time '{}'. Use HH:MM or HH:MM:SS",
                raw
            ))
        })
}

/// Turn a submitted form into validated fields, falling back to `base`
/// (the stored habit) for absent fields.
pub fn resolve_fields(
    form: HabitForm,
    base: Option<&Habit>,
    goal_categories: &[String],
) -> Result<HabitFields, DomainError> {
    let title = match form.title {
        Some(t) => t.trim().to_string(),
        None => base.map(|h| h.title.clone()).unwrap_or_default(),
    };
    if title.is_empty() {
        return Err(DomainError::Validation("Title is required".to_string()));
    }

    let category = optional_text(form.category.clone(), base.map(|h| &h.category));
    if form.category.is_some()
        && let Some(cat) = &category
        && !goal_categories.iter().any(|g| g == cat)
    {
        return Err(DomainError::Validation(format!(
            "Category '{}' is not one of your goals",
            cat
        )));
    }

    let priority = form
        .priority
        .or(base.map(|h| h.priority))
        .unwrap_or(DEFAULT_PRIORITY);
    if !(1..=5).contains(&priority) {
        return Err(DomainError::Validation(
            "Priority must be between 1 and 5".to_string(),
        ));
    }

    let scheduled_time = optional_text(form.scheduled_time, base.map(|h| &h.scheduled_time));
    if let Some(time) = &scheduled_time {
        validate_scheduled_time(time)?;
    }

    let duration_minutes = form
        .duration_minutes
        .or(base.map(|h| h.duration_minutes))
        .unwrap_or(DEFAULT_DURATION_MINUTES);
    if duration_minutes <= 0 {
        return Err(DomainError::Validation(
            "Duration must be greater than zero".to_string(),
        ));
    }

    let frequency = match form.frequency.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => raw.parse::<Frequency>()?,
        _ => base.map(|h| h.frequency).unwrap_or_default(),
    };

    Ok(HabitFields {
        title,
        description: optional_text(form.description, base.map(|h| &h.description)),
        category,
        priority,
        scheduled_time,
        duration_minutes,
        frequency,
        theme: optional_text(form.theme, base.map(|h| &h.theme)),
    })
}

async fn goal_categories(state: &AppState, user_id: &str) -> Result<Vec<String>, DomainError> {
    Ok(state
        .goal_repo
        .find_by_owner(user_id)
        .await?
        .into_iter()
        .map(|g| g.category)
        .collect())
}

/// Load a habit and check it belongs to `user_id`
pub(crate) async fn owned_habit(
    state: &AppState,
    user_id: &str,
    habit_id: &str,
) -> Result<Habit, DomainError> {
    let habit = state
        .habit_repo
        .find_by_id(habit_id)
        .await?
        .ok_or(DomainError::NotFound("Habit"))?;
    if habit.user_id != user_id {
        return Err(DomainError::Forbidden(
            "You can only manage your own habits".to_string(),
        ));
    }
    Ok(habit)
}

pub async fn list_habits(state: &AppState, user_id: &str) -> Result<Vec<Habit>, DomainError> {
    state.habit_repo.find_by_owner(user_id).await
}

pub async fn create_habit(
    state: &AppState,
    user_id: &str,
    form: HabitForm,
) -> Result<Mutation<Habit>, DomainError> {
    let categories = if form.category.as_deref().is_some_and(|c| !c.trim().is_empty()) {
        goal_categories(state, user_id).await?
    } else {
        Vec::new()
    };
    let fields = resolve_fields(form, None, &categories)?;

    let habit = state
        .habit_repo
        .create(NewHabit {
            user_id: user_id.to_string(),
            fields,
            coin_reward: DEFAULT_COIN_REWARD,
            streak_recovery_cost: DEFAULT_RECOVERY_COST,
        })
        .await?;

    tracing::info!("User {} created habit {} ({})", user_id, habit.id, habit.title);
    Ok(Mutation::new(
        habit,
        "Habit created",
        &[StaleView::Habits, StaleView::Stats],
    ))
}

/// Edit a habit. A changed duration counts as a streak break.
pub async fn edit_habit(
    state: &AppState,
    user_id: &str,
    habit_id: &str,
    form: HabitForm,
) -> Result<Mutation<Habit>, DomainError> {
    let current = owned_habit(state, user_id, habit_id).await?;
    let categories = if form.category.is_some() {
        goal_categories(state, user_id).await?
    } else {
        Vec::new()
    };
    let fields = resolve_fields(form, Some(&current), &categories)?;
    let break_streak = fields.duration_minutes != current.duration_minutes;

    let habit = state
        .habit_repo
        .update(&current.id, fields, break_streak)
        .await?;

    if break_streak {
        tracing::info!(
            "Habit {} duration changed {} -> {} min, streak reset (breaks: {})",
            habit.id,
            current.duration_minutes,
            habit.duration_minutes,
            habit.streak_breaks_count
        );
        Ok(Mutation::new(
            habit,
            "Habit updated. Changing the duration reset your streak",
            &[StaleView::Habits, StaleView::Stats, StaleView::Leaderboard],
        ))
    } else {
        Ok(Mutation::new(
            habit,
            "Habit updated",
            &[StaleView::Habits, StaleView::Stats],
        ))
    }
}

/// Delete a habit. Deleting an already missing habit succeeds.
pub async fn delete_habit(
    state: &AppState,
    user_id: &str,
    habit_id: &str,
) -> Result<Mutation<()>, DomainError> {
    match owned_habit(state, user_id, habit_id).await {
        Ok(_) => {}
        Err(DomainError::NotFound(_)) => {
            return Ok(Mutation::new((), "Habit already deleted", &[StaleView::Habits]));
        }
        Err(e) => return Err(e),
    }

    if state.sessions.cancel_for_habit(user_id, habit_id) {
        tracing::info!("Cancelled active session of deleted habit {}", habit_id);
    }
    state.habit_repo.delete(habit_id, user_id).await?;

    tracing::info!("User {} deleted habit {}", user_id, habit_id);
    Ok(Mutation::new(
        (),
        "Habit deleted",
        &[
            StaleView::Habits,
            StaleView::Stats,
            StaleView::Session,
            StaleView::Leaderboard,
        ],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(title: &str) -> HabitForm {
        HabitForm {
            title: Some(title.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let fields = resolve_fields(form("  Stretch "), None, &[]).unwrap();
        assert_eq!(fields.title, "Stretch");
        assert_eq!(fields.priority, 1);
        assert_eq!(fields.duration_minutes, 30);
        assert_eq!(fields.frequency, Frequency::Daily);
        assert_eq!(fields.category, None);
    }

    #[test]
    fn blank_title_is_rejected() {
        assert!(matches!(
            resolve_fields(form("   "), None, &[]),
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            resolve_fields(HabitForm::default(), None, &[]),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn category_must_be_a_goal() {
        let mut f = form("Run");
        f.category = Some("fitness".to_string());
        assert!(resolve_fields(f.clone(), None, &["learning".to_string()]).is_err());
        let fields = resolve_fields(f, None, &["fitness".to_string()]).unwrap();
        assert_eq!(fields.category.as_deref(), Some("fitness"));
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut f = form("Run");
        f.priority = Some(6);
        assert!(resolve_fields(f, None, &[]).is_err());

        let mut f = form("Run");
        f.duration_minutes = Some(0);
        assert!(resolve_fields(f, None, &[]).is_err());

        let mut f = form("Run");
        f.scheduled_time = Some("25:00".to_string());
        assert!(resolve_fields(f, None, &[]).is_err());

        let mut f = form("Run");
        f.frequency = Some("hourly".to_string());
        assert!(resolve_fields(f, None, &[]).is_err());
    }

    #[test]
    fn accepts_both_time_formats() {
        for time in ["07:30", "07:30:15"] {
            let mut f = form("Run");
            f.scheduled_time = Some(time.to_string());
            assert_eq!(
                resolve_fields(f, None, &[]).unwrap().scheduled_time.as_deref(),
                Some(time)
            );
        }
    }
}
