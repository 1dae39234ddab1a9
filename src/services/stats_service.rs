//! Stats Service - derived, read-only figures for the dashboard.

use chrono::{DateTime, FixedOffset, Local, Offset, Utc};
use serde::Serialize;

use super::economy_service::{LevelProgress, level_progress};
use super::profile_service::ensure_profile;
use crate::domain::{DomainError, Habit, parse_utc_offset};
use crate::infrastructure::AppState;

/// Habit figures. `completion_percentage` is `None` without any habit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HabitTotals {
    pub completed_today: usize,
    pub total_habits: usize,
    pub completion_percentage: Option<f64>,
    pub highest_streak: i32,
}

impl HabitTotals {
    /// Percentage for display: one decimal, or "N/A" without data
    pub fn completion_label(&self) -> String {
        match self.completion_percentage {
            Some(pct) => format!("{:.1}%", pct),
            None => "N/A".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    #[serde(flatten)]
    pub habits: HabitTotals,
    pub completion_label: String,
    pub coins: i64,
    pub progress: LevelProgress,
}

/// Aggregate `habits` as seen on `now`'s calendar day in `offset`
pub fn aggregate(habits: &[Habit], now: DateTime<Utc>, offset: FixedOffset) -> HabitTotals {
    let today = now.with_timezone(&offset).date_naive();

    let completed_today = habits
        .iter()
        .filter(|h| {
            h.last_completion_date
                .is_some_and(|at| at.with_timezone(&offset).date_naive() == today)
        })
        .count();
    let total_habits = habits.len();

    let completion_percentage = if total_habits == 0 {
        None
    } else {
        Some(completed_today as f64 / total_habits as f64 * 100.0)
    };

    HabitTotals {
        completed_today,
        total_habits,
        completion_percentage,
        highest_streak: habits.iter().map(|h| h.streak).max().unwrap_or(0),
    }
}

/// Offset used to find the caller's "today", first match wins:
/// the request's `tz_offset_minutes` (east of UTC), the profile's stored
/// time zone, then the server's local offset.
pub fn resolve_offset(
    tz_offset_minutes: Option<i32>,
    profile_timezone: Option<&str>,
) -> Result<FixedOffset, DomainError> {
    if let Some(minutes) = tz_offset_minutes {
        return minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                DomainError::Validation(format!("Invalid time zone offset: {} minutes", minutes))
            });
    }

    if let Some(timezone) = profile_timezone {
        match parse_utc_offset(timezone) {
            Ok(offset) => return Ok(offset),
            Err(e) => tracing::warn!("Ignoring stored time zone: {}", e),
        }
    }

    Ok(Local::now().offset().fix())
}

pub async fn get_aggregate_stats(
    state: &AppState,
    user_id: &str,
    tz_offset_minutes: Option<i32>,
) -> Result<DashboardStats, DomainError> {
    let profile = ensure_profile(state, user_id, None).await?;
    let offset = resolve_offset(tz_offset_minutes, profile.timezone.as_deref())?;
    let habits = state.habit_repo.find_by_owner(user_id).await?;

    let totals = aggregate(&habits, Utc::now(), offset);
    Ok(DashboardStats {
        completion_label: totals.completion_label(),
        habits: totals,
        coins: profile.coins,
        progress: level_progress(profile.xp, profile.level),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Frequency;
    use chrono::TimeZone;

    fn habit(streak: i32, last: Option<DateTime<Utc>>) -> Habit {
        Habit {
            id: format!("h{}", streak),
            user_id: "u1".to_string(),
            title: "Habit".to_string(),
            description: None,
            category: None,
            priority: 1,
            scheduled_time: None,
            duration_minutes: 30,
            frequency: Frequency::Daily,
            streak,
            last_completion_date: last,
            coin_reward: 10,
            streak_recovery_cost: 50,
            streak_breaks_count: 0,
            total_completions: streak,
            theme: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn no_habits_means_no_percentage() {
        let totals = aggregate(&[], Utc::now(), FixedOffset::east_opt(0).unwrap());
        assert_eq!(totals.total_habits, 0);
        assert_eq!(totals.completion_percentage, None);
        assert_eq!(totals.highest_streak, 0);
        assert_eq!(totals.completion_label(), "N/A");
    }

    #[test]
    fn counts_completions_on_todays_date() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let habits = vec![
            habit(4, Some(Utc.with_ymd_and_hms(2024, 3, 10, 8, 0, 0).unwrap())),
            habit(7, Some(Utc.with_ymd_and_hms(2024, 3, 9, 8, 0, 0).unwrap())),
            habit(0, None),
        ];

        let totals = aggregate(&habits, now, FixedOffset::east_opt(0).unwrap());
        assert_eq!(totals.completed_today, 1);
        assert_eq!(totals.total_habits, 3);
        assert_eq!(totals.highest_streak, 7);
        assert_eq!(totals.completion_label(), "33.3%");
    }

    #[test]
    fn today_follows_the_callers_time_zone() {
        // 23:30 UTC on the 9th is already the 10th in UTC+2
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 6, 0, 0).unwrap();
        let habits = vec![habit(
            1,
            Some(Utc.with_ymd_and_hms(2024, 3, 9, 23, 30, 0).unwrap()),
        )];

        let utc = aggregate(&habits, now, FixedOffset::east_opt(0).unwrap());
        assert_eq!(utc.completed_today, 0);

        let plus_two = aggregate(&habits, now, FixedOffset::east_opt(2 * 3600).unwrap());
        assert_eq!(plus_two.completed_today, 1);
        assert_eq!(plus_two.completion_percentage, Some(100.0));
    }

    #[test]
    fn rejects_impossible_offsets() {
        assert!(resolve_offset(Some(120), None).is_ok());
        assert!(resolve_offset(Some(-300), None).is_ok());
        assert!(resolve_offset(Some(24 * 60), None).is_err());
    }

    #[test]
    fn request_offset_beats_stored_time_zone() {
        let east = |secs| FixedOffset::east_opt(secs).unwrap();
        assert_eq!(resolve_offset(Some(60), Some("+05:00")).unwrap(), east(3600));
        assert_eq!(resolve_offset(None, Some("+05:00")).unwrap(), east(5 * 3600));
        // A stored value that no longer parses falls through to the server zone
        assert_eq!(
            resolve_offset(None, Some("Mars/Olympus")).unwrap(),
            Local::now().offset().fix()
        );
    }
}
