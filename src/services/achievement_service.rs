//! Achievement Service - read-only view of a user's milestones.

use serde::Serialize;

use crate::domain::{Achievement, DomainError};
use crate::infrastructure::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct AchievementView {
    #[serde(flatten)]
    pub achievement: Achievement,
    /// Share of the target reached, in `0.0..=1.0`. `None` when the target
    /// is not positive.
    pub progress_fraction: Option<f64>,
    pub unlocked: bool,
}

/// `progress / target` clamped to `[0, 1]`; a missing progress counts as 0
pub fn progress_fraction(progress: Option<i64>, target: i64) -> Option<f64> {
    if target <= 0 {
        return None;
    }
    let done = progress.unwrap_or(0).clamp(0, target);
    Some(done as f64 / target as f64)
}

impl From<Achievement> for AchievementView {
    fn from(achievement: Achievement) -> Self {
        let progress_fraction = progress_fraction(achievement.progress, achievement.target);
        Self {
            unlocked: progress_fraction.is_some_and(|f| f >= 1.0),
            progress_fraction,
            achievement,
        }
    }
}

pub async fn list_achievements(
    state: &AppState,
    user_id: &str,
) -> Result<Vec<AchievementView>, DomainError> {
    let achievements = state.achievement_repo.find_by_owner(user_id).await?;
    Ok(achievements.into_iter().map(AchievementView::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraction_is_clamped() {
        assert_eq!(progress_fraction(Some(3), 10), Some(0.3));
        assert_eq!(progress_fraction(Some(12), 10), Some(1.0));
        assert_eq!(progress_fraction(Some(-4), 10), Some(0.0));
        assert_eq!(progress_fraction(None, 10), Some(0.0));
    }

    #[test]
    fn zero_target_has_no_fraction() {
        assert_eq!(progress_fraction(Some(5), 0), None);
        assert_eq!(progress_fraction(None, -1), None);
    }
}
