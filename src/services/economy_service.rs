//! Economy Service - coin prices and the actions that spend coins.
//!
//! Every paid action checks the balance first for a precise message, then
//! writes inside one store transaction whose debit is conditional on the
//! balance, so a concurrent spend can never take coins below zero.

use serde::{Deserialize, Serialize};

use super::Mutation;
use super::habit_service::owned_habit;
use crate::domain::{
    DomainError, FoundedTeam, Habit, NewTeam, StaleView, Team, TeamMember, TeamRole,
};
use crate::infrastructure::AppState;

pub const TEAM_CREATION_FEE: i64 = 1000;
pub const TEAM_JOIN_FEE: i64 = 500;
pub const XP_PER_LEVEL: i64 = 1000;

/// `base × 2^breaks`. Overflow is a validation error.
pub fn recovery_cost(base: i64, breaks: i32) -> Result<i64, DomainError> {
    let overflow = || {
        DomainError::Validation(
            "Streak recovery is no longer available for this habit: the cost is too large"
                .to_string(),
        )
    };
    if base < 0 || breaks < 0 {
        return Err(DomainError::Validation(
            "Recovery cost inputs cannot be negative".to_string(),
        ));
    }
    let multiplier = 2i64.checked_pow(breaks as u32).ok_or_else(overflow)?;
    base.checked_mul(multiplier).ok_or_else(overflow)
}

/// Progress through the current level. The stored level is shown as is.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelProgress {
    pub level: i32,
    pub xp: i64,
    pub xp_into_level: i64,
    pub xp_per_level: i64,
    /// 0.0 up to (excluding) 1.0
    pub fraction: f64,
}

pub fn level_progress(xp: i64, level: i32) -> LevelProgress {
    let xp_into_level = xp.max(0) % XP_PER_LEVEL;
    LevelProgress {
        level,
        xp,
        xp_into_level,
        xp_per_level: XP_PER_LEVEL,
        fraction: xp_into_level as f64 / XP_PER_LEVEL as f64,
    }
}

/// Price of recovering one habit's streak right now
#[derive(Debug, Clone, Serialize)]
pub struct RecoveryQuote {
    pub habit_id: String,
    pub cost: i64,
    pub streak_breaks_count: i32,
    /// Whether the habit is in a recoverable state (zero streak after at
    /// least one completion)
    pub available: bool,
    pub affordable: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecoveryReceipt {
    pub habit: Habit,
    pub cost: i64,
    pub coin_balance: i64,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct TeamForm {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamReceipt<T> {
    #[serde(flatten)]
    pub value: T,
    pub fee: i64,
    pub coin_balance: i64,
}

fn is_recoverable(habit: &Habit) -> bool {
    habit.streak == 0 && habit.last_completion_date.is_some()
}

/// Fail with the exact shortfall when the caller cannot pay `price`.
/// A caller without a profile has 0 coins.
async fn require_balance(state: &AppState, user_id: &str, price: i64) -> Result<(), DomainError> {
    let available = match state.profile_repo.find_by_id(user_id).await? {
        Some(profile) => profile.coins,
        None => 0,
    };
    if available < price {
        let err = DomainError::InsufficientCoins {
            required: price,
            available,
        };
        tracing::warn!("User {} rejected: {}", user_id, err);
        return Err(err);
    }
    Ok(())
}

pub async fn get_recovery_cost(
    state: &AppState,
    user_id: &str,
    habit_id: &str,
) -> Result<RecoveryQuote, DomainError> {
    let habit = owned_habit(state, user_id, habit_id).await?;
    let cost = recovery_cost(habit.streak_recovery_cost, habit.streak_breaks_count)?;
    let coins = state
        .profile_repo
        .find_by_id(user_id)
        .await?
        .map(|p| p.coins)
        .unwrap_or(0);

    Ok(RecoveryQuote {
        available: is_recoverable(&habit),
        affordable: coins >= cost,
        habit_id: habit.id,
        cost,
        streak_breaks_count: habit.streak_breaks_count,
    })
}

/// Pay to acknowledge a broken streak: breaks + 1 and coins - cost, as one
/// unit. The streak itself stays at 0.
pub async fn recover_streak(
    state: &AppState,
    user_id: &str,
    habit_id: &str,
) -> Result<Mutation<RecoveryReceipt>, DomainError> {
    let habit = owned_habit(state, user_id, habit_id).await?;

    if habit.streak != 0 {
        return Err(DomainError::Precondition(
            "This habit's streak is not broken".to_string(),
        ));
    }
    if habit.last_completion_date.is_none() {
        return Err(DomainError::Precondition(
            "This habit has never been completed, so there is no streak to recover".to_string(),
        ));
    }

    let cost = recovery_cost(habit.streak_recovery_cost, habit.streak_breaks_count)?;
    require_balance(state, user_id, cost).await?;

    let charged = state
        .habit_repo
        .record_recovery(&habit.id, user_id, habit.streak_breaks_count, cost)
        .await?;

    tracing::info!(
        "User {} recovered streak of habit {} for {} coins (breaks: {}, balance: {})",
        user_id,
        habit.id,
        cost,
        charged.value.streak_breaks_count,
        charged.profile.coins
    );
    Ok(Mutation::new(
        RecoveryReceipt {
            habit: charged.value,
            cost,
            coin_balance: charged.profile.coins,
        },
        format!("Streak recovered for {} coins", cost),
        &[StaleView::Profile, StaleView::Habits, StaleView::Stats],
    ))
}

pub async fn list_teams(
    state: &AppState,
    search: Option<String>,
) -> Result<Vec<Team>, DomainError> {
    state.team_repo.find_all(search).await
}

pub async fn team_members(
    state: &AppState,
    team_id: &str,
) -> Result<Vec<TeamMember>, DomainError> {
    if state.team_repo.find_by_id(team_id).await?.is_none() {
        return Err(DomainError::NotFound("Team"));
    }
    state.team_repo.members(team_id).await
}

/// Found a team for `TEAM_CREATION_FEE` coins; the caller becomes leader
pub async fn create_team(
    state: &AppState,
    user_id: &str,
    form: TeamForm,
) -> Result<Mutation<TeamReceipt<FoundedTeam>>, DomainError> {
    let name = form.name.unwrap_or_default().trim().to_string();
    if name.is_empty() {
        return Err(DomainError::Validation("Team name is required".to_string()));
    }
    let description = form
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());

    require_balance(state, user_id, TEAM_CREATION_FEE).await?;

    let charged = state
        .team_repo
        .create_with_leader(
            NewTeam {
                name,
                description,
                created_by: user_id.to_string(),
            },
            TEAM_CREATION_FEE,
        )
        .await?;

    tracing::info!(
        "User {} founded team {} for {} coins (balance {})",
        user_id,
        charged.value.team.id,
        TEAM_CREATION_FEE,
        charged.profile.coins
    );
    let message = format!("Team '{}' created", charged.value.team.name);
    Ok(Mutation::new(
        TeamReceipt {
            value: charged.value,
            fee: TEAM_CREATION_FEE,
            coin_balance: charged.profile.coins,
        },
        message,
        &[StaleView::Profile, StaleView::Teams],
    ))
}

/// Join a team as `member` for `TEAM_JOIN_FEE` coins
pub async fn join_team(
    state: &AppState,
    user_id: &str,
    team_id: &str,
) -> Result<Mutation<TeamReceipt<TeamMember>>, DomainError> {
    let team = state
        .team_repo
        .find_by_id(team_id)
        .await?
        .ok_or(DomainError::NotFound("Team"))?;

    if state
        .team_repo
        .find_membership(team_id, user_id)
        .await?
        .is_some()
    {
        return Err(DomainError::Precondition(
            "You are already a member of this team".to_string(),
        ));
    }

    require_balance(state, user_id, TEAM_JOIN_FEE).await?;

    let charged = state
        .team_repo
        .add_member(team_id, user_id, TeamRole::Member, TEAM_JOIN_FEE)
        .await?;

    tracing::info!(
        "User {} joined team {} for {} coins (balance {})",
        user_id,
        team.id,
        TEAM_JOIN_FEE,
        charged.profile.coins
    );
    Ok(Mutation::new(
        TeamReceipt {
            value: charged.value,
            fee: TEAM_JOIN_FEE,
            coin_balance: charged.profile.coins,
        },
        format!("Welcome to {}!", team.name),
        &[StaleView::Profile, StaleView::Teams],
    ))
}
