//! Session Service - timed habit sessions and their completion.
//!
//! A session counts down once per tick. When it reaches zero the habit is
//! completed in two steps:
//! 1. streak, total and last completion are written together with a log row
//! 2. the coin reward is credited
//!
//! Step 2 failing after step 1 committed is reported as
//! `DomainError::PartiallyApplied`; step 1 is not undone.

use chrono::Utc;
use serde::Serialize;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

use super::Mutation;
use super::habit_service::owned_habit;
use crate::domain::{DomainError, Habit, SessionEvent, SessionSnapshot, StaleView, TickOutcome};
use crate::infrastructure::AppState;

/// What a finished session produced
#[derive(Debug, Clone, Serialize)]
pub struct CompletionReceipt {
    pub habit: Habit,
    pub coins_awarded: i64,
    pub coin_balance: i64,
}

const COMPLETION_STALE: &[StaleView] = &[
    StaleView::Profile,
    StaleView::Habits,
    StaleView::Stats,
    StaleView::Session,
    StaleView::Leaderboard,
];

pub fn session_status(state: &AppState, user_id: &str) -> Option<SessionSnapshot> {
    state.sessions.snapshot(user_id)
}

/// Start a session for one of the caller's habits
pub async fn start_session(
    state: &AppState,
    user_id: &str,
    habit_id: &str,
) -> Result<Mutation<SessionSnapshot>, DomainError> {
    let habit = owned_habit(state, user_id, habit_id).await?;

    let snapshot = state
        .sessions
        .start(user_id, &habit.id, habit.duration_minutes)
        .inspect_err(|e| tracing::warn!("User {} could not start a session: {}", user_id, e))?;

    if let Some(period) = state.tick_interval {
        spawn_countdown(state.clone(), user_id.to_string(), snapshot.session_id, period);
    }

    tracing::info!(
        "User {} started a {} min session for habit {}",
        user_id,
        habit.duration_minutes,
        habit.id
    );
    Ok(Mutation::new(
        snapshot,
        format!("Session started: {}", habit.title),
        &[StaleView::Session],
    ))
}

/// Spawn the driver task of one session. It ticks only that session and
/// exits once the session is gone.
fn spawn_countdown(state: AppState, user_id: String, session_id: u64, period: Duration) {
    let registry = state.sessions.clone();
    let task_user = user_id.clone();

    let handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period.max(Duration::from_millis(1)));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick of a tokio interval fires immediately
        interval.tick().await;

        loop {
            interval.tick().await;
            match state.sessions.tick(&task_user, Some(session_id)) {
                TickOutcome::Running { .. } => continue,
                TickOutcome::Idle => break,
                TickOutcome::Elapsed { habit_id } => {
                    // Errors are already logged and published
                    let _ = complete_session(&state, &task_user, &habit_id).await;
                    break;
                }
            }
        }
    });

    registry.attach_countdown(&user_id, session_id, handle.abort_handle());
}

/// Advance the caller's session by one second, completing it at zero
pub async fn tick(state: &AppState, user_id: &str) -> Result<TickOutcome, DomainError> {
    let outcome = state.sessions.tick(user_id, None);
    if let TickOutcome::Elapsed { habit_id } = &outcome {
        complete_session(state, user_id, habit_id).await?;
    }
    Ok(outcome)
}

/// Stop the caller's session. Nothing about the habit or profile changes.
pub fn cancel_session(
    state: &AppState,
    user_id: &str,
) -> Result<Mutation<SessionSnapshot>, DomainError> {
    let snapshot = state.sessions.cancel(user_id)?;
    tracing::info!(
        "User {} cancelled session for habit {} with {}s left",
        user_id,
        snapshot.habit_id,
        snapshot.remaining_secs
    );
    Ok(Mutation::new(
        snapshot,
        "Session cancelled",
        &[StaleView::Session],
    ))
}

/// Record a completion of `habit_id` and pay its reward.
///
/// Publishes a `SessionEvent` whatever the outcome.
pub async fn complete_session(
    state: &AppState,
    user_id: &str,
    habit_id: &str,
) -> Result<Mutation<CompletionReceipt>, DomainError> {
    let result = apply_completion(state, user_id, habit_id).await;

    let event = match &result {
        Ok(done) => SessionEvent::Completed {
            user_id: user_id.to_string(),
            habit_id: habit_id.to_string(),
            streak: done.value.habit.streak,
            coins_awarded: done.value.coins_awarded,
        },
        Err(e) => SessionEvent::CompletionFailed {
            user_id: user_id.to_string(),
            habit_id: habit_id.to_string(),
            reason: e.to_string(),
        },
    };
    // No subscribers is fine
    let _ = state.events.send(event);

    result
}

async fn apply_completion(
    state: &AppState,
    user_id: &str,
    habit_id: &str,
) -> Result<Mutation<CompletionReceipt>, DomainError> {
    let habit = owned_habit(state, user_id, habit_id).await?;
    let reward = habit.coin_reward;

    let record = state
        .habit_repo
        .record_completion(&habit.id, user_id, Utc::now(), reward)
        .await
        .inspect_err(|e| tracing::error!("Completion of habit {} failed: {}", habit.id, e))?;

    let profile = match state.profile_repo.credit_coins(user_id, reward).await {
        Ok(profile) => profile,
        Err(e) => {
            tracing::error!(
                "Habit {} completed (log {}) but crediting {} coins to {} failed: {}",
                habit.id,
                record.log_id,
                reward,
                user_id,
                e
            );
            return Err(DomainError::PartiallyApplied(format!(
                "'{}' was completed and your streak is now {}, but the {} coin reward could not be credited",
                record.habit.title, record.habit.streak, reward
            )));
        }
    };

    tracing::info!(
        "User {} completed habit {}: streak {}, +{} coins (balance {})",
        user_id,
        record.habit.id,
        record.habit.streak,
        reward,
        profile.coins
    );

    let message = format!(
        "Great job! '{}' completed, +{} coins",
        record.habit.title, reward
    );
    Ok(Mutation::new(
        CompletionReceipt {
            habit: record.habit,
            coins_awarded: reward,
            coin_balance: profile.coins,
        },
        message,
        COMPLETION_STALE,
    ))
}
