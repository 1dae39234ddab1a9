//! Profile Service - provisioning, profile edits and the leaderboard

use super::Mutation;
use crate::domain::{
    DomainError, LeaderboardEntry, Profile, ProfileUpdate, StaleView, parse_utc_offset,
};
use crate::infrastructure::AppState;

const LEADERBOARD_SIZE: u64 = 100;

/// Username for an account whose token carries none: `user_` and the first
/// eight alphanumerics of the subject
pub fn fallback_username(user_id: &str) -> String {
    let short: String = user_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(8)
        .collect();
    format!("user_{}", short)
}

/// Return the caller's profile, creating it (level 1, no xp, no coins) on
/// first sight
pub async fn ensure_profile(
    state: &AppState,
    user_id: &str,
    username: Option<&str>,
) -> Result<Profile, DomainError> {
    if let Some(profile) = state.profile_repo.find_by_id(user_id).await? {
        return Ok(profile);
    }

    let username = match username {
        Some(name) if !name.trim().is_empty() => name.trim().to_string(),
        _ => fallback_username(user_id),
    };
    let profile = state.profile_repo.provision(user_id, &username).await?;
    tracing::info!("Provisioned profile for {} ({})", user_id, profile.username);
    Ok(profile)
}

pub async fn update_profile(
    state: &AppState,
    user_id: &str,
    update: ProfileUpdate,
) -> Result<Mutation<Profile>, DomainError> {
    let trimmed = |value: Option<String>| value.map(|v| v.trim().to_string());
    let update = ProfileUpdate {
        username: trimmed(update.username),
        display_name: trimmed(update.display_name),
        avatar_url: trimmed(update.avatar_url),
        bio: trimmed(update.bio),
        theme: trimmed(update.theme),
        notification_preferences: update.notification_preferences,
        timezone: trimmed(update.timezone),
    };
    if update.username.as_deref() == Some("") {
        return Err(DomainError::Validation("Username cannot be empty".to_string()));
    }
    if update.display_name.as_deref() == Some("") {
        return Err(DomainError::Validation(
            "Display name cannot be empty".to_string(),
        ));
    }

    if update.theme.as_deref() == Some("") {
        return Err(DomainError::Validation("Theme cannot be empty".to_string()));
    }
    // Empty clears the zone; anything else must be a usable offset
    if let Some(timezone) = update.timezone.as_deref().filter(|t| !t.is_empty()) {
        parse_utc_offset(timezone)?;
    }

    ensure_profile(state, user_id, None).await?;
    let profile = state.profile_repo.update(user_id, update).await?;

    Ok(Mutation::new(
        profile,
        "Profile updated",
        &[StaleView::Profile, StaleView::Leaderboard, StaleView::Stats],
    ))
}

pub async fn leaderboard(state: &AppState) -> Result<Vec<LeaderboardEntry>, DomainError> {
    state.profile_repo.leaderboard(LEADERBOARD_SIZE).await
}
