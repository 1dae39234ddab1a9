//! Repository trait definitions
//!
//! These traits define the contract for data access.
//! Implementations live in the infrastructure layer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DomainError, Frequency, NotificationPreferences, TeamRole};

/// Profile data for API responses
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub theme: String,
    pub notification_preferences: NotificationPreferences,
    /// UTC offset text such as `+02:00`; stats use it to find "today"
    pub timezone: Option<String>,
    pub xp: i64,
    pub level: i32,
    pub coins: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Profile fields the owner may change. `None` leaves the stored value;
/// an empty string clears `avatar_url`, `bio` and `timezone`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub theme: Option<String>,
    pub notification_preferences: Option<NotificationPreferences>,
    pub timezone: Option<String>,
}

/// One row of the leaderboard
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub xp: i64,
    pub level: i32,
    pub highest_streak: i32,
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Profile>, DomainError>;

    /// Insert a fresh profile (level 1, xp 0, coins 0) unless one exists,
    /// then return the stored row.
    async fn provision(&self, id: &str, username: &str) -> Result<Profile, DomainError>;

    async fn update(&self, id: &str, update: ProfileUpdate) -> Result<Profile, DomainError>;

    /// Atomically add `amount` coins (single increment expression).
    async fn credit_coins(&self, id: &str, amount: i64) -> Result<Profile, DomainError>;

    /// Atomically subtract `amount` coins if the balance covers it.
    /// Fails with `InsufficientCoins` and changes nothing otherwise.
    async fn debit_coins(&self, id: &str, amount: i64) -> Result<Profile, DomainError>;

    /// Profiles ordered by xp descending, with their highest habit streak
    async fn leaderboard(&self, limit: u64) -> Result<Vec<LeaderboardEntry>, DomainError>;
}

/// Habit data for API responses
#[derive(Debug, Clone, Serialize)]
pub struct Habit {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub priority: i32,
    pub scheduled_time: Option<String>,
    pub duration_minutes: i32,
    pub frequency: Frequency,
    pub streak: i32,
    pub last_completion_date: Option<DateTime<Utc>>,
    pub coin_reward: i64,
    pub streak_recovery_cost: i64,
    pub streak_breaks_count: i32,
    pub total_completions: i32,
    pub theme: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Validated habit fields, shared by create and edit
#[derive(Debug, Clone, PartialEq)]
pub struct HabitFields {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub priority: i32,
    pub scheduled_time: Option<String>,
    pub duration_minutes: i32,
    pub frequency: Frequency,
    pub theme: Option<String>,
}

/// Input for creating a habit
#[derive(Debug, Clone)]
pub struct NewHabit {
    pub user_id: String,
    pub fields: HabitFields,
    pub coin_reward: i64,
    pub streak_recovery_cost: i64,
}

/// Result of a completion write
#[derive(Debug, Clone)]
pub struct CompletionRecord {
    pub habit: Habit,
    pub log_id: String,
}

#[async_trait]
pub trait HabitRepository: Send + Sync {
    /// All habits of one owner, by priority then title
    async fn find_by_owner(&self, user_id: &str) -> Result<Vec<Habit>, DomainError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Habit>, DomainError>;

    async fn create(&self, input: NewHabit) -> Result<Habit, DomainError>;

    /// Overwrite the editable fields. With `break_streak`, the same write
    /// sets streak to 0 and increments streak_breaks_count.
    async fn update(
        &self,
        id: &str,
        fields: HabitFields,
        break_streak: bool,
    ) -> Result<Habit, DomainError>;

    /// Delete a habit owned by `user_id`. Returns whether a row was removed.
    async fn delete(&self, id: &str, user_id: &str) -> Result<bool, DomainError>;

    /// In one transaction: streak + 1, total + 1, last completion = `at`,
    /// and a completion log row carrying `coins_earned`.
    async fn record_completion(
        &self,
        id: &str,
        user_id: &str,
        at: DateTime<Utc>,
        coins_earned: i64,
    ) -> Result<CompletionRecord, DomainError>;

    /// In one transaction: streak_breaks_count + 1 (only if the habit still has
    /// a zero streak and `expected_breaks` breaks) and a conditional debit of
    /// `cost` coins from the owner. Nothing is written when either fails.
    async fn record_recovery(
        &self,
        id: &str,
        user_id: &str,
        expected_breaks: i32,
        cost: i64,
    ) -> Result<Charged<Habit>, DomainError>;
}

/// A record created or changed together with a coin debit, plus the
/// owner's profile as it stands after the debit.
#[derive(Debug, Clone)]
pub struct Charged<T> {
    pub value: T,
    pub profile: Profile,
}

/// Team data for API responses
#[derive(Debug, Clone, Serialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_by: String,
    pub created_at: String,
    pub member_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamMember {
    pub id: String,
    pub team_id: String,
    pub user_id: String,
    pub username: Option<String>,
    pub role: TeamRole,
    pub joined_at: String,
}

/// Team and the creator's leader membership
#[derive(Debug, Clone, Serialize)]
pub struct FoundedTeam {
    pub team: Team,
    pub leader: TeamMember,
}

#[derive(Debug, Clone)]
pub struct NewTeam {
    pub name: String,
    pub description: Option<String>,
    pub created_by: String,
}

#[async_trait]
pub trait TeamRepository: Send + Sync {
    /// All teams, optionally filtered by a case-insensitive name fragment
    async fn find_all(&self, search: Option<String>) -> Result<Vec<Team>, DomainError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Team>, DomainError>;

    async fn members(&self, team_id: &str) -> Result<Vec<TeamMember>, DomainError>;

    async fn find_membership(
        &self,
        team_id: &str,
        user_id: &str,
    ) -> Result<Option<TeamMember>, DomainError>;

    /// In one transaction: team row, leader membership, debit of `fee`.
    async fn create_with_leader(
        &self,
        input: NewTeam,
        fee: i64,
    ) -> Result<Charged<FoundedTeam>, DomainError>;

    /// In one transaction: membership row with `role`, debit of `fee`.
    /// Rejects an existing membership without charging.
    async fn add_member(
        &self,
        team_id: &str,
        user_id: &str,
        role: TeamRole,
        fee: i64,
    ) -> Result<Charged<TeamMember>, DomainError>;
}

/// Goal declared by a user; its category keys habit categories
#[derive(Debug, Clone, Serialize)]
pub struct UserGoal {
    pub id: String,
    pub user_id: String,
    pub category: String,
    pub description: Option<String>,
    pub target: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewGoal {
    pub category: String,
    pub description: Option<String>,
    pub target: Option<String>,
}

#[async_trait]
pub trait GoalRepository: Send + Sync {
    async fn find_by_owner(&self, user_id: &str) -> Result<Vec<UserGoal>, DomainError>;

    async fn create(&self, user_id: &str, input: NewGoal) -> Result<UserGoal, DomainError>;
}

/// Catalog entry used to seed a habit during onboarding
#[derive(Debug, Clone, Serialize)]
pub struct HabitTemplate {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub frequency: Frequency,
    pub duration_minutes: Option<i32>,
    pub theme: Option<String>,
}

#[async_trait]
pub trait TemplateRepository: Send + Sync {
    async fn find_all(&self) -> Result<Vec<HabitTemplate>, DomainError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<HabitTemplate>, DomainError>;
}

/// Milestone tracked for a user
#[derive(Debug, Clone, Serialize)]
pub struct Achievement {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub achievement_type: String,
    pub tier: String,
    pub title: String,
    pub description: String,
    pub icon: String,
    /// Not yet counted when `None`
    pub progress: Option<i64>,
    pub target: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[async_trait]
pub trait AchievementRepository: Send + Sync {
    async fn find_by_owner(&self, user_id: &str) -> Result<Vec<Achievement>, DomainError>;
}
