//! Repository implementations using SeaORM

pub mod achievement_repository;
pub mod goal_repository;
pub mod habit_repository;
pub mod profile_repository;
pub mod team_repository;
pub mod template_repository;

pub use achievement_repository::SeaOrmAchievementRepository;
pub use goal_repository::SeaOrmGoalRepository;
pub use habit_repository::SeaOrmHabitRepository;
pub use profile_repository::SeaOrmProfileRepository;
pub use team_repository::SeaOrmTeamRepository;
pub use template_repository::SeaOrmTemplateRepository;

use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

use crate::domain::{DomainError, Profile};
use crate::models::profile::{self, Column as ProfileColumn, Entity as ProfileEntity};

pub(crate) fn profile_to_domain(model: profile::Model) -> Result<Profile, DomainError> {
    let notification_preferences = serde_json::from_str(&model.notification_preferences)
        .map_err(|e| {
            DomainError::Database(format!(
                "Invalid notification preferences for profile {}: {}",
                model.id, e
            ))
        })?;

    Ok(Profile {
        id: model.id,
        username: model.username,
        display_name: model.display_name,
        avatar_url: model.avatar_url,
        bio: model.bio,
        theme: model.theme,
        notification_preferences,
        timezone: model.timezone,
        xp: model.xp,
        level: model.level,
        coins: model.coins,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

/// `coins = coins - amount WHERE id = ? AND coins >= amount`, on any
/// connection or open transaction. Returns the profile after the debit, or
/// `InsufficientCoins` with the balance that was too low.
pub(crate) async fn conditional_debit<C>(
    conn: &C,
    user_id: &str,
    amount: i64,
) -> Result<Profile, DomainError>
where
    C: ConnectionTrait,
{
    if amount < 0 {
        return Err(DomainError::Validation(
            "Debit amount cannot be negative".to_string(),
        ));
    }

    let result = ProfileEntity::update_many()
        .col_expr(
            ProfileColumn::Coins,
            Expr::col(ProfileColumn::Coins).sub(amount),
        )
        .col_expr(
            ProfileColumn::UpdatedAt,
            Expr::value(chrono::Utc::now().to_rfc3339()),
        )
        .filter(ProfileColumn::Id.eq(user_id))
        .filter(ProfileColumn::Coins.gte(amount))
        .exec(conn)
        .await?;

    let current = ProfileEntity::find_by_id(user_id.to_string())
        .one(conn)
        .await?
        .ok_or(DomainError::NotFound("Profile"))?;

    if result.rows_affected == 0 {
        return Err(DomainError::InsufficientCoins {
            required: amount,
            available: current.coins,
        });
    }

    profile_to_domain(current)
}

/// Parse an RFC 3339 column, reporting corrupt rows as store errors
pub(crate) fn parse_timestamp(
    raw: &str,
) -> Result<chrono::DateTime<chrono::Utc>, DomainError> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| DomainError::Database(format!("Invalid timestamp '{}': {}", raw, e)))
}
