//! SeaORM implementation of ProfileRepository

use async_trait::async_trait;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use std::collections::HashMap;

use super::{conditional_debit, profile_to_domain};
use crate::domain::{
    DomainError, LeaderboardEntry, NotificationPreferences, Profile, ProfileRepository,
    ProfileUpdate,
};
use crate::models::habit::{Column as HabitColumn, Entity as HabitEntity};
use crate::models::profile::{ActiveModel, Column, Entity as ProfileEntity};

pub const DEFAULT_THEME: &str = "default";

fn preferences_json(preferences: NotificationPreferences) -> Result<String, DomainError> {
    serde_json::to_string(&preferences).map_err(|e| DomainError::Internal(e.to_string()))
}

/// SeaORM-based implementation of ProfileRepository
pub struct SeaOrmProfileRepository {
    db: DatabaseConnection,
}

impl SeaOrmProfileRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn require(&self, id: &str) -> Result<Profile, DomainError> {
        self.find_by_id(id)
            .await?
            .ok_or(DomainError::NotFound("Profile"))
    }
}

#[async_trait]
impl ProfileRepository for SeaOrmProfileRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Profile>, DomainError> {
        let profile = ProfileEntity::find_by_id(id.to_string())
            .one(&self.db)
            .await?;
        profile.map(profile_to_domain).transpose()
    }

    async fn provision(&self, id: &str, username: &str) -> Result<Profile, DomainError> {
        let now = chrono::Utc::now().to_rfc3339();
        let fresh = ActiveModel {
            id: Set(id.to_string()),
            username: Set(username.to_string()),
            display_name: Set(None),
            avatar_url: Set(None),
            bio: Set(None),
            theme: Set(DEFAULT_THEME.to_string()),
            notification_preferences: Set(preferences_json(NotificationPreferences::default())?),
            timezone: Set(None),
            xp: Set(0),
            level: Set(1),
            coins: Set(0),
            created_at: Set(now.clone()),
            updated_at: Set(now),
        };

        // Two first requests may race; the loser's insert is a no-op.
        ProfileEntity::insert(fresh)
            .on_conflict(OnConflict::column(Column::Id).do_nothing().to_owned())
            .exec_without_returning(&self.db)
            .await?;

        self.require(id).await
    }

    async fn update(&self, id: &str, update: ProfileUpdate) -> Result<Profile, DomainError> {
        let existing = ProfileEntity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .ok_or(DomainError::NotFound("Profile"))?;

        let mut active: ActiveModel = existing.into();
        if let Some(username) = update.username {
            active.username = Set(username);
        }
        if let Some(display_name) = update.display_name {
            active.display_name = Set(Some(display_name));
        }
        if let Some(avatar_url) = update.avatar_url {
            active.avatar_url = Set(Some(avatar_url).filter(|u| !u.is_empty()));
        }
        if let Some(bio) = update.bio {
            active.bio = Set(Some(bio).filter(|b| !b.is_empty()));
        }
        if let Some(theme) = update.theme {
            active.theme = Set(theme);
        }
        if let Some(preferences) = update.notification_preferences {
            active.notification_preferences = Set(preferences_json(preferences)?);
        }
        if let Some(timezone) = update.timezone {
            active.timezone = Set(Some(timezone).filter(|t| !t.is_empty()));
        }
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let updated = active.update(&self.db).await?;
        profile_to_domain(updated)
    }

    async fn credit_coins(&self, id: &str, amount: i64) -> Result<Profile, DomainError> {
        if amount < 0 {
            return Err(DomainError::Validation(
                "Credit amount cannot be negative".to_string(),
            ));
        }

        let result = ProfileEntity::update_many()
            .col_expr(Column::Coins, Expr::col(Column::Coins).add(amount))
            .col_expr(
                Column::UpdatedAt,
                Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(DomainError::NotFound("Profile"));
        }
        self.require(id).await
    }

    async fn debit_coins(&self, id: &str, amount: i64) -> Result<Profile, DomainError> {
        conditional_debit(&self.db, id, amount).await
    }

    async fn leaderboard(&self, limit: u64) -> Result<Vec<LeaderboardEntry>, DomainError> {
        let profiles = ProfileEntity::find()
            .order_by_desc(Column::Xp)
            .order_by_asc(Column::Username)
            .limit(limit)
            .all(&self.db)
            .await?;

        let streaks: HashMap<String, i32> = HabitEntity::find()
            .select_only()
            .column(HabitColumn::UserId)
            .column_as(HabitColumn::Streak.max(), "highest_streak")
            .group_by(HabitColumn::UserId)
            .into_tuple::<(String, Option<i32>)>()
            .all(&self.db)
            .await?
            .into_iter()
            .map(|(user_id, streak)| (user_id, streak.unwrap_or(0)))
            .collect();

        Ok(profiles
            .into_iter()
            .map(|p| LeaderboardEntry {
                highest_streak: streaks.get(&p.id).copied().unwrap_or(0),
                user_id: p.id,
                username: p.username,
                display_name: p.display_name,
                avatar_url: p.avatar_url,
                xp: p.xp,
                level: p.level,
            })
            .collect())
    }
}
