//! SeaORM implementation of AchievementRepository

use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

use crate::domain::{Achievement, AchievementRepository, DomainError};
use crate::models::achievement::{self, Column, Entity as AchievementEntity};

pub struct SeaOrmAchievementRepository {
    db: DatabaseConnection,
}

impl SeaOrmAchievementRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn to_domain(model: achievement::Model) -> Achievement {
    Achievement {
        id: model.id,
        user_id: model.user_id,
        achievement_type: model.achievement_type,
        tier: model.tier,
        title: model.title,
        description: model.description,
        icon: model.icon,
        progress: model.progress,
        target: model.target,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

#[async_trait]
impl AchievementRepository for SeaOrmAchievementRepository {
    async fn find_by_owner(&self, user_id: &str) -> Result<Vec<Achievement>, DomainError> {
        let rows = AchievementEntity::find()
            .filter(Column::UserId.eq(user_id))
            .order_by_asc(Column::AchievementType)
            .order_by_asc(Column::Target)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(to_domain).collect())
    }
}
