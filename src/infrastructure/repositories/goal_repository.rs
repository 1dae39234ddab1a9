//! SeaORM implementation of GoalRepository

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::domain::{DomainError, GoalRepository, NewGoal, UserGoal};
use crate::models::user_goal::{self, ActiveModel, Column, Entity as GoalEntity};

/// SeaORM-based implementation of GoalRepository
pub struct SeaOrmGoalRepository {
    db: DatabaseConnection,
}

impl SeaOrmGoalRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn to_domain(model: user_goal::Model) -> UserGoal {
    UserGoal {
        id: model.id,
        user_id: model.user_id,
        category: model.category,
        description: model.description,
        target: model.target,
        created_at: model.created_at,
    }
}

#[async_trait]
impl GoalRepository for SeaOrmGoalRepository {
    async fn find_by_owner(&self, user_id: &str) -> Result<Vec<UserGoal>, DomainError> {
        let goals = GoalEntity::find()
            .filter(Column::UserId.eq(user_id))
            .order_by_asc(Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(goals.into_iter().map(to_domain).collect())
    }

    async fn create(&self, user_id: &str, input: NewGoal) -> Result<UserGoal, DomainError> {
        let goal = ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            user_id: Set(user_id.to_string()),
            category: Set(input.category),
            description: Set(input.description),
            target: Set(input.target),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
        }
        .insert(&self.db)
        .await?;
        Ok(to_domain(goal))
    }
}
