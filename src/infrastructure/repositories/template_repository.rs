//! SeaORM implementation of TemplateRepository

use async_trait::async_trait;
use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder};

use crate::domain::{DomainError, HabitTemplate, TemplateRepository};
use crate::models::habit_template::{self, Column, Entity as TemplateEntity};

/// SeaORM-based implementation of TemplateRepository
pub struct SeaOrmTemplateRepository {
    db: DatabaseConnection,
}

impl SeaOrmTemplateRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn to_domain(model: habit_template::Model) -> Result<HabitTemplate, DomainError> {
    Ok(HabitTemplate {
        frequency: model.frequency.parse().map_err(|_| {
            DomainError::Database(format!("Unknown frequency '{}'", model.frequency))
        })?,
        id: model.id,
        title: model.title,
        description: model.description,
        category: model.category,
        duration_minutes: model.duration_minutes,
        theme: model.theme,
    })
}

#[async_trait]
impl TemplateRepository for SeaOrmTemplateRepository {
    async fn find_all(&self) -> Result<Vec<HabitTemplate>, DomainError> {
        TemplateEntity::find()
            .order_by_asc(Column::Title)
            .all(&self.db)
            .await?
            .into_iter()
            .map(to_domain)
            .collect()
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<HabitTemplate>, DomainError> {
        TemplateEntity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .map(to_domain)
            .transpose()
    }
}
