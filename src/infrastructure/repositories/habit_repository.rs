//! SeaORM implementation of HabitRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};

use super::{conditional_debit, parse_timestamp};
use crate::domain::{
    Charged, CompletionRecord, DomainError, Frequency, Habit, HabitFields, HabitRepository,
    NewHabit,
};
use crate::models::habit::{self, ActiveModel, Column, Entity as HabitEntity};
use crate::models::habit_log::ActiveModel as HabitLogActive;

/// SeaORM-based implementation of HabitRepository
pub struct SeaOrmHabitRepository {
    db: DatabaseConnection,
}

impl SeaOrmHabitRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn require(&self, id: &str) -> Result<Habit, DomainError> {
        self.find_by_id(id)
            .await?
            .ok_or(DomainError::NotFound("Habit"))
    }
}

fn to_domain(model: habit::Model) -> Result<Habit, DomainError> {
    let frequency: Frequency = model
        .frequency
        .parse()
        .map_err(|_| DomainError::Database(format!("Unknown frequency '{}'", model.frequency)))?;
    let last_completion_date = model
        .last_completion_date
        .as_deref()
        .map(parse_timestamp)
        .transpose()?;

    Ok(Habit {
        id: model.id,
        user_id: model.user_id,
        title: model.title,
        description: model.description,
        category: model.category,
        priority: model.priority,
        scheduled_time: model.scheduled_time,
        duration_minutes: model.duration_minutes,
        frequency,
        streak: model.streak,
        last_completion_date,
        coin_reward: model.coin_reward,
        streak_recovery_cost: model.streak_recovery_cost,
        streak_breaks_count: model.streak_breaks_count,
        total_completions: model.total_completions,
        theme: model.theme,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

fn apply_fields(active: &mut ActiveModel, fields: HabitFields) {
    active.title = Set(fields.title);
    active.description = Set(fields.description);
    active.category = Set(fields.category);
    active.priority = Set(fields.priority);
    active.scheduled_time = Set(fields.scheduled_time);
    active.duration_minutes = Set(fields.duration_minutes);
    active.frequency = Set(fields.frequency.as_str().to_string());
    active.theme = Set(fields.theme);
}

#[async_trait]
impl HabitRepository for SeaOrmHabitRepository {
    async fn find_by_owner(&self, user_id: &str) -> Result<Vec<Habit>, DomainError> {
        HabitEntity::find()
            .filter(Column::UserId.eq(user_id))
            .order_by_asc(Column::Priority)
            .order_by_asc(Column::Title)
            .all(&self.db)
            .await?
            .into_iter()
            .map(to_domain)
            .collect()
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Habit>, DomainError> {
        HabitEntity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .map(to_domain)
            .transpose()
    }

    async fn create(&self, input: NewHabit) -> Result<Habit, DomainError> {
        let now = Utc::now().to_rfc3339();
        let mut active = ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            user_id: Set(input.user_id),
            streak: Set(0),
            last_completion_date: Set(None),
            coin_reward: Set(input.coin_reward),
            streak_recovery_cost: Set(input.streak_recovery_cost),
            streak_breaks_count: Set(0),
            total_completions: Set(0),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };
        apply_fields(&mut active, input.fields);

        let inserted = active.insert(&self.db).await?;
        to_domain(inserted)
    }

    async fn update(
        &self,
        id: &str,
        fields: HabitFields,
        break_streak: bool,
    ) -> Result<Habit, DomainError> {
        // A duration change and its streak break land together or not at all
        let txn = self.db.begin().await?;

        let existing = HabitEntity::find_by_id(id.to_string())
            .one(&txn)
            .await?
            .ok_or(DomainError::NotFound("Habit"))?;

        let mut active: ActiveModel = existing.into();
        apply_fields(&mut active, fields);
        active.updated_at = Set(Utc::now().to_rfc3339());
        active.update(&txn).await?;

        if break_streak {
            // Counter bump as an expression so a concurrent completion's
            // write is not lost
            HabitEntity::update_many()
                .col_expr(Column::Streak, Expr::value(0))
                .col_expr(
                    Column::StreakBreaksCount,
                    Expr::col(Column::StreakBreaksCount).add(1),
                )
                .filter(Column::Id.eq(id))
                .exec(&txn)
                .await?;
        }

        txn.commit().await?;
        self.require(id).await
    }

    async fn delete(&self, id: &str, user_id: &str) -> Result<bool, DomainError> {
        let result = HabitEntity::delete_many()
            .filter(Column::Id.eq(id))
            .filter(Column::UserId.eq(user_id))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn record_completion(
        &self,
        id: &str,
        user_id: &str,
        at: DateTime<Utc>,
        coins_earned: i64,
    ) -> Result<CompletionRecord, DomainError> {
        let completed_at = at.to_rfc3339();
        let txn = self.db.begin().await?;

        let result = HabitEntity::update_many()
            .col_expr(Column::Streak, Expr::col(Column::Streak).add(1))
            .col_expr(
                Column::TotalCompletions,
                Expr::col(Column::TotalCompletions).add(1),
            )
            .col_expr(
                Column::LastCompletionDate,
                Expr::value(Some(completed_at.clone())),
            )
            .col_expr(Column::UpdatedAt, Expr::value(completed_at.clone()))
            .filter(Column::Id.eq(id))
            .filter(Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            // Dropping the transaction rolls it back
            return Err(DomainError::NotFound("Habit"));
        }

        let log_id = uuid::Uuid::new_v4().to_string();
        HabitLogActive {
            id: Set(log_id.clone()),
            habit_id: Set(id.to_string()),
            user_id: Set(user_id.to_string()),
            completed_at: Set(completed_at),
            coins_earned: Set(coins_earned),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        Ok(CompletionRecord {
            habit: self.require(id).await?,
            log_id,
        })
    }

    async fn record_recovery(
        &self,
        id: &str,
        user_id: &str,
        expected_breaks: i32,
        cost: i64,
    ) -> Result<Charged<Habit>, DomainError> {
        let txn = self.db.begin().await?;

        // Habit step first, guarded on the state the cost was computed from
        let result = HabitEntity::update_many()
            .col_expr(
                Column::StreakBreaksCount,
                Expr::col(Column::StreakBreaksCount).add(1),
            )
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now().to_rfc3339()))
            .filter(Column::Id.eq(id))
            .filter(Column::UserId.eq(user_id))
            .filter(Column::Streak.eq(0))
            .filter(Column::LastCompletionDate.is_not_null())
            .filter(Column::StreakBreaksCount.eq(expected_breaks))
            .exec(&txn)
            .await?;

        if result.rows_affected == 0 {
            return Err(DomainError::Precondition(
                "This streak changed while recovering it. Please try again".to_string(),
            ));
        }

        let profile = conditional_debit(&txn, user_id, cost).await?;
        txn.commit().await?;

        Ok(Charged {
            value: self.require(id).await?,
            profile,
        })
    }
}
