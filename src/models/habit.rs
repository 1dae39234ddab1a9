use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "habits")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String, // UUID
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    /// One of the owner's `user_goals.category` values
    pub category: Option<String>,
    /// 1 (highest) to 5 (lowest)
    pub priority: i32,
    /// Time of day, `HH:MM` or `HH:MM:SS`
    pub scheduled_time: Option<String>,
    pub duration_minutes: i32,
    /// Valid values: `daily`, `weekly`, `monthly`
    pub frequency: String,
    pub streak: i32,
    /// RFC 3339. NULL means never completed, in which case `streak` is 0.
    pub last_completion_date: Option<String>,
    pub coin_reward: i64,
    pub streak_recovery_cost: i64,
    pub streak_breaks_count: i32,
    pub total_completions: i32,
    pub theme: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::profile::Entity",
        from = "Column::UserId",
        to = "super::profile::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Profile,
    #[sea_orm(has_many = "super::habit_log::Entity")]
    HabitLog,
}

impl Related<super::profile::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Profile.def()
    }
}

impl Related<super::habit_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::HabitLog.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
