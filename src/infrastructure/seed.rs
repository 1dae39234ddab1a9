//! Demo data for local development (`SEED_DEMO=1`)

use crate::models::{achievement, habit, profile, team, team_member, user_goal};
use sea_orm::sea_query::OnConflict;
use sea_orm::*;

pub const DEMO_USER_ID: &str = "demo-user";

pub async fn seed_demo_data(db: &DatabaseConnection) -> Result<(), DbErr> {
    let now = chrono::Utc::now();
    let stamp = now.to_rfc3339();

    // 1. Profiles
    let profiles = [
        (DEMO_USER_ID, "demo", "Demo Player", 2350, 3, 1500),
        ("demo-rival", "rival", "Friendly Rival", 4100, 5, 800),
    ];
    for (id, username, display_name, xp, level, coins) in profiles {
        let row = profile::ActiveModel {
            id: Set(id.to_owned()),
            username: Set(username.to_owned()),
            display_name: Set(Some(display_name.to_owned())),
            avatar_url: Set(None),
            bio: Set(None),
            theme: Set("default".to_owned()),
            notification_preferences: Set(r#"{"email":true,"push":true}"#.to_owned()),
            timezone: Set(None),
            xp: Set(xp),
            level: Set(level),
            coins: Set(coins),
            created_at: Set(stamp.clone()),
            updated_at: Set(stamp.clone()),
        };
        profile::Entity::insert(row)
            .on_conflict(OnConflict::column(profile::Column::Id).do_nothing().to_owned())
            .exec_without_returning(db)
            .await?;
    }

    // 2. Goals
    for (id, category, target) in [
        ("demo-goal-fitness", "fitness", "Run a 10k"),
        ("demo-goal-learning", "learning", "Read 12 books this year"),
    ] {
        let row = user_goal::ActiveModel {
            id: Set(id.to_owned()),
            user_id: Set(DEMO_USER_ID.to_owned()),
            category: Set(category.to_owned()),
            description: Set(None),
            target: Set(Some(target.to_owned())),
            created_at: Set(stamp.clone()),
        };
        user_goal::Entity::insert(row)
            .on_conflict(OnConflict::column(user_goal::Column::Id).do_nothing().to_owned())
            .exec_without_returning(db)
            .await?;
    }

    // 3. Habits: one on a streak, one broken, one never done
    let yesterday = (now - chrono::Duration::days(1)).to_rfc3339();
    let last_week = (now - chrono::Duration::days(7)).to_rfc3339();
    let habits = [
        ("demo-habit-run", "Morning run", "fitness", 20, 6, Some(yesterday), 0),
        ("demo-habit-read", "Read 30 pages", "learning", 30, 0, Some(last_week), 1),
        ("demo-habit-stretch", "Stretch", "fitness", 10, 0, None, 0),
    ];
    for (id, title, category, duration, streak, last, breaks) in habits {
        let total = if last.is_some() { streak.max(1) + 4 } else { 0 };
        let row = habit::ActiveModel {
            id: Set(id.to_owned()),
            user_id: Set(DEMO_USER_ID.to_owned()),
            title: Set(title.to_owned()),
            description: Set(None),
            category: Set(Some(category.to_owned())),
            priority: Set(1),
            scheduled_time: Set(Some("07:00".to_owned())),
            duration_minutes: Set(duration),
            frequency: Set("daily".to_owned()),
            streak: Set(streak),
            last_completion_date: Set(last),
            coin_reward: Set(10),
            streak_recovery_cost: Set(50),
            streak_breaks_count: Set(breaks),
            total_completions: Set(total),
            theme: Set(None),
            created_at: Set(stamp.clone()),
            updated_at: Set(stamp.clone()),
        };
        habit::Entity::insert(row)
            .on_conflict(OnConflict::column(habit::Column::Id).do_nothing().to_owned())
            .exec_without_returning(db)
            .await?;
    }

    // 4. A team led by the rival
    let crew = team::ActiveModel {
        id: Set("demo-team".to_owned()),
        name: Set("Early Birds".to_owned()),
        description: Set(Some("Up before the sun".to_owned())),
        created_by: Set("demo-rival".to_owned()),
        created_at: Set(stamp.clone()),
        updated_at: Set(stamp.clone()),
    };
    team::Entity::insert(crew)
        .on_conflict(OnConflict::column(team::Column::Id).do_nothing().to_owned())
        .exec_without_returning(db)
        .await?;

    let leader = team_member::ActiveModel {
        id: Set("demo-team-leader".to_owned()),
        team_id: Set("demo-team".to_owned()),
        user_id: Set("demo-rival".to_owned()),
        role: Set("leader".to_owned()),
        joined_at: Set(stamp.clone()),
    };
    team_member::Entity::insert(leader)
        .on_conflict(OnConflict::column(team_member::Column::Id).do_nothing().to_owned())
        .exec_without_returning(db)
        .await?;

    // 5. Achievements: one unlocked, one in progress, one untouched
    let achievements = [
        ("demo-ach-first", "completions", "bronze", "First Step", "Complete any habit once", "🌱", Some(1), 1),
        ("demo-ach-week", "streak", "silver", "Week Warrior", "Keep a 7 day streak", "🔥", Some(6), 7),
        ("demo-ach-team", "teams", "gold", "Team Player", "Join a team", "🤝", None, 1),
    ];
    for (id, kind, tier, title, description, icon, progress, target) in achievements {
        let row = achievement::ActiveModel {
            id: Set(id.to_owned()),
            user_id: Set(DEMO_USER_ID.to_owned()),
            achievement_type: Set(kind.to_owned()),
            tier: Set(tier.to_owned()),
            title: Set(title.to_owned()),
            description: Set(description.to_owned()),
            icon: Set(icon.to_owned()),
            progress: Set(progress),
            target: Set(target),
            created_at: Set(stamp.clone()),
            updated_at: Set(stamp.clone()),
        };
        achievement::Entity::insert(row)
            .on_conflict(OnConflict::column(achievement::Column::Id).do_nothing().to_owned())
            .exec_without_returning(db)
            .await?;
    }

    Ok(())
}
