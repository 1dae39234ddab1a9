use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};

pub async fn init_db(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;

    // Run migrations manually (simple SQL)
    run_migrations(&db).await?;

    Ok(db)
}

async fn execute(db: &DatabaseConnection, sql: &str) -> Result<(), DbErr> {
    db.execute(Statement::from_string(
        db.get_database_backend(),
        sql.to_owned(),
    ))
    .await?;
    Ok(())
}

async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Profiles mirror identity-provider accounts (id = token subject)
    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS profiles (
            id TEXT PRIMARY KEY NOT NULL,
            username TEXT NOT NULL,
            display_name TEXT,
            avatar_url TEXT,
            bio TEXT,
            theme TEXT NOT NULL DEFAULT 'default',
            notification_preferences TEXT NOT NULL DEFAULT '{"email":true,"push":true}',
            timezone TEXT,
            xp INTEGER NOT NULL DEFAULT 0 CHECK (xp >= 0),
            level INTEGER NOT NULL DEFAULT 1 CHECK (level >= 1),
            coins INTEGER NOT NULL DEFAULT 0 CHECK (coins >= 0),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .await?;

    // Preference columns for stores created before they existed.
    // SQLite has no ADD COLUMN IF NOT EXISTS, so "duplicate column" errors are ignored.
    for column in [
        "bio TEXT",
        "theme TEXT NOT NULL DEFAULT 'default'",
        r#"notification_preferences TEXT NOT NULL DEFAULT '{"email":true,"push":true}'"#,
        "timezone TEXT",
    ] {
        let _ = execute(db, &format!("ALTER TABLE profiles ADD COLUMN {}", column)).await;
    }

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS habits (
            id TEXT PRIMARY KEY NOT NULL,
            user_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            description TEXT,
            category TEXT,
            priority INTEGER NOT NULL DEFAULT 1,
            scheduled_time TEXT,
            duration_minutes INTEGER NOT NULL DEFAULT 30 CHECK (duration_minutes > 0),
            frequency TEXT NOT NULL DEFAULT 'daily',
            streak INTEGER NOT NULL DEFAULT 0 CHECK (streak >= 0),
            last_completion_date TEXT,
            coin_reward INTEGER NOT NULL DEFAULT 10,
            streak_recovery_cost INTEGER NOT NULL DEFAULT 50,
            streak_breaks_count INTEGER NOT NULL DEFAULT 0,
            total_completions INTEGER NOT NULL DEFAULT 0,
            theme TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .await?;

    execute(
        db,
        "CREATE INDEX IF NOT EXISTS idx_habits_user_id ON habits(user_id)",
    )
    .await?;

    // Append-only completion log (no FK on habit_id: logs may outlive the habit)
    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS habit_logs (
            id TEXT PRIMARY KEY NOT NULL,
            habit_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            completed_at TEXT NOT NULL,
            coins_earned INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .await?;

    execute(
        db,
        "CREATE INDEX IF NOT EXISTS idx_habit_logs_habit_id ON habit_logs(habit_id)",
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS teams (
            id TEXT PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            description TEXT,
            created_by TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS team_members (
            id TEXT PRIMARY KEY NOT NULL,
            team_id TEXT NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
            user_id TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'member',
            joined_at TEXT NOT NULL,
            UNIQUE(team_id, user_id)
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS user_goals (
            id TEXT PRIMARY KEY NOT NULL,
            user_id TEXT NOT NULL,
            category TEXT NOT NULL,
            description TEXT,
            target TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .await?;

    execute(
        db,
        "CREATE INDEX IF NOT EXISTS idx_user_goals_user_id ON user_goals(user_id)",
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS achievements (
            id TEXT PRIMARY KEY NOT NULL,
            user_id TEXT NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            type TEXT NOT NULL,
            tier TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            icon TEXT NOT NULL,
            progress INTEGER,
            target INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .await?;

    execute(
        db,
        "CREATE INDEX IF NOT EXISTS idx_achievements_user_id ON achievements(user_id)",
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS habit_templates (
            id TEXT PRIMARY KEY NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            category TEXT,
            frequency TEXT NOT NULL DEFAULT 'daily',
            duration_minutes INTEGER,
            theme TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .await?;

    // Default template catalog
    execute(
        db,
        r#"
        INSERT OR IGNORE INTO habit_templates (id, title, description, category, frequency, duration_minutes, theme, created_at)
        VALUES
            ('tpl-morning-workout', 'Morning Workout', 'Start the day with a short training session', 'fitness', 'daily', 20, 'sunrise', datetime('now')),
            ('tpl-read', 'Read', 'Read a few chapters of a book', 'learning', 'daily', 30, 'library', datetime('now')),
            ('tpl-meditate', 'Meditate', 'Sit quietly and focus on breathing', 'mindfulness', 'daily', 10, 'zen', datetime('now')),
            ('tpl-language', 'Practice a Language', 'Vocabulary and listening practice', 'learning', 'daily', 15, 'globe', datetime('now')),
            ('tpl-meal-prep', 'Meal Prep', 'Cook healthy meals for the week', 'health', 'weekly', 90, 'kitchen', datetime('now')),
            ('tpl-long-run', 'Long Run', 'One longer endurance run', 'fitness', 'weekly', 60, 'trail', datetime('now')),
            ('tpl-budget-review', 'Budget Review', 'Check spending against the monthly plan', 'finance', 'monthly', 45, NULL, datetime('now'))
        "#,
    )
    .await?;

    Ok(())
}
