use chrono::{Duration, FixedOffset, Timelike, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};

use habitquest::db;
use habitquest::domain::{DomainError, NotificationPreferences, ProfileUpdate};
use habitquest::infrastructure::AppState;
use habitquest::models::{achievement, habit};
use habitquest::services::habit_service::{self, HabitForm};
use habitquest::services::{achievement_service, profile_service, stats_service};

async fn setup_test_state() -> AppState {
    let db = db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB");
    AppState::new(db).with_tick_interval(None)
}

async fn new_user(state: &AppState, id: &str) {
    profile_service::ensure_profile(state, id, Some(id))
        .await
        .expect("Failed to provision profile");
}

async fn set_timezone(state: &AppState, user_id: &str, timezone: &str) {
    profile_service::update_profile(
        state,
        user_id,
        ProfileUpdate {
            timezone: Some(timezone.to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
}

/// A whole-hour zone where the local hour of `now` is `hour`
fn zone_at_hour(now: chrono::DateTime<Utc>, hour: u32) -> String {
    (-12..=14)
        .find(|h| {
            let offset = FixedOffset::east_opt(h * 3600).unwrap();
            now.with_timezone(&offset).hour() == hour
        })
        .map(|h: i32| format!("{}{:02}:00", if h < 0 { '-' } else { '+' }, h.abs()))
        .expect("every hour of the day is reachable")
}

#[tokio::test]
async fn test_new_profile_has_default_preferences() {
    let state = setup_test_state().await;
    new_user(&state, "alice").await;

    let profile = state.profile_repo.find_by_id("alice").await.unwrap().unwrap();
    assert_eq!(profile.theme, "default");
    assert!(profile.bio.is_none());
    assert!(profile.timezone.is_none());
    assert_eq!(profile.notification_preferences, NotificationPreferences::default());
}

#[tokio::test]
async fn test_update_preferences() {
    let state = setup_test_state().await;
    new_user(&state, "alice").await;

    let updated = profile_service::update_profile(
        &state,
        "alice",
        ProfileUpdate {
            bio: Some("  Early riser ".to_string()),
            theme: Some("forest".to_string()),
            notification_preferences: Some(NotificationPreferences {
                email: false,
                push: true,
            }),
            timezone: Some("UTC+5:30".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .value;

    assert_eq!(updated.bio.as_deref(), Some("Early riser"));
    assert_eq!(updated.theme, "forest");
    assert!(!updated.notification_preferences.email);
    assert!(updated.notification_preferences.push);
    assert_eq!(updated.timezone.as_deref(), Some("UTC+5:30"));
    // Untouched
    assert_eq!(updated.username, "alice");

    // Empty strings clear optional text
    let cleared = profile_service::update_profile(
        &state,
        "alice",
        ProfileUpdate {
            bio: Some(String::new()),
            timezone: Some(" ".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .value;
    assert!(cleared.bio.is_none());
    assert!(cleared.timezone.is_none());
    assert!(!cleared.notification_preferences.email);
}

#[tokio::test]
async fn test_invalid_preferences_are_rejected_without_write() {
    let state = setup_test_state().await;
    new_user(&state, "alice").await;

    for update in [
        ProfileUpdate {
            timezone: Some("Europe/Paris".to_string()),
            ..Default::default()
        },
        ProfileUpdate {
            theme: Some("   ".to_string()),
            ..Default::default()
        },
    ] {
        let err = profile_service::update_profile(&state, "alice", update)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    let profile = state.profile_repo.find_by_id("alice").await.unwrap().unwrap();
    assert!(profile.timezone.is_none());
    assert_eq!(profile.theme, "default");
}

#[tokio::test]
async fn test_stats_use_stored_time_zone() {
    let state = setup_test_state().await;
    new_user(&state, "alice").await;
    let habit_id = habit_service::create_habit(
        &state,
        "alice",
        HabitForm {
            title: Some("Journal".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .value
    .id;

    // Done 20 hours ago: still "today" where it is now 21:xx, yesterday
    // where it is now 12:xx
    let now = Utc::now();
    habit::Entity::update_many()
        .col_expr(
            habit::Column::LastCompletionDate,
            Expr::value(Some((now - Duration::hours(20)).to_rfc3339())),
        )
        .filter(habit::Column::Id.eq(habit_id.as_str()))
        .exec(state.db())
        .await
        .unwrap();

    set_timezone(&state, "alice", &zone_at_hour(now, 21)).await;
    let stats = stats_service::get_aggregate_stats(&state, "alice", None)
        .await
        .unwrap();
    assert_eq!(stats.habits.completed_today, 1);

    set_timezone(&state, "alice", &zone_at_hour(now, 12)).await;
    let stats = stats_service::get_aggregate_stats(&state, "alice", None)
        .await
        .unwrap();
    assert_eq!(stats.habits.completed_today, 0);

    // An explicit request offset wins over the stored zone
    let zone = zone_at_hour(now, 21);
    let hours: i32 = zone[..3].parse().unwrap();
    let stats = stats_service::get_aggregate_stats(&state, "alice", Some(hours * 60))
        .await
        .unwrap();
    assert_eq!(stats.habits.completed_today, 1);
}

async fn insert_achievement(
    state: &AppState,
    id: &str,
    user_id: &str,
    progress: Option<i64>,
    target: i64,
) {
    let stamp = Utc::now().to_rfc3339();
    achievement::ActiveModel {
        id: Set(id.to_string()),
        user_id: Set(user_id.to_string()),
        achievement_type: Set(format!("kind-{}", id)),
        tier: Set("bronze".to_string()),
        title: Set(format!("Achievement {}", id)),
        description: Set("Keep going".to_string()),
        icon: Set("🏅".to_string()),
        progress: Set(progress),
        target: Set(target),
        created_at: Set(stamp.clone()),
        updated_at: Set(stamp),
    }
    .insert(state.db())
    .await
    .unwrap();
}

#[tokio::test]
async fn test_achievements_show_progress() {
    let state = setup_test_state().await;
    new_user(&state, "alice").await;
    new_user(&state, "bob").await;

    insert_achievement(&state, "a", "alice", Some(3), 4).await;
    insert_achievement(&state, "b", "alice", Some(9), 5).await;
    insert_achievement(&state, "c", "alice", None, 0).await;
    insert_achievement(&state, "d", "bob", Some(1), 1).await;

    let views = achievement_service::list_achievements(&state, "alice")
        .await
        .unwrap();
    assert_eq!(views.len(), 3);

    let by_id = |id: &str| {
        views
            .iter()
            .find(|v| v.achievement.id == id)
            .expect("achievement listed")
    };
    assert_eq!(by_id("a").progress_fraction, Some(0.75));
    assert!(!by_id("a").unlocked);
    assert_eq!(by_id("b").progress_fraction, Some(1.0));
    assert!(by_id("b").unlocked);
    assert_eq!(by_id("c").progress_fraction, None);
    assert!(!by_id("c").unlocked);

    assert!(
        achievement_service::list_achievements(&state, "carol")
            .await
            .unwrap()
            .is_empty()
    );
}
