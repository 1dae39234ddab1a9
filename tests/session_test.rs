use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use std::sync::Arc;
use std::time::Duration;

use habitquest::db;
use habitquest::domain::{
    DomainError, LeaderboardEntry, Profile, ProfileRepository, ProfileUpdate, SessionEvent,
    TickOutcome,
};
use habitquest::infrastructure::AppState;
use habitquest::models::{habit, habit_log, profile};
use habitquest::services::habit_service::{self, HabitForm};
use habitquest::services::{profile_service, session_service};

async fn setup_test_state() -> AppState {
    let db = db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB");
    AppState::new(db).with_tick_interval(None)
}

/// User with `coins` and a one-minute habit
async fn user_with_habit(state: &AppState, user_id: &str, coins: i64) -> String {
    profile_service::ensure_profile(state, user_id, None)
        .await
        .unwrap();
    profile::Entity::update_many()
        .col_expr(profile::Column::Coins, Expr::value(coins))
        .filter(profile::Column::Id.eq(user_id))
        .exec(state.db())
        .await
        .unwrap();

    let form = HabitForm {
        title: Some("Plank".to_string()),
        duration_minutes: Some(1),
        ..Default::default()
    };
    habit_service::create_habit(state, user_id, form)
        .await
        .unwrap()
        .value
        .id
}

async fn set_streak(state: &AppState, habit_id: &str, streak: i32) {
    habit::Entity::update_many()
        .col_expr(habit::Column::Streak, Expr::value(streak))
        .col_expr(
            habit::Column::LastCompletionDate,
            Expr::value(Some(chrono::Utc::now().to_rfc3339())),
        )
        .filter(habit::Column::Id.eq(habit_id))
        .exec(state.db())
        .await
        .unwrap();
}

async fn coins(state: &AppState, user_id: &str) -> i64 {
    state
        .profile_repo
        .find_by_id(user_id)
        .await
        .unwrap()
        .unwrap()
        .coins
}

#[tokio::test]
async fn test_sixty_ticks_complete_exactly_once() {
    let state = setup_test_state().await;
    let habit_id = user_with_habit(&state, "alice", 100).await;
    set_streak(&state, &habit_id, 2).await;

    let started = session_service::start_session(&state, "alice", &habit_id)
        .await
        .unwrap();
    assert_eq!(started.value.remaining_secs, 60);

    for _ in 0..59 {
        let outcome = session_service::tick(&state, "alice").await.unwrap();
        assert!(matches!(outcome, TickOutcome::Running { .. }));
    }
    let last = session_service::tick(&state, "alice").await.unwrap();
    assert_eq!(
        last,
        TickOutcome::Elapsed {
            habit_id: habit_id.clone()
        }
    );

    let habit = state.habit_repo.find_by_id(&habit_id).await.unwrap().unwrap();
    assert_eq!(habit.streak, 3);
    assert_eq!(habit.total_completions, 1);
    assert!(habit.last_completion_date.is_some());
    assert_eq!(coins(&state, "alice").await, 110);

    // Destroyed: further ticks do nothing
    assert_eq!(
        session_service::tick(&state, "alice").await.unwrap(),
        TickOutcome::Idle
    );
    assert!(session_service::session_status(&state, "alice").is_none());

    let logs = habit_log::Entity::find()
        .filter(habit_log::Column::HabitId.eq(habit_id.as_str()))
        .count(state.db())
        .await
        .unwrap();
    assert_eq!(logs, 1);
    assert_eq!(coins(&state, "alice").await, 110);
}

#[tokio::test]
async fn test_second_start_is_rejected() {
    let state = setup_test_state().await;
    let habit_id = user_with_habit(&state, "alice", 0).await;

    session_service::start_session(&state, "alice", &habit_id)
        .await
        .unwrap();
    for _ in 0..10 {
        session_service::tick(&state, "alice").await.unwrap();
    }

    let err = session_service::start_session(&state, "alice", &habit_id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::SessionAlreadyActive { .. }));
    assert_eq!(
        session_service::session_status(&state, "alice")
            .unwrap()
            .remaining_secs,
        50
    );
}

#[tokio::test]
async fn test_cancel_changes_nothing() {
    let state = setup_test_state().await;
    let habit_id = user_with_habit(&state, "alice", 30).await;

    session_service::start_session(&state, "alice", &habit_id)
        .await
        .unwrap();
    for _ in 0..59 {
        session_service::tick(&state, "alice").await.unwrap();
    }
    let cancelled = session_service::cancel_session(&state, "alice").unwrap();
    assert_eq!(cancelled.value.remaining_secs, 1);

    assert_eq!(
        session_service::tick(&state, "alice").await.unwrap(),
        TickOutcome::Idle
    );
    let habit = state.habit_repo.find_by_id(&habit_id).await.unwrap().unwrap();
    assert_eq!(habit.streak, 0);
    assert_eq!(habit.total_completions, 0);
    assert!(habit.last_completion_date.is_none());
    assert_eq!(coins(&state, "alice").await, 30);

    let err = session_service::cancel_session(&state, "alice").unwrap_err();
    assert!(matches!(err, DomainError::NoActiveSession));
}

#[tokio::test]
async fn test_cannot_start_session_on_foreign_habit() {
    let state = setup_test_state().await;
    let habit_id = user_with_habit(&state, "alice", 0).await;
    profile_service::ensure_profile(&state, "bob", None)
        .await
        .unwrap();

    let err = session_service::start_session(&state, "bob", &habit_id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));
    assert!(session_service::session_status(&state, "bob").is_none());
}

#[tokio::test]
async fn test_countdown_task_completes_and_publishes() {
    let state = setup_test_state()
        .await
        .with_tick_interval(Some(Duration::from_millis(1)));
    let habit_id = user_with_habit(&state, "alice", 5).await;
    let mut events = state.subscribe();

    session_service::start_session(&state, "alice", &habit_id)
        .await
        .unwrap();

    let event = tokio::time::timeout(Duration::from_secs(10), events.recv())
        .await
        .expect("countdown did not finish")
        .unwrap();
    match event {
        SessionEvent::Completed {
            user_id,
            habit_id: done,
            streak,
            coins_awarded,
        } => {
            assert_eq!(user_id, "alice");
            assert_eq!(done, habit_id);
            assert_eq!(streak, 1);
            assert_eq!(coins_awarded, 10);
        }
        other => panic!("unexpected event: {:?}", other),
    }

    assert!(session_service::session_status(&state, "alice").is_none());
    assert_eq!(coins(&state, "alice").await, 15);
}

#[tokio::test]
async fn test_cancelled_countdown_never_completes() {
    let state = setup_test_state()
        .await
        .with_tick_interval(Some(Duration::from_millis(5)));
    let habit_id = user_with_habit(&state, "alice", 0).await;
    let mut events = state.subscribe();

    session_service::start_session(&state, "alice", &habit_id)
        .await
        .unwrap();
    session_service::cancel_session(&state, "alice").unwrap();

    // Longer than the 60 × 5ms a live countdown would need
    tokio::time::sleep(Duration::from_millis(600)).await;

    assert!(events.try_recv().is_err());
    let habit = state.habit_repo.find_by_id(&habit_id).await.unwrap().unwrap();
    assert_eq!(habit.streak, 0);
    assert_eq!(coins(&state, "alice").await, 0);
}

/// Profile store whose coin credit always fails
struct CreditFails(Arc<dyn ProfileRepository>);

#[async_trait]
impl ProfileRepository for CreditFails {
    async fn find_by_id(&self, id: &str) -> Result<Option<Profile>, DomainError> {
        self.0.find_by_id(id).await
    }

    async fn provision(&self, id: &str, username: &str) -> Result<Profile, DomainError> {
        self.0.provision(id, username).await
    }

    async fn update(&self, id: &str, update: ProfileUpdate) -> Result<Profile, DomainError> {
        self.0.update(id, update).await
    }

    async fn credit_coins(&self, _id: &str, _amount: i64) -> Result<Profile, DomainError> {
        Err(DomainError::Database("connection reset".to_string()))
    }

    async fn debit_coins(&self, id: &str, amount: i64) -> Result<Profile, DomainError> {
        self.0.debit_coins(id, amount).await
    }

    async fn leaderboard(&self, limit: u64) -> Result<Vec<LeaderboardEntry>, DomainError> {
        self.0.leaderboard(limit).await
    }
}

#[tokio::test]
async fn test_failed_reward_keeps_completion() {
    let mut state = setup_test_state().await;
    let habit_id = user_with_habit(&state, "alice", 40).await;
    state.profile_repo = Arc::new(CreditFails(state.profile_repo.clone()));
    let mut events = state.subscribe();

    let err = session_service::complete_session(&state, "alice", &habit_id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::PartiallyApplied(_)));
    assert!(err.to_string().contains("could not be credited"));

    // The habit step stands, the reward does not
    let habit = state.habit_repo.find_by_id(&habit_id).await.unwrap().unwrap();
    assert_eq!(habit.streak, 1);
    assert_eq!(habit.total_completions, 1);
    assert_eq!(coins(&state, "alice").await, 40);

    assert!(matches!(
        events.try_recv(),
        Ok(SessionEvent::CompletionFailed { .. })
    ));
}
