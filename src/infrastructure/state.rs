//! Application state containing repositories and shared resources

use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use crate::domain::{
    AchievementRepository, GoalRepository, HabitRepository, ProfileRepository, SessionEvent,
    SessionRegistry, TeamRepository, TemplateRepository,
};
use crate::infrastructure::{
    SeaOrmAchievementRepository, SeaOrmGoalRepository, SeaOrmHabitRepository,
    SeaOrmProfileRepository, SeaOrmTeamRepository, SeaOrmTemplateRepository,
};

const EVENT_CHANNEL_CAPACITY: usize = 256;
const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    pub profile_repo: Arc<dyn ProfileRepository>,
    pub habit_repo: Arc<dyn HabitRepository>,
    pub team_repo: Arc<dyn TeamRepository>,
    pub goal_repo: Arc<dyn GoalRepository>,
    pub template_repo: Arc<dyn TemplateRepository>,
    pub achievement_repo: Arc<dyn AchievementRepository>,
    /// Active timed sessions, one per user
    pub sessions: Arc<SessionRegistry>,
    /// Completion notifications for countdown-driven completions
    pub events: broadcast::Sender<SessionEvent>,
    /// Countdown period. `None` disables the driver task; sessions then
    /// only advance through explicit ticks.
    pub tick_interval: Option<Duration>,
}

impl AppState {
    /// Create a new AppState with all repositories initialized
    pub fn new(db: DatabaseConnection) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            profile_repo: Arc::new(SeaOrmProfileRepository::new(db.clone())),
            habit_repo: Arc::new(SeaOrmHabitRepository::new(db.clone())),
            team_repo: Arc::new(SeaOrmTeamRepository::new(db.clone())),
            goal_repo: Arc::new(SeaOrmGoalRepository::new(db.clone())),
            template_repo: Arc::new(SeaOrmTemplateRepository::new(db.clone())),
            achievement_repo: Arc::new(SeaOrmAchievementRepository::new(db.clone())),
            sessions: Arc::new(SessionRegistry::new()),
            events,
            tick_interval: Some(DEFAULT_TICK),
            db,
        }
    }

    pub fn with_tick_interval(mut self, tick_interval: Option<Duration>) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

// Implement FromRef to allow extracting DatabaseConnection from AppState
impl axum::extract::FromRef<AppState> for DatabaseConnection {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}
