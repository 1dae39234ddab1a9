//! In-memory registry of timed habit sessions.
//!
//! At most one session per user. The registry only counts down; it never
//! touches the store. Whoever observes `TickOutcome::Elapsed` owns the
//! completion (the entry is removed in the same step, so exactly one caller
//! can observe it).
//!
//! ```text
//! (none) --start--> Running --tick*--> Elapsed --> (none)
//!                      |
//!                      +--cancel--> (none)
//! ```

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::task::AbortHandle;

use super::DomainError;

/// A running session. The countdown handle is only set when a driver task
/// was spawned for it.
#[derive(Debug)]
struct ActiveSession {
    session_id: u64,
    habit_id: String,
    remaining_secs: u64,
    countdown: Option<AbortHandle>,
}

impl ActiveSession {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id,
            habit_id: self.habit_id.clone(),
            remaining_secs: self.remaining_secs,
        }
    }

    fn stop_countdown(&mut self) {
        if let Some(handle) = self.countdown.take() {
            handle.abort();
        }
    }
}

/// Public view of a running session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    #[serde(skip)]
    pub session_id: u64,
    pub habit_id: String,
    pub remaining_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Still counting down
    Running { remaining_secs: u64 },
    /// Reached zero. The session is gone; the habit must now be completed.
    Elapsed { habit_id: String },
    /// Nothing to tick (no session, or a different session than expected)
    Idle,
}

/// Published after a countdown-driven completion so listeners can refetch.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    Completed {
        user_id: String,
        habit_id: String,
        streak: i32,
        coins_awarded: i64,
    },
    CompletionFailed {
        user_id: String,
        habit_id: String,
        reason: String,
    },
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, ActiveSession>,
    next_id: AtomicU64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session of `duration_minutes` for `user_id`.
    ///
    /// Rejected when the user already has one; the running session is left
    /// exactly as it was.
    pub fn start(
        &self,
        user_id: &str,
        habit_id: &str,
        duration_minutes: i32,
    ) -> Result<SessionSnapshot, DomainError> {
        if duration_minutes <= 0 {
            return Err(DomainError::Validation(
                "Duration must be greater than zero".to_string(),
            ));
        }

        match self.sessions.entry(user_id.to_string()) {
            Entry::Occupied(existing) => Err(DomainError::SessionAlreadyActive {
                habit_id: existing.get().habit_id.clone(),
            }),
            Entry::Vacant(slot) => {
                let session = ActiveSession {
                    session_id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
                    habit_id: habit_id.to_string(),
                    remaining_secs: duration_minutes as u64 * 60,
                    countdown: None,
                };
                let snapshot = session.snapshot();
                slot.insert(session);
                Ok(snapshot)
            }
        }
    }

    /// Attach the driver task of `session_id`. Any older handle is aborted
    /// first. Returns false when the session is already gone, in which case
    /// the driver finds nothing to tick and exits by itself.
    pub fn attach_countdown(&self, user_id: &str, session_id: u64, handle: AbortHandle) -> bool {
        match self.sessions.get_mut(user_id) {
            Some(mut session) if session.session_id == session_id => {
                session.stop_countdown();
                session.countdown = Some(handle);
                true
            }
            _ => false,
        }
    }

    /// Advance the user's session by one second.
    ///
    /// With `only_session`, a different (newer) session is left alone; the
    /// countdown driver uses this so it never ticks a session it did not
    /// start.
    pub fn tick(&self, user_id: &str, only_session: Option<u64>) -> TickOutcome {
        let (session_id, remaining) = {
            let Some(mut session) = self.sessions.get_mut(user_id) else {
                return TickOutcome::Idle;
            };
            if only_session.is_some_and(|id| id != session.session_id) {
                return TickOutcome::Idle;
            }
            session.remaining_secs = session.remaining_secs.saturating_sub(1);
            (session.session_id, session.remaining_secs)
        };

        if remaining > 0 {
            return TickOutcome::Running {
                remaining_secs: remaining,
            };
        }

        // The elapsed entry is removed without aborting its driver: the
        // driver may be the caller, and it exits on its own.
        match self
            .sessions
            .remove_if(user_id, |_, s| s.session_id == session_id)
        {
            Some((_, session)) => TickOutcome::Elapsed {
                habit_id: session.habit_id,
            },
            None => TickOutcome::Idle,
        }
    }

    /// Stop and forget the user's session
    pub fn cancel(&self, user_id: &str) -> Result<SessionSnapshot, DomainError> {
        let (_, mut session) = self
            .sessions
            .remove(user_id)
            .ok_or(DomainError::NoActiveSession)?;
        session.stop_countdown();
        Ok(session.snapshot())
    }

    /// Cancel the user's session only if it targets `habit_id`
    pub fn cancel_for_habit(&self, user_id: &str, habit_id: &str) -> bool {
        match self.sessions.remove_if(user_id, |_, s| s.habit_id == habit_id) {
            Some((_, mut session)) => {
                session.stop_countdown();
                true
            }
            None => false,
        }
    }

    pub fn snapshot(&self, user_id: &str) -> Option<SessionSnapshot> {
        self.sessions.get(user_id).map(|s| s.snapshot())
    }

    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_start_is_rejected_and_keeps_remaining_time() {
        let registry = SessionRegistry::new();
        registry.start("u1", "h1", 1).unwrap();
        registry.tick("u1", None);

        let err = registry.start("u1", "h2", 5).unwrap_err();
        assert!(matches!(err, DomainError::SessionAlreadyActive { .. }));

        let current = registry.snapshot("u1").unwrap();
        assert_eq!(current.habit_id, "h1");
        assert_eq!(current.remaining_secs, 59);
    }

    #[test]
    fn elapses_exactly_once() {
        let registry = SessionRegistry::new();
        registry.start("u1", "h1", 1).unwrap();

        for expected in (1..60).rev() {
            assert_eq!(
                registry.tick("u1", None),
                TickOutcome::Running {
                    remaining_secs: expected
                }
            );
        }
        assert_eq!(
            registry.tick("u1", None),
            TickOutcome::Elapsed {
                habit_id: "h1".to_string()
            }
        );
        assert_eq!(registry.tick("u1", None), TickOutcome::Idle);
        assert!(registry.snapshot("u1").is_none());
    }

    #[test]
    fn cancel_without_session_fails() {
        let registry = SessionRegistry::new();
        assert!(matches!(
            registry.cancel("u1"),
            Err(DomainError::NoActiveSession)
        ));
    }

    #[test]
    fn filtered_tick_ignores_newer_session() {
        let registry = SessionRegistry::new();
        let first = registry.start("u1", "h1", 1).unwrap();
        registry.cancel("u1").unwrap();
        registry.start("u1", "h2", 1).unwrap();

        assert_eq!(registry.tick("u1", Some(first.session_id)), TickOutcome::Idle);
        assert_eq!(registry.snapshot("u1").unwrap().remaining_secs, 60);
    }

    #[test]
    fn sessions_are_per_user() {
        let registry = SessionRegistry::new();
        registry.start("u1", "h1", 1).unwrap();
        registry.start("u2", "h9", 2).unwrap();
        assert_eq!(registry.active_count(), 2);

        assert!(!registry.cancel_for_habit("u1", "h9"));
        assert!(registry.cancel_for_habit("u2", "h9"));
        assert_eq!(registry.active_count(), 1);
    }

    #[test]
    fn zero_duration_is_rejected() {
        let registry = SessionRegistry::new();
        assert!(matches!(
            registry.start("u1", "h1", 0),
            Err(DomainError::Validation(_))
        ));
    }
}
