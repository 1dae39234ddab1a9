//! Services Layer
//!
//! Business operations on top of the repositories in `AppState`. Handlers
//! stay thin: they extract input, call one service function and map the
//! result. Every mutating operation returns a [`Mutation`] naming the
//! read-views it made stale.

pub mod achievement_service;
pub mod economy_service;
pub mod habit_service;
pub mod onboarding_service;
pub mod profile_service;
pub mod session_service;
pub mod stats_service;

use crate::domain::StaleView;

/// Outcome of a successful write
#[derive(Debug, Clone)]
pub struct Mutation<T> {
    pub value: T,
    /// Human-readable confirmation
    pub message: String,
    /// Views the caller should refetch
    pub stale: Vec<StaleView>,
}

impl<T> Mutation<T> {
    pub fn new(value: T, message: impl Into<String>, stale: &[StaleView]) -> Self {
        Self {
            value,
            message: message.into(),
            stale: stale.to_vec(),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Mutation<U> {
        Mutation {
            value: f(self.value),
            message: self.message,
            stale: self.stale,
        }
    }
}
