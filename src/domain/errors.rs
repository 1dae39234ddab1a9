//! Domain error types
//!
//! These errors are framework-agnostic and represent business-level failures.
//! `Display` output is written for end users: the API layer forwards it as-is.

use std::fmt;

#[derive(Debug)]
pub enum DomainError {
    /// Resource not found (carries the resource kind, e.g. "Habit")
    NotFound(&'static str),
    /// Malformed or missing input, rejected before any store call
    Validation(String),
    /// No authenticated user
    Unauthenticated,
    /// Authenticated, but not the owner of the resource
    Forbidden(String),
    /// Coin balance below the price of the action
    InsufficientCoins { required: i64, available: i64 },
    /// The user already has a session running
    SessionAlreadyActive { habit_id: String },
    /// Cancel/complete requested with no running session
    NoActiveSession,
    /// Any other unmet precondition (non-zero streak, duplicate membership...)
    Precondition(String),
    /// First step of a two-step action committed, second step failed
    PartiallyApplied(String),
    /// Database/persistence error
    Database(String),
    /// Generic internal error
    Internal(String),
}

impl DomainError {
    /// Coins still missing for an `InsufficientCoins` error
    pub fn shortfall(&self) -> Option<i64> {
        match self {
            DomainError::InsufficientCoins {
                required,
                available,
            } => Some(required - available),
            _ => None,
        }
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DomainError::NotFound(kind) => write!(f, "{} not found", kind),
            DomainError::Validation(msg) => write!(f, "{}", msg),
            DomainError::Unauthenticated => {
                write!(f, "Not authenticated. Please sign in to continue")
            }
            DomainError::Forbidden(msg) => write!(f, "{}", msg),
            DomainError::InsufficientCoins {
                required,
                available,
            } => write!(
                f,
                "Insufficient coins: you need {} coins but have {} ({} short)",
                required,
                available,
                required - available
            ),
            DomainError::SessionAlreadyActive { .. } => write!(
                f,
                "A session is already active. Finish or cancel it before starting another"
            ),
            DomainError::NoActiveSession => write!(f, "No session is currently active"),
            DomainError::Precondition(msg) => write!(f, "{}", msg),
            DomainError::PartiallyApplied(msg) => write!(f, "{}", msg),
            DomainError::Database(msg) => write!(f, "Database error: {}", msg),
            DomainError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for DomainError {}

// Conversion from SeaORM errors (used in infrastructure layer)
impl From<sea_orm::DbErr> for DomainError {
    fn from(e: sea_orm::DbErr) -> Self {
        DomainError::Database(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_coins_names_the_shortfall() {
        let err = DomainError::InsufficientCoins {
            required: 1000,
            available: 640,
        };
        assert_eq!(err.shortfall(), Some(360));
        assert_eq!(
            err.to_string(),
            "Insufficient coins: you need 1000 coins but have 640 (360 short)"
        );
    }

    #[test]
    fn not_found_uses_resource_kind() {
        assert_eq!(DomainError::NotFound("Team").to_string(), "Team not found");
    }
}
