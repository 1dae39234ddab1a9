//! Domain layer - Pure business abstractions
//!
//! This layer contains NO framework dependencies (no SeaORM, no Axum).
//! Only value types, trait definitions, the in-memory session registry
//! and domain error types.

pub mod errors;
pub mod repositories;
pub mod session;
pub mod values;

pub use errors::DomainError;
pub use repositories::*;
pub use session::{SessionEvent, SessionRegistry, SessionSnapshot, TickOutcome};
pub use values::{Frequency, NotificationPreferences, StaleView, TeamRole, parse_utc_offset};
