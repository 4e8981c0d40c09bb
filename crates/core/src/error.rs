use crate::status::{ParticipantStatus, RideStatus};
use crate::types::DbId;

/// Domain error taxonomy shared by the store implementations and the API.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Ride is {status}, expected ACTIVE")]
    RideNotActive { status: RideStatus },

    #[error("Not enough seats available: {requested} requested, {remaining} remaining")]
    CapacityExceeded { requested: i32, remaining: i32 },

    #[error("Available seats cannot drop below the {committed} seat(s) already booked")]
    SeatsBelowCommitted { committed: i64 },

    #[error("Invalid participant transition: {from} -> {to}")]
    InvalidTransition {
        from: ParticipantStatus,
        to: ParticipantStatus,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}
