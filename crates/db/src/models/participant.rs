//! Ride participant (booking) entity and its request DTOs.

use carpool_core::status::StatusId;
use carpool_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `ride_participants` table: one rider's booking on a ride.
///
/// `status_id` references the `participant_statuses` lookup table
/// (1 pending, 2 confirmed, 3 cancelled, 4 completed). Bookings are never
/// physically deleted.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Participant {
    pub id: DbId,
    pub ride_id: DbId,
    pub user_id: DbId,
    pub seats: i32,
    pub status_id: StatusId,
    pub notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for `POST /api/v1/rides/{id}/join`. The rider is the authenticated
/// caller; new bookings always start PENDING.
#[derive(Debug, Deserialize, Validate)]
pub struct JoinRide {
    #[validate(range(min = 1, message = "seats must be at least 1"))]
    pub seats: i32,
    pub notes: Option<String>,
}

/// DTO for `PUT /api/v1/rides/{id}/participants/{participant_id}`.
///
/// `status` is the wire name of the target status (`"CONFIRMED"`,
/// `"CANCELLED"` or `"COMPLETED"`).
#[derive(Debug, Deserialize)]
pub struct UpdateParticipantStatus {
    pub status: String,
}
