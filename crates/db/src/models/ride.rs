//! Ride entity and its request DTOs.

use carpool_core::status::StatusId;
use carpool_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A row from the `rides` table.
///
/// `status_id` references the `ride_statuses` lookup table
/// (1 active, 2 completed, 3 cancelled). Rides are never physically
/// deleted; cancellation is a status transition.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Ride {
    pub id: DbId,
    pub driver_id: DbId,
    pub origin: String,
    pub destination: String,
    pub departure_time: Timestamp,
    pub available_seats: i32,
    /// Price per seat in cents. Money is integer cents throughout.
    pub price_per_seat_cents: i64,
    pub status_id: StatusId,
    pub notes: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for `POST /api/v1/rides`. The driver is the authenticated caller.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRide {
    #[validate(length(min = 1, max = 255, message = "origin must not be empty"))]
    pub origin: String,
    #[validate(length(min = 1, max = 255, message = "destination must not be empty"))]
    pub destination: String,
    pub departure_time: Timestamp,
    #[validate(range(min = 1, message = "available_seats must be at least 1"))]
    pub available_seats: i32,
    #[validate(range(min = 1, message = "price_per_seat_cents must be positive"))]
    pub price_per_seat_cents: i64,
    pub notes: Option<String>,
}

/// DTO for `PUT /api/v1/rides/{id}`. Only non-`None` fields are applied.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateRide {
    #[validate(length(min = 1, max = 255, message = "origin must not be empty"))]
    pub origin: Option<String>,
    #[validate(length(min = 1, max = 255, message = "destination must not be empty"))]
    pub destination: Option<String>,
    pub departure_time: Option<Timestamp>,
    #[validate(range(min = 1, message = "available_seats must be at least 1"))]
    pub available_seats: Option<i32>,
    #[validate(range(min = 1, message = "price_per_seat_cents must be positive"))]
    pub price_per_seat_cents: Option<i64>,
    pub notes: Option<String>,
}

/// Query parameters for `GET /api/v1/rides` and `GET /api/v1/rides/search`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RideFilter {
    /// Case-insensitive substring match on origin.
    pub origin: Option<String>,
    /// Case-insensitive substring match on destination.
    pub destination: Option<String>,
    /// Single-day departure window, `YYYY-MM-DD`.
    pub date: Option<chrono::NaiveDate>,
    /// Filter by ride status ID (e.g. 1 = active).
    pub status_id: Option<StatusId>,
}
