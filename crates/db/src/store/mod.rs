//! The booking store: an explicit repository interface over rides and
//! participants.
//!
//! Every trait method is one atomic unit. The Postgres implementation uses a
//! transaction with a `SELECT ... FOR UPDATE` row lock on the ride; the
//! in-memory implementation serializes through a single mutex. Both apply
//! the same pure admission rules from `carpool_core::booking`, which is what
//! makes the capacity invariant hold under concurrent joins in either case.
//!
//! Domain rejections (capacity, illegal transitions, missing rows) are data,
//! not errors: they come back as outcome enums so handlers can map them to
//! the HTTP error taxonomy. `Err` is reserved for infrastructure failures.

use async_trait::async_trait;
use carpool_core::status::{ParticipantStatus, StatusId};
use carpool_core::types::DbId;
use serde::Serialize;

use crate::models::participant::{JoinRide, Participant};
use crate::models::ride::{CreateRide, Ride, RideFilter, UpdateRide};

mod memory;
mod postgres;

pub use memory::MemoryBookingStore;
pub use postgres::PgBookingStore;

/// Infrastructure-level store failure (connection loss, corrupt row, ...).
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// A ride together with all of its bookings.
#[derive(Debug, Clone, Serialize)]
pub struct RideWithParticipants {
    #[serde(flatten)]
    pub ride: Ride,
    pub participants: Vec<Participant>,
}

/// One rider's booking joined with the ride it belongs to.
#[derive(Debug, Clone)]
pub struct RiderBooking {
    pub ride: Ride,
    pub participant: Participant,
}

/// Result of a join attempt.
#[derive(Debug)]
pub enum JoinOutcome {
    Joined(Participant),
    RideNotFound,
    RideNotActive { status_id: StatusId },
    /// The rider already has a non-cancelled booking on this ride.
    AlreadyJoined,
    CapacityExceeded { requested: i32, remaining: i32 },
}

/// Result of a partial ride update.
#[derive(Debug)]
pub enum RideUpdateOutcome {
    Updated(Ride),
    NotFound,
    NotActive { status_id: StatusId },
    /// The new seat total is below the committed non-cancelled seat sum.
    SeatsBelowCommitted { committed: i64 },
}

/// Result of a ride cancellation (soft delete).
#[derive(Debug)]
pub enum RideCancelOutcome {
    Cancelled,
    NotFound,
    NotActive { status_id: StatusId },
}

/// Result of a participant status transition.
#[derive(Debug)]
pub enum ParticipantUpdateOutcome {
    Updated {
        participant: Participant,
        /// True when this transition completed the last confirmed booking
        /// and the ride itself flipped to COMPLETED.
        ride_completed: bool,
    },
    NotFound,
    InvalidTransition {
        from: ParticipantStatus,
        to: ParticipantStatus,
    },
}

/// Repository interface for rides and their participants.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Connectivity probe for the readiness endpoint.
    async fn ping(&self) -> Result<(), StoreError>;

    async fn create_ride(&self, driver_id: DbId, input: &CreateRide)
        -> Result<Ride, StoreError>;

    async fn get_ride(&self, id: DbId) -> Result<Option<Ride>, StoreError>;

    async fn get_ride_detail(
        &self,
        id: DbId,
    ) -> Result<Option<RideWithParticipants>, StoreError>;

    /// List rides matching the filter, ordered by departure time ascending.
    async fn list_rides(
        &self,
        filter: &RideFilter,
    ) -> Result<Vec<RideWithParticipants>, StoreError>;

    async fn list_rides_by_driver(
        &self,
        driver_id: DbId,
    ) -> Result<Vec<RideWithParticipants>, StoreError>;

    /// Bookings made by the given rider, most recent first.
    async fn list_bookings_by_rider(
        &self,
        user_id: DbId,
    ) -> Result<Vec<RiderBooking>, StoreError>;

    /// Partial update of an active ride. Atomic with respect to the seat
    /// reduction check: the committed seat sum is read under the same lock
    /// that guards joins.
    async fn update_ride(
        &self,
        id: DbId,
        input: &UpdateRide,
    ) -> Result<RideUpdateOutcome, StoreError>;

    /// Soft-cancel an active ride (ACTIVE -> CANCELLED).
    async fn cancel_ride(&self, id: DbId) -> Result<RideCancelOutcome, StoreError>;

    /// Create a PENDING booking if the ride is active and has capacity.
    ///
    /// The capacity check and the insert are one atomic unit: two
    /// simultaneous joins whose combined seats exceed capacity cannot both
    /// succeed.
    async fn join_ride(
        &self,
        ride_id: DbId,
        user_id: DbId,
        input: &JoinRide,
    ) -> Result<JoinOutcome, StoreError>;

    async fn find_participant(
        &self,
        ride_id: DbId,
        participant_id: DbId,
    ) -> Result<Option<Participant>, StoreError>;

    /// Apply a status transition to a booking. When the transition lands on
    /// COMPLETED and no CONFIRMED bookings remain, the ride flips to
    /// COMPLETED in the same atomic unit.
    async fn update_participant_status(
        &self,
        ride_id: DbId,
        participant_id: DbId,
        to: ParticipantStatus,
    ) -> Result<ParticipantUpdateOutcome, StoreError>;
}
