//! In-memory booking store.
//!
//! A faithful stand-in for the Postgres store: one async mutex plays the
//! role of the ride row lock, making each operation atomic, and the same
//! `carpool_core::booking` rules decide admission. Used by unit and
//! integration tests so the whole HTTP surface runs without a database.

use std::collections::HashMap;

use async_trait::async_trait;
use carpool_core::booking;
use carpool_core::error::CoreError;
use carpool_core::status::{ParticipantStatus, RideStatus};
use carpool_core::types::DbId;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::participant::{JoinRide, Participant};
use crate::models::ride::{CreateRide, Ride, RideFilter, UpdateRide};

use super::{
    BookingStore, JoinOutcome, ParticipantUpdateOutcome, RideCancelOutcome, RideUpdateOutcome,
    RideWithParticipants, RiderBooking, StoreError,
};

#[derive(Default)]
struct Inner {
    rides: HashMap<DbId, Ride>,
    /// Insertion-ordered, mirroring `ORDER BY created_at ASC`.
    participants: Vec<Participant>,
}

#[derive(Default)]
pub struct MemoryBookingStore {
    inner: Mutex<Inner>,
}

impl MemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Inner {
    fn participants_of(&self, ride_id: DbId) -> Vec<Participant> {
        self.participants
            .iter()
            .filter(|p| p.ride_id == ride_id)
            .cloned()
            .collect()
    }

    fn committed_seats(&self, ride_id: DbId) -> i64 {
        let pairs: Vec<_> = self
            .participants
            .iter()
            .filter(|p| p.ride_id == ride_id)
            .map(|p| (p.status_id, p.seats))
            .collect();
        booking::seats_taken(&pairs)
    }

    fn detail(&self, ride: &Ride) -> RideWithParticipants {
        RideWithParticipants {
            ride: ride.clone(),
            participants: self.participants_of(ride.id),
        }
    }
}

fn matches_filter(ride: &Ride, filter: &RideFilter) -> bool {
    if let Some(status_id) = filter.status_id {
        if ride.status_id != status_id {
            return false;
        }
    }
    if let Some(origin) = &filter.origin {
        if !ride.origin.to_lowercase().contains(&origin.to_lowercase()) {
            return false;
        }
    }
    if let Some(destination) = &filter.destination {
        if !ride
            .destination
            .to_lowercase()
            .contains(&destination.to_lowercase())
        {
            return false;
        }
    }
    if let Some(date) = filter.date {
        if ride.departure_time.date_naive() != date {
            return false;
        }
    }
    true
}

#[async_trait]
impl BookingStore for MemoryBookingStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn create_ride(
        &self,
        driver_id: DbId,
        input: &CreateRide,
    ) -> Result<Ride, StoreError> {
        let mut inner = self.inner.lock().await;
        let now = Utc::now();
        let ride = Ride {
            id: Uuid::new_v4(),
            driver_id,
            origin: input.origin.clone(),
            destination: input.destination.clone(),
            departure_time: input.departure_time,
            available_seats: input.available_seats,
            price_per_seat_cents: input.price_per_seat_cents,
            status_id: RideStatus::Active.id(),
            notes: input.notes.clone(),
            created_at: now,
            updated_at: now,
        };
        inner.rides.insert(ride.id, ride.clone());
        Ok(ride)
    }

    async fn get_ride(&self, id: DbId) -> Result<Option<Ride>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.rides.get(&id).cloned())
    }

    async fn get_ride_detail(
        &self,
        id: DbId,
    ) -> Result<Option<RideWithParticipants>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner.rides.get(&id).map(|ride| inner.detail(ride)))
    }

    async fn list_rides(
        &self,
        filter: &RideFilter,
    ) -> Result<Vec<RideWithParticipants>, StoreError> {
        let inner = self.inner.lock().await;
        let mut details: Vec<RideWithParticipants> = inner
            .rides
            .values()
            .filter(|r| matches_filter(r, filter))
            .map(|r| inner.detail(r))
            .collect();
        details.sort_by_key(|d| d.ride.departure_time);
        Ok(details)
    }

    async fn list_rides_by_driver(
        &self,
        driver_id: DbId,
    ) -> Result<Vec<RideWithParticipants>, StoreError> {
        let inner = self.inner.lock().await;
        let mut details: Vec<RideWithParticipants> = inner
            .rides
            .values()
            .filter(|r| r.driver_id == driver_id)
            .map(|r| inner.detail(r))
            .collect();
        details.sort_by_key(|d| d.ride.departure_time);
        Ok(details)
    }

    async fn list_bookings_by_rider(
        &self,
        user_id: DbId,
    ) -> Result<Vec<RiderBooking>, StoreError> {
        let inner = self.inner.lock().await;
        let mut bookings = Vec::new();
        // Most recent booking first.
        for participant in inner.participants.iter().rev() {
            if participant.user_id != user_id {
                continue;
            }
            let ride = inner.rides.get(&participant.ride_id).cloned().ok_or_else(|| {
                StoreError::from(format!(
                    "participant {} references missing ride {}",
                    participant.id, participant.ride_id
                ))
            })?;
            bookings.push(RiderBooking {
                ride,
                participant: participant.clone(),
            });
        }
        Ok(bookings)
    }

    async fn update_ride(
        &self,
        id: DbId,
        input: &UpdateRide,
    ) -> Result<RideUpdateOutcome, StoreError> {
        let mut inner = self.inner.lock().await;

        let Some(ride) = inner.rides.get(&id).cloned() else {
            return Ok(RideUpdateOutcome::NotFound);
        };
        if ride.status_id != RideStatus::Active.id() {
            return Ok(RideUpdateOutcome::NotActive {
                status_id: ride.status_id,
            });
        }

        if let Some(new_seats) = input.available_seats {
            let committed = inner.committed_seats(id);
            if booking::check_seat_reduction(new_seats, committed).is_err() {
                return Ok(RideUpdateOutcome::SeatsBelowCommitted { committed });
            }
        }

        let Some(ride) = inner.rides.get_mut(&id) else {
            return Ok(RideUpdateOutcome::NotFound);
        };
        if let Some(origin) = &input.origin {
            ride.origin = origin.clone();
        }
        if let Some(destination) = &input.destination {
            ride.destination = destination.clone();
        }
        if let Some(departure_time) = input.departure_time {
            ride.departure_time = departure_time;
        }
        if let Some(available_seats) = input.available_seats {
            ride.available_seats = available_seats;
        }
        if let Some(price) = input.price_per_seat_cents {
            ride.price_per_seat_cents = price;
        }
        if let Some(notes) = &input.notes {
            ride.notes = Some(notes.clone());
        }
        ride.updated_at = Utc::now();
        Ok(RideUpdateOutcome::Updated(ride.clone()))
    }

    async fn cancel_ride(&self, id: DbId) -> Result<RideCancelOutcome, StoreError> {
        let mut inner = self.inner.lock().await;
        let Some(ride) = inner.rides.get_mut(&id) else {
            return Ok(RideCancelOutcome::NotFound);
        };
        let cancellable = RideStatus::from_id(ride.status_id)
            .is_some_and(|s| s.can_transition_to(RideStatus::Cancelled));
        if !cancellable {
            return Ok(RideCancelOutcome::NotActive {
                status_id: ride.status_id,
            });
        }
        ride.status_id = RideStatus::Cancelled.id();
        ride.updated_at = Utc::now();
        Ok(RideCancelOutcome::Cancelled)
    }

    async fn join_ride(
        &self,
        ride_id: DbId,
        user_id: DbId,
        input: &JoinRide,
    ) -> Result<JoinOutcome, StoreError> {
        // The Postgres table enforces CHECK (seats >= 1); keep the two
        // implementations in agreement.
        if input.seats < 1 {
            return Err(StoreError::from(format!(
                "seats must be at least 1, got {}",
                input.seats
            )));
        }

        // One lock for the whole read-check-write sequence.
        let mut inner = self.inner.lock().await;

        let Some(ride) = inner.rides.get(&ride_id).cloned() else {
            return Ok(JoinOutcome::RideNotFound);
        };
        if ride.status_id != RideStatus::Active.id() {
            return Ok(JoinOutcome::RideNotActive {
                status_id: ride.status_id,
            });
        }

        let already = inner.participants.iter().any(|p| {
            p.ride_id == ride_id
                && p.user_id == user_id
                && p.status_id != ParticipantStatus::Cancelled.id()
        });
        if already {
            return Ok(JoinOutcome::AlreadyJoined);
        }

        let taken = inner.committed_seats(ride_id);
        if let Err(CoreError::CapacityExceeded {
            requested,
            remaining,
        }) = booking::check_capacity(ride.available_seats, taken, input.seats)
        {
            return Ok(JoinOutcome::CapacityExceeded {
                requested,
                remaining,
            });
        }

        let now = Utc::now();
        let participant = Participant {
            id: Uuid::new_v4(),
            ride_id,
            user_id,
            seats: input.seats,
            status_id: ParticipantStatus::Pending.id(),
            notes: input.notes.clone(),
            created_at: now,
            updated_at: now,
        };
        inner.participants.push(participant.clone());
        Ok(JoinOutcome::Joined(participant))
    }

    async fn find_participant(
        &self,
        ride_id: DbId,
        participant_id: DbId,
    ) -> Result<Option<Participant>, StoreError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .participants
            .iter()
            .find(|p| p.id == participant_id && p.ride_id == ride_id)
            .cloned())
    }

    async fn update_participant_status(
        &self,
        ride_id: DbId,
        participant_id: DbId,
        to: ParticipantStatus,
    ) -> Result<ParticipantUpdateOutcome, StoreError> {
        let mut inner = self.inner.lock().await;

        let Some(ride) = inner.rides.get(&ride_id).cloned() else {
            return Ok(ParticipantUpdateOutcome::NotFound);
        };
        let Some(index) = inner
            .participants
            .iter()
            .position(|p| p.id == participant_id && p.ride_id == ride_id)
        else {
            return Ok(ParticipantUpdateOutcome::NotFound);
        };

        let from = ParticipantStatus::from_id(inner.participants[index].status_id)
            .ok_or_else(|| StoreError::from("unknown participant status id".to_string()))?;
        if booking::check_transition(from, to).is_err() {
            return Ok(ParticipantUpdateOutcome::InvalidTransition { from, to });
        }

        inner.participants[index].status_id = to.id();
        inner.participants[index].updated_at = Utc::now();
        let participant = inner.participants[index].clone();

        let mut ride_completed = false;
        if to == ParticipantStatus::Completed && ride.status_id == RideStatus::Active.id() {
            let confirmed = inner
                .participants
                .iter()
                .filter(|p| {
                    p.ride_id == ride_id && p.status_id == ParticipantStatus::Confirmed.id()
                })
                .count() as i64;
            if booking::ride_auto_completes(confirmed) {
                if let Some(ride) = inner.rides.get_mut(&ride_id) {
                    ride.status_id = RideStatus::Completed.id();
                    ride.updated_at = Utc::now();
                    ride_completed = true;
                }
            }
        }

        Ok(ParticipantUpdateOutcome::Updated {
            participant,
            ride_completed,
        })
    }
}
