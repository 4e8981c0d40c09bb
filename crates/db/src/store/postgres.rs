//! Postgres-backed booking store.
//!
//! Runtime-bound queries (`query_as`) against the `rides` and
//! `ride_participants` tables. The join, status-update, ride-update and
//! cancel paths each run in one transaction that takes a `FOR UPDATE` lock
//! on the ride row before reading any capacity-relevant state, so the
//! read-check-write sequence is serialized per ride.

use std::collections::HashMap;

use async_trait::async_trait;
use carpool_core::booking;
use carpool_core::error::CoreError;
use carpool_core::status::{ParticipantStatus, RideStatus, StatusId};
use carpool_core::types::DbId;
use sqlx::PgPool;

use crate::models::participant::{JoinRide, Participant};
use crate::models::ride::{CreateRide, Ride, RideFilter, UpdateRide};

use super::{
    BookingStore, JoinOutcome, ParticipantUpdateOutcome, RideCancelOutcome, RideUpdateOutcome,
    RideWithParticipants, RiderBooking, StoreError,
};

/// Column list shared across ride queries to avoid repetition.
const RIDE_COLUMNS: &str = "id, driver_id, origin, destination, departure_time, \
    available_seats, price_per_seat_cents, status_id, notes, created_at, updated_at";

/// Column list for `ride_participants` queries.
const PARTICIPANT_COLUMNS: &str =
    "id, ride_id, user_id, seats, status_id, notes, created_at, updated_at";

pub struct PgBookingStore {
    pool: PgPool,
}

impl PgBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch the participants of every ride in `rides` with one query and
    /// zip them back together, preserving ride order.
    async fn attach_participants(
        &self,
        rides: Vec<Ride>,
    ) -> Result<Vec<RideWithParticipants>, StoreError> {
        if rides.is_empty() {
            return Ok(Vec::new());
        }

        let ride_ids: Vec<DbId> = rides.iter().map(|r| r.id).collect();
        let query = format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM ride_participants \
             WHERE ride_id = ANY($1) ORDER BY created_at ASC"
        );
        let participants = sqlx::query_as::<_, Participant>(&query)
            .bind(&ride_ids)
            .fetch_all(&self.pool)
            .await?;

        let mut by_ride: HashMap<DbId, Vec<Participant>> = HashMap::new();
        for p in participants {
            by_ride.entry(p.ride_id).or_default().push(p);
        }

        Ok(rides
            .into_iter()
            .map(|ride| {
                let participants = by_ride.remove(&ride.id).unwrap_or_default();
                RideWithParticipants { ride, participants }
            })
            .collect())
    }
}

/// Sum of seats currently counting against the ride's capacity. Must be
/// called with the ride row locked.
async fn committed_seats(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    ride_id: DbId,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COALESCE(SUM(seats), 0) FROM ride_participants \
         WHERE ride_id = $1 AND status_id <> $2",
    )
    .bind(ride_id)
    .bind(ParticipantStatus::Cancelled.id())
    .fetch_one(&mut **tx)
    .await
}

fn ride_status(status_id: StatusId) -> Result<RideStatus, StoreError> {
    RideStatus::from_id(status_id)
        .ok_or_else(|| StoreError::from(format!("unknown ride status id {status_id}")))
}

fn participant_status(status_id: StatusId) -> Result<ParticipantStatus, StoreError> {
    ParticipantStatus::from_id(status_id)
        .ok_or_else(|| StoreError::from(format!("unknown participant status id {status_id}")))
}

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn create_ride(
        &self,
        driver_id: DbId,
        input: &CreateRide,
    ) -> Result<Ride, StoreError> {
        let query = format!(
            "INSERT INTO rides \
                (driver_id, origin, destination, departure_time, available_seats, \
                 price_per_seat_cents, status_id, notes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {RIDE_COLUMNS}"
        );
        let ride = sqlx::query_as::<_, Ride>(&query)
            .bind(driver_id)
            .bind(&input.origin)
            .bind(&input.destination)
            .bind(input.departure_time)
            .bind(input.available_seats)
            .bind(input.price_per_seat_cents)
            .bind(RideStatus::Active.id())
            .bind(&input.notes)
            .fetch_one(&self.pool)
            .await?;
        Ok(ride)
    }

    async fn get_ride(&self, id: DbId) -> Result<Option<Ride>, StoreError> {
        let query = format!("SELECT {RIDE_COLUMNS} FROM rides WHERE id = $1");
        let ride = sqlx::query_as::<_, Ride>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(ride)
    }

    async fn get_ride_detail(
        &self,
        id: DbId,
    ) -> Result<Option<RideWithParticipants>, StoreError> {
        let Some(ride) = self.get_ride(id).await? else {
            return Ok(None);
        };
        let mut details = self.attach_participants(vec![ride]).await?;
        Ok(details.pop())
    }

    async fn list_rides(
        &self,
        filter: &RideFilter,
    ) -> Result<Vec<RideWithParticipants>, StoreError> {
        let query = format!(
            "SELECT {RIDE_COLUMNS} FROM rides \
             WHERE ($1::smallint IS NULL OR status_id = $1) \
               AND ($2::text IS NULL OR origin ILIKE '%' || $2 || '%') \
               AND ($3::text IS NULL OR destination ILIKE '%' || $3 || '%') \
               AND ($4::date IS NULL OR (departure_time >= $4::date \
                    AND departure_time < ($4::date + INTERVAL '1 day'))) \
             ORDER BY departure_time ASC"
        );
        let rides = sqlx::query_as::<_, Ride>(&query)
            .bind(filter.status_id)
            .bind(&filter.origin)
            .bind(&filter.destination)
            .bind(filter.date)
            .fetch_all(&self.pool)
            .await?;
        self.attach_participants(rides).await
    }

    async fn list_rides_by_driver(
        &self,
        driver_id: DbId,
    ) -> Result<Vec<RideWithParticipants>, StoreError> {
        let query = format!(
            "SELECT {RIDE_COLUMNS} FROM rides \
             WHERE driver_id = $1 ORDER BY departure_time ASC"
        );
        let rides = sqlx::query_as::<_, Ride>(&query)
            .bind(driver_id)
            .fetch_all(&self.pool)
            .await?;
        self.attach_participants(rides).await
    }

    async fn list_bookings_by_rider(
        &self,
        user_id: DbId,
    ) -> Result<Vec<RiderBooking>, StoreError> {
        let query = format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM ride_participants \
             WHERE user_id = $1 ORDER BY created_at DESC"
        );
        let participants = sqlx::query_as::<_, Participant>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        if participants.is_empty() {
            return Ok(Vec::new());
        }

        let ride_ids: Vec<DbId> = participants.iter().map(|p| p.ride_id).collect();
        let query = format!("SELECT {RIDE_COLUMNS} FROM rides WHERE id = ANY($1)");
        let rides = sqlx::query_as::<_, Ride>(&query)
            .bind(&ride_ids)
            .fetch_all(&self.pool)
            .await?;
        let by_id: HashMap<DbId, Ride> = rides.into_iter().map(|r| (r.id, r)).collect();

        let mut bookings = Vec::with_capacity(participants.len());
        for participant in participants {
            let ride = by_id.get(&participant.ride_id).cloned().ok_or_else(|| {
                StoreError::from(format!(
                    "participant {} references missing ride {}",
                    participant.id, participant.ride_id
                ))
            })?;
            bookings.push(RiderBooking { ride, participant });
        }
        Ok(bookings)
    }

    async fn update_ride(
        &self,
        id: DbId,
        input: &UpdateRide,
    ) -> Result<RideUpdateOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let query = format!("SELECT {RIDE_COLUMNS} FROM rides WHERE id = $1 FOR UPDATE");
        let Some(ride) = sqlx::query_as::<_, Ride>(&query)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(RideUpdateOutcome::NotFound);
        };

        if ride_status(ride.status_id)? != RideStatus::Active {
            return Ok(RideUpdateOutcome::NotActive {
                status_id: ride.status_id,
            });
        }

        // Seat reduction must not undercut already-booked seats; the sum is
        // read under the same row lock that serializes joins.
        if let Some(new_seats) = input.available_seats {
            let committed = committed_seats(&mut tx, id).await?;
            if booking::check_seat_reduction(new_seats, committed).is_err() {
                return Ok(RideUpdateOutcome::SeatsBelowCommitted { committed });
            }
        }

        let query = format!(
            "UPDATE rides SET \
                origin = COALESCE($2, origin), \
                destination = COALESCE($3, destination), \
                departure_time = COALESCE($4, departure_time), \
                available_seats = COALESCE($5, available_seats), \
                price_per_seat_cents = COALESCE($6, price_per_seat_cents), \
                notes = COALESCE($7, notes), \
                updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {RIDE_COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Ride>(&query)
            .bind(id)
            .bind(&input.origin)
            .bind(&input.destination)
            .bind(input.departure_time)
            .bind(input.available_seats)
            .bind(input.price_per_seat_cents)
            .bind(&input.notes)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(RideUpdateOutcome::Updated(updated))
    }

    async fn cancel_ride(&self, id: DbId) -> Result<RideCancelOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let Some(status_id) =
            sqlx::query_scalar::<_, StatusId>("SELECT status_id FROM rides WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
        else {
            return Ok(RideCancelOutcome::NotFound);
        };

        if !ride_status(status_id)?.can_transition_to(RideStatus::Cancelled) {
            return Ok(RideCancelOutcome::NotActive { status_id });
        }

        sqlx::query("UPDATE rides SET status_id = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(RideStatus::Cancelled.id())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(RideCancelOutcome::Cancelled)
    }

    async fn join_ride(
        &self,
        ride_id: DbId,
        user_id: DbId,
        input: &JoinRide,
    ) -> Result<JoinOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Lock the ride row: every concurrent join on this ride queues here.
        let query = format!("SELECT {RIDE_COLUMNS} FROM rides WHERE id = $1 FOR UPDATE");
        let Some(ride) = sqlx::query_as::<_, Ride>(&query)
            .bind(ride_id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(JoinOutcome::RideNotFound);
        };

        if ride_status(ride.status_id)? != RideStatus::Active {
            return Ok(JoinOutcome::RideNotActive {
                status_id: ride.status_id,
            });
        }

        let existing = sqlx::query_scalar::<_, DbId>(
            "SELECT id FROM ride_participants \
             WHERE ride_id = $1 AND user_id = $2 AND status_id <> $3 LIMIT 1",
        )
        .bind(ride_id)
        .bind(user_id)
        .bind(ParticipantStatus::Cancelled.id())
        .fetch_optional(&mut *tx)
        .await?;
        if existing.is_some() {
            return Ok(JoinOutcome::AlreadyJoined);
        }

        let taken = committed_seats(&mut tx, ride_id).await?;
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

        let query = format!(
            "INSERT INTO ride_participants (ride_id, user_id, seats, status_id, notes) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {PARTICIPANT_COLUMNS}"
        );
        let participant = sqlx::query_as::<_, Participant>(&query)
            .bind(ride_id)
            .bind(user_id)
            .bind(input.seats)
            .bind(ParticipantStatus::Pending.id())
            .bind(&input.notes)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(JoinOutcome::Joined(participant))
    }

    async fn find_participant(
        &self,
        ride_id: DbId,
        participant_id: DbId,
    ) -> Result<Option<Participant>, StoreError> {
        let query = format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM ride_participants \
             WHERE id = $1 AND ride_id = $2"
        );
        let participant = sqlx::query_as::<_, Participant>(&query)
            .bind(participant_id)
            .bind(ride_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(participant)
    }

    async fn update_participant_status(
        &self,
        ride_id: DbId,
        participant_id: DbId,
        to: ParticipantStatus,
    ) -> Result<ParticipantUpdateOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Lock the ride first (same order as join_ride, avoids deadlock);
        // a CANCELLED transition frees seats, so it must serialize with the
        // capacity check.
        let Some(ride_status_id) =
            sqlx::query_scalar::<_, StatusId>("SELECT status_id FROM rides WHERE id = $1 FOR UPDATE")
                .bind(ride_id)
                .fetch_optional(&mut *tx)
                .await?
        else {
            return Ok(ParticipantUpdateOutcome::NotFound);
        };

        let query = format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM ride_participants \
             WHERE id = $1 AND ride_id = $2"
        );
        let Some(current) = sqlx::query_as::<_, Participant>(&query)
            .bind(participant_id)
            .bind(ride_id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(ParticipantUpdateOutcome::NotFound);
        };

        let from = participant_status(current.status_id)?;
        if booking::check_transition(from, to).is_err() {
            return Ok(ParticipantUpdateOutcome::InvalidTransition { from, to });
        }

        let query = format!(
            "UPDATE ride_participants SET status_id = $2, updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {PARTICIPANT_COLUMNS}"
        );
        let participant = sqlx::query_as::<_, Participant>(&query)
            .bind(participant_id)
            .bind(to.id())
            .fetch_one(&mut *tx)
            .await?;

        // When the last CONFIRMED booking completes, the ride completes too,
        // inside this same transaction.
        let mut ride_completed = false;
        if to == ParticipantStatus::Completed
            && ride_status(ride_status_id)?.can_transition_to(RideStatus::Completed)
        {
            let confirmed = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM ride_participants \
                 WHERE ride_id = $1 AND status_id = $2",
            )
            .bind(ride_id)
            .bind(ParticipantStatus::Confirmed.id())
            .fetch_one(&mut *tx)
            .await?;

            if booking::ride_auto_completes(confirmed) {
                sqlx::query(
                    "UPDATE rides SET status_id = $2, updated_at = NOW() WHERE id = $1",
                )
                .bind(ride_id)
                .bind(RideStatus::Completed.id())
                .execute(&mut *tx)
                .await?;
                ride_completed = true;
                tracing::debug!(ride_id = %ride_id, "Last confirmed booking finished, ride completed");
            }
        }

        tx.commit().await?;
        Ok(ParticipantUpdateOutcome::Updated {
            participant,
            ride_completed,
        })
    }
}
