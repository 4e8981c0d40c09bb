//! Handlers for the `/rides` resource.
//!
//! All endpoints require authentication via [`AuthUser`]. Mutating endpoints
//! additionally require the caller to be the ride's driver.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use validator::Validate;

use carpool_core::error::CoreError;
use carpool_core::status::RideStatus;
use carpool_core::types::{DbId, Timestamp};
use carpool_db::models::ride::{CreateRide, Ride, RideFilter, UpdateRide};
use carpool_db::store::{RideCancelOutcome, RideUpdateOutcome};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

use super::{
    decorate_rides, participant_view, ride_not_active, ride_view, BookingView, RideDetailView,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fetch a ride by ID and verify the caller is its driver.
///
/// Returns `NotFound` if the ride does not exist, `Forbidden` if the caller
/// is not the driver. `action` is used in the error message (e.g. "update",
/// "cancel").
async fn find_owned_ride(
    state: &AppState,
    ride_id: DbId,
    auth: &AuthUser,
    action: &str,
) -> AppResult<Ride> {
    let ride = state
        .store
        .get_ride(ride_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Ride",
            id: ride_id,
        }))?;

    if ride.driver_id != auth.user_id {
        return Err(AppError::Core(CoreError::Forbidden(format!(
            "Cannot {action} another driver's ride"
        ))));
    }

    Ok(ride)
}

fn check_departure_in_future(departure_time: Timestamp) -> AppResult<()> {
    if departure_time <= Utc::now() {
        return Err(AppError::Core(CoreError::Validation(
            "departure_time must be in the future".into(),
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// POST /api/v1/rides
///
/// Create a ride with the authenticated caller as driver. The ride starts
/// ACTIVE. Returns 201 with the created ride.
pub async fn create_ride(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateRide>,
) -> AppResult<impl IntoResponse> {
    input
        .validate()
        .map_err(|e| AppError::Core(CoreError::Validation(e.to_string())))?;
    check_departure_in_future(input.departure_time)?;

    let ride = state.store.create_ride(auth.user_id, &input).await?;

    tracing::info!(
        ride_id = %ride.id,
        driver_id = %auth.user_id,
        available_seats = ride.available_seats,
        "Ride created",
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: ride_view(ride, None),
        }),
    ))
}

// ---------------------------------------------------------------------------
// List / search
// ---------------------------------------------------------------------------

/// GET /api/v1/rides
///
/// List active rides with their participants, decorated with driver
/// profiles.
pub async fn list_rides(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let filter = RideFilter {
        status_id: Some(RideStatus::Active.id()),
        ..Default::default()
    };
    let rides = state.store.list_rides(&filter).await?;
    let data = decorate_rides(&state.identity, rides).await;

    Ok(Json(DataResponse { data }))
}

/// Query parameters for `GET /api/v1/rides/search`.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub origin: Option<String>,
    pub destination: Option<String>,
    /// Single-day departure window, `YYYY-MM-DD`.
    pub date: Option<chrono::NaiveDate>,
}

/// GET /api/v1/rides/search?origin=&destination=&date=
///
/// Search active rides by case-insensitive substring match on origin and
/// destination, optionally restricted to a single departure day.
pub async fn search_rides(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> AppResult<impl IntoResponse> {
    let filter = RideFilter {
        origin: params.origin,
        destination: params.destination,
        date: params.date,
        status_id: Some(RideStatus::Active.id()),
    };
    let rides = state.store.list_rides(&filter).await?;
    let data = decorate_rides(&state.identity, rides).await;

    Ok(Json(DataResponse { data }))
}

/// GET /api/v1/rides/driver/me
///
/// List the authenticated driver's rides, all statuses included.
pub async fn list_driver_rides(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let rides = state.store.list_rides_by_driver(auth.user_id).await?;
    let data = decorate_rides(&state.identity, rides).await;

    Ok(Json(DataResponse { data }))
}

/// GET /api/v1/rides/rider/me
///
/// List the authenticated rider's bookings, most recent first, each with
/// the ride it belongs to.
pub async fn list_rider_bookings(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<impl IntoResponse> {
    let bookings = state.store.list_bookings_by_rider(auth.user_id).await?;

    let data: Vec<BookingView> = bookings
        .into_iter()
        .map(|b| BookingView {
            ride: ride_view(b.ride, None),
            participant: participant_view(b.participant, None),
        })
        .collect();

    Ok(Json(DataResponse { data }))
}

// ---------------------------------------------------------------------------
// Get
// ---------------------------------------------------------------------------

/// GET /api/v1/rides/{id}
///
/// Get a single ride with its participants. Driver and participant profiles
/// are decorated via identity lookup (best-effort).
pub async fn get_ride(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(ride_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let detail = state
        .store
        .get_ride_detail(ride_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Ride",
            id: ride_id,
        }))?;

    let driver = state.identity.find_user(detail.ride.driver_id).await;

    let mut participants = Vec::with_capacity(detail.participants.len());
    for participant in detail.participants {
        let user = state.identity.find_user(participant.user_id).await;
        participants.push(participant_view(participant, user));
    }

    Ok(Json(DataResponse {
        data: RideDetailView {
            ride: ride_view(detail.ride, driver),
            participants,
        },
    }))
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

/// PUT /api/v1/rides/{id}
///
/// Partial update of an active ride. Driver only. Reducing
/// `available_seats` below the committed non-cancelled seat total is
/// rejected with 409.
pub async fn update_ride(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(ride_id): Path<DbId>,
    Json(input): Json<UpdateRide>,
) -> AppResult<impl IntoResponse> {
    input
        .validate()
        .map_err(|e| AppError::Core(CoreError::Validation(e.to_string())))?;
    if let Some(departure_time) = input.departure_time {
        check_departure_in_future(departure_time)?;
    }

    find_owned_ride(&state, ride_id, &auth, "update").await?;

    match state.store.update_ride(ride_id, &input).await? {
        RideUpdateOutcome::Updated(ride) => {
            tracing::info!(ride_id = %ride.id, driver_id = %auth.user_id, "Ride updated");
            Ok(Json(DataResponse {
                data: ride_view(ride, None),
            }))
        }
        RideUpdateOutcome::NotFound => Err(AppError::Core(CoreError::NotFound {
            entity: "Ride",
            id: ride_id,
        })),
        RideUpdateOutcome::NotActive { status_id } => Err(ride_not_active(status_id)),
        RideUpdateOutcome::SeatsBelowCommitted { committed } => {
            Err(AppError::Core(CoreError::SeatsBelowCommitted { committed }))
        }
    }
}

// ---------------------------------------------------------------------------
// Delete (soft cancel)
// ---------------------------------------------------------------------------

/// DELETE /api/v1/rides/{id}
///
/// Soft-cancel an active ride (ACTIVE -> CANCELLED). Driver only. The row
/// is kept; participants keep their booking history. Returns 204.
pub async fn delete_ride(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(ride_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    find_owned_ride(&state, ride_id, &auth, "cancel").await?;

    match state.store.cancel_ride(ride_id).await? {
        RideCancelOutcome::Cancelled => {
            tracing::info!(ride_id = %ride_id, driver_id = %auth.user_id, "Ride cancelled");
            Ok(StatusCode::NO_CONTENT)
        }
        RideCancelOutcome::NotFound => Err(AppError::Core(CoreError::NotFound {
            entity: "Ride",
            id: ride_id,
        })),
        RideCancelOutcome::NotActive { status_id } => Err(ride_not_active(status_id)),
    }
}
