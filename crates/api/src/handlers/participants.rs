//! Handlers for ride participants (bookings).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use validator::Validate;

use carpool_core::error::CoreError;
use carpool_core::status::ParticipantStatus;
use carpool_core::types::DbId;
use carpool_db::models::participant::{JoinRide, UpdateParticipantStatus};
use carpool_db::store::{JoinOutcome, ParticipantUpdateOutcome};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

use super::{participant_view, ride_not_active, ParticipantView};

// ---------------------------------------------------------------------------
// Join
// ---------------------------------------------------------------------------

/// POST /api/v1/rides/{id}/join
///
/// Book seats on an active ride for the authenticated caller. The capacity
/// check and the insert happen in one atomic store operation, so two
/// concurrent joins can never oversell the ride. The new booking starts
/// PENDING. Returns 201.
pub async fn join_ride(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(ride_id): Path<DbId>,
    Json(input): Json<JoinRide>,
) -> AppResult<impl IntoResponse> {
    input
        .validate()
        .map_err(|e| AppError::Core(CoreError::Validation(e.to_string())))?;

    match state.store.join_ride(ride_id, auth.user_id, &input).await? {
        JoinOutcome::Joined(participant) => {
            tracing::info!(
                ride_id = %ride_id,
                participant_id = %participant.id,
                user_id = %auth.user_id,
                seats = participant.seats,
                "Rider joined ride",
            );

            let user = state.identity.find_user(auth.user_id).await;
            Ok((
                StatusCode::CREATED,
                Json(DataResponse {
                    data: participant_view(participant, user),
                }),
            ))
        }
        JoinOutcome::RideNotFound => Err(AppError::Core(CoreError::NotFound {
            entity: "Ride",
            id: ride_id,
        })),
        JoinOutcome::RideNotActive { status_id } => Err(ride_not_active(status_id)),
        JoinOutcome::AlreadyJoined => Err(AppError::Core(CoreError::Conflict(
            "You already have an active booking on this ride".into(),
        ))),
        JoinOutcome::CapacityExceeded {
            requested,
            remaining,
        } => Err(AppError::Core(CoreError::CapacityExceeded {
            requested,
            remaining,
        })),
    }
}

// ---------------------------------------------------------------------------
// Status update
// ---------------------------------------------------------------------------

/// Response payload for a participant status update.
#[derive(Debug, Serialize)]
pub struct ParticipantUpdateView {
    #[serde(flatten)]
    pub participant: ParticipantView,
    /// True when this update completed the last confirmed booking and the
    /// ride itself flipped to COMPLETED.
    pub ride_completed: bool,
}

/// PUT /api/v1/rides/{id}/participants/{participant_id}
///
/// Apply a status transition to a booking. Body: `{ "status": "CONFIRMED" |
/// "CANCELLED" | "COMPLETED" }`.
///
/// Authorization: confirming is driver-only; cancelling and completing are
/// allowed to the driver and to the booking's owner. Illegal transitions
/// return 409.
pub async fn update_participant_status(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((ride_id, participant_id)): Path<(DbId, DbId)>,
    Json(input): Json<UpdateParticipantStatus>,
) -> AppResult<impl IntoResponse> {
    let target = ParticipantStatus::parse_name(&input.status).ok_or_else(|| {
        AppError::Core(CoreError::Validation(format!(
            "Unknown participant status '{}'",
            input.status
        )))
    })?;
    if target == ParticipantStatus::Pending {
        return Err(AppError::Core(CoreError::Validation(
            "A booking cannot be moved back to PENDING".into(),
        )));
    }

    let ride = state
        .store
        .get_ride(ride_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Ride",
            id: ride_id,
        }))?;

    let participant = state
        .store
        .find_participant(ride_id, participant_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Participant",
            id: participant_id,
        }))?;

    let is_driver = ride.driver_id == auth.user_id;
    let is_owner = participant.user_id == auth.user_id;

    let allowed = match target {
        ParticipantStatus::Confirmed => is_driver,
        ParticipantStatus::Cancelled | ParticipantStatus::Completed => is_driver || is_owner,
        ParticipantStatus::Pending => false,
    };
    if !allowed {
        return Err(AppError::Core(CoreError::Forbidden(format!(
            "Not allowed to set this booking to {target}"
        ))));
    }

    match state
        .store
        .update_participant_status(ride_id, participant_id, target)
        .await?
    {
        ParticipantUpdateOutcome::Updated {
            participant,
            ride_completed,
        } => {
            tracing::info!(
                ride_id = %ride_id,
                participant_id = %participant.id,
                status = %target,
                ride_completed,
                "Participant status updated",
            );

            Ok(Json(DataResponse {
                data: ParticipantUpdateView {
                    participant: participant_view(participant, None),
                    ride_completed,
                },
            }))
        }
        ParticipantUpdateOutcome::NotFound => Err(AppError::Core(CoreError::NotFound {
            entity: "Participant",
            id: participant_id,
        })),
        ParticipantUpdateOutcome::InvalidTransition { from, to } => {
            Err(AppError::Core(CoreError::InvalidTransition { from, to }))
        }
    }
}
