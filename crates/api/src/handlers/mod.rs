//! HTTP handlers and their response view types.
//!
//! Views wrap store entities with the human-readable status name and
//! optional identity decoration. Raw rows are never serialized directly to
//! clients without at least the status name attached.

pub mod participants;
pub mod rides;

use std::collections::HashMap;

use serde::Serialize;

use carpool_core::error::CoreError;
use carpool_core::status::{ParticipantStatus, RideStatus, StatusId};
use carpool_core::types::DbId;
use carpool_db::models::participant::Participant;
use carpool_db::models::ride::Ride;
use carpool_db::store::RideWithParticipants;

use crate::error::AppError;
use crate::identity::{IdentityClient, UserProfile};

/// A ride with its status name and (optionally) the driver's profile.
#[derive(Debug, Serialize)]
pub struct RideView {
    #[serde(flatten)]
    pub ride: Ride,
    pub status: &'static str,
    pub driver: Option<UserProfile>,
}

/// A booking with its status name and (optionally) the rider's profile.
#[derive(Debug, Serialize)]
pub struct ParticipantView {
    #[serde(flatten)]
    pub participant: Participant,
    pub status: &'static str,
    pub user: Option<UserProfile>,
}

/// A ride plus all of its bookings.
#[derive(Debug, Serialize)]
pub struct RideDetailView {
    #[serde(flatten)]
    pub ride: RideView,
    pub participants: Vec<ParticipantView>,
}

/// One of the caller's bookings together with the ride it belongs to.
#[derive(Debug, Serialize)]
pub struct BookingView {
    pub ride: RideView,
    pub participant: ParticipantView,
}

pub(crate) fn ride_status_name(id: StatusId) -> &'static str {
    RideStatus::from_id(id).map(|s| s.as_str()).unwrap_or("UNKNOWN")
}

pub(crate) fn participant_status_name(id: StatusId) -> &'static str {
    ParticipantStatus::from_id(id)
        .map(|s| s.as_str())
        .unwrap_or("UNKNOWN")
}

pub(crate) fn ride_view(ride: Ride, driver: Option<UserProfile>) -> RideView {
    let status = ride_status_name(ride.status_id);
    RideView {
        ride,
        status,
        driver,
    }
}

pub(crate) fn participant_view(
    participant: Participant,
    user: Option<UserProfile>,
) -> ParticipantView {
    let status = participant_status_name(participant.status_id);
    ParticipantView {
        participant,
        status,
        user,
    }
}

/// Map a non-active ride status to the right 409 error.
pub(crate) fn ride_not_active(status_id: StatusId) -> AppError {
    match RideStatus::from_id(status_id) {
        Some(status) => AppError::Core(CoreError::RideNotActive { status }),
        None => AppError::InternalError(format!("unknown ride status id {status_id}")),
    }
}

/// Decorate a list of rides with driver profiles, one identity lookup per
/// distinct driver.
pub(crate) async fn decorate_rides(
    identity: &IdentityClient,
    items: Vec<RideWithParticipants>,
) -> Vec<RideDetailView> {
    let mut profiles: HashMap<DbId, Option<UserProfile>> = HashMap::new();
    for item in &items {
        if !profiles.contains_key(&item.ride.driver_id) {
            let profile = identity.find_user(item.ride.driver_id).await;
            profiles.insert(item.ride.driver_id, profile);
        }
    }

    items
        .into_iter()
        .map(|item| {
            let driver = profiles.get(&item.ride.driver_id).cloned().flatten();
            RideDetailView {
                ride: ride_view(item.ride, driver),
                participants: item
                    .participants
                    .into_iter()
                    .map(|p| participant_view(p, None))
                    .collect(),
            }
        })
        .collect()
}
