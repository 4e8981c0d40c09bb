//! Route definitions for the `/rides` resource.
//!
//! All endpoints require authentication.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{participants, rides};
use crate::state::AppState;

/// Routes mounted at `/rides`.
///
/// ```text
/// GET    /                                  -> list_rides
/// POST   /                                  -> create_ride
/// GET    /search                            -> search_rides
/// GET    /driver/me                         -> list_driver_rides
/// GET    /rider/me                          -> list_rider_bookings
/// GET    /{id}                              -> get_ride
/// PUT    /{id}                              -> update_ride
/// DELETE /{id}                              -> delete_ride
/// POST   /{id}/join                         -> join_ride
/// PUT    /{id}/participants/{participant_id} -> update_participant_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(rides::list_rides).post(rides::create_ride))
        .route("/search", get(rides::search_rides))
        .route("/driver/me", get(rides::list_driver_rides))
        .route("/rider/me", get(rides::list_rider_bookings))
        .route(
            "/{id}",
            get(rides::get_ride)
                .put(rides::update_ride)
                .delete(rides::delete_ride),
        )
        .route("/{id}/join", post(participants::join_ride))
        .route(
            "/{id}/participants/{participant_id}",
            put(participants::update_participant_status),
        )
}
