pub mod health;
pub mod rides;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /rides                                   list, create
/// /rides/search                            search by route and date
/// /rides/driver/me                         authenticated driver's rides
/// /rides/rider/me                          authenticated rider's bookings
/// /rides/{id}                              get, update, soft-cancel
/// /rides/{id}/join                         book seats (POST)
/// /rides/{id}/participants/{participant_id} status transition (PUT)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/rides", rides::router())
}
