use std::sync::Arc;

use carpool_db::store::BookingStore;

use crate::config::ServerConfig;
use crate::identity::IdentityClient;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// The booking store (Postgres in production, in-memory in tests).
    pub store: Arc<dyn BookingStore>,
    /// Server configuration (JWT secret, timeouts, CORS origins).
    pub config: Arc<ServerConfig>,
    /// Identity service client for user profile decoration.
    pub identity: Arc<IdentityClient>,
}
