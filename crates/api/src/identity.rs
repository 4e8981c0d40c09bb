//! Client for the external identity service.
//!
//! Used only to decorate responses with user profiles (names, avatars).
//! Never used for authorization, so a lookup failure degrades to a missing
//! profile instead of failing the request.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use carpool_core::types::DbId;

/// Public user profile as served by the identity service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: DbId,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
}

/// HTTP client for `GET {base_url}/users/{id}`.
pub struct IdentityClient {
    base_url: String,
    http: reqwest::Client,
}

/// Lookup timeout. Decoration is best-effort; a slow identity service must
/// not stall ride responses.
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(3);

impl IdentityClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(LOOKUP_TIMEOUT)
            .build()
            .expect("Failed to build identity HTTP client");

        Self {
            base_url: base_url.into(),
            http,
        }
    }

    /// Look up a user profile. Returns `None` on any failure (network error,
    /// non-2xx status, malformed body) after logging a warning.
    pub async fn find_user(&self, id: DbId) -> Option<UserProfile> {
        let url = format!("{}/users/{}", self.base_url, id);

        let response = match self.http.get(&url).send().await {
            Ok(r) => r,
            Err(err) => {
                tracing::warn!(user_id = %id, error = %err, "Identity lookup failed");
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::warn!(
                user_id = %id,
                status = %response.status(),
                "Identity lookup returned non-success status"
            );
            return None;
        }

        match response.json::<UserProfile>().await {
            Ok(profile) => Some(profile),
            Err(err) => {
                tracing::warn!(user_id = %id, error = %err, "Identity response malformed");
                None
            }
        }
    }
}
