// SPDX-License-Identifier: MIT

//! Credential records: the one-time authorization artifact captured at
//! login and the replaceable OAuth token set.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Seconds of remaining validity a token must have to count as fresh.
pub const FRESHNESS_MARGIN_SECS: i64 = 60;

/// One-time authorization code plus anti-CSRF state, harvested from the
/// login redirect. Valid until exchanged once; the provider rejects replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationArtifact {
    pub code: String,
    pub state: String,
    pub session_state: String,
    pub captured_at: DateTime<Utc>,
}

/// OAuth token set. Replaced wholesale on every refresh or exchange;
/// individual fields are never updated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Lifetime in seconds, as reported by the token endpoint
    pub expires_in: i64,
    /// UTC instant the set was obtained; reset on every replacement
    pub obtained_at: DateTime<Utc>,
    /// Courier ID claim decoded from the access token JWT
    #[serde(skip_serializing_if = "Option::is_none")]
    pub courier_id: Option<String>,
}

impl TokenSet {
    /// A token set is fresh iff `obtained_at + expires_in - now` exceeds
    /// the safety margin.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        let expires_at = self.obtained_at + Duration::seconds(self.expires_in);
        (expires_at - now).num_seconds() > FRESHNESS_MARGIN_SECS
    }
}
