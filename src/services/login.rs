// SPDX-License-Identifier: MIT

//! Interactive login capture.
//!
//! `begin` hands the caller a provider authorize URL carrying a freshly
//! registered anti-CSRF state; the human completes credentials in their
//! own browser and the provider redirects back to `/callback`, whose
//! parameters land in `capture`. A valid capture persists the one-time
//! authorization artifact and exchanges it immediately so it is consumed
//! exactly once.
//!
//! At most one capture runs per process; outstanding states are evicted
//! after a TTL so an abandoned login can never be completed later by a
//! replayed redirect.

use crate::error::AppError;
use crate::models::AuthorizationArtifact;
use crate::services::oidc::OidcClient;
use crate::services::tokens::TokenManager;
use crate::store::FileStore;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Outstanding anti-CSRF states expire after this long.
const STATE_TTL: Duration = Duration::from_secs(10 * 60);

/// Time-bounded set of outstanding anti-CSRF state tokens.
pub struct StateRegistry {
    states: DashMap<String, Instant>,
    ttl: Duration,
}

impl StateRegistry {
    fn new(ttl: Duration) -> Self {
        Self {
            states: DashMap::new(),
            ttl,
        }
    }

    /// Mint and register a new state token.
    fn issue(&self) -> String {
        self.evict_expired();
        let state = Uuid::new_v4().simple().to_string();
        self.states.insert(state.clone(), Instant::now());
        state
    }

    /// Consume a state token: true iff it was outstanding and not yet
    /// expired. A consumed token is gone; replaying it fails.
    fn consume(&self, state: &str) -> bool {
        self.evict_expired();
        self.states.remove(state).is_some()
    }

    fn evict_expired(&self) {
        self.states.retain(|_, issued| issued.elapsed() < self.ttl);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.states.len()
    }
}

/// Authorization response parameters harvested from the login redirect.
#[derive(Debug, Clone)]
pub struct CapturedAuth {
    pub code: String,
    pub state: String,
    pub session_state: String,
}

/// Result of a completed capture.
#[derive(Debug, Clone)]
pub struct CaptureOutcome {
    pub user_id: String,
    /// False when the immediate code exchange failed; the artifact stays
    /// persisted so a later retry can still consume it.
    pub exchanged: bool,
}

/// Drives the interactive login from authorize URL to exchanged tokens.
pub struct LoginCaptureFlow {
    oidc: Arc<OidcClient>,
    tokens: TokenManager,
    store: FileStore,
    states: StateRegistry,
    /// Start instant of the capture currently in flight, if any.
    in_flight: Mutex<Option<Instant>>,
}

impl LoginCaptureFlow {
    pub fn new(oidc: Arc<OidcClient>, tokens: TokenManager, store: FileStore) -> Self {
        Self {
            oidc,
            tokens,
            store,
            states: StateRegistry::new(STATE_TTL),
            in_flight: Mutex::new(None),
        }
    }

    /// Start a capture: register a fresh state and return the authorize
    /// URL to send the user's browser to. Rejected while another capture
    /// is in flight; an abandoned capture unblocks after the state TTL.
    pub async fn begin(&self) -> Result<String, AppError> {
        let mut in_flight = self.in_flight.lock().await;
        if let Some(started) = *in_flight {
            if started.elapsed() < STATE_TTL {
                return Err(AppError::BadRequest(
                    "a login capture is already in progress".to_string(),
                ));
            }
        }
        *in_flight = Some(Instant::now());

        let state = self.states.issue();
        let url = self.oidc.authorize_url(&state);
        tracing::info!(state = %state, "Login capture started, redirecting to identity provider");
        Ok(url)
    }

    /// Complete a capture from redirect parameters.
    ///
    /// An unknown or already-consumed state aborts without persisting
    /// anything. Otherwise the artifact is persisted, the installation's
    /// user id assigned (first login) or reused, and the code exchanged
    /// immediately.
    pub async fn capture(&self, auth: CapturedAuth) -> Result<CaptureOutcome, AppError> {
        if !self.states.consume(&auth.state) {
            tracing::warn!(state = %auth.state, "Rejecting redirect with unknown OAuth state");
            return Err(AppError::InvalidState);
        }

        *self.in_flight.lock().await = None;

        let user_id = match self.store.current_user().await? {
            Some(existing) => existing,
            None => {
                let id = Uuid::new_v4().simple().to_string()[..8].to_string();
                self.store.set_current_user(&id).await?;
                id
            }
        };

        let artifact = AuthorizationArtifact {
            code: auth.code,
            state: auth.state,
            session_state: auth.session_state,
            captured_at: Utc::now(),
        };
        self.store.put_artifact(&user_id, &artifact).await?;
        tracing::info!(user_id, "Authorization artifact captured");

        // Consume the artifact right away so it is exchanged exactly once.
        match self.tokens.exchange_stored_artifact(&user_id).await {
            Ok(_) => Ok(CaptureOutcome {
                user_id,
                exchanged: true,
            }),
            Err(AppError::Persistence(msg)) => Err(AppError::Persistence(msg)),
            Err(e) => {
                tracing::error!(
                    user_id,
                    error = %e,
                    "Immediate code exchange failed; artifact kept for manual retry"
                );
                Ok(CaptureOutcome {
                    user_id,
                    exchanged: false,
                })
            }
        }
    }
}
