// SPDX-License-Identifier: MIT

//! Token lifecycle management.
//!
//! `ensure_fresh` is the single entry point the polling loop uses: it
//! returns a usable access token or `AuthExpired` when every recovery
//! path is exhausted. Recovery order is fixed: stored token if still
//! fresh, then the refresh grant, then exchanging the stored one-time
//! authorization artifact.

use crate::error::AppError;
use crate::models::TokenSet;
use crate::services::oidc::{OidcClient, TokenResponse};
use crate::store::FileStore;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use std::sync::Arc;

/// Manages the stored token set for a user: freshness checks, refresh,
/// and authorization-code fallback. Every successful path persists the
/// replacement token set before returning it.
#[derive(Clone)]
pub struct TokenManager {
    oidc: Arc<OidcClient>,
    store: FileStore,
}

impl TokenManager {
    pub fn new(oidc: Arc<OidcClient>, store: FileStore) -> Self {
        Self { oidc, store }
    }

    /// Return a fresh access token for `user_id`, refreshing or
    /// re-exchanging as needed. Fails with `AuthExpired` only when no
    /// recovery path succeeds.
    pub async fn ensure_fresh(&self, user_id: &str) -> Result<String, AppError> {
        self.ensure_fresh_set(user_id)
            .await
            .map(|tokens| tokens.access_token)
    }

    /// Like [`ensure_fresh`](Self::ensure_fresh) but returns the whole
    /// token set, including the courier id claim the shift API needs.
    pub async fn ensure_fresh_set(&self, user_id: &str) -> Result<TokenSet, AppError> {
        let existing = self.store.get_tokens(user_id).await?;

        // Fresh token on hand: no network call at all.
        if let Some(tokens) = &existing {
            if tokens.is_fresh(Utc::now()) {
                return Ok(tokens.clone());
            }
        }

        // Exactly one refresh attempt; failure falls through to the
        // authorization-code path instead of raising.
        if let Some(refresh_token) = existing.as_ref().and_then(|t| t.refresh_token.clone()) {
            match self.oidc.refresh_token(&refresh_token).await {
                Ok(response) => {
                    tracing::info!(user_id, "Access token refreshed");
                    return self.persist_response(user_id, response).await;
                }
                Err(e) => {
                    tracing::warn!(
                        user_id,
                        error = %e,
                        "Refresh grant failed, falling back to stored authorization code"
                    );
                }
            }
        }

        self.exchange_stored_artifact(user_id)
            .await
            .map_err(|e| match e {
                // Store failures are reported as such, not as expired auth.
                AppError::Persistence(_) => e,
                e => {
                    tracing::error!(user_id, error = %e, "Authorization code exchange failed");
                    AppError::AuthExpired
                }
            })
    }

    /// Exchange the stored one-time authorization artifact for a token
    /// set. The artifact is cleared on success so it can never be
    /// exchanged twice; on failure it stays persisted for a manual retry.
    pub async fn exchange_stored_artifact(&self, user_id: &str) -> Result<TokenSet, AppError> {
        let artifact = self
            .store
            .get_artifact(user_id)
            .await?
            .ok_or(AppError::AuthExpired)?;

        let response = self.oidc.exchange_code(&artifact.code).await?;
        self.store.clear_artifact(user_id).await?;
        tracing::info!(user_id, "Authorization code exchanged for tokens");
        self.persist_response(user_id, response).await
    }

    /// Build a whole new token set from an endpoint response and persist
    /// it before handing it back. All fields are overwritten together;
    /// there is no partial update path.
    async fn persist_response(
        &self,
        user_id: &str,
        response: TokenResponse,
    ) -> Result<TokenSet, AppError> {
        let tokens = TokenSet {
            courier_id: courier_id_claim(&response.access_token),
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_in: response.expires_in,
            obtained_at: Utc::now(),
        };
        self.store.put_tokens(user_id, &tokens).await?;
        Ok(tokens)
    }
}

/// Pull the `courier_id` claim out of a JWT access token without
/// verifying the signature; the claim only routes API paths, it is not
/// trusted for anything security-relevant.
pub fn courier_id_claim(access_token: &str) -> Option<String> {
    let payload_b64 = access_token.split('.').nth(1)?;
    let payload = URL_SAFE_NO_PAD
        .decode(payload_b64.trim_end_matches('='))
        .ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&payload).ok()?;
    match &claims["courier_id"] {
        serde_json::Value::String(id) => Some(id.clone()),
        serde_json::Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}
