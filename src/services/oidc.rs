// SPDX-License-Identifier: MIT

//! OpenID Connect client for the identity provider.
//!
//! Public client (no secret): authorization-code and refresh-token grants
//! against the provider's form-encoded token endpoint, plus authorize-URL
//! construction for the browser-driven half of the flow.

use crate::error::AppError;
use serde::Deserialize;
use std::time::Duration;

/// Scopes requested at login. `offline_access` is what buys us the
/// refresh token the unattended loop depends on.
const SCOPES: &str = "openid profile email offline_access";

/// Upper bound on any single token-endpoint call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Identity provider client.
#[derive(Clone)]
pub struct OidcClient {
    http: reqwest::Client,
    auth_url: String,
    token_url: String,
    client_id: String,
    redirect_uri: String,
}

impl OidcClient {
    pub fn new(
        auth_url: String,
        token_url: String,
        client_id: String,
        redirect_uri: String,
    ) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("HTTP client construction"),
            auth_url,
            token_url,
            client_id,
            redirect_uri,
        }
    }

    /// Build the provider authorization URL for an interactive login.
    ///
    /// `prompt=login` forces re-authentication even if the provider still
    /// holds a session cookie; the response arrives on the redirect URI as
    /// query parameters.
    pub fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&response_mode=query&state={}&prompt=login",
            self.auth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(SCOPES),
            urlencoding::encode(state),
        )
    }

    /// Exchange a one-time authorization code for a token set.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, AppError> {
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("client_id", self.client_id.as_str()),
        ])
        .await
    }

    /// Obtain a new token set from a refresh token.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, AppError> {
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.client_id.as_str()),
        ])
        .await
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenResponse, AppError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(form)
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("token endpoint unreachable: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Provider(format!(
                "token endpoint returned HTTP {status}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("malformed token response: {e}")))
    }
}

/// Token endpoint response for both grant types.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_in: i64,
}
