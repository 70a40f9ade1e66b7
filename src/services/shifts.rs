// SPDX-License-Identifier: MIT

//! Courier shifts API client.
//!
//! The listing endpoint is fetched through the browser capability because
//! it sits behind bot detection; a non-JSON response is the interception
//! signal. Confirmations are plain bearer-authenticated POSTs with an
//! empty body.

use crate::error::AppError;
use crate::models::{Shift, ShiftsResponse};
use crate::services::browser::BrowserSession;
use std::time::Duration;

/// Upper bound on any single confirmation call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Shifts API client with the mobile-app header profile.
#[derive(Clone)]
pub struct ShiftsClient {
    http: reqwest::Client,
    base_url: String,
    app_token: String,
    tenant_id: String,
    user_agent: String,
    /// IANA timezone name forwarded to the listing endpoint
    timezone: String,
}

impl ShiftsClient {
    pub fn new(
        base_url: String,
        app_token: String,
        tenant_id: String,
        user_agent: String,
        timezone: String,
    ) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("HTTP client construction"),
            base_url,
            app_token,
            tenant_id,
            user_agent,
            timezone,
        }
    }

    /// URL listing scheduled plus available shifts for a courier.
    fn scheduled_url(&self, courier_id: &str) -> String {
        format!(
            "{}/{}/shifts/scheduled?includeAvailable=true&timezone={}&hasCourierRefreshedOpenShifts=true",
            self.base_url,
            courier_id,
            urlencoding::encode(&self.timezone),
        )
    }

    fn confirm_url(&self, courier_id: &str, shift_id: &str) -> String {
        format!("{}/{}/shifts/{}/confirm", self.base_url, courier_id, shift_id)
    }

    /// Header profile for the browser-context fetch.
    fn listing_headers(&self, access_token: &str) -> Vec<(String, String)> {
        vec![
            ("Authorization".to_string(), format!("Bearer {access_token}")),
            ("Accept".to_string(), "application/json".to_string()),
            ("Accept-Language".to_string(), "en-GB,en;q=0.9".to_string()),
            ("User-Agent".to_string(), self.user_agent.clone()),
            ("Platform".to_string(), "iOS".to_string()),
        ]
    }

    /// List currently available shifts via the browser capability.
    ///
    /// A response whose content type is not JSON is treated as bot
    /// detection serving a challenge page: the caller skips this cycle
    /// and tries again next time.
    pub async fn list_available(
        &self,
        browser: &dyn BrowserSession,
        access_token: &str,
        courier_id: &str,
    ) -> Result<Vec<Shift>, AppError> {
        let url = self.scheduled_url(courier_id);
        let response = browser
            .fetch_via_browser_context(&url, &self.listing_headers(access_token))
            .await?;

        if !response.content_type.contains("application/json") {
            return Err(AppError::Intercepted(format!(
                "expected JSON, got content type {:?} (HTTP {})",
                response.content_type, response.status
            )));
        }

        if !(200..300).contains(&response.status) {
            return Err(AppError::Provider(format!(
                "shift listing returned HTTP {}: {}",
                response.status, response.body
            )));
        }

        let parsed: ShiftsResponse = serde_json::from_str(&response.body)
            .map_err(|e| AppError::Provider(format!("malformed shift listing: {e}")))?;

        if let Some(error) = parsed.error {
            return Err(AppError::Provider(format!("shift listing error: {error}")));
        }

        Ok(parsed.available_shifts)
    }

    /// Confirm one shift. Empty POST body; failure is contained per item
    /// by the caller.
    pub async fn confirm(
        &self,
        access_token: &str,
        courier_id: &str,
        shift_id: &str,
    ) -> Result<(), AppError> {
        let response = self
            .http
            .post(self.confirm_url(courier_id, shift_id))
            .bearer_auth(access_token)
            .header("app-token", &self.app_token)
            .header("tenant-id", &self.tenant_id)
            .header("User-Agent", &self.user_agent)
            .header("Platform", "iOS")
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| AppError::Confirmation(format!("shift {shift_id}: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Confirmation(format!(
                "shift {shift_id}: HTTP {status}: {body}"
            )));
        }

        Ok(())
    }
}
