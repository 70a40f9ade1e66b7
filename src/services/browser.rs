// SPDX-License-Identifier: MIT

//! Browser automation capability.
//!
//! The target API sits behind bot-detection middleware, so the shift
//! listing is fetched through a "browser-like" execution context. The
//! core only sees this trait; production uses [`HeadlessBrowser`], tests
//! substitute a scripted fake.

use crate::error::AppError;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

/// How long the browser binary gets to answer `--version`.
const VERIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on any single browser-context fetch.
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Response from a browser-context fetch.
#[derive(Debug, Clone)]
pub struct BrowserResponse {
    pub status: u16,
    /// Raw `Content-Type` header value; empty when absent.
    pub content_type: String,
    pub body: String,
}

/// Opaque browser automation capability.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Can the automation be invoked at all? Called synchronously before
    /// the polling loop is allowed to start.
    async fn verify(&self) -> Result<(), AppError>;

    /// GET `url` inside a browser-like execution context with the given
    /// request headers.
    async fn fetch_via_browser_context(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<BrowserResponse, AppError>;
}

/// Production capability backed by a local Chromium-family binary for the
/// launch check and a browser-profile HTTP client for fetches.
pub struct HeadlessBrowser {
    binary: Option<PathBuf>,
    http: reqwest::Client,
}

impl HeadlessBrowser {
    pub fn new(binary: Option<PathBuf>) -> Self {
        Self {
            binary,
            http: reqwest::Client::builder()
                .timeout(FETCH_TIMEOUT)
                .build()
                .expect("HTTP client construction"),
        }
    }
}

#[async_trait]
impl BrowserSession for HeadlessBrowser {
    async fn verify(&self) -> Result<(), AppError> {
        let Some(binary) = &self.binary else {
            return Err(AppError::CapabilityUnavailable(
                "no browser binary configured (set BROWSER_BINARY)".to_string(),
            ));
        };
        if !binary.is_file() {
            return Err(AppError::CapabilityUnavailable(format!(
                "browser binary not found at {}",
                binary.display()
            )));
        }

        let probe = tokio::process::Command::new(binary)
            .arg("--version")
            .output();

        match tokio::time::timeout(VERIFY_TIMEOUT, probe).await {
            Ok(Ok(output)) if output.status.success() => {
                let version = String::from_utf8_lossy(&output.stdout);
                tracing::info!(version = %version.trim(), "Browser capability verified");
                Ok(())
            }
            Ok(Ok(output)) => Err(AppError::CapabilityUnavailable(format!(
                "browser exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ))),
            Ok(Err(e)) => Err(AppError::CapabilityUnavailable(format!(
                "failed to launch browser: {e}"
            ))),
            Err(_) => Err(AppError::CapabilityUnavailable(
                "browser did not respond within 5 seconds".to_string(),
            )),
        }
    }

    async fn fetch_via_browser_context(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<BrowserResponse, AppError> {
        let mut request = self.http.get(url);
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("browser-context fetch failed: {e}")))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Provider(format!("browser-context body read failed: {e}")))?;

        Ok(BrowserResponse {
            status,
            content_type,
            body,
        })
    }
}
