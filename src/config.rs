// SPDX-License-Identifier: MIT

//! Application configuration loaded from environment variables.
//!
//! Every knob has a default matching the courier provider this tool was
//! built against, so a bare `.env` with nothing but `BROWSER_BINARY` is a
//! working setup.

use chrono_tz::Tz;
use std::env;
use std::path::PathBuf;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- OAuth2 / identity provider ---
    /// Public OAuth client ID (no secret; public client flow)
    pub client_id: String,
    /// Identity provider authorization endpoint (browser-driven)
    pub auth_url: String,
    /// Identity provider token endpoint (machine-driven, form-encoded)
    pub token_url: String,
    /// Registered redirect target; the authorization response arrives here
    /// in the query string (`response_mode=query`)
    pub redirect_uri: String,

    // --- Resource provider ---
    /// Base URL for the courier shifts API
    pub shifts_api_base: String,
    /// Static app token header the confirmation endpoint requires
    pub app_token: String,
    /// Tenant header for the confirmation endpoint
    pub tenant_id: String,
    /// Mobile-app user agent presented on shift API calls
    pub user_agent: String,

    // --- Filtering ---
    /// Fixed civil timezone for schedule matching, independent of the
    /// host locale
    pub filter_timezone: Tz,

    // --- Runtime ---
    /// Directory holding per-user credential, filter and outcome records
    pub data_dir: PathBuf,
    /// Browser binary for the automation capability check
    pub browser_binary: Option<PathBuf>,
    /// Server port
    pub port: u16,
    /// Randomized sleep range between poll cycles, in seconds
    pub poll_interval_secs: (u64, u64),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let filter_timezone: Tz = env::var("FILTER_TIMEZONE")
            .unwrap_or_else(|_| "Europe/London".to_string())
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("FILTER_TIMEZONE: {e}")))?;

        let poll_min = parse_u64("POLL_INTERVAL_MIN_SECS", 30)?;
        let poll_max = parse_u64("POLL_INTERVAL_MAX_SECS", 60)?;
        if poll_min == 0 || poll_min > poll_max {
            return Err(ConfigError::Invalid(format!(
                "poll interval range {poll_min}..{poll_max} is not usable"
            )));
        }

        Ok(Self {
            client_id: env::var("OIDC_CLIENT_ID")
                .unwrap_or_else(|_| "courier_mobile_jet_uk".to_string()),
            auth_url: env::var("OIDC_AUTH_URL").unwrap_or_else(|_| {
                "https://api-produk.skipthedishes.com/auth/realms/Courier/protocol/openid-connect/auth"
                    .to_string()
            }),
            token_url: env::var("OIDC_TOKEN_URL").unwrap_or_else(|_| {
                "https://api-produk.skipthedishes.com/auth/realms/Courier/protocol/openid-connect/token"
                    .to_string()
            }),
            redirect_uri: env::var("OIDC_REDIRECT_URI")
                .unwrap_or_else(|_| "http://localhost:8080/callback".to_string()),
            shifts_api_base: env::var("SHIFTS_API_BASE").unwrap_or_else(|_| {
                "https://api-courier-produk.skipthedishes.com/v2/couriers".to_string()
            }),
            app_token: env::var("SHIFTS_APP_TOKEN")
                .unwrap_or_else(|_| "31983a5d-37b1-4390-bd1c-8184e855e5da".to_string()),
            tenant_id: env::var("SHIFTS_TENANT_ID").unwrap_or_else(|_| "uk".to_string()),
            user_agent: env::var("SHIFTS_USER_AGENT")
                .unwrap_or_else(|_| "SkipTheDishes-COURAPP-Just Eat / (iOS - 6.0.3)".to_string()),
            filter_timezone,
            data_dir: env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("userauth")),
            browser_binary: env::var("BROWSER_BINARY")
                .or_else(|_| env::var("PUPPETEER_EXECUTABLE_PATH"))
                .map(PathBuf::from)
                .ok(),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            poll_interval_secs: (poll_min, poll_max),
        })
    }

    /// Default config for tests. Endpoints point at localhost so a stray
    /// network call fails fast instead of reaching the real provider.
    pub fn test_default() -> Self {
        Self {
            client_id: "test_client".to_string(),
            auth_url: "http://127.0.0.1:1/auth".to_string(),
            token_url: "http://127.0.0.1:1/token".to_string(),
            redirect_uri: "http://localhost:8080/callback".to_string(),
            shifts_api_base: "http://127.0.0.1:1/v2/couriers".to_string(),
            app_token: "test-app-token".to_string(),
            tenant_id: "uk".to_string(),
            user_agent: "test-agent".to_string(),
            filter_timezone: chrono_tz::Europe::London,
            data_dir: PathBuf::from("userauth"),
            browser_binary: None,
            port: 8080,
            poll_interval_secs: (30, 60),
        }
    }
}

fn parse_u64(var: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env::var(var) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("{var}: {e}"))),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    Invalid(String),
}
