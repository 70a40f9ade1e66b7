// SPDX-License-Identifier: MIT

//! Business logic services.

pub mod browser;
pub mod login;
pub mod oidc;
pub mod poller;
pub mod shifts;
pub mod tokens;

pub use browser::{BrowserResponse, BrowserSession, HeadlessBrowser};
pub use login::{CaptureOutcome, CapturedAuth, LoginCaptureFlow};
pub use oidc::OidcClient;
pub use poller::{CycleDeps, Poller, PollerStatus};
pub use shifts::ShiftsClient;
pub use tokens::TokenManager;
