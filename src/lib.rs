// SPDX-License-Identifier: MIT

//! Shift-catcher: catch courier delivery shifts the moment they open.
//!
//! This crate runs a small local control server that handles the
//! provider login, keeps OAuth tokens fresh, and drives a background
//! loop that lists newly released shifts, matches them against a
//! per-day schedule filter, and confirms the matches.

pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;

use config::Config;
use services::{LoginCaptureFlow, Poller};
use store::FileStore;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: FileStore,
    pub login: LoginCaptureFlow,
    pub poller: Poller,
}
