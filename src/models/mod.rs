// SPDX-License-Identifier: MIT

//! Data models for the application.

pub mod credential;
pub mod filter;
pub mod shift;

pub use credential::{AuthorizationArtifact, TokenSet};
pub use filter::{DayWindow, ScheduleFilter};
pub use shift::{CollectedShift, Shift, ShiftsResponse};
