// SPDX-License-Identifier: MIT

//! Shift payloads from the courier API and recorded confirmation outcomes.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Candidate shift as listed by the remote API. Transient: evaluated once
/// per cycle, then either confirmed or discarded.
#[derive(Debug, Clone, Deserialize)]
pub struct Shift {
    pub id: String,
    #[serde(rename = "shiftTime")]
    pub shift_time: ShiftTime,
}

/// Shift start/end as millisecond epoch instants.
#[derive(Debug, Clone, Deserialize)]
pub struct ShiftTime {
    pub start: i64,
    #[serde(default)]
    pub end: Option<i64>,
}

/// Scheduled-shifts listing response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftsResponse {
    #[serde(default)]
    pub available_shifts: Vec<Shift>,
    #[serde(default)]
    pub error: Option<String>,
}

/// A successfully confirmed shift, recorded for the collected view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectedShift {
    pub shift_id: String,
    /// Civil date of the shift in the filter timezone (YYYY-MM-DD)
    pub shift_date: String,
    /// Human-readable local start, e.g. "Monday 2025-06-16 09:00"
    pub start_local: String,
    pub confirmed_at: DateTime<Utc>,
}

impl CollectedShift {
    /// Record a confirmation outcome, dating it in the filter timezone.
    pub fn record(shift: &Shift, tz: Tz, confirmed_at: DateTime<Utc>) -> Option<Self> {
        let start = DateTime::<Utc>::from_timestamp_millis(shift.shift_time.start)?
            .with_timezone(&tz);
        Some(Self {
            shift_id: shift.id.clone(),
            shift_date: start.format("%Y-%m-%d").to_string(),
            start_local: start.format("%A %Y-%m-%d %H:%M").to_string(),
            confirmed_at,
        })
    }
}
