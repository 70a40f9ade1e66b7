// SPDX-License-Identifier: MIT

//! Weekly schedule filter: per-weekday hour windows that decide which
//! candidate shifts get confirmed.

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Hour window for a single weekday. Hours are half-open `[start, end)`;
/// `end == 24` means "through the last hour of the day". Windows never
/// span midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayWindow {
    pub enabled: bool,
    /// First matching hour, 0-23
    pub start: u8,
    /// First non-matching hour, 1-24
    pub end: u8,
}

impl Default for DayWindow {
    fn default() -> Self {
        Self {
            enabled: false,
            start: 0,
            end: 24,
        }
    }
}

impl DayWindow {
    fn contains_hour(&self, hour: u8) -> bool {
        self.enabled && hour >= self.start && hour < self.end
    }
}

/// Weekly filter document. All seven days are required on deserialization;
/// updates replace the document wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleFilter {
    #[serde(rename = "Monday")]
    pub monday: DayWindow,
    #[serde(rename = "Tuesday")]
    pub tuesday: DayWindow,
    #[serde(rename = "Wednesday")]
    pub wednesday: DayWindow,
    #[serde(rename = "Thursday")]
    pub thursday: DayWindow,
    #[serde(rename = "Friday")]
    pub friday: DayWindow,
    #[serde(rename = "Saturday")]
    pub saturday: DayWindow,
    #[serde(rename = "Sunday")]
    pub sunday: DayWindow,
}

impl ScheduleFilter {
    /// Each day paired with its display name, Monday first.
    pub fn days(&self) -> [(&'static str, &DayWindow); 7] {
        [
            ("Monday", &self.monday),
            ("Tuesday", &self.tuesday),
            ("Wednesday", &self.wednesday),
            ("Thursday", &self.thursday),
            ("Friday", &self.friday),
            ("Saturday", &self.saturday),
            ("Sunday", &self.sunday),
        ]
    }

    fn window_for(&self, weekday: Weekday) -> &DayWindow {
        match weekday {
            Weekday::Mon => &self.monday,
            Weekday::Tue => &self.tuesday,
            Weekday::Wed => &self.wednesday,
            Weekday::Thu => &self.thursday,
            Weekday::Fri => &self.friday,
            Weekday::Sat => &self.saturday,
            Weekday::Sun => &self.sunday,
        }
    }

    /// Validate hour ranges and ordering. Called on every filter update;
    /// a document failing here is rejected without being persisted.
    pub fn validate(&self) -> Result<(), String> {
        for (name, window) in self.days() {
            if window.start > 23 {
                return Err(format!("{name}.start must be between 0 and 23"));
            }
            if window.end < 1 || window.end > 24 {
                return Err(format!("{name}.end must be between 1 and 24"));
            }
            if window.enabled && window.start >= window.end {
                return Err(format!(
                    "{name}: start ({}) must be less than end ({})",
                    window.start, window.end
                ));
            }
        }
        Ok(())
    }

    /// Does a shift starting at `start_ms` (millisecond epoch) fall inside
    /// this filter? The instant is evaluated in `tz`, never the host
    /// timezone, so matching is stable across deployments.
    pub fn matches(&self, start_ms: i64, tz: Tz) -> bool {
        let Some(utc) = DateTime::<Utc>::from_timestamp_millis(start_ms) else {
            return false;
        };
        let local = utc.with_timezone(&tz);
        self.window_for(local.weekday())
            .contains_hour(local.hour() as u8)
    }
}
