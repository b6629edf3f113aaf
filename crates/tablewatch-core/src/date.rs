//! Clock-time normalization.
//!
//! The watched page shows only a wall-clock time (`H:MM:SS` or `HH:MM:SS`)
//! with no date. It is pinned to the current UTC date, except just after
//! midnight: a `23:xx:xx` reading seen during UTC hour 0 belongs to
//! yesterday.

use std::sync::Arc;

use chrono::{DateTime, Days, NaiveTime, TimeZone, Timelike, Utc};
use parking_lot::Mutex;
use tablewatch_protocols::is_supported_timezone;

use crate::error::ProjectError;

/// Source of "now".
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A settable clock for tests and replays.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Turns source clock-time strings into UTC timestamps.
#[derive(Clone)]
pub struct DateNormalizer {
    timezone: String,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for DateNormalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DateNormalizer")
            .field("timezone", &self.timezone)
            .finish_non_exhaustive()
    }
}

impl DateNormalizer {
    pub fn new(timezone: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            timezone: timezone.into(),
            clock,
        }
    }

    /// Normalizer for `timezone` reading the system clock.
    pub fn system(timezone: impl Into<String>) -> Self {
        Self::new(timezone, Arc::new(SystemClock))
    }

    /// `Ok(None)` when `raw` has no colon (no time recorded yet).
    pub fn normalize(&self, raw: &str) -> Result<Option<DateTime<Utc>>, ProjectError> {
        if !raw.contains(':') {
            return Ok(None);
        }

        let padded = match raw.chars().count() {
            8 => raw.to_string(),
            7 => format!("0{}", raw),
            _ => return Err(ProjectError::DateFormat(raw.to_string())),
        };

        if !is_supported_timezone(&self.timezone) {
            return Err(ProjectError::UnsupportedTimezone(self.timezone.clone()));
        }

        let time = NaiveTime::parse_from_str(&padded, "%H:%M:%S")
            .map_err(|_| ProjectError::DateFormat(raw.to_string()))?;

        let now = self.clock.now();
        let mut date = now.date_naive();
        if now.hour() == 0 && time.hour() == 23 {
            date = date
                .checked_sub_days(Days::new(1))
                .ok_or_else(|| ProjectError::DateFormat(raw.to_string()))?;
        }

        Ok(Some(Utc.from_utc_datetime(&date.and_time(time))))
    }
}
