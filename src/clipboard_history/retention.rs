//! Retention policy
//!
//! Decides the eviction threshold for old entries. Pure, no I/O.

use chrono::{DateTime, TimeDelta, Utc};

use crate::config::DEFAULT_RETENTION_DAYS;

/// Instant before which entries are evictable: exactly `now - window`.
///
/// Saturates at the earliest representable instant when the window is
/// larger than the distance from `now` to that minimum.
pub fn threshold_for(now: DateTime<Utc>, window: TimeDelta) -> DateTime<Utc> {
    now.checked_sub_signed(window)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Configured retention window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    window: TimeDelta,
}

impl RetentionPolicy {
    pub fn new(window: TimeDelta) -> Self {
        Self { window }
    }

    pub fn from_days(days: u32) -> Self {
        Self::new(TimeDelta::days(i64::from(days)))
    }

    pub fn window(&self) -> TimeDelta {
        self.window
    }

    pub fn threshold(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        threshold_for(now, self.window)
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::from_days(DEFAULT_RETENTION_DAYS)
    }
}
