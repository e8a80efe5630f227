// SPDX-License-Identifier: Apache-2.0

//! Wall-clock seam.
//!
//! Commands stamp `created_at`/`updated_at` through a [`Clock`] so tests can
//! pin `now()` and replay a command sequence bit-identically.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

/// Source of the current instant.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now_utc(&self) -> DateTime<Utc>;

    /// The current instant as an RFC 3339 string (second precision, `Z`).
    fn now_rfc3339(&self) -> String {
        self.now_utc().to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// The current instant as epoch milliseconds.
    fn now_millis(&self) -> i64 {
        self.now_utc().timestamp_millis()
    }
}

/// The real wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A pinned clock for deterministic tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    millis: i64,
}

impl FixedClock {
    /// Pin the clock at the given epoch milliseconds.
    #[must_use]
    pub fn at_millis(millis: i64) -> Self {
        Self { millis }
    }
}

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.millis)
            .single()
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::{Clock, FixedClock};

    #[test]
    fn fixed_clock_is_stable() {
        let clock = FixedClock::at_millis(1_700_000_000_000);
        assert_eq!(clock.now_millis(), 1_700_000_000_000);
        assert_eq!(clock.now_rfc3339(), clock.now_rfc3339());
    }
}
