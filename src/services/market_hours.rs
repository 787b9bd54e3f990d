//! Forex session hours.
//!
//! The spot forex market closes Friday 22:00 UTC and reopens Sunday 22:00 UTC.
//! OTC instruments trade around the clock and are never closed.

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};

const SESSION_BOUNDARY_HOUR: u32 = 22;

/// Whether the forex market is closed at `now`.
pub fn is_forex_closed(now: DateTime<Utc>) -> bool {
    match now.weekday() {
        Weekday::Fri => now.hour() >= SESSION_BOUNDARY_HOUR,
        Weekday::Sat => true,
        Weekday::Sun => now.hour() < SESSION_BOUNDARY_HOUR,
        _ => false,
    }
}
