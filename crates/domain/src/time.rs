//! Time and timestamp helpers.

use chrono::{DateTime, Local, NaiveDateTime, Utc};

/// UTC timestamp used for event times and switch records.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Return the current wall-clock time in the controller's local zone.
///
/// Schedules are written in local time ("turn the porch light on at 19:00"),
/// so evaluation uses the naive local reading rather than UTC.
#[must_use]
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}
