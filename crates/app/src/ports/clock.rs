//! Clock port — where the watcher reads "now" from.

use chrono::NaiveDateTime;

/// Source of local wall-clock time.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> NaiveDateTime;
}

/// Reads the host's local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        pinhub_domain::time::local_now()
    }
}

impl<T: Clock> Clock for std::sync::Arc<T> {
    fn now(&self) -> NaiveDateTime {
        (**self).now()
    }
}
