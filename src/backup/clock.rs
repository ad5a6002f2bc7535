//! Wall clock used to stamp backups.

use chrono::{Local, NaiveDateTime};

pub trait Clock: Send + Sync {
    /// Current local time, second precision is enough.
    fn now(&self) -> NaiveDateTime;
}

/// Local system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}
