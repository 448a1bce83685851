use chrono::{Datelike, Local, NaiveDateTime};

/// Source of the wall-clock instant used by time-dependent versions.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// Local time from the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock pinned to one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Timestamp as `MMddyyyyHHmmss` digits.
pub fn timestamp_digits(now: NaiveDateTime) -> String {
    now.format("%m%d%Y%H%M%S").to_string()
}

/// `year + month + day`, the factor applied by expiring files.
pub fn date_sum(now: NaiveDateTime) -> i64 {
    now.year() as i64 + now.month() as i64 + now.day() as i64
}
