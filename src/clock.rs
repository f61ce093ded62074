/// Wall clock and local calendar-day keys
use chrono::{DateTime, Local, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Local calendar day used to bucket aggregates, formatted `YYYY-MM-DD`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DayKey(String);

impl DayKey {
    pub fn from_date(date: NaiveDate) -> DayKey {
        DayKey(date.format("%Y-%m-%d").to_string())
    }

    pub fn of(time: &DateTime<Local>) -> DayKey {
        DayKey::from_date(time.date_naive())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DayKey {
    fn from(key: &str) -> Self {
        DayKey(key.to_string())
    }
}

/// Source of the current time
pub trait Clock {
    fn now(&self) -> DateTime<Local>;

    fn today(&self) -> DayKey {
        DayKey::of(&self.now())
    }
}

/// The browser's (or host's) local clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Whole seconds between two instants, never negative
pub fn whole_seconds_between(start: &DateTime<Local>, end: &DateTime<Local>) -> u64 {
    (*end - *start).num_seconds().max(0) as u64
}

/// Local midnight that began the day containing `time`
pub fn start_of_day(time: &DateTime<Local>) -> DateTime<Local> {
    time.date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| Local.from_local_datetime(&midnight).earliest())
        .unwrap_or(*time)
}
