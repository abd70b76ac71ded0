//! UTC datetime with millisecond precision, the resolution of the wire format.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// A UTC datetime, stored as the signed number of milliseconds since the Unix
/// epoch. Sub-millisecond precision is not representable on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateTime(i64);

impl DateTime {
    /// The current time, truncated to millisecond precision.
    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    pub const fn from_millis(millis: i64) -> Self {
        DateTime(millis)
    }

    /// Milliseconds since the Unix epoch.
    pub const fn timestamp_millis(self) -> i64 {
        self.0
    }

    pub fn from_system_time(st: SystemTime) -> Self {
        match st.duration_since(UNIX_EPOCH) {
            Ok(d) => DateTime(d.as_millis().min(i64::MAX as u128) as i64),
            // Pre-epoch times have a negative millisecond count.
            Err(e) => DateTime(-(e.duration().as_millis().min(i64::MAX as u128) as i64)),
        }
    }

    pub fn to_system_time(self) -> SystemTime {
        if self.0 >= 0 {
            UNIX_EPOCH + Duration::from_millis(self.0 as u64)
        } else {
            UNIX_EPOCH - Duration::from_millis(self.0.unsigned_abs())
        }
    }

    pub fn to_time_0_3(self) -> Option<OffsetDateTime> {
        OffsetDateTime::from_unix_timestamp_nanos(self.0 as i128 * 1_000_000).ok()
    }

    pub fn from_time_0_3(dt: OffsetDateTime) -> Self {
        DateTime((dt.unix_timestamp_nanos() / 1_000_000) as i64)
    }
}

impl From<SystemTime> for DateTime {
    fn from(st: SystemTime) -> Self {
        Self::from_system_time(st)
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_time_0_3().and_then(|dt| dt.format(&Rfc3339).ok()) {
            Some(formatted) => f.write_str(&formatted),
            None => write!(f, "DateTime({} ms)", self.0),
        }
    }
}
