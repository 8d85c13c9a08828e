//! Time keeping module for PineTime
//!
//! Wall-clock time is a reference point (a date-time and the uptime at which
//! it was valid) advanced by the uptime elapsed since.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Timelike};

/// Length of a Current Time Service record
pub const CTS_LEN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeError {
    /// Record shorter than [`CTS_LEN`]
    Truncated,
    /// Date or time fields out of range
    InvalidDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeReference {
    /// Clock time
    time: NaiveDateTime,
    /// Uptime at which `time` was valid
    uptime_secs: u64,
}

impl Default for TimeReference {
    fn default() -> Self {
        Self {
            time: DateTime::UNIX_EPOCH.naive_utc(),
            uptime_secs: 0,
        }
    }
}

impl TimeReference {
    /// Create new time reference from NaiveDateTime
    pub fn from_datetime(time: NaiveDateTime, uptime_secs: u64) -> Self {
        Self { time, uptime_secs }
    }

    /// Create new time reference from seconds since the Unix epoch
    pub fn from_epoch(epoch_secs: i64, uptime_secs: u64) -> Option<Self> {
        let time = DateTime::from_timestamp(epoch_secs, 0)?.naive_utc();
        Some(Self::from_datetime(time, uptime_secs))
    }

    /// Create new time reference from Current Time Service data
    pub fn from_cts_bytes(bytes: &[u8], uptime_secs: u64) -> Result<Self, TimeError> {
        if bytes.len() < CTS_LEN {
            return Err(TimeError::Truncated);
        }
        let year = u16::from_le_bytes([bytes[0], bytes[1]]) as i32;
        let month = bytes[2] as u32;
        let day = bytes[3] as u32;
        let hour = bytes[4] as u32;
        let min = bytes[5] as u32;
        let sec = bytes[6] as u32;
        // bytes[7] is the day of week, implied by the date
        let milli = bytes[8] as u32 * 1000 / 256; // Convert fractions_256 to milliseconds

        let time = NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_milli_opt(hour, min, sec, milli))
            .ok_or(TimeError::InvalidDate)?;

        Ok(Self::from_datetime(time, uptime_secs))
    }

    /// Time at the given uptime, shifted by `offset_secs` from UTC
    pub fn now(&self, uptime_secs: u64, offset_secs: i32) -> NaiveDateTime {
        let elapsed = uptime_secs.saturating_sub(self.uptime_secs);
        let delta = i64::try_from(elapsed)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::zero())
            + TimeDelta::try_seconds(offset_secs.into()).unwrap_or(TimeDelta::zero());
        self.time.checked_add_signed(delta).unwrap_or(self.time)
    }
}

/// Seconds until the next full minute, between 1 and 60
pub fn secs_until_next_minute(now: &NaiveDateTime) -> u64 {
    60 - u64::from(now.second().min(59))
}

/// Lets each wall-clock minute through once.
///
/// Clock changes from the phone can land in a minute that was already
/// ticked; those must not repeat the per-minute work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinuteTicker {
    last: NaiveDateTime,
}

impl MinuteTicker {
    /// `start` counts as already ticked
    pub fn new(start: &NaiveDateTime) -> Self {
        Self {
            last: truncate_to_minute(start),
        }
    }

    /// `now` truncated to the minute if that minute has not ticked yet
    pub fn tick(&mut self, now: &NaiveDateTime) -> Option<NaiveDateTime> {
        let minute = truncate_to_minute(now);
        if minute == self.last {
            return None;
        }
        self.last = minute;
        Some(minute)
    }
}

fn truncate_to_minute(time: &NaiveDateTime) -> NaiveDateTime {
    time.with_second(0)
        .and_then(|time| time.with_nanosecond(0))
        .unwrap_or(*time)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cts(year: u16, month: u8, day: u8, hour: u8, min: u8, sec: u8) -> [u8; CTS_LEN] {
        let [lo, hi] = year.to_le_bytes();
        [lo, hi, month, day, hour, min, sec, 0, 128, 0]
    }

    #[test]
    fn decodes_current_time_record() {
        let reference = TimeReference::from_cts_bytes(&cts(2024, 3, 3, 9, 30, 15), 0).unwrap();
        let expected = NaiveDate::from_ymd_opt(2024, 3, 3)
            .unwrap()
            .and_hms_milli_opt(9, 30, 15, 500)
            .unwrap();
        assert_eq!(reference.now(0, 0), expected);
    }

    #[test]
    fn rejects_invalid_records() {
        assert_eq!(
            TimeReference::from_cts_bytes(&cts(2024, 2, 30, 0, 0, 0), 0),
            Err(TimeError::InvalidDate)
        );
        assert_eq!(
            TimeReference::from_cts_bytes(&cts(2024, 1, 1, 24, 0, 0), 0),
            Err(TimeError::InvalidDate)
        );
        assert_eq!(
            TimeReference::from_cts_bytes(&[0; 4], 0),
            Err(TimeError::Truncated)
        );
    }

    #[test]
    fn advances_with_uptime_and_offset() {
        let reference = TimeReference::from_epoch(1_700_000_000, 100).unwrap();
        let start = reference.now(100, 0);
        assert_eq!(reference.now(160, 0) - start, TimeDelta::try_seconds(60).unwrap());
        assert_eq!(reference.now(100, 3_600) - start, TimeDelta::try_hours(1).unwrap());
        // Uptime before the reference never goes back in time
        assert_eq!(reference.now(50, 0), start);
    }

    #[test]
    fn next_minute_delay() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(secs_until_next_minute(&date.and_hms_opt(10, 0, 0).unwrap()), 60);
        assert_eq!(secs_until_next_minute(&date.and_hms_opt(10, 0, 59).unwrap()), 1);
        assert_eq!(secs_until_next_minute(&date.and_hms_opt(10, 0, 42).unwrap()), 18);
    }

    #[test]
    fn each_minute_ticks_once() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut ticker = MinuteTicker::new(&date.and_hms_opt(10, 29, 12).unwrap());

        let half_past = date.and_hms_opt(10, 30, 0).unwrap();
        assert_eq!(ticker.tick(&half_past), Some(half_past));
        // Clock set again within the same minute
        assert_eq!(ticker.tick(&date.and_hms_opt(10, 30, 20).unwrap()), None);
        assert_eq!(
            ticker.tick(&date.and_hms_opt(10, 31, 0).unwrap()),
            date.and_hms_opt(10, 31, 0)
        );
        // A clock set that jumps ahead ticks the new minute
        assert_eq!(
            ticker.tick(&date.and_hms_opt(14, 5, 33).unwrap()),
            date.and_hms_opt(14, 5, 0)
        );
    }

    #[test]
    fn startup_minute_does_not_tick() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, 45)
            .unwrap();
        let mut ticker = MinuteTicker::new(&start);
        assert_eq!(ticker.tick(&start), None);
    }
}
