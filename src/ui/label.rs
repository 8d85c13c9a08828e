//! Bounded label text and the clock, calendar and weather formats
//!
//! Every label has a fixed maximum length. Formatting never fails: output
//! that does not fit is cut at the last whole character.

use core::fmt::{self, Write};

use chrono::{Datelike, NaiveDateTime, Timelike};
use heapless::String;

/// `HH:MM`
pub const TIME_LEN: usize = 5;
/// `Ddd DD`
pub const DAY_LEN: usize = 6;
/// `Mmm YYYY`
pub const MONTH_LEN: usize = 8;
/// `<temperature>C, <conditions>`
pub const WEATHER_LEN: usize = 31;

pub type TimeText = String<TIME_LEN>;
pub type DayText = String<DAY_LEN>;
pub type MonthText = String<MONTH_LEN>;
pub type WeatherText = String<WEATHER_LEN>;

pub const TIME_PLACEHOLDER: &str = "00:00";
pub const DAY_PLACEHOLDER: &str = "Sun 01";
pub const MONTH_PLACEHOLDER: &str = "Jan 01";
pub const WEATHER_PLACEHOLDER: &str = "Config Needed";

const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockStyle {
    TwentyFourHour,
    TwelveHour,
}

impl ClockStyle {
    pub fn from_24h(is_24h: bool) -> Self {
        if is_24h {
            ClockStyle::TwentyFourHour
        } else {
            ClockStyle::TwelveHour
        }
    }
}

/// Writer that drops everything past the capacity of the buffer.
struct Truncating<'a, const N: usize> {
    buf: &'a mut String<N>,
    full: bool,
}

impl<const N: usize> Write for Truncating<'_, N> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            if self.full || self.buf.push(c).is_err() {
                self.full = true;
                break;
            }
        }
        Ok(())
    }
}

/// Format into a bounded string, truncating on overflow.
pub fn bounded<const N: usize>(args: fmt::Arguments<'_>) -> String<N> {
    let mut buf = String::new();
    let mut writer = Truncating {
        buf: &mut buf,
        full: false,
    };
    // Truncating never reports an error and neither do the argument types used here
    let _ = writer.write_fmt(args);
    buf
}

/// `%H:%M` in 24-hour style, `%I:%M` otherwise.
pub fn format_time(now: &NaiveDateTime, style: ClockStyle) -> TimeText {
    let hour = match style {
        ClockStyle::TwentyFourHour => now.hour(),
        ClockStyle::TwelveHour => now.hour12().1,
    };
    bounded(format_args!("{:02}:{:02}", hour, now.minute()))
}

/// `%a %d`, e.g. `Sun 01`
pub fn format_day(now: &NaiveDateTime) -> DayText {
    let weekday = WEEKDAYS[now.weekday().num_days_from_sunday() as usize];
    bounded(format_args!("{} {:02}", weekday, now.day()))
}

/// `%b %Y`, e.g. `Jan 2024`
pub fn format_month(now: &NaiveDateTime) -> MonthText {
    let month = MONTHS[now.month0() as usize];
    bounded(format_args!("{} {:04}", month, now.year()))
}

/// `<temperature>C, <conditions>`
pub fn format_weather(temperature: i32, conditions: &str) -> WeatherText {
    bounded(format_args!("{}C, {}", temperature, conditions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn time_in_both_styles() {
        let afternoon = at(2024, 3, 3, 15, 7);
        assert_eq!(format_time(&afternoon, ClockStyle::TwentyFourHour), "15:07");
        assert_eq!(format_time(&afternoon, ClockStyle::TwelveHour), "03:07");

        let midnight = at(2024, 3, 3, 0, 0);
        assert_eq!(format_time(&midnight, ClockStyle::TwentyFourHour), "00:00");
        assert_eq!(format_time(&midnight, ClockStyle::TwelveHour), "12:00");

        let noon = at(2024, 3, 3, 12, 59);
        assert_eq!(format_time(&noon, ClockStyle::TwelveHour), "12:59");
    }

    #[test]
    fn day_and_month() {
        // 3 March 2024 was a Sunday
        let now = at(2024, 3, 3, 9, 30);
        assert_eq!(format_day(&now), "Sun 03");
        assert_eq!(format_month(&now), "Mar 2024");

        let now = at(1999, 12, 31, 23, 59);
        assert_eq!(format_day(&now), "Fri 31");
        assert_eq!(format_month(&now), "Dec 1999");
    }

    #[test]
    fn weather_line() {
        assert_eq!(format_weather(21, "Cloudy"), "21C, Cloudy");
        assert_eq!(format_weather(-4, "Snow"), "-4C, Snow");
    }

    #[test]
    fn weather_is_truncated_to_capacity() {
        let text = format_weather(12, "Heavy thunderstorms with hail and gusts");
        assert_eq!(text.len(), WEATHER_LEN);
        assert_eq!(text, "12C, Heavy thunderstorms with h");
    }

    #[test]
    fn truncation_keeps_whole_characters() {
        // "é" is two bytes and would straddle the limit
        let text: String<4> = bounded(format_args!("abcé"));
        assert_eq!(text, "abc");
    }

    #[test]
    fn placeholders_fit_their_labels() {
        assert!(TIME_PLACEHOLDER.len() <= TIME_LEN);
        assert!(DAY_PLACEHOLDER.len() <= DAY_LEN);
        assert!(MONTH_PLACEHOLDER.len() <= MONTH_LEN);
        assert!(WEATHER_PLACEHOLDER.len() <= WEATHER_LEN);
    }
}
