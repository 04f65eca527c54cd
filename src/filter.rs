//! Time-of-day filtering of trips.
//!
//! A [`TimeFilter`] either selects every trip or a target minute of the day.
//! A trip matches a target when it starts or ends within
//! [`WINDOW_MINUTES`] of it. The window does not wrap across midnight, so a
//! target of 00:10 does not match a trip at 23:50.

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use chrono::{NaiveDateTime, NaiveTime, Timelike};

use crate::model::Trip;

/// Minutes per day; valid targets are `0..MINUTES_PER_DAY`.
pub const MINUTES_PER_DAY: u16 = 1440;

/// Half-width of the matching window around a target minute (inclusive).
pub const WINDOW_MINUTES: u16 = 60;

/// Sentinel used by the slider control for "no filter".
pub const ANY_TIME: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeFilter {
    #[default]
    Any,
    At(u16),
}

impl TimeFilter {
    pub fn is_active(&self) -> bool {
        matches!(self, TimeFilter::At(_))
    }

    /// Returns the raw slider value: `-1` for [`TimeFilter::Any`], else minutes since midnight.
    pub fn as_minutes(&self) -> i32 {
        match self {
            TimeFilter::Any => ANY_TIME,
            TimeFilter::At(minute) => i32::from(*minute),
        }
    }

    /// Whether a trip starts or ends within the window around this filter's target.
    pub fn matches(&self, trip: &Trip) -> bool {
        match self {
            TimeFilter::Any => true,
            TimeFilter::At(target) => {
                let start = minutes_of_day(&trip.started_at);
                let end = minutes_of_day(&trip.ended_at);
                start.abs_diff(*target) <= WINDOW_MINUTES || end.abs_diff(*target) <= WINDOW_MINUTES
            }
        }
    }
}

impl TryFrom<i32> for TimeFilter {
    type Error = anyhow::Error;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            ANY_TIME => Ok(TimeFilter::Any),
            v if (0..i32::from(MINUTES_PER_DAY)).contains(&v) => Ok(TimeFilter::At(v as u16)),
            v => bail!(
                "time filter must be {ANY_TIME} or within 0..={}, got {v}",
                MINUTES_PER_DAY - 1
            ),
        }
    }
}

impl FromStr for TimeFilter {
    type Err = anyhow::Error;

    /// Accepts `-1`, `any`, a minute count such as `545`, or a clock time such as `09:05`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("any") {
            return Ok(TimeFilter::Any);
        }

        if s.contains(':') {
            let time = NaiveTime::parse_from_str(s, "%H:%M")
                .with_context(|| format!("invalid clock time '{s}', expected HH:MM"))?;
            return Ok(TimeFilter::At((time.hour() * 60 + time.minute()) as u16));
        }

        let minutes: i32 = s
            .parse()
            .with_context(|| format!("invalid time filter '{s}'"))?;
        TimeFilter::try_from(minutes)
    }
}

impl fmt::Display for TimeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeFilter::Any => f.write_str("any time"),
            TimeFilter::At(minute) => f.write_str(&format_time(*minute)),
        }
    }
}

/// Minutes elapsed since midnight; date and seconds are ignored.
pub fn minutes_of_day(timestamp: &NaiveDateTime) -> u16 {
    (timestamp.hour() * 60 + timestamp.minute()) as u16
}

/// Formats minutes since midnight on a 12-hour clock, e.g. `9:05 AM`.
pub fn format_time(minutes: u16) -> String {
    let minutes = u32::from(minutes % MINUTES_PER_DAY);
    match NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0) {
        Some(time) => time.format("%-I:%M %p").to_string(),
        None => String::new(),
    }
}

/// Returns the trips matching `time_filter`, in input order.
///
/// [`TimeFilter::Any`] returns every trip.
pub fn filter_trips_by_time(trips: &[Trip], time_filter: TimeFilter) -> Vec<&Trip> {
    match time_filter {
        TimeFilter::Any => trips.iter().collect(),
        filter => trips.iter().filter(|trip| filter.matches(trip)).collect(),
    }
}
