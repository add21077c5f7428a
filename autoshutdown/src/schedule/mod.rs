//! Shutdown schedule model, parser and evaluator
//!
//! A schedule tag is a comma-separated list of segments written by operators:
//!
//! ```text
//! Saturday, Sunday, 10PM -> 5AM, December 25, Friday
//! ```
//!
//! The pipeline has two explicit stages:
//!
//! ```text
//! tag ──split(',')──▶ segments ──tokenizer──▶ tokens ──parser──▶ ScheduleRule[]
//!                                                                   │
//!                                              now (UTC) ──evaluator┘──▶ verdict
//! ```
//!
//! Parsing never fails as a whole: malformed segments are reported in
//! [`ParsedSchedule::errors`] and the remaining segments still produce rules.

pub mod evaluator;
pub mod parser;
pub mod tokenizer;

pub use evaluator::{evaluate, first_match};
pub use parser::{parse, ParsedSchedule};

use chrono::{NaiveDate, Weekday};
use std::fmt;
use thiserror::Error;

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Canonical English name, as operators write it in tags
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Case-sensitive match against the canonical weekday names
pub fn weekday_from_name(name: &str) -> Option<Weekday> {
    WEEKDAYS.into_iter().find(|day| weekday_name(*day) == name)
}

/// Compact set of weekdays (bit 0 = Monday)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, day: Weekday) {
        self.0 |= 1 << day.num_days_from_monday();
    }

    #[inline]
    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_monday()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Days in Monday-first order
    pub fn iter(&self) -> impl Iterator<Item = Weekday> + '_ {
        WEEKDAYS.into_iter().filter(move |day| self.contains(*day))
    }
}

impl FromIterator<Weekday> for WeekdaySet {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl Extend<Weekday> for WeekdaySet {
    fn extend<I: IntoIterator<Item = Weekday>>(&mut self, iter: I) {
        for day in iter {
            self.insert(day);
        }
    }
}

impl fmt::Display for WeekdaySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(weekday_name).collect();
        write!(f, "{}", names.join(", "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Meridiem {
    Am,
    Pm,
}

/// Hour of day on a 24-hour clock, built from a 12-hour literal such as `10PM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockHour(u32);

impl ClockHour {
    /// `12AM` is midnight (0) and `12PM` is noon (12). Hours outside 1..=12 are rejected.
    pub fn from_12h(hour: u32, meridiem: Meridiem) -> Option<Self> {
        if !(1..=12).contains(&hour) {
            return None;
        }
        let hour = match (meridiem, hour) {
            (Meridiem::Am, 12) => 0,
            (Meridiem::Am, h) => h,
            (Meridiem::Pm, 12) => 12,
            (Meridiem::Pm, h) => h + 12,
        };
        Some(Self(hour))
    }

    pub fn from_24h(hour: u32) -> Option<Self> {
        (hour < 24).then_some(Self(hour))
    }

    pub fn hour(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for ClockHour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            0 => write!(f, "12AM"),
            12 => write!(f, "12PM"),
            h if h < 12 => write!(f, "{}AM", h),
            h => write!(f, "{}PM", h - 12),
        }
    }
}

/// Inclusive hour window; `start > end` wraps past midnight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HourWindow {
    pub start: u32,
    pub end: u32,
}

impl HourWindow {
    pub fn new(start: ClockHour, end: ClockHour) -> Self {
        Self {
            start: start.hour(),
            end: end.hour(),
        }
    }

    pub fn crosses_midnight(&self) -> bool {
        self.start > self.end
    }
}

impl fmt::Display for HourWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (ClockHour::from_24h(self.start), ClockHour::from_24h(self.end)) {
            (Some(start), Some(end)) => write!(f, "{} -> {}", start, end),
            _ => write!(f, "{}h -> {}h", self.start, self.end),
        }
    }
}

/// A calendar date on which shutdown lasts all day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRule {
    /// Same month and day every year (`December 25`, `12/25`)
    Annual { month: u32, day: u32 },
    /// One specific date (`2026-12-25`, `December 25, 2026`)
    Exact(NaiveDate),
}

impl fmt::Display for DateRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateRule::Annual { month, day } => write!(f, "every {:02}-{:02}", month, day),
            DateRule::Exact(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

/// One normalized segment of a schedule tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleRule {
    /// On any of `days`, shut down between `window.start` and `window.end`
    Window { days: WeekdaySet, window: HourWindow },
    /// Shut down all day on this weekday
    Weekday(Weekday),
    /// Shut down all day on this date
    Date(DateRule),
}

impl fmt::Display for ScheduleRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleRule::Window { days, window } => write!(f, "{} {}", days, window),
            ScheduleRule::Weekday(day) => write!(f, "{} (all day)", weekday_name(*day)),
            ScheduleRule::Date(date) => write!(f, "{} (all day)", date),
        }
    }
}

/// Why a single segment was dropped
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SegmentErrorKind {
    #[error("empty segment")]
    Empty,

    #[error("time range has no weekday")]
    TimeWithoutWeekday,

    #[error("more than one time range in segment")]
    MultipleTimeRanges,

    #[error("malformed time range: {0}")]
    MalformedTimeRange(String),

    #[error("invalid hour '{0}' (expected 1-12 followed by AM or PM)")]
    InvalidHour(String),

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("no weekday, time range or date recognized")]
    Unrecognized,
}

/// A dropped segment, kept for logging
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("segment {index} '{segment}': {kind}")]
pub struct SegmentError {
    pub index: usize,
    pub segment: String,
    pub kind: SegmentErrorKind,
}

/// A rule that cannot be evaluated because its fields are inconsistent
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    #[error("hour window {start}..{end} is outside 0-23")]
    HourOutOfRange { start: u32, end: u32 },

    #[error("window has no weekdays")]
    EmptyWeekdaySet,

    #[error("month {month} / day {day} is not a calendar date")]
    InvalidDate { month: u32, day: u32 },
}
