//! Decides whether a reference instant falls inside any shutdown rule
//!
//! All comparisons use the UTC weekday, date and hour of the instant. Hours are
//! compared at hour granularity with inclusive bounds, so the verdict can only
//! change on an hour boundary.

use super::{DateRule, EvaluationError, HourWindow, ScheduleRule};
use chrono::{DateTime, Datelike, Timelike, Utc};
use tracing::warn;

impl HourWindow {
    /// Inclusive containment; a window with `start > end` wraps past midnight
    pub fn contains(&self, hour: u32) -> Result<bool, EvaluationError> {
        if self.start > 23 || self.end > 23 {
            return Err(EvaluationError::HourOutOfRange {
                start: self.start,
                end: self.end,
            });
        }
        Ok(if self.start <= self.end {
            self.start <= hour && hour <= self.end
        } else {
            hour >= self.start || hour <= self.end
        })
    }
}

impl DateRule {
    pub fn matches(&self, now: DateTime<Utc>) -> Result<bool, EvaluationError> {
        match self {
            DateRule::Annual { month, day } => {
                if !(1..=12).contains(month) || !(1..=31).contains(day) {
                    return Err(EvaluationError::InvalidDate {
                        month: *month,
                        day: *day,
                    });
                }
                Ok(now.month() == *month && now.day() == *day)
            }
            DateRule::Exact(date) => Ok(now.date_naive() == *date),
        }
    }
}

impl ScheduleRule {
    pub fn matches(&self, now: DateTime<Utc>) -> Result<bool, EvaluationError> {
        match self {
            ScheduleRule::Window { days, window } => {
                if days.is_empty() {
                    return Err(EvaluationError::EmptyWeekdaySet);
                }
                let in_window = window.contains(now.hour())?;
                Ok(in_window && days.contains(now.weekday()))
            }
            ScheduleRule::Weekday(day) => Ok(now.weekday() == *day),
            ScheduleRule::Date(date) => date.matches(now),
        }
    }
}

/// First rule whose shutdown window contains `now`
///
/// A rule that cannot be evaluated is logged and treated as non-matching.
pub fn first_match(rules: &[ScheduleRule], now: DateTime<Utc>) -> Option<&ScheduleRule> {
    rules.iter().find(|rule| match rule.matches(now) {
        Ok(matched) => matched,
        Err(e) => {
            warn!("Skipping schedule rule '{}': {}", rule, e);
            false
        }
    })
}

/// Verdict: true when shutdown is active at `now`
pub fn evaluate(rules: &[ScheduleRule], now: DateTime<Utc>) -> bool {
    first_match(rules, now).is_some()
}
