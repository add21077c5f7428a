//! Recursive-descent parser turning a schedule tag into rules
//!
//! Grammar for one comma-separated segment:
//!
//! ```text
//! segment := date | year | item*
//! item    := WEEKDAY | range | <ignored>
//! range   := hour ARROW hour
//! hour    := HOUR | NUMBER MERIDIEM
//! date    := MONTH NUMBER [NUMBER]
//!          | NUMBER MONTH [NUMBER]
//!          | NUMBER '-' NUMBER '-' NUMBER          (year-month-day)
//!          | NUMBER '/' NUMBER ['/' NUMBER]        (month/day[/year])
//! year    := NUMBER                                (4 digits, completes the previous date)
//! ```
//!
//! Weekday-only segments are held back and attached to the next time range when
//! that range names no weekday of its own, so `Saturday, Sunday, 10PM -> 5AM` is
//! a single window rule. Held-back weekdays that meet anything else (a range with
//! its own weekdays, a date, a malformed segment or the end of the tag) become
//! all-day rules.

use super::tokenizer::{tokenize, Token};
use super::{
    ClockHour, DateRule, HourWindow, ScheduleRule, SegmentError, SegmentErrorKind, WeekdaySet,
};
use chrono::{NaiveDate, Weekday};
use tracing::{debug, warn};

/// Leap year used to validate annual month/day pairs so that February 29 is accepted
const VALIDATION_YEAR: i32 = 2000;

/// Rules recovered from a tag plus the segments that had to be dropped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSchedule {
    pub rules: Vec<ScheduleRule>,
    pub errors: Vec<SegmentError>,
}

impl ParsedSchedule {
    /// True when no segment produced a rule
    pub fn is_unusable(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Shape of one successfully parsed segment before weekday grouping
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Weekdays(Vec<Weekday>),
    Window {
        days: Vec<Weekday>,
        window: HourWindow,
    },
    Date(DateRule),
    Year(i32),
}

pub fn parse(tag_value: &str) -> ParsedSchedule {
    let mut parsed = ParsedSchedule::default();
    let mut pending_days: Vec<Weekday> = Vec::new();
    // Index into `parsed.rules` of an annual date written by the previous segment
    let mut open_annual: Option<usize> = None;

    for (index, raw) in tag_value.split(',').enumerate() {
        let text = raw.trim();
        let previous_annual = open_annual.take();

        let segment = match parse_segment(text) {
            Ok(segment) => segment,
            Err(kind) => {
                if !pending_days.is_empty() {
                    debug!(
                        "Keeping weekdays {:?} as whole-day rules ahead of malformed segment '{}'",
                        pending_days, text
                    );
                    flush_bare_weekdays(&mut pending_days, &mut parsed.rules);
                }
                parsed.errors.push(SegmentError {
                    index,
                    segment: text.to_string(),
                    kind,
                });
                continue;
            }
        };

        match segment {
            Segment::Weekdays(days) => pending_days.extend(days),
            Segment::Window { days, window } => {
                // Only a range without weekdays of its own borrows the preceding weekday segments
                let set: WeekdaySet = if days.is_empty() {
                    pending_days.drain(..).collect()
                } else {
                    flush_bare_weekdays(&mut pending_days, &mut parsed.rules);
                    days.into_iter().collect()
                };
                if set.is_empty() {
                    parsed.errors.push(SegmentError {
                        index,
                        segment: text.to_string(),
                        kind: SegmentErrorKind::TimeWithoutWeekday,
                    });
                } else {
                    parsed.rules.push(ScheduleRule::Window { days: set, window });
                }
            }
            Segment::Date(date) => {
                flush_bare_weekdays(&mut pending_days, &mut parsed.rules);
                parsed.rules.push(ScheduleRule::Date(date));
                if matches!(date, DateRule::Annual { .. }) {
                    open_annual = Some(parsed.rules.len() - 1);
                }
            }
            Segment::Year(year) => {
                let completed = previous_annual.and_then(|idx| match parsed.rules.get(idx) {
                    Some(ScheduleRule::Date(DateRule::Annual { month, day })) => {
                        Some((idx, NaiveDate::from_ymd_opt(year, *month, *day)))
                    }
                    _ => None,
                });
                match completed {
                    Some((idx, Some(date))) => {
                        parsed.rules[idx] = ScheduleRule::Date(DateRule::Exact(date));
                    }
                    Some((_, None)) => parsed.errors.push(SegmentError {
                        index,
                        segment: text.to_string(),
                        kind: SegmentErrorKind::InvalidDate(format!(
                            "previous date does not exist in {}",
                            year
                        )),
                    }),
                    None => parsed.errors.push(SegmentError {
                        index,
                        segment: text.to_string(),
                        kind: SegmentErrorKind::Unrecognized,
                    }),
                }
            }
        }
    }

    flush_bare_weekdays(&mut pending_days, &mut parsed.rules);
    parsed
}

fn flush_bare_weekdays(pending: &mut Vec<Weekday>, rules: &mut Vec<ScheduleRule>) {
    rules.extend(pending.drain(..).map(ScheduleRule::Weekday));
}

fn parse_segment(text: &str) -> Result<Segment, SegmentErrorKind> {
    let tokens = tokenize(text)?;
    if tokens.is_empty() {
        return Err(SegmentErrorKind::Empty);
    }

    if let Some(date) = SegmentParser::new(&tokens).date()? {
        return Ok(Segment::Date(date));
    }

    if let [Token::Number(year)] = tokens.as_slice() {
        if (1000..=9999).contains(year) {
            return Ok(Segment::Year(*year as i32));
        }
    }

    SegmentParser::new(&tokens).items(text)
}

struct SegmentParser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> SegmentParser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&'a Token> {
        self.tokens.get(self.pos + offset)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Whole-segment date literal; `Ok(None)` when the tokens do not look like a date
    fn date(&mut self) -> Result<Option<DateRule>, SegmentErrorKind> {
        let (month, day, year) = match self.tokens {
            [Token::Month(m), Token::Number(d)] | [Token::Number(d), Token::Month(m)] => {
                (*m, *d, None)
            }
            [Token::Month(m), Token::Number(d), Token::Number(y)]
            | [Token::Number(d), Token::Month(m), Token::Number(y)] => (*m, *d, Some(*y)),
            [Token::Number(y), Token::DateSeparator('-'), Token::Number(m), Token::DateSeparator('-'), Token::Number(d)]
                if *y >= 1000 =>
            {
                (*m, *d, Some(*y))
            }
            [Token::Number(m), Token::DateSeparator('/'), Token::Number(d)] => (*m, *d, None),
            [Token::Number(m), Token::DateSeparator('/'), Token::Number(d), Token::DateSeparator('/'), Token::Number(y)]
                if *y >= 1000 =>
            {
                (*m, *d, Some(*y))
            }
            _ => return Ok(None),
        };
        self.pos = self.tokens.len();

        match year {
            Some(y) => NaiveDate::from_ymd_opt(y as i32, month, day)
                .map(|date| Some(DateRule::Exact(date)))
                .ok_or_else(|| {
                    SegmentErrorKind::InvalidDate(format!("{}-{:02}-{:02}", y, month, day))
                }),
            None => NaiveDate::from_ymd_opt(VALIDATION_YEAR, month, day)
                .map(|_| Some(DateRule::Annual { month, day }))
                .ok_or_else(|| SegmentErrorKind::InvalidDate(format!("month {} day {}", month, day))),
        }
    }

    /// Weekdays and at most one time range; unknown tokens are skipped with a warning
    fn items(&mut self, text: &str) -> Result<Segment, SegmentErrorKind> {
        let mut days: Vec<Weekday> = Vec::new();
        let mut windows: Vec<HourWindow> = Vec::new();
        let mut ignored: Vec<String> = Vec::new();

        while let Some(token) = self.peek() {
            match token {
                Token::Weekday(day) => {
                    self.advance();
                    days.push(*day);
                }
                Token::Hour(_) | Token::Number(_)
                    if self.hour_starts_here() =>
                {
                    windows.push(self.range()?);
                }
                Token::Arrow => {
                    return Err(SegmentErrorKind::MalformedTimeRange(
                        "separator without a start hour".to_string(),
                    ));
                }
                other => {
                    self.advance();
                    ignored.push(describe(other));
                }
            }
        }

        if windows.len() > 1 {
            return Err(SegmentErrorKind::MultipleTimeRanges);
        }

        let segment = match windows.pop() {
            Some(window) => Segment::Window { days, window },
            None if !days.is_empty() => Segment::Weekdays(days),
            None => return Err(SegmentErrorKind::Unrecognized),
        };

        if !ignored.is_empty() {
            warn!("Ignoring unrecognized tokens {:?} in schedule segment '{}'", ignored, text);
        }

        Ok(segment)
    }

    fn hour_starts_here(&self) -> bool {
        match self.peek() {
            Some(Token::Hour(_)) => true,
            Some(Token::Number(_)) => matches!(self.peek_at(1), Some(Token::Meridiem(_))),
            _ => false,
        }
    }

    fn range(&mut self) -> Result<HourWindow, SegmentErrorKind> {
        let start = self.hour()?;
        match self.advance() {
            Some(Token::Arrow) => {}
            _ => {
                return Err(SegmentErrorKind::MalformedTimeRange(format!(
                    "expected '->' after {}",
                    start
                )))
            }
        }
        if self.at_end() {
            return Err(SegmentErrorKind::MalformedTimeRange(format!(
                "missing end hour after {} ->",
                start
            )));
        }
        let end = self.hour()?;
        Ok(HourWindow::new(start, end))
    }

    fn hour(&mut self) -> Result<ClockHour, SegmentErrorKind> {
        match self.advance() {
            Some(Token::Hour(hour)) => Ok(*hour),
            Some(Token::Number(n)) => match self.advance() {
                Some(Token::Meridiem(m)) => ClockHour::from_12h(*n, *m)
                    .ok_or_else(|| SegmentErrorKind::InvalidHour(n.to_string())),
                _ => Err(SegmentErrorKind::MalformedTimeRange(format!(
                    "hour {} has no AM/PM",
                    n
                ))),
            },
            Some(other) => Err(SegmentErrorKind::MalformedTimeRange(format!(
                "expected an hour, found {}",
                describe(other)
            ))),
            None => Err(SegmentErrorKind::MalformedTimeRange(
                "expected an hour".to_string(),
            )),
        }
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Weekday(day) => super::weekday_name(*day).to_string(),
        Token::Hour(hour) => hour.to_string(),
        Token::Number(n) => n.to_string(),
        Token::Meridiem(super::Meridiem::Am) => "AM".to_string(),
        Token::Meridiem(super::Meridiem::Pm) => "PM".to_string(),
        Token::Month(m) => format!("month {}", m),
        Token::Arrow => "->".to_string(),
        Token::DateSeparator(c) => c.to_string(),
        Token::Word(w) => w.clone(),
    }
}
