//! Lexer for a single schedule segment
//!
//! Produces a flat token stream; the parser decides what the tokens mean.

use super::{weekday_from_name, ClockHour, Meridiem, SegmentErrorKind};
use chrono::Weekday;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Canonical weekday name, e.g. `Monday`
    Weekday(Weekday),
    /// Hour with attached meridiem, e.g. `10PM`
    Hour(ClockHour),
    /// Plain or ordinal number, e.g. `10`, `25th`, `2026`
    Number(u32),
    /// Detached `AM`/`PM`, as in `10 PM`
    Meridiem(Meridiem),
    /// Month name or abbreviation, 1-based
    Month(u32),
    /// `->` or `>`
    Arrow,
    /// `-` or `/` inside numeric dates
    DateSeparator(char),
    /// Anything else; ignored by the parser with a warning
    Word(String),
}

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

pub fn tokenize(segment: &str) -> Result<Vec<Token>, SegmentErrorKind> {
    let mut tokens = Vec::new();
    let mut chars = segment.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '-' => {
                chars.next();
                if matches!(chars.peek(), Some(&(_, '>'))) {
                    chars.next();
                    tokens.push(Token::Arrow);
                } else {
                    tokens.push(Token::DateSeparator('-'));
                }
            }
            '>' => {
                chars.next();
                tokens.push(Token::Arrow);
            }
            '/' => {
                chars.next();
                tokens.push(Token::DateSeparator('/'));
            }
            c if c.is_alphanumeric() => {
                let mut end = start;
                while let Some(&(i, ch)) = chars.peek() {
                    if !ch.is_alphanumeric() {
                        break;
                    }
                    end = i + ch.len_utf8();
                    chars.next();
                }
                tokens.push(classify_word(&segment[start..end])?);
            }
            other => {
                chars.next();
                tokens.push(Token::Word(other.to_string()));
            }
        }
    }

    Ok(tokens)
}

fn classify_word(word: &str) -> Result<Token, SegmentErrorKind> {
    let digits_end = word
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(word.len());
    let (digits, suffix) = word.split_at(digits_end);

    if digits.is_empty() {
        return Ok(classify_alpha(word));
    }

    if suffix.is_empty() {
        return Ok(digits
            .parse()
            .map(Token::Number)
            .unwrap_or_else(|_| Token::Word(word.to_string())));
    }

    if let Some(meridiem) = meridiem(suffix) {
        let hour = digits
            .parse::<u32>()
            .ok()
            .filter(|_| digits.len() <= 2)
            .and_then(|h| ClockHour::from_12h(h, meridiem))
            .ok_or_else(|| SegmentErrorKind::InvalidHour(word.to_string()))?;
        return Ok(Token::Hour(hour));
    }

    let is_ordinal = ["st", "nd", "rd", "th"]
        .iter()
        .any(|s| suffix.eq_ignore_ascii_case(s));
    if is_ordinal {
        if let Ok(n) = digits.parse() {
            return Ok(Token::Number(n));
        }
    }

    Ok(Token::Word(word.to_string()))
}

fn classify_alpha(word: &str) -> Token {
    if let Some(day) = weekday_from_name(word) {
        return Token::Weekday(day);
    }
    if let Some(m) = meridiem(word) {
        return Token::Meridiem(m);
    }
    if let Some(month) = month_from_name(word) {
        return Token::Month(month);
    }
    Token::Word(word.to_string())
}

fn meridiem(text: &str) -> Option<Meridiem> {
    if text.eq_ignore_ascii_case("am") {
        Some(Meridiem::Am)
    } else if text.eq_ignore_ascii_case("pm") {
        Some(Meridiem::Pm)
    } else {
        None
    }
}

/// Full name or three-letter abbreviation (`Sept` also accepted), any case
fn month_from_name(word: &str) -> Option<u32> {
    let lower = word.to_ascii_lowercase();
    if lower == "sept" {
        return Some(9);
    }
    MONTHS
        .iter()
        .position(|name| *name == lower || (lower.len() == 3 && name.starts_with(&lower)))
        .map(|idx| idx as u32 + 1)
}
