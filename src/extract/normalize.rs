//! Field normalizers: raw display strings to typed values.
//!
//! Each normalizer is pure and fails with a [`NormalizeError`] naming the
//! raw input, which discards only the enclosing listing.

use std::num::IntErrorKind;
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use regex::Regex;
use thiserror::Error;

use crate::models::Price;

/// Normalization failures. Always per-field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("malformed amount {0:?}")]
    MalformedAmount(String),
    #[error("value {0:?} is out of range")]
    OutOfRange(String),
    #[error("malformed number {0:?}")]
    MalformedNumber(String),
    #[error("malformed duration {0:?}")]
    MalformedDuration(String),
    #[error("malformed end date {0:?}")]
    MalformedDate(String),
}

static AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-9]*)(?:\.([0-9]*))?$").unwrap());

/// A number glued to a run of letters: "15m", "2d", "40s".
static DURATION_COMPONENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]+)([A-Za-z]+)").unwrap());

static LEADING_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9][0-9,]*").unwrap());

/// Parse format for end dates once commas are dropped: "2026 Jan 5 3:45 PM".
const END_DATE_FORMAT: &str = "%Y %b %d %I:%M %p";

fn strip_separators(text: &str) -> String {
    text.trim().chars().filter(|c| *c != ',').collect()
}

/// Parse a currency amount like "1,234.5" into a fixed-point price.
///
/// Thousands separators are dropped and the value is quantized to two
/// fractional digits, rounding half to even.
pub fn normalize_amount(text: &str) -> Result<Price, NormalizeError> {
    let malformed = || NormalizeError::MalformedAmount(text.to_string());

    let cleaned = strip_separators(text);
    let caps = AMOUNT.captures(&cleaned).ok_or_else(malformed)?;
    let whole = caps.get(1).map_or("", |m| m.as_str());
    let fraction = caps.get(2).map_or("", |m| m.as_str());
    if whole.is_empty() && fraction.is_empty() {
        return Err(malformed());
    }

    let whole: u64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| malformed())?
    };

    let digits: Vec<u64> = fraction.bytes().map(|b| u64::from(b - b'0')).collect();
    let tenths = digits.first().copied().unwrap_or(0);
    let hundredths = digits.get(1).copied().unwrap_or(0);

    let mut cents = whole
        .checked_mul(100)
        .and_then(|c| c.checked_add(tenths * 10 + hundredths))
        .ok_or_else(malformed)?;

    if rounds_up(digits.get(2..).unwrap_or(&[]), cents) {
        cents = cents.checked_add(1).ok_or_else(malformed)?;
    }

    Ok(Price::from_cents(cents))
}

/// Half-to-even decision for the digits past the hundredths place.
fn rounds_up(rest: &[u64], cents: u64) -> bool {
    match rest.split_first() {
        None => false,
        Some((&first, tail)) => match first {
            6..=9 => true,
            5 if tail.iter().any(|&d| d > 0) => true,
            5 => cents % 2 == 1,
            _ => false,
        },
    }
}

/// Parse a comma-grouped integer distance that must fit an unsigned 16-bit column.
pub fn normalize_bounded_distance(text: &str) -> Result<u16, NormalizeError> {
    let cleaned = strip_separators(text);
    if cleaned.is_empty() {
        return Err(NormalizeError::MalformedNumber(text.to_string()));
    }

    match cleaned.parse::<i64>() {
        Ok(value) => u16::try_from(value).map_err(|_| NormalizeError::OutOfRange(text.to_string())),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
                Err(NormalizeError::OutOfRange(text.to_string()))
            }
            _ => Err(NormalizeError::MalformedNumber(text.to_string())),
        },
    }
}

/// Parse a compact countdown such as "2d 3h 15m 40s" into total seconds.
///
/// Components must appear in d, h, m, s order; each is optional but at
/// least one is required. Tokens with other letter suffixes are ignored.
pub fn normalize_duration(text: &str) -> Result<u64, NormalizeError> {
    let malformed = || NormalizeError::MalformedDuration(text.to_string());

    let mut total: u64 = 0;
    let mut last_rank: Option<usize> = None;

    for caps in DURATION_COMPONENT.captures_iter(text) {
        let (rank, unit_secs) = match &caps[2] {
            "d" => (0, 86_400),
            "h" => (1, 3_600),
            "m" => (2, 60),
            "s" => (3, 1),
            _ => continue,
        };
        if last_rank.is_some_and(|last| rank <= last) {
            return Err(malformed());
        }
        last_rank = Some(rank);

        let value: u64 = caps[1].parse().map_err(|_| malformed())?;
        total = value
            .checked_mul(unit_secs)
            .and_then(|secs| total.checked_add(secs))
            .ok_or_else(malformed)?;
    }

    match last_rank {
        Some(_) => Ok(total),
        None => Err(malformed()),
    }
}

/// Parse an end date like "Jan 5, 3:45 PM" relative to `today`.
///
/// The page omits the year. The current year is assumed, rolled forward
/// when the month has already passed (a January auction seen in December).
pub fn normalize_end_date(text: &str, today: NaiveDate) -> Result<NaiveDateTime, NormalizeError> {
    let malformed = || NormalizeError::MalformedDate(text.to_string());

    let cleaned = text.replace(',', " ");
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        return Err(malformed());
    }

    // Leap year placeholder so "Feb 29" parses before the real year is known.
    let probe = NaiveDateTime::parse_from_str(&format!("2000 {}", cleaned), END_DATE_FORMAT)
        .map_err(|_| malformed())?;

    let year = if probe.month() < today.month() {
        today.year() + 1
    } else {
        today.year()
    };

    NaiveDate::from_ymd_opt(year, probe.month(), probe.day())
        .map(|date| date.and_time(probe.time()))
        .ok_or_else(malformed)
}

/// Parse a bid count from text like "14" or "14 Bids".
pub fn normalize_bid_count(text: &str) -> Result<u32, NormalizeError> {
    let token = LEADING_COUNT
        .find(text)
        .ok_or_else(|| NormalizeError::MalformedNumber(text.to_string()))?;
    let cleaned = strip_separators(token.as_str());
    cleaned
        .parse()
        .map_err(|_| NormalizeError::OutOfRange(text.to_string()))
}
