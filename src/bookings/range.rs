use rust_decimal::Decimal;
use serde::Serialize;
use time::{macros::format_description, Date};

use crate::error::AppError;

/// Inclusive `[start, end]` range of rental days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: Date,
    pub end: Date,
}

impl DateRange {
    /// Builds a range, rejecting `end < start`.
    pub fn new(start: Date, end: Date) -> Result<Self, AppError> {
        if end < start {
            return Err(AppError::validation("end_date", "invalid range"));
        }
        Ok(Self { start, end })
    }

    /// Two inclusive ranges overlap iff each starts no later than the other ends.
    /// A shared boundary day counts as overlap.
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Number of reserved days, both endpoints included.
    pub fn days(&self) -> i64 {
        (self.end - self.start).whole_days() + 1
    }

    pub fn total_price(&self, price_per_day: Decimal) -> Decimal {
        price_per_day * Decimal::from(self.days())
    }
}

/// Trimmed field text; absent or blank input is missing.
pub fn present<'a>(field: &'static str, raw: Option<&'a str>) -> Result<&'a str, AppError> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::missing(field))
}

/// Parses a `YYYY-MM-DD` field, treating absent or blank input as missing.
pub fn parse_date(field: &'static str, raw: Option<&str>) -> Result<Date, AppError> {
    let raw = present(field, raw)?;
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .map_err(|_| AppError::validation(field, "expected a YYYY-MM-DD date"))
}
