//! Date and month-code conversions at the display/storage boundary.
//!
//! # Responsibility
//! - Convert between the display form `dd/mm/yyyy` and the ISO storage form.
//! - Compute month intervals for range queries.
//! - Parse and format six-character month codes (`MMYYYY`).
//!
//! # Invariants
//! - A display date is valid only if it has the exact shape and is a real
//!   calendar date (`31/02/2024` is rejected).

use chrono::{Datelike, Months, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::{Display, Formatter};

pub const DISPLAY_DATE_FORMAT: &str = "%d/%m/%Y";
pub const STORAGE_DATE_FORMAT: &str = "%Y-%m-%d";

static DISPLAY_DATE_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{2}/[0-9]{2}/[0-9]{4}$").expect("static date pattern"));
static MONTH_CODE_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(0[1-9]|1[0-2])[0-9]{4}$").expect("static month pattern"));

/// Parses a `dd/mm/yyyy` date.
pub fn parse_display_date(value: &str) -> Option<NaiveDate> {
    if !DISPLAY_DATE_SHAPE.is_match(value) {
        return None;
    }
    NaiveDate::parse_from_str(value, DISPLAY_DATE_FORMAT).ok()
}

/// Parses a `yyyy-mm-dd` date as persisted in the store.
pub fn parse_storage_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, STORAGE_DATE_FORMAT).ok()
}

pub fn format_display_date(date: NaiveDate) -> String {
    date.format(DISPLAY_DATE_FORMAT).to_string()
}

pub fn format_storage_date(date: NaiveDate) -> String {
    date.format(STORAGE_DATE_FORMAT).to_string()
}

/// Converts `dd/mm/yyyy` into `yyyy-mm-dd`.
pub fn display_to_storage(value: &str) -> Option<String> {
    parse_display_date(value).map(format_storage_date)
}

/// Converts `yyyy-mm-dd` into `dd/mm/yyyy`.
pub fn storage_to_display(value: &str) -> Option<String> {
    parse_storage_date(value).map(format_display_date)
}

/// Half-open interval `[first day of month, first day of next month)`.
///
/// Returns `None` only at the edge of chrono's supported date range.
pub fn month_bounds(date: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let start = date.with_day(1)?;
    let end = start.checked_add_months(Months::new(1))?;
    Some((start, end))
}

/// Month identifier used to key budget rows, e.g. `082024`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthCode {
    year: i32,
    month: u32,
}

impl MonthCode {
    /// Parses a six-character `MMYYYY` code.
    pub fn parse(value: &str) -> Option<Self> {
        if !MONTH_CODE_SHAPE.is_match(value) {
            return None;
        }
        let month = value[0..2].parse().ok()?;
        let year = value[2..6].parse().ok()?;
        Some(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// First day of the month.
    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    /// Returns whether `date` falls in this month of this year.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl Display for MonthCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}{:04}", self.month, self.year)
    }
}
