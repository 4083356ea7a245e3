//! Per-column validators.
//!
//! A validator judges whether a cell's value conforms to its column's rule:
//! membership in a set of values taken from another sheet, a calendar date in
//! `yyyy/MM/dd`, or an integer within bounds.
//!
//! Validation is advisory. Invalid values are stored and computed over as-is;
//! the presentation layer only uses the verdict for highlighting.
//!
//! Blank cells are always valid, whatever the rule.

use std::sync::{Arc, OnceLock};

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use rustc_hash::FxHashSet;

use crate::cell::Cell;
use crate::error::{ConfigError, Result};
use crate::sheet::Sheet;

/// Largest integer magnitude accepted by integer rules (2^53 - 1).
pub const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;

/// Message shown for any violation. Rules do not carry their own messages.
pub const VIOLATION_MESSAGE: &str = "Value violates the column's validation rule";

// ============================================================================
// Literal Grammars
// ============================================================================

fn int_literal_re() -> &'static Regex {
    static INT_RE: OnceLock<Regex> = OnceLock::new();
    INT_RE.get_or_init(|| {
        Regex::new(r"^(?:-?[1-9][0-9]*|0)$").expect("integer literal regex must compile")
    })
}

fn date_shape_re() -> &'static Regex {
    static DATE_RE: OnceLock<Regex> = OnceLock::new();
    DATE_RE.get_or_init(|| {
        Regex::new(r"^[0-9]{4}/[0-9]{2}/[0-9]{2}$").expect("date shape regex must compile")
    })
}

/// Parse a strict base-10 integer literal.
///
/// Accepts an optional single leading `-` and no leading zeros except the
/// literal `0`. No whitespace, no `+`. Values outside the safe integer range
/// are rejected.
///
/// ```
/// use guildloot_engine::validation::parse_strict_int;
///
/// assert_eq!(parse_strict_int("42"), Some(42));
/// assert_eq!(parse_strict_int("-7"), Some(-7));
/// assert_eq!(parse_strict_int("07"), None);
/// assert_eq!(parse_strict_int(" 1"), None);
/// ```
pub fn parse_strict_int(value: &str) -> Option<i64> {
    if !int_literal_re().is_match(value) {
        return None;
    }
    let n = value.parse::<i64>().ok()?;
    is_safe_integer(n).then_some(n)
}

fn is_safe_integer(n: i64) -> bool {
    (-MAX_SAFE_INTEGER..=MAX_SAFE_INTEGER).contains(&n)
}

// ============================================================================
// Date Format
// ============================================================================

/// Supported date formats. Only `yyyy/MM/dd` exists today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    YearMonthDay,
}

impl DateFormat {
    pub fn from_pattern(pattern: &str) -> Result<Self> {
        match pattern {
            "yyyy/MM/dd" => Ok(DateFormat::YearMonthDay),
            other => Err(ConfigError::UnsupportedDateFormat(other.to_string())),
        }
    }

    /// Parse a value in this format, rejecting dates that do not exist.
    pub fn parse(&self, value: &str) -> Option<NaiveDate> {
        match self {
            DateFormat::YearMonthDay => {
                if !date_shape_re().is_match(value) {
                    return None;
                }
                let mut parts = value.split('/');
                let y: i32 = parts.next()?.parse().ok()?;
                let m: u32 = parts.next()?.parse().ok()?;
                let d: u32 = parts.next()?.parse().ok()?;
                // Two-digit years would be read as 19xx elsewhere; refuse them.
                if y < 100 {
                    return None;
                }

                // Round-trip the components so impossible dates like 2024/02/30 fail.
                let date = NaiveDate::from_ymd_opt(y, m, d)?;
                (date.year() == y && date.month() == m && date.day() == d).then_some(date)
            }
        }
    }
}

// ============================================================================
// Validator
// ============================================================================

/// A rule judging whether a cell's value conforms to its column.
#[derive(Debug, Clone, PartialEq)]
pub enum Validator {
    /// Value must be one of the permitted strings (exact, case-sensitive).
    ValueSet(Arc<FxHashSet<String>>),
    /// Value must be a real calendar date in the given format.
    Date(DateFormat),
    /// Value must be a strict integer literal within `[min, max]`.
    IntRange { min: i64, max: i64 },
}

impl Validator {
    /// Snapshot every non-empty data cell of `sheet` as the permitted values.
    /// The header row is not included.
    pub fn from_value_set(sheet: &Sheet) -> Self {
        Self::from_values(
            sheet
                .rows()
                .iter()
                .flatten()
                .filter(|c| !c.is_empty())
                .map(|c| c.value().to_string()),
        )
    }

    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Validator::ValueSet(Arc::new(values.into_iter().map(Into::into).collect()))
    }

    pub fn from_date_format(format: &str) -> Result<Self> {
        Ok(Validator::Date(DateFormat::from_pattern(format)?))
    }

    pub fn from_int_range(min: i64, max: i64) -> Result<Self> {
        for bound in [min, max] {
            if !is_safe_integer(bound) {
                return Err(ConfigError::UnsafeBound(bound));
            }
        }
        if min > max {
            return Err(ConfigError::InvertedRange { min, max });
        }
        Ok(Validator::IntRange { min, max })
    }

    pub fn validate(&self, cell: &Cell) -> bool {
        if cell.is_empty() {
            return true;
        }
        let value = cell.value();

        match self {
            Validator::ValueSet(values) => values.contains(value),
            Validator::Date(format) => format.parse(value).is_some(),
            Validator::IntRange { min, max } => {
                parse_strict_int(value).is_some_and(|n| *min <= n && n <= *max)
            }
        }
    }

    pub fn message(&self) -> &'static str {
        VIOLATION_MESSAGE
    }
}
