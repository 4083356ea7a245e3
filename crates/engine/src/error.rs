//! Errors raised while building validators and the sheet schema.
//!
//! These are programmer/schema errors: they surface once at startup and are
//! never produced by recalculation or editing, which are total.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unsupported date format {0:?} (only yyyy/MM/dd is supported)")]
    UnsupportedDateFormat(String),

    #[error("Bound {0} is outside the safe integer range")]
    UnsafeBound(i64),

    #[error("Inverted range: min {min} is greater than max {max}")]
    InvertedRange { min: i64, max: i64 },

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Cyclic schema: {}", .0.join(" -> "))]
    CyclicSchema(Vec<String>),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
