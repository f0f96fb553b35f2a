//! Error types for slot-engine operations.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SlotError {
    /// A scan parameter violated its invariant. Raised before any scanning.
    #[error("Invalid parameter `{field}`: {reason}")]
    InvalidParameter { field: &'static str, reason: String },

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Calendar directory not found: {}", .0.display())]
    CalendarNotFound(PathBuf),

    #[error("Found {found} calendar files, limit is {limit}")]
    TooManyCalendars { found: usize, limit: usize },

    #[error("Calendar {} is {size} bytes, limit is {limit}", path.display())]
    CalendarTooLarge {
        path: PathBuf,
        size: u64,
        limit: u64,
    },

    #[error("Error parsing {}: {reason}", path.display())]
    CalendarParse { path: PathBuf, reason: String },

    #[error("Invalid RRULE in {}: {reason}", path.display())]
    InvalidRule { path: PathBuf, reason: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SlotError {
    pub(crate) fn parameter(field: &'static str, reason: impl Into<String>) -> Self {
        SlotError::InvalidParameter {
            field,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SlotError>;
