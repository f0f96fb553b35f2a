//! # slot-engine
//!
//! Finds fixed-duration free slots across multiple calendars.
//!
//! Busy intervals from every calendar are normalized into one sorted,
//! non-overlapping set, then the requested date range is walked in slot-sized
//! steps inside a daily working-hours window. Steps that touch no busy interval
//! are returned as free slots.
//!
//! ## Modules
//!
//! - [`interval`] — Busy-interval normalization (drop, sort, coalesce)
//! - [`scanner`] — Scan parameters and free-slot enumeration
//! - [`availability`] — Multi-calendar entry point and report
//! - [`calendar`] — `.ics` discovery and busy-occurrence extraction (RRULE aware)
//! - [`dst`] — Local wall-clock resolution across DST transitions
//! - [`error`] — Error types

pub mod availability;
pub mod calendar;
pub mod dst;
pub mod error;
pub mod interval;
pub mod scanner;

pub use availability::{find_free_time, first_free_slot, CalendarSource, FreeTimeReport};
pub use calendar::{discover_calendars, load_calendar, parse_ics, SourceLimits};
pub use error::SlotError;
pub use interval::{normalize, BusyIntervalSet, NormalizeReport, Normalized, TimeInterval};
pub use scanner::{parse_date, parse_date_range, scan, FreeSlot, ScanParameters};
