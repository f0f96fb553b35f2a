//! Fixed-duration free-slot enumeration.
//!
//! Walks the requested range in steps of the slot duration, confined to a daily
//! working-hours window, and emits every step that does not intersect the
//! normalized busy set. Remainder time at the end of a working day that cannot
//! hold a whole slot is never offered as a shorter slot.

use chrono::{DateTime, Duration, NaiveDate};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{debug, trace};

use crate::dst::at_hour;
use crate::error::{Result, SlotError};
use crate::interval::{rfc3339, BusyIntervalSet, TimeInterval};

pub const DEFAULT_SLOT_DURATION_MINUTES: i64 = 60;
pub const DEFAULT_WORK_START_HOUR: u32 = 9;
pub const DEFAULT_WORK_END_HOUR: u32 = 21;

/// Date format accepted by [`parse_date`] first; ISO `YYYY-MM-DD` is the fallback.
pub const DATE_FORMAT: &str = "%m/%d/%Y";

/// Configuration governing one scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanParameters {
    /// Inclusive start of the scanned range.
    pub range_start: DateTime<Tz>,
    /// Exclusive end of the scanned range.
    pub range_end: DateTime<Tz>,
    pub slot_duration_minutes: i64,
    pub work_start_hour: u32,
    /// `24` means the working day runs until midnight.
    pub work_end_hour: u32,
}

impl ScanParameters {
    /// Parameters with the default slot duration and working hours.
    pub fn new(range_start: DateTime<Tz>, range_end: DateTime<Tz>) -> Self {
        Self {
            range_start,
            range_end,
            slot_duration_minutes: DEFAULT_SLOT_DURATION_MINUTES,
            work_start_hour: DEFAULT_WORK_START_HOUR,
            work_end_hour: DEFAULT_WORK_END_HOUR,
        }
    }

    /// Range covering whole local days: `[start 00:00, (end + 1 day) 00:00)` in `tz`.
    pub fn for_dates(start: NaiveDate, end_inclusive: NaiveDate, tz: Tz) -> Result<Self> {
        let after_end = end_inclusive.succ_opt().ok_or_else(|| {
            SlotError::InvalidDate(format!("{} has no following day", end_inclusive))
        })?;
        Ok(Self::new(at_hour(&tz, start, 0), at_hour(&tz, after_end, 0)))
    }

    pub fn with_slot_duration(mut self, minutes: i64) -> Self {
        self.slot_duration_minutes = minutes;
        self
    }

    pub fn with_work_hours(mut self, start_hour: u32, end_hour: u32) -> Self {
        self.work_start_hour = start_hour;
        self.work_end_hour = end_hour;
        self
    }

    /// The slot length, failing when the minute count is out of range for a duration.
    pub fn slot_duration(&self) -> Result<Duration> {
        Duration::try_minutes(self.slot_duration_minutes).ok_or_else(|| {
            SlotError::parameter(
                "slot_duration_minutes",
                format!("{} minutes is out of range", self.slot_duration_minutes),
            )
        })
    }

    /// Check every invariant, naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.slot_duration_minutes <= 0 {
            return Err(SlotError::parameter(
                "slot_duration_minutes",
                format!("must be positive, got {}", self.slot_duration_minutes),
            ));
        }
        self.slot_duration()?;
        if self.work_start_hour >= 24 {
            return Err(SlotError::parameter(
                "work_start_hour",
                format!("must be 0-23, got {}", self.work_start_hour),
            ));
        }
        if self.work_end_hour > 24 {
            return Err(SlotError::parameter(
                "work_end_hour",
                format!("must be 0-24, got {}", self.work_end_hour),
            ));
        }
        if self.work_start_hour >= self.work_end_hour {
            return Err(SlotError::parameter(
                "work_start_hour",
                format!(
                    "work_start_hour ({}) must be < work_end_hour ({})",
                    self.work_start_hour, self.work_end_hour
                ),
            ));
        }
        if self.range_start >= self.range_end {
            return Err(SlotError::parameter(
                "range",
                format!(
                    "range_start ({}) must be before range_end ({})",
                    self.range_start, self.range_end
                ),
            ));
        }
        Ok(())
    }

    /// The scanned range as an interval, used to bound calendar extraction.
    pub fn range(&self) -> TimeInterval {
        TimeInterval::new(self.range_start, self.range_end)
    }

    /// Upper bound on the number of scan steps: `(range_end - range_start) / slot_duration`.
    pub fn max_steps(&self) -> i64 {
        if self.slot_duration_minutes <= 0 || self.range_start >= self.range_end {
            return 0;
        }
        (self.range_end - self.range_start).num_minutes() / self.slot_duration_minutes
    }
}

/// Parse a calendar date, `MM/DD/YYYY` first, then `YYYY-MM-DD`.
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    let trimmed = input.trim();
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y-%m-%d"))
        .map_err(|e| SlotError::InvalidDate(format!("'{}': {}", input, e)))
}

/// Build whole-day scan parameters from two date strings, the end date inclusive.
pub fn parse_date_range(start: &str, end: &str, tz: Tz) -> Result<ScanParameters> {
    let start = parse_date(start)?;
    let end = parse_date(end)?;
    ScanParameters::for_dates(start, end, tz)
}

/// A free window of exactly the configured slot duration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FreeSlot {
    #[serde(serialize_with = "rfc3339")]
    pub start: DateTime<Tz>,
    #[serde(serialize_with = "rfc3339")]
    pub end: DateTime<Tz>,
    pub duration_minutes: i64,
}

impl FreeSlot {
    pub fn interval(&self) -> TimeInterval {
        TimeInterval::new(self.start, self.end)
    }
}

/// Enumerate every free slot in the range.
///
/// Fails with [`SlotError::InvalidParameter`] before scanning if `params` is invalid.
/// An empty `busy` set means every in-window step is free.
pub fn scan(params: &ScanParameters, busy: &BusyIntervalSet) -> Result<Vec<FreeSlot>> {
    params.validate()?;

    let tz = params.range_start.timezone();
    let step = params.slot_duration()?;
    let mut slots = Vec::new();
    let mut cursor = params.range_start;

    debug!(
        range_start = %params.range_start,
        range_end = %params.range_end,
        slot_minutes = params.slot_duration_minutes,
        work_start = params.work_start_hour,
        work_end = params.work_end_hour,
        busy = busy.len(),
        max_steps = params.max_steps(),
        "Scanning for free slots"
    );

    while cursor < params.range_end {
        let day = cursor.date_naive();
        let window_start = at_hour(&tz, day, params.work_start_hour);
        let window_end = at_hour(&tz, day, params.work_end_hour);

        if cursor >= window_end {
            cursor = next_window_start(&tz, day, params.work_start_hour)?;
            continue;
        }
        if cursor < window_start {
            cursor = window_start;
            continue;
        }

        let Some(slot_end) = cursor.checked_add_signed(step) else {
            return Err(SlotError::parameter(
                "slot_duration_minutes",
                format!(
                    "{} minutes from {} is past the last representable instant",
                    params.slot_duration_minutes, cursor
                ),
            ));
        };
        if slot_end > params.range_end {
            break;
        }
        if slot_end > window_end {
            // The rest of this working day cannot hold a whole slot.
            trace!(cursor = %cursor, "Slot spills past working hours, moving to next day");
            cursor = next_window_start(&tz, day, params.work_start_hour)?;
            continue;
        }

        let candidate = TimeInterval::new(cursor, slot_end);
        if busy.conflicts_with(&candidate) {
            trace!(start = %cursor, end = %slot_end, "Slot conflicts with busy interval");
        } else {
            slots.push(FreeSlot {
                start: cursor,
                end: slot_end,
                duration_minutes: params.slot_duration_minutes,
            });
        }
        cursor = slot_end;
    }

    debug!(count = slots.len(), "Found {} free slots", slots.len());
    Ok(slots)
}

fn next_window_start(tz: &Tz, day: NaiveDate, work_start_hour: u32) -> Result<DateTime<Tz>> {
    let next = day
        .succ_opt()
        .ok_or_else(|| SlotError::InvalidDate(format!("{} has no following day", day)))?;
    Ok(at_hour(tz, next, work_start_hour))
}
