//! Busy-interval normalization.
//!
//! Raw busy intervals arrive from many calendars: unordered, possibly overlapping,
//! possibly malformed. [`normalize`] drops degenerate entries, sorts the rest, and
//! coalesces overlapping or touching intervals into a [`BusyIntervalSet`].

use chrono::{DateTime, Duration};
use chrono_tz::Tz;
use serde::{Serialize, Serializer};
use tracing::{debug, warn};

/// Serialize an instant as an RFC 3339 string with a numeric offset.
pub(crate) fn rfc3339<S: Serializer>(
    instant: &DateTime<Tz>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&instant.to_rfc3339())
}

/// A half-open time range `[start, end)` over absolute instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TimeInterval {
    #[serde(serialize_with = "rfc3339")]
    pub start: DateTime<Tz>,
    #[serde(serialize_with = "rfc3339")]
    pub end: DateTime<Tz>,
}

impl TimeInterval {
    pub fn new(start: DateTime<Tz>, end: DateTime<Tz>) -> Self {
        Self { start, end }
    }

    /// `true` when `start < end`. Only valid intervals survive normalization.
    pub fn is_valid(&self) -> bool {
        self.start < self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn duration_minutes(&self) -> i64 {
        self.duration().num_minutes()
    }

    /// Half-open overlap test. Intervals that merely touch do not overlap.
    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        !(self.end <= other.start || self.start >= other.end)
    }
}

/// Sorted, non-overlapping, non-touching busy intervals.
///
/// Only produced by [`normalize`], so the ordering invariant always holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BusyIntervalSet(Vec<TimeInterval>);

impl BusyIntervalSet {
    pub fn as_slice(&self) -> &[TimeInterval] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TimeInterval> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Vec<TimeInterval> {
        self.0
    }

    /// Whether `candidate` overlaps any busy interval.
    ///
    /// Stops at the first busy interval starting at or after `candidate.end`.
    pub fn conflicts_with(&self, candidate: &TimeInterval) -> bool {
        self.0
            .iter()
            .take_while(|busy| busy.start < candidate.end)
            .any(|busy| busy.overlaps(candidate))
    }
}

impl<'a> IntoIterator for &'a BusyIntervalSet {
    type Item = &'a TimeInterval;
    type IntoIter = std::slice::Iter<'a, TimeInterval>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Counts describing one normalization pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeReport {
    /// Raw intervals received.
    pub input: usize,
    /// Intervals dropped because `start >= end`.
    pub dropped: usize,
    /// Valid intervals absorbed into a neighbour during coalescing.
    pub merged: usize,
    /// Intervals in the resulting set.
    pub output: usize,
}

/// Result of [`normalize`].
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub busy: BusyIntervalSet,
    pub report: NormalizeReport,
    /// The malformed intervals that were dropped, in input order.
    pub rejected: Vec<TimeInterval>,
}

/// Normalize raw busy intervals into a [`BusyIntervalSet`].
///
/// Intervals with `start >= end` are dropped and reported, never propagated as errors.
/// An interval merges into the running one whenever its start is `<=` the running end,
/// so back-to-back intervals become one block.
pub fn normalize(raw: &[TimeInterval]) -> Normalized {
    let mut rejected = Vec::new();
    let mut intervals: Vec<TimeInterval> = Vec::with_capacity(raw.len());

    for interval in raw {
        if interval.is_valid() {
            intervals.push(*interval);
        } else {
            warn!(
                start = %interval.start,
                end = %interval.end,
                "Invalid interval: start >= end, skipping"
            );
            rejected.push(*interval);
        }
    }

    let valid = intervals.len();
    intervals.sort_by_key(|interval| (interval.start, interval.end));

    let mut merged: Vec<TimeInterval> = Vec::with_capacity(valid);
    for interval in intervals {
        if let Some(last) = merged.last_mut() {
            if interval.start <= last.end {
                if interval.end > last.end {
                    last.end = interval.end;
                }
                continue;
            }
        }
        merged.push(interval);
    }

    let report = NormalizeReport {
        input: raw.len(),
        dropped: rejected.len(),
        merged: valid - merged.len(),
        output: merged.len(),
    };

    debug!(
        input = report.input,
        dropped = report.dropped,
        merged = report.merged,
        output = report.output,
        "Merged {} intervals to {}",
        report.input,
        report.output
    );

    Normalized {
        busy: BusyIntervalSet(merged),
        report,
        rejected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, min: u32) -> DateTime<Tz> {
        Tz::UTC.with_ymd_and_hms(2026, 3, 2, hour, min, 0).unwrap()
    }

    #[test]
    fn touching_intervals_do_not_overlap() {
        let a = TimeInterval::new(at(9, 0), at(10, 0));
        let b = TimeInterval::new(at(10, 0), at(11, 0));
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn conflicts_with_stops_after_candidate_end() {
        let normalized = normalize(&[
            TimeInterval::new(at(9, 0), at(10, 0)),
            TimeInterval::new(at(14, 0), at(15, 0)),
        ]);
        let candidate = TimeInterval::new(at(10, 0), at(11, 0));
        assert!(!normalized.busy.conflicts_with(&candidate));
        let candidate = TimeInterval::new(at(14, 30), at(15, 30));
        assert!(normalized.busy.conflicts_with(&candidate));
    }

    #[test]
    fn report_counts_dropped_and_merged() {
        let normalized = normalize(&[
            TimeInterval::new(at(9, 0), at(10, 0)),
            TimeInterval::new(at(9, 30), at(11, 0)),
            TimeInterval::new(at(12, 0), at(12, 0)),
            TimeInterval::new(at(16, 0), at(15, 0)),
        ]);
        assert_eq!(
            normalized.report,
            NormalizeReport {
                input: 4,
                dropped: 2,
                merged: 1,
                output: 1,
            }
        );
        assert_eq!(normalized.rejected.len(), 2);
    }
}
