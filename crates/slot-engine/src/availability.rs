//! Multi-calendar free-time computation.
//!
//! Accepts N calendar sources, flattens their busy intervals into one list,
//! normalizes it, and scans for free slots. Sources must be fully collected
//! before calling in; the merge is not incremental.

use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::interval::{normalize, BusyIntervalSet, NormalizeReport, TimeInterval};
use crate::scanner::{scan, FreeSlot, ScanParameters};

/// Busy intervals from a single calendar.
#[derive(Debug, Clone)]
pub struct CalendarSource {
    /// Opaque identifier for this source (e.g., the `.ics` file name).
    pub source_id: String,
    /// Busy occurrences, already expanded from recurrence rules and resolved
    /// into the target timezone.
    pub intervals: Vec<TimeInterval>,
}

impl CalendarSource {
    pub fn new(source_id: impl Into<String>, intervals: Vec<TimeInterval>) -> Self {
        Self {
            source_id: source_id.into(),
            intervals,
        }
    }
}

/// Per-source interval count, included in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceSummary {
    pub source_id: String,
    pub intervals: usize,
}

/// Result of [`find_free_time`].
#[derive(Debug, Clone, Serialize)]
pub struct FreeTimeReport {
    /// Free slots, chronological.
    pub free_slots: Vec<FreeSlot>,
    /// The merged busy set the slots were tested against.
    pub busy: BusyIntervalSet,
    /// Normalization diagnostics (dropped and merged counts).
    pub normalize: NormalizeReport,
    pub sources: Vec<SourceSummary>,
}

/// Merge all sources and enumerate free slots.
///
/// Parameters are validated before any work is done; an invalid parameter fails
/// the whole call with no partial result.
pub fn find_free_time(
    sources: &[CalendarSource],
    params: &ScanParameters,
) -> Result<FreeTimeReport> {
    params.validate()?;

    let raw: Vec<TimeInterval> = sources
        .iter()
        .flat_map(|source| source.intervals.iter().copied())
        .collect();

    let normalized = normalize(&raw);
    let free_slots = scan(params, &normalized.busy)?;

    info!(
        sources = sources.len(),
        busy = normalized.busy.len(),
        dropped = normalized.report.dropped,
        free = free_slots.len(),
        "Found {} free slots",
        free_slots.len()
    );

    Ok(FreeTimeReport {
        free_slots,
        busy: normalized.busy,
        normalize: normalized.report,
        sources: sources
            .iter()
            .map(|source| SourceSummary {
                source_id: source.source_id.clone(),
                intervals: source.intervals.len(),
            })
            .collect(),
    })
}

/// The earliest free slot across all sources, if any.
pub fn first_free_slot(
    sources: &[CalendarSource],
    params: &ScanParameters,
) -> Result<Option<FreeSlot>> {
    Ok(find_free_time(sources, params)?.free_slots.into_iter().next())
}
