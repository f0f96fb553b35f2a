//! ICS calendar source: discovers `.ics` files and extracts busy occurrences.
//!
//! VEVENTs are read with the `icalendar` crate. Recurring events are expanded with
//! the `rrule` crate, honouring EXDATE and RECURRENCE-ID overrides. Every occurrence
//! is resolved into the single target timezone before it leaves this module.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use icalendar::{
    Calendar, CalendarComponent, CalendarDateTime, Component, DatePerhapsTime, Event, EventLike,
};
use rrule::RRuleSet;
use tracing::{debug, info, warn};

use crate::availability::CalendarSource;
use crate::dst::localize;
use crate::error::{Result, SlotError};
use crate::interval::TimeInterval;

pub const DEFAULT_MAX_CALENDARS: usize = 10;
pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 10 * 1024 * 1024;

/// Cap on raw recurrence instances generated per event.
const MAX_OCCURRENCES: u16 = u16::MAX;

/// Limits applied while discovering and reading calendar files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLimits {
    pub max_calendars: usize,
    pub max_file_size_bytes: u64,
}

impl Default for SourceLimits {
    fn default() -> Self {
        Self {
            max_calendars: DEFAULT_MAX_CALENDARS,
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
        }
    }
}

/// List the `.ics` files in `dir`, sorted by path.
///
/// # Errors
/// - [`SlotError::CalendarNotFound`] if `dir` is not a directory.
/// - [`SlotError::TooManyCalendars`] if more than `limits.max_calendars` files are found.
pub fn discover_calendars(dir: &Path, limits: &SourceLimits) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(SlotError::CalendarNotFound(dir.to_path_buf()));
    }

    let entries = std::fs::read_dir(dir).map_err(|source| SlotError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|source| SlotError::Io {
                path: dir.to_path_buf(),
                source,
            })?
            .path();
        let is_ics = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("ics"));
        if is_ics && path.is_file() {
            files.push(path);
        }
    }
    files.sort();

    if files.is_empty() {
        warn!(dir = %dir.display(), "No .ics files found");
        return Ok(files);
    }
    if files.len() > limits.max_calendars {
        return Err(SlotError::TooManyCalendars {
            found: files.len(),
            limit: limits.max_calendars,
        });
    }

    info!(count = files.len(), "Found {} calendar file(s)", files.len());
    Ok(files)
}

/// Read one calendar file and return its busy occurrences intersecting `window`.
///
/// The source id is the file name.
pub fn load_calendar(
    path: &Path,
    window: &TimeInterval,
    tz: &Tz,
    limits: &SourceLimits,
) -> Result<CalendarSource> {
    let io_err = |source| SlotError::Io {
        path: path.to_path_buf(),
        source,
    };

    let size = std::fs::metadata(path).map_err(io_err)?.len();
    if size > limits.max_file_size_bytes {
        return Err(SlotError::CalendarTooLarge {
            path: path.to_path_buf(),
            size,
            limit: limits.max_file_size_bytes,
        });
    }

    let contents = std::fs::read_to_string(path).map_err(io_err)?;
    let intervals = parse_ics(&contents, path, window, tz)?;

    let source_id = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    info!(
        source = %source_id,
        events = intervals.len(),
        "Parsed {} events from {}",
        intervals.len(),
        source_id
    );

    Ok(CalendarSource {
        source_id,
        intervals,
    })
}

/// Extract busy occurrences from ICS text. `origin` is only used in error messages.
///
/// Occurrences are kept when they intersect `window` and are returned sorted by start.
pub fn parse_ics(
    ics: &str,
    origin: &Path,
    window: &TimeInterval,
    tz: &Tz,
) -> Result<Vec<TimeInterval>> {
    let calendar: Calendar = ics.parse().map_err(|e| SlotError::CalendarParse {
        path: origin.to_path_buf(),
        reason: format!("{}", e),
    })?;

    let events: Vec<&Event> = calendar
        .iter()
        .filter_map(|component| match component {
            CalendarComponent::Event(event) => Some(event),
            _ => None,
        })
        .collect();

    // Instances replaced by a RECURRENCE-ID override, keyed by UID.
    let mut overridden: HashSet<(String, DateTime<Tz>)> = HashSet::new();
    for event in &events {
        let (Some(uid), Some(recurrence_id)) = (event.get_uid(), event.get_recurrence_id()) else {
            continue;
        };
        overridden.insert((uid.to_string(), resolve(recurrence_id, tz).instant));
    }

    let mut intervals = Vec::new();
    for event in events {
        intervals.extend(event_occurrences(event, origin, window, tz, &overridden)?);
    }
    intervals.sort_by_key(|interval| (interval.start, interval.end));
    Ok(intervals)
}

/// A VEVENT start or end resolved into the target zone.
#[derive(Debug, Clone, Copy)]
struct Resolved {
    instant: DateTime<Tz>,
    /// Zone the value was written in; recurrence expands in this zone.
    zone: Tz,
    all_day: bool,
}

fn resolve(value: DatePerhapsTime, target: &Tz) -> Resolved {
    match value {
        DatePerhapsTime::Date(date) => Resolved {
            instant: localize(target, date.and_time(NaiveTime::MIN)),
            zone: *target,
            all_day: true,
        },
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(utc)) => Resolved {
            instant: utc.with_timezone(target),
            zone: Tz::UTC,
            all_day: false,
        },
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(local)) => Resolved {
            instant: localize(target, local),
            zone: *target,
            all_day: false,
        },
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => {
            let zone = tzid.parse::<Tz>().unwrap_or_else(|_| {
                warn!(tzid = %tzid, "Unknown TZID, interpreting in target timezone");
                *target
            });
            Resolved {
                instant: localize(&zone, date_time).with_timezone(target),
                zone,
                all_day: false,
            }
        }
    }
}

fn event_occurrences(
    event: &Event,
    origin: &Path,
    window: &TimeInterval,
    tz: &Tz,
    overridden: &HashSet<(String, DateTime<Tz>)>,
) -> Result<Vec<TimeInterval>> {
    if is_non_blocking(event) {
        debug!(uid = ?event.get_uid(), "Skipping cancelled or transparent event");
        return Ok(Vec::new());
    }

    let Some(start) = event.get_start().map(|value| resolve(value, tz)) else {
        warn!(uid = ?event.get_uid(), "Event without DTSTART, skipping");
        return Ok(Vec::new());
    };

    let end = match event.get_end() {
        Some(value) => resolve(value, tz).instant,
        None if start.all_day => start.instant + Duration::days(1),
        None => start.instant + Duration::hours(1),
    };
    let length = end - start.instant;

    let starts = match event.property_value("RRULE") {
        Some(rule) if event.get_recurrence_id().is_none() => {
            // Any occurrence starting after this point can still reach into the window.
            let earliest = window.start.checked_sub_signed(length).unwrap_or(window.start);
            let bounds = TimeInterval::new(earliest, window.end);
            let expanded = expand(rule, &start, &bounds, origin, tz)?;
            let excluded = excluded_instants(event, &start, tz);
            let uid = event.get_uid().unwrap_or_default();
            expanded
                .into_iter()
                .filter(|instant| !excluded.contains(instant))
                .filter(|instant| !overridden.contains(&(uid.to_string(), *instant)))
                .collect()
        }
        _ => vec![start.instant],
    };

    let occurrences: Vec<TimeInterval> = starts
        .into_iter()
        .map(|instant| TimeInterval::new(instant, instant + length))
        .filter(|interval| interval.start < window.end && interval.end > window.start)
        .collect();

    debug!(
        uid = ?event.get_uid(),
        summary = ?event.get_summary(),
        occurrences = occurrences.len(),
        "Extracted event occurrences"
    );

    Ok(occurrences)
}

fn is_non_blocking(event: &Event) -> bool {
    let cancelled = event
        .property_value("STATUS")
        .is_some_and(|status| status.eq_ignore_ascii_case("CANCELLED"));
    let transparent = event
        .property_value("TRANSP")
        .is_some_and(|transp| transp.eq_ignore_ascii_case("TRANSPARENT"));
    cancelled || transparent
}

/// Expand an RRULE anchored at `start` into the occurrence starts that fall inside
/// `bounds`, converted to the target zone.
fn expand(
    rule: &str,
    start: &Resolved,
    bounds: &TimeInterval,
    origin: &Path,
    tz: &Tz,
) -> Result<Vec<DateTime<Tz>>> {
    let local_start = start.instant.with_timezone(&start.zone).naive_local();

    let text = format!(
        "DTSTART;TZID={}:{}\nRRULE:{}",
        start.zone.name(),
        local_start.format("%Y%m%dT%H%M%S"),
        until_as_utc(rule, &start.zone)
    );

    let rrule_set: RRuleSet = text.parse().map_err(|e| SlotError::InvalidRule {
        path: origin.to_path_buf(),
        reason: format!("{}", e),
    })?;

    // The cap only counts instances inside the bounds.
    let result = rrule_set
        .after(bounds.start.with_timezone(&rrule::Tz::UTC))
        .before(bounds.end.with_timezone(&rrule::Tz::UTC))
        .all(MAX_OCCURRENCES);
    if result.limited {
        warn!(rule = %rule, "Recurrence expansion hit the occurrence cap");
    }

    Ok(result
        .dates
        .into_iter()
        .map(|dt| dt.with_timezone(tz))
        .collect())
}

/// Rewrite a local `UNTIL` as a UTC stamp. A TZID-anchored DTSTART only accepts
/// a UTC `UNTIL`. A date-only value covers the whole day in `zone`.
fn until_as_utc(rule: &str, zone: &Tz) -> String {
    rule.split(';')
        .map(|part| match part.split_once('=') {
            Some((key, value)) if key.eq_ignore_ascii_case("UNTIL") && !value.ends_with('Z') => {
                match local_until(value, zone) {
                    Some(until) => format!("{}={}", key, until.format("%Y%m%dT%H%M%SZ")),
                    None => part.to_string(),
                }
            }
            _ => part.to_string(),
        })
        .collect::<Vec<_>>()
        .join(";")
}

fn local_until(value: &str, zone: &Tz) -> Option<DateTime<Utc>> {
    let naive = if value.len() == 8 {
        NaiveDate::parse_from_str(value, "%Y%m%d")
            .ok()?
            .and_hms_opt(23, 59, 59)?
    } else {
        NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S").ok()?
    };
    Some(localize(zone, naive).with_timezone(&Utc))
}

/// EXDATE instants of an event, from every EXDATE property. Values are read in
/// the property's TZID, falling back to the zone DTSTART was written in.
fn excluded_instants(event: &Event, start: &Resolved, tz: &Tz) -> HashSet<DateTime<Tz>> {
    let Some(properties) = event.multi_properties().get("EXDATE") else {
        return HashSet::new();
    };

    let mut excluded = HashSet::new();
    for property in properties {
        let zone = property
            .params()
            .get("TZID")
            .and_then(|tzid| tzid.value().parse::<Tz>().ok())
            .unwrap_or(start.zone);
        for value in property.value().split(',').map(str::trim) {
            if value.is_empty() {
                continue;
            }
            match parse_ical_stamp(value, &zone) {
                Some(instant) => {
                    excluded.insert(instant.with_timezone(tz));
                }
                None => warn!(value, "Unparseable EXDATE value, ignoring"),
            }
        }
    }
    excluded
}

/// Parse an iCalendar date or date-time value (`YYYYMMDD`, `YYYYMMDDTHHMMSS`,
/// `YYYYMMDDTHHMMSSZ`). Local values are interpreted in `zone`.
fn parse_ical_stamp(value: &str, zone: &Tz) -> Option<DateTime<Tz>> {
    let value = value.trim();
    if value.len() == 8 {
        let date = NaiveDate::parse_from_str(value, "%Y%m%d").ok()?;
        return Some(localize(zone, date.and_time(NaiveTime::MIN)));
    }
    if let Some(utc) = value.strip_suffix('Z') {
        let naive = NaiveDateTime::parse_from_str(utc, "%Y%m%dT%H%M%S").ok()?;
        return Some(zone.from_utc_datetime(&naive));
    }
    let naive = NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S").ok()?;
    Some(localize(zone, naive))
}
