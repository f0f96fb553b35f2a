//! Resolution of local wall-clock times into absolute instants across DST transitions.

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;

/// Upper bound on how far a nonexistent local time is shifted forward.
/// Real-world transitions never exceed a few hours.
const MAX_GAP_MINUTES: i64 = 24 * 60;

/// Resolve a local wall-clock time in `tz` to an instant.
///
/// - Ambiguous times (fall back) resolve to the earliest instant.
/// - Nonexistent times (spring forward) shift forward to the first valid minute.
pub fn localize(tz: &Tz, local: NaiveDateTime) -> DateTime<Tz> {
    let mut candidate = local;
    for _ in 0..=MAX_GAP_MINUTES {
        match tz.from_local_datetime(&candidate) {
            LocalResult::Single(dt) => return dt,
            LocalResult::Ambiguous(earliest, _) => return earliest,
            LocalResult::None => candidate += Duration::minutes(1),
        }
    }
    tz.from_utc_datetime(&local)
}

/// The instant at `hour:00` local time on `date`. `hour == 24` is the following midnight.
pub fn at_hour(tz: &Tz, date: NaiveDate, hour: u32) -> DateTime<Tz> {
    let local = date.and_time(NaiveTime::MIN) + Duration::hours(i64::from(hour));
    localize(tz, local)
}
