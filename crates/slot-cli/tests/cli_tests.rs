//! Integration tests for the `freeslots` CLI binary.
//!
//! These tests use `assert_cmd` and `predicates` to run the actual binary against
//! fixture calendars, covering JSON output, environment configuration, and
//! error reporting.

// `Command::cargo_bin` was deprecated in assert_cmd 2.1.2 in favor of
// `cargo::cargo_bin_cmd!`. Allow it until we migrate.
#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;

/// Helper: path to the fixture calendar directory (work.ics + personal.ics).
fn fixtures_dir() -> &'static str {
    concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/ics")
}

/// Helper: a `freeslots` command with a clean environment and `TIMEZONE=UTC`.
fn freeslots_range(ics_dir: &str, start: &str, end: &str) -> Command {
    let mut cmd = Command::cargo_bin("freeslots").unwrap();
    cmd.env_clear()
        .env("TIMEZONE", "UTC")
        .args(["--start", start, "--end", end])
        .args(["--log-level", "warn", "--ics-dir", ics_dir]);
    cmd
}

/// Helper: `freeslots_range` for the single day 2026-03-02.
fn freeslots(ics_dir: &str) -> Command {
    freeslots_range(ics_dir, "03/02/2026", "03/02/2026")
}

fn stdout_json(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).expect("stdout must be valid JSON")
}

/// Write a calendar file into `dir`.
fn write_calendar(dir: &std::path::Path, name: &str, body: &str) {
    std::fs::write(dir.join(name), body).unwrap();
}

const BROKEN_RULE: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
BEGIN:VEVENT\r\n\
UID:broken@example.com\r\n\
DTSTART:20260302T100000Z\r\n\
DTEND:20260302T110000Z\r\n\
RRULE:FREQ=SOMETIMES\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

const ONE_MEETING: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
BEGIN:VEVENT\r\n\
UID:ok@example.com\r\n\
DTSTART:20260302T090000Z\r\n\
DTEND:20260302T100000Z\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

// ─────────────────────────────────────────────────────────────────────────────
// Successful runs
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn merges_calendars_and_prints_json() {
    // Busy: 10-11 (work) + 11-12 (personal, touching) + 13:00-13:30 (work, daily).
    // Free hourly slots: 09, 12, 14..20.
    let json = stdout_json(&mut freeslots(fixtures_dir()));

    assert_eq!(json["total_free_slots"], 9);
    assert_eq!(json["date_range"]["start"], "03/02/2026");
    assert_eq!(json["date_range"]["end"], "03/02/2026");

    let slots = json["free_slots"].as_array().unwrap();
    assert_eq!(slots[0]["start"], "2026-03-02T09:00:00+00:00");
    assert_eq!(slots[0]["end"], "2026-03-02T10:00:00+00:00");
    assert_eq!(slots[0]["duration_minutes"], 60);
    assert_eq!(slots[1]["start"], "2026-03-02T12:00:00+00:00");
    assert_eq!(slots[2]["start"], "2026-03-02T14:00:00+00:00");
    assert!(json.get("message").is_none());
}

#[test]
fn slot_duration_from_environment() {
    // Two-hour steps: 09-11, 11-13, 13-15 are blocked; 15-17, 17-19, 19-21 are free.
    let json = stdout_json(freeslots(fixtures_dir()).env("SLOT_DURATION_MIN", "120"));

    assert_eq!(json["total_free_slots"], 3);
    assert_eq!(json["free_slots"][0]["start"], "2026-03-02T15:00:00+00:00");
    assert_eq!(json["free_slots"][0]["duration_minutes"], 120);
}

#[test]
fn work_hours_flags_narrow_the_window() {
    let json =
        stdout_json(freeslots(fixtures_dir()).args(["--work-start", "12", "--work-end", "15"]));

    // 12-13 free, 13-14 blocked by lunch, 14-15 free.
    assert_eq!(json["total_free_slots"], 2);
}

#[test]
fn empty_directory_reports_message_and_full_day() {
    let dir = tempfile::tempdir().unwrap();

    let json = stdout_json(&mut freeslots(dir.path().to_str().unwrap()));

    assert_eq!(json["message"], "No busy intervals found");
    assert_eq!(json["total_free_slots"], 12);
}

#[test]
fn multi_day_range_includes_whole_end_day() {
    let json = stdout_json(&mut freeslots_range(fixtures_dir(), "03/02/2026", "2026-03-03"));

    // Day one: 9 slots. Day two: only the 13:00 lunch recurs, 11 slots.
    assert_eq!(json["total_free_slots"], 20);
}

#[test]
fn keep_going_skips_broken_calendar() {
    let dir = tempfile::tempdir().unwrap();
    write_calendar(dir.path(), "a-broken.ics", BROKEN_RULE);
    write_calendar(dir.path(), "b-ok.ics", ONE_MEETING);

    let json = stdout_json(freeslots(dir.path().to_str().unwrap()).arg("--keep-going"));

    assert_eq!(json["total_free_slots"], 11);
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn broken_calendar_aborts_by_default() {
    let dir = tempfile::tempdir().unwrap();
    write_calendar(dir.path(), "a-broken.ics", BROKEN_RULE);
    write_calendar(dir.path(), "b-ok.ics", ONE_MEETING);

    freeslots(dir.path().to_str().unwrap())
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("\"error\""))
        .stderr(predicate::str::contains("a-broken.ics"));
}

#[test]
fn missing_directory_is_an_error() {
    freeslots("/nonexistent/freeslots-calendars")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Calendar directory not found"));
}

#[test]
fn inverted_work_hours_fail_fast() {
    freeslots(fixtures_dir())
        .args(["--work-start", "21", "--work-end", "9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("work_start_hour"));
}

#[test]
fn out_of_range_slot_duration_rejected_by_parser() {
    freeslots(fixtures_dir())
        .args(["--slot-duration", "500"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("slot-duration"));
}

#[test]
fn unknown_timezone_is_an_error() {
    freeslots(fixtures_dir())
        .args(["--timezone", "Mars/Olympus_Mons"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid timezone"));
}

#[test]
fn end_before_start_is_an_error() {
    freeslots_range(fixtures_dir(), "03/05/2026", "03/02/2026")
        .assert()
        .failure()
        .stderr(predicate::str::contains("range"));
}

#[test]
fn too_many_calendars_is_an_error() {
    freeslots(fixtures_dir())
        .args(["--max-calendars", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("limit is 1"));
}
