//! `freeslots` CLI — find free meeting slots across a directory of `.ics` calendars.
//!
//! ## Usage
//!
//! ```sh
//! # Hourly slots, 09:00-21:00 New York time, for one working week
//! freeslots --start 10/6/2025 --end 10/10/2025
//!
//! # Configure through the environment instead of flags
//! ICS_DIR=calendars TIMEZONE=Europe/Paris SLOT_DURATION_MIN=30 \
//!   freeslots --start 2025-10-06 --end 2025-10-10
//!
//! # Keep going when one calendar cannot be read
//! freeslots --start 10/6/2025 --end 10/10/2025 --keep-going
//! ```
//!
//! Results are printed to stdout as JSON. Logs and errors go to stderr.

mod cli;

use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono_tz::Tz;
use clap::Parser;
use serde::Serialize;
use slot_engine::{
    discover_calendars, find_free_time, load_calendar, parse_date_range, CalendarSource, FreeSlot,
    ScanParameters,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

const NO_BUSY_MESSAGE: &str = "No busy intervals found";

#[derive(Serialize)]
struct DateRange<'a> {
    start: &'a str,
    end: &'a str,
}

#[derive(Serialize)]
struct Output<'a> {
    total_free_slots: usize,
    date_range: DateRange<'a>,
    free_slots: &'a [FreeSlot],
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
}

#[derive(Serialize)]
struct ErrorOutput {
    error: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    info!("Starting free time finder");
    match run(&cli) {
        Ok(json) => {
            println!("{}", json);
            info!("Completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            let payload = ErrorOutput {
                error: format!("{:#}", e),
            };
            match serde_json::to_string(&payload) {
                Ok(json) => eprintln!("{}", json),
                Err(_) => eprintln!("error: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout stays machine-readable. `RUST_LOG` wins over `--log-level`.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<String> {
    let tz = cli.tz()?;
    let params = parse_date_range(&cli.start, &cli.end, tz)
        .context("Invalid date range")?
        .with_slot_duration(cli.slot_duration)
        .with_work_hours(cli.work_start, cli.work_end);

    // Reject bad parameters before touching any calendar file.
    params.validate()?;

    info!(
        start = %cli.start,
        end = %cli.end,
        "Finding free slots: {}min slots, work hours {}-{}",
        params.slot_duration_minutes,
        params.work_start_hour,
        params.work_end_hour
    );

    let sources = load_sources(cli, &params, &tz)?;
    let report = find_free_time(&sources, &params)?;

    let message = if report.normalize.input == 0 {
        warn!("{}", NO_BUSY_MESSAGE);
        Some(NO_BUSY_MESSAGE)
    } else {
        None
    };

    let output = Output {
        total_free_slots: report.free_slots.len(),
        date_range: DateRange {
            start: &cli.start,
            end: &cli.end,
        },
        free_slots: &report.free_slots,
        message,
    };

    serde_json::to_string_pretty(&output).context("Failed to serialize free slots")
}

/// Load every calendar in the configured directory. A failing calendar aborts the
/// run unless `--keep-going` is set, in which case it contributes no intervals.
fn load_sources(cli: &Cli, params: &ScanParameters, tz: &Tz) -> Result<Vec<CalendarSource>> {
    let limits = cli.limits();
    let files = discover_calendars(&cli.ics_dir, &limits)?;
    let window = params.range();

    let mut sources = Vec::with_capacity(files.len());
    for path in files {
        match load_calendar(&path, &window, tz, &limits) {
            Ok(source) => sources.push(source),
            Err(e) if cli.keep_going => {
                warn!(error = %e, "Skipping calendar {}", path.display());
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(sources)
}
