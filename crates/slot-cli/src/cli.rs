//! Command-line arguments. Every setting except the date range can also come
//! from the environment.

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use chrono_tz::Tz;
use clap::Parser;
use slot_engine::calendar::SourceLimits;

const BYTES_PER_MB: u64 = 1024 * 1024;

#[derive(Parser, Debug)]
#[command(
    name = "freeslots",
    version,
    about = "Find free meeting slots across a directory of .ics calendars"
)]
pub struct Cli {
    /// First day of the range (MM/DD/YYYY or YYYY-MM-DD)
    #[arg(long)]
    pub start: String,

    /// Last day of the range, inclusive (MM/DD/YYYY or YYYY-MM-DD)
    #[arg(long)]
    pub end: String,

    /// Directory containing .ics files
    #[arg(long, env = "ICS_DIR", default_value = "ics_files")]
    pub ics_dir: PathBuf,

    /// IANA timezone used for working hours and output
    #[arg(long, env = "TIMEZONE", default_value = "America/New_York")]
    pub timezone: String,

    /// Slot duration in minutes
    #[arg(
        long,
        env = "SLOT_DURATION_MIN",
        default_value_t = 60,
        value_parser = clap::value_parser!(i64).range(15..=480)
    )]
    pub slot_duration: i64,

    /// Start of the working day (hour, 0-23)
    #[arg(long, env = "WORK_START_HOUR", default_value_t = 9)]
    pub work_start: u32,

    /// End of the working day (hour, 1-24)
    #[arg(long, env = "WORK_END_HOUR", default_value_t = 21)]
    pub work_end: u32,

    /// Log level when RUST_LOG is not set (error, warn, info, debug, trace)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Maximum number of calendar files to read
    #[arg(long, env = "MAX_CALENDARS", default_value_t = 10)]
    pub max_calendars: usize,

    /// Maximum size of a single calendar file, in MB
    #[arg(long, env = "MAX_FILE_SIZE_MB", default_value_t = 10)]
    pub max_file_size_mb: u64,

    /// Skip calendars that fail to load instead of aborting
    #[arg(long)]
    pub keep_going: bool,
}

impl Cli {
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| anyhow!(slot_engine::SlotError::InvalidTimezone(self.timezone.clone())))
    }

    pub fn limits(&self) -> SourceLimits {
        SourceLimits {
            max_calendars: self.max_calendars,
            max_file_size_bytes: self.max_file_size_mb.saturating_mul(BYTES_PER_MB),
        }
    }
}
