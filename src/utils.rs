//! Utility functions shared across the codebase.
//!
//! This module provides common functionality for interpolation, wall clock
//! time handling, path display and locating a running instance.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, TimeZone};
use std::path::{Path, PathBuf};

use crate::constants::LOCK_FILE_NAME;

/// Interpolate between two integer values, truncating toward the start value.
///
/// # Arguments
/// * `start` - Starting value (returned when progress = 0.0)
/// * `end` - Ending value (returned when progress = 1.0)
/// * `progress` - Interpolation progress, automatically clamped to [0.0, 1.0]
///
/// # Returns
/// `start + (end - start) * progress` with the fractional part of the
/// offset dropped
///
/// # Examples
/// ```
/// use kelvin::utils::interpolate_truncated;
/// assert_eq!(interpolate_truncated(2000, 2750, 0.5), 2375);
/// assert_eq!(interpolate_truncated(100, 60, 0.33), 87);
/// ```
pub fn interpolate_truncated(start: i64, end: i64, progress: f64) -> i64 {
    let progress = progress.clamp(0.0, 1.0);
    start + ((end - start) as f64 * progress).trunc() as i64
}

/// Parse a 24-hour wall clock time: `H:MM`, `HH:MM` or `HH:MM:SS`.
///
/// # Examples
/// ```
/// use kelvin::utils::parse_time_of_day;
/// assert!(parse_time_of_day("4:00").is_some());
/// assert!(parse_time_of_day("22:30:15").is_some());
/// assert!(parse_time_of_day("3:04PM").is_none());
/// ```
pub fn parse_time_of_day(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}

/// Parse a 12-hour wall clock time such as `3:04PM` or `11:30 am`.
pub fn parse_twelve_hour_time(value: &str) -> Option<NaiveTime> {
    let normalized = value.trim().to_uppercase().replace(' ', "");
    NaiveTime::parse_from_str(&normalized, "%I:%M%p")
        .or_else(|_| NaiveTime::parse_from_str(&normalized, "%I:%M:%S%p"))
        .ok()
}

/// Anchor a wall clock time on a local calendar day.
///
/// Times skipped by a daylight saving change resolve to the first valid
/// instant after the gap; ambiguous times resolve to the earlier instant.
pub fn local_datetime(date: NaiveDate, time: NaiveTime) -> Option<DateTime<Local>> {
    let naive = date.and_time(time);
    Local
        .from_local_datetime(&naive)
        .earliest()
        .or_else(|| Local.from_local_datetime(&(naive + Duration::hours(1))).earliest())
}

/// Shorten a path below the home directory to `~/...` for log output.
pub fn path_for_display(path: &Path) -> String {
    match dirs::home_dir() {
        Some(home) => match path.strip_prefix(&home) {
            Ok(relative) => format!("~/{}", relative.display()),
            Err(_) => path.display().to_string(),
        },
        None => path.display().to_string(),
    }
}

/// Location of the single instance lock file.
pub fn get_lock_path() -> PathBuf {
    dirs::runtime_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(LOCK_FILE_NAME)
}

/// Check if a process with the given PID is currently running.
pub fn is_process_running(pid: u32) -> bool {
    Path::new(&format!("/proc/{}", pid)).exists()
}

/// Read the PID stored in a lock file.
pub fn read_lock_pid(lock_path: &Path) -> Result<u32> {
    let content = std::fs::read_to_string(lock_path)
        .with_context(|| format!("No lock file at {}", lock_path.display()))?;
    content
        .trim()
        .parse::<u32>()
        .with_context(|| format!("Lock file {} does not contain a PID", lock_path.display()))
}

/// Get the PID of the running kelvin daemon from its lock file.
///
/// Returns an error if no lock file exists, it is malformed, or the process
/// it names is gone.
pub fn get_running_kelvin_pid() -> Result<u32> {
    let pid = read_lock_pid(&get_lock_path())?;
    if pid == std::process::id() || !is_process_running(pid) {
        anyhow::bail!("No running kelvin instance found (stale lock for PID {})", pid);
    }
    Ok(pid)
}
