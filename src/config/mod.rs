//! Typed configuration from environment variables.
//!
//! Loads once at startup, fails fast if required vars are missing or
//! malformed. The session cookie is wrapped in secrecy::SecretString
//! to prevent log leaks.

pub mod secrets;

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;
use cron::Schedule;
use secrecy::SecretString;

use crate::error::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://www.goblin.meme/api";

const DEFAULT_DAILY_SCHEDULE: &str = "0 0 9 * * *";
const DEFAULT_READY_SCHEDULE: &str = "0 0 */4 * * *";
const DEFAULT_TIMEZONE: &str = "Asia/Jakarta";
const DEFAULT_LOG_FILE: &str = "goblin-automation.log";
const DEFAULT_MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;
const DEFAULT_MAX_LOG_BACKUPS: usize = 5;

#[derive(Debug)]
pub struct Config {
    /// Opaque session cookie sent with every request.
    pub cookie: SecretString,
    /// Base URL of the box API.
    pub base_url: String,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
    /// Total attempts for idempotent GETs (1 = no retry).
    pub retry_attempts: u32,
    /// Initial delay between retry attempts; doubles each attempt.
    pub retry_delay: Duration,
    /// Cron expression for the daily full cycle.
    pub daily_schedule: String,
    /// Cron expression for the frequent ready-check cycle.
    pub ready_check_schedule: String,
    /// Timezone for schedule evaluation and displayed timestamps.
    pub timezone: Tz,
    /// Path of the audit journal file.
    pub log_file: PathBuf,
    /// Rotation threshold for the journal file, in bytes.
    pub max_log_size: u64,
    /// Number of numbered journal backups kept after rotation.
    pub max_log_backups: usize,
    /// Pause between boxes in the full cycle.
    pub box_delay: Duration,
    /// Pause between boxes in the ready-check cycle.
    pub ready_check_delay: Duration,
    /// Start boxes that have not been started yet.
    pub auto_start: bool,
    /// Open boxes whose maturation timer has elapsed.
    pub auto_open: bool,
    /// Verbose console output (file journal is always verbose).
    pub debug: bool,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// Tests go through this to avoid mutating process-global env vars.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let cookie = lookup("GOBLIN_COOKIE")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                Error::Config("required environment variable GOBLIN_COOKIE is not set".to_string())
            })?;

        let daily_schedule =
            lookup("GOBLIN_DAILY_SCHEDULE").unwrap_or_else(|| DEFAULT_DAILY_SCHEDULE.to_string());
        let ready_check_schedule =
            lookup("GOBLIN_READY_SCHEDULE").unwrap_or_else(|| DEFAULT_READY_SCHEDULE.to_string());
        validate_schedule("GOBLIN_DAILY_SCHEDULE", &daily_schedule)?;
        validate_schedule("GOBLIN_READY_SCHEDULE", &ready_check_schedule)?;

        let timezone_name =
            lookup("GOBLIN_TIMEZONE").unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
        let timezone: Tz = timezone_name
            .parse()
            .map_err(|_| Error::Config(format!("unknown timezone: {timezone_name}")))?;

        Ok(Self {
            cookie: SecretString::from(cookie),
            base_url: lookup("GOBLIN_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            request_timeout: Duration::from_secs(parsed_or(
                &lookup,
                "GOBLIN_HTTP_TIMEOUT_SECS",
                30u64,
            )?),
            retry_attempts: parsed_or(&lookup, "GOBLIN_RETRY_ATTEMPTS", 3u32)?,
            retry_delay: Duration::from_millis(parsed_or(&lookup, "GOBLIN_RETRY_DELAY_MS", 2000)?),
            daily_schedule,
            ready_check_schedule,
            timezone,
            log_file: PathBuf::from(
                lookup("GOBLIN_LOG_FILE").unwrap_or_else(|| DEFAULT_LOG_FILE.to_string()),
            ),
            max_log_size: parsed_or(&lookup, "GOBLIN_MAX_LOG_SIZE", DEFAULT_MAX_LOG_SIZE)?,
            max_log_backups: parsed_or(&lookup, "GOBLIN_MAX_LOG_BACKUPS", DEFAULT_MAX_LOG_BACKUPS)?,
            box_delay: Duration::from_millis(parsed_or(&lookup, "GOBLIN_BOX_DELAY_MS", 2000)?),
            ready_check_delay: Duration::from_millis(parsed_or(
                &lookup,
                "GOBLIN_READY_DELAY_MS",
                1000,
            )?),
            auto_start: lookup("AUTO_START").as_deref() != Some("false"),
            auto_open: lookup("AUTO_OPEN").as_deref() != Some("false"),
            debug: lookup("DEBUG").as_deref() == Some("true"),
        })
    }
}

fn parsed_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T> {
    match lookup(name) {
        Some(raw) => raw
            .parse()
            .map_err(|_| Error::Config(format!("invalid value for {name}: {raw}"))),
        None => Ok(default),
    }
}

fn validate_schedule(name: &str, expression: &str) -> Result<()> {
    Schedule::from_str(expression)
        .map(|_| ())
        .map_err(|e| Error::Schedule(format!("{name} = '{expression}': {e}")))
}
