//! Append-only audit journal with size-based rotation.
//!
//! Every entry is one `[timestamp] [LEVEL] message` line in the
//! configured timezone, mirrored to the console through `tracing`.
//! Writing is best-effort: a journal that cannot be written must never
//! take the automation down with it.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use chrono_tz::Tz;

use crate::error::Result;

const TIMESTAMP_FORMAT: &str = "%m/%d/%Y, %I:%M:%S %p";

/// Severity tag written into each journal line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Success,
    Warn,
    Error,
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Success => "SUCCESS",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        };
        write!(f, "{s}")
    }
}

/// File-backed audit trail. Owns its path and rotation policy.
pub struct Journal {
    path: PathBuf,
    max_size: u64,
    max_backups: usize,
    tz: Tz,
}

impl Journal {
    /// Open (creating if needed) the journal at `path`.
    ///
    /// `max_size` is the rotation threshold in bytes; `max_backups` is
    /// how many numbered backups survive rotation before the oldest is
    /// discarded.
    pub fn open(path: impl Into<PathBuf>, max_size: u64, max_backups: usize, tz: Tz) -> Self {
        let journal = Self {
            path: path.into(),
            max_size,
            max_backups,
            tz,
        };
        if let Err(e) = journal.ensure_file() {
            tracing::warn!(error = %e, path = %journal.path.display(), "failed to create journal file");
        }
        journal
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn info(&self, message: &str) {
        tracing::info!("{message}");
        self.append(Level::Info, message, None);
    }

    pub fn success(&self, message: &str) {
        tracing::info!("{message}");
        self.append(Level::Success, message, None);
    }

    pub fn warn(&self, message: &str) {
        tracing::warn!("{message}");
        self.append(Level::Warn, message, None);
    }

    /// Console output is gated by the subscriber's filter; the file
    /// write is unconditional.
    pub fn debug(&self, message: &str) {
        tracing::debug!("{message}");
        self.append(Level::Debug, message, None);
    }

    pub fn error(&self, message: &str, detail: Option<&dyn std::error::Error>) {
        match detail {
            Some(e) => tracing::error!(error = %e, "{message}"),
            None => tracing::error!("{message}"),
        }
        self.append(Level::Error, message, detail);
    }

    /// The last `lines` non-empty lines of the current file, in
    /// original order; `None` returns everything. Rotated backups are
    /// not merged in.
    pub fn tail(&self, lines: Option<usize>) -> Result<Vec<String>> {
        let data = fs::read_to_string(&self.path)?;
        let all: Vec<String> = data
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(str::to_string)
            .collect();
        Ok(match lines {
            Some(n) if n < all.len() => all[all.len() - n..].to_vec(),
            _ => all,
        })
    }

    /// Truncate the current file, leaving backups untouched.
    pub fn clear(&self) -> Result<()> {
        fs::write(&self.path, "")?;
        self.info("Log file has been cleared");
        Ok(())
    }

    fn append(&self, level: Level, message: &str, detail: Option<&dyn std::error::Error>) {
        if let Err(e) = self.try_append(level, message, detail) {
            tracing::warn!(error = %e, path = %self.path.display(), "journal write failed");
        }
    }

    fn try_append(
        &self,
        level: Level,
        message: &str,
        detail: Option<&dyn std::error::Error>,
    ) -> std::io::Result<()> {
        self.rotate_if_needed()?;

        let mut entry = format!("[{}] [{level}] {message}\n", self.timestamp());
        if let Some(err) = detail {
            entry.push_str(&format!("Error: {err}\n"));
            let mut source = err.source();
            while let Some(cause) = source {
                entry.push_str(&format!("Caused by: {cause}\n"));
                source = cause.source();
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(entry.as_bytes())
    }

    /// Shift numbered backups up by one, dropping the oldest, then move
    /// the current file to backup index 1. Runs at most once per write.
    fn rotate_if_needed(&self) -> std::io::Result<()> {
        let size = match fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(_) => return Ok(()),
        };
        if size <= self.max_size {
            return Ok(());
        }

        if self.max_backups == 0 {
            return fs::remove_file(&self.path);
        }

        let oldest = self.backup_path(self.max_backups);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for index in (1..self.max_backups).rev() {
            let from = self.backup_path(index);
            if from.exists() {
                fs::rename(&from, self.backup_path(index + 1))?;
            }
        }
        fs::rename(&self.path, self.backup_path(1))
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(format!(".{index}"));
        PathBuf::from(name)
    }

    fn ensure_file(&self) -> std::io::Result<()> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map(|_| ())
    }

    fn timestamp(&self) -> String {
        Utc::now()
            .with_timezone(&self.tz)
            .format(TIMESTAMP_FORMAT)
            .to_string()
    }
}
