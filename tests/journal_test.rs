//! Journal formatting, rotation, and tail behavior.

use std::fs;
use std::path::PathBuf;

use goblin_bot::error::Error;
use goblin_bot::journal::Journal;
use tempfile::TempDir;

fn journal_at(dir: &TempDir, max_size: u64, max_backups: usize) -> (Journal, PathBuf) {
    let path = dir.path().join("bot.log");
    let journal = Journal::open(&path, max_size, max_backups, chrono_tz::UTC);
    (journal, path)
}

fn backup(path: &PathBuf, index: usize) -> PathBuf {
    PathBuf::from(format!("{}.{index}", path.display()))
}

// ---------------------------------------------------------------------------
// Line format
// ---------------------------------------------------------------------------

#[test]
fn entries_are_single_tagged_lines() {
    let dir = TempDir::new().unwrap();
    let (journal, path) = journal_at(&dir, 1024 * 1024, 5);

    journal.info("checking boxes");
    journal.success("box opened");
    journal.warn("mission pending");
    journal.debug("request sent");

    let content = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with('['));
    assert!(lines[0].ends_with("[INFO] checking boxes"));
    assert!(lines[1].contains("[SUCCESS] box opened"));
    assert!(lines[2].contains("[WARN] mission pending"));
    assert!(lines[3].contains("[DEBUG] request sent"));
}

#[test]
fn error_detail_appends_cause_chain() {
    let dir = TempDir::new().unwrap();
    let (journal, path) = journal_at(&dir, 1024 * 1024, 5);

    let inner = std::io::Error::other("disk on fire");
    let err = Error::Io(inner);
    journal.error("cycle failed", Some(&err));

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("[ERROR] cycle failed"));
    assert!(content.contains("Error: I/O error: disk on fire"));
    assert!(content.contains("Caused by: disk on fire"));
}

// ---------------------------------------------------------------------------
// Rotation
// ---------------------------------------------------------------------------

#[test]
fn crossing_the_threshold_rotates_exactly_once() {
    let dir = TempDir::new().unwrap();
    // Any single line overshoots 10 bytes, so the second write rotates.
    let (journal, path) = journal_at(&dir, 10, 5);

    journal.info("first entry");
    journal.info("second entry");

    let rotated = fs::read_to_string(backup(&path, 1)).unwrap();
    assert!(rotated.contains("first entry"));
    assert!(!rotated.contains("second entry"));

    let current = fs::read_to_string(&path).unwrap();
    assert!(current.contains("second entry"));
    assert!(!current.contains("first entry"));

    assert!(!backup(&path, 2).exists());
}

#[test]
fn backups_shift_up_and_the_oldest_is_discarded() {
    let dir = TempDir::new().unwrap();
    let (journal, path) = journal_at(&dir, 10, 5);

    for i in 1..=7 {
        journal.info(&format!("entry-{i}"));
    }

    // Seven writes = six rotations; entry-1 fell off the end.
    let current = fs::read_to_string(&path).unwrap();
    assert!(current.contains("entry-7"));
    assert!(fs::read_to_string(backup(&path, 1)).unwrap().contains("entry-6"));
    assert!(fs::read_to_string(backup(&path, 5)).unwrap().contains("entry-2"));
    assert!(!backup(&path, 6).exists());

    let all: String = (1..=5)
        .map(|i| fs::read_to_string(backup(&path, i)).unwrap())
        .collect();
    assert!(!all.contains("entry-1\n"));
}

// ---------------------------------------------------------------------------
// Tail and clear
// ---------------------------------------------------------------------------

#[test]
fn tail_returns_last_n_lines_in_order() {
    let dir = TempDir::new().unwrap();
    let (journal, _path) = journal_at(&dir, 1024 * 1024, 5);

    for i in 1..=10 {
        journal.info(&format!("line-{i:02}"));
    }

    let tail = journal.tail(Some(3)).unwrap();
    assert_eq!(tail.len(), 3);
    assert!(tail[0].contains("line-08"));
    assert!(tail[1].contains("line-09"));
    assert!(tail[2].contains("line-10"));
}

#[test]
fn tail_without_limit_returns_everything() {
    let dir = TempDir::new().unwrap();
    let (journal, _path) = journal_at(&dir, 1024 * 1024, 5);

    for i in 1..=10 {
        journal.info(&format!("line-{i:02}"));
    }

    assert_eq!(journal.tail(None).unwrap().len(), 10);
    assert_eq!(journal.tail(Some(50)).unwrap().len(), 10);
}

#[test]
fn clear_truncates_and_notes_it() {
    let dir = TempDir::new().unwrap();
    let (journal, _path) = journal_at(&dir, 1024 * 1024, 5);

    journal.info("one");
    journal.info("two");
    journal.clear().unwrap();

    let remaining = journal.tail(None).unwrap();
    assert_eq!(remaining.len(), 1);
    assert!(remaining[0].contains("Log file has been cleared"));
}

// ---------------------------------------------------------------------------
// Degraded operation
// ---------------------------------------------------------------------------

#[test]
fn unwritable_journal_never_panics_the_caller() {
    let journal = Journal::open(
        "/nonexistent-dir/deeper/bot.log",
        1024,
        5,
        chrono_tz::UTC,
    );

    // Writes degrade to console warnings; the caller continues.
    journal.info("goes nowhere");
    journal.error("still nowhere", None);

    assert!(journal.tail(None).is_err());
}
