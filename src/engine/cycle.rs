//! Automation cycles: the full pass and the lighter ready-check.
//!
//! Remote calls are awaited strictly one at a time, with a pause
//! between boxes: the service bans accounts that hammer it, and
//! sequential calls keep the journal ordering deterministic.

use chrono::{DateTime, Utc};

use crate::client::GoblinClient;
use crate::config::Config;
use crate::journal::Journal;
use crate::model::{BoxSummary, Disposition};

const READY_AT_FORMAT: &str = "%m/%d/%Y, %I:%M:%S %p";

/// One full pass: list the boxes, then start/open/report each one.
/// A listing failure aborts the whole cycle; a single box failing
/// never does.
pub async fn run_automation(client: &GoblinClient, journal: &Journal, config: &Config) {
    journal.info("=== STARTING GOBLIN BOX AUTOMATION ===");

    let boxes = match client.list_boxes().await {
        Ok(boxes) => boxes,
        Err(e) => {
            journal.error("Failed to run automation", Some(&e));
            return;
        }
    };
    journal.info(&format!("Found {} available boxes", boxes.len()));

    let mut first = true;
    for summary in &boxes {
        if !first {
            tokio::time::sleep(config.box_delay).await;
        }
        first = false;
        process_box(client, journal, config, summary).await;
    }

    journal.info("=== FINISHED GOBLIN BOX AUTOMATION ===");
}

/// The frequent variant: only claims matured boxes. Start and mission
/// handling are left to the daily pass.
pub async fn run_ready_check(client: &GoblinClient, journal: &Journal, config: &Config) {
    journal.info("Checking for boxes ready to open...");

    let boxes = match client.list_boxes().await {
        Ok(boxes) => boxes,
        Err(e) => {
            journal.error("Error checking ready boxes", Some(&e));
            return;
        }
    };

    let mut first = true;
    for summary in &boxes {
        if !first {
            tokio::time::sleep(config.ready_check_delay).await;
        }
        first = false;

        let status = match client.box_status(&summary.id).await {
            Ok(status) => status,
            Err(e) => {
                journal.error(&format!("Error checking box {}", summary.name), Some(&e));
                continue;
            }
        };

        if status.disposition() != Disposition::Open || !config.auto_open {
            continue;
        }

        journal.info(&format!("Box {} is ready to be opened!", summary.name));
        let result = client.open_box(&summary.id).await;
        if result.success {
            journal.success(&format!(
                "SUCCESS! Box {} has been opened. Reward: {}",
                summary.name,
                result.reward.as_deref().unwrap_or("Unknown reward"),
            ));
        } else {
            journal.error(
                &format!("Failed to open box {}: {}", summary.name, result.message),
                None,
            );
        }
    }
}

/// Fetch one box's status, dump it to the journal, and act on its
/// disposition. Every failure is caught and journaled here so the
/// caller can move on to the next box.
async fn process_box(
    client: &GoblinClient,
    journal: &Journal,
    config: &Config,
    summary: &BoxSummary,
) {
    journal.info(&format!("--- CHECKING BOX: {} ---", summary.name));

    let status = match client.box_status(&summary.id).await {
        Ok(status) => status,
        Err(e) => {
            journal.error(&format!("Error processing box {}", summary.name), Some(&e));
            return;
        }
    };

    journal.info(&format!(
        "Box Type: {}",
        status.box_type.as_deref().unwrap_or("unknown")
    ));
    journal.info(&format!(
        "Normal Prize: {}",
        status.normal_prize.as_deref().unwrap_or("unknown")
    ));
    journal.info(&format!("Mission Completed: {}", status.mission_completed));
    journal.info(&format!("Has Box: {}", status.has_box));
    journal.info(&format!("Is Ready: {}", status.is_ready));
    journal.info(&format!("Opened: {}", status.opened));

    match status.disposition() {
        Disposition::Open => {
            if !config.auto_open {
                journal.info("Box is ready, but auto-open is disabled");
                return;
            }
            journal.info("Box is ready, opening...");
            let result = client.open_box(&summary.id).await;
            if result.success {
                journal.success(&format!(
                    "SUCCESS! Box {} has been opened. Reward: {}",
                    summary.name,
                    result.reward.as_deref().unwrap_or("Unknown reward"),
                ));
            } else {
                journal.error(
                    &format!("Failed to open box {}: {}", summary.name, result.message),
                    None,
                );
            }
        }
        Disposition::Start => {
            if !config.auto_start {
                journal.info("Box has not been started, but auto-start is disabled");
                return;
            }
            journal.info("Box has not been started, starting...");
            let result = client.start_box(&summary.id).await;
            if result.success {
                journal.success(&format!(
                    "SUCCESS! Box {} has been started. Ready at: {}",
                    summary.name,
                    format_ready_at(result.ready_at, config),
                ));
            } else {
                journal.error(
                    &format!("Failed to start box {}: {}", summary.name, result.message),
                    None,
                );
            }
        }
        Disposition::AlreadyOpened => {
            journal.info("Box has already been opened");
        }
        Disposition::NotReady => {
            journal.info(&format!(
                "Box not ready yet. Ready at: {}",
                format_ready_at(status.ready_at, config),
            ));
        }
        Disposition::MissionPending => {
            journal.warn("Mission not completed yet, you need to finish the mission first");
            if let Some(url) = &status.mission_url {
                journal.info(&format!("Mission URL: {url}"));
            }
            if let Some(desc) = &status.mission_desc {
                journal.info(&format!("Mission Desc: {desc}"));
            }
        }
        Disposition::Hold => {}
    }
}

fn format_ready_at(ready_at: Option<DateTime<Utc>>, config: &Config) -> String {
    match ready_at {
        Some(ts) => ts
            .with_timezone(&config.timezone)
            .format(READY_AT_FORMAT)
            .to_string(),
        None => "unknown".to_string(),
    }
}
