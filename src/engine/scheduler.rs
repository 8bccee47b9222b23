//! Cron-driven triggers over the automation cycles.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use chrono_tz::Tz;
use cron::Schedule;
use tokio::sync::{Mutex, Notify};

use crate::client::GoblinClient;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::journal::Journal;

use super::cycle;

/// Arms the daily full cycle and the frequent ready-check and runs
/// them until shutdown.
///
/// Each cycle type carries an in-flight gate: a trigger that fires
/// while its own previous run is still going logs a skip instead of
/// interleaving a second set of calls against the remote service. The
/// two different cycle types may still run concurrently.
pub struct Scheduler {
    client: Arc<GoblinClient>,
    journal: Arc<Journal>,
    config: Arc<Config>,
    daily: Schedule,
    ready_check: Schedule,
    tz: Tz,
    shutdown: Arc<Notify>,
    full_gate: Arc<Mutex<()>>,
    ready_gate: Arc<Mutex<()>>,
}

impl Scheduler {
    pub fn new(
        client: Arc<GoblinClient>,
        journal: Arc<Journal>,
        config: Arc<Config>,
    ) -> Result<Self> {
        let daily = Schedule::from_str(&config.daily_schedule)
            .map_err(|e| Error::Schedule(format!("daily schedule: {e}")))?;
        let ready_check = Schedule::from_str(&config.ready_check_schedule)
            .map_err(|e| Error::Schedule(format!("ready-check schedule: {e}")))?;
        let tz = config.timezone;

        Ok(Self {
            client,
            journal,
            config,
            daily,
            ready_check,
            tz,
            shutdown: Arc::new(Notify::new()),
            full_gate: Arc::new(Mutex::new(())),
            ready_gate: Arc::new(Mutex::new(())),
        })
    }

    /// Signal the scheduler to stop. In-flight cycles are not awaited;
    /// the process is expected to exit right after `run` returns.
    pub fn shutdown(&self) {
        self.shutdown.notify_one();
    }

    /// Run both triggers until shutdown.
    pub async fn run(&self) {
        self.journal.info(&format!(
            "Daily automation armed: '{}' ({})",
            self.config.daily_schedule, self.tz
        ));
        self.journal.info(&format!(
            "Ready-check armed: '{}' ({})",
            self.config.ready_check_schedule, self.tz
        ));
        self.journal.info("Press Ctrl+C to terminate");

        loop {
            tokio::select! {
                _ = self.shutdown.notified() => {
                    self.journal.info("Shutting down Goblin Box Automation...");
                    return;
                }
                _ = sleep_until_next(&self.daily, self.tz) => {
                    self.journal.info("Schedule fired: running daily automation");
                    self.spawn_full_cycle();
                }
                _ = sleep_until_next(&self.ready_check, self.tz) => {
                    self.journal.info("Schedule fired: checking ready boxes");
                    self.spawn_ready_check();
                }
            }
        }
    }

    fn spawn_full_cycle(&self) {
        match Arc::clone(&self.full_gate).try_lock_owned() {
            Ok(guard) => {
                let client = Arc::clone(&self.client);
                let journal = Arc::clone(&self.journal);
                let config = Arc::clone(&self.config);
                tokio::spawn(async move {
                    let _guard = guard;
                    cycle::run_automation(&client, &journal, &config).await;
                });
            }
            Err(_) => {
                self.journal
                    .warn("Previous automation cycle still running, skipping this trigger");
            }
        }
    }

    fn spawn_ready_check(&self) {
        match Arc::clone(&self.ready_gate).try_lock_owned() {
            Ok(guard) => {
                let client = Arc::clone(&self.client);
                let journal = Arc::clone(&self.journal);
                let config = Arc::clone(&self.config);
                tokio::spawn(async move {
                    let _guard = guard;
                    cycle::run_ready_check(&client, &journal, &config).await;
                });
            }
            Err(_) => {
                self.journal
                    .warn("Previous ready-check still running, skipping this trigger");
            }
        }
    }
}

/// Sleep until the schedule's next occurrence in `tz`. Pends forever
/// when the schedule has no future occurrence.
async fn sleep_until_next(schedule: &Schedule, tz: Tz) {
    match schedule.upcoming(tz).next() {
        Some(when) => {
            let wait = (when.with_timezone(&Utc) - Utc::now())
                .to_std()
                .unwrap_or(Duration::ZERO);
            tokio::time::sleep(wait).await;
        }
        None => std::future::pending::<()>().await,
    }
}
