//! Automation engine: the per-box cycles and the cron scheduler that
//! drives them.

pub mod cycle;
pub mod scheduler;

pub use cycle::{run_automation, run_ready_check};
pub use scheduler::Scheduler;
