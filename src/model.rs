//! Core data model.
//!
//! Box summaries and statuses are snapshots of a volatile external
//! system, fetched fresh every cycle and never mutated locally. The
//! decision table that maps a status to an action lives here too.

use chrono::{DateTime, Utc};
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Box summary
// ---------------------------------------------------------------------------

/// One entry of the box list.
#[derive(Debug, Clone, Deserialize)]
pub struct BoxSummary {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub active: bool,
}

/// Envelope of `GET /box`.
#[derive(Debug, Deserialize)]
pub struct BoxList {
    #[serde(default)]
    pub boxes: Vec<BoxSummary>,
}

// ---------------------------------------------------------------------------
// Box status
// ---------------------------------------------------------------------------

/// Detailed status of a single box, as reported by `GET /box/{id}`.
///
/// Upstream data is ambiguous at times; every field defaults so a
/// partial payload still deserializes and falls through the decision
/// table rather than failing the whole cycle.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoxStatus {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(default)]
    pub box_type: Option<String>,
    #[serde(default)]
    pub normal_prize: Option<String>,
    #[serde(default)]
    pub mission_completed: bool,
    #[serde(default)]
    pub has_box: bool,
    #[serde(default)]
    pub is_ready: bool,
    #[serde(default)]
    pub opened: bool,
    #[serde(default)]
    pub ready_at: Option<DateTime<Utc>>,
    /// Present only while the mission is incomplete.
    #[serde(default)]
    pub mission_url: Option<String>,
    #[serde(default)]
    pub mission_desc: Option<String>,
}

/// What to do about a box, given its current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Started, matured, unopened: claim it.
    Open,
    /// Never started and eligible: start it.
    Start,
    /// Nothing left to do.
    AlreadyOpened,
    /// Started but the maturation timer has not elapsed.
    NotReady,
    /// Blocked on an external mission.
    MissionPending,
    /// No branch matched; leave it alone.
    Hold,
}

impl BoxStatus {
    /// Classify this status. Branches are checked in a fixed priority
    /// order; the first match wins. Starting is only eligible once the
    /// mission is complete, so mission-blocked boxes surface as
    /// `MissionPending` instead of a doomed start attempt.
    pub fn disposition(&self) -> Disposition {
        if self.has_box && self.is_ready && !self.opened {
            Disposition::Open
        } else if !self.has_box && !self.opened && self.mission_completed {
            Disposition::Start
        } else if self.opened {
            Disposition::AlreadyOpened
        } else if self.has_box && !self.is_ready {
            Disposition::NotReady
        } else if !self.mission_completed {
            Disposition::MissionPending
        } else {
            Disposition::Hold
        }
    }
}

// ---------------------------------------------------------------------------
// Action result
// ---------------------------------------------------------------------------

/// Outcome of a start or open call. Failures are carried as data, not
/// as errors, so the cycle always has something well-formed to journal.
#[derive(Debug, Clone)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
    /// Maturation deadline, present after a successful start.
    pub ready_at: Option<DateTime<Utc>>,
    /// Reward descriptor, present after a successful open.
    pub reward: Option<String>,
}

impl ActionResult {
    pub fn started(ready_at: Option<DateTime<Utc>>) -> Self {
        Self {
            success: true,
            message: "Box started successfully".to_string(),
            ready_at,
            reward: None,
        }
    }

    pub fn opened(reward: String) -> Self {
        Self {
            success: true,
            message: "Box opened successfully".to_string(),
            ready_at: None,
            reward: Some(reward),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            ready_at: None,
            reward: None,
        }
    }
}
