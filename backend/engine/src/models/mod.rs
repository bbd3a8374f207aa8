use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub contest_id: String,
    pub status: SessionStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub violation_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    NotStarted,
    Instructions,
    Active,
    Finalizing,
    Ended,
}

/// Read-only view of the session handed to the surrounding UI.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub status: SessionStatus,
    pub remaining_ms: u64,
    pub violation_count: u32,
    pub warning_visible: bool,
    pub answers: HashMap<String, String>,
}

/// The completion trigger that won the race into `Finalizing`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FinalizeTrigger {
    ManualSubmit,
    TimeExpired,
    ViolationLimit,
    RemoteFinalized { end_time: DateTime<Utc> },
}

impl FinalizeTrigger {
    pub fn label(&self) -> &'static str {
        match self {
            FinalizeTrigger::ManualSubmit => "manual_submit",
            FinalizeTrigger::TimeExpired => "time_expired",
            FinalizeTrigger::ViolationLimit => "violation_limit",
            FinalizeTrigger::RemoteFinalized { .. } => "remote_finalized",
        }
    }
}

/// Result of a finalize attempt as seen by the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalizeOutcome {
    Finalized {
        final_score: i64,
        end_time: DateTime<Utc>,
    },
    /// Another trigger already won; nothing was written.
    AlreadyFinalized,
}

/// Push notification from the authoritative completion channel: the backend
/// has independently finalized this (user, contest) session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionNotice {
    pub user_id: String,
    pub contest_id: String,
    pub end_time: DateTime<Utc>,
}

impl CompletionNotice {
    /// Parses a notice from the push channel's JSON payload.
    pub fn from_json(payload: &str) -> serde_json::Result<Self> {
        serde_json::from_str(payload)
    }
}

pub mod proctor;
pub mod question;
pub mod score;
pub mod timer;
