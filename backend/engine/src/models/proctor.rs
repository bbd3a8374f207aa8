use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A proctoring observation forwarded from the exam surface.
///
/// Fullscreen/visibility loss is the actual proctoring signal (the
/// contestant leaving the exam surface) and is scored; clipboard and
/// devtools blocking is best-effort friction and is suppressed without
/// counting toward disqualification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProctorSignal {
    FullscreenExited,
    DocumentHidden,
    ClipboardAttempt,
    ContextMenuAttempt,
    DevtoolsAttempt,
}

impl ProctorSignal {
    /// Whether this signal counts toward the disqualification threshold.
    pub fn is_scored(&self) -> bool {
        matches!(
            self,
            ProctorSignal::FullscreenExited | ProctorSignal::DocumentHidden
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProctorSignal::FullscreenExited => "fullscreen_exited",
            ProctorSignal::DocumentHidden => "document_hidden",
            ProctorSignal::ClipboardAttempt => "clipboard_attempt",
            ProctorSignal::ContextMenuAttempt => "context_menu_attempt",
            ProctorSignal::DevtoolsAttempt => "devtools_attempt",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Low,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionTaken {
    Warned,
    Suppressed,
    Disqualified,
}

/// Audit record of one observed proctoring signal and the action taken.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViolationRecord {
    pub id: String,
    pub user_id: String,
    pub signal: ProctorSignal,
    pub severity: ViolationSeverity,
    /// Scored violation count after this signal; `None` for suppressed ones.
    pub count_after: Option<u32>,
    pub action_taken: ActionTaken,
    pub timestamp: DateTime<Utc>,
}
