use thiserror::Error;

use crate::models::SessionStatus;

/// Error taxonomy of the session engine.
///
/// Start refusals are surfaced to the contestant and are not retriable;
/// persistence failures during finalize are retriable via
/// `SessionEngine::retry_finalize`.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("a finished attempt already exists for this contest")]
    AlreadyCompleted,

    #[error("an attempt is already in progress for this contest")]
    AlreadyInProgress,

    #[error("fullscreen could not be acquired")]
    FullscreenUnavailable(#[source] anyhow::Error),

    #[error("failed to load the question set")]
    QuestionLoad(#[source] anyhow::Error),

    #[error("operation requires an active session, current status is {0:?}")]
    NotActive(SessionStatus),

    #[error("operation is not valid while the session status is {0:?}")]
    InvalidPhase(SessionStatus),

    #[error("question and choice ids must be non-empty")]
    EmptyAnswer,

    #[error("score persistence failed")]
    Persistence(#[source] anyhow::Error),
}

impl EngineError {
    /// Whether the caller may retry the failed operation as-is.
    pub fn is_retriable(&self) -> bool {
        matches!(self, EngineError::Persistence(_))
    }
}
