use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use crate::error::EngineError;
use crate::metrics::{
    ANSWERS_RECORDED_TOTAL, FINALIZE_ATTEMPTS_TOTAL, SESSIONS_ACTIVE, SESSIONS_TOTAL,
};
use crate::models::proctor::{ProctorSignal, ViolationRecord};
use crate::models::question::Question;
use crate::models::timer::TimerEvent;
use crate::models::{
    CompletionNotice, FinalizeOutcome, FinalizeTrigger, Session, SessionSnapshot, SessionStatus,
};
use crate::services::answer_service::{compute_score, AnswerSheet};
use crate::services::checkpoint_service::CheckpointWorker;
use crate::services::proctor_service::{ProctorMonitor, ProctorOutcome};
use crate::services::timer_service::CountdownEngine;
use crate::services::EngineContext;
use crate::utils::retry::{retry_async_with_config, RetryConfig};

/// Runs one contestant through one contest: the session state machine, its
/// countdown, proctoring, checkpoints, and the idempotent finalize.
///
/// All four completion triggers (manual submit, clock expiry, violation
/// limit, authoritative remote notice) funnel through one guarded entry
/// point; only the first to arrive takes effect.
#[derive(Clone)]
pub struct SessionEngine {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    ctx: EngineContext,
    user_id: String,
    contest_id: String,
    duration_ms: u64,
    state: Mutex<SessionState>,
    status_tx: watch::Sender<SessionStatus>,
}

struct SessionState {
    session_id: String,
    status: SessionStatus,
    start_in_flight: bool,
    started_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
    remaining_ms: u64,
    questions: Arc<Vec<Question>>,
    answers: AnswerSheet,
    proctor: ProctorMonitor,
    timer: CountdownEngine,
    trigger: Option<FinalizeTrigger>,
    completion_rx: Option<mpsc::Receiver<CompletionNotice>>,
}

impl SessionEngine {
    pub fn new(ctx: EngineContext, user_id: &str, contest_id: &str, duration: Duration) -> Self {
        let duration_ms = duration.as_millis() as u64;
        let (status_tx, _) = watch::channel(SessionStatus::NotStarted);

        let state = SessionState {
            session_id: Uuid::new_v4().to_string(),
            status: SessionStatus::NotStarted,
            start_in_flight: false,
            started_at: None,
            ends_at: None,
            remaining_ms: duration_ms,
            questions: Arc::new(Vec::new()),
            answers: AnswerSheet::default(),
            proctor: ProctorMonitor::new(user_id, ctx.config.violation_limit),
            timer: CountdownEngine::new(ctx.config.tick_interval_ms),
            trigger: None,
            completion_rx: None,
        };

        Self {
            inner: Arc::new(SessionInner {
                ctx,
                user_id: user_id.to_string(),
                contest_id: contest_id.to_string(),
                duration_ms,
                state: Mutex::new(state),
                status_tx,
            }),
        }
    }

    /// Attaches the authoritative completion channel. Must be called before
    /// `start`; the listener is spawned when the session becomes active.
    pub fn set_completion_channel(&self, rx: mpsc::Receiver<CompletionNotice>) {
        self.lock_state().completion_rx = Some(rx);
    }

    pub fn enter_instructions(&self) -> Result<(), EngineError> {
        let mut state = self.lock_state();
        match state.status {
            SessionStatus::NotStarted => {
                state.status = SessionStatus::Instructions;
                drop(state);
                let _ = self.inner.status_tx.send(SessionStatus::Instructions);
                Ok(())
            }
            other => Err(EngineError::InvalidPhase(other)),
        }
    }

    /// Moves the session from `Instructions` to `Active`: refuses if an
    /// attempt already exists for this (user, contest) pair, acquires
    /// fullscreen, loads the question set, creates the in-progress score
    /// record, and starts the countdown with the full contest duration.
    pub async fn start(&self) -> Result<SessionSnapshot, EngineError> {
        {
            let mut state = self.lock_state();
            if state.status != SessionStatus::Instructions {
                return Err(EngineError::InvalidPhase(state.status));
            }
            if state.start_in_flight {
                return Err(EngineError::AlreadyInProgress);
            }
            state.start_in_flight = true;
        }

        let result = self.try_start().await;
        if result.is_err() {
            self.lock_state().start_in_flight = false;
        }
        result
    }

    async fn try_start(&self) -> Result<SessionSnapshot, EngineError> {
        let inner = &self.inner;

        let existing = inner
            .ctx
            .scores
            .get(&inner.user_id, &inner.contest_id)
            .await
            .map_err(EngineError::Persistence)?;
        if let Some(record) = existing {
            SESSIONS_TOTAL.with_label_values(&["refused"]).inc();
            tracing::warn!(
                user_id = %inner.user_id,
                contest_id = %inner.contest_id,
                finalized = record.is_finalized(),
                "Refusing to start: score record already exists"
            );
            return Err(if record.is_finalized() {
                EngineError::AlreadyCompleted
            } else {
                EngineError::AlreadyInProgress
            });
        }

        inner
            .ctx
            .presentation
            .enter_fullscreen()
            .await
            .map_err(EngineError::FullscreenUnavailable)?;

        let questions = match inner.ctx.questions.questions_for(&inner.contest_id).await {
            Ok(questions) => questions,
            Err(err) => {
                self.leave_fullscreen_best_effort().await;
                return Err(EngineError::QuestionLoad(err));
            }
        };

        let started_at = Utc::now();
        if let Err(err) = inner
            .ctx
            .scores
            .create_in_progress(&inner.user_id, &inner.contest_id, started_at)
            .await
        {
            self.leave_fullscreen_best_effort().await;
            return Err(EngineError::Persistence(err));
        }

        // Fixed at start; never recomputed from wall-clock drift afterwards.
        let ends_at = started_at + chrono::Duration::milliseconds(inner.duration_ms as i64);

        let (timer_rx, completion_rx, session_id) = {
            let mut state = self.lock_state();
            state.status = SessionStatus::Active;
            state.start_in_flight = false;
            state.started_at = Some(started_at);
            state.ends_at = Some(ends_at);
            state.remaining_ms = inner.duration_ms;
            state.questions = Arc::new(questions);
            // Always the full allotment, never a resumed partial duration.
            let timer_rx = state.timer.start(&state.session_id, inner.duration_ms);
            (
                timer_rx,
                state.completion_rx.take(),
                state.session_id.clone(),
            )
        };
        let _ = inner.status_tx.send(SessionStatus::Active);

        SESSIONS_TOTAL.with_label_values(&["started"]).inc();
        SESSIONS_ACTIVE.inc();
        tracing::info!(
            session_id = %session_id,
            user_id = %inner.user_id,
            contest_id = %inner.contest_id,
            duration_ms = inner.duration_ms,
            "Exam session started"
        );

        self.spawn_timer_pump(timer_rx);
        self.spawn_checkpoint_worker();
        if let Some(rx) = completion_rx {
            self.spawn_completion_listener(rx);
        }

        Ok(self.current_state())
    }

    /// Records a choice for a question. Overwrites any prior choice; the
    /// only validation is that both ids are non-empty.
    pub fn answer(&self, question_id: &str, choice_id: &str) -> Result<(), EngineError> {
        if question_id.is_empty() || choice_id.is_empty() {
            return Err(EngineError::EmptyAnswer);
        }

        let mut state = self.lock_state();
        if state.status != SessionStatus::Active {
            return Err(EngineError::NotActive(state.status));
        }
        state.answers.record(question_id, choice_id);
        ANSWERS_RECORDED_TOTAL.inc();
        Ok(())
    }

    /// Manual submit, confirmed by the contestant.
    pub async fn submit(&self) -> Result<FinalizeOutcome, EngineError> {
        self.finalize(FinalizeTrigger::ManualSubmit).await
    }

    /// Feeds one proctoring observation into the monitor. Crossing the
    /// violation limit forces an automatic submit.
    pub async fn report(&self, signal: ProctorSignal) -> Result<ProctorOutcome, EngineError> {
        let outcome = {
            let mut state = self.lock_state();
            if state.status != SessionStatus::Active {
                return Err(EngineError::NotActive(state.status));
            }
            state.proctor.observe(signal)
        };

        if let ProctorOutcome::LimitExceeded { violation_count } = outcome {
            tracing::warn!(
                user_id = %self.inner.user_id,
                violation_count,
                "Violation limit exceeded, submitting automatically"
            );
            if let Err(err) = self.finalize(FinalizeTrigger::ViolationLimit).await {
                tracing::error!(error = %err, "Automatic submit after violation limit failed");
            }
        }

        Ok(outcome)
    }

    pub fn acknowledge_warning(&self) {
        self.lock_state().proctor.acknowledge_warning();
    }

    /// Re-runs the terminal write after a failed finalize. Only valid while
    /// the session is stuck in `Finalizing`.
    pub async fn retry_finalize(&self) -> Result<FinalizeOutcome, EngineError> {
        {
            let state = self.lock_state();
            match state.status {
                SessionStatus::Finalizing => {}
                SessionStatus::Ended => return Ok(FinalizeOutcome::AlreadyFinalized),
                other => return Err(EngineError::InvalidPhase(other)),
            }
        }
        self.complete_finalize().await
    }

    pub fn current_state(&self) -> SessionSnapshot {
        let state = self.lock_state();
        SessionSnapshot {
            session_id: state.session_id.clone(),
            status: state.status,
            remaining_ms: state.remaining_ms,
            violation_count: state.proctor.violation_count(),
            warning_visible: state.proctor.warning_visible(),
            answers: state.answers.snapshot(),
        }
    }

    /// Full session descriptor, as owned by the coordinator.
    pub fn session(&self) -> Session {
        let state = self.lock_state();
        Session {
            id: state.session_id.clone(),
            user_id: self.inner.user_id.clone(),
            contest_id: self.inner.contest_id.clone(),
            status: state.status,
            started_at: state.started_at,
            ends_at: state.ends_at,
            violation_count: state.proctor.violation_count(),
        }
    }

    /// Watch mirror of the session status, for UIs that prefer push over
    /// polling `current_state`.
    pub fn subscribe_status(&self) -> watch::Receiver<SessionStatus> {
        self.inner.status_tx.subscribe()
    }

    /// Audit trail of every proctoring signal observed this session.
    pub fn violation_log(&self) -> Vec<ViolationRecord> {
        self.lock_state().proctor.violation_log().to_vec()
    }

    /// Persists the current score as a semi checkpoint. Returns `false`
    /// without writing when the session is not active, so a checkpoint
    /// racing a finalize can never overwrite the terminal record.
    pub async fn checkpoint_once(&self) -> anyhow::Result<bool> {
        let (answers, questions) = {
            let state = self.lock_state();
            if state.status != SessionStatus::Active {
                return Ok(false);
            }
            (state.answers.snapshot(), Arc::clone(&state.questions))
        };

        let score = compute_score(&answers, &questions);
        let semi_time = Utc::now();
        retry_async_with_config(RetryConfig::default(), || async {
            self.inner
                .ctx
                .scores
                .update_checkpoint(
                    &self.inner.user_id,
                    &self.inner.contest_id,
                    score.total_score,
                    semi_time,
                )
                .await
        })
        .await?;

        tracing::debug!(
            user_id = %self.inner.user_id,
            semi_score = score.total_score,
            "Checkpoint stored"
        );
        Ok(true)
    }

    /// The single guarded entry point for all completion triggers. The
    /// status check and the flip to `Finalizing` happen in one synchronous
    /// step under the session lock; a trigger that loses the race is a
    /// no-op.
    async fn finalize(&self, trigger: FinalizeTrigger) -> Result<FinalizeOutcome, EngineError> {
        {
            let mut state = self.lock_state();
            match state.status {
                SessionStatus::Finalizing | SessionStatus::Ended => {
                    FINALIZE_ATTEMPTS_TOTAL
                        .with_label_values(&[trigger.label(), "duplicate"])
                        .inc();
                    tracing::debug!(
                        trigger = trigger.label(),
                        status = ?state.status,
                        "Ignoring duplicate finalize trigger"
                    );
                    return Ok(FinalizeOutcome::AlreadyFinalized);
                }
                SessionStatus::Active => {}
                other => return Err(EngineError::NotActive(other)),
            }
            state.status = SessionStatus::Finalizing;
            state.trigger = Some(trigger.clone());
            state.timer.stop();
        }
        let _ = self.inner.status_tx.send(SessionStatus::Finalizing);
        SESSIONS_ACTIVE.dec();
        tracing::info!(
            user_id = %self.inner.user_id,
            contest_id = %self.inner.contest_id,
            trigger = trigger.label(),
            "Session finalizing"
        );

        self.complete_finalize().await
    }

    /// The write half of finalize: score reconciliation and the terminal
    /// record. Runs after the guarded transition, and again on retry.
    async fn complete_finalize(&self) -> Result<FinalizeOutcome, EngineError> {
        let inner = &self.inner;
        let (answers, questions, ends_at, trigger) = {
            let state = self.lock_state();
            (
                state.answers.snapshot(),
                Arc::clone(&state.questions),
                state.ends_at,
                state.trigger.clone().unwrap_or(FinalizeTrigger::ManualSubmit),
            )
        };

        let quick = compute_score(&answers, &questions);

        // Reconcile with the last checkpoint. The live map and the
        // checkpoint can disagree if a checkpoint captured state that has
        // since regressed; scores only grow as the contestant answers more
        // questions correctly, so take the higher of the two.
        let semi_score = inner
            .ctx
            .scores
            .get(&inner.user_id, &inner.contest_id)
            .await
            .map_err(EngineError::Persistence)?
            .and_then(|record| record.semi_score)
            .unwrap_or(0);
        let final_score = quick.total_score.max(semi_score);

        let end_time = match &trigger {
            FinalizeTrigger::TimeExpired => ends_at.unwrap_or_else(Utc::now),
            FinalizeTrigger::RemoteFinalized { end_time } => *end_time,
            _ => Utc::now(),
        };

        let written = retry_async_with_config(RetryConfig::default(), || async {
            inner
                .ctx
                .scores
                .finalize(&inner.user_id, &inner.contest_id, final_score, end_time)
                .await
        })
        .await;

        let record = match written {
            Ok(record) => record,
            Err(err) => {
                FINALIZE_ATTEMPTS_TOTAL
                    .with_label_values(&[trigger.label(), "error"])
                    .inc();
                tracing::error!(
                    user_id = %inner.user_id,
                    contest_id = %inner.contest_id,
                    error = %err,
                    "Terminal score write failed; session stays in finalizing for retry"
                );
                return Err(EngineError::Persistence(err));
            }
        };

        self.lock_state().status = SessionStatus::Ended;
        let _ = inner.status_tx.send(SessionStatus::Ended);

        FINALIZE_ATTEMPTS_TOTAL
            .with_label_values(&[trigger.label(), "success"])
            .inc();
        SESSIONS_TOTAL.with_label_values(&["finalized"]).inc();

        let stored_score = record.final_score.unwrap_or(final_score);
        let stored_end = record.end_time.unwrap_or(end_time);
        tracing::info!(
            user_id = %inner.user_id,
            contest_id = %inner.contest_id,
            trigger = trigger.label(),
            quick_score = quick.total_score,
            semi_score,
            final_score = stored_score,
            "Session finalized"
        );

        self.leave_fullscreen_best_effort().await;

        Ok(FinalizeOutcome::Finalized {
            final_score: stored_score,
            end_time: stored_end,
        })
    }

    fn spawn_timer_pump(&self, mut rx: mpsc::Receiver<TimerEvent>) {
        let engine = self.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                tracing::trace!(event = event.event_name(), "Timer event received");
                match event {
                    TimerEvent::TimerTick(tick) => {
                        let mut state = engine.lock_state();
                        if state.status == SessionStatus::Active {
                            state.remaining_ms = tick.remaining_ms;
                        }
                    }
                    TimerEvent::TimeExpired(expired) => {
                        tracing::info!(
                            session_id = %expired.session_id,
                            "Contest clock expired, submitting automatically"
                        );
                        if let Err(err) = engine.finalize(FinalizeTrigger::TimeExpired).await {
                            tracing::error!(error = %err, "Automatic submit on expiry failed");
                        }
                        break;
                    }
                }
            }
        });
    }

    fn spawn_checkpoint_worker(&self) {
        let interval = Duration::from_secs(self.inner.ctx.config.checkpoint_interval_secs);
        let status_rx = self.inner.status_tx.subscribe();
        CheckpointWorker::spawn(self.clone(), interval, status_rx);
    }

    fn spawn_completion_listener(&self, mut rx: mpsc::Receiver<CompletionNotice>) {
        let engine = self.clone();
        let mut status_rx = self.inner.status_tx.subscribe();
        tokio::spawn(async move {
            while *status_rx.borrow() == SessionStatus::Active {
                tokio::select! {
                    // Wakes the loop so the status re-check above runs.
                    changed = status_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    notice = rx.recv() => {
                        let Some(notice) = notice else { break };
                        if notice.user_id != engine.inner.user_id
                            || notice.contest_id != engine.inner.contest_id
                        {
                            tracing::debug!(
                                user_id = %notice.user_id,
                                contest_id = %notice.contest_id,
                                "Ignoring completion notice for another session"
                            );
                            continue;
                        }
                        tracing::info!(
                            end_time = %notice.end_time,
                            "Authoritative completion notice received"
                        );
                        let trigger = FinalizeTrigger::RemoteFinalized {
                            end_time: notice.end_time,
                        };
                        if let Err(err) = engine.finalize(trigger).await {
                            tracing::error!(error = %err, "Finalize from completion notice failed");
                        }
                        break;
                    }
                }
            }
        });
    }

    async fn leave_fullscreen_best_effort(&self) {
        if let Err(err) = self.inner.ctx.presentation.exit_fullscreen().await {
            tracing::debug!(error = %err, "Failed to exit fullscreen");
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.inner.state.lock().expect("session state lock poisoned")
    }
}
