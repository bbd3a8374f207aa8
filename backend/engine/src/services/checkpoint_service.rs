use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::metrics::CHECKPOINT_TICKS_TOTAL;
use crate::models::SessionStatus;
use crate::services::session_service::SessionEngine;

/// Background worker persisting a non-authoritative semi score while the
/// session is active, as a crash/disconnect safety net. A failed tick is
/// logged and retried at the next interval; the authoritative completion
/// channel provides an independent finalize path if the client dies.
pub struct CheckpointWorker {
    engine: SessionEngine,
    interval: Duration,
}

impl CheckpointWorker {
    pub(crate) fn spawn(
        engine: SessionEngine,
        interval: Duration,
        status_rx: watch::Receiver<SessionStatus>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let worker = CheckpointWorker { engine, interval };
            worker.run(status_rx).await;
        })
    }

    async fn run(&self, mut status_rx: watch::Receiver<SessionStatus>) {
        tracing::debug!(
            interval_secs = self.interval.as_secs(),
            "Checkpoint worker started"
        );

        while *status_rx.borrow() == SessionStatus::Active {
            tokio::select! {
                // Wakes the loop so the status re-check above runs.
                changed = status_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = sleep(self.interval) => self.run_once().await,
            }
        }

        tracing::debug!("Checkpoint worker stopped");
    }

    async fn run_once(&self) {
        match self.engine.checkpoint_once().await {
            Ok(true) => {
                CHECKPOINT_TICKS_TOTAL.with_label_values(&["success"]).inc();
            }
            Ok(false) => {
                // Session left Active between ticks; nothing was written.
                CHECKPOINT_TICKS_TOTAL.with_label_values(&["skipped"]).inc();
            }
            Err(err) => {
                CHECKPOINT_TICKS_TOTAL.with_label_values(&["error"]).inc();
                tracing::warn!(error = %err, "Checkpoint persist failed; retrying next interval");
            }
        }
    }
}
