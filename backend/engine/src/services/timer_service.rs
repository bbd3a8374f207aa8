use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::interval;

use crate::models::timer::{TimeExpired, TimerEvent, TimerTick};

// Enough for a tick in flight plus the terminal event.
const EVENT_CHANNEL_CAPACITY: usize = 8;

/// Isolated countdown actor. Owns at most one ticking task and communicates
/// with its consumer only through the event channel handed out by `start`:
/// `TimerTick` at every interval while time remains, then exactly one
/// terminal `TimeExpired`.
pub struct CountdownEngine {
    tick_interval_ms: u64,
    active: Option<JoinHandle<()>>,
}

impl CountdownEngine {
    pub fn new(tick_interval_ms: u64) -> Self {
        Self {
            tick_interval_ms,
            active: None,
        }
    }

    /// Starts a fresh countdown over the full duration. Any previous
    /// instance is stopped first, which closes its event channel, so a
    /// replaced timer can never deliver a stale expiry.
    pub fn start(&mut self, session_id: &str, total_ms: u64) -> mpsc::Receiver<TimerEvent> {
        self.stop();

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let session_id = session_id.to_string();
        let tick_ms = self.tick_interval_ms;

        tracing::debug!(session_id = %session_id, total_ms, tick_ms, "Countdown started");
        self.active = Some(tokio::spawn(run_countdown(session_id, total_ms, tick_ms, tx)));
        rx
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.active.take() {
            task.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.active
            .as_ref()
            .map(|task| !task.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for CountdownEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_countdown(
    session_id: String,
    total_ms: u64,
    tick_ms: u64,
    tx: mpsc::Sender<TimerEvent>,
) {
    let mut elapsed_ms = 0u64;
    let mut ticker = interval(Duration::from_millis(tick_ms));

    loop {
        ticker.tick().await;

        let remaining_ms = total_ms.saturating_sub(elapsed_ms);
        if remaining_ms == 0 {
            let _ = tx
                .send(TimerEvent::TimeExpired(TimeExpired {
                    session_id: session_id.clone(),
                    timestamp: Utc::now(),
                }))
                .await;
            tracing::info!(session_id = %session_id, "Countdown expired");
            break;
        }

        let event = TimerEvent::TimerTick(TimerTick {
            session_id: session_id.clone(),
            remaining_ms,
            elapsed_ms,
            total_ms,
            timestamp: Utc::now(),
        });
        if tx.send(event).await.is_err() {
            // Consumer went away; nothing left to tick for.
            break;
        }
        elapsed_ms += tick_ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn emits_ticks_then_single_expiry() {
        let mut engine = CountdownEngine::new(1000);
        let mut rx = engine.start("s1", 3000);

        let mut ticks = Vec::new();
        let mut expired = 0;
        while let Some(event) = rx.recv().await {
            match event {
                TimerEvent::TimerTick(tick) => ticks.push(tick.remaining_ms),
                TimerEvent::TimeExpired(_) => expired += 1,
            }
        }

        assert_eq!(ticks, vec![3000, 2000, 1000]);
        assert_eq!(expired, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_stops_previous_instance() {
        let mut engine = CountdownEngine::new(1000);
        let mut first = engine.start("s1", 2000);
        let mut second = engine.start("s1", 1000);

        // The replaced timer's channel closes without delivering an expiry.
        let mut first_expired = false;
        while let Some(event) = first.recv().await {
            if matches!(event, TimerEvent::TimeExpired(_)) {
                first_expired = true;
            }
        }
        assert!(!first_expired);

        let mut second_expired = false;
        while let Some(event) = second.recv().await {
            if matches!(event, TimerEvent::TimeExpired(_)) {
                second_expired = true;
            }
        }
        assert!(second_expired);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_closes_the_event_channel() {
        let mut engine = CountdownEngine::new(1000);
        let mut rx = engine.start("s1", 60_000);
        engine.stop();

        while rx.recv().await.is_some() {}
        assert!(!engine.is_running());
    }
}
