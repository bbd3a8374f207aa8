use chrono::Utc;
use uuid::Uuid;

use crate::metrics::PROCTOR_SIGNALS_TOTAL;
use crate::models::proctor::{
    ActionTaken, ProctorSignal, ViolationRecord, ViolationSeverity,
};

/// Outcome of one observed proctoring signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProctorOutcome {
    /// Scored violation: the contestant must acknowledge a blocking warning.
    Warned { violation_count: u32 },
    /// Best-effort friction (clipboard, devtools); not scored.
    Suppressed,
    /// The scored count just exceeded the limit. Reported exactly once.
    LimitExceeded { violation_count: u32 },
}

/// Per-session anti-cheat state. Owned by the session engine instance, so
/// concurrent sessions cannot interfere through shared module state.
pub struct ProctorMonitor {
    user_id: String,
    violation_limit: u32,
    violation_count: u32,
    warning_visible: bool,
    limit_latched: bool,
    log: Vec<ViolationRecord>,
}

impl ProctorMonitor {
    pub fn new(user_id: &str, violation_limit: u32) -> Self {
        Self {
            user_id: user_id.to_string(),
            violation_limit,
            violation_count: 0,
            warning_visible: false,
            limit_latched: false,
            log: Vec::new(),
        }
    }

    /// Applies one signal. Scored signals increment the violation count and
    /// raise the blocking warning; the threshold crossing is latched so it
    /// is reported at most once even though the count keeps growing.
    pub fn observe(&mut self, signal: ProctorSignal) -> ProctorOutcome {
        if !signal.is_scored() {
            self.push_record(signal, ViolationSeverity::Low, None, ActionTaken::Suppressed);
            tracing::debug!(
                user_id = %self.user_id,
                signal = signal.label(),
                "Suppressed proctoring signal"
            );
            return ProctorOutcome::Suppressed;
        }

        self.violation_count += 1;
        self.warning_visible = true;

        let crossed = self.violation_count > self.violation_limit && !self.limit_latched;
        let action = if crossed {
            self.limit_latched = true;
            ActionTaken::Disqualified
        } else {
            ActionTaken::Warned
        };
        self.push_record(
            signal,
            ViolationSeverity::High,
            Some(self.violation_count),
            action,
        );

        tracing::warn!(
            user_id = %self.user_id,
            signal = signal.label(),
            violation_count = self.violation_count,
            limit = self.violation_limit,
            "Proctoring violation recorded"
        );

        if crossed {
            ProctorOutcome::LimitExceeded {
                violation_count: self.violation_count,
            }
        } else {
            ProctorOutcome::Warned {
                violation_count: self.violation_count,
            }
        }
    }

    pub fn acknowledge_warning(&mut self) {
        self.warning_visible = false;
    }

    pub fn violation_count(&self) -> u32 {
        self.violation_count
    }

    pub fn warning_visible(&self) -> bool {
        self.warning_visible
    }

    pub fn violation_log(&self) -> &[ViolationRecord] {
        &self.log
    }

    fn push_record(
        &mut self,
        signal: ProctorSignal,
        severity: ViolationSeverity,
        count_after: Option<u32>,
        action_taken: ActionTaken,
    ) {
        PROCTOR_SIGNALS_TOTAL
            .with_label_values(&[signal.label(), action_label(action_taken)])
            .inc();
        self.log.push(ViolationRecord {
            id: Uuid::new_v4().to_string(),
            user_id: self.user_id.clone(),
            signal,
            severity,
            count_after,
            action_taken,
            timestamp: Utc::now(),
        });
    }
}

fn action_label(action: ActionTaken) -> &'static str {
    match action {
        ActionTaken::Warned => "warned",
        ActionTaken::Suppressed => "suppressed",
        ActionTaken::Disqualified => "disqualified",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suppressed_signals_do_not_score() {
        let mut monitor = ProctorMonitor::new("u1", 3);

        assert_eq!(
            monitor.observe(ProctorSignal::ClipboardAttempt),
            ProctorOutcome::Suppressed
        );
        assert_eq!(
            monitor.observe(ProctorSignal::DevtoolsAttempt),
            ProctorOutcome::Suppressed
        );
        assert_eq!(
            monitor.observe(ProctorSignal::ContextMenuAttempt),
            ProctorOutcome::Suppressed
        );

        assert_eq!(monitor.violation_count(), 0);
        assert!(!monitor.warning_visible());
        assert_eq!(monitor.violation_log().len(), 3);
    }

    #[test]
    fn limit_crossing_is_reported_exactly_once() {
        let mut monitor = ProctorMonitor::new("u1", 3);

        for expected in 1..=3 {
            assert_eq!(
                monitor.observe(ProctorSignal::FullscreenExited),
                ProctorOutcome::Warned {
                    violation_count: expected
                }
            );
        }

        assert_eq!(
            monitor.observe(ProctorSignal::DocumentHidden),
            ProctorOutcome::LimitExceeded { violation_count: 4 }
        );

        // The count stays monotonic but the crossing never fires again.
        assert_eq!(
            monitor.observe(ProctorSignal::FullscreenExited),
            ProctorOutcome::Warned { violation_count: 5 }
        );
    }

    #[test]
    fn acknowledge_clears_the_warning() {
        let mut monitor = ProctorMonitor::new("u1", 3);
        monitor.observe(ProctorSignal::DocumentHidden);
        assert!(monitor.warning_visible());

        monitor.acknowledge_warning();
        assert!(!monitor.warning_visible());
    }
}
