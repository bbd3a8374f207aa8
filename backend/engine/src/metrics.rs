use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge, Encoder, IntCounter,
    IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    // Session lifecycle
    pub static ref SESSIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "exam_sessions_total",
        "Total number of exam sessions by lifecycle event",
        &["event"]
    )
    .unwrap();

    pub static ref SESSIONS_ACTIVE: IntGauge = register_int_gauge!(
        "exam_sessions_active",
        "Number of currently active exam sessions"
    )
    .unwrap();

    // Answers
    pub static ref ANSWERS_RECORDED_TOTAL: IntCounter = register_int_counter!(
        "exam_answers_recorded_total",
        "Total number of answer selections recorded"
    )
    .unwrap();

    // Proctoring
    pub static ref PROCTOR_SIGNALS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "proctor_signals_total",
        "Total number of proctoring signals observed",
        &["signal", "action"]
    )
    .unwrap();

    // Checkpoints
    pub static ref CHECKPOINT_TICKS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "score_checkpoint_ticks_total",
        "Total number of checkpoint worker ticks",
        &["status"]
    )
    .unwrap();

    // Finalization
    pub static ref FINALIZE_ATTEMPTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "session_finalize_attempts_total",
        "Total number of finalize attempts by trigger and outcome",
        &["trigger", "status"]
    )
    .unwrap();
}

/// Renders all metrics in Prometheus text format
pub fn render_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| prometheus::Error::Msg(format!("Failed to convert metrics to UTF-8: {}", e)))
}
