use std::sync::Arc;
use std::time::Duration;

use contestarena_engine::models::question::{Choice, Question};
use contestarena_engine::models::SessionStatus;
use contestarena_engine::services::presentation::HeadlessPresentation;
use contestarena_engine::services::question_provider::StaticQuestionProvider;
use contestarena_engine::services::score_store::MemoryScoreStore;
use contestarena_engine::{Config, EngineContext, SessionEngine};

pub const USER_ID: &str = "user-1";
pub const CONTEST_ID: &str = "contest-1";

pub struct TestHarness {
    pub engine: SessionEngine,
    pub scores: Arc<MemoryScoreStore>,
    pub presentation: Arc<HeadlessPresentation>,
}

/// Two questions worth 5 and 10 marks; "a" and "c" are the correct choices.
pub fn sample_questions() -> Vec<Question> {
    vec![question("q1", "a", 5), question("q2", "c", 10)]
}

pub fn question(id: &str, correct: &str, marks: i64) -> Question {
    Question {
        id: id.to_string(),
        prompt: format!("prompt {}", id),
        choices: ["a", "b", "c", "d"]
            .iter()
            .map(|c| Choice {
                id: c.to_string(),
                text: format!("choice {}", c),
            })
            .collect(),
        correct_choice_id: correct.to_string(),
        marks,
    }
}

pub fn build_harness(duration: Duration) -> TestHarness {
    build_harness_for_contest(duration, CONTEST_ID)
}

pub fn build_harness_for_contest(duration: Duration, contest_id: &str) -> TestHarness {
    build_harness_with_config(duration, contest_id, Config::default())
}

pub fn build_harness_with_config(duration: Duration, contest_id: &str, config: Config) -> TestHarness {
    // Initialize tracing for tests
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let scores = Arc::new(MemoryScoreStore::new());
    let presentation = Arc::new(HeadlessPresentation::new());
    let questions =
        Arc::new(StaticQuestionProvider::new().with_contest(CONTEST_ID, sample_questions()));

    let ctx = EngineContext::new(config, questions, scores.clone(), presentation.clone());
    let engine = SessionEngine::new(ctx, USER_ID, contest_id, duration);

    TestHarness {
        engine,
        scores,
        presentation,
    }
}

pub async fn start_active(harness: &TestHarness) {
    harness
        .engine
        .enter_instructions()
        .expect("instructions transition should succeed");
    harness
        .engine
        .start()
        .await
        .expect("session start should succeed");
}

/// Polls until the session reaches the expected status. Under a paused
/// tokio clock the sleeps auto-advance, so this drives timers, checkpoints,
/// and expiry deterministically.
pub async fn wait_for_status(engine: &SessionEngine, status: SessionStatus) {
    for _ in 0..10_000 {
        if engine.current_state().status == status {
            return;
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
    panic!(
        "session never reached {:?}, stuck at {:?}",
        status,
        engine.current_state().status
    );
}
