mod common;

use std::time::Duration;

use contestarena_engine::models::SessionStatus;
use contestarena_engine::services::score_store::{MemoryScoreStore, ScoreStore};

const CONTEST_DURATION: Duration = Duration::from_secs(600);

async fn wait_for_semi_score(scores: &MemoryScoreStore, expected: i64) {
    for _ in 0..10_000 {
        let semi = scores
            .get(common::USER_ID, common::CONTEST_ID)
            .await
            .unwrap()
            .and_then(|record| record.semi_score);
        if semi == Some(expected) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
    panic!("semi score never reached {}", expected);
}

#[tokio::test(start_paused = true)]
async fn checkpoints_overwrite_the_semi_score_each_interval() {
    let harness = common::build_harness(CONTEST_DURATION);
    common::start_active(&harness).await;

    harness.engine.answer("q1", "a").unwrap();
    wait_for_semi_score(&harness.scores, 5).await;

    harness.engine.answer("q2", "c").unwrap();
    wait_for_semi_score(&harness.scores, 15).await;

    assert_eq!(harness.engine.current_state().status, SessionStatus::Active);
}

#[tokio::test(start_paused = true)]
async fn checkpoint_is_a_noop_outside_the_active_phase() {
    let harness = common::build_harness(CONTEST_DURATION);

    // Nothing to write before start.
    assert!(!harness.engine.checkpoint_once().await.unwrap());

    common::start_active(&harness).await;
    harness.engine.answer("q1", "a").unwrap();
    assert!(harness.engine.checkpoint_once().await.unwrap());

    harness.engine.submit().await.unwrap();

    // A checkpoint racing in after finalize skips without writing.
    assert!(!harness.engine.checkpoint_once().await.unwrap());
    let record = harness
        .scores
        .get(common::USER_ID, common::CONTEST_ID)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.semi_score, Some(5));
    assert_eq!(record.final_score, Some(5));
}

#[tokio::test(start_paused = true)]
async fn checkpoint_failures_are_retried_next_interval() {
    let harness = common::build_harness(CONTEST_DURATION);
    common::start_active(&harness).await;
    harness.engine.answer("q1", "a").unwrap();

    harness.scores.set_fail_writes(true);
    // Several intervals pass with the store down; the session stays healthy.
    tokio::time::sleep(Duration::from_secs(65)).await;
    assert_eq!(harness.engine.current_state().status, SessionStatus::Active);
    let record = harness
        .scores
        .get(common::USER_ID, common::CONTEST_ID)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.semi_score, None);

    harness.scores.set_fail_writes(false);
    wait_for_semi_score(&harness.scores, 5).await;
}

#[tokio::test(start_paused = true)]
async fn checkpoint_worker_stops_with_the_session() {
    let harness = common::build_harness(CONTEST_DURATION);
    common::start_active(&harness).await;
    harness.engine.answer("q1", "a").unwrap();
    wait_for_semi_score(&harness.scores, 5).await;

    harness.engine.answer("q2", "c").unwrap();
    harness.engine.submit().await.unwrap();

    // With the worker gone, the semi score can only be what finalize left.
    tokio::time::sleep(Duration::from_secs(120)).await;
    let record = harness
        .scores
        .get(common::USER_ID, common::CONTEST_ID)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.semi_score, Some(5));
    assert_eq!(record.final_score, Some(15));
}
