use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::score::ScoreRecord;

/// Persistence seam for score records, keyed by (user, contest).
///
/// `update_checkpoint` only ever touches the semi fields; `finalize` is
/// first-writer-wins on `end_time`, which makes the terminal write safe to
/// retry and keeps an authoritative backend write from being clobbered.
#[async_trait]
pub trait ScoreStore: Send + Sync {
    async fn get(&self, user_id: &str, contest_id: &str) -> Result<Option<ScoreRecord>>;

    async fn create_in_progress(
        &self,
        user_id: &str,
        contest_id: &str,
        started_at: DateTime<Utc>,
    ) -> Result<()>;

    async fn update_checkpoint(
        &self,
        user_id: &str,
        contest_id: &str,
        semi_score: i64,
        semi_time: DateTime<Utc>,
    ) -> Result<()>;

    async fn finalize(
        &self,
        user_id: &str,
        contest_id: &str,
        final_score: i64,
        end_time: DateTime<Utc>,
    ) -> Result<ScoreRecord>;
}

/// In-memory score store for tests and single-process embedders.
#[derive(Default)]
pub struct MemoryScoreStore {
    records: Mutex<HashMap<(String, String), ScoreRecord>>,
    fail_writes: AtomicBool,
}

impl MemoryScoreStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent writes fail, to exercise persistence-failure paths.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Drops any record for the pair, so a fresh attempt can start.
    pub fn remove(&self, user_id: &str, contest_id: &str) {
        self.records
            .lock()
            .expect("score store lock poisoned")
            .remove(&Self::key(user_id, contest_id));
    }

    fn key(user_id: &str, contest_id: &str) -> (String, String) {
        (user_id.to_string(), contest_id.to_string())
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("simulated score store write failure");
        }
        Ok(())
    }
}

#[async_trait]
impl ScoreStore for MemoryScoreStore {
    async fn get(&self, user_id: &str, contest_id: &str) -> Result<Option<ScoreRecord>> {
        let records = self.records.lock().expect("score store lock poisoned");
        Ok(records.get(&Self::key(user_id, contest_id)).cloned())
    }

    async fn create_in_progress(
        &self,
        user_id: &str,
        contest_id: &str,
        started_at: DateTime<Utc>,
    ) -> Result<()> {
        self.check_writable()?;
        let mut records = self.records.lock().expect("score store lock poisoned");
        let key = Self::key(user_id, contest_id);
        if records.contains_key(&key) {
            bail!(
                "score record already exists for user={} contest={}",
                user_id,
                contest_id
            );
        }
        records.insert(key, ScoreRecord::in_progress(user_id, contest_id, started_at));
        Ok(())
    }

    async fn update_checkpoint(
        &self,
        user_id: &str,
        contest_id: &str,
        semi_score: i64,
        semi_time: DateTime<Utc>,
    ) -> Result<()> {
        self.check_writable()?;
        let mut records = self.records.lock().expect("score store lock poisoned");
        let record = match records.get_mut(&Self::key(user_id, contest_id)) {
            Some(record) => record,
            None => bail!(
                "no score record for user={} contest={}",
                user_id,
                contest_id
            ),
        };
        if record.is_finalized() {
            tracing::debug!(
                user_id,
                contest_id,
                "Skipping checkpoint for finalized record"
            );
            return Ok(());
        }
        record.semi_score = Some(semi_score);
        record.semi_time = Some(semi_time);
        Ok(())
    }

    async fn finalize(
        &self,
        user_id: &str,
        contest_id: &str,
        final_score: i64,
        end_time: DateTime<Utc>,
    ) -> Result<ScoreRecord> {
        self.check_writable()?;
        let mut records = self.records.lock().expect("score store lock poisoned");
        let record = match records.get_mut(&Self::key(user_id, contest_id)) {
            Some(record) => record,
            None => bail!(
                "no score record for user={} contest={}",
                user_id,
                contest_id
            ),
        };
        if !record.is_finalized() {
            record.final_score = Some(final_score);
            record.end_time = Some(end_time);
        }
        Ok(record.clone())
    }
}
