use std::collections::HashMap;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::models::question::Question;

/// Source of the fixed question set for a contest. Questions are loaded once
/// at session start and are immutable for the session's lifetime.
#[async_trait]
pub trait QuestionProvider: Send + Sync {
    async fn questions_for(&self, contest_id: &str) -> Result<Vec<Question>>;
}

/// Question provider backed by a fixed map, for tests and embedders that
/// load contest content ahead of time.
#[derive(Default)]
pub struct StaticQuestionProvider {
    by_contest: HashMap<String, Vec<Question>>,
}

impl StaticQuestionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contest(mut self, contest_id: &str, questions: Vec<Question>) -> Self {
        self.by_contest.insert(contest_id.to_string(), questions);
        self
    }
}

#[async_trait]
impl QuestionProvider for StaticQuestionProvider {
    async fn questions_for(&self, contest_id: &str) -> Result<Vec<Question>> {
        match self.by_contest.get(contest_id) {
            Some(questions) => Ok(questions.clone()),
            None => bail!("unknown contest: {}", contest_id),
        }
    }
}
