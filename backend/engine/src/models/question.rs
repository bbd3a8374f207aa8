use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Mapping from question id to the contestant's selected choice id.
pub type AnswerMap = HashMap<String, String>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    pub id: String,
    pub text: String,
}

/// A single multiple-choice question. Immutable for the session's lifetime;
/// sourced from the question provider at session start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub prompt: String,
    pub choices: Vec<Choice>,
    pub correct_choice_id: String,
    pub marks: i64,
}
