use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted score record for one (user, contest) session.
///
/// `semi_score`/`semi_time` are overwritten by each checkpoint tick;
/// `final_score`/`end_time` are written exactly once by finalize, and their
/// presence marks the session as authoritatively ended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub user_id: String,
    pub contest_id: String,
    pub started_at: DateTime<Utc>,
    pub semi_score: Option<i64>,
    pub semi_time: Option<DateTime<Utc>>,
    pub final_score: Option<i64>,
    pub end_time: Option<DateTime<Utc>>,
}

impl ScoreRecord {
    pub fn in_progress(user_id: &str, contest_id: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            contest_id: contest_id.to_string(),
            started_at,
            semi_score: None,
            semi_time: None,
            final_score: None,
            end_time: None,
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.end_time.is_some()
    }
}

/// Deterministic scoring result computed from an answer map and the fixed
/// question set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreSummary {
    pub total_score: i64,
    pub correct_count: u32,
    pub total_questions: u32,
    pub percentage: f64,
}
