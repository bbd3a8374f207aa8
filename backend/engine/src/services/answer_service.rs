use crate::models::question::{AnswerMap, Question};
use crate::models::score::ScoreSummary;

/// The contestant's current choices. Mutated only by direct contestant
/// interaction; timer and proctoring events never touch it.
#[derive(Debug, Clone, Default)]
pub struct AnswerSheet {
    choices: AnswerMap,
}

impl AnswerSheet {
    /// Records a choice, overwriting any prior choice for the question.
    pub fn record(&mut self, question_id: &str, choice_id: &str) {
        self.choices
            .insert(question_id.to_string(), choice_id.to_string());
    }

    /// One-shot copy of the map; scoring reads this, never the live map.
    pub fn snapshot(&self) -> AnswerMap {
        self.choices.clone()
    }

    pub fn answered_count(&self) -> usize {
        self.choices.len()
    }
}

/// Sums `marks` over every question whose recorded answer matches its
/// correct choice. Pure: the same snapshot and question set always produce
/// the same summary.
pub fn compute_score(answers: &AnswerMap, questions: &[Question]) -> ScoreSummary {
    let total_questions = questions.len() as u32;
    let mut total_score = 0i64;
    let mut correct_count = 0u32;

    for question in questions {
        let correct = answers
            .get(&question.id)
            .is_some_and(|choice| *choice == question.correct_choice_id);
        if correct {
            total_score += question.marks;
            correct_count += 1;
        }
    }

    let percentage = if total_questions == 0 {
        0.0
    } else {
        correct_count as f64 * 100.0 / total_questions as f64
    };

    ScoreSummary {
        total_score,
        correct_count,
        total_questions,
        percentage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::Choice;

    fn question(id: &str, correct: &str, marks: i64) -> Question {
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

    #[test]
    fn sums_marks_for_correct_answers_only() {
        let questions = vec![question("q1", "a", 5), question("q2", "c", 10)];
        let mut sheet = AnswerSheet::default();
        sheet.record("q1", "a");
        sheet.record("q2", "b");

        let summary = compute_score(&sheet.snapshot(), &questions);
        assert_eq!(summary.total_score, 5);
        assert_eq!(summary.correct_count, 1);
        assert_eq!(summary.total_questions, 2);
        assert_eq!(summary.percentage, 50.0);
    }

    #[test]
    fn overwriting_a_choice_changes_the_outcome() {
        let questions = vec![question("q1", "a", 5)];
        let mut sheet = AnswerSheet::default();
        sheet.record("q1", "a");
        sheet.record("q1", "d");

        let summary = compute_score(&sheet.snapshot(), &questions);
        assert_eq!(summary.total_score, 0);
        assert_eq!(sheet.answered_count(), 1);
    }

    #[test]
    fn answers_for_unknown_questions_are_ignored() {
        let questions = vec![question("q1", "a", 5)];
        let mut sheet = AnswerSheet::default();
        sheet.record("q1", "a");
        sheet.record("ghost", "a");

        let summary = compute_score(&sheet.snapshot(), &questions);
        assert_eq!(summary.total_score, 5);
        assert_eq!(summary.correct_count, 1);
    }

    #[test]
    fn empty_question_set_scores_zero() {
        let summary = compute_score(&AnswerMap::new(), &[]);
        assert_eq!(summary.total_score, 0);
        assert_eq!(summary.total_questions, 0);
        assert_eq!(summary.percentage, 0.0);
    }

    #[test]
    fn snapshot_is_detached_from_later_mutation() {
        let questions = vec![question("q1", "a", 5)];
        let mut sheet = AnswerSheet::default();
        sheet.record("q1", "a");

        let snapshot = sheet.snapshot();
        sheet.record("q1", "b");

        assert_eq!(compute_score(&snapshot, &questions).total_score, 5);
        assert_eq!(compute_score(&sheet.snapshot(), &questions).total_score, 0);
    }
}
