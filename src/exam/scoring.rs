// src/exam/scoring.rs

use std::collections::HashMap;

use crate::models::result::{QuestionOutcome, ResultSummary};
use crate::models::test::{AnswerValue, Question, QuestionType, TestDefinition};

/// Verdict for one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Correct,
    Incorrect,
    Unattempted,
}

/// Marking policy: maps one question and the student's selection (if any) to
/// a verdict and a score delta.
///
/// The shipped scheme is exact-match with negative marking. Partial-credit
/// MSQ schemes are a known product variant, which is why this is a trait and
/// not a function.
pub trait MarkingScheme: Send + Sync {
    fn grade(&self, question: &Question, selection: Option<&AnswerValue>) -> (Verdict, f64);
}

/// Default marking: full marks on an exact match, `-negative_marks` on any
/// attempted-but-wrong answer, zero otherwise.
///
/// MSQ questions demand the selected set equal the correct set exactly; a
/// proper subset of the correct options scores as wrong, with no partial
/// credit.
pub struct ExactMatchMarking;

impl ExactMatchMarking {
    fn is_correct(question: &Question, selection: &AnswerValue) -> bool {
        match question.question_type {
            QuestionType::Mcq => match (&question.correct_option, selection.as_text()) {
                (Some(key), Some(picked)) => *key == picked,
                _ => false,
            },
            QuestionType::Msq => match (&question.correct_options, selection) {
                (Some(key), AnswerValue::Multiple(picked)) => key == picked,
                _ => false,
            },
            QuestionType::Integer => {
                let Some(key) = &question.integer_answer else {
                    return false;
                };
                // Numeric comparison when both sides parse; otherwise fall
                // back to string equality.
                match (key.as_number(), selection.as_number()) {
                    (Some(expected), Some(given)) => expected == given,
                    _ => {
                        let expected = match key {
                            crate::models::test::IntegerAnswer::Number(n) => n.to_string(),
                            crate::models::test::IntegerAnswer::Text(s) => s.trim().to_string(),
                        };
                        selection
                            .as_text()
                            .map(|given| given.trim() == expected)
                            .unwrap_or(false)
                    }
                }
            }
        }
    }
}

impl MarkingScheme for ExactMatchMarking {
    fn grade(&self, question: &Question, selection: Option<&AnswerValue>) -> (Verdict, f64) {
        let Some(selection) = selection else {
            return (Verdict::Unattempted, 0.0);
        };
        if Self::is_correct(question, selection) {
            (Verdict::Correct, question.marks)
        } else {
            (Verdict::Incorrect, -question.negative_marks)
        }
    }
}

/// Scores a full attempt. Pure and deterministic: the same test, answers and
/// time always produce the same summary.
///
/// Walks the questions in test order and emits one `attempt_data` entry per
/// question, attempted or not, so `correct + wrong + unattempted` always
/// equals the question count.
pub fn score_attempt(
    test: &TestDefinition,
    answers: &HashMap<String, AnswerValue>,
    time_taken_seconds: u64,
    scheme: &dyn MarkingScheme,
) -> ResultSummary {
    let mut score = 0.0;
    let mut correct_answers = 0u32;
    let mut wrong_answers = 0u32;
    let mut unattempted = 0u32;
    let mut attempt_data = Vec::with_capacity(test.questions.0.len());

    for question in &test.questions.0 {
        let selection = answers.get(&question.id);
        let (verdict, delta) = scheme.grade(question, selection);
        score += delta;

        match verdict {
            Verdict::Correct => correct_answers += 1,
            Verdict::Incorrect => wrong_answers += 1,
            Verdict::Unattempted => unattempted += 1,
        }

        attempt_data.push(QuestionOutcome {
            question_id: question.id.clone(),
            selected: selection.cloned(),
            is_correct: verdict == Verdict::Correct,
        });
    }

    let total_questions = test.questions.0.len() as u32;
    let accuracy = if total_questions == 0 {
        0.0
    } else {
        correct_answers as f64 / total_questions as f64
    };

    ResultSummary {
        score,
        accuracy,
        total_questions,
        correct_answers,
        wrong_answers,
        unattempted,
        attempt_data,
        time_taken_seconds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test::IntegerAnswer;
    use sqlx::types::Json;
    use std::collections::BTreeSet;

    fn mcq(id: &str, correct: &str) -> Question {
        Question {
            id: id.to_string(),
            text: format!("Question {}", id),
            image: None,
            question_type: QuestionType::Mcq,
            options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            option_images: vec![],
            correct_option: Some(correct.to_string()),
            correct_options: None,
            integer_answer: None,
            marks: 4.0,
            negative_marks: 1.0,
            subject: None,
            topic: None,
        }
    }

    fn msq(id: &str, correct: &[&str]) -> Question {
        Question {
            correct_option: None,
            correct_options: Some(correct.iter().map(|s| s.to_string()).collect()),
            question_type: QuestionType::Msq,
            ..mcq(id, "")
        }
    }

    fn integer(id: &str, key: IntegerAnswer) -> Question {
        Question {
            correct_option: None,
            integer_answer: Some(key),
            question_type: QuestionType::Integer,
            options: vec![],
            ..mcq(id, "")
        }
    }

    fn test_with(questions: Vec<Question>) -> TestDefinition {
        TestDefinition {
            id: 1,
            title: "Fixture".to_string(),
            duration_minutes: 60,
            total_marks: questions.iter().map(|q| q.marks).sum(),
            category: "practice".to_string(),
            instructions: String::new(),
            questions: Json(questions),
            max_attempts: None,
            created_at: None,
        }
    }

    fn single(s: &str) -> AnswerValue {
        AnswerValue::Single(s.to_string())
    }

    fn multiple(items: &[&str]) -> AnswerValue {
        AnswerValue::Multiple(items.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>())
    }

    #[test]
    fn counts_always_sum_to_question_count() {
        let test = test_with(vec![mcq("q1", "A"), mcq("q2", "B"), mcq("q3", "C")]);
        let mut answers = HashMap::new();
        answers.insert("q1".to_string(), single("A"));
        answers.insert("q2".to_string(), single("D"));

        let summary = score_attempt(&test, &answers, 100, &ExactMatchMarking);
        assert_eq!(
            summary.correct_answers + summary.wrong_answers + summary.unattempted,
            summary.total_questions
        );
        assert_eq!(summary.attempt_data.len(), 3);
    }

    #[test]
    fn empty_test_has_zero_accuracy_without_fault() {
        let test = test_with(vec![]);
        let summary = score_attempt(&test, &HashMap::new(), 0, &ExactMatchMarking);
        assert_eq!(summary.total_questions, 0);
        assert_eq!(summary.accuracy, 0.0);
        assert_eq!(summary.score, 0.0);
    }

    #[test]
    fn negative_marking_scenario() {
        // Two mcq questions, marks=4 negative=1; one right, one wrong.
        let test = test_with(vec![mcq("q1", "A"), mcq("q2", "B")]);
        let mut answers = HashMap::new();
        answers.insert("q1".to_string(), single("A"));
        answers.insert("q2".to_string(), single("C"));

        let summary = score_attempt(&test, &answers, 42, &ExactMatchMarking);
        assert_eq!(summary.score, 3.0);
        assert_eq!(summary.correct_answers, 1);
        assert_eq!(summary.wrong_answers, 1);
        assert_eq!(summary.unattempted, 0);
        assert_eq!(summary.accuracy, 0.5);
        assert_eq!(summary.time_taken_seconds, 42);
    }

    #[test]
    fn unattempted_contributes_nothing() {
        let test = test_with(vec![mcq("q1", "A"), mcq("q2", "B")]);
        let mut answers = HashMap::new();
        answers.insert("q1".to_string(), single("A"));

        let summary = score_attempt(&test, &answers, 10, &ExactMatchMarking);
        assert_eq!(summary.score, 4.0);
        assert_eq!(summary.unattempted, 1);
        assert!(!summary.attempt_data[1].is_correct);
        assert!(summary.attempt_data[1].selected.is_none());
    }

    #[test]
    fn msq_proper_subset_gets_no_partial_credit() {
        let test = test_with(vec![msq("q1", &["A", "C"])]);
        let mut answers = HashMap::new();
        answers.insert("q1".to_string(), multiple(&["A"]));

        let summary = score_attempt(&test, &answers, 5, &ExactMatchMarking);
        assert_eq!(summary.wrong_answers, 1);
        assert_eq!(summary.score, -1.0);
    }

    #[test]
    fn msq_superset_is_wrong_and_exact_set_is_right() {
        let test = test_with(vec![msq("q1", &["A", "C"])]);

        let mut superset = HashMap::new();
        superset.insert("q1".to_string(), multiple(&["A", "C", "D"]));
        let summary = score_attempt(&test, &superset, 5, &ExactMatchMarking);
        assert_eq!(summary.wrong_answers, 1);

        let mut exact = HashMap::new();
        exact.insert("q1".to_string(), multiple(&["C", "A"]));
        let summary = score_attempt(&test, &exact, 5, &ExactMatchMarking);
        assert_eq!(summary.correct_answers, 1);
        assert_eq!(summary.score, 4.0);
    }

    #[test]
    fn integer_answers_compare_numerically() {
        // Key stored as a numeric string; submissions as number and string.
        let test = test_with(vec![integer("q1", IntegerAnswer::Text("42".into()))]);

        let mut as_number = HashMap::new();
        as_number.insert("q1".to_string(), AnswerValue::Number(42));
        let summary = score_attempt(&test, &as_number, 5, &ExactMatchMarking);
        assert_eq!(summary.correct_answers, 1);

        let mut as_text = HashMap::new();
        as_text.insert("q1".to_string(), single(" 42 "));
        let summary = score_attempt(&test, &as_text, 5, &ExactMatchMarking);
        assert_eq!(summary.correct_answers, 1);
    }

    #[test]
    fn unparseable_integer_key_falls_back_to_string_equality() {
        let test = test_with(vec![integer("q1", IntegerAnswer::Text("4x2".into()))]);

        let mut matching = HashMap::new();
        matching.insert("q1".to_string(), single("4x2"));
        let summary = score_attempt(&test, &matching, 5, &ExactMatchMarking);
        assert_eq!(summary.correct_answers, 1);

        let mut differing = HashMap::new();
        differing.insert("q1".to_string(), AnswerValue::Number(42));
        let summary = score_attempt(&test, &differing, 5, &ExactMatchMarking);
        assert_eq!(summary.wrong_answers, 1);
    }

    #[test]
    fn negative_total_scores_are_possible() {
        let test = test_with(vec![mcq("q1", "A"), mcq("q2", "B")]);
        let mut answers = HashMap::new();
        answers.insert("q1".to_string(), single("B"));
        answers.insert("q2".to_string(), single("C"));

        let summary = score_attempt(&test, &answers, 5, &ExactMatchMarking);
        assert_eq!(summary.score, -2.0);
    }
}
