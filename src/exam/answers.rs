// src/exam/answers.rs

use std::collections::HashMap;

use crate::models::test::{AnswerValue, Question};

/// In-memory answer sheet for one attempt: question id → current selection.
///
/// Last write wins; no history is kept. Once sealed (submission has begun)
/// every mutation is rejected, which is what guarantees the scoring engine
/// reads a stable snapshot.
pub struct AnswerSheet {
    entries: HashMap<String, AnswerValue>,
    sealed: bool,
}

impl AnswerSheet {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            sealed: false,
        }
    }

    /// Records a selection, overwriting any prior one for the question.
    ///
    /// Returns false when the value shape does not match the question type
    /// or the sheet is sealed. A mismatched shape is a caller bug, not a
    /// runtime fault, so it is logged and dropped rather than propagated.
    pub fn select(&mut self, question: &Question, value: AnswerValue) -> bool {
        if self.sealed {
            tracing::debug!("Answer for {} rejected: sheet is sealed", question.id);
            return false;
        }
        if !value.matches(question.question_type) {
            tracing::debug!(
                "Answer for {} rejected: shape does not fit {:?}",
                question.id,
                question.question_type
            );
            return false;
        }
        self.entries.insert(question.id.clone(), value);
        true
    }

    /// Removes the entry entirely, marking the question unattempted.
    pub fn clear(&mut self, question_id: &str) -> bool {
        if self.sealed {
            return false;
        }
        self.entries.remove(question_id).is_some()
    }

    pub fn get(&self, question_id: &str) -> Option<&AnswerValue> {
        self.entries.get(question_id)
    }

    pub fn answered_count(&self) -> usize {
        self.entries.len()
    }

    /// Sorted ids of answered questions, for status reporting.
    pub fn answered_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Read-only copy for scoring.
    pub fn snapshot(&self) -> HashMap<String, AnswerValue> {
        self.entries.clone()
    }

    /// Closes the gate: no mutation is accepted after this.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }
}

impl Default for AnswerSheet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test::QuestionType;
    use std::collections::BTreeSet;

    fn mcq(id: &str) -> Question {
        Question {
            id: id.to_string(),
            text: "Pick one".to_string(),
            image: None,
            question_type: QuestionType::Mcq,
            options: vec!["A".into(), "B".into()],
            option_images: vec![],
            correct_option: Some("A".into()),
            correct_options: None,
            integer_answer: None,
            marks: 4.0,
            negative_marks: 1.0,
            subject: None,
            topic: None,
        }
    }

    #[test]
    fn last_write_wins() {
        let q = mcq("q1");
        let mut sheet = AnswerSheet::new();
        assert!(sheet.select(&q, AnswerValue::Single("A".into())));
        assert!(sheet.select(&q, AnswerValue::Single("B".into())));
        assert_eq!(sheet.get("q1"), Some(&AnswerValue::Single("B".into())));
        assert_eq!(sheet.answered_count(), 1);
    }

    #[test]
    fn shape_mismatch_is_dropped_silently() {
        let q = mcq("q1");
        let mut sheet = AnswerSheet::new();
        let set: BTreeSet<String> = ["A".to_string()].into_iter().collect();
        assert!(!sheet.select(&q, AnswerValue::Multiple(set)));
        assert!(sheet.get("q1").is_none());
    }

    #[test]
    fn clear_marks_unattempted() {
        let q = mcq("q1");
        let mut sheet = AnswerSheet::new();
        sheet.select(&q, AnswerValue::Single("A".into()));
        assert!(sheet.clear("q1"));
        assert!(!sheet.clear("q1"));
        assert_eq!(sheet.answered_count(), 0);
    }

    #[test]
    fn sealed_sheet_rejects_all_mutation() {
        let q = mcq("q1");
        let mut sheet = AnswerSheet::new();
        sheet.select(&q, AnswerValue::Single("A".into()));
        sheet.seal();

        assert!(!sheet.select(&q, AnswerValue::Single("B".into())));
        assert!(!sheet.clear("q1"));
        assert_eq!(sheet.get("q1"), Some(&AnswerValue::Single("A".into())));
    }
}
