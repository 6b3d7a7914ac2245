use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{category::Category, ids::QuestionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question id cannot be empty")]
    EmptyId,

    #[error("question text cannot be empty")]
    EmptyText,

    #[error("question needs at least 2 options, got {len}")]
    TooFewOptions { len: usize },

    #[error("option {index} is empty")]
    EmptyOption { index: usize },

    #[error("correct answer index {index} is out of range for {len} options")]
    CorrectIndexOutOfRange { index: usize, len: usize },
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A multiple-choice question. Immutable once validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    category: Category,
    text: String,
    options: Vec<String>,
    correct_answer_index: usize,
    explanation: String,
    image_url: Option<String>,
}

impl Question {
    /// Validate and build a question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the id or text is blank, fewer than two options are
    /// given, an option is blank, or `correct_answer_index` does not point at an option.
    pub fn new(
        id: QuestionId,
        category: Category,
        text: impl Into<String>,
        options: Vec<String>,
        correct_answer_index: usize,
        explanation: impl Into<String>,
        image_url: Option<String>,
    ) -> Result<Self, QuestionError> {
        if id.is_blank() {
            return Err(QuestionError::EmptyId);
        }
        let text = text.into();
        if text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }
        if options.len() < 2 {
            return Err(QuestionError::TooFewOptions { len: options.len() });
        }
        if let Some(index) = options.iter().position(|opt| opt.trim().is_empty()) {
            return Err(QuestionError::EmptyOption { index });
        }
        if correct_answer_index >= options.len() {
            return Err(QuestionError::CorrectIndexOutOfRange {
                index: correct_answer_index,
                len: options.len(),
            });
        }

        Ok(Self {
            id,
            category,
            text,
            options,
            correct_answer_index,
            explanation: explanation.into(),
            image_url: image_url.filter(|url| !url.trim().is_empty()),
        })
    }

    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn category(&self) -> Category {
        self.category
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn option(&self, index: usize) -> Option<&str> {
        self.options.get(index).map(String::as_str)
    }

    #[must_use]
    pub fn correct_answer_index(&self) -> usize {
        self.correct_answer_index
    }

    #[must_use]
    pub fn correct_option(&self) -> &str {
        &self.options[self.correct_answer_index]
    }

    #[must_use]
    pub fn is_correct(&self, selected: usize) -> bool {
        selected == self.correct_answer_index
    }

    #[must_use]
    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    #[must_use]
    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }
}

/// Serialized shape of a question in a bank file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    pub id: String,
    pub category: Category,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer_index: usize,
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl QuestionRecord {
    /// Convert the record into a validated `Question`.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when the record breaks a question invariant.
    pub fn into_question(self) -> Result<Question, QuestionError> {
        Question::new(
            QuestionId::new(self.id),
            self.category,
            self.question,
            self.options,
            self.correct_answer_index,
            self.explanation,
            self.image_url,
        )
    }

    #[must_use]
    pub fn from_question(question: &Question) -> Self {
        Self {
            id: question.id().as_str().to_owned(),
            category: question.category(),
            question: question.text().to_owned(),
            options: question.options().to_vec(),
            correct_answer_index: question.correct_answer_index(),
            explanation: question.explanation().to_owned(),
            image_url: question.image_url().map(str::to_owned),
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn options(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("Option {i}")).collect()
    }

    #[test]
    fn rejects_single_option() {
        let err = Question::new(
            QuestionId::new("1"),
            Category::Alertness,
            "Q",
            options(1),
            0,
            "",
            None,
        )
        .unwrap_err();
        assert_eq!(err, QuestionError::TooFewOptions { len: 1 });
    }

    #[test]
    fn rejects_correct_index_past_the_end() {
        let err = Question::new(
            QuestionId::new("1"),
            Category::Alertness,
            "Q",
            options(4),
            4,
            "",
            None,
        )
        .unwrap_err();
        assert_eq!(
            err,
            QuestionError::CorrectIndexOutOfRange { index: 4, len: 4 }
        );
    }

    #[test]
    fn rejects_blank_id_and_text() {
        let blank_id = Question::new(
            QuestionId::new("  "),
            Category::Alertness,
            "Q",
            options(2),
            0,
            "",
            None,
        );
        assert_eq!(blank_id.unwrap_err(), QuestionError::EmptyId);

        let blank_text = Question::new(
            QuestionId::new("1"),
            Category::Alertness,
            " ",
            options(2),
            0,
            "",
            None,
        );
        assert_eq!(blank_text.unwrap_err(), QuestionError::EmptyText);
    }

    #[test]
    fn checks_answers_against_correct_index() {
        let q = Question::new(
            QuestionId::new("1"),
            Category::SafetyMargins,
            "Stopping distance at 70 mph?",
            options(4),
            3,
            "96 metres",
            Some(String::new()),
        )
        .unwrap();

        assert!(q.is_correct(3));
        assert!(!q.is_correct(0));
        assert_eq!(q.correct_option(), "Option 3");
        assert_eq!(q.image_url(), None);
    }

    #[test]
    fn record_uses_camel_case_fields() {
        let json = r#"{
            "id": "9",
            "category": "Motorway Rules",
            "question": "What is the national speed limit on a motorway?",
            "options": ["60 mph", "70 mph"],
            "correctAnswerIndex": 1,
            "explanation": "70 mph for cars.",
            "imageUrl": "https://example.com/m.png"
        }"#;
        let record: QuestionRecord = serde_json::from_str(json).unwrap();
        let q = record.into_question().unwrap();
        assert_eq!(q.category(), Category::MotorwayRules);
        assert_eq!(q.correct_option(), "70 mph");
        assert_eq!(q.image_url(), Some("https://example.com/m.png"));
    }
}
