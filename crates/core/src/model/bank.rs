use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;

use crate::model::{
    category::Category,
    ids::QuestionId,
    question::{Question, QuestionError, QuestionRecord},
};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BankError {
    #[error("question bank is empty")]
    Empty,

    #[error("duplicate question id: {0}")]
    DuplicateId(QuestionId),

    #[error("question {id} is invalid: {source}")]
    InvalidQuestion {
        id: String,
        #[source]
        source: QuestionError,
    },

    #[error("question bank is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// The static, ordered set of questions available at startup.
///
/// Cloning is cheap; the questions are shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionBank {
    questions: Arc<[Question]>,
}

impl QuestionBank {
    /// Build a bank from already-validated questions.
    ///
    /// # Errors
    ///
    /// Returns `BankError::Empty` when no questions are given and
    /// `BankError::DuplicateId` when two questions share an id.
    pub fn new(questions: Vec<Question>) -> Result<Self, BankError> {
        if questions.is_empty() {
            return Err(BankError::Empty);
        }
        let mut seen = HashSet::with_capacity(questions.len());
        for question in &questions {
            if !seen.insert(question.id()) {
                return Err(BankError::DuplicateId(question.id().clone()));
            }
        }
        Ok(Self {
            questions: questions.into(),
        })
    }

    /// Parse a bank from a JSON array of question records.
    ///
    /// # Errors
    ///
    /// Returns `BankError` if the JSON is malformed or any record is invalid.
    pub fn from_json(json: &str) -> Result<Self, BankError> {
        let records: Vec<QuestionRecord> = serde_json::from_str(json)?;
        let questions = records
            .into_iter()
            .map(|record| {
                let id = record.id.clone();
                record
                    .into_question()
                    .map_err(|source| BankError::InvalidQuestion { id, source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(questions)
    }

    /// The question set shipped with the application.
    #[must_use]
    pub fn builtin() -> Self {
        let questions: Vec<Question> = builtin_records()
            .into_iter()
            .filter_map(|record| record.into_question().ok())
            .collect();
        Self {
            questions: questions.into(),
        }
    }

    /// The whole bank, in bank order.
    #[must_use]
    pub fn all(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// First question in bank order.
    #[must_use]
    pub fn first(&self) -> Option<&Question> {
        self.questions.first()
    }

    #[must_use]
    pub fn get(&self, id: &QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id() == id)
    }

    /// Questions of one category, in bank order.
    pub fn in_category(&self, category: Category) -> impl Iterator<Item = &Question> {
        self.questions
            .iter()
            .filter(move |q| q.category() == category)
    }
}

fn record(
    id: &str,
    category: Category,
    question: &str,
    options: [&str; 4],
    correct_answer_index: usize,
    explanation: &str,
    image_url: Option<&str>,
) -> QuestionRecord {
    QuestionRecord {
        id: id.to_owned(),
        category,
        question: question.to_owned(),
        options: options.iter().map(|opt| (*opt).to_owned()).collect(),
        correct_answer_index,
        explanation: explanation.to_owned(),
        image_url: image_url.map(str::to_owned),
    }
}

fn builtin_records() -> Vec<QuestionRecord> {
    vec![
        record(
            "1",
            Category::RoadAndTrafficSigns,
            "What does this sign mean?",
            [
                "No entry for motor vehicles",
                "End of clearway",
                "National speed limit applies",
                "Give way to oncoming traffic",
            ],
            2,
            "The circular sign with a diagonal black stripe on a white background signifies the end of all local speed limits and the start of the national speed limit.",
            Some("https://images.unsplash.com/photo-1542332213-31f87348057f?q=80&w=400&h=300&auto=format&fit=crop"),
        ),
        record(
            "2",
            Category::SafetyMargins,
            "In good conditions, what is the typical overall stopping distance at 70 mph?",
            [
                "53 metres (175 feet)",
                "60 metres (197 feet)",
                "73 metres (240 feet)",
                "96 metres (315 feet)",
            ],
            3,
            "At 70 mph, the thinking distance is 21m and the braking distance is 75m, giving a total stopping distance of 96m (315 feet).",
            None,
        ),
        record(
            "3",
            Category::VulnerableRoadUsers,
            "You are waiting to emerge from a junction. A motorcyclist is approaching with a flashing left indicator. What should you do?",
            [
                "Pull out before they reach you",
                "Assume they are turning left and pull out",
                "Wait until the motorcyclist has started to turn",
                "Flash your lights to tell them to proceed",
            ],
            2,
            "Indicators on a motorcycle can be easily left on by mistake. Wait to see if they actually start to turn before pulling out.",
            None,
        ),
        record(
            "4",
            Category::RulesOfTheRoad,
            "When may you drive over a footpath?",
            [
                "To overtake slow-moving traffic",
                "When the road is blocked",
                "To get into a property",
                "If there are no pedestrians",
            ],
            2,
            "You must not drive on or over a pavement, footpath or bridleway except to gain lawful access to property, or in the case of an emergency.",
            None,
        ),
        record(
            "5",
            Category::SafetyAndYourVehicle,
            "What should you do if your anti-lock brakes (ABS) warning light stays on while driving?",
            [
                "Stop and call for assistance",
                "Have the system checked as soon as possible",
                "Continue as normal, it only affects emergency braking",
                "Top up the brake fluid",
            ],
            1,
            "If the ABS light stays on, it means there is a fault in the system. Your normal brakes will still work, but you won't have the benefit of ABS in an emergency. Get it checked immediately.",
            None,
        ),
    ]
}
