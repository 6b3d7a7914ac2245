use quiz_core::model::{Question, SessionMode, SessionId};

use super::controller::SessionState;

/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining: usize,
    pub score: u32,
    pub is_complete: bool,
}

/// Owned copy of everything a front end needs to draw the current question.
///
/// Taken under the controller lock so the fields are consistent with each other.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub session_id: Option<SessionId>,
    pub mode: Option<SessionMode>,
    pub question: Option<Question>,
    pub index: usize,
    pub total: usize,
    pub score: u32,
    pub time_remaining_secs: Option<u32>,
    pub selection: Option<usize>,
    /// Stored explanation, present once a practice answer has been given.
    pub explanation: Option<String>,
    /// Generated explanation attached for the current question, if any.
    pub ai_explanation: Option<String>,
}
