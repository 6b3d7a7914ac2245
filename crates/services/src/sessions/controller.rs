use std::fmt;

use chrono::{DateTime, Utc};

use quiz_core::Clock;
use quiz_core::model::{ExamSettings, Question, QuestionId, SessionId, SessionMode, TestResult};

use super::progress::{SessionProgress, SessionSnapshot};
use crate::error::SessionError;

//
// ─── PUBLIC TYPES ──────────────────────────────────────────────────────────────
//

/// Lifecycle of the controller: `NotStarted → InProgress → Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NotStarted,
    InProgress,
    Completed,
}

/// Identifies one displayed question of one session.
///
/// Async work started for a question carries its ticket and is only applied
/// while the ticket still matches the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionTicket {
    pub session_id: SessionId,
    pub index: usize,
    pub question_id: QuestionId,
}

/// Result of answering the current question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerFeedback {
    pub ticket: QuestionTicket,
    /// The answer that counts for this question (the first one given).
    pub selected: usize,
    pub correct_index: usize,
    pub is_correct: bool,
    /// False when this call re-presented an earlier answer without scoring.
    pub counted: bool,
    /// Stored explanation; only revealed in practice mode.
    pub explanation: Option<String>,
}

/// Final figures of a finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub session_id: SessionId,
    pub mode: SessionMode,
    pub score: u32,
    pub total: u32,
    pub passed: bool,
    pub time_taken_secs: u32,
    /// True when the countdown ran out before the last question.
    pub expired: bool,
    /// The record to persist; `None` for practice runs unless they are kept.
    pub result: Option<TestResult>,
}

/// What `advance` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    Next(QuestionTicket),
    Completed(SessionOutcome),
}

/// What `tick` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    Running { remaining_secs: u32 },
    Expired(SessionOutcome),
}

//
// ─── INTERNAL STATE ────────────────────────────────────────────────────────────
//

struct ActiveSession {
    id: SessionId,
    mode: SessionMode,
    questions: Vec<Question>,
    index: usize,
    score: u32,
    // First answer given at each position; later answers never score.
    answers: Vec<Option<usize>>,
    explanation_shown: bool,
    ai_explanation: Option<String>,
    duration_secs: Option<u32>,
    time_remaining_secs: Option<u32>,
    started_at: DateTime<Utc>,
}

impl ActiveSession {
    fn current(&self) -> &Question {
        &self.questions[self.index]
    }

    fn ticket(&self) -> QuestionTicket {
        QuestionTicket {
            session_id: self.id,
            index: self.index,
            question_id: self.current().id().clone(),
        }
    }

    fn answered_count(&self) -> usize {
        self.answers.iter().filter(|a| a.is_some()).count()
    }

    fn clear_transient(&mut self) {
        self.explanation_shown = false;
        self.ai_explanation = None;
    }
}

enum Phase {
    NotStarted,
    InProgress(ActiveSession),
    Completed(SessionOutcome),
}

//
// ─── CONTROLLER ────────────────────────────────────────────────────────────────
//

/// Owns the single practice or mock-exam session.
///
/// Every operation takes `&mut self`; callers sharing a controller between
/// the timer and user input serialize access through a mutex.
pub struct SessionController {
    clock: Clock,
    settings: ExamSettings,
    phase: Phase,
}

impl SessionController {
    #[must_use]
    pub fn new(settings: ExamSettings, clock: Clock) -> Self {
        Self {
            clock,
            settings,
            phase: Phase::NotStarted,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &ExamSettings {
        &self.settings
    }

    /// Start a session, discarding any session in progress without recording it.
    ///
    /// Mock tests count down from `exam_duration_secs`, or the configured
    /// duration when `None`. Practice sessions ignore the duration.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidSession` for an empty question list and
    /// `SessionError::InvalidDuration` for a zero-second mock test. The current
    /// state is left untouched on error.
    pub fn start(
        &mut self,
        mode: SessionMode,
        questions: Vec<Question>,
        exam_duration_secs: Option<u32>,
    ) -> Result<SessionId, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::InvalidSession);
        }
        let duration_secs = match mode {
            SessionMode::Practice => None,
            SessionMode::MockTest => {
                let secs = exam_duration_secs.unwrap_or(self.settings.exam_duration_secs());
                if secs == 0 {
                    return Err(SessionError::InvalidDuration);
                }
                Some(secs)
            }
        };

        if let Phase::InProgress(previous) = &self.phase {
            tracing::info!(session_id = %previous.id, "discarding unfinished session");
        }

        let id = SessionId::new_v4();
        let total = questions.len();
        self.phase = Phase::InProgress(ActiveSession {
            id,
            mode,
            questions,
            index: 0,
            score: 0,
            answers: vec![None; total],
            explanation_shown: false,
            ai_explanation: None,
            duration_secs,
            time_remaining_secs: duration_secs,
            started_at: self.clock.now(),
        });
        tracing::info!(session_id = %id, %mode, total, "session started");
        Ok(id)
    }

    /// Record an answer for the current question.
    ///
    /// Only the first answer per question scores. In practice mode a repeat
    /// call re-presents the feedback of that first answer.
    ///
    /// # Errors
    ///
    /// - `SessionError::NotInProgress` outside a running session.
    /// - `SessionError::InvalidOption` if `selected` is not an option index.
    /// - `SessionError::AlreadyAnswered` for a repeat answer in a mock test.
    pub fn answer(&mut self, selected: usize) -> Result<AnswerFeedback, SessionError> {
        let active = self.active_mut()?;
        let index = active.index;
        let len = active.current().options().len();
        if selected >= len {
            return Err(SessionError::InvalidOption { selected, len });
        }

        let recorded = active.answers[index];
        let (selected, counted) = match recorded {
            Some(_) if active.mode == SessionMode::MockTest => {
                return Err(SessionError::AlreadyAnswered { index });
            }
            Some(first) => (first, false),
            None => {
                active.answers[index] = Some(selected);
                if active.current().is_correct(selected) {
                    active.score += 1;
                }
                (selected, true)
            }
        };

        let reveal = active.mode == SessionMode::Practice;
        if reveal {
            active.explanation_shown = true;
        }

        let question = active.current();
        Ok(AnswerFeedback {
            ticket: active.ticket(),
            selected,
            correct_index: question.correct_answer_index(),
            is_correct: question.is_correct(selected),
            counted,
            explanation: reveal.then(|| question.explanation().to_owned()),
        })
    }

    /// Move to the next question, or finish the session on the last one.
    ///
    /// Skipped questions simply do not score.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotInProgress` outside a running session.
    pub fn advance(&mut self) -> Result<Advance, SessionError> {
        let active = self.active_mut()?;
        if active.index + 1 < active.questions.len() {
            active.index += 1;
            active.clear_transient();
            return Ok(Advance::Next(active.ticket()));
        }
        Ok(Advance::Completed(self.complete(false)?))
    }

    /// One second of mock-test countdown. Reaching zero finishes the session
    /// with whatever has been answered.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotInProgress` outside a running session and
    /// `SessionError::NotTimed` for practice sessions.
    pub fn tick(&mut self) -> Result<Tick, SessionError> {
        let active = self.active_mut()?;
        let Some(remaining) = active.time_remaining_secs.as_mut() else {
            return Err(SessionError::NotTimed);
        };
        *remaining = remaining.saturating_sub(1);
        if *remaining > 0 {
            return Ok(Tick::Running {
                remaining_secs: *remaining,
            });
        }
        tracing::info!(session_id = %active.id, index = active.index, "exam time expired");
        Ok(Tick::Expired(self.complete(true)?))
    }

    /// Drop the current session (or finished outcome) without recording anything.
    ///
    /// Returns true if a session in progress was discarded.
    pub fn abort(&mut self) -> bool {
        let previous = std::mem::replace(&mut self.phase, Phase::NotStarted);
        match previous {
            Phase::InProgress(active) => {
                tracing::info!(session_id = %active.id, "session aborted");
                true
            }
            Phase::NotStarted | Phase::Completed(_) => false,
        }
    }

    /// Attach generated explanation text if `ticket` is still the displayed question.
    ///
    /// Returns false (and drops the text) for stale tickets.
    pub fn attach_ai_explanation(&mut self, ticket: &QuestionTicket, text: String) -> bool {
        match &mut self.phase {
            Phase::InProgress(active) if active.ticket() == *ticket => {
                active.ai_explanation = Some(text);
                true
            }
            _ => false,
        }
    }

    // ─── Queries ───────────────────────────────────────────────────────────────

    #[must_use]
    pub fn state(&self) -> SessionState {
        match self.phase {
            Phase::NotStarted => SessionState::NotStarted,
            Phase::InProgress(_) => SessionState::InProgress,
            Phase::Completed(_) => SessionState::Completed,
        }
    }

    #[must_use]
    pub fn session_id(&self) -> Option<SessionId> {
        match &self.phase {
            Phase::InProgress(active) => Some(active.id),
            Phase::Completed(outcome) => Some(outcome.session_id),
            Phase::NotStarted => None,
        }
    }

    #[must_use]
    pub fn mode(&self) -> Option<SessionMode> {
        match &self.phase {
            Phase::InProgress(active) => Some(active.mode),
            Phase::Completed(outcome) => Some(outcome.mode),
            Phase::NotStarted => None,
        }
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.active().map(ActiveSession::current)
    }

    #[must_use]
    pub fn ticket(&self) -> Option<QuestionTicket> {
        self.active().map(ActiveSession::ticket)
    }

    #[must_use]
    pub fn is_current(&self, ticket: &QuestionTicket) -> bool {
        self.ticket().as_ref() == Some(ticket)
    }

    #[must_use]
    pub fn index(&self) -> Option<usize> {
        self.active().map(|a| a.index)
    }

    #[must_use]
    pub fn score(&self) -> Option<u32> {
        match &self.phase {
            Phase::InProgress(active) => Some(active.score),
            Phase::Completed(outcome) => Some(outcome.score),
            Phase::NotStarted => None,
        }
    }

    #[must_use]
    pub fn time_remaining_secs(&self) -> Option<u32> {
        self.active().and_then(|a| a.time_remaining_secs)
    }

    /// Answer recorded for the current question.
    #[must_use]
    pub fn selection(&self) -> Option<usize> {
        self.active().and_then(|a| a.answers[a.index])
    }

    #[must_use]
    pub fn outcome(&self) -> Option<&SessionOutcome> {
        match &self.phase {
            Phase::Completed(outcome) => Some(outcome),
            _ => None,
        }
    }

    #[must_use]
    pub fn progress(&self) -> Option<SessionProgress> {
        match &self.phase {
            Phase::InProgress(active) => {
                let answered = active.answered_count();
                Some(SessionProgress {
                    total: active.questions.len(),
                    answered,
                    remaining: active.questions.len() - active.index,
                    score: active.score,
                    is_complete: false,
                })
            }
            Phase::Completed(outcome) => {
                let total = usize::try_from(outcome.total).unwrap_or(usize::MAX);
                Some(SessionProgress {
                    total,
                    answered: total,
                    remaining: 0,
                    score: outcome.score,
                    is_complete: true,
                })
            }
            Phase::NotStarted => None,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let active = self.active();
        SessionSnapshot {
            state: self.state(),
            session_id: self.session_id(),
            mode: self.mode(),
            question: active.map(|a| a.current().clone()),
            index: active.map_or(0, |a| a.index),
            total: active.map_or(0, |a| a.questions.len()),
            score: self.score().unwrap_or(0),
            time_remaining_secs: self.time_remaining_secs(),
            selection: self.selection(),
            explanation: active
                .filter(|a| a.explanation_shown)
                .map(|a| a.current().explanation().to_owned()),
            ai_explanation: active.and_then(|a| a.ai_explanation.clone()),
        }
    }

    // ─── Internals ─────────────────────────────────────────────────────────────

    fn active(&self) -> Option<&ActiveSession> {
        match &self.phase {
            Phase::InProgress(active) => Some(active),
            _ => None,
        }
    }

    fn active_mut(&mut self) -> Result<&mut ActiveSession, SessionError> {
        match &mut self.phase {
            Phase::InProgress(active) => Ok(active),
            _ => Err(SessionError::NotInProgress),
        }
    }

    fn complete(&mut self, expired: bool) -> Result<SessionOutcome, SessionError> {
        let active = match std::mem::replace(&mut self.phase, Phase::NotStarted) {
            Phase::InProgress(active) => active,
            other => {
                self.phase = other;
                return Err(SessionError::NotInProgress);
            }
        };

        let total = u32::try_from(active.questions.len()).unwrap_or(u32::MAX);
        let passed = self.settings.is_pass(active.score, total);
        let time_taken_secs = match (active.duration_secs, active.time_remaining_secs) {
            (Some(duration), Some(remaining)) => duration.saturating_sub(remaining),
            _ => {
                let elapsed = (self.clock.now() - active.started_at).num_seconds();
                u32::try_from(elapsed.max(0)).unwrap_or(u32::MAX)
            }
        };

        let keep = active.mode == SessionMode::MockTest || self.settings.persist_practice();
        let result = if keep {
            match TestResult::new(
                self.clock.today(),
                active.score,
                total,
                passed,
                time_taken_secs,
            ) {
                Ok(result) => Some(result),
                Err(err) => {
                    tracing::error!(error = %err, "could not build test result");
                    None
                }
            }
        } else {
            None
        };

        let outcome = SessionOutcome {
            session_id: active.id,
            mode: active.mode,
            score: active.score,
            total,
            passed,
            time_taken_secs,
            expired,
            result,
        };
        tracing::info!(
            session_id = %outcome.session_id,
            score = outcome.score,
            total = outcome.total,
            passed = outcome.passed,
            "session completed"
        );
        self.phase = Phase::Completed(outcome.clone());
        Ok(outcome)
    }
}

impl fmt::Debug for SessionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("SessionController");
        s.field("state", &self.state());
        if let Some(active) = self.active() {
            s.field("session_id", &active.id)
                .field("mode", &active.mode)
                .field("questions_len", &active.questions.len())
                .field("index", &active.index)
                .field("score", &active.score)
                .field("time_remaining_secs", &active.time_remaining_secs);
        }
        s.finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
