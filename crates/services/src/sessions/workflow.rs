use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use quiz_core::Clock;
use quiz_core::model::{Category, ExamSettings, QuestionBank, SessionId, SessionMode};

use super::controller::{Advance, AnswerFeedback, SessionController, SessionOutcome};
use super::plan::QuestionSelector;
use super::progress::SessionSnapshot;
use super::timer::ExamTimer;
use crate::error::SessionError;
use crate::explanation::{ExplainRequest, ExplanationService, PendingExplanation};
use crate::result_store::ResultStore;

/// Controller shared between user-driven calls and the exam timer.
pub type SharedController = Arc<Mutex<SessionController>>;

/// A finished session together with the outcome of persisting it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionReport {
    pub outcome: SessionOutcome,
    /// True once the result has been written to the history log.
    pub persisted: bool,
    /// Set when the write failed; the result is still in the in-memory log.
    pub persist_warning: Option<String>,
}

/// Clock-driven notifications for the front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Tick {
        session_id: SessionId,
        remaining_secs: u32,
    },
    Expired(CompletionReport),
}

/// Result of answering-then-advancing through the exam loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceResult {
    Next { index: usize },
    Completed(CompletionReport),
}

/// Orchestrates session start, answering, completion and persistence.
pub struct ExamLoopService {
    bank: QuestionBank,
    selector: QuestionSelector,
    controller: SharedController,
    store: ResultStore,
    timer: Mutex<Option<ExamTimer>>,
    events: UnboundedSender<SessionEvent>,
}

impl ExamLoopService {
    /// Build the loop and the receiver for timer events.
    #[must_use]
    pub fn new(
        settings: ExamSettings,
        clock: Clock,
        bank: QuestionBank,
        store: ResultStore,
    ) -> (Self, UnboundedReceiver<SessionEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let service = Self {
            bank,
            selector: QuestionSelector::new(),
            controller: Arc::new(Mutex::new(SessionController::new(settings, clock))),
            store,
            timer: Mutex::new(None),
            events,
        };
        (service, rx)
    }

    #[must_use]
    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    #[must_use]
    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    #[must_use]
    pub fn controller(&self) -> SharedController {
        Arc::clone(&self.controller)
    }

    /// Start a practice run, optionally limited to one category.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the session cannot start.
    pub async fn start_practice(
        &self,
        category: Option<Category>,
    ) -> Result<SessionId, SessionError> {
        let questions = self.selector.select_for_practice(&self.bank, category);
        self.stop_timer().await;
        self.controller
            .lock()
            .await
            .start(SessionMode::Practice, questions, None)
    }

    /// Start a timed mock exam over a random draw of the configured size.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the session cannot start.
    pub async fn start_exam(&self) -> Result<SessionId, SessionError> {
        self.stop_timer().await;
        let session_id = {
            let mut controller = self.controller.lock().await;
            let size = controller.settings().exam_size();
            let questions = self.selector.select_for_exam(&self.bank, size);
            controller.start(SessionMode::MockTest, questions, None)?
        };
        let timer = ExamTimer::spawn(
            session_id,
            Arc::clone(&self.controller),
            self.store.clone(),
            self.events.clone(),
        );
        *self.timer.lock().await = Some(timer);
        Ok(session_id)
    }

    /// # Errors
    ///
    /// Propagates `SessionError` from the controller.
    pub async fn answer(&self, selected: usize) -> Result<AnswerFeedback, SessionError> {
        self.controller.lock().await.answer(selected)
    }

    /// Move on, persisting the result when this finishes the session.
    ///
    /// # Errors
    ///
    /// Propagates `SessionError` from the controller.
    pub async fn advance(&self) -> Result<AdvanceResult, SessionError> {
        let step = self.controller.lock().await.advance()?;
        match step {
            Advance::Next(ticket) => Ok(AdvanceResult::Next {
                index: ticket.index,
            }),
            Advance::Completed(outcome) => {
                self.stop_timer().await;
                Ok(AdvanceResult::Completed(
                    record_outcome(&self.store, outcome).await,
                ))
            }
        }
    }

    /// Discard the current session without recording it.
    pub async fn abort(&self) -> bool {
        self.stop_timer().await;
        self.controller.lock().await.abort()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.controller.lock().await.snapshot()
    }

    /// Ask for a generated explanation of the answer given to the current question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotInProgress` without a running session and
    /// `SessionError::NotAnswered` before the question is answered.
    pub async fn request_explanation(
        &self,
        explanations: &ExplanationService,
    ) -> Result<PendingExplanation, SessionError> {
        let (ticket, request) = {
            let controller = self.controller.lock().await;
            let ticket = controller.ticket().ok_or(SessionError::NotInProgress)?;
            let question = controller
                .current_question()
                .ok_or(SessionError::NotInProgress)?;
            let selected = controller.selection().ok_or(SessionError::NotAnswered)?;
            let request = ExplainRequest::for_answer(question, selected);
            (ticket, request)
        };
        Ok(explanations.spawn_explanation(ticket, request))
    }

    /// Wait for `pending` and attach its text if its question is still shown.
    pub async fn apply_explanation(&self, pending: PendingExplanation) -> Option<String> {
        pending.resolve(&self.controller).await
    }

    /// Cancel a timer that is still counting down; wait for one whose
    /// session expired, since it is recording the result.
    async fn stop_timer(&self) {
        let Some(mut timer) = self.timer.lock().await.take() else {
            return;
        };
        let recording = {
            let controller = self.controller.lock().await;
            let expired = controller.session_id() == Some(timer.session_id())
                && controller.outcome().is_some_and(|outcome| outcome.expired);
            if !expired {
                timer.cancel();
            }
            expired
        };
        if recording {
            timer.wait().await;
        }
    }
}

/// Persist the outcome's result, if it has one, and report how that went.
pub(crate) async fn record_outcome(
    store: &ResultStore,
    outcome: SessionOutcome,
) -> CompletionReport {
    let Some(result) = outcome.result.clone() else {
        return CompletionReport {
            outcome,
            persisted: false,
            persist_warning: None,
        };
    };

    match store.append(result).await {
        Ok(()) => CompletionReport {
            outcome,
            persisted: true,
            persist_warning: None,
        },
        Err(err) => CompletionReport {
            outcome,
            persisted: false,
            persist_warning: Some(err.to_string()),
        },
    }
}
