use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use quiz_core::model::Category;

use super::gateway::{ChatGateway, ExplainRequest, ExplanationGateway};
use crate::error::GatewayError;
use crate::sessions::{QuestionTicket, SessionController};

pub const EXPLANATION_EMPTY_FALLBACK: &str =
    "I couldn't generate a detailed explanation right now. Please refer to the Highway Code.";
pub const EXPLANATION_UNAVAILABLE_FALLBACK: &str = "The AI expert is currently unavailable. Please check your internet connection or try again later.";
pub const TIP_EMPTY_FALLBACK: &str = "Always check your mirrors before signaling!";
pub const TIP_UNAVAILABLE_FALLBACK: &str =
    "Practice makes perfect! Keep going through the question bank.";

/// Never-failing front for an `ExplanationGateway`: every error becomes a
/// fixed fallback message.
#[derive(Clone)]
pub struct ExplanationService {
    gateway: Arc<dyn ExplanationGateway>,
}

impl ExplanationService {
    #[must_use]
    pub fn new(gateway: Arc<dyn ExplanationGateway>) -> Self {
        Self { gateway }
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self::new(Arc::new(ChatGateway::disabled()))
    }

    pub async fn explain_answer(&self, request: &ExplainRequest) -> String {
        match self.gateway.explain_answer(request).await {
            Ok(text) => text,
            Err(GatewayError::EmptyResponse) => EXPLANATION_EMPTY_FALLBACK.to_owned(),
            Err(err) => {
                tracing::warn!(error = %err, "explanation request failed");
                EXPLANATION_UNAVAILABLE_FALLBACK.to_owned()
            }
        }
    }

    pub async fn study_tip(&self, category: Category) -> String {
        match self.gateway.study_tip(category).await {
            Ok(text) => text,
            Err(GatewayError::EmptyResponse) => TIP_EMPTY_FALLBACK.to_owned(),
            Err(err) => {
                tracing::warn!(error = %err, %category, "study tip request failed");
                TIP_UNAVAILABLE_FALLBACK.to_owned()
            }
        }
    }

    /// Run the explanation request as its own task, tagged with `ticket`.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn_explanation(
        &self,
        ticket: QuestionTicket,
        request: ExplainRequest,
    ) -> PendingExplanation {
        let service = self.clone();
        let handle = tokio::spawn(async move { service.explain_answer(&request).await });
        PendingExplanation { ticket, handle }
    }
}

/// An in-flight explanation for one displayed question.
#[derive(Debug)]
pub struct PendingExplanation {
    ticket: QuestionTicket,
    handle: JoinHandle<String>,
}

impl PendingExplanation {
    #[must_use]
    pub fn ticket(&self) -> &QuestionTicket {
        &self.ticket
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Wait for the text and attach it to `controller` if the ticket is still current.
    ///
    /// Returns `None` when the request was aborted or its question is no longer shown.
    pub async fn resolve(self, controller: &Mutex<SessionController>) -> Option<String> {
        let text = match self.handle.await {
            Ok(text) => text,
            Err(err) if err.is_cancelled() => return None,
            Err(err) => {
                tracing::warn!(error = %err, "explanation task failed");
                EXPLANATION_UNAVAILABLE_FALLBACK.to_owned()
            }
        };

        let mut controller = controller.lock().await;
        if controller.attach_ai_explanation(&self.ticket, text.clone()) {
            Some(text)
        } else {
            tracing::debug!(ticket = ?self.ticket, "discarding stale explanation");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use quiz_core::model::{ExamSettings, QuestionBank, SessionMode};
    use quiz_core::time::fixed_clock;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    enum Reply {
        Text(&'static str),
        Empty,
        Down,
    }

    struct ScriptedGateway {
        reply: Reply,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl ScriptedGateway {
        fn new(reply: Reply) -> Self {
            Self {
                reply,
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }

        fn respond(&self) -> Result<String, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reply {
                Reply::Text(text) => Ok(text.to_owned()),
                Reply::Empty => Err(GatewayError::EmptyResponse),
                Reply::Down => Err(GatewayError::Disabled),
            }
        }
    }

    #[async_trait]
    impl ExplanationGateway for ScriptedGateway {
        async fn explain_answer(&self, _request: &ExplainRequest) -> Result<String, GatewayError> {
            tokio::time::sleep(self.delay).await;
            self.respond()
        }

        async fn study_tip(&self, _category: Category) -> Result<String, GatewayError> {
            self.respond()
        }
    }

    fn request() -> ExplainRequest {
        ExplainRequest::for_answer(&QuestionBank::builtin().all()[0], 0)
    }

    fn started_controller() -> Mutex<SessionController> {
        let mut controller = SessionController::new(ExamSettings::default(), fixed_clock());
        controller
            .start(
                SessionMode::Practice,
                QuestionBank::builtin().all().to_vec(),
                None,
            )
            .unwrap();
        controller.answer(0).unwrap();
        Mutex::new(controller)
    }

    #[tokio::test]
    async fn failures_become_fallback_text() {
        let empty = ExplanationService::new(Arc::new(ScriptedGateway::new(Reply::Empty)));
        assert_eq!(empty.explain_answer(&request()).await, EXPLANATION_EMPTY_FALLBACK);
        assert_eq!(empty.study_tip(Category::Attitude).await, TIP_EMPTY_FALLBACK);

        let down = ExplanationService::new(Arc::new(ScriptedGateway::new(Reply::Down)));
        assert_eq!(
            down.explain_answer(&request()).await,
            EXPLANATION_UNAVAILABLE_FALLBACK
        );
        assert_eq!(down.study_tip(Category::Attitude).await, TIP_UNAVAILABLE_FALLBACK);

        let ok = ExplanationService::new(Arc::new(ScriptedGateway::new(Reply::Text("Mirrors."))));
        assert_eq!(ok.study_tip(Category::Attitude).await, "Mirrors.");
    }

    #[tokio::test]
    async fn current_explanation_is_attached() {
        let controller = started_controller();
        let ticket = controller.lock().await.ticket().unwrap();
        let service = ExplanationService::new(Arc::new(ScriptedGateway::new(Reply::Text(
            "Look for the diagonal stripe.",
        ))));

        let pending = service.spawn_explanation(ticket, request());
        let text = pending.resolve(&controller).await;

        assert_eq!(text.as_deref(), Some("Look for the diagonal stripe."));
        assert_eq!(
            controller.lock().await.snapshot().ai_explanation.as_deref(),
            Some("Look for the diagonal stripe.")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stale_explanation_is_discarded_after_advance() {
        let controller = started_controller();
        let ticket = controller.lock().await.ticket().unwrap();
        let mut gateway = ScriptedGateway::new(Reply::Text("late"));
        gateway.delay = Duration::from_secs(3);
        let service = ExplanationService::new(Arc::new(gateway));

        let pending = service.spawn_explanation(ticket, request());
        controller.lock().await.advance().unwrap();

        assert_eq!(pending.resolve(&controller).await, None);
        assert_eq!(controller.lock().await.snapshot().ai_explanation, None);
        assert_eq!(controller.lock().await.score(), Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn aborted_explanation_resolves_to_none() {
        let controller = started_controller();
        let ticket = controller.lock().await.ticket().unwrap();
        let mut gateway = ScriptedGateway::new(Reply::Text("never"));
        gateway.delay = Duration::from_secs(30);
        let service = ExplanationService::new(Arc::new(gateway));

        let pending = service.spawn_explanation(ticket, request());
        pending.abort();
        assert_eq!(pending.resolve(&controller).await, None);
    }
}
