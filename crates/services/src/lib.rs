#![forbid(unsafe_code)]

pub mod app_services;
pub mod config;
pub mod error;
pub mod explanation;
pub mod result_store;
pub mod sessions;

pub use quiz_core::Clock;
pub use sessions as session;

pub use app_services::AppServices;
pub use config::QuizConfig;
pub use error::{AppServicesError, ConfigError, GatewayError, PersistenceError, SessionError};
pub use explanation::{
    ChatGateway, ExplainRequest, ExplanationGateway, ExplanationService, GatewayConfig,
    PendingExplanation,
};
pub use result_store::ResultStore;
pub use sessions::{
    AdvanceResult, AnswerFeedback, CompletionReport, ExamLoopService, QuestionSelector,
    QuestionTicket, SessionController, SessionEvent, SessionOutcome, SessionProgress,
    SessionSnapshot, SessionState, SharedController, Tick,
};
