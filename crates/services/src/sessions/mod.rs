mod controller;
mod plan;
mod progress;
mod timer;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use controller::{
    Advance, AnswerFeedback, QuestionTicket, SessionController, SessionOutcome, SessionState,
    Tick,
};
pub use plan::QuestionSelector;
pub use progress::{SessionProgress, SessionSnapshot};
pub use timer::ExamTimer;
pub use workflow::{
    AdvanceResult, CompletionReport, ExamLoopService, SessionEvent, SharedController,
};
