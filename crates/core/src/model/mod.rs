mod bank;
mod category;
mod ids;
mod question;
mod result;
mod settings;

pub use bank::{BankError, QuestionBank};
pub use category::{Category, UnknownCategory};
pub use ids::{QuestionId, SessionId};
pub use question::{Question, QuestionError, QuestionRecord};
pub use result::{HistoryStats, TestResult, TestResultError};
pub use settings::{ExamSettings, ExamSettingsError, SessionMode};
