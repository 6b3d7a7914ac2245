use thiserror::Error;

use crate::model::{BankError, ExamSettingsError, QuestionError, TestResultError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Bank(#[from] BankError),
    #[error(transparent)]
    TestResult(#[from] TestResultError),
    #[error(transparent)]
    ExamSettings(#[from] ExamSettingsError),
}
