//! Shared error types for the services crate.

use std::path::PathBuf;

use thiserror::Error;

use quiz_core::model::{BankError, ExamSettingsError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by the session controller and the exam loop.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("cannot start a session without questions")]
    InvalidSession,
    #[error("exam duration must be > 0 seconds")]
    InvalidDuration,
    #[error("question {index} was already answered")]
    AlreadyAnswered { index: usize },
    #[error("option {selected} is out of range for {len} options")]
    InvalidOption { selected: usize, len: usize },
    #[error("current question has not been answered")]
    NotAnswered,
    #[error("no session in progress")]
    NotInProgress,
    #[error("practice sessions are not timed")]
    NotTimed,
}

/// Errors emitted by `ResultStore`.
///
/// Neither kind is fatal: reads degrade to an empty history and writes keep
/// the in-memory state.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PersistenceError {
    #[error("failed to read result history: {0}")]
    Read(#[source] StorageError),
    #[error("failed to write result history: {0}")]
    Write(#[source] StorageError),
}

/// Errors emitted by explanation gateways. Always recovered into fallback text.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GatewayError {
    #[error("explanation service is not configured")]
    Disabled,
    #[error("explanation service returned an empty response")]
    EmptyResponse,
    #[error("explanation request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted while reading configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("invalid value for {var}: {raw}")]
    InvalidValue { var: &'static str, raw: String },
    #[error("invalid AI base URL: {0}")]
    InvalidBaseUrl(String),
    #[error(transparent)]
    ExamSettings(#[from] ExamSettingsError),
    #[error("failed to read question bank {path}: {source}")]
    BankFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Bank(#[from] BankError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
