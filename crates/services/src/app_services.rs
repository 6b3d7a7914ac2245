use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;

use quiz_core::model::QuestionBank;
use storage::repository::Storage;

use crate::Clock;
use crate::config::QuizConfig;
use crate::error::AppServicesError;
use crate::explanation::{ChatGateway, ExplanationService};
use crate::result_store::ResultStore;
use crate::sessions::{ExamLoopService, SessionEvent};

/// Assembles app-facing services from a `QuizConfig`.
#[derive(Clone)]
pub struct AppServices {
    config: QuizConfig,
    results: ResultStore,
    exam_loop: Arc<ExamLoopService>,
    explanations: ExplanationService,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// Returns the services and the receiver for exam timer events.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails or the
    /// configured question bank cannot be loaded.
    pub async fn new_sqlite(
        config: QuizConfig,
        clock: Clock,
    ) -> Result<(Self, UnboundedReceiver<SessionEvent>), AppServicesError> {
        let storage = Storage::sqlite(&config.database_url).await?;
        let bank = config.load_bank()?;
        Ok(Self::assemble(config, clock, storage, bank).await)
    }

    /// Build services over in-memory storage and the built-in bank.
    pub async fn in_memory(
        config: QuizConfig,
        clock: Clock,
    ) -> (Self, UnboundedReceiver<SessionEvent>) {
        Self::assemble(config, clock, Storage::in_memory(), QuestionBank::builtin()).await
    }

    async fn assemble(
        config: QuizConfig,
        clock: Clock,
        storage: Storage,
        bank: QuestionBank,
    ) -> (Self, UnboundedReceiver<SessionEvent>) {
        let results = ResultStore::new(Arc::clone(&storage.history));
        let loaded = results.load().await;
        tracing::info!(results = loaded.len(), questions = bank.len(), "services ready");

        let explanations =
            ExplanationService::new(Arc::new(ChatGateway::new(config.gateway.clone())));
        let (exam_loop, events) =
            ExamLoopService::new(config.exam.clone(), clock, bank, results.clone());

        let services = Self {
            config,
            results,
            exam_loop: Arc::new(exam_loop),
            explanations,
        };
        (services, events)
    }

    #[must_use]
    pub fn config(&self) -> &QuizConfig {
        &self.config
    }

    #[must_use]
    pub fn results(&self) -> ResultStore {
        self.results.clone()
    }

    #[must_use]
    pub fn exam_loop(&self) -> Arc<ExamLoopService> {
        Arc::clone(&self.exam_loop)
    }

    #[must_use]
    pub fn explanations(&self) -> ExplanationService {
        self.explanations.clone()
    }

    #[must_use]
    pub fn explanations_enabled(&self) -> bool {
        self.config.gateway.is_some()
    }
}
