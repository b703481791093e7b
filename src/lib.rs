pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use crate::config::Config;
use crate::database::question_store::{PgQuestionStore, QuestionStore};
use crate::error::{Error, Result};
use crate::services::{
    ai_service::{AIService, CompletionClient},
    batch_service::{BatchService, BatchSettings},
    grading_service::GradingService,
};
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn QuestionStore>,
    pub grading_service: GradingService,
    pub batch_service: BatchService,
}

impl AppState {
    pub fn new(pool: PgPool, config: &Config, shutdown: CancellationToken) -> Result<Self> {
        let http_client = AIService::http_client(config.completion_timeout)
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;
        let completion = AIService::new(
            config.openai_api_key.clone(),
            config.openai_model.clone(),
            config.openai_base_url.clone(),
            http_client,
        );
        let settings = BatchSettings {
            group_size: config.batch_size,
            group_delay: config.batch_delay,
        };

        Ok(Self::from_parts(
            Arc::new(PgQuestionStore::new(pool)),
            Arc::new(completion),
            settings,
            shutdown,
        ))
    }

    /// Wires the services around any store and completion client.
    pub fn from_parts(
        store: Arc<dyn QuestionStore>,
        completion: Arc<dyn CompletionClient>,
        settings: BatchSettings,
        shutdown: CancellationToken,
    ) -> Self {
        let grading_service = GradingService::new(store.clone(), completion);
        let batch_service =
            BatchService::new(store.clone(), grading_service.clone(), settings, shutdown);

        Self {
            store,
            grading_service,
            batch_service,
        }
    }
}
