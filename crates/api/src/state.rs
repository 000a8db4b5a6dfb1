//! State shared by every request handler.

use agriqa_core::config::DATA_GOV_SAMPLE_KEY;
use agriqa_core::AppConfig;
use agriqa_engine::QueryPipeline;
use std::sync::Arc;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<QueryPipeline>,
    /// Name of the active LLM provider, reported by `/health`
    pub llm_provider: String,
    /// Whether a data.gov.in key was configured (the sample key otherwise)
    pub data_api_key_configured: bool,
    pub cors_origins: Arc<Vec<String>>,
}

impl AppState {
    pub fn new(pipeline: Arc<QueryPipeline>, llm_provider: impl Into<String>) -> Self {
        Self {
            pipeline,
            llm_provider: llm_provider.into(),
            data_api_key_configured: false,
            cors_origins: Arc::new(vec!["*".to_string()]),
        }
    }

    pub fn from_config(config: &AppConfig, pipeline: Arc<QueryPipeline>, llm_provider: &str) -> Self {
        Self {
            pipeline,
            llm_provider: llm_provider.to_string(),
            data_api_key_configured: matches!(
                config.data_api.api_key.as_deref(),
                Some(key) if key != DATA_GOV_SAMPLE_KEY
            ),
            cors_origins: Arc::new(config.server.cors_origins.clone()),
        }
    }

    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Arc::new(origins);
        self
    }
}
