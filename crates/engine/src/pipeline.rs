//! End-to-end query handling.

use crate::composer::{AnswerComposer, ComposerSettings};
use crate::fetcher::{DataFetcher, RecordSource};
use crate::intent::IntentExtractor;
use crate::session::{SessionStore, Turn};
use crate::types::{AnswerMode, DatasetRecords, Query, SourceRef};
use agriqa_catalog::Catalog;
use agriqa_core::{AppConfig, AppError, AppResult, Language};
use agriqa_llm::LlmClient;
use agriqa_prompt::PromptLibrary;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{field, info, instrument, warn};

/// What the caller gets back for one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub session_id: String,
    pub answer: String,
    pub mode: AnswerMode,
    pub sources: Vec<SourceRef>,
    pub degraded: bool,
    pub timestamp: DateTime<Utc>,
}

/// Selector, fetcher, intent extractor, composer and store wired together.
pub struct QueryPipeline {
    catalog: Arc<Catalog>,
    fetcher: Arc<dyn RecordSource>,
    intents: IntentExtractor,
    composer: AnswerComposer,
    store: Arc<dyn SessionStore>,
}

impl QueryPipeline {
    pub fn new(
        catalog: Arc<Catalog>,
        fetcher: Arc<dyn RecordSource>,
        intents: IntentExtractor,
        composer: AnswerComposer,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            catalog,
            fetcher,
            intents,
            composer,
            store,
        }
    }

    /// Build every component from configuration.
    ///
    /// Loads the catalog and prompts (with workspace overrides) once; they
    /// are shared read-only afterwards.
    pub fn from_config(
        config: &AppConfig,
        llm: Arc<dyn LlmClient>,
        store: Arc<dyn SessionStore>,
    ) -> AppResult<Self> {
        let catalog = Arc::new(Catalog::load(
            config.catalog_path().as_deref(),
            config.catalog.max_datasets,
        )?);

        let prompts_dir = config.prompts_dir();
        let prompts = Arc::new(PromptLibrary::load(Some(prompts_dir.as_path()))?);

        let fetcher: Arc<dyn RecordSource> = Arc::new(DataFetcher::from_config(&config.data_api)?);

        let intents = IntentExtractor::new(Arc::clone(&llm), Arc::clone(&prompts), &config.model);
        let composer = AnswerComposer::new(
            llm,
            prompts,
            Arc::clone(&catalog),
            ComposerSettings::from_config(config),
        );

        Ok(Self::new(catalog, fetcher, intents, composer, store))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Answer a question and append the turn to its session.
    ///
    /// Only an empty question or a session-store failure is an error; data
    /// API and LLM problems degrade the answer instead.
    #[instrument(
        name = "query",
        skip_all,
        fields(session_id = field::Empty, language = %language)
    )]
    pub async fn handle_query(
        &self,
        question: &str,
        session_id: Option<String>,
        language: Language,
    ) -> AppResult<QueryResponse> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::InvalidInput("Question cannot be empty".to_string()));
        }

        let session_id = session_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        tracing::Span::current().record("session_id", session_id.as_str());

        let datasets = self.catalog.select(question);

        let (intent, fetched) = tokio::join!(
            self.intents.extract(question, language),
            join_all(datasets.iter().map(|d| self.fetcher.fetch(d)))
        );

        let live: Vec<DatasetRecords> = datasets
            .into_iter()
            .zip(fetched)
            .filter_map(|(dataset, outcome)| match outcome {
                Ok(result) => Some(DatasetRecords::new(dataset, result)),
                Err(e) => {
                    warn!(dataset_id = %dataset.id, error = %e, "Dataset fetch failed");
                    None
                }
            })
            .collect();

        let answer = self
            .composer
            .compose(question, language, &live, Some(&intent))
            .await
            .into_result();

        let timestamp = Utc::now();
        let query = Query {
            text: question.to_string(),
            language,
            session_id: session_id.clone(),
        };
        self.store
            .append(&session_id, &query, &answer, timestamp)
            .await?;

        info!(
            mode = %answer.mode,
            intent = %intent.tag,
            sources = answer.sources.len(),
            degraded = answer.degraded,
            "Query answered"
        );

        Ok(QueryResponse {
            session_id,
            answer: answer.text,
            mode: answer.mode,
            sources: answer.sources,
            degraded: answer.degraded,
            timestamp,
        })
    }

    pub async fn history(&self, session_id: &str) -> AppResult<Vec<Turn>> {
        self.store.history(session_id).await
    }
}
