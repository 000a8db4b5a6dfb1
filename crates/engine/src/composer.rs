//! Answer composition.
//!
//! The total number of live records decides the mode:
//! - at or above the hybrid threshold: **direct**, cite only the data
//! - between zero and the threshold: **hybrid**, live data plus clearly
//!   separated general knowledge
//! - zero (or every fetch failed): **fallback**, general knowledge behind a
//!   mandatory disclaimer
//!
//! If the LLM call fails the mode and sources stay as chosen and a templated
//! text is returned with `degraded` set.

use crate::intent::QueryIntent;
use crate::texts::{Texts, GENERAL_KNOWLEDGE_MARKER};
use crate::types::{AnswerMode, AnswerResult, DatasetRecords, Record, SourceRef};
use agriqa_catalog::Catalog;
use agriqa_core::config::MAX_SOURCES_CEILING;
use agriqa_core::{AppConfig, AppError, Language};
use agriqa_llm::{LlmClient, LlmRequest};
use agriqa_prompt::{ids, PromptLibrary};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, field, instrument, warn};

/// Records shown per dataset in the deterministic summary.
const SUMMARY_SAMPLE_RECORDS: usize = 3;

/// Fields shown per record in the deterministic summary.
const SUMMARY_SAMPLE_FIELDS: usize = 6;

/// Why the LLM could not phrase an answer.
#[derive(Debug, Error)]
pub enum CompositionError {
    #[error("failed to render prompt: {0}")]
    Prompt(String),

    #[error("LLM call failed: {0}")]
    Llm(String),

    #[error("LLM returned an empty answer")]
    EmptyAnswer,
}

impl From<CompositionError> for AppError {
    fn from(err: CompositionError) -> Self {
        AppError::Llm(err.to_string())
    }
}

/// A composed answer with its mode-specific payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Direct {
        text: String,
        sources: Vec<SourceRef>,
        record_count: usize,
        degraded: bool,
    },
    Hybrid {
        text: String,
        live_section: String,
        general_section: String,
        sources: Vec<SourceRef>,
        record_count: usize,
        degraded: bool,
    },
    Fallback {
        text: String,
        sources: Vec<SourceRef>,
        degraded: bool,
    },
}

impl Answer {
    pub fn mode(&self) -> AnswerMode {
        match self {
            Self::Direct { .. } => AnswerMode::Direct,
            Self::Hybrid { .. } => AnswerMode::Hybrid,
            Self::Fallback { .. } => AnswerMode::Fallback,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Direct { text, .. } | Self::Hybrid { text, .. } | Self::Fallback { text, .. } => {
                text
            }
        }
    }

    pub fn sources(&self) -> &[SourceRef] {
        match self {
            Self::Direct { sources, .. }
            | Self::Hybrid { sources, .. }
            | Self::Fallback { sources, .. } => sources,
        }
    }

    pub fn is_degraded(&self) -> bool {
        match self {
            Self::Direct { degraded, .. }
            | Self::Hybrid { degraded, .. }
            | Self::Fallback { degraded, .. } => *degraded,
        }
    }

    pub fn into_result(self) -> AnswerResult {
        let mode = self.mode();
        let degraded = self.is_degraded();
        let (text, sources) = match self {
            Self::Direct { text, sources, .. }
            | Self::Hybrid { text, sources, .. }
            | Self::Fallback { text, sources, .. } => (text, sources),
        };
        AnswerResult {
            text,
            mode,
            sources,
            degraded,
        }
    }
}

/// Tunables for [`AnswerComposer`].
#[derive(Debug, Clone)]
pub struct ComposerSettings {
    pub model: String,
    pub hybrid_threshold: usize,
    pub max_sources: usize,
    pub hybrid_trusted_sources: usize,
    pub max_prompt_records: usize,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl ComposerSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        let composer = &config.composer;
        Self {
            model: config.model.clone(),
            hybrid_threshold: composer.hybrid_threshold.max(1),
            max_sources: composer.max_sources.clamp(1, MAX_SOURCES_CEILING),
            hybrid_trusted_sources: composer.hybrid_trusted_sources,
            max_prompt_records: composer.max_prompt_records,
            temperature: composer.temperature,
            max_tokens: composer.max_tokens,
        }
    }
}

impl Default for ComposerSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Chooses the answer mode and asks the LLM to phrase the answer.
pub struct AnswerComposer {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLibrary>,
    catalog: Arc<Catalog>,
    settings: ComposerSettings,
}

impl AnswerComposer {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        prompts: Arc<PromptLibrary>,
        catalog: Arc<Catalog>,
        settings: ComposerSettings,
    ) -> Self {
        Self {
            llm,
            prompts,
            catalog,
            settings,
        }
    }

    pub fn mode_for(&self, record_count: usize) -> AnswerMode {
        if record_count >= self.settings.hybrid_threshold {
            AnswerMode::Direct
        } else if record_count > 0 {
            AnswerMode::Hybrid
        } else {
            AnswerMode::Fallback
        }
    }

    /// Compose an answer from whatever live data was fetched.
    ///
    /// `live` holds successful fetches only; an empty slice means every
    /// fetch failed.
    #[instrument(
        skip_all,
        fields(language = %language, mode = field::Empty, record_count = field::Empty)
    )]
    pub async fn compose(
        &self,
        question: &str,
        language: Language,
        live: &[DatasetRecords],
        intent: Option<&QueryIntent>,
    ) -> Answer {
        let live: Vec<&DatasetRecords> = live.iter().filter(|d| d.record_count() > 0).collect();
        let record_count: usize = live.iter().map(|d| d.record_count()).sum();
        let mode = self.mode_for(record_count);

        let span = tracing::Span::current();
        span.record("mode", mode.as_str());
        span.record("record_count", record_count);

        let texts = Texts::for_language(language);
        let mut variables = HashMap::new();
        variables.insert("question".to_string(), question.to_string());
        variables.insert(
            "language_name".to_string(),
            language.instruction_name().to_string(),
        );
        variables.insert(
            "focus".to_string(),
            intent.map(QueryIntent::focus_line).unwrap_or_default(),
        );

        let answer = match mode {
            AnswerMode::Direct => {
                variables.insert("records".to_string(), self.render_records(&live));
                variables.insert("record_count".to_string(), record_count.to_string());

                let sources = self.dataset_sources(&live);
                match self.generate(ids::ANSWER_DIRECT, variables, language).await {
                    Ok(text) => Answer::Direct {
                        text,
                        sources,
                        record_count,
                        degraded: false,
                    },
                    Err(e) => {
                        warn!(error = %e, "Direct answer unavailable, using record summary");
                        Answer::Direct {
                            text: format!(
                                "{}\n\n{}",
                                texts.explanation_unavailable,
                                summarize_records(&live, texts)
                            ),
                            sources,
                            record_count,
                            degraded: true,
                        }
                    }
                }
            }
            AnswerMode::Hybrid => {
                variables.insert("records".to_string(), self.render_records(&live));
                variables.insert("record_count".to_string(), record_count.to_string());
                variables.insert("marker".to_string(), GENERAL_KNOWLEDGE_MARKER.to_string());

                let mut sources = self.dataset_sources(&live);
                sources.extend(
                    self.catalog
                        .get_relevant_sources(question, self.settings.hybrid_trusted_sources)
                        .iter()
                        .map(SourceRef::trusted),
                );
                sources.truncate(self.settings.max_sources);

                let (live_section, general_section, degraded) =
                    match self.generate(ids::ANSWER_HYBRID, variables, language).await {
                        Ok(reply) => {
                            let (live_part, general_part) = split_hybrid(&reply);
                            let live_section = live_part.unwrap_or_else(|| {
                                debug!("Hybrid reply had no live-data section");
                                summarize_records(&live, texts)
                            });
                            (live_section, general_part.unwrap_or_default(), false)
                        }
                        Err(e) => {
                            warn!(error = %e, "Hybrid answer unavailable, using record summary");
                            (
                                summarize_records(&live, texts),
                                texts.explanation_unavailable.to_string(),
                                true,
                            )
                        }
                    };

                let mut text = format!(
                    "{}\n\n{}\n{}",
                    texts.hybrid_notice, texts.live_data_heading, live_section
                );
                if !general_section.is_empty() {
                    text.push_str(&format!("\n\n{}\n{}", texts.general_heading, general_section));
                }

                Answer::Hybrid {
                    text,
                    live_section,
                    general_section,
                    sources,
                    record_count,
                    degraded,
                }
            }
            AnswerMode::Fallback => {
                let sources: Vec<SourceRef> = self
                    .catalog
                    .get_relevant_sources(question, self.settings.max_sources)
                    .iter()
                    .map(SourceRef::trusted)
                    .collect();

                let (body, degraded) =
                    match self.generate(ids::ANSWER_FALLBACK, variables, language).await {
                        Ok(reply) => (reply, false),
                        Err(e) => {
                            warn!(error = %e, "Fallback answer unavailable");
                            (texts.service_unavailable.to_string(), true)
                        }
                    };

                Answer::Fallback {
                    text: format!("{}\n\n{}", texts.fallback_disclaimer, body),
                    sources,
                    degraded,
                }
            }
        };

        debug!(
            sources = answer.sources().len(),
            degraded = answer.is_degraded(),
            "Answer composed"
        );
        answer
    }

    async fn generate(
        &self,
        prompt_id: &str,
        variables: HashMap<String, String>,
        language: Language,
    ) -> Result<String, CompositionError> {
        let built = self
            .prompts
            .render(prompt_id, variables)
            .map_err(|e| CompositionError::Prompt(e.to_string()))?;

        let mut request = LlmRequest::new(built.user, &self.settings.model)
            .with_temperature(self.settings.temperature)
            .with_language(language);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }
        if let Some(max_tokens) = self.settings.max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        let response = self
            .llm
            .complete(&request)
            .await
            .map_err(|e| CompositionError::Llm(e.to_string()))?;

        let text = response.content.trim();
        if text.is_empty() {
            return Err(CompositionError::EmptyAnswer);
        }
        Ok(text.to_string())
    }

    fn dataset_sources(&self, live: &[&DatasetRecords]) -> Vec<SourceRef> {
        live.iter()
            .take(self.settings.max_sources)
            .map(|d| SourceRef::dataset(&d.dataset, d.record_count()))
            .collect()
    }

    /// Records as JSON lines, grouped by dataset, capped per dataset.
    fn render_records(&self, live: &[&DatasetRecords]) -> String {
        let cap = self.settings.max_prompt_records;
        let mut out = String::new();

        for data in live {
            out.push_str(&format!(
                "### {} ({}), {} records\n",
                data.dataset.title,
                data.dataset.ministry,
                data.record_count()
            ));
            for record in data.result.records.iter().take(cap) {
                match serde_json::to_string(record) {
                    Ok(line) => {
                        out.push_str(&line);
                        out.push('\n');
                    }
                    Err(e) => warn!(error = %e, "Skipping unserializable record"),
                }
            }
            if data.result.records.len() > cap {
                out.push_str(&format!(
                    "... {} more records omitted\n",
                    data.result.records.len() - cap
                ));
            }
            out.push('\n');
        }

        out.trim_end().to_string()
    }
}

/// Split a hybrid reply at the section marker into (live, general).
///
/// The marker is matched anywhere and case-insensitively, and never survives
/// into either part. Empty parts are `None`; without a marker the whole reply
/// is the general part.
fn split_hybrid(reply: &str) -> (Option<String>, Option<String>) {
    let non_empty = |s: String| (!s.is_empty()).then_some(s);

    match find_marker(reply) {
        Some((start, end)) => {
            let live = reply[..start].trim_end().trim_end_matches('*').trim();
            let general = reply[end..].trim_start().trim_start_matches('*').trim();
            (non_empty(live.to_string()), non_empty(strip_markers(general)))
        }
        None => (None, non_empty(reply.trim().to_string())),
    }
}

/// Byte range of the first marker occurrence, ignoring ASCII case.
fn find_marker(text: &str) -> Option<(usize, usize)> {
    let len = GENERAL_KNOWLEDGE_MARKER.len();
    text.char_indices()
        .map(|(i, _)| i)
        .find(|&i| {
            text.get(i..i + len)
                .is_some_and(|s| s.eq_ignore_ascii_case(GENERAL_KNOWLEDGE_MARKER))
        })
        .map(|i| (i, i + len))
}

fn strip_markers(text: &str) -> String {
    let mut out = text.to_string();
    while let Some((start, end)) = find_marker(&out) {
        out.replace_range(start..end, "");
    }
    out.trim().to_string()
}

/// Deterministic, LLM-free description of the fetched records.
fn summarize_records(live: &[&DatasetRecords], texts: &Texts) -> String {
    let mut lines = Vec::new();

    for data in live {
        lines.push(format!(
            "- {} ({}): {} {}",
            data.dataset.title,
            data.dataset.ministry,
            data.record_count(),
            texts.records_label
        ));
        for record in data.result.records.iter().take(SUMMARY_SAMPLE_RECORDS) {
            lines.push(format!("  {}: {}", texts.sample_label, describe_record(record)));
        }
    }

    lines.join("\n")
}

fn describe_record(record: &Record) -> String {
    record
        .iter()
        .take(SUMMARY_SAMPLE_FIELDS)
        .map(|(key, value)| match value {
            serde_json::Value::String(s) => format!("{}: {}", key, s),
            other => format!("{}: {}", key, other),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
