//! Command handlers for the AgriQA CLI.

pub mod ask;
pub mod datasets;
pub mod history;
pub mod serve;

pub use ask::AskCommand;
pub use datasets::DatasetsCommand;
pub use history::HistoryCommand;
pub use serve::ServeCommand;

use agriqa_core::{AppConfig, AppError, AppResult};
use agriqa_engine::{open_store, QueryPipeline, SourceRef};
use agriqa_llm::{create_client, ClientOptions};
use std::sync::Arc;

/// Build the LLM client, session store and query pipeline.
///
/// Returns the pipeline with the name of the active LLM provider.
fn build_pipeline(config: &AppConfig) -> AppResult<(Arc<QueryPipeline>, String)> {
    let llm = create_client(&ClientOptions::from_config(config)).map_err(AppError::Llm)?;
    let provider = llm.provider_name().to_string();
    let store = open_store(config)?;
    tracing::debug!(provider = %provider, store = store.backend_name(), "Pipeline components ready");

    let pipeline = QueryPipeline::from_config(config, llm, store)?;
    Ok((Arc::new(pipeline), provider))
}

/// One line per source: title, origin and URL.
fn render_sources(sources: &[SourceRef]) -> String {
    sources
        .iter()
        .map(|s| match s.records {
            Some(n) => format!("- {} ({}, {} records) {}", s.title, s.ministry_or_category, n, s.url),
            None => format!("- {} ({}) {}", s.title, s.ministry_or_category, s.url),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn to_json<T: serde::Serialize>(value: &T) -> AppResult<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agriqa_engine::SourceKind;

    #[test]
    fn test_render_sources() {
        let sources = vec![
            SourceRef {
                kind: SourceKind::Dataset,
                title: "Daily mandi prices".to_string(),
                ministry_or_category: "Ministry of Agriculture".to_string(),
                url: "https://data.gov.in/resource/abc".to_string(),
                description: None,
                records: Some(12),
            },
            SourceRef {
                kind: SourceKind::Trusted,
                title: "Agmarknet".to_string(),
                ministry_or_category: "markets".to_string(),
                url: "https://agmarknet.gov.in".to_string(),
                description: Some("Market prices".to_string()),
                records: None,
            },
        ];

        let rendered = render_sources(&sources);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "- Daily mandi prices (Ministry of Agriculture, 12 records) https://data.gov.in/resource/abc"
        );
        assert_eq!(lines[1], "- Agmarknet (markets) https://agmarknet.gov.in");
    }
}
