//! Shared value types of the query engine.

use crate::fetcher::FetchResult;
use agriqa_catalog::{DatasetDescriptor, TrustedSource};
use agriqa_core::Language;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One row of an open-data resource.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// A question as asked by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
    pub language: Language,
    pub session_id: String,
}

/// Records fetched for one dataset.
#[derive(Debug, Clone)]
pub struct DatasetRecords {
    pub dataset: DatasetDescriptor,
    pub result: FetchResult,
}

impl DatasetRecords {
    pub fn new(dataset: DatasetDescriptor, result: FetchResult) -> Self {
        Self { dataset, result }
    }

    pub fn record_count(&self) -> usize {
        self.result.record_count
    }
}

/// How much of an answer rests on live data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerMode {
    Direct,
    Hybrid,
    Fallback,
}

impl AnswerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Hybrid => "hybrid",
            Self::Fallback => "fallback",
        }
    }
}

impl fmt::Display for AnswerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a citation points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Dataset,
    Trusted,
}

/// A citation attached to an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub kind: SourceKind,
    pub title: String,

    /// Ministry for datasets, category for trusted sources
    pub ministry_or_category: String,

    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Records the dataset contributed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records: Option<usize>,
}

impl SourceRef {
    pub fn dataset(dataset: &DatasetDescriptor, records: usize) -> Self {
        Self {
            kind: SourceKind::Dataset,
            title: dataset.title.clone(),
            ministry_or_category: dataset.ministry.clone(),
            url: dataset.url(),
            description: non_empty(&dataset.description),
            records: Some(records),
        }
    }

    pub fn trusted(source: &TrustedSource) -> Self {
        Self {
            kind: SourceKind::Trusted,
            title: source.title.clone(),
            ministry_or_category: source.category.to_string(),
            url: source.url.clone(),
            description: non_empty(&source.description),
            records: None,
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.trim().is_empty()).then(|| s.to_string())
}

/// The answer returned to the caller and stored in the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub text: String,
    pub mode: AnswerMode,
    pub sources: Vec<SourceRef>,

    /// Templated text produced because the LLM call failed
    #[serde(default)]
    pub degraded: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use agriqa_catalog::SourceCategory;

    #[test]
    fn test_dataset_source_ref() {
        let dataset = DatasetDescriptor {
            id: "abc-123".to_string(),
            title: "Rainfall Statistics".to_string(),
            ministry: "India Meteorological Department".to_string(),
            description: String::new(),
            keywords: Default::default(),
        };

        let source = SourceRef::dataset(&dataset, 12);
        assert_eq!(source.kind, SourceKind::Dataset);
        assert_eq!(source.url, "https://data.gov.in/resource/abc-123");
        assert_eq!(source.records, Some(12));
        assert!(source.description.is_none());
    }

    #[test]
    fn test_trusted_source_ref_serialization() {
        let trusted = TrustedSource {
            category: SourceCategory::Climate,
            title: "IMD".to_string(),
            url: "https://mausam.imd.gov.in".to_string(),
            description: "Rainfall reports".to_string(),
        };

        let json = serde_json::to_value(SourceRef::trusted(&trusted)).unwrap();
        assert_eq!(json["kind"], "trusted");
        assert_eq!(json["ministry_or_category"], "climate");
        assert!(json.get("records").is_none());
    }

    #[test]
    fn test_answer_mode_serialization() {
        assert_eq!(serde_json::to_string(&AnswerMode::Hybrid).unwrap(), "\"hybrid\"");
        assert_eq!(AnswerMode::Fallback.to_string(), "fallback");
    }
}
