//! Trusted reference sources and relevance ranking.

use crate::registry::Catalog;
use crate::text::tokenize;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Topic a trusted source belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceCategory {
    Agriculture,
    Markets,
    Climate,
    Policy,
    General,
}

impl SourceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Agriculture => "agriculture",
            Self::Markets => "markets",
            Self::Climate => "climate",
            Self::Policy => "policy",
            Self::General => "general",
        }
    }
}

impl fmt::Display for SourceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A citation-worthy external reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustedSource {
    pub category: SourceCategory,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
}

/// One category block of the catalog file.
#[derive(Debug, Deserialize)]
pub(crate) struct CategoryEntry {
    pub category: SourceCategory,
    #[serde(default)]
    pub keywords: Vec<String>,
    pub sources: Vec<SourceEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SourceEntry {
    title: String,
    url: String,
    #[serde(default)]
    description: String,
}

impl SourceEntry {
    pub(crate) fn into_source(self, category: SourceCategory) -> TrustedSource {
        TrustedSource {
            category,
            title: self.title,
            url: self.url,
            description: self.description,
        }
    }
}

impl Catalog {
    /// Trusted sources ranked by how many of their category's keywords the
    /// question contains.
    ///
    /// Ties keep declaration order. Sources whose category scores zero are
    /// left out; when nothing scores, the general category is returned.
    pub fn get_relevant_sources(&self, question: &str, limit: usize) -> Vec<TrustedSource> {
        let tokens = tokenize(question);

        let mut scored: Vec<(usize, &TrustedSource)> = self
            .sources
            .iter()
            .map(|source| (self.category_score(source.category, &tokens), source))
            .filter(|(score, _)| *score > 0)
            .collect();

        if scored.is_empty() {
            tracing::debug!("No trusted-source category matched, using general sources");
            return self
                .sources_in(SourceCategory::General)
                .take(limit)
                .cloned()
                .collect();
        }

        // Stable sort keeps declaration order among equal scores
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored
            .into_iter()
            .take(limit)
            .map(|(_, source)| source.clone())
            .collect()
    }

    pub fn sources_in(&self, category: SourceCategory) -> impl Iterator<Item = &TrustedSource> {
        self.sources.iter().filter(move |s| s.category == category)
    }

    fn category_score(&self, category: SourceCategory, tokens: &[String]) -> usize {
        self.categories
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, keywords)| keywords.hits(tokens))
            .unwrap_or(0)
    }
}
