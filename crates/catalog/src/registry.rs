//! Dataset descriptors and catalog loading.

use crate::text::KeywordSet;
use crate::trusted::{CategoryEntry, SourceCategory, TrustedSource};
use agriqa_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

const BUILTIN_CATALOG: &str = include_str!("../data/catalog.yml");

/// Public landing page for a data.gov.in resource.
const RESOURCE_PAGE_URL: &str = "https://data.gov.in/resource";

/// Metadata identifying one queryable data.gov.in dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetDescriptor {
    /// Resource id on api.data.gov.in
    pub id: String,

    pub title: String,

    /// Publishing ministry or department
    pub ministry: String,

    #[serde(default)]
    pub description: String,

    pub keywords: Keywords,
}

/// Bilingual keyword lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keywords {
    #[serde(default)]
    pub en: Vec<String>,

    #[serde(default)]
    pub hi: Vec<String>,
}

impl Keywords {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.en.iter().chain(self.hi.iter()).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.en.is_empty() && self.hi.is_empty()
    }
}

impl DatasetDescriptor {
    pub fn url(&self) -> String {
        format!("{}/{}", RESOURCE_PAGE_URL, self.id)
    }
}

/// Resource ids are UUID-shaped: ASCII hex digits and hyphens.
pub fn is_valid_resource_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_hexdigit() || c == '-')
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    datasets: Vec<DatasetDescriptor>,
    trusted_sources: Vec<CategoryEntry>,
}

/// The immutable registry of datasets and trusted sources.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub(crate) datasets: Vec<DatasetDescriptor>,
    pub(crate) dataset_keywords: Vec<KeywordSet>,
    pub(crate) categories: Vec<(SourceCategory, KeywordSet)>,
    pub(crate) sources: Vec<TrustedSource>,
    pub(crate) max_datasets: usize,
}

impl Catalog {
    /// Default cap on datasets returned by [`Catalog::select`].
    pub const DEFAULT_MAX_DATASETS: usize = 3;

    /// The catalog compiled into the binary.
    pub fn builtin() -> AppResult<Self> {
        Self::from_yaml_str(BUILTIN_CATALOG)
    }

    /// Load the catalog file at `path`, or the built-in one when `None`.
    pub fn load(path: Option<&Path>, max_datasets: usize) -> AppResult<Self> {
        let catalog = match path {
            Some(path) => {
                tracing::debug!("Loading catalog from: {:?}", path);
                let contents = std::fs::read_to_string(path).map_err(|e| {
                    AppError::Config(format!("Failed to read catalog {:?}: {}", path, e))
                })?;
                Self::from_yaml_str(&contents)?
            }
            None => Self::builtin()?,
        };

        let catalog = catalog.with_max_datasets(max_datasets);
        tracing::info!(
            datasets = catalog.datasets.len(),
            trusted_sources = catalog.sources.len(),
            "Catalog loaded"
        );
        Ok(catalog)
    }

    pub fn from_yaml_str(contents: &str) -> AppResult<Self> {
        let file: CatalogFile = serde_yaml::from_str(contents)
            .map_err(|e| AppError::Config(format!("Invalid catalog: {}", e)))?;
        Self::from_parts(file.datasets, file.trusted_sources)
    }

    fn from_parts(datasets: Vec<DatasetDescriptor>, entries: Vec<CategoryEntry>) -> AppResult<Self> {
        if datasets.is_empty() {
            return Err(AppError::Config(
                "Catalog must contain at least one dataset".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for dataset in &datasets {
            if !is_valid_resource_id(&dataset.id) {
                return Err(AppError::Config(format!(
                    "Invalid dataset id: '{}'",
                    dataset.id
                )));
            }
            if !seen.insert(dataset.id.as_str()) {
                return Err(AppError::Config(format!(
                    "Duplicate dataset id: {}",
                    dataset.id
                )));
            }
            if dataset.keywords.is_empty() {
                return Err(AppError::Config(format!(
                    "Dataset {} has no keywords",
                    dataset.id
                )));
            }
        }

        let dataset_keywords = datasets
            .iter()
            .map(|d| KeywordSet::new(d.keywords.iter()))
            .collect();

        let mut categories = Vec::with_capacity(entries.len());
        let mut sources = Vec::new();
        for entry in entries {
            if categories.iter().any(|(c, _)| *c == entry.category) {
                return Err(AppError::Config(format!(
                    "Trusted-source category listed twice: {}",
                    entry.category
                )));
            }
            categories.push((entry.category, KeywordSet::new(&entry.keywords)));
            sources.extend(entry.sources.into_iter().map(|s| s.into_source(entry.category)));
        }

        if !sources.iter().any(|s| s.category == SourceCategory::General) {
            return Err(AppError::Config(
                "Catalog must list at least one general trusted source".to_string(),
            ));
        }

        Ok(Self {
            datasets,
            dataset_keywords,
            categories,
            sources,
            max_datasets: Self::DEFAULT_MAX_DATASETS,
        })
    }

    /// Cap the number of datasets a matched question selects.
    pub fn with_max_datasets(mut self, max_datasets: usize) -> Self {
        self.max_datasets = max_datasets.max(1);
        self
    }

    pub fn datasets(&self) -> &[DatasetDescriptor] {
        &self.datasets
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SMALL: &str = r#"
datasets:
  - id: 0000-aaaa
    title: Mandi prices
    ministry: Agriculture
    keywords: { en: [price] }
trusted_sources:
  - category: general
    keywords: []
    sources:
      - { title: OGD, url: "https://data.gov.in" }
"#;

    #[test]
    fn test_builtin_catalog_loads() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.datasets().len(), 3);
        assert!(catalog.sources.len() >= 5);
        assert!(catalog.sources_in(SourceCategory::General).count() > 0);
    }

    #[test]
    fn test_dataset_url() {
        let catalog = Catalog::builtin().unwrap();
        let dataset = catalog
            .datasets()
            .iter()
            .find(|d| d.id == "696a1b36-a7d6-406a-9cd3-06d3e55de3e0")
            .unwrap();
        assert_eq!(
            dataset.url(),
            "https://data.gov.in/resource/696a1b36-a7d6-406a-9cd3-06d3e55de3e0"
        );
    }

    #[test]
    fn test_resource_id_validation() {
        assert!(is_valid_resource_id("9ef84268-d588-465a-a308-a864a43d0070"));
        assert!(!is_valid_resource_id(""));
        assert!(!is_valid_resource_id("../etc/passwd"));
        assert!(!is_valid_resource_id("abc?x=1"));
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        let yaml = SMALL.replace(
            "trusted_sources:",
            "  - id: 0000-aaaa\n    title: Again\n    ministry: X\n    keywords: { en: [x] }\ntrusted_sources:",
        );
        assert!(Catalog::from_yaml_str(&yaml).is_err());
    }

    #[test]
    fn test_rejects_missing_general_sources() {
        let yaml = SMALL.replace("category: general", "category: policy");
        assert!(Catalog::from_yaml_str(&yaml).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SMALL.as_bytes()).unwrap();

        let catalog = Catalog::load(Some(file.path()), 2).unwrap();
        assert_eq!(catalog.datasets().len(), 1);
        assert_eq!(catalog.max_datasets, 2);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Catalog::load(Some(Path::new("/nonexistent/catalog.yml")), 3);
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
