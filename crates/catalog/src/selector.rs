//! Keyword-based dataset selection.

use crate::registry::{Catalog, DatasetDescriptor};
use crate::text::tokenize;

impl Catalog {
    /// Datasets relevant to a question, most keyword hits first.
    ///
    /// Ties keep registry order and the result is capped at the catalog's
    /// `max_datasets`. A question that matches nothing selects the whole
    /// registry, so the caller always has something to fetch.
    pub fn select(&self, question: &str) -> Vec<DatasetDescriptor> {
        let tokens = tokenize(question);

        let mut hits: Vec<(usize, &DatasetDescriptor)> = self
            .datasets
            .iter()
            .zip(&self.dataset_keywords)
            .map(|(dataset, keywords)| (keywords.hits(&tokens), dataset))
            .filter(|(count, _)| *count > 0)
            .collect();

        if hits.is_empty() {
            tracing::debug!("No dataset keywords matched, selecting full registry");
            return self.datasets.clone();
        }

        hits.sort_by(|a, b| b.0.cmp(&a.0));
        let selected: Vec<DatasetDescriptor> = hits
            .into_iter()
            .take(self.max_datasets)
            .map(|(_, dataset)| dataset.clone())
            .collect();

        tracing::debug!(
            selected = ?selected.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(),
            "Datasets selected"
        );
        selected
    }
}
