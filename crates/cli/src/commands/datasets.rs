//! Datasets command handler.

use agriqa_catalog::Catalog;
use agriqa_core::{AppConfig, AppResult};
use clap::Args;
use serde_json::json;

/// List the dataset registry
#[derive(Args, Debug)]
pub struct DatasetsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl DatasetsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let catalog = Catalog::load(config.catalog_path().as_deref(), config.catalog.max_datasets)?;
        let datasets = catalog.datasets();

        if self.json {
            let output = json!({
                "datasets": datasets
                    .iter()
                    .map(|d| json!({
                        "id": d.id,
                        "title": d.title,
                        "ministry": d.ministry,
                        "description": d.description,
                        "url": d.url(),
                    }))
                    .collect::<Vec<_>>(),
                "total": datasets.len(),
            });
            println!("{}", super::to_json(&output)?);
            return Ok(());
        }

        for d in datasets {
            println!("{}", d.title);
            println!("  id:       {}", d.id);
            println!("  ministry: {}", d.ministry);
            println!("  url:      {}", d.url());
        }
        println!("{} datasets", datasets.len());
        Ok(())
    }
}
