//! Serve command handler.

use agriqa_api::AppState;
use agriqa_core::{AppConfig, AppResult};
use clap::Args;

/// Run the HTTP API
#[derive(Args, Debug)]
pub struct ServeCommand {
    /// Address to bind (overrides server.bind)
    #[arg(short, long, env = "AGRIQA_BIND")]
    pub bind: Option<String>,
}

impl ServeCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let (pipeline, provider) = super::build_pipeline(config)?;
        let state = AppState::from_config(config, pipeline, &provider);

        let bind = self.bind.as_deref().unwrap_or(&config.server.bind);
        tracing::info!(
            provider = %provider,
            model = %config.model,
            store = ?config.store.backend,
            "Starting AgriQA server"
        );

        agriqa_api::serve(bind, state).await
    }
}
