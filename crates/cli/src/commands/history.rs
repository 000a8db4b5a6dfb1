//! History command handler.

use agriqa_core::config::StoreBackend;
use agriqa_core::{AppConfig, AppResult};
use agriqa_engine::open_store;
use clap::Args;
use serde_json::json;

/// Show the transcript of a session
#[derive(Args, Debug)]
pub struct HistoryCommand {
    /// Session id
    pub session_id: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl HistoryCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        if config.store.backend == StoreBackend::Memory {
            tracing::warn!("Memory store selected; history is not kept between runs");
        }

        let store = open_store(config)?;
        let turns = store.history(&self.session_id).await?;

        if self.json {
            let output = json!({ "session_id": self.session_id, "turns": turns });
            println!("{}", super::to_json(&output)?);
            return Ok(());
        }

        if turns.is_empty() {
            println!("No turns recorded for session {}", self.session_id);
            return Ok(());
        }

        for (i, turn) in turns.iter().enumerate() {
            println!(
                "[{}] {} ({}, {})",
                i + 1,
                turn.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
                turn.language,
                turn.answer.mode
            );
            println!("Q: {}", turn.question);
            println!("A: {}", turn.answer.text);
            println!();
        }
        Ok(())
    }
}
