//! Ask command handler.
//!
//! Runs one question through the same pipeline the HTTP API uses.

use agriqa_core::{AppConfig, AppError, AppResult, Language};
use clap::Args;

/// Ask a single question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Answer language (en, hi)
    #[arg(short, long, default_value = "en")]
    pub language: String,

    /// Continue an existing session
    #[arg(short, long)]
    pub session: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let language = Language::parse(&self.language).ok_or_else(|| {
            AppError::InvalidInput(format!("Unsupported language: {}", self.language))
        })?;

        let (pipeline, _) = super::build_pipeline(config)?;
        let response = pipeline
            .handle_query(&self.question, self.session.clone(), language)
            .await?;

        if self.json {
            println!("{}", super::to_json(&response)?);
            return Ok(());
        }

        println!("{}", response.answer);
        println!();
        if response.sources.is_empty() {
            println!("Sources: (none)");
        } else {
            println!("Sources:");
            println!("{}", super::render_sources(&response.sources));
        }
        println!();
        println!("Session: {} (mode: {})", response.session_id, response.mode);
        if response.degraded {
            eprintln!("Note: the answer service was degraded for this question");
        }

        Ok(())
    }
}
