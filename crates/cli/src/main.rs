//! AgriQA CLI
//!
//! Main entry point for the `agriqa` command-line tool: serve the HTTP API
//! or ask questions about Indian agriculture and climate data from a shell.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, DatasetsCommand, HistoryCommand, ServeCommand};
use agriqa_core::config::AppConfig;
use agriqa_core::logging::{self, LogFormat};
use std::path::PathBuf;

/// AgriQA - questions about Indian agriculture answered from data.gov.in
#[derive(Parser, Debug)]
#[command(name = "agriqa")]
#[command(about = "Agri-climate Q&A over data.gov.in", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "AGRIQA_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "AGRIQA_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// LLM provider (ollama, openai, gemini, mock)
    #[arg(short, long, global = true, env = "AGRIQA_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "AGRIQA_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API
    Serve(ServeCommand),

    /// Ask a single question
    Ask(AskCommand),

    /// List the dataset registry
    Datasets(DatasetsCommand),

    /// Show the transcript of a session
    History(HistoryCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Serve(_) => "serve",
            Commands::Ask(_) => "ask",
            Commands::Datasets(_) => "datasets",
            Commands::History(_) => "history",
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = AppConfig::load_with_file(cli.config.clone())?;

    // Apply CLI overrides
    let mut config = config.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );
    if cli.json_logs {
        config.json_logs = true;
    }
    config.validate()?;

    let format = if config.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    logging::init_logging(config.log_level.as_deref(), config.no_color, format)?;

    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    let _span = tracing::info_span!("command", name = cli.command.name()).entered();

    let result = match cli.command {
        Commands::Serve(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Datasets(cmd) => cmd.execute(&config).await,
        Commands::History(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::debug!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    Ok(result?)
}
