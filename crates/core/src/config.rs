//! Configuration management for AgriQA.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Built-in defaults
//! - Config files (.agriqa/config.yaml)
//! - Environment variables
//! - Command-line flags
//!
//! The configuration is workspace-centric, with local state (session database,
//! prompt overrides) stored in `.agriqa/`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::logging::LogFormat;

/// Public sample key published by data.gov.in for trying the API.
pub const DATA_GOV_SAMPLE_KEY: &str = "579b464db66ec23bdd000001cdd3946e44ce4aad7209ff7b23ac571b";

/// Default open-data API resource endpoint.
pub const DATA_GOV_API_URL: &str = "https://api.data.gov.in/resource";

/// Hard ceiling on citations attached to one answer.
pub const MAX_SOURCES_CEILING: usize = 5;

/// Providers the LLM factory knows how to build.
const KNOWN_PROVIDERS: [&str; 4] = ["ollama", "openai", "gemini", "mock"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .agriqa/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Active LLM provider ("ollama", "openai", "gemini", "mock")
    pub provider: String,

    /// Default model identifier
    pub model: String,

    /// API key for the LLM provider
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Emit logs as JSON objects
    pub json_logs: bool,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// LLM provider configurations
    pub llm: Option<LlmConfig>,

    /// Open-data API access
    pub data_api: DataApiConfig,

    /// Dataset catalog settings
    pub catalog: CatalogConfig,

    /// Answer composition settings
    pub composer: ComposerConfig,

    /// HTTP server settings
    pub server: ServerConfig,

    /// Session transcript storage
    pub store: StoreConfig,
}

/// LLM configuration from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    /// Provider settings keyed by provider name
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

/// Provider-specific configuration.
///
/// The provider kind comes from the key it is stored under in
/// `llm.providers`, so one shape covers every provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Model identifier
    pub model: String,

    /// Custom endpoint URL
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Environment variable holding the API key
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Request timeout in seconds
    #[serde(default)]
    pub timeout: Option<u64>,
}

/// Open-data API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DataApiConfig {
    /// Resource endpoint; the dataset id is appended as a path segment
    pub base_url: String,

    /// API key sent as the `api-key` query parameter
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Maximum records requested per dataset
    pub limit: u32,

    /// Attempts per fetch, including the first
    pub max_attempts: u32,

    /// Backoff before retry n is `base × 2^(n-1)`
    pub backoff_base_ms: u64,

    /// Per-attempt timeout in seconds
    pub timeout_secs: u64,
}

impl Default for DataApiConfig {
    fn default() -> Self {
        Self {
            base_url: DATA_GOV_API_URL.to_string(),
            api_key: Some(DATA_GOV_SAMPLE_KEY.to_string()),
            limit: 50,
            max_attempts: 3,
            backoff_base_ms: 1000,
            timeout_secs: 30,
        }
    }
}

/// Dataset catalog settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CatalogConfig {
    /// Optional YAML file replacing the built-in catalog
    pub path: Option<PathBuf>,

    /// Maximum datasets fetched for one question
    pub max_datasets: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_datasets: 3,
        }
    }
}

/// Answer composition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComposerConfig {
    /// Record count at or above which answers use live data only
    pub hybrid_threshold: usize,

    /// Citations attached to one answer
    pub max_sources: usize,

    /// Trusted sources added next to datasets in hybrid answers
    pub hybrid_trusted_sources: usize,

    /// Records per dataset copied into a prompt
    pub max_prompt_records: usize,

    /// Sampling temperature for answer generation
    pub temperature: f32,

    /// Optional completion length cap
    pub max_tokens: Option<u32>,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            hybrid_threshold: 5,
            max_sources: MAX_SOURCES_CEILING,
            hybrid_trusted_sources: 4,
            max_prompt_records: 50,
            temperature: 0.3,
            max_tokens: None,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    /// Socket address to bind
    pub bind: String,

    /// Allowed CORS origins ("*" allows any)
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8001".to_string(),
            cors_origins: vec!["*".to_string()],
        }
    }
}

/// Session store backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-lifetime transcripts
    Memory,

    /// Transcripts persisted in a SQLite file
    #[default]
    Sqlite,
}

/// Session store settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreConfig {
    pub backend: StoreBackend,

    /// SQLite file; defaults to `.agriqa/sessions.db`
    pub path: Option<PathBuf>,
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    llm: Option<LlmConfig>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    data_api: Option<DataApiConfig>,
    catalog: Option<CatalogConfig>,
    composer: Option<ComposerConfig>,
    server: Option<ServerConfig>,
    store: Option<StoreConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    format: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "ollama".to_string(), // Local-first default
            model: "llama3.2".to_string(),
            api_key: None,
            log_level: None,
            json_logs: false,
            verbose: false,
            no_color: false,
            llm: None,
            data_api: DataApiConfig::default(),
            catalog: CatalogConfig::default(),
            composer: ComposerConfig::default(),
            server: ServerConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and defaults.
    ///
    /// Environment variables:
    /// - `AGRIQA_WORKSPACE`: Override workspace path
    /// - `AGRIQA_CONFIG`: Path to config file
    /// - `AGRIQA_PROVIDER`: LLM provider
    /// - `AGRIQA_MODEL`: Model identifier
    /// - `AGRIQA_API_KEY`: LLM API key
    /// - `AGRIQA_BIND`: HTTP bind address
    /// - `AGRIQA_HYBRID_THRESHOLD`: Record count separating hybrid from direct answers
    /// - `DATA_GOV_API_KEY` / `DATA_GOV_API_URL`: Open-data API access
    /// - `CORS_ORIGINS`: Comma-separated allowed origins
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use agriqa_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_with_file(None)
    }

    /// Like [`AppConfig::load`], but `config_file` (when given) takes the
    /// place of `AGRIQA_CONFIG`.
    pub fn load_with_file(config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("AGRIQA_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        config.config_file = config_file.or_else(|| std::env::var("AGRIQA_CONFIG").ok().map(PathBuf::from));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.agriqa_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        config.apply_env()?;

        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        self.merge_yaml_str(&contents)
            .map_err(|e| AppError::Config(format!("Failed to parse config file {:?}: {}", path, e)))
    }

    /// Merge YAML configuration text into this config.
    pub fn merge_yaml_str(&self, contents: &str) -> AppResult<Self> {
        let config_file: ConfigFile = serde_yaml::from_str(contents)?;
        let mut result = self.clone();

        if let Some(ws) = config_file.workspace {
            if let Some(path) = ws.path {
                result.workspace = PathBuf::from(path);
            }
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(format) = logging.format {
                result.json_logs = LogFormat::parse(&format) == LogFormat::Json;
            }
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();

            if let Some(provider_config) = llm.providers.get(&llm.active_provider) {
                result.model = provider_config.model.clone();
            }

            result.llm = Some(llm);
        }

        if let Some(data_api) = config_file.data_api {
            result.data_api = data_api;
        }
        if let Some(catalog) = config_file.catalog {
            result.catalog = catalog;
        }
        if let Some(composer) = config_file.composer {
            result.composer = composer;
        }
        if let Some(server) = config_file.server {
            result.server = server;
        }
        if let Some(store) = config_file.store {
            result.store = store;
        }

        Ok(result)
    }

    /// Apply environment variable overrides.
    fn apply_env(&mut self) -> AppResult<()> {
        if let Ok(provider) = std::env::var("AGRIQA_PROVIDER") {
            self.provider = provider;
        }

        if let Ok(model) = std::env::var("AGRIQA_MODEL") {
            self.model = model;
        }

        if let Ok(key) = std::env::var("AGRIQA_API_KEY") {
            self.api_key = Some(key);
        }

        if let Ok(key) = std::env::var("DATA_GOV_API_KEY") {
            self.data_api.api_key = Some(key);
        }

        if let Ok(url) = std::env::var("DATA_GOV_API_URL") {
            self.data_api.base_url = url;
        }

        if let Ok(bind) = std::env::var("AGRIQA_BIND") {
            self.server.bind = bind;
        }

        if let Ok(origins) = std::env::var("CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }

        if let Ok(threshold) = std::env::var("AGRIQA_HYBRID_THRESHOLD") {
            self.composer.hybrid_threshold = threshold.parse().map_err(|_| {
                AppError::Config(format!("AGRIQA_HYBRID_THRESHOLD is not a number: {}", threshold))
            })?;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            self.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            self.no_color = true;
        }

        Ok(())
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// This method merges command-line flags with the loaded configuration,
    /// giving precedence to CLI flags over environment variables.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .agriqa directory.
    pub fn agriqa_dir(&self) -> PathBuf {
        self.workspace.join(".agriqa")
    }

    /// Directory searched for prompt overrides.
    pub fn prompts_dir(&self) -> PathBuf {
        self.agriqa_dir().join("prompts")
    }

    /// SQLite file backing the session store.
    pub fn store_path(&self) -> PathBuf {
        self.store
            .path
            .clone()
            .unwrap_or_else(|| self.agriqa_dir().join("sessions.db"))
    }

    /// Catalog override file, resolved against the workspace.
    pub fn catalog_path(&self) -> Option<PathBuf> {
        self.catalog.path.as_ref().map(|p| {
            if p.is_absolute() {
                p.clone()
            } else {
                self.workspace.join(p)
            }
        })
    }

    /// Get the configuration for a provider.
    pub fn get_provider_config(&self, provider: &str) -> Option<&ProviderConfig> {
        self.llm.as_ref().and_then(|llm| llm.providers.get(provider))
    }

    /// Custom endpoint configured for a provider, if any.
    pub fn provider_endpoint(&self, provider: &str) -> Option<&str> {
        self.get_provider_config(provider)
            .and_then(|pc| pc.endpoint.as_deref())
    }

    /// Request timeout configured for a provider, if any.
    pub fn provider_timeout(&self, provider: &str) -> Option<u64> {
        self.get_provider_config(provider).and_then(|pc| pc.timeout)
    }

    /// Resolve API key from environment variable.
    ///
    /// Order: `AGRIQA_API_KEY`, the provider's `apiKeyEnv`, then the
    /// provider's conventional variable (`OPENAI_API_KEY`, `GEMINI_API_KEY`).
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        if let Some(env_var) = self
            .get_provider_config(provider)
            .and_then(|pc| pc.api_key_env.as_ref())
        {
            if let Ok(key) = std::env::var(env_var) {
                return Some(key);
            }
        }

        let conventional = match provider {
            "openai" => "OPENAI_API_KEY",
            "gemini" => "GEMINI_API_KEY",
            _ => return None,
        };
        std::env::var(conventional).ok()
    }

    /// Validate the loaded configuration.
    pub fn validate(&self) -> AppResult<()> {
        let provider = self.provider.as_str();

        if !KNOWN_PROVIDERS.contains(&provider) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if matches!(provider, "openai" | "gemini") && self.resolve_api_key(provider).is_none() {
            return Err(AppError::Config(format!(
                "Provider '{}' requires an API key (set AGRIQA_API_KEY or apiKeyEnv)",
                provider
            )));
        }

        let composer = &self.composer;
        if composer.hybrid_threshold == 0 {
            return Err(AppError::Config(
                "composer.hybridThreshold must be at least 1".to_string(),
            ));
        }
        if composer.max_sources == 0 || composer.max_sources > MAX_SOURCES_CEILING {
            return Err(AppError::Config(format!(
                "composer.maxSources must be between 1 and {}",
                MAX_SOURCES_CEILING
            )));
        }
        if composer.hybrid_trusted_sources > composer.max_sources {
            return Err(AppError::Config(
                "composer.hybridTrustedSources cannot exceed composer.maxSources".to_string(),
            ));
        }
        if self.catalog.max_datasets == 0 || self.catalog.max_datasets > composer.max_sources {
            return Err(AppError::Config(format!(
                "catalog.maxDatasets must be between 1 and {}",
                composer.max_sources
            )));
        }
        if self.data_api.max_attempts == 0 {
            return Err(AppError::Config(
                "dataApi.maxAttempts must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
