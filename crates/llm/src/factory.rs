//! LLM provider factory.
//!
//! This module provides a factory for creating LLM clients based on
//! application configuration. It handles provider resolution and secret
//! injection.

use crate::client::LlmClient;
use crate::providers::{GeminiClient, MockClient, OllamaClient, OpenAiClient};
use crate::types::ProviderType;
use agriqa_core::AppConfig;
use std::sync::Arc;

/// Default request timeout for remote providers.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Everything the factory needs to build one client.
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    /// Provider identifier ("ollama", "openai", "gemini", "mock")
    pub provider: String,

    /// Optional custom endpoint URL
    pub endpoint: Option<String>,

    /// Optional API key (for providers that require it)
    pub api_key: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
}

impl ClientOptions {
    /// Resolve the options for the active provider of a loaded configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            provider: config.provider.clone(),
            endpoint: config.provider_endpoint(&config.provider).map(str::to_string),
            api_key: config.resolve_api_key(&config.provider),
            timeout_secs: config.provider_timeout(&config.provider),
        }
    }
}

/// Create an LLM client based on the provider name.
///
/// This function performs the following:
/// 1. Matches the provider string to a known provider type
/// 2. Checks that required secrets are present
/// 3. Creates the appropriate client implementation
///
/// # Errors
/// Returns error if:
/// - Provider is unknown
/// - Required secrets are missing
/// - Client initialization fails
pub fn create_client(options: &ClientOptions) -> Result<Arc<dyn LlmClient>, String> {
    let provider = ProviderType::parse(&options.provider)
        .ok_or_else(|| format!("Unknown provider: {}", options.provider))?;

    let timeout = options.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);

    if provider.requires_api_key() && options.api_key.is_none() {
        return Err(format!(
            "{} provider requires API key",
            provider.as_str()
        ));
    }
    let api_key = options.api_key.clone().unwrap_or_default();

    let client: Arc<dyn LlmClient> = match provider {
        ProviderType::Ollama => {
            let base_url = options
                .endpoint
                .as_deref()
                .unwrap_or(OllamaClient::DEFAULT_URL);
            Arc::new(OllamaClient::with_base_url(base_url, timeout)?)
        }
        ProviderType::OpenAI => {
            let base_url = options
                .endpoint
                .as_deref()
                .unwrap_or(OpenAiClient::DEFAULT_URL);
            Arc::new(OpenAiClient::new(base_url, api_key, timeout)?)
        }
        ProviderType::Gemini => {
            let base_url = options
                .endpoint
                .as_deref()
                .unwrap_or(GeminiClient::DEFAULT_URL);
            Arc::new(GeminiClient::new(base_url, api_key, timeout)?)
        }
        ProviderType::Mock => Arc::new(MockClient::echo()),
    };

    tracing::debug!("Created LLM client for provider '{}'", client.provider_name());
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(provider: &str, api_key: Option<&str>) -> ClientOptions {
        ClientOptions {
            provider: provider.to_string(),
            api_key: api_key.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_ollama_client() {
        let client = create_client(&options("ollama", None)).unwrap();
        assert_eq!(client.provider_name(), "ollama");
    }

    #[test]
    fn test_create_ollama_with_custom_endpoint() {
        let mut opts = options("ollama", None);
        opts.endpoint = Some("http://localhost:8080".to_string());
        assert!(create_client(&opts).is_ok());
    }

    #[test]
    fn test_gemini_requires_api_key() {
        match create_client(&options("gemini", None)) {
            Err(err) => assert!(err.contains("requires API key")),
            Ok(_) => panic!("Expected error for Gemini without API key"),
        }
        assert!(create_client(&options("gemini", Some("key"))).is_ok());
    }

    #[test]
    fn test_openai_requires_api_key() {
        assert!(create_client(&options("openai", None)).is_err());
        let client = create_client(&options("openai", Some("key"))).unwrap();
        assert_eq!(client.provider_name(), "openai");
    }

    #[test]
    fn test_mock_client() {
        let client = create_client(&options("mock", None)).unwrap();
        assert_eq!(client.provider_name(), "mock");
    }

    #[test]
    fn test_unknown_provider() {
        match create_client(&options("unknown", None)) {
            Err(err) => assert!(err.contains("Unknown provider")),
            Ok(_) => panic!("Expected error for unknown provider"),
        }
    }
}
