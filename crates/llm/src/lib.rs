//! LLM integration crate for AgriQA.
//!
//! This crate provides a provider-agnostic abstraction for interacting with
//! Large Language Models (LLMs). It supports multiple providers through a
//! unified trait-based interface.
//!
//! # Providers
//! - **Ollama**: Local LLM runtime (default)
//! - **OpenAI-compatible**: Any `/v1/chat/completions` endpoint
//! - **Gemini**: Google Generative Language API
//! - **Mock**: Scripted, offline responses for tests and demos
//!
//! # Example
//! ```no_run
//! use agriqa_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::with_base_url(OllamaClient::DEFAULT_URL, 60)?;
//! let request = LlmRequest::new("Which states grow the most rice?", "llama3.2");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::{create_client, ClientOptions};
pub use providers::{GeminiClient, MockClient, MockReply, OllamaClient, OpenAiClient};
pub use types::ProviderType;
