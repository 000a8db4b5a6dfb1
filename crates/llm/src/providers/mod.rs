//! LLM provider implementations.

pub mod gemini;
pub mod mock;
pub mod ollama;
pub mod openai;

pub use gemini::GeminiClient;
pub use mock::{MockClient, MockReply};
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;
