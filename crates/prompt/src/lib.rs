//! Prompt system for AgriQA.
//!
//! This crate provides structured prompt management with:
//! - YAML-based prompt definitions
//! - Built-in prompts for intent classification and the three answer modes
//! - Per-workspace overrides in `.agriqa/prompts/<id>.yml`
//! - Handlebars template rendering

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use loader::{load_prompt, PromptLibrary};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptBehavior, PromptDefinition, PromptOutputSpec};

/// Identifiers of the built-in prompts.
pub mod ids {
    pub const INTENT_CLASSIFY: &str = "intent.classify";
    pub const ANSWER_DIRECT: &str = "answer.direct";
    pub const ANSWER_HYBRID: &str = "answer.hybrid";
    pub const ANSWER_FALLBACK: &str = "answer.fallback";
}
