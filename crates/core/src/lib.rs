//! AgriQA Core Library
//!
//! This crate provides the foundational utilities shared by every AgriQA crate:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management
//! - The answer language (`Language`)

pub mod config;
pub mod error;
pub mod language;
pub mod logging;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use language::Language;
