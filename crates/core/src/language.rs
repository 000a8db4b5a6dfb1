//! Answer language.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Language the caller wants the answer in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// English
    #[default]
    #[serde(alias = "english")]
    En,

    /// Hindi
    #[serde(alias = "hindi")]
    Hi,
}

impl Language {
    /// Parse a language code, accepting the full English names as well.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Some(Self::En),
            "hi" | "hindi" => Some(Self::Hi),
            _ => None,
        }
    }

    /// ISO 639-1 code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Hi => "hi",
        }
    }

    /// Name of the language as written in an LLM instruction.
    pub fn instruction_name(&self) -> &'static str {
        match self {
            Self::En => "English",
            Self::Hi => "Hindi (हिंदी)",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
