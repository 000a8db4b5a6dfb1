//! Query engine for AgriQA.
//!
//! Turns a natural-language question into a cited answer:
//! 1. the catalog selects datasets by keyword
//! 2. [`fetcher`] pulls their records from data.gov.in while [`intent`]
//!    classifies the question
//! 3. [`composer`] picks direct, hybrid or fallback mode by record count
//!    and asks the LLM to phrase the answer
//! 4. [`session`] appends the turn to the conversation transcript
//!
//! [`pipeline::QueryPipeline`] wires the steps together.

pub mod composer;
pub mod fetcher;
pub mod intent;
pub mod pipeline;
pub mod session;
pub mod texts;
pub mod types;

pub use composer::{Answer, AnswerComposer, ComposerSettings, CompositionError};
pub use fetcher::{DataFetcher, FetchError, FetchResult, FetchSettings, RecordSource};
pub use intent::{IntentError, IntentExtractor, IntentParseError, IntentTag, QueryIntent};
pub use pipeline::{QueryPipeline, QueryResponse};
pub use session::{open_store, InMemorySessionStore, SessionStore, SqliteSessionStore, Turn};
pub use types::{AnswerMode, AnswerResult, DatasetRecords, Query, Record, SourceKind, SourceRef};
