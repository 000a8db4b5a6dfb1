//! Dataset registry and trusted-source catalog for AgriQA.
//!
//! The catalog is loaded once at startup (built-in YAML or a workspace
//! override) and shared immutably. It answers two questions:
//! - which data.gov.in datasets a question is about ([`Catalog::select`])
//! - which trusted references to cite when live data is thin
//!   ([`Catalog::get_relevant_sources`])

pub mod registry;
pub mod selector;
pub mod text;
pub mod trusted;

pub use registry::{is_valid_resource_id, Catalog, DatasetDescriptor, Keywords};
pub use text::{tokenize, KeywordSet};
pub use trusted::{SourceCategory, TrustedSource};
