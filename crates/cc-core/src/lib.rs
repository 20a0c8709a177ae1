//! Shared types, configuration, errors and token accounting for Claw Compactor.

pub mod config;
pub mod error;
pub mod tokens;
pub mod types;

pub use config::CompactorConfig;
pub use error::{CompactError, Result};
pub use tokens::{estimate_tokens, HeuristicTokenizer, Tokenizer};
pub use types::{SectionRef, SimilarityMeasure, SourceFile};

#[cfg(test)]
mod tests;
