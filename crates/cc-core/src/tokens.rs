//! Token counting oracle.
//!
//! Every accounting figure in the compactor goes through [`Tokenizer`]. The
//! default is a byte heuristic; deployments plug a real BPE tokenizer in
//! through the same trait.

use std::sync::Arc;

/// Approximate bytes per token for the heuristic counter.
pub const BYTES_PER_TOKEN: usize = 4;

/// Maps text to a token count.
///
/// Implementations must be deterministic and free of side effects, and must
/// return 0 for the empty string.
pub trait Tokenizer: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

/// `len(utf8 bytes) / 4`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicTokenizer;

impl Tokenizer for HeuristicTokenizer {
    fn count(&self, text: &str) -> usize {
        estimate_tokens(text)
    }
}

impl<T: Tokenizer + ?Sized> Tokenizer for &T {
    fn count(&self, text: &str) -> usize {
        (**self).count(text)
    }
}

impl<T: Tokenizer + ?Sized> Tokenizer for Box<T> {
    fn count(&self, text: &str) -> usize {
        (**self).count(text)
    }
}

impl<T: Tokenizer + ?Sized> Tokenizer for Arc<T> {
    fn count(&self, text: &str) -> usize {
        (**self).count(text)
    }
}

/// Estimate tokens (bytes / 4).
pub fn estimate_tokens(text: &str) -> usize {
    text.len() / BYTES_PER_TOKEN
}
