//! Compression accounting.

use crate::dictionary::{codes_used, compress, Codebook};
use cc_core::SourceFile;
use serde::{Deserialize, Serialize};

/// Round to two decimals.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// `(before - after) / before` as a percentage; 0 for empty input.
pub fn reduction_pct(before: usize, after: usize) -> f64 {
    if before == 0 {
        return 0.0;
    }
    round2((before as f64 - after as f64) / before as f64 * 100.0)
}

/// Character-level savings of a dictionary pass.
///
/// `net_reduction_pct` charges the codebook's own size against the savings
/// and goes negative when the codebook costs more than it saves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompressionStats {
    pub original_chars: usize,
    pub compressed_chars: usize,
    pub gross_reduction_pct: f64,
    pub net_reduction_pct: f64,
    pub codebook_entries: usize,
    pub codes_used: usize,
}

impl CompressionStats {
    pub fn compute(original: &str, compressed: &str, codebook: &Codebook) -> Self {
        let original_chars = original.chars().count();
        let compressed_chars = compressed.chars().count();
        let overhead = codebook.overhead_chars();
        let net_after = compressed_chars + overhead;
        Self {
            original_chars,
            compressed_chars,
            gross_reduction_pct: reduction_pct(original_chars, compressed_chars),
            net_reduction_pct: reduction_pct(original_chars, net_after),
            codebook_entries: codebook.len(),
            codes_used: codes_used(compressed, codebook).len(),
        }
    }

    /// Stats over a whole workspace: files joined by newlines, then
    /// compressed as one text.
    pub fn for_corpus(files: &[SourceFile], codebook: &Codebook) -> Self {
        let joined = files.iter().map(|f| f.content.as_str()).collect::<Vec<_>>().join("\n");
        Self::compute(&joined, &compress(&joined, codebook), codebook)
    }
}

/// One row of the per-step savings table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepStats {
    pub name: String,
    pub before: usize,
    pub after: usize,
    pub saved: i64,
    pub pct: f64,
}

impl StepStats {
    pub fn new(name: impl Into<String>, before: usize, after: usize) -> Self {
        Self {
            name: name.into(),
            before,
            after,
            saved: before as i64 - after as i64,
            pct: reduction_pct(before, after),
        }
    }
}
