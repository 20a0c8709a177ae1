//! Claw Compactor: deterministic compression for agent workspace memory.
//!
//! Stages:
//! 1. Normalize: lossless-in-meaning markdown cleanup
//! 2. Dictionary: frequent phrases swapped for `$XX` codes, exactly reversible
//! 3. Dedup: near-duplicate sections across files
//! 4. Tiers: L0/L1/L2 section selections under token budgets

pub mod dedup;
pub mod dictionary;
pub mod normalize;
pub mod pipeline;
pub mod priority;
pub mod similarity;
pub mod stats;
pub mod tiers;

pub use dedup::{DedupReport, Deduplicator, DupGroup, DuplicateGroup, MergeOutcome, SkippedFile};
pub use dictionary::{build_codebook, compress, compress_verified, decompress, Codebook};
pub use normalize::{normalize, NormalizeOutcome, Normalizer};
pub use pipeline::{CompactorPipeline, FileFailure, PipelineReport};
pub use priority::Prioritizer;
pub use stats::{CompressionStats, StepStats};
pub use tiers::{FileWarning, Tier, TierGenerator, TierResult};
