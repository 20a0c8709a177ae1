//! Compression pipeline: normalize, dictionary-encode, then report
//! duplicates and tiers over a batch of files.

use crate::dedup::{DedupReport, Deduplicator};
use crate::dictionary::{self, build_codebook, Codebook};
use crate::normalize::Normalizer;
use crate::stats::{reduction_pct, CompressionStats, StepStats};
use crate::tiers::{FileWarning, TierGenerator, TierResult};
use anyhow::Context;
use cc_core::{CompactorConfig, HeuristicTokenizer, Result, SourceFile, Tokenizer};
use serde::Serialize;
use std::sync::Arc;

/// A file whose dictionary pass was rolled back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub file: String,
    pub error: String,
}

/// Everything one pipeline run produces.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    /// Normalized text, the input to dedup and tiers.
    pub normalized: Vec<SourceFile>,
    /// Dictionary-encoded text; decode with `codebook`.
    pub compressed: Vec<SourceFile>,
    pub codebook: Codebook,
    pub stats: CompressionStats,
    pub dedup: DedupReport,
    pub tiers: TierResult,
    pub steps: Vec<StepStats>,
    pub total_before: usize,
    pub total_after: usize,
    pub total_pct: f64,
    pub warnings: Vec<FileWarning>,
    pub failures: Vec<FileFailure>,
}

/// The main compactor pipeline.
#[derive(Clone)]
pub struct CompactorPipeline {
    config: CompactorConfig,
    tokenizer: Arc<dyn Tokenizer>,
    normalizer: Normalizer,
    dedup: Deduplicator,
    tiers: TierGenerator,
}

impl CompactorPipeline {
    pub fn new(config: CompactorConfig, tokenizer: Arc<dyn Tokenizer>) -> Result<Self> {
        config.validate()?;
        let dedup = Deduplicator::detector(&config.dedup)?.with_tokenizer(tokenizer.clone());
        let tiers = TierGenerator::from_config(&config.tiers).with_tokenizer(tokenizer.clone());
        Ok(Self {
            normalizer: Normalizer::new(config.normalize.clone()),
            dedup,
            tiers,
            config,
            tokenizer,
        })
    }

    pub fn config(&self) -> &CompactorConfig {
        &self.config
    }

    fn tokens(&self, files: &[SourceFile]) -> usize {
        files.iter().map(|f| self.tokenizer.count(&f.content)).sum()
    }

    pub fn run(&self, files: &[SourceFile]) -> PipelineReport {
        let mut warnings = Vec::new();
        let normalized: Vec<SourceFile> = files
            .iter()
            .map(|file| {
                let outcome = self.normalizer.run(&file.content);
                warnings.extend(outcome.warnings.into_iter().map(|warning| FileWarning {
                    file: file.name.clone(),
                    warning,
                }));
                SourceFile::new(file.name.clone(), outcome.text)
            })
            .collect();

        let texts: Vec<&str> = normalized.iter().map(|f| f.content.as_str()).collect();
        let codebook = build_codebook(&texts, &self.config.codebook);

        let mut failures = Vec::new();
        let compressed: Vec<SourceFile> = normalized
            .iter()
            .map(|file| match compress_file(file, &codebook) {
                Ok(done) => done,
                Err(err) => {
                    tracing::warn!(
                        file = %file.name,
                        error = %format!("{err:#}"),
                        "keeping normalized text"
                    );
                    failures.push(FileFailure {
                        file: file.name.clone(),
                        error: format!("{err:#}"),
                    });
                    file.clone()
                }
            })
            .collect();

        let stats = CompressionStats::for_corpus(&normalized, &codebook);
        let dedup = self.dedup.report(&normalized);
        let tiers = self.tiers.generate(&normalized);

        let original_tokens = self.tokens(files);
        let normalized_tokens = self.tokens(&normalized);
        let compressed_tokens = self.tokens(&compressed);
        let steps = vec![
            StepStats::new("normalize", original_tokens, normalized_tokens),
            StepStats::new("dictionary", normalized_tokens, compressed_tokens),
        ];
        tracing::debug!(
            files = files.len(),
            before = original_tokens,
            after = compressed_tokens,
            codebook = codebook.len(),
            "pipeline run complete"
        );

        PipelineReport {
            normalized,
            compressed,
            codebook,
            stats,
            dedup,
            tiers,
            steps,
            total_before: original_tokens,
            total_after: compressed_tokens,
            total_pct: reduction_pct(original_tokens, compressed_tokens),
            warnings,
            failures,
        }
    }

    /// Restore dictionary-encoded files.
    pub fn decompress_files(files: &[SourceFile], codebook: &Codebook) -> Vec<SourceFile> {
        files
            .iter()
            .map(|f| SourceFile::new(f.name.clone(), dictionary::decompress(&f.content, codebook)))
            .collect()
    }
}

impl Default for CompactorPipeline {
    fn default() -> Self {
        let config = CompactorConfig::default();
        let tokenizer: Arc<dyn Tokenizer> = Arc::new(HeuristicTokenizer);
        Self {
            normalizer: Normalizer::new(config.normalize.clone()),
            dedup: Deduplicator::default(),
            tiers: TierGenerator::from_config(&config.tiers),
            config,
            tokenizer,
        }
    }
}

fn compress_file(file: &SourceFile, codebook: &Codebook) -> anyhow::Result<SourceFile> {
    let content = dictionary::compress_verified(&file.content, codebook)
        .with_context(|| format!("dictionary pass on {}", file.name))?;
    Ok(SourceFile::new(file.name.clone(), content))
}
