use crate::error::{CompactError, Result};
use crate::types::SimilarityMeasure;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level compactor configuration. Every field has a default, so partial
/// JSON documents load fine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompactorConfig {
    pub normalize: NormalizeConfig,
    pub codebook: CodebookConfig,
    pub dedup: DedupConfig,
    pub tiers: TierConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    /// Character LCS ratio at which two bullets count as the same bullet.
    pub bullet_similarity: f64,
    /// Bullets with at most this many words are "short".
    pub short_bullet_max_words: usize,
    /// Maximum number of short bullets joined onto one line.
    pub short_bullet_max_merge: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodebookConfig {
    pub min_freq: usize,
    pub max_entries: usize,
    pub min_phrase_len: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    pub detect_threshold: f64,
    pub merge_threshold: f64,
    pub measure: SimilarityMeasure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierConfig {
    /// Token budgets for levels 0, 1 and 2.
    pub budgets: [usize; 3],
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            bullet_similarity: 0.80,
            short_bullet_max_words: 3,
            short_bullet_max_merge: 10,
        }
    }
}

impl Default for CodebookConfig {
    fn default() -> Self {
        Self {
            min_freq: 3,
            max_entries: 200,
            min_phrase_len: 6,
        }
    }
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            detect_threshold: 0.5,
            merge_threshold: 0.8,
            measure: SimilarityMeasure::WordLcs,
        }
    }
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            budgets: [500, 2_000, 8_000],
        }
    }
}

impl CompactorConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        tracing::debug!(path = %path.display(), "loaded compactor config");
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the compactor cannot work with.
    pub fn validate(&self) -> Result<()> {
        let ratios = [
            ("normalize.bullet_similarity", self.normalize.bullet_similarity),
            ("dedup.detect_threshold", self.dedup.detect_threshold),
            ("dedup.merge_threshold", self.dedup.merge_threshold),
        ];
        for (name, value) in ratios {
            if !(0.0..=1.0).contains(&value) {
                return Err(CompactError::InvalidConfig(format!(
                    "{name} must be within 0.0..=1.0, got {value}"
                )));
            }
        }
        if self.normalize.short_bullet_max_merge == 0 {
            return Err(CompactError::InvalidConfig(
                "normalize.short_bullet_max_merge must be at least 1".into(),
            ));
        }
        if self.codebook.min_freq == 0 {
            return Err(CompactError::InvalidConfig(
                "codebook.min_freq must be at least 1".into(),
            ));
        }
        if let SimilarityMeasure::ShingleJaccard { k: 0 } = self.dedup.measure {
            return Err(CompactError::InvalidConfig(
                "dedup.measure shingle size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
