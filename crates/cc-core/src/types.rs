use serde::{Deserialize, Serialize};

/// A named piece of workspace text (memory file, daily log, transcript).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub name: String,
    pub content: String,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Reference to one section of one file, as reported by dedup and tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionRef {
    pub file: String,
    /// Position of the section within its file.
    pub index: usize,
    pub header: String,
    pub level: u8,
    pub priority: f64,
    pub tokens: usize,
}

impl SectionRef {
    /// `file#header`, or just `file` for a preamble.
    pub fn location(&self) -> String {
        if self.header.is_empty() {
            self.file.clone()
        } else {
            format!("{}#{}", self.file, self.header)
        }
    }
}

/// Similarity measure used for near-duplicate detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SimilarityMeasure {
    /// LCS over whitespace-split words, divided by the larger word count.
    #[default]
    WordLcs,
    /// LCS over characters, divided by the larger character count.
    CharLcs,
    /// Jaccard over k-word shingle hashes.
    ShingleJaccard { k: usize },
}
