//! Tiered summaries: L0/L1/L2 section selection under token budgets.

use crate::priority::Prioritizer;
use cc_core::config::TierConfig;
use cc_core::{HeuristicTokenizer, SectionRef, SourceFile, Tokenizer};
use cc_parser::{MarkdownParser, ParseWarning};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const TIER_LEVELS: usize = 3;

/// A parse warning tied to the file it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileWarning {
    pub file: String,
    pub warning: ParseWarning,
}

/// Sections selected for one budget level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tier {
    pub budget: usize,
    pub tokens_used: usize,
    pub sections: Vec<SectionRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TierResult {
    pub total_tokens: usize,
    pub total_sections: usize,
    pub tiers: BTreeMap<u8, Tier>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<FileWarning>,
}

/// Running fill state of one level. A section goes in whole or not at all.
struct TierWindow {
    budget: usize,
    used: usize,
}

impl TierWindow {
    fn add(&mut self, cost: usize) -> bool {
        if !self.used.checked_add(cost).is_some_and(|total| total <= self.budget) {
            return false;
        }
        self.used += cost;
        true
    }
}

/// Greedy priority-ordered tier builder.
///
/// Each level starts from the previous level's selection and adds whatever
/// else fits, so tier k is always a superset of tier k-1.
#[derive(Clone)]
pub struct TierGenerator {
    budgets: [usize; TIER_LEVELS],
    tokenizer: Arc<dyn Tokenizer>,
}

impl std::fmt::Debug for TierGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TierGenerator").field("budgets", &self.budgets).finish()
    }
}

impl Default for TierGenerator {
    fn default() -> Self {
        Self::from_config(&TierConfig::default())
    }
}

impl TierGenerator {
    pub fn new(budgets: [usize; TIER_LEVELS]) -> Self {
        Self {
            budgets,
            tokenizer: Arc::new(HeuristicTokenizer),
        }
    }

    pub fn from_config(config: &TierConfig) -> Self {
        Self::new(config.budgets)
    }

    pub fn with_tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    /// Budgets forced non-decreasing.
    pub fn effective_budgets(&self) -> [usize; TIER_LEVELS] {
        let mut budgets = self.budgets;
        for level in 1..TIER_LEVELS {
            if budgets[level] < budgets[level - 1] {
                tracing::warn!(
                    level,
                    budget = budgets[level],
                    raised_to = budgets[level - 1],
                    "tier budget below previous level, raising"
                );
                budgets[level] = budgets[level - 1];
            }
        }
        budgets
    }

    /// Score, cost and sort every section of `files`.
    fn candidates(&self, files: &[SourceFile]) -> (Vec<SectionRef>, Vec<FileWarning>) {
        let parser = MarkdownParser::new();
        let prioritizer = Prioritizer::for_files(files);
        let mut refs = Vec::new();
        let mut warnings = Vec::new();
        for file in files {
            let doc = parser.parse(&file.content);
            warnings.extend(doc.warnings.into_iter().map(|warning| FileWarning {
                file: file.name.clone(),
                warning,
            }));
            for (index, section) in doc.sections.iter().enumerate() {
                if section.is_preamble() && section.is_body_blank() {
                    continue;
                }
                let cost = section.token_cost(self.tokenizer.as_ref());
                let priority = prioritizer.score(&file.name, section);
                refs.push(section.to_ref(&file.name, index, priority, cost));
            }
        }
        // Stable sort keeps input order among equals.
        refs.sort_by(|a, b| {
            b.priority
                .total_cmp(&a.priority)
                .then_with(|| a.tokens.cmp(&b.tokens))
        });
        (refs, warnings)
    }

    pub fn generate(&self, files: &[SourceFile]) -> TierResult {
        let (sorted, warnings) = self.candidates(files);
        let budgets = self.effective_budgets();
        let mut included = vec![false; sorted.len()];
        let mut window = TierWindow { budget: 0, used: 0 };
        let mut tiers = BTreeMap::new();

        for (level, budget) in budgets.into_iter().enumerate() {
            window.budget = budget;
            for (pos, section) in sorted.iter().enumerate() {
                if !included[pos] && window.add(section.tokens) {
                    included[pos] = true;
                }
            }
            let sections: Vec<SectionRef> = sorted
                .iter()
                .zip(&included)
                .filter(|(_, inc)| **inc)
                .map(|(s, _)| s.clone())
                .collect();
            tracing::debug!(
                level,
                budget,
                used = window.used,
                sections = sections.len(),
                "filled tier"
            );
            tiers.insert(
                level as u8,
                Tier {
                    budget,
                    tokens_used: window.used,
                    sections,
                },
            );
        }

        TierResult {
            total_tokens: sorted.iter().map(|s| s.tokens).sum(),
            total_sections: sorted.len(),
            tiers,
            warnings,
        }
    }
}
