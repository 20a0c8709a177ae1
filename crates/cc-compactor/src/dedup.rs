//! Cross-file near-duplicate section detection and merging.

use crate::priority::Prioritizer;
use crate::similarity::Prepared;
use cc_core::config::DedupConfig;
use cc_core::{
    CompactError, HeuristicTokenizer, Result, SectionRef, SimilarityMeasure, SourceFile, Tokenizer,
};
use cc_parser::{reconstruct, MarkdownParser, Section};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Index-level duplicate group over a slice of texts.
#[derive(Debug, Clone, PartialEq)]
pub struct DupGroup {
    /// Ascending member indices.
    pub indices: Vec<usize>,
    /// The member that survives a merge.
    pub canonical: usize,
    /// Mean similarity of the pairs that linked the group.
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub members: Vec<SectionRef>,
    pub canonical: SectionRef,
    pub similarity: f64,
}

/// A file left out of dedup, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    pub file: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DedupReport {
    pub total_entries: usize,
    pub duplicate_groups: Vec<DuplicateGroup>,
    pub skipped: Vec<SkippedFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_saved: Option<usize>,
}

/// Auto-merge result: the report plus the rewritten files.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub report: DedupReport,
    pub files: Vec<SourceFile>,
}

/// One section eligible for comparison.
struct Entry {
    file: usize,
    section: usize,
    reference: SectionRef,
}

struct Corpus {
    sections: Vec<Vec<Section>>,
    entries: Vec<Entry>,
    skipped: Vec<SkippedFile>,
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self { parent: (0..n).collect() }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[ra.max(rb)] = ra.min(rb);
        }
    }
}

/// Words of `member` not covered by the longest word prefix and suffix it
/// shares with `canonical`.
pub fn residual(member: &str, canonical: &str) -> String {
    let mw: Vec<&str> = member.split_whitespace().collect();
    let cw: Vec<&str> = canonical.split_whitespace().collect();
    if mw.is_empty() || cw.windows(mw.len()).any(|w| w == mw.as_slice()) {
        return String::new();
    }
    let prefix = mw.iter().zip(&cw).take_while(|(a, b)| a == b).count();
    let max_suffix = (mw.len() - prefix).min(cw.len() - prefix.min(cw.len()));
    let suffix = mw
        .iter()
        .rev()
        .zip(cw.iter().rev())
        .take(max_suffix)
        .take_while(|(a, b)| a == b)
        .count();
    mw[prefix..mw.len() - suffix].join(" ")
}

/// Near-duplicate detector over markdown sections.
#[derive(Clone)]
pub struct Deduplicator {
    threshold: f64,
    measure: SimilarityMeasure,
    tokenizer: Arc<dyn Tokenizer>,
}

impl std::fmt::Debug for Deduplicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deduplicator")
            .field("threshold", &self.threshold)
            .field("measure", &self.measure)
            .finish()
    }
}

impl Default for Deduplicator {
    /// Report-mode detector with the default threshold and measure.
    fn default() -> Self {
        let config = DedupConfig::default();
        Self {
            threshold: config.detect_threshold,
            measure: config.measure,
            tokenizer: Arc::new(HeuristicTokenizer),
        }
    }
}

impl Deduplicator {
    pub fn new(threshold: f64, measure: SimilarityMeasure) -> Result<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(CompactError::InvalidThreshold(threshold));
        }
        Ok(Self {
            threshold,
            measure,
            tokenizer: Arc::new(HeuristicTokenizer),
        })
    }

    /// Detector at the report threshold.
    pub fn detector(config: &DedupConfig) -> Result<Self> {
        Self::new(config.detect_threshold, config.measure)
    }

    /// Detector at the stricter auto-merge threshold.
    pub fn merger(config: &DedupConfig) -> Result<Self> {
        Self::new(config.merge_threshold, config.measure)
    }

    pub fn with_tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Group `texts` into equivalence classes of near-duplicates. Groups are
    /// ordered by their first member; the canonical member has the most
    /// tokens, then the most bytes, then the lowest index.
    pub fn find_groups(&self, texts: &[&str]) -> Vec<DupGroup> {
        if texts.len() < 2 {
            return Vec::new();
        }
        let prepared: Vec<Prepared<'_>> =
            texts.iter().map(|t| Prepared::new(self.measure, t)).collect();
        let mut uf = UnionFind::new(texts.len());
        let mut links = Vec::new();
        for i in 0..texts.len() {
            for j in i + 1..texts.len() {
                if prepared[i].upper_bound(&prepared[j]) < self.threshold {
                    continue;
                }
                let sim = prepared[i].similarity(&prepared[j]);
                if sim >= self.threshold {
                    uf.union(i, j);
                    links.push((i, sim));
                }
            }
        }

        let mut classes: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for i in 0..texts.len() {
            let root = uf.find(i);
            classes.entry(root).or_default().push(i);
        }
        let mut sims: BTreeMap<usize, (f64, usize)> = BTreeMap::new();
        for (i, sim) in links {
            let slot = sims.entry(uf.find(i)).or_insert((0.0, 0));
            slot.0 += sim;
            slot.1 += 1;
        }

        let groups: Vec<DupGroup> = classes
            .into_iter()
            .filter(|(_, members)| members.len() > 1)
            .map(|(root, indices)| {
                let canonical = indices
                    .iter()
                    .copied()
                    .max_by(|&a, &b| {
                        let key = |i: usize| (self.tokenizer.count(texts[i]), texts[i].len());
                        key(a).cmp(&key(b)).then_with(|| b.cmp(&a))
                    })
                    .unwrap_or(indices[0]);
                let (total, count) = sims.get(&root).copied().unwrap_or((0.0, 0));
                let similarity = if count > 0 { total / count as f64 } else { self.threshold };
                DupGroup { indices, canonical, similarity }
            })
            .collect();
        tracing::debug!(entries = texts.len(), groups = groups.len(), "found duplicate groups");
        groups
    }

    fn corpus(&self, files: &[SourceFile]) -> Corpus {
        let parser = MarkdownParser::new();
        let prioritizer = Prioritizer::for_files(files);
        let mut corpus = Corpus {
            sections: Vec::with_capacity(files.len()),
            entries: Vec::new(),
            skipped: Vec::new(),
        };
        for (fi, file) in files.iter().enumerate() {
            let doc = parser.parse(&file.content);
            if let Some(warning) = doc.warnings.first() {
                tracing::warn!(file = %file.name, %warning, "skipping file for dedup");
                corpus.skipped.push(SkippedFile {
                    file: file.name.clone(),
                    reason: warning.to_string(),
                });
                corpus.sections.push(Vec::new());
                continue;
            }
            for (si, section) in doc.sections.iter().enumerate() {
                if section.is_body_blank() {
                    continue;
                }
                let tokens = section.token_cost(self.tokenizer.as_ref());
                let priority = prioritizer.score(&file.name, section);
                corpus.entries.push(Entry {
                    file: fi,
                    section: si,
                    reference: section.to_ref(&file.name, si, priority, tokens),
                });
            }
            corpus.sections.push(doc.sections);
        }
        corpus
    }

    fn groups_for(&self, corpus: &Corpus) -> Vec<DupGroup> {
        let texts: Vec<&str> = corpus
            .entries
            .iter()
            .map(|e| corpus.sections[e.file][e.section].body.as_str())
            .collect();
        self.find_groups(&texts)
    }

    fn build_report(corpus: &Corpus, groups: &[DupGroup]) -> DedupReport {
        DedupReport {
            total_entries: corpus.entries.len(),
            duplicate_groups: groups
                .iter()
                .map(|g| DuplicateGroup {
                    members: g
                        .indices
                        .iter()
                        .map(|&i| corpus.entries[i].reference.clone())
                        .collect(),
                    canonical: corpus.entries[g.canonical].reference.clone(),
                    similarity: g.similarity,
                })
                .collect(),
            skipped: corpus.skipped.clone(),
            tokens_saved: None,
        }
    }

    /// Report duplicate groups without touching any file.
    pub fn report(&self, files: &[SourceFile]) -> DedupReport {
        let corpus = self.corpus(files);
        let groups = self.groups_for(&corpus);
        Self::build_report(&corpus, &groups)
    }

    /// Replace every non-canonical member's body with a pointer to its
    /// canonical section plus whatever the canonical does not cover.
    pub fn auto_merge(&self, files: &[SourceFile]) -> MergeOutcome {
        let mut corpus = self.corpus(files);
        let groups = self.groups_for(&corpus);
        let mut report = Self::build_report(&corpus, &groups);

        let mut touched = vec![false; files.len()];
        for group in &groups {
            let canon = &corpus.entries[group.canonical];
            let location = canon.reference.location();
            let canon_body = corpus.sections[canon.file][canon.section].body.clone();
            for &member in group.indices.iter().filter(|&&i| i != group.canonical) {
                let (fi, si) = (corpus.entries[member].file, corpus.entries[member].section);
                let section = &mut corpus.sections[fi][si];
                section.body = merged_body(&section.body, &canon_body, &location);
                touched[fi] = true;
            }
        }

        let merged: Vec<SourceFile> = files
            .iter()
            .enumerate()
            .map(|(fi, file)| {
                if touched[fi] {
                    SourceFile::new(file.name.clone(), reconstruct(&corpus.sections[fi]))
                } else {
                    file.clone()
                }
            })
            .collect();

        let before: usize = files.iter().map(|f| self.tokenizer.count(&f.content)).sum();
        let after: usize = merged.iter().map(|f| self.tokenizer.count(&f.content)).sum();
        report.tokens_saved = Some(before.saturating_sub(after));
        tracing::debug!(
            groups = groups.len(),
            saved = before.saturating_sub(after),
            "auto-merged duplicates"
        );
        MergeOutcome { report, files: merged }
    }
}

/// Keep the body's surrounding blank lines so section spacing survives.
fn merged_body(body: &str, canonical: &str, location: &str) -> String {
    let content = body.trim();
    let lead_end = body.len() - body.trim_start().len();
    let trail_start = body.trim_end().len();
    let mut out = String::with_capacity(body.len());
    out.push_str(&body[..lead_end]);
    out.push_str(&format!("[merged into {location}]"));
    let rest = residual(content, canonical);
    if !rest.is_empty() {
        out.push('\n');
        out.push_str(&rest);
    }
    out.push_str(&body[trail_start..]);
    out
}
