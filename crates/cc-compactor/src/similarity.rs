//! Text similarity measures: LCS ratios and shingle Jaccard.
//!
//! Every measure is symmetric, lies in `[0, 1]`, and treats blank text
//! specially: `sim(blank, blank) = 1`, `sim(blank, non-blank) = 0`.

use cc_core::SimilarityMeasure;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

/// Length of the longest common subsequence. O(n·m) time, O(min(n, m)) space.
pub fn lcs_len<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    if short.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; short.len() + 1];
    let mut curr = vec![0usize; short.len() + 1];
    for x in long {
        for (j, y) in short.iter().enumerate() {
            curr[j + 1] = if x == y {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[short.len()]
}

/// `lcs / max(len)`, with both-empty = 1.
pub fn lcs_ratio<T: PartialEq>(a: &[T], b: &[T]) -> f64 {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => 1.0,
        (true, false) | (false, true) => 0.0,
        _ => lcs_len(a, b) as f64 / a.len().max(b.len()) as f64,
    }
}

pub fn word_lcs_ratio(a: &str, b: &str) -> f64 {
    let wa: Vec<&str> = a.split_whitespace().collect();
    let wb: Vec<&str> = b.split_whitespace().collect();
    lcs_ratio(&wa, &wb)
}

pub fn char_lcs_ratio(a: &str, b: &str) -> f64 {
    let (a, b) = (a.trim(), b.trim());
    let ca: Vec<char> = a.chars().collect();
    let cb: Vec<char> = b.chars().collect();
    lcs_ratio(&ca, &cb)
}

/// Generate k-word shingle hashes. Blank text yields an empty set.
pub fn shingles(text: &str, k: usize) -> HashSet<u64> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return HashSet::new();
    }
    let k = k.max(1);
    if words.len() < k {
        let mut s = HashSet::new();
        s.insert(hash_str(&words.join(" ")));
        return s;
    }
    words.windows(k)
        .map(|w| hash_str(&w.join(" ")))
        .collect()
}

fn hash_str(s: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    s.hash(&mut hasher);
    hasher.finish()
}

/// Jaccard similarity between two shingle sets.
pub fn jaccard(a: &HashSet<u64>, b: &HashSet<u64>) -> f64 {
    if a.is_empty() && b.is_empty() { return 1.0; }
    if a.is_empty() || b.is_empty() { return 0.0; }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}

/// Similarity of two texts under `measure`.
pub fn score(measure: SimilarityMeasure, a: &str, b: &str) -> f64 {
    Prepared::new(measure, a).similarity(&Prepared::new(measure, b))
}

/// A text pre-split for repeated pairwise comparison.
#[derive(Debug, Clone)]
pub enum Prepared<'a> {
    Words(Vec<&'a str>),
    Chars(Vec<char>),
    Shingles(HashSet<u64>),
}

impl<'a> Prepared<'a> {
    pub fn new(measure: SimilarityMeasure, text: &'a str) -> Self {
        match measure {
            SimilarityMeasure::WordLcs => Self::Words(text.split_whitespace().collect()),
            SimilarityMeasure::CharLcs => Self::Chars(text.trim().chars().collect()),
            SimilarityMeasure::ShingleJaccard { k } => Self::Shingles(shingles(text, k)),
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Words(w) => w.len(),
            Self::Chars(c) => c.len(),
            Self::Shingles(s) => s.len(),
        }
    }

    pub fn similarity(&self, other: &Prepared<'_>) -> f64 {
        match (self, other) {
            (Prepared::Words(a), Prepared::Words(b)) => lcs_ratio(a, b),
            (Prepared::Chars(a), Prepared::Chars(b)) => lcs_ratio(a, b),
            (Prepared::Shingles(a), Prepared::Shingles(b)) => jaccard(a, b),
            _ => 0.0,
        }
    }

    /// Cheap ceiling on `similarity`: both LCS ratio and Jaccard are bounded
    /// by `min(len) / max(len)`.
    pub fn upper_bound(&self, other: &Prepared<'_>) -> f64 {
        let (a, b) = (self.len(), other.len());
        if a == 0 && b == 0 {
            return 1.0;
        }
        a.min(b) as f64 / a.max(b) as f64
    }
}
