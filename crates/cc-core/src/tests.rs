use crate::*;
use crate::config::*;
use std::sync::Arc;

// ========== Tokenizer ==========

#[test]
fn test_tokens_empty() {
    assert_eq!(estimate_tokens(""), 0);
    assert_eq!(HeuristicTokenizer.count(""), 0);
}

#[test]
fn test_tokens_heuristic() {
    assert_eq!(estimate_tokens("abcd"), 1);
    assert_eq!(estimate_tokens("abc"), 0);
    assert_eq!(estimate_tokens(&"x".repeat(800)), 200);
}

#[test]
fn test_tokens_counts_bytes_not_chars() {
    // 4 CJK chars = 12 bytes
    assert_eq!(estimate_tokens("你好世界"), 3);
}

#[test]
fn test_tokens_deterministic() {
    let text = "consistency test 一致性测试";
    assert_eq!(estimate_tokens(text), estimate_tokens(text));
}

#[test]
fn test_tokens_additive_bound() {
    let a = "The quick brown fox ";
    let b = "jumps over the lazy dog";
    let joined = format!("{a}{b}");
    assert!(estimate_tokens(a) + estimate_tokens(b) + 1 >= estimate_tokens(&joined));
}

struct WordTokenizer;

impl Tokenizer for WordTokenizer {
    fn count(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}

#[test]
fn test_tokenizer_injection_through_pointers() {
    let shared: Arc<dyn Tokenizer> = Arc::new(WordTokenizer);
    assert_eq!(shared.count("one two three"), 3);
    let boxed: Box<dyn Tokenizer> = Box::new(WordTokenizer);
    assert_eq!(boxed.count("one two"), 2);
    assert_eq!((&WordTokenizer).count(""), 0);
}

// ========== Types ==========

#[test]
fn test_section_ref_location() {
    let r = SectionRef {
        file: "memory/2026-01-15.md".into(),
        index: 2,
        header: "Setup".into(),
        level: 2,
        priority: 5.0,
        tokens: 10,
    };
    assert_eq!(r.location(), "memory/2026-01-15.md#Setup");
    let pre = SectionRef { header: String::new(), ..r };
    assert_eq!(pre.location(), "memory/2026-01-15.md");
}

#[test]
fn test_similarity_measure_serde() {
    let json = serde_json::to_string(&SimilarityMeasure::ShingleJaccard { k: 3 }).unwrap();
    assert_eq!(json, r#"{"kind":"shingle_jaccard","k":3}"#);
    let back: SimilarityMeasure = serde_json::from_str(r#"{"kind":"word_lcs"}"#).unwrap();
    assert_eq!(back, SimilarityMeasure::WordLcs);
}

// ========== Config ==========

#[test]
fn test_config_defaults() {
    let c = CompactorConfig::default();
    assert_eq!(c.codebook.min_freq, 3);
    assert_eq!(c.codebook.max_entries, 200);
    assert_eq!(c.codebook.min_phrase_len, 6);
    assert_eq!(c.tiers.budgets, [500, 2000, 8000]);
    assert!((c.normalize.bullet_similarity - 0.80).abs() < 1e-9);
    assert!((c.dedup.detect_threshold - 0.5).abs() < 1e-9);
    assert!((c.dedup.merge_threshold - 0.8).abs() < 1e-9);
    assert!(c.validate().is_ok());
}

#[test]
fn test_config_partial_json() {
    let c = CompactorConfig::from_json_str(r#"{"codebook": {"min_freq": 2}}"#).unwrap();
    assert_eq!(c.codebook.min_freq, 2);
    assert_eq!(c.codebook.max_entries, 200);
    assert_eq!(c.tiers, TierConfig::default());
}

#[test]
fn test_config_empty_object() {
    let c = CompactorConfig::from_json_str("{}").unwrap();
    assert_eq!(c, CompactorConfig::default());
}

#[test]
fn test_config_rejects_bad_threshold() {
    let err =
        CompactorConfig::from_json_str(r#"{"dedup": {"detect_threshold": 1.5}}"#).unwrap_err();
    assert!(matches!(err, CompactError::InvalidConfig(_)));
}

#[test]
fn test_config_rejects_zero_shingle() {
    let err = CompactorConfig::from_json_str(
        r#"{"dedup": {"measure": {"kind": "shingle_jaccard", "k": 0}}}"#,
    )
    .unwrap_err();
    assert!(matches!(err, CompactError::InvalidConfig(_)));
}

#[test]
fn test_config_malformed_json() {
    let err = CompactorConfig::from_json_str("not json").unwrap_err();
    assert!(matches!(err, CompactError::Serialization(_)));
}

#[test]
fn test_config_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("compactor.json");
    let mut c = CompactorConfig::default();
    c.tiers.budgets = [100, 400, 1600];
    std::fs::write(&path, c.to_json().unwrap()).unwrap();
    assert_eq!(CompactorConfig::load(&path).unwrap(), c);
}

#[test]
fn test_config_load_missing_file() {
    let err = CompactorConfig::load("/nonexistent/compactor.json").unwrap_err();
    assert!(matches!(err, CompactError::Io(_)));
}
