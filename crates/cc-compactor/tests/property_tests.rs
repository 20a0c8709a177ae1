use cc_compactor::dictionary::codes_used;
use cc_compactor::normalize::{
    collapse_blank_runs, compact_short_bullets, compact_tables, dedup_exact_lines,
    drop_empty_sections, merge_similar_bullets, normalize_fullwidth_punct, strip_emoji,
};
use cc_compactor::{build_codebook, compress, decompress, Codebook, Deduplicator, TierGenerator};
use cc_core::config::{CodebookConfig, TierConfig};
use cc_core::{CompactorConfig, SimilarityMeasure, SourceFile};
use proptest::prelude::*;
use std::collections::{BTreeSet, HashSet};

// ── Strategies ──────────────────────────────────────────────────────────

/// Text over a small alphabet that is dense in the characters the codec has
/// to escape or could confuse with a code.
fn arb_tricky_text() -> impl Strategy<Value = String> {
    let alphabet = vec!['a', 'b', 'A', 'B', 'x', '$', ' ', '\n', '\0', '\u{1}', '\u{2}', 'é'];
    prop::collection::vec(prop::sample::select(alphabet), 0..48)
        .prop_map(|chars| chars.into_iter().collect())
}

/// Hand-shaped codebooks, including codes that prefix each other.
fn arb_codebook() -> impl Strategy<Value = Codebook> {
    let codes = vec!["$AA", "$AB", "$BA", "$AAA", "$AAB", "$ABA", "$BAA"];
    prop::collection::btree_map(prop::sample::select(codes), "[aAbB$x ]{1,4}", 0..6).prop_map(
        |entries| {
            let mut seen = HashSet::new();
            let unique: Vec<(&str, String)> = entries
                .into_iter()
                .filter(|(_, phrase)| seen.insert(phrase.clone()))
                .collect();
            Codebook::from_entries(unique).unwrap()
        },
    )
}

fn arb_sentence() -> impl Strategy<Value = String> {
    let words = vec![
        "deploy", "the", "gateway", "to", "prod", "$AA", "rollback", "at", "noon", "cost", "$5",
    ];
    prop::collection::vec(prop::sample::select(words), 1..12).prop_map(|w| w.join(" "))
}

/// Markdown built from a line pool without code fences.
fn arb_markdown() -> impl Strategy<Value = String> {
    let lines = vec![
        "# Title",
        "## Notes",
        "### Detail",
        "",
        "",
        "plain text line",
        "plain text line   ",
        "- deploy gateway",
        "- deploy gateways",
        "  - deploy gateway",
        "- rollback plan written down",
        "* cache",
        "---",
        "| a | b |",
        "| K | V |",
        "|---|---|",
        "| 1 | 2 | 3 | 4 | 5 |",
        "|--|--|--|",
        "| x | y | z |",
        "- a",
        "- b",
        "- c",
        "* d",
        "\u{1F389} launch \u{1F680}",
        "ok \u{2705}  done",
        "\u{4F60}\u{597D}\u{FF0C}\u{4E16}\u{754C}\u{3002}",
        "wait\u{2014}\u{2014}what\u{FF1F}",
    ];
    prop::collection::vec(prop::sample::select(lines), 0..24).prop_map(|l| l.join("\n"))
}

/// One file of headed sections: (heading level, body word count) pairs.
fn arb_file(idx: usize) -> impl Strategy<Value = SourceFile> {
    prop::collection::vec((1u8..=3, 0usize..80), 1..6).prop_map(move |sections| {
        let mut content = String::new();
        for (si, (level, words)) in sections.into_iter().enumerate() {
            content.push_str(&format!("{} Section {si}\n", "#".repeat(level as usize)));
            for w in 0..words {
                content.push_str(if w % 7 == 6 { "word\n" } else { "word " });
            }
            content.push('\n');
        }
        SourceFile::new(format!("notes-{idx}.md"), content)
    })
}

fn arb_files() -> impl Strategy<Value = Vec<SourceFile>> {
    (arb_file(0), arb_file(1), arb_file(2)).prop_map(|(a, b, c)| vec![a, b, c])
}

// ── Codebook round trip ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn round_trip_holds_for_any_codebook(text in arb_tricky_text(), cb in arb_codebook()) {
        let compressed = compress(&text, &cb);
        prop_assert_eq!(decompress(&compressed, &cb), text);
    }

    #[test]
    fn every_dollar_in_output_starts_a_code(text in arb_tricky_text(), cb in arb_codebook()) {
        prop_assume!(!cb.is_empty());
        let compressed = compress(&text, &cb);
        for (pos, _) in compressed.match_indices('$') {
            let rest = &compressed[pos..];
            prop_assert!(
                cb.iter().any(|(code, _)| rest.starts_with(code)),
                "bare $ at {} in {:?}", pos, compressed
            );
        }
        prop_assert!(codes_used(&compressed, &cb).len() <= cb.len());
    }

    #[test]
    fn round_trip_holds_for_built_codebook(
        texts in prop::collection::vec(arb_sentence(), 1..8),
        extra in arb_tricky_text(),
    ) {
        let config = CodebookConfig { min_freq: 2, max_entries: 20, min_phrase_len: 4 };
        let cb = build_codebook(&texts, &config);
        prop_assert!(cb.len() <= 20);
        for text in texts.iter().chain(std::iter::once(&extra)) {
            prop_assert_eq!(&decompress(&compress(text, &cb), &cb), text);
        }
    }

    #[test]
    fn build_is_deterministic(texts in prop::collection::vec(arb_sentence(), 1..8)) {
        let config = CodebookConfig { min_freq: 2, max_entries: 20, min_phrase_len: 4 };
        prop_assert_eq!(build_codebook(&texts, &config), build_codebook(&texts, &config));
    }

    #[test]
    fn empty_codebook_is_identity(text in arb_tricky_text()) {
        let cb = Codebook::new();
        prop_assert_eq!(compress(&text, &cb), text.clone());
        prop_assert_eq!(decompress(&text, &cb), text);
    }
}

// ── Codebook and config files ───────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn codebook_file_round_trip(cb in arb_codebook()) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("codebook.json");
        cb.save(&path).unwrap();
        prop_assert_eq!(Codebook::load(&path).unwrap(), cb);
    }

    #[test]
    fn config_file_round_trip(
        budgets in (0usize..5000, 0usize..5000, 0usize..5000),
        threshold in prop::sample::select(vec![0.25, 0.5, 0.75, 0.8, 0.9]),
        min_freq in 1usize..10,
    ) {
        let mut config = CompactorConfig::default();
        config.tiers = TierConfig { budgets: [budgets.0, budgets.1, budgets.2] };
        config.dedup.detect_threshold = threshold;
        config.codebook.min_freq = min_freq;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("compactor.json");
        std::fs::write(&path, config.to_json().unwrap()).unwrap();
        prop_assert_eq!(CompactorConfig::load(&path).unwrap(), config);
    }
}

// ── Normalizer passes are idempotent ────────────────────────────────────

proptest! {
    #[test]
    fn fullwidth_punct_is_idempotent(text in arb_markdown()) {
        let once = normalize_fullwidth_punct(&text);
        prop_assert_eq!(normalize_fullwidth_punct(&once), once);
    }

    #[test]
    fn strip_emoji_is_idempotent(text in arb_markdown()) {
        let once = strip_emoji(&text);
        prop_assert_eq!(strip_emoji(&once), once);
    }

    #[test]
    fn collapse_blank_runs_is_idempotent(text in arb_markdown()) {
        let once = collapse_blank_runs(&text);
        prop_assert!(!once.contains("\n\n\n\n"));
        prop_assert_eq!(collapse_blank_runs(&once), once);
    }

    #[test]
    fn dedup_exact_lines_is_idempotent(text in arb_markdown()) {
        let once = dedup_exact_lines(&text);
        prop_assert_eq!(dedup_exact_lines(&once), once);
    }

    #[test]
    fn merge_similar_bullets_is_idempotent(text in arb_markdown()) {
        let once = merge_similar_bullets(&text, 0.8);
        prop_assert_eq!(merge_similar_bullets(&once, 0.8), once);
    }

    #[test]
    fn compact_tables_is_idempotent(text in arb_markdown()) {
        let once = compact_tables(&text);
        prop_assert_eq!(compact_tables(&once), once);
    }

    #[test]
    fn compact_short_bullets_is_idempotent(text in arb_markdown()) {
        let once = compact_short_bullets(&text, 3, 10);
        prop_assert_eq!(compact_short_bullets(&once, 3, 10), once);
    }

    #[test]
    fn drop_empty_sections_is_idempotent(text in arb_markdown()) {
        let once = drop_empty_sections(&text);
        prop_assert_eq!(drop_empty_sections(&once), once);
    }
}

// ── Tier invariants ─────────────────────────────────────────────────────

proptest! {
    #[test]
    fn tiers_respect_budgets_and_nest(
        files in arb_files(),
        budgets in (0usize..400, 0usize..800, 0usize..1600),
    ) {
        let generator = TierGenerator::new([budgets.0, budgets.1, budgets.2]);
        let effective = generator.effective_budgets();
        prop_assert!(effective[0] <= effective[1] && effective[1] <= effective[2]);

        let result = generator.generate(&files);
        prop_assert_eq!(result.tiers.len(), 3);

        let mut previous: BTreeSet<(String, usize)> = BTreeSet::new();
        for (level, tier) in &result.tiers {
            prop_assert_eq!(tier.budget, effective[*level as usize]);
            prop_assert!(tier.tokens_used <= tier.budget, "tier {} over budget", level);
            let sum: usize = tier.sections.iter().map(|s| s.tokens).sum();
            prop_assert_eq!(sum, tier.tokens_used);

            let current: BTreeSet<(String, usize)> =
                tier.sections.iter().map(|s| (s.file.clone(), s.index)).collect();
            prop_assert!(previous.is_subset(&current), "tier {} dropped a section", level);
            previous = current;
        }
    }

    #[test]
    fn excluded_sections_never_fit_the_remainder(
        files in arb_files(),
        budget in 0usize..600,
    ) {
        let result = TierGenerator::new([budget, budget, budget]).generate(&files);
        let full = TierGenerator::new([usize::MAX / 4; 3]).generate(&files);
        let tier = &result.tiers[&2];
        let chosen: BTreeSet<(String, usize)> =
            tier.sections.iter().map(|s| (s.file.clone(), s.index)).collect();

        // Sections are never truncated to squeeze in.
        prop_assert_eq!(full.tiers[&2].sections.len(), full.total_sections);
        for section in &full.tiers[&2].sections {
            if !chosen.contains(&(section.file.clone(), section.index)) {
                prop_assert!(tier.tokens_used + section.tokens > budget);
            }
        }
    }
}

// ── Dedup grouping ──────────────────────────────────────────────────────

fn group_sets(texts: &[&str], order: &[usize]) -> BTreeSet<BTreeSet<usize>> {
    let dedup = Deduplicator::new(0.5, SimilarityMeasure::WordLcs).unwrap();
    dedup
        .find_groups(texts)
        .into_iter()
        .map(|g| g.indices.into_iter().map(|i| order[i]).collect())
        .collect()
}

proptest! {
    #[test]
    fn groups_ignore_input_order(texts in prop::collection::vec(arb_sentence(), 0..8)) {
        let forward: Vec<&str> = texts.iter().map(String::as_str).collect();
        let reversed: Vec<&str> = forward.iter().rev().copied().collect();
        let forward_order: Vec<usize> = (0..texts.len()).collect();
        let reversed_order: Vec<usize> = (0..texts.len()).rev().collect();

        prop_assert_eq!(
            group_sets(&forward, &forward_order),
            group_sets(&reversed, &reversed_order)
        );
    }

    #[test]
    fn groups_partition_and_name_a_member(texts in prop::collection::vec(arb_sentence(), 0..8)) {
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let dedup = Deduplicator::new(0.5, SimilarityMeasure::WordLcs).unwrap();
        let mut seen = HashSet::new();
        for group in dedup.find_groups(&refs) {
            prop_assert!(group.indices.len() >= 2);
            prop_assert!(group.indices.contains(&group.canonical));
            prop_assert!(group.similarity >= 0.5 && group.similarity <= 1.0);
            for idx in group.indices {
                prop_assert!(seen.insert(idx), "index {} in two groups", idx);
            }
        }
    }
}
