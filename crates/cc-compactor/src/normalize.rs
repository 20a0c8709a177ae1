//! Markdown normalization: lossless-in-meaning cleanup passes.
//!
//! Structural passes never touch lines inside code fences. When a text has
//! an unclosed fence they return it unchanged.

use crate::similarity::char_lcs_ratio;
use cc_core::config::NormalizeConfig;
use cc_parser::{FenceMap, MarkdownParser, ParseWarning};
use regex::{Captures, Regex};
use std::collections::HashSet;
use std::sync::LazyLock;

const EMOJI_CLASS: &str = "\u{1F600}-\u{1F64F}\u{1F300}-\u{1F5FF}\u{1F680}-\u{1F6FF}\
     \u{1F1E0}-\u{1F1FF}\u{2702}-\u{27B0}\u{1F900}-\u{1F9FF}\
     \u{1FA00}-\u{1FA6F}\u{1FA70}-\u{1FAFF}\u{2600}-\u{26FF}";
const EMOJI_JOINERS: &str = "\u{FE0F}\u{200D}";

static RE_EMOJI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        "(?P<lead> *)[{e}][{j}]*(?: *[{e}][{j}]*)*(?P<trail> *)",
        e = EMOJI_CLASS,
        j = EMOJI_JOINERS,
    ))
    .unwrap()
});
static RE_TABLE_SEP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[|\s:\-]+$").unwrap());
static RE_BULLET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\s*[-*+]\s+)(.*)$").unwrap());

/// Full-width punctuation → ASCII mapping.
fn fullwidth_punct_map() -> Vec<(&'static str, &'static str)> {
    vec![
        ("\u{FF0C}", ","), ("\u{3002}", "."), ("\u{FF1B}", ";"),
        ("\u{FF1A}", ":"), ("\u{FF01}", "!"), ("\u{FF1F}", "?"),
        ("\u{201C}", "\""), ("\u{201D}", "\""), ("\u{2018}", "'"), ("\u{2019}", "'"),
        ("\u{FF08}", "("), ("\u{FF09}", ")"), ("\u{3010}", "["), ("\u{3011}", "]"),
        ("\u{3001}", ","), ("\u{2026}", "..."), ("\u{FF5E}", "~"),
    ]
}

/// Replace full-width punctuation with ASCII equivalents. Other CJK text is
/// left alone.
pub fn normalize_fullwidth_punct(text: &str) -> String {
    let mut result = text.replace("\u{2014}\u{2014}", "--");
    for (wide, ascii) in fullwidth_punct_map() {
        result = result.replace(wide, ascii);
    }
    result
}

/// Strip emoji runs. The spaces around a removed run collapse to a single
/// space, except that indentation before a run at the start of a line is
/// kept as is.
pub fn strip_emoji(text: &str) -> String {
    RE_EMOJI
        .replace_all(text, |caps: &Captures| {
            let Some(m) = caps.get(0) else { return String::new() };
            let (lead, trail) = (&caps["lead"], &caps["trail"]);
            let at_line_start = m.start() == 0 || text[..m.start()].ends_with('\n');
            if at_line_start && !lead.is_empty() {
                lead.to_string()
            } else if lead.is_empty() && trail.is_empty() {
                String::new()
            } else {
                " ".to_string()
            }
        })
        .into_owned()
}

/// Strip trailing whitespace per line and cap blank-line runs at two.
pub fn collapse_blank_runs(text: &str) -> String {
    let mut out = Vec::new();
    let mut blank_run = 0;
    for line in text.split('\n') {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 2 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push(line);
    }
    out.join("\n")
}

/// Table separator or horizontal rule, e.g. `|---|:--:|` or `---`.
fn is_separator_row(line: &str) -> bool {
    let line = line.trim();
    line.contains('-') && RE_TABLE_SEP.is_match(line)
}

/// Remove repeated non-blank lines, keeping the first. Lines are compared
/// trimmed. Separator rows and fenced lines are always kept.
pub fn dedup_exact_lines(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let fences = FenceMap::new(&lines);
    if !fences.is_balanced() {
        return text.to_string();
    }
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(lines.len());
    for (idx, line) in lines.iter().enumerate() {
        let key = line.trim();
        if key.is_empty() || fences.is_inside(idx) || is_separator_row(key) {
            out.push(*line);
            continue;
        }
        if seen.insert(key) {
            out.push(*line);
        }
    }
    out.join("\n")
}

fn split_cells(line: &str) -> Vec<String> {
    line.trim()
        .trim_matches('|')
        .split('|')
        .map(|c| c.trim().to_string())
        .collect()
}

fn render_table(headers: &[String], rows: &[Vec<String>]) -> Vec<String> {
    match headers.len() {
        0..=2 => rows
            .iter()
            .filter_map(|row| {
                let key = row.first().map(String::as_str).unwrap_or("");
                let value = row.get(1).map(String::as_str).unwrap_or("");
                (!key.is_empty() || !value.is_empty()).then(|| format!("- {key}: {value}"))
            })
            .collect(),
        3 | 4 => rows
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(ci, cell)| match headers.get(ci) {
                        Some(h) if ci > 0 => format!("{h}={cell}"),
                        _ => cell.clone(),
                    })
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .collect(),
        // A dash-only row would read as a separator on the next pass.
        _ => rows
            .iter()
            .map(|row| format!("| {} |", row.join(" | ")))
            .filter(|line| !is_separator_row(line))
            .collect(),
    }
}

/// Rewrite markdown tables into denser forms: two columns become `- k: v`
/// bullets, three or four become `key, h1=v1, h2=v2` lines, wider tables
/// lose their header and separator rows.
pub fn compact_tables(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let fences = FenceMap::new(&lines);
    if !fences.is_balanced() {
        return text.to_string();
    }
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        let starts_table = line.contains('|')
            && !fences.is_inside(i)
            && i + 1 < lines.len()
            && !fences.is_inside(i + 1)
            && lines[i + 1].contains('|')
            && is_separator_row(lines[i + 1]);
        if !starts_table {
            out.push(line.to_string());
            i += 1;
            continue;
        }

        let headers = split_cells(line);
        let mut rows = Vec::new();
        let mut j = i + 2;
        while j < lines.len()
            && !fences.is_inside(j)
            && lines[j].contains('|')
            && !lines[j].trim().is_empty()
        {
            rows.push(split_cells(lines[j]));
            j += 1;
        }
        out.extend(render_table(&headers, &rows));
        i = j;
    }
    out.join("\n")
}

/// Within each run of consecutive bullets, drop a bullet whose content is
/// near-identical (char LCS ratio >= `threshold`) to another; the longer
/// one survives, ties keep the earlier.
pub fn merge_similar_bullets(text: &str, threshold: f64) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let fences = FenceMap::new(&lines);
    if !fences.is_balanced() {
        return text.to_string();
    }
    let bullet_content = |idx: usize| -> Option<&str> {
        if fences.is_inside(idx) {
            return None;
        }
        RE_BULLET.captures(lines[idx]).and_then(|c| c.get(2)).map(|m| m.as_str().trim())
    };

    let mut drop = vec![false; lines.len()];
    let mut i = 0;
    while i < lines.len() {
        if bullet_content(i).is_none() {
            i += 1;
            continue;
        }
        let start = i;
        while i < lines.len() && bullet_content(i).is_some() {
            i += 1;
        }
        let run: Vec<(usize, &str)> = (start..i)
            .filter_map(|idx| bullet_content(idx).map(|c| (idx, c)))
            .collect();
        for a in 0..run.len() {
            if drop[run[a].0] {
                continue;
            }
            for b in a + 1..run.len() {
                if drop[run[b].0] {
                    continue;
                }
                let (ia, ca) = run[a];
                let (ib, cb) = run[b];
                if char_lcs_ratio(ca, cb) < threshold {
                    continue;
                }
                if cb.chars().count() > ca.chars().count() {
                    drop[ia] = true;
                    break;
                }
                drop[ib] = true;
            }
        }
    }

    lines
        .iter()
        .enumerate()
        .filter(|(idx, _)| !drop[*idx])
        .map(|(_, l)| *l)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Join runs of three or more short same-prefix bullets into one bullet per
/// `max_merge` items, e.g. `- a`, `- b`, `- c` → `- a, b, c`.
pub fn compact_short_bullets(text: &str, max_words: usize, max_merge: usize) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let fences = FenceMap::new(&lines);
    if !fences.is_balanced() {
        return text.to_string();
    }
    let max_merge = max_merge.max(1);
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    // (prefix, content, original line)
    let mut pending: Vec<(&str, &str, &str)> = Vec::new();

    fn flush(pending: &mut Vec<(&str, &str, &str)>, out: &mut Vec<String>) {
        if pending.len() >= 3 {
            let contents: Vec<&str> = pending.iter().map(|p| p.1).collect();
            out.push(format!("{}{}", pending[0].0, contents.join(", ")));
        } else {
            out.extend(pending.iter().map(|p| p.2.to_string()));
        }
        pending.clear();
    }

    for (idx, line) in lines.iter().enumerate() {
        let short = if fences.is_inside(idx) {
            None
        } else {
            RE_BULLET.captures(line).and_then(|c| {
                let prefix = c.get(1)?.as_str();
                let content = c.get(2)?.as_str().trim();
                let words = content.split_whitespace().count();
                (words > 0 && words <= max_words).then_some((prefix, content))
            })
        };
        match short {
            Some((prefix, content)) => {
                if pending.first().is_some_and(|p| p.0 != prefix) {
                    flush(&mut pending, &mut out);
                }
                pending.push((prefix, content, line));
                if pending.len() == max_merge {
                    flush(&mut pending, &mut out);
                }
            }
            None => {
                flush(&mut pending, &mut out);
                out.push(line.to_string());
            }
        }
    }
    flush(&mut pending, &mut out);
    out.join("\n")
}

/// Remove headed sections with nothing in them. A section goes when its body
/// is blank and every nested subsection goes too. The preamble always stays.
pub fn drop_empty_sections(text: &str) -> String {
    let doc = MarkdownParser::new().parse(text);
    if doc.is_degenerate() || doc.sections.is_empty() {
        return text.to_string();
    }
    let sections = &doc.sections;
    let mut keep = vec![true; sections.len()];
    for i in (0..sections.len()).rev() {
        let s = &sections[i];
        if s.is_preamble() || !s.is_body_blank() {
            continue;
        }
        let has_content = sections[i + 1..]
            .iter()
            .zip(&keep[i + 1..])
            .take_while(|(child, _)| child.level > s.level)
            .any(|(_, kept)| *kept);
        keep[i] = has_content;
    }
    if keep.iter().all(|k| *k) {
        return text.to_string();
    }
    sections
        .iter()
        .zip(&keep)
        .filter(|(_, k)| **k)
        .map(|(s, _)| s.render())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Result of a normalizer run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizeOutcome {
    pub text: String,
    pub warnings: Vec<ParseWarning>,
}

/// Ordered chain of the normalization passes.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    config: NormalizeConfig,
}

impl Normalizer {
    pub fn new(config: NormalizeConfig) -> Self {
        Self { config }
    }

    pub fn run(&self, text: &str) -> NormalizeOutcome {
        if text.is_empty() {
            return NormalizeOutcome::default();
        }
        let warnings = MarkdownParser::new().parse(text).warnings;
        let mut result = normalize_fullwidth_punct(text);
        result = strip_emoji(&result);
        result = collapse_blank_runs(&result);
        result = dedup_exact_lines(&result);
        result = compact_tables(&result);
        result = merge_similar_bullets(&result, self.config.bullet_similarity);
        result = compact_short_bullets(
            &result,
            self.config.short_bullet_max_words,
            self.config.short_bullet_max_merge,
        );
        result = drop_empty_sections(&result);
        tracing::debug!(before = text.len(), after = result.len(), "normalized text");
        NormalizeOutcome { text: result, warnings }
    }
}

/// Apply all passes with default settings.
pub fn normalize(text: &str) -> String {
    Normalizer::default().run(text).text
}
