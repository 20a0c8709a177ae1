//! Dictionary encoding: high-frequency phrase → short code mapping.
//!
//! Codes look like `$AA`..`$ZZ`, then `$AAA`..`$ZZZ`. Every literal `$` in
//! the input is escaped as `\0\x01` and every NUL as `\0\x02`, so a `$` in
//! compressed text always starts a code. Phrases may not contain any of the
//! three reserved characters.
//!
//! For every text `t` and codebook `cb`:
//! `decompress(compress(t, cb), cb) == t`.

use cc_core::config::CodebookConfig;
use cc_core::{CompactError, Result};
use rayon::prelude::*;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::LazyLock;

pub const CODEBOOK_VERSION: u32 = 1;
/// `$AA..$ZZ` plus `$AAA..$ZZZ`.
pub const MAX_CODES: usize = 26 * 26 + 26 * 26 * 26;

const ESCAPE: char = '\u{0}';
const ESCAPED_DOLLAR: char = '\u{1}';
const ESCAPED_ESCAPE: char = '\u{2}';
const RESERVED: [char; 3] = [ESCAPE, ESCAPED_DOLLAR, ESCAPED_ESCAPE];

const NGRAM_MIN: usize = 2;
const NGRAM_MAX: usize = 5;
const PREFIX_MIN_FREQ: usize = 2;
const PATH_MIN_COMPONENTS: usize = 3;

static RE_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\$[A-Z]{2,3}$").unwrap());
static RE_IP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})\b").unwrap());
static RE_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(/[A-Za-z0-9_.~-]+){3,}").unwrap());

/// The `idx`-th code in assignment order.
fn code_at(idx: usize) -> Option<String> {
    let letter = |n: usize| (b'A' + n as u8) as char;
    if idx < 26 * 26 {
        Some(format!("${}{}", letter(idx / 26), letter(idx % 26)))
    } else if idx < MAX_CODES {
        let i = idx - 26 * 26;
        Some(format!("${}{}{}", letter(i / 676), letter(i / 26 % 26), letter(i % 26)))
    } else {
        None
    }
}

/// Generate N short codes: $AA..$ZZ, then $AAA.. (capped at [`MAX_CODES`]).
pub fn generate_codes(n: usize) -> Vec<String> {
    (0..n.min(MAX_CODES)).filter_map(code_at).collect()
}

pub fn is_code(s: &str) -> bool {
    RE_CODE.is_match(s)
}

fn has_reserved(phrase: &str) -> bool {
    phrase.contains(RESERVED)
}

/// Validated code → phrase mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Codebook {
    version: u32,
    entries: BTreeMap<String, String>,
}

impl Default for Codebook {
    fn default() -> Self {
        Self {
            version: CODEBOOK_VERSION,
            entries: BTreeMap::new(),
        }
    }
}

impl Codebook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(code, phrase)` pairs. Fails on a malformed code, an empty
    /// phrase, a phrase with a reserved character, or a code or phrase that
    /// appears twice.
    pub fn from_entries<I, C, P>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (C, P)>,
        C: Into<String>,
        P: Into<String>,
    {
        let mut entries = BTreeMap::new();
        let mut phrases = BTreeSet::new();
        for (code, phrase) in pairs {
            let (code, phrase) = (code.into(), phrase.into());
            if !is_code(&code) {
                return Err(CompactError::InvalidCodebook(format!("malformed code {code:?}")));
            }
            if phrase.is_empty() {
                return Err(CompactError::InvalidCodebook(format!("empty phrase for {code}")));
            }
            if has_reserved(&phrase) {
                return Err(CompactError::InvalidCodebook(format!(
                    "phrase for {code} contains a reserved control character"
                )));
            }
            if !phrases.insert(phrase.clone()) {
                return Err(CompactError::InvalidCodebook(format!(
                    "phrase {phrase:?} mapped twice"
                )));
            }
            if entries.insert(code.clone(), phrase).is_some() {
                return Err(CompactError::InvalidCodebook(format!("code {code} defined twice")));
            }
        }
        Ok(Self {
            version: CODEBOOK_VERSION,
            entries,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, code: &str) -> Option<&str> {
        self.entries.get(code).map(String::as_str)
    }

    pub fn contains_code(&self, code: &str) -> bool {
        self.entries.contains_key(code)
    }

    /// `(code, phrase)` pairs in code order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(c, p)| (c.as_str(), p.as_str()))
    }

    /// Characters the codebook itself costs to ship: code, phrase, and two
    /// separators per entry.
    pub fn overhead_chars(&self) -> usize {
        self.iter()
            .map(|(c, p)| c.chars().count() + p.chars().count() + 2)
            .sum()
    }

    /// Longest code spelled by the leading uppercase letters of `rest`
    /// (the text right after a `$`). Returns `(letters consumed, code, phrase)`.
    fn code_prefix(&self, rest: &str) -> Option<(usize, &str, &str)> {
        let letters = rest.bytes().take(3).take_while(u8::is_ascii_uppercase).count();
        (2..=letters).rev().find_map(|len| {
            let code = format!("${}", &rest[..len]);
            self.entries
                .get_key_value(&code)
                .map(|(c, p)| (len, c.as_str(), p.as_str()))
        })
    }

    /// Accepts `{"version": 1, "entries": {...}}` with entries keyed either
    /// by code or by phrase. Orientation is detected from the first key.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| CompactError::InvalidCodebook(format!("malformed JSON: {e}")))?;
        let obj = value
            .as_object()
            .ok_or_else(|| CompactError::InvalidCodebook("expected a JSON object".into()))?;
        if let Some(version) = obj.get("version") {
            if version.as_u64() != Some(CODEBOOK_VERSION as u64) {
                return Err(CompactError::InvalidCodebook(format!(
                    "unsupported version {version}"
                )));
            }
        }
        let entries = obj
            .get("entries")
            .and_then(|e| e.as_object())
            .ok_or_else(|| CompactError::InvalidCodebook("missing \"entries\" object".into()))?;

        let mut pairs = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            let value = value.as_str().ok_or_else(|| {
                CompactError::InvalidCodebook(format!("value for {key:?} is not a string"))
            })?;
            pairs.push((key.as_str(), value));
        }
        let code_keyed = entries.keys().next().is_none_or(|k| is_code(k));
        if code_keyed {
            Self::from_entries(pairs)
        } else {
            Self::from_entries(pairs.into_iter().map(|(phrase, code)| (code, phrase)))
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}

/// Count word n-grams (n = 2..=5) of at least `min_len` characters.
fn count_ngrams(text: &str, min_len: usize) -> HashMap<String, usize> {
    let mut counter: HashMap<String, usize> = HashMap::new();
    let words: Vec<&str> = text.split_whitespace().collect();
    for n in NGRAM_MIN..=NGRAM_MAX {
        for window in words.windows(n) {
            let gram = window.join(" ");
            if gram.chars().count() >= min_len {
                *counter.entry(gram).or_insert(0) += 1;
            }
        }
    }
    counter
}

fn merge_counts(
    mut a: HashMap<String, usize>,
    mut b: HashMap<String, usize>,
) -> HashMap<String, usize> {
    if a.len() < b.len() {
        std::mem::swap(&mut a, &mut b);
    }
    for (k, v) in b {
        *a.entry(k).or_insert(0) += v;
    }
    a
}

/// `a.b.c.` prefixes of IPv4-looking addresses seen at least twice.
fn ip_prefixes<S: AsRef<str>>(texts: &[S]) -> HashMap<String, usize> {
    let mut counter: HashMap<String, usize> = HashMap::new();
    for text in texts {
        for cap in RE_IP.captures_iter(text.as_ref()) {
            let ip = &cap[1];
            if let Some(dot) = ip.rfind('.') {
                *counter.entry(ip[..=dot].to_string()).or_insert(0) += 1;
            }
        }
    }
    counter.retain(|_, c| *c >= PREFIX_MIN_FREQ);
    counter
}

/// Leading-component prefixes (3 or more components) of absolute paths,
/// seen at least twice.
fn path_prefixes<S: AsRef<str>>(texts: &[S]) -> HashMap<String, usize> {
    let mut counter: HashMap<String, usize> = HashMap::new();
    for text in texts {
        for m in RE_PATH.find_iter(text.as_ref()) {
            let components: Vec<&str> = m.as_str().split('/').skip(1).collect();
            for k in PATH_MIN_COMPONENTS..=components.len() {
                *counter.entry(format!("/{}", components[..k].join("/"))).or_insert(0) += 1;
            }
        }
    }
    counter.retain(|_, c| *c >= PREFIX_MIN_FREQ);
    counter
}

/// Build a codebook from text samples.
///
/// Candidates are ranked by `count × length`; a candidate that is a
/// substring or superstring of an already chosen phrase is skipped. The
/// result is deterministic for a given input.
pub fn build_codebook<S: AsRef<str> + Sync>(texts: &[S], config: &CodebookConfig) -> Codebook {
    let max_entries = config.max_entries.min(MAX_CODES);
    if texts.is_empty() || max_entries == 0 {
        return Codebook::new();
    }

    let ngrams = texts
        .par_iter()
        .map(|t| count_ngrams(t.as_ref(), config.min_phrase_len))
        .reduce(HashMap::new, merge_counts);

    let mut combined = ngrams;
    for (phrase, count) in ip_prefixes(texts).into_iter().chain(path_prefixes(texts)) {
        let slot = combined.entry(phrase).or_insert(0);
        *slot = (*slot).max(count);
    }

    let mut candidates: Vec<(String, usize, usize)> = combined
        .into_iter()
        .filter_map(|(phrase, count)| {
            let len = phrase.chars().count();
            let keep = count >= config.min_freq
                && len >= config.min_phrase_len
                && !has_reserved(&phrase);
            keep.then_some((phrase, count, len))
        })
        .collect();
    candidates.sort_by(|a, b| (b.1 * b.2).cmp(&(a.1 * a.2)).then_with(|| a.0.cmp(&b.0)));
    let candidate_count = candidates.len();

    let mut chosen: Vec<String> = Vec::new();
    for (phrase, _, _) in candidates {
        let overlaps = chosen
            .iter()
            .any(|existing| {
                phrase.contains(existing.as_str()) || existing.contains(phrase.as_str())
            });
        if overlaps {
            continue;
        }
        chosen.push(phrase);
        if chosen.len() >= max_entries {
            break;
        }
    }

    let entries: BTreeMap<String, String> = chosen
        .into_iter()
        .enumerate()
        .filter_map(|(i, phrase)| code_at(i).map(|code| (code, phrase)))
        .collect();
    tracing::debug!(candidates = candidate_count, selected = entries.len(), "built codebook");
    Codebook {
        version: CODEBOOK_VERSION,
        entries,
    }
}

enum Piece<'a> {
    Lit(&'a str),
    Code(&'a str),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Tok<'a> {
    Ch(char),
    Code(&'a str),
}

fn substitute<'a>(pieces: Vec<Piece<'a>>, code: &'a str, phrase: &str) -> Vec<Piece<'a>> {
    let mut out = Vec::with_capacity(pieces.len());
    for piece in pieces {
        match piece {
            Piece::Lit(s) if s.contains(phrase) => {
                let mut last = 0;
                for (idx, _) in s.match_indices(phrase) {
                    if idx > last {
                        out.push(Piece::Lit(&s[last..idx]));
                    }
                    out.push(Piece::Code(code));
                    last = idx + phrase.len();
                }
                if last < s.len() {
                    out.push(Piece::Lit(&s[last..]));
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Compress text using the codebook. Longer phrases are replaced first.
///
/// Phrases are matched against the raw text and escaping happens on
/// output; since phrases hold no reserved characters this is the same as
/// matching escaped phrases against escaped text.
pub fn compress(text: &str, codebook: &Codebook) -> String {
    if text.is_empty() || codebook.is_empty() {
        return text.to_string();
    }

    let mut ordered: Vec<(&str, &str)> = codebook.iter().collect();
    ordered.sort_by(|a, b| {
        b.1.chars().count().cmp(&a.1.chars().count()).then_with(|| a.0.cmp(b.0))
    });
    let mut pieces = vec![Piece::Lit(text)];
    for (code, phrase) in ordered {
        pieces = substitute(pieces, code, phrase);
    }

    let mut toks: Vec<Tok<'_>> = Vec::with_capacity(text.len());
    for piece in &pieces {
        match piece {
            Piece::Lit(s) => toks.extend(s.chars().map(Tok::Ch)),
            Piece::Code(c) => toks.push(Tok::Code(c)),
        }
    }

    // A two-letter code followed by a letter that extends it to another
    // code would decode wrongly; put the phrase back. Right to left so each
    // check sees its final successor.
    for i in (0..toks.len()).rev() {
        let Tok::Code(code) = toks[i] else { continue };
        let clash = code.len() == 3
            && matches!(toks.get(i + 1), Some(Tok::Ch(c))
                if c.is_ascii_uppercase() && codebook.contains_code(&format!("{code}{c}")));
        if clash {
            let phrase = codebook.get(code).unwrap_or_default();
            toks.splice(i..=i, phrase.chars().map(Tok::Ch));
        }
    }

    let mut out = String::with_capacity(text.len());
    for tok in &toks {
        match *tok {
            Tok::Code(code) => out.push_str(code),
            Tok::Ch(ESCAPE) => {
                out.push(ESCAPE);
                out.push(ESCAPED_ESCAPE);
            }
            Tok::Ch('$') => {
                out.push(ESCAPE);
                out.push(ESCAPED_DOLLAR);
            }
            Tok::Ch(c) => out.push(c),
        }
    }
    out
}

/// Single left-to-right decode. `on_code` sees every code expanded.
fn decode(text: &str, codebook: &Codebook, mut on_code: impl FnMut(&str)) -> String {
    let mut out = String::with_capacity(text.len() * 2);
    let mut rest = text;
    while let Some(pos) = rest.find(['$', ESCAPE]) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if let Some(after) = tail.strip_prefix('$') {
            match codebook.code_prefix(after) {
                Some((len, code, phrase)) => {
                    on_code(code);
                    out.push_str(phrase);
                    rest = &after[len..];
                }
                None => {
                    out.push('$');
                    rest = after;
                }
            }
        } else {
            let after = &tail[ESCAPE.len_utf8()..];
            if let Some(r) = after.strip_prefix(ESCAPED_DOLLAR) {
                out.push('$');
                rest = r;
            } else if let Some(r) = after.strip_prefix(ESCAPED_ESCAPE) {
                out.push(ESCAPE);
                rest = r;
            } else {
                out.push(ESCAPE);
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Decompress text using the codebook.
pub fn decompress(text: &str, codebook: &Codebook) -> String {
    if text.is_empty() || codebook.is_empty() {
        return text.to_string();
    }
    decode(text, codebook, |_| {})
}

/// Distinct codes that `decompress` would expand in `text`.
pub fn codes_used<'a>(text: &str, codebook: &'a Codebook) -> BTreeSet<&'a str> {
    let mut used = BTreeSet::new();
    if codebook.is_empty() {
        return used;
    }
    decode(text, codebook, |code| {
        if let Some((c, _)) = codebook.entries.get_key_value(code) {
            used.insert(c.as_str());
        }
    });
    used
}

/// `compress`, then prove the result decodes back to `text`.
pub fn compress_verified(text: &str, codebook: &Codebook) -> Result<String> {
    let compressed = compress(text, codebook);
    let restored = decompress(&compressed, codebook);
    if restored != text {
        let first_mismatch = text
            .bytes()
            .zip(restored.bytes())
            .position(|(a, b)| a != b)
            .unwrap_or_else(|| text.len().min(restored.len()));
        tracing::warn!(first_mismatch, "dictionary round-trip mismatch");
        return Err(CompactError::RoundTripViolation {
            original_len: text.len(),
            restored_len: restored.len(),
            first_mismatch,
        });
    }
    Ok(compressed)
}
