//! Markdown parser with structure-aware section splitting.

use crate::fence::FenceMap;
use cc_core::{SectionRef, Tokenizer};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static RE_HEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.*)$").unwrap());

/// A heading plus the lines that follow it up to the next heading.
///
/// The preamble (lines before the first heading) has `level == 0` and an
/// empty header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub header: String,
    pub level: u8,
    /// Raw heading line as it appeared in the source. Empty for the preamble.
    pub heading_line: String,
    pub body: String,
    /// First line (0-based) covered by the section, heading included.
    pub start_line: usize,
    /// One past the last line covered by the section.
    pub end_line: usize,
}

impl Section {
    pub fn is_preamble(&self) -> bool {
        self.level == 0
    }

    pub fn is_body_blank(&self) -> bool {
        self.body.trim().is_empty()
    }

    /// Exact source text of the section.
    pub fn render(&self) -> String {
        if self.is_preamble() {
            self.body.clone()
        } else if self.end_line - self.start_line <= 1 {
            self.heading_line.clone()
        } else {
            format!("{}\n{}", self.heading_line, self.body)
        }
    }

    /// Normalized heading line (`## Header`), empty for the preamble.
    pub fn header_line(&self) -> String {
        if self.is_preamble() {
            String::new()
        } else {
            format!("{} {}", "#".repeat(self.level as usize), self.header)
        }
    }

    /// Body tokens plus the heading line as fixed per-section overhead.
    pub fn token_cost<T: Tokenizer + ?Sized>(&self, tokenizer: &T) -> usize {
        tokenizer.count(&self.body) + tokenizer.count(&self.header_line())
    }

    pub fn to_ref(&self, file: &str, index: usize, priority: f64, tokens: usize) -> SectionRef {
        SectionRef {
            file: file.to_string(),
            index,
            header: self.header.clone(),
            level: self.level,
            priority,
            tokens,
        }
    }
}

/// Recoverable parse problems. The document is still split into sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseWarning {
    /// A code fence opened on `line` (1-based) is never closed.
    UnbalancedFence { line: usize },
}

impl std::fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnbalancedFence { line } => {
                write!(f, "unclosed code fence opened on line {line}")
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDocument {
    pub sections: Vec<Section>,
    pub warnings: Vec<ParseWarning>,
}

impl ParsedDocument {
    /// True when the structure could not be parsed cleanly.
    pub fn is_degenerate(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Markdown parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownParser;

impl MarkdownParser {
    pub fn new() -> Self {
        Self
    }

    /// Find headings (excluding those inside code blocks) as
    /// `(line index, level, title)`.
    pub fn find_headings(&self, lines: &[&str], fences: &FenceMap) -> Vec<(usize, u8, String)> {
        lines
            .iter()
            .enumerate()
            .filter(|(idx, _)| !fences.is_inside(*idx))
            .filter_map(|(idx, line)| {
                let cap = RE_HEADING.captures(line)?;
                let level = cap[1].len() as u8;
                Some((idx, level, cap[2].trim().to_string()))
            })
            .collect()
    }

    pub fn parse(&self, text: &str) -> ParsedDocument {
        if text.is_empty() {
            return ParsedDocument::default();
        }

        let lines: Vec<&str> = text.split('\n').collect();
        let fences = FenceMap::new(&lines);
        let mut warnings = Vec::new();
        if let Some(line) = fences.unclosed {
            tracing::warn!(line, "markdown has an unclosed code fence");
            warnings.push(ParseWarning::UnbalancedFence { line });
        }

        let headings = self.find_headings(&lines, &fences);
        let mut sections = Vec::with_capacity(headings.len() + 1);

        let first_heading = headings.first().map(|h| h.0).unwrap_or(lines.len());
        if first_heading > 0 {
            sections.push(Section {
                header: String::new(),
                level: 0,
                heading_line: String::new(),
                body: lines[..first_heading].join("\n"),
                start_line: 0,
                end_line: first_heading,
            });
        }

        for (i, (start, level, title)) in headings.iter().enumerate() {
            let end = headings.get(i + 1).map(|h| h.0).unwrap_or(lines.len());
            sections.push(Section {
                header: title.clone(),
                level: *level,
                heading_line: lines[*start].to_string(),
                body: lines[start + 1..end].join("\n"),
                start_line: *start,
                end_line: end,
            });
        }

        ParsedDocument { sections, warnings }
    }
}

/// Parse `text` into sections, ignoring warnings.
pub fn parse_sections(text: &str) -> Vec<Section> {
    MarkdownParser::new().parse(text).sections
}

/// Join rendered sections back into a document.
pub fn reconstruct(sections: &[Section]) -> String {
    sections.iter().map(Section::render).collect::<Vec<_>>().join("\n")
}
