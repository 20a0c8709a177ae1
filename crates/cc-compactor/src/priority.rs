//! Section priority scoring for tier selection.
//!
//! `priority = depth + markers + recency`. Shallow headings outrank deep
//! ones, explicit `[p0]`/`[low]` style markers shift the score, and sections
//! from recently dated files get a bonus that decays weekly.

use cc_core::SourceFile;
use cc_parser::{date_from_filename, Section};
use chrono::NaiveDate;

const PREAMBLE_DEPTH: f64 = 6.0;
const RECENCY_MAX: f64 = 3.0;
const RECENCY_HALF_LIFE_DAYS: f64 = 7.0;

const POSITIVE_MARKERS: &[(&str, f64)] = &[
    ("[p0]", 10.0),
    ("[critical]", 10.0),
    ("[p1]", 5.0),
    ("[important]", 5.0),
    ("important:", 5.0),
    ("[p2]", 2.0),
];
const NEGATIVE_MARKERS: &[(&str, f64)] = &[("[p3]", -2.0), ("[low]", -2.0)];

/// `7 - level` for headings, 6 for the preamble.
pub fn depth_score(level: u8) -> f64 {
    if level == 0 {
        PREAMBLE_DEPTH
    } else {
        7.0 - level as f64
    }
}

/// Strongest positive marker plus strongest negative marker found in the
/// header or body, case-insensitively.
pub fn marker_score(section: &Section) -> f64 {
    let haystack = format!("{}\n{}", section.header, section.body).to_lowercase();
    strongest(&haystack, POSITIVE_MARKERS, f64::max)
        + strongest(&haystack, NEGATIVE_MARKERS, f64::min)
}

fn strongest(haystack: &str, markers: &[(&str, f64)], pick: fn(f64, f64) -> f64) -> f64 {
    markers
        .iter()
        .filter(|(m, _)| haystack.contains(*m))
        .map(|(_, w)| *w)
        .reduce(pick)
        .unwrap_or(0.0)
}

/// Scores sections relative to the newest dated file in a batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct Prioritizer {
    newest: Option<NaiveDate>,
}

impl Prioritizer {
    pub fn for_files(files: &[SourceFile]) -> Self {
        Self {
            newest: files.iter().filter_map(|f| date_from_filename(&f.name)).max(),
        }
    }

    /// `3 / (1 + days_behind / 7)`; 0 for undated files.
    pub fn recency(&self, file_name: &str) -> f64 {
        let (Some(newest), Some(date)) = (self.newest, date_from_filename(file_name)) else {
            return 0.0;
        };
        let days_behind = (newest - date).num_days().max(0) as f64;
        RECENCY_MAX / (1.0 + days_behind / RECENCY_HALF_LIFE_DAYS)
    }

    pub fn score(&self, file_name: &str, section: &Section) -> f64 {
        depth_score(section.level) + marker_score(section) + self.recency(file_name)
    }
}
