//! Markdown section parsing for Claw Compactor.
//!
//! Sections are the unit of dedup and tier inclusion. The parser keeps raw
//! lines so that rendering every section in order reproduces the input
//! byte-for-byte.

pub mod dates;
pub mod fence;
pub mod markdown;

pub use dates::date_from_filename;
pub use fence::{FenceMap, is_fence_line};
pub use markdown::{
    parse_sections, reconstruct, MarkdownParser, ParseWarning, ParsedDocument, Section,
};
