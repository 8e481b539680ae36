//! Header detection for section openers in rendered source documents.
//!
//! PDF-to-DOCX rendering injects stray bullet glyphs, list numbering, and
//! inconsistent punctuation around headings, so the matcher is permissive on
//! leading noise but strict on keyword + digits. The match is anchored at
//! line start; body text that merely mentions "Section" mid-sentence never
//! classifies as a header.

use std::sync::LazyLock;

use regex::Regex;

/// `[noise] (Abschnitt|Section)[.] <digits> [:|.|-|–]`, case-insensitive.
/// Noise is any run of whitespace, digits, bullets, or list punctuation.
static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[\s\d•*\-–.]*(?:abschnitt|section)\.?\s+(\d+)\s*[:.\-–]?").unwrap()
});

/// Classify a block's text as a section header. Returns the section id as
/// canonical decimal (leading zeros fall away in the numeric parse), or
/// `None` for anything that does not match — including near-misses such as
/// a keyword with no digits, which are deliberately treated as plain body
/// text rather than errors.
pub fn classify(text: &str) -> Option<u32> {
    let caps = HEADER_RE.captures(text)?;
    caps[1].parse().ok()
}
