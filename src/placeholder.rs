//! Locates `{SECTION_<n>}` / `{{SECTION_<n>}}` placeholder tokens in a
//! template document.
//!
//! Locating is a read-only pass producing an immutable snapshot of
//! positions; the splice engine applies removals and insertions afterwards,
//! so tree mutation never invalidates an in-progress traversal.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::{Block, Document};
use crate::section::SectionId;

/// Double-brace alternative first so `{{SECTION_3}}` binds both braces
/// instead of matching the single-brace form with a stray `{` around it.
/// Inner spaces around the `_` and the digits are tolerated; the keyword is
/// case-insensitive. The regex crate has no backreferences, so matching
/// brace counts are enforced by the alternation.
static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\{\{\s*section\s*[_ ]?\s*(\d+)\s*\}\}|\{\s*section\s*[_ ]?\s*(\d+)\s*\}",
    )
    .unwrap()
});

/// Where a placeholder paragraph sits in the template tree.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Site {
    /// Index into the document's top-level block sequence.
    Body { index: usize },
    /// Paragraph inside a table cell: top-level block index of the table,
    /// then row / cell / block-within-cell indices.
    Cell {
        table: usize,
        row: usize,
        cell: usize,
        index: usize,
    },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placeholder {
    pub id: SectionId,
    pub site: Site,
}

/// Scan one node's flattened text for a placeholder token. Only the first
/// match is reported; templates carry one placeholder per paragraph by
/// convention, and anything after the first is ignored rather than guessed
/// at.
pub fn find_token(text: &str) -> Option<SectionId> {
    let caps = PLACEHOLDER_RE.captures(text)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .and_then(|m| m.as_str().parse().ok())
}

/// All placeholders in the template, in document order. Paragraphs nested
/// inside table cells are scanned too, after the blocks that precede their
/// table.
pub fn locate(template: &Document) -> Vec<Placeholder> {
    let mut found = Vec::new();
    for (index, block) in template.blocks.iter().enumerate() {
        match block {
            Block::Paragraph(p) => {
                if let Some(id) = find_token(&p.text()) {
                    found.push(Placeholder {
                        id,
                        site: Site::Body { index },
                    });
                }
            }
            Block::Table(t) => {
                for (ri, row) in t.rows.iter().enumerate() {
                    for (ci, cell) in row.cells.iter().enumerate() {
                        for (bi, cb) in cell.blocks.iter().enumerate() {
                            if let Block::Paragraph(p) = cb
                                && let Some(id) = find_token(&p.text())
                            {
                                found.push(Placeholder {
                                    id,
                                    site: Site::Cell {
                                        table: index,
                                        row: ri,
                                        cell: ci,
                                        index: bi,
                                    },
                                });
                            }
                        }
                    }
                }
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Paragraph, Run, Table, TableCell, TableRow};

    fn para(text: &str) -> Block {
        Block::Paragraph(Paragraph {
            runs: vec![Run::text(text)],
            ..Paragraph::default()
        })
    }

    #[test]
    fn single_and_double_brace_forms_match() {
        assert_eq!(find_token("{SECTION_4}"), Some(4));
        assert_eq!(find_token("{{SECTION_4}}"), Some(4));
        assert_eq!(find_token("{{section 12}}"), Some(12));
        assert_eq!(find_token("{ Section_7 }"), Some(7));
        assert_eq!(find_token("{{ SECTION _ 2 }}"), Some(2));
    }

    #[test]
    fn token_may_sit_mid_text() {
        assert_eq!(find_token("insert here: {{SECTION_3}} please"), Some(3));
    }

    #[test]
    fn only_the_first_token_is_reported() {
        assert_eq!(find_token("{{SECTION_1}} {{SECTION_2}}"), Some(1));
    }

    #[test]
    fn non_tokens_do_not_match() {
        assert_eq!(find_token("SECTION_4"), None);
        assert_eq!(find_token("{SECTION_}"), None);
        assert_eq!(find_token("{CHAPTER_4}"), None);
        assert_eq!(find_token("plain text"), None);
    }

    #[test]
    fn locate_walks_body_and_table_cells_in_document_order() {
        let template = Document {
            blocks: vec![
                para("Title"),
                para("{{SECTION_1}}"),
                Block::Table(Table {
                    col_widths: vec![100.0],
                    rows: vec![TableRow {
                        cells: vec![TableCell {
                            width: 100.0,
                            grid_span: 1,
                            shading: None,
                            blocks: vec![para("{SECTION_2}")],
                        }],
                    }],
                }),
                para("{{ SECTION_3 }}"),
            ],
        };
        let found = locate(&template);
        assert_eq!(
            found,
            vec![
                Placeholder {
                    id: 1,
                    site: Site::Body { index: 1 }
                },
                Placeholder {
                    id: 2,
                    site: Site::Cell {
                        table: 2,
                        row: 0,
                        cell: 0,
                        index: 0
                    }
                },
                Placeholder {
                    id: 3,
                    site: Site::Body { index: 3 }
                },
            ]
        );
    }

    #[test]
    fn text_split_across_runs_still_matches() {
        let p = Paragraph {
            runs: vec![Run::text("{{SEC"), Run::text("TION_5}}")],
            ..Paragraph::default()
        };
        assert_eq!(find_token(&p.text()), Some(5));
    }
}
