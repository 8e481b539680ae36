//! Partitions a rendered document into per-section block sequences.
//!
//! A section opens at a recognized header (see [`crate::header`]) and runs
//! to the next header or end of document. Headers may also arrive embedded
//! in a table row when the renderer fuses a heading banner onto the table
//! that follows it; such tables are split at the header row so only the body
//! rows are carried into the section.

use std::collections::BTreeMap;

use crate::header;
use crate::model::{Block, Document, Table};

pub type SectionId = u32;

/// Ordered per-section body blocks, keyed by section id. Built once per
/// source document by [`partition`] and read-only afterwards; the splice
/// engine only ever clones blocks out of it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SectionMap {
    sections: BTreeMap<SectionId, Vec<Block>>,
}

impl SectionMap {
    pub fn new() -> Self {
        SectionMap::default()
    }

    /// Ensure an entry exists for `id` without appending anything. A header
    /// with no following body is a valid, empty section.
    pub fn open(&mut self, id: SectionId) {
        self.sections.entry(id).or_default();
    }

    pub fn push(&mut self, id: SectionId, block: Block) {
        self.sections.entry(id).or_default().push(block);
    }

    pub fn get(&self, id: SectionId) -> Option<&[Block]> {
        self.sections.get(&id).map(Vec::as_slice)
    }

    pub fn contains(&self, id: SectionId) -> bool {
        self.sections.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SectionId, &[Block])> {
        self.sections.iter().map(|(id, blocks)| (*id, blocks.as_slice()))
    }
}

/// Partitioner state: either no section has opened yet (pre-header content
/// is out of scope and discarded) or the given id is collecting body blocks.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
enum Cursor {
    #[default]
    Closed,
    Open(SectionId),
}

/// Walk the document's top-level blocks in order and group them into
/// sections. The header block itself never lands in any body sequence. A
/// header id appearing a second time (a section split across a page
/// boundary in the rendered source) re-opens the same id and keeps
/// appending to it.
pub fn partition(doc: &Document) -> SectionMap {
    let mut map = SectionMap::new();
    let mut cursor = Cursor::default();

    for block in &doc.blocks {
        match block {
            Block::Paragraph(p) => {
                if let Some(id) = header::classify(&p.text()) {
                    cursor = Cursor::Open(id);
                    map.open(id);
                } else if let Cursor::Open(id) = cursor {
                    map.push(id, block.clone());
                }
            }
            Block::Table(t) => match find_header_row(t) {
                Some((row_idx, id)) => {
                    cursor = Cursor::Open(id);
                    map.open(id);
                    if let Some(body) = split_below(t, row_idx) {
                        map.push(id, Block::Table(body));
                    }
                    log::debug!(
                        "table header for section {} at row {} ({} body rows)",
                        id,
                        row_idx,
                        t.rows.len() - row_idx - 1
                    );
                }
                None => {
                    if let Cursor::Open(id) = cursor {
                        map.push(id, block.clone());
                    }
                }
            },
        }
    }

    map
}

/// First row containing a header match in any cell, scanned row-major.
fn find_header_row(table: &Table) -> Option<(usize, SectionId)> {
    for (row_idx, row) in table.rows.iter().enumerate() {
        for cell in &row.cells {
            for block in &cell.blocks {
                if let Block::Paragraph(p) = block
                    && let Some(id) = header::classify(&p.text())
                {
                    return Some((row_idx, id));
                }
            }
        }
    }
    None
}

/// Copy of `table` holding only the rows strictly below `header_row`.
/// Returns `None` when no body rows remain — the original table is not a
/// usable fallback there, since it still carries the header banner and
/// would duplicate the heading downstream.
fn split_below(table: &Table, header_row: usize) -> Option<Table> {
    if header_row + 1 >= table.rows.len() {
        return None;
    }
    Some(Table {
        col_widths: table.col_widths.clone(),
        rows: table.rows[header_row + 1..].to_vec(),
    })
}
