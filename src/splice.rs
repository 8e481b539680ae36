//! Splices extracted section content into a template document at its
//! placeholder positions.

use std::path::{Path, PathBuf};

use crate::media;
use crate::model::{Block, Document, EmbeddedImage, Paragraph, Run};
use crate::placeholder::{self, Placeholder, Site};
use crate::section::{SectionId, SectionMap};

/// Filename prefix and extension priority for per-section fallback icons:
/// `GHS<id>.<ext>`, first existing extension wins.
const ICON_PREFIX: &str = "GHS";
const ICON_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Resolves per-section fallback icon assets under a configured root.
/// Assets are read-only and external; a missing or unreadable asset only
/// means no fallback is inserted.
#[derive(Clone, Debug)]
pub struct IconLibrary {
    root: Option<PathBuf>,
}

impl IconLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        IconLibrary {
            root: Some(root.into()),
        }
    }

    /// Library that resolves nothing, for callers without icon assets.
    pub fn disabled() -> Self {
        IconLibrary { root: None }
    }

    pub fn resolve(&self, id: SectionId) -> Option<PathBuf> {
        let root = self.root.as_ref()?;
        ICON_EXTENSIONS
            .iter()
            .map(|ext| root.join(format!("{ICON_PREFIX}{id}.{ext}")))
            .find(|p| p.is_file())
    }

    /// A paragraph holding the section's icon at its physical size.
    /// Unreadable assets are logged and skipped; the merge is unaffected.
    fn icon_paragraph(&self, id: SectionId) -> Option<Paragraph> {
        let path = self.resolve(id)?;
        match load_icon(&path) {
            Some(image) => Some(Paragraph {
                runs: vec![Run::image(image)],
                ..Paragraph::default()
            }),
            None => {
                log::warn!("unreadable icon asset {}, skipping fallback", path.display());
                None
            }
        }
    }
}

fn load_icon(path: &Path) -> Option<EmbeddedImage> {
    let data = std::fs::read(path).ok()?;
    let (pixel_width, pixel_height, format) = media::image_dimensions(&data)?;
    let (width_in, height_in) = media::size_in_inches(&data)?;
    Some(EmbeddedImage {
        data,
        format,
        pixel_width,
        pixel_height,
        display_width: width_in * 72.0,
        display_height: height_in * 72.0,
    })
}

/// Replace every placeholder in `template` with deep copies of the matching
/// section's blocks. The section map is read-only; the template is consumed
/// and returned merged. Deterministic: identical inputs produce structurally
/// identical outputs.
///
/// A placeholder whose id has no section entry merges to "placeholder
/// removed, nothing inserted" — the fallback icon is still attempted, so a
/// known pictogram can stand in for a section the renderer lost entirely.
pub fn merge(sections: &SectionMap, mut template: Document, icons: &IconLibrary) -> Document {
    let placeholders = placeholder::locate(&template);
    log::debug!("located {} placeholders", placeholders.len());

    // The snapshot is in document order; applying rear-to-front keeps every
    // recorded index valid without bookkeeping, and yields the same tree as
    // front-to-back application since placeholders are distinct nodes.
    for ph in placeholders.iter().rev() {
        apply(&mut template, ph, sections, icons);
    }
    template
}

fn apply(template: &mut Document, ph: &Placeholder, sections: &SectionMap, icons: &IconLibrary) {
    let body = sections.get(ph.id).unwrap_or(&[]);
    if body.is_empty() && !sections.contains(ph.id) {
        log::debug!("no section content for placeholder {}", ph.id);
    }

    let container: &mut Vec<Block> = match ph.site {
        Site::Body { .. } => &mut template.blocks,
        Site::Cell {
            table, row, cell, ..
        } => {
            let Some(Block::Table(t)) = template.blocks.get_mut(table) else {
                return;
            };
            let Some(c) = t.rows.get_mut(row).and_then(|r| r.cells.get_mut(cell)) else {
                return;
            };
            &mut c.blocks
        }
    };
    let index = match ph.site {
        Site::Body { index } | Site::Cell { index, .. } => index,
    };
    if index >= container.len() {
        return;
    }

    container.remove(index);
    let mut at = index;
    for block in body {
        container.insert(at, block.clone());
        at += 1;
    }

    let has_image = body.iter().any(Block::has_inline_image);
    if !has_image && let Some(icon) = icons.icon_paragraph(ph.id) {
        log::debug!("inserting fallback icon for section {}", ph.id);
        container.insert(at, Block::Paragraph(icon));
    }
}
