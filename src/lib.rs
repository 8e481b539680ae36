mod docx;
mod error;
mod media;
mod section;
mod splice;

pub mod header;
pub mod model;
pub mod placeholder;

pub use docx::writer::{to_bytes, write};
pub use docx::{parse, parse_bytes};
pub use error::Error;
pub use placeholder::{Placeholder, Site};
pub use section::{SectionId, SectionMap, partition};
pub use splice::{IconLibrary, merge};

use std::path::Path;
use std::time::Instant;

/// Extract the section map from a rendered source document.
pub fn extract_sections(raw: &Path) -> Result<SectionMap, Error> {
    let doc = docx::parse(raw)?;
    Ok(section::partition(&doc))
}

/// Full per-document pipeline: partition the rendered source, splice its
/// sections into a fresh copy of the template, and write the merged output.
///
/// The template is re-read for every call; merges never accumulate into a
/// shared template tree.
pub fn merge_docx(
    raw: &Path,
    template: &Path,
    icons_dir: &Path,
    output: &Path,
) -> Result<(), Error> {
    let t0 = Instant::now();

    let source = docx::parse(raw)?;
    let sections = section::partition(&source);
    let t_partition = t0.elapsed();

    let template_doc = docx::parse(template)?;
    let icons = IconLibrary::new(icons_dir);
    let merged = splice::merge(&sections, template_doc, &icons);
    let t_merge = t0.elapsed();

    docx::writer::write(&merged, output)?;
    let t_total = t0.elapsed();

    log::info!(
        "Timing: partition={:.1}ms ({} sections), merge={:.1}ms, write={:.1}ms, total={:.1}ms",
        t_partition.as_secs_f64() * 1000.0,
        sections.len(),
        (t_merge - t_partition).as_secs_f64() * 1000.0,
        (t_total - t_merge).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
    );

    Ok(())
}
