pub mod writer;

use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::path::Path;

use crate::error::Error;
use crate::model::{
    Alignment, Block, Document, EmbeddedImage, Paragraph, Run, Table, TableCell, TableRow,
};

pub(crate) const WML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub(crate) const DML_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
pub(crate) const WPD_NS: &str =
    "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
pub(crate) const REL_NS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

type Archive<'a> = zip::ZipArchive<Cursor<&'a [u8]>>;

pub(crate) fn twips_to_pts(twips: f32) -> f32 {
    twips / 20.0
}

pub(crate) fn parse_hex_color(val: &str) -> Option<[u8; 3]> {
    if val == "auto" || val.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&val[0..2], 16).ok()?;
    let g = u8::from_str_radix(&val[2..4], 16).ok()?;
    let b = u8::from_str_radix(&val[4..6], 16).ok()?;
    Some([r, g, b])
}

/// Parse a WML boolean toggle element (e.g., w:b, w:i).
/// Present with no val or val != "0"/"false" means true.
fn wml_bool(parent: roxmltree::Node, name: &str) -> Option<bool> {
    wml(parent, name).map(|n| {
        n.attribute((WML_NS, "val"))
            .is_none_or(|v| v != "0" && v != "false")
    })
}

fn wml<'a>(node: roxmltree::Node<'a, 'a>, name: &str) -> Option<roxmltree::Node<'a, 'a>> {
    node.children()
        .find(|n| n.tag_name().name() == name && n.tag_name().namespace() == Some(WML_NS))
}

fn wml_attr<'a>(node: roxmltree::Node<'a, 'a>, child: &str) -> Option<&'a str> {
    wml(node, child).and_then(|n| n.attribute((WML_NS, "val")))
}

fn twips_attr(node: roxmltree::Node, attr: &str) -> Option<f32> {
    node.attribute((WML_NS, attr))
        .and_then(|v| v.parse::<f32>().ok())
        .map(twips_to_pts)
}

/// Flatten SDT wrappers: descend into w:sdtContent and collect effective
/// children in document order.
fn collect_block_nodes<'a>(parent: roxmltree::Node<'a, 'a>) -> Vec<roxmltree::Node<'a, 'a>> {
    let mut nodes = Vec::new();
    for child in parent.children() {
        if child.tag_name().name() == "sdt" && child.tag_name().namespace() == Some(WML_NS) {
            if let Some(content) = wml(child, "sdtContent") {
                nodes.extend(collect_block_nodes(content));
            }
        } else {
            nodes.push(child);
        }
    }
    nodes
}

fn read_zip_text(zip: &mut Archive, name: &str) -> Option<String> {
    let mut content = String::new();
    zip.by_name(name).ok()?.read_to_string(&mut content).ok()?;
    Some(content)
}

fn parse_relationships(zip: &mut Archive) -> HashMap<String, String> {
    let mut rels = HashMap::new();
    let Some(xml_content) = read_zip_text(zip, "word/_rels/document.xml.rels") else {
        return rels;
    };
    let Ok(xml) = roxmltree::Document::parse(&xml_content) else {
        return rels;
    };
    for node in xml.root_element().children() {
        if node.tag_name().name() == "Relationship"
            && let (Some(id), Some(target)) = (node.attribute("Id"), node.attribute("Target"))
        {
            rels.insert(id.to_string(), target.to_string());
        }
    }
    rels
}

fn find_blip_embed<'a>(container: roxmltree::Node<'a, 'a>) -> Option<&'a str> {
    container
        .descendants()
        .find(|n| n.tag_name().name() == "blip" && n.tag_name().namespace() == Some(DML_NS))
        .and_then(|n| n.attribute((REL_NS, "embed")))
}

fn read_image_from_zip(
    embed_id: &str,
    rels: &HashMap<String, String>,
    zip: &mut Archive,
    display_w: f32,
    display_h: f32,
) -> Option<EmbeddedImage> {
    let target = rels.get(embed_id)?;
    let zip_path = target
        .strip_prefix('/')
        .map(String::from)
        .unwrap_or_else(|| format!("word/{}", target));
    let mut entry = zip.by_name(&zip_path).ok()?;
    let mut data = Vec::new();
    entry.read_to_end(&mut data).ok()?;
    drop(entry);
    let (pw, ph, fmt) = crate::media::image_dimensions(&data)?;
    Some(EmbeddedImage {
        data,
        format: fmt,
        pixel_width: pw,
        pixel_height: ph,
        display_width: display_w,
        display_height: display_h,
    })
}

/// Inline image under a run: w:drawing → wp:inline → a:blip@r:embed,
/// display extent from wp:extent EMUs.
fn parse_run_image(
    run_node: roxmltree::Node,
    rels: &HashMap<String, String>,
    zip: &mut Archive,
) -> Option<EmbeddedImage> {
    let drawing = wml(run_node, "drawing")?;
    for container in drawing.children() {
        let name = container.tag_name().name();
        if (name != "inline" && name != "anchor")
            || container.tag_name().namespace() != Some(WPD_NS)
        {
            continue;
        }
        let extent = container
            .children()
            .find(|n| n.tag_name().name() == "extent" && n.tag_name().namespace() == Some(WPD_NS));
        let cx = extent
            .and_then(|n| n.attribute("cx"))
            .and_then(|v| v.parse::<f32>().ok())
            .unwrap_or(0.0);
        let cy = extent
            .and_then(|n| n.attribute("cy"))
            .and_then(|v| v.parse::<f32>().ok())
            .unwrap_or(0.0);
        let embed_id = find_blip_embed(container)?;
        return read_image_from_zip(embed_id, rels, zip, cx / 12700.0, cy / 12700.0);
    }
    None
}

fn parse_alignment(val: &str) -> Option<Alignment> {
    match val {
        "center" => Some(Alignment::Center),
        "right" | "end" => Some(Alignment::Right),
        "both" | "distribute" => Some(Alignment::Justify),
        "left" | "start" => Some(Alignment::Left),
        _ => None,
    }
}

fn parse_paragraph(
    para_node: roxmltree::Node,
    rels: &HashMap<String, String>,
    zip: &mut Archive,
) -> Paragraph {
    let ppr = wml(para_node, "pPr");
    let style_id = ppr
        .and_then(|n| wml_attr(n, "pStyle"))
        .map(|s| s.to_string());
    let alignment = ppr.and_then(|n| wml_attr(n, "jc")).and_then(parse_alignment);

    let mut runs = Vec::new();
    for run_node in para_node
        .children()
        .filter(|n| n.tag_name().name() == "r" && n.tag_name().namespace() == Some(WML_NS))
    {
        let rpr = wml(run_node, "rPr");
        let bold = rpr.and_then(|n| wml_bool(n, "b")).unwrap_or(false);
        let italic = rpr.and_then(|n| wml_bool(n, "i")).unwrap_or(false);
        let underline = rpr
            .and_then(|n| {
                wml(n, "u")
                    .and_then(|u| u.attribute((WML_NS, "val")))
                    .map(|v| v != "none")
            })
            .unwrap_or(false);
        let font_size = rpr
            .and_then(|n| wml_attr(n, "sz"))
            .and_then(|v| v.parse::<f32>().ok())
            .map(|hp| hp / 2.0);
        let font_name = rpr
            .and_then(|n| wml(n, "rFonts"))
            .and_then(|n| n.attribute((WML_NS, "ascii")))
            .map(|s| s.to_string());
        let color = rpr
            .and_then(|n| wml_attr(n, "color"))
            .and_then(parse_hex_color);

        let inline_image = parse_run_image(run_node, rels, zip);

        let mut text = String::new();
        for child in run_node.children() {
            if child.tag_name().namespace() != Some(WML_NS) {
                continue;
            }
            match child.tag_name().name() {
                "t" => text.push_str(child.text().unwrap_or("")),
                "tab" => text.push('\t'),
                "br" => text.push('\n'),
                _ => {}
            }
        }

        if text.is_empty() && inline_image.is_none() {
            continue;
        }
        runs.push(Run {
            text,
            bold,
            italic,
            underline,
            font_size,
            font_name,
            color,
            inline_image,
        });
    }

    Paragraph {
        style_id,
        alignment,
        runs,
    }
}

fn parse_table(
    tbl_node: roxmltree::Node,
    rels: &HashMap<String, String>,
    zip: &mut Archive,
) -> Table {
    let col_widths: Vec<f32> = wml(tbl_node, "tblGrid")
        .into_iter()
        .flat_map(|grid| grid.children())
        .filter(|n| n.tag_name().name() == "gridCol" && n.tag_name().namespace() == Some(WML_NS))
        .filter_map(|n| twips_attr(n, "w"))
        .collect();

    let mut rows = Vec::new();
    for tr in collect_block_nodes(tbl_node)
        .into_iter()
        .filter(|n| n.tag_name().name() == "tr" && n.tag_name().namespace() == Some(WML_NS))
    {
        let mut cells = Vec::new();
        let mut grid_col = 0usize;
        for tc in collect_block_nodes(tr)
            .into_iter()
            .filter(|n| n.tag_name().name() == "tc" && n.tag_name().namespace() == Some(WML_NS))
        {
            let tc_pr = wml(tc, "tcPr");
            let width = tc_pr
                .and_then(|pr| wml(pr, "tcW"))
                .and_then(|w| twips_attr(w, "w"))
                .unwrap_or_else(|| col_widths.get(grid_col).copied().unwrap_or(72.0));
            let grid_span = tc_pr
                .and_then(|pr| wml(pr, "gridSpan"))
                .and_then(|n| n.attribute((WML_NS, "val")))
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(1);
            let shading = tc_pr
                .and_then(|pr| wml(pr, "shd"))
                .and_then(|n| n.attribute((WML_NS, "fill")))
                .and_then(parse_hex_color);

            let blocks = parse_blocks(tc, rels, zip);

            grid_col += grid_span as usize;
            cells.push(TableCell {
                width,
                grid_span,
                shading,
                blocks,
            });
        }
        rows.push(TableRow { cells });
    }

    Table { col_widths, rows }
}

/// Blocks directly under `parent` (a w:body or w:tc), in document order.
/// Unrecognized elements (bookmarks, section properties, proofing marks)
/// are skipped.
fn parse_blocks(
    parent: roxmltree::Node,
    rels: &HashMap<String, String>,
    zip: &mut Archive,
) -> Vec<Block> {
    let mut blocks = Vec::new();
    for node in collect_block_nodes(parent) {
        if node.tag_name().namespace() != Some(WML_NS) {
            continue;
        }
        match node.tag_name().name() {
            "p" => blocks.push(Block::Paragraph(parse_paragraph(node, rels, zip))),
            "tbl" => blocks.push(Block::Table(parse_table(node, rels, zip))),
            _ => {}
        }
    }
    blocks
}

/// Parse a DOCX file into the block-tree model. Repeated parses of the same
/// bytes yield an identical tree.
pub fn parse(path: &Path) -> Result<Document, Error> {
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => Error::Io(
            std::io::Error::new(e.kind(), format!("{}: {}", e, path.display())),
        ),
        _ => Error::Io(e),
    })?;
    parse_bytes(&bytes)
}

pub fn parse_bytes(input: &[u8]) -> Result<Document, Error> {
    let mut zip = zip::ZipArchive::new(Cursor::new(input))
        .map_err(|_| Error::InvalidDocx("file is not a ZIP archive".into()))?;

    let rels = parse_relationships(&mut zip);

    let mut xml_content = String::new();
    zip.by_name("word/document.xml")
        .map_err(|_| Error::InvalidDocx("missing word/document.xml (is this a DOCX file?)".into()))?
        .read_to_string(&mut xml_content)?;

    let xml = roxmltree::Document::parse(&xml_content)?;
    let root = xml.root_element();
    let body = wml(root, "body").ok_or_else(|| Error::InvalidDocx("missing w:body".into()))?;

    let blocks = parse_blocks(body, &rels, &mut zip);
    log::debug!("parsed document: {} top-level blocks", blocks.len());
    Ok(Document { blocks })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::writer;
    use crate::model::{ImageFormat, Run};

    #[test]
    fn rejects_non_zip_input() {
        let err = parse_bytes(b"plain text").unwrap_err();
        assert!(matches!(err, Error::InvalidDocx(_)));
    }

    #[test]
    fn round_trips_paragraph_text_and_formatting() {
        let doc = Document {
            blocks: vec![Block::Paragraph(Paragraph {
                style_id: Some("Heading1".into()),
                alignment: Some(Alignment::Center),
                runs: vec![
                    Run {
                        text: "Abschnitt 2:".into(),
                        bold: true,
                        font_size: Some(14.0),
                        ..Run::default()
                    },
                    Run::text(" Gefahren & Hinweise <alle>"),
                ],
            })],
        };
        let bytes = writer::to_bytes(&doc).unwrap();
        let parsed = parse_bytes(&bytes).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn round_trips_tables_with_nested_blocks() {
        let doc = Document {
            blocks: vec![Block::Table(Table {
                col_widths: vec![120.0, 240.0],
                rows: vec![TableRow {
                    cells: vec![
                        TableCell {
                            width: 120.0,
                            grid_span: 1,
                            shading: Some([0xEE, 0xEE, 0xEE]),
                            blocks: vec![Block::Paragraph(Paragraph {
                                runs: vec![Run::text("key")],
                                ..Paragraph::default()
                            })],
                        },
                        TableCell {
                            width: 240.0,
                            grid_span: 1,
                            shading: None,
                            blocks: vec![Block::Paragraph(Paragraph {
                                runs: vec![Run::text("value")],
                                ..Paragraph::default()
                            })],
                        },
                    ],
                }],
            })],
        };
        let bytes = writer::to_bytes(&doc).unwrap();
        let parsed = parse_bytes(&bytes).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn round_trips_an_inline_image() {
        let png = crate::media::test_images::png(192, 96, None);
        let doc = Document {
            blocks: vec![Block::Paragraph(Paragraph {
                runs: vec![Run::image(EmbeddedImage {
                    data: png,
                    format: ImageFormat::Png,
                    pixel_width: 192,
                    pixel_height: 96,
                    display_width: 144.0,
                    display_height: 72.0,
                })],
                ..Paragraph::default()
            })],
        };
        let bytes = writer::to_bytes(&doc).unwrap();
        let parsed = parse_bytes(&bytes).unwrap();
        assert_eq!(parsed, doc);
    }
}
