//! Serializes the block-tree model back into a minimal valid DOCX package.

use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::Error;
use crate::model::{Alignment, Block, Document, EmbeddedImage, Paragraph, Run, Table};

/// Media parts collected during serialization: (zip path, relationship id,
/// bytes). Relationship ids start after rId1 (styles).
struct MediaSink {
    parts: Vec<(String, String, Vec<u8>)>,
}

impl MediaSink {
    fn new() -> Self {
        MediaSink { parts: Vec::new() }
    }

    fn add(&mut self, image: &EmbeddedImage) -> String {
        let n = self.parts.len() + 1;
        let rel_id = format!("rId{}", n + 1);
        let path = format!("media/image{}.{}", n, image.format.extension());
        self.parts.push((path, rel_id.clone(), image.data.clone()));
        rel_id
    }
}

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn pts_to_twips(pts: f32) -> i64 {
    (pts * 20.0).round() as i64
}

fn pts_to_emu(pts: f32) -> i64 {
    (pts * 12700.0).round() as i64
}

fn write_run(out: &mut String, run: &Run, media: &mut MediaSink) {
    out.push_str("<w:r>");
    let mut rpr = String::new();
    if run.bold {
        rpr.push_str("<w:b/>");
    }
    if run.italic {
        rpr.push_str("<w:i/>");
    }
    if run.underline {
        rpr.push_str(r#"<w:u w:val="single"/>"#);
    }
    if let Some(name) = &run.font_name {
        let _ = write!(rpr, r#"<w:rFonts w:ascii="{}"/>"#, xml_escape(name));
    }
    if let Some(sz) = run.font_size {
        let _ = write!(rpr, r#"<w:sz w:val="{}"/>"#, (sz * 2.0).round() as i64);
    }
    if let Some([r, g, b]) = run.color {
        let _ = write!(rpr, r#"<w:color w:val="{r:02X}{g:02X}{b:02X}"/>"#);
    }
    if !rpr.is_empty() {
        out.push_str("<w:rPr>");
        out.push_str(&rpr);
        out.push_str("</w:rPr>");
    }

    if let Some(image) = &run.inline_image {
        let rel_id = media.add(image);
        let cx = pts_to_emu(image.display_width);
        let cy = pts_to_emu(image.display_height);
        let id = media.parts.len();
        let _ = write!(
            out,
            concat!(
                r#"<w:drawing><wp:inline distT="0" distB="0" distL="0" distR="0">"#,
                r#"<wp:extent cx="{cx}" cy="{cy}"/>"#,
                r#"<wp:docPr id="{id}" name="Picture {id}"/>"#,
                r#"<a:graphic xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main">"#,
                r#"<a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/picture">"#,
                r#"<pic:pic xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture">"#,
                r#"<pic:nvPicPr><pic:cNvPr id="{id}" name="Picture {id}"/><pic:cNvPicPr/></pic:nvPicPr>"#,
                r#"<pic:blipFill><a:blip r:embed="{rel}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill>"#,
                r#"<pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm>"#,
                r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr>"#,
                r#"</pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing>"#
            ),
            cx = cx,
            cy = cy,
            id = id,
            rel = rel_id,
        );
    }

    if !run.text.is_empty() {
        // Tabs and line breaks came in as control characters; re-emit the
        // dedicated WML elements so Word honors them.
        for (i, segment) in run.text.split('\n').enumerate() {
            if i > 0 {
                out.push_str("<w:br/>");
            }
            for (j, piece) in segment.split('\t').enumerate() {
                if j > 0 {
                    out.push_str("<w:tab/>");
                }
                if !piece.is_empty() {
                    let _ = write!(
                        out,
                        r#"<w:t xml:space="preserve">{}</w:t>"#,
                        xml_escape(piece)
                    );
                }
            }
        }
    }
    out.push_str("</w:r>");
}

fn write_paragraph(out: &mut String, para: &Paragraph, media: &mut MediaSink) {
    out.push_str("<w:p>");
    let mut ppr = String::new();
    if let Some(style) = &para.style_id {
        let _ = write!(ppr, r#"<w:pStyle w:val="{}"/>"#, xml_escape(style));
    }
    if let Some(align) = para.alignment {
        let val = match align {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Justify => "both",
        };
        let _ = write!(ppr, r#"<w:jc w:val="{val}"/>"#);
    }
    if !ppr.is_empty() {
        out.push_str("<w:pPr>");
        out.push_str(&ppr);
        out.push_str("</w:pPr>");
    }
    for run in &para.runs {
        write_run(out, run, media);
    }
    out.push_str("</w:p>");
}

fn write_table(out: &mut String, table: &Table, media: &mut MediaSink) {
    out.push_str("<w:tbl>");
    out.push_str(
        r#"<w:tblPr><w:tblW w:w="0" w:type="auto"/><w:tblBorders><w:top w:val="single" w:sz="4" w:space="0"/><w:left w:val="single" w:sz="4" w:space="0"/><w:bottom w:val="single" w:sz="4" w:space="0"/><w:right w:val="single" w:sz="4" w:space="0"/><w:insideH w:val="single" w:sz="4" w:space="0"/><w:insideV w:val="single" w:sz="4" w:space="0"/></w:tblBorders></w:tblPr>"#,
    );
    out.push_str("<w:tblGrid>");
    for w in &table.col_widths {
        let _ = write!(out, r#"<w:gridCol w:w="{}"/>"#, pts_to_twips(*w));
    }
    out.push_str("</w:tblGrid>");
    for row in &table.rows {
        out.push_str("<w:tr>");
        for cell in &row.cells {
            out.push_str("<w:tc><w:tcPr>");
            let _ = write!(
                out,
                r#"<w:tcW w:w="{}" w:type="dxa"/>"#,
                pts_to_twips(cell.width)
            );
            if cell.grid_span > 1 {
                let _ = write!(out, r#"<w:gridSpan w:val="{}"/>"#, cell.grid_span);
            }
            if let Some([r, g, b]) = cell.shading {
                let _ = write!(
                    out,
                    r#"<w:shd w:val="clear" w:fill="{r:02X}{g:02X}{b:02X}"/>"#
                );
            }
            out.push_str("</w:tcPr>");
            for block in &cell.blocks {
                write_block(out, block, media);
            }
            // A cell must end with a paragraph to stay valid WML.
            if !matches!(cell.blocks.last(), Some(Block::Paragraph(_))) {
                out.push_str("<w:p/>");
            }
            out.push_str("</w:tc>");
        }
        out.push_str("</w:tr>");
    }
    out.push_str("</w:tbl>");
}

fn write_block(out: &mut String, block: &Block, media: &mut MediaSink) {
    match block {
        Block::Paragraph(p) => write_paragraph(out, p, media),
        Block::Table(t) => write_table(out, t, media),
    }
}

fn document_xml(doc: &Document, media: &mut MediaSink) -> String {
    let mut body = String::new();
    for block in &doc.blocks {
        write_block(&mut body, block, media);
    }
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            "\n",
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main""#,
            r#" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships""#,
            r#" xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing""#,
            r#" xmlns:mc="http://schemas.openxmlformats.org/markup-compatibility/2006">"#,
            "<w:body>{body}",
            r#"<w:sectPr><w:pgSz w:w="11906" w:h="16838"/>"#,
            r#"<w:pgMar w:top="1417" w:right="1417" w:bottom="1134" w:left="1417" w:header="708" w:footer="708" w:gutter="0"/>"#,
            r#"</w:sectPr></w:body></w:document>"#
        ),
        body = body
    )
}

fn content_types_xml() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Default Extension="png" ContentType="image/png"/>
  <Default Extension="jpeg" ContentType="image/jpeg"/>
  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
  <Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>
</Types>"#
}

fn root_rels_xml() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#
}

fn document_rels_xml(media: &MediaSink) -> String {
    let mut rels = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
    );
    for (path, rel_id, _) in &media.parts {
        let _ = write!(
            rels,
            "\n  <Relationship Id=\"{rel_id}\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/image\" Target=\"{path}\"/>"
        );
    }
    rels.push_str("\n</Relationships>");
    rels
}

fn styles_xml() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:style w:type="paragraph" w:default="1" w:styleId="Normal">
    <w:name w:val="Normal"/>
    <w:qFormat/>
  </w:style>
</w:styles>"#
}

/// Serialize `doc` into DOCX bytes.
pub fn to_bytes(doc: &Document) -> Result<Vec<u8>, Error> {
    let mut media = MediaSink::new();
    let document = document_xml(doc, &mut media);

    let cursor = std::io::Cursor::new(Vec::new());
    let mut zip = ZipWriter::new(cursor);
    let opt = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    zip.start_file("[Content_Types].xml", opt)?;
    zip.write_all(content_types_xml().as_bytes())?;

    zip.start_file("_rels/.rels", opt)?;
    zip.write_all(root_rels_xml().as_bytes())?;

    zip.start_file("word/document.xml", opt)?;
    zip.write_all(document.as_bytes())?;

    zip.start_file("word/_rels/document.xml.rels", opt)?;
    zip.write_all(document_rels_xml(&media).as_bytes())?;

    zip.start_file("word/styles.xml", opt)?;
    zip.write_all(styles_xml().as_bytes())?;

    for (path, _, data) in &media.parts {
        zip.start_file(format!("word/{path}"), opt)?;
        zip.write_all(data)?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

/// Serialize `doc` and write it to `path`.
pub fn write(doc: &Document, path: &Path) -> Result<(), Error> {
    let bytes = to_bytes(doc)?;
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, &bytes)?;
    log::debug!("wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}
