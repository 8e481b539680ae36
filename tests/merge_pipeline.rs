//! End-to-end pipeline tests: build real DOCX packages through the writer,
//! re-read them through the parser, and drive partition + merge over files
//! on disk the way the batch driver does.

use std::path::PathBuf;

use docsplice::model::{Block, Document, Paragraph, Run, Table, TableCell, TableRow};

fn para(text: &str) -> Block {
    Block::Paragraph(Paragraph {
        runs: vec![Run::text(text)],
        ..Paragraph::default()
    })
}

fn cell(texts: &[&str]) -> TableCell {
    TableCell {
        width: 150.0,
        grid_span: 1,
        shading: None,
        blocks: texts.iter().map(|t| para(t)).collect(),
    }
}

fn texts_of(doc: &Document) -> Vec<String> {
    doc.blocks
        .iter()
        .map(|b| match b {
            Block::Paragraph(p) => p.text(),
            Block::Table(t) => format!("<table {} rows>", t.rows.len()),
        })
        .collect()
}

/// Scratch dir unique per test, removed at the end of each test body.
fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("docsplice-it-{name}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn docx_level_partition_and_merge() {
    let _ = env_logger::try_init();
    let raw = Document {
        blocks: vec![
            para("Sicherheitsdatenblatt"), // pre-section, discarded
            para("• Abschnitt 1: Bezeichnung"),
            para("Produktname: Testol"),
            para("Abschnitt 2 - Gefahren"),
            para("Entzündbar."),
            para("Reizend."),
        ],
    };
    let raw_bytes = docsplice::to_bytes(&raw).unwrap();
    let parsed = docsplice::parse_bytes(&raw_bytes).unwrap();
    let sections = docsplice::partition(&parsed);
    assert_eq!(sections.len(), 2);

    let template = Document {
        blocks: vec![
            para("REPORT"),
            para("{{SECTION_1}}"),
            para("{{SECTION_2}}"),
            para("{{SECTION_3}}"),
            para("END"),
        ],
    };
    let merged = docsplice::merge(&sections, template, &docsplice::IconLibrary::disabled());

    // Through bytes once more: the merged tree must survive serialization.
    let out_bytes = docsplice::to_bytes(&merged).unwrap();
    let reread = docsplice::parse_bytes(&out_bytes).unwrap();
    assert_eq!(
        texts_of(&reread),
        vec![
            "REPORT",
            "Produktname: Testol",
            "Entzündbar.",
            "Reizend.",
            "END"
        ]
    );
}

#[test]
fn table_header_split_survives_the_docx_round_trip() {
    let _ = env_logger::try_init();
    let raw = Document {
        blocks: vec![Block::Table(Table {
            col_widths: vec![150.0, 150.0],
            rows: vec![
                TableRow {
                    cells: vec![cell(&["Abschnitt 9: Physikalische Eigenschaften"]), cell(&[""])],
                },
                TableRow {
                    cells: vec![cell(&["Siedepunkt"]), cell(&["100 °C"])],
                },
            ],
        })],
    };
    let parsed = docsplice::parse_bytes(&docsplice::to_bytes(&raw).unwrap()).unwrap();
    let sections = docsplice::partition(&parsed);

    let body = sections.get(9).expect("section 9 present");
    assert_eq!(body.len(), 1);
    let Block::Table(t) = &body[0] else {
        panic!("expected split table");
    };
    assert_eq!(t.rows.len(), 1);
    assert_eq!(
        t.rows[0].cells[0].blocks,
        vec![para("Siedepunkt")]
    );
}

#[test]
fn merge_docx_writes_a_reopenable_package() {
    let _ = env_logger::try_init();
    let dir = scratch("pipeline");
    let raw_path = dir.join("input.docx");
    let template_path = dir.join("template.docx");
    let icons_dir = dir.join("icons");
    let out_path = dir.join("merged.docx");
    std::fs::create_dir_all(&icons_dir).unwrap();

    let raw = Document {
        blocks: vec![
            para("Section 2: Hazards"),
            para("Highly flammable."),
        ],
    };
    std::fs::write(&raw_path, docsplice::to_bytes(&raw).unwrap()).unwrap();

    let template = Document {
        blocks: vec![para("Master"), para("{{SECTION_2}}"), para("Footer")],
    };
    std::fs::write(&template_path, docsplice::to_bytes(&template).unwrap()).unwrap();

    // 96x96 px icon with no density metadata: one inch square at 96 DPI.
    std::fs::write(icons_dir.join("GHS2.png"), minimal_png(96, 96)).unwrap();

    docsplice::merge_docx(&raw_path, &template_path, &icons_dir, &out_path).unwrap();

    let merged = docsplice::parse(&out_path).unwrap();
    assert_eq!(merged.blocks.len(), 4);
    assert_eq!(
        texts_of(&merged)[..2],
        ["Master".to_string(), "Highly flammable.".to_string()]
    );
    // Section 2 carried no image, so the GHS2 fallback icon was appended.
    assert!(merged.blocks[2].has_inline_image());
    let Block::Paragraph(p) = &merged.blocks[2] else {
        panic!("expected icon paragraph");
    };
    let img = p.runs[0].inline_image.as_ref().unwrap();
    assert_eq!((img.pixel_width, img.pixel_height), (96, 96));
    assert_eq!(img.display_width, 72.0);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn repeated_merges_from_one_template_do_not_accumulate() {
    let _ = env_logger::try_init();
    let dir = scratch("fresh-template");
    let template_path = dir.join("template.docx");
    let out_a = dir.join("a.docx");
    let out_b = dir.join("b.docx");

    let template = Document {
        blocks: vec![para("{{SECTION_1}}")],
    };
    std::fs::write(&template_path, docsplice::to_bytes(&template).unwrap()).unwrap();

    for (marker, out) in [("first", &out_a), ("second", &out_b)] {
        let raw = Document {
            blocks: vec![para("Section 1:"), para(marker)],
        };
        let raw_path = dir.join(format!("{marker}.docx"));
        std::fs::write(&raw_path, docsplice::to_bytes(&raw).unwrap()).unwrap();
        docsplice::merge_docx(&raw_path, &template_path, &dir.join("no-icons"), out).unwrap();
    }

    let a = docsplice::parse(&out_a).unwrap();
    let b = docsplice::parse(&out_b).unwrap();
    assert_eq!(texts_of(&a), vec!["first"]);
    assert_eq!(texts_of(&b), vec!["second"]);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn missing_raw_document_is_a_reported_error() {
    let _ = env_logger::try_init();
    let dir = scratch("missing");
    let template_path = dir.join("template.docx");
    std::fs::write(
        &template_path,
        docsplice::to_bytes(&Document::default()).unwrap(),
    )
    .unwrap();

    let err = docsplice::merge_docx(
        &dir.join("does-not-exist.docx"),
        &template_path,
        &dir,
        &dir.join("out.docx"),
    )
    .unwrap_err();
    assert!(matches!(err, docsplice::Error::Io(_)));

    std::fs::remove_dir_all(&dir).ok();
}

/// PNG with a real IHDR and empty IDAT; enough for the metadata sniffers.
fn minimal_png(width: u32, height: u32) -> Vec<u8> {
    let mut out = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    let mut chunk = |kind: &[u8; 4], body: &[u8]| {
        out.extend_from_slice(&(body.len() as u32).to_be_bytes());
        out.extend_from_slice(kind);
        out.extend_from_slice(body);
        out.extend_from_slice(&[0u8; 4]);
    };
    let mut ihdr = Vec::new();
    ihdr.extend_from_slice(&width.to_be_bytes());
    ihdr.extend_from_slice(&height.to_be_bytes());
    ihdr.extend_from_slice(&[8, 6, 0, 0, 0]);
    chunk(b"IHDR", &ihdr);
    chunk(b"IDAT", &[]);
    chunk(b"IEND", &[]);
    out
}
