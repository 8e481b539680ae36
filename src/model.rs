#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justify,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
        }
    }
}

#[derive(Clone, PartialEq)]
pub struct EmbeddedImage {
    pub data: Vec<u8>,
    pub format: ImageFormat,
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub display_width: f32,  // points
    pub display_height: f32, // points
}

impl std::fmt::Debug for EmbeddedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddedImage")
            .field("format", &self.format)
            .field("pixel_width", &self.pixel_width)
            .field("pixel_height", &self.pixel_height)
            .field("display_width", &self.display_width)
            .field("display_height", &self.display_height)
            .field("data_len", &self.data.len())
            .finish()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Run {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub font_size: Option<f32>, // points
    pub font_name: Option<String>,
    pub color: Option<[u8; 3]>,
    pub inline_image: Option<EmbeddedImage>,
}

impl Run {
    pub fn text(text: impl Into<String>) -> Self {
        Run {
            text: text.into(),
            ..Run::default()
        }
    }

    pub fn image(image: EmbeddedImage) -> Self {
        Run {
            inline_image: Some(image),
            ..Run::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Paragraph {
    pub style_id: Option<String>,
    pub alignment: Option<Alignment>,
    pub runs: Vec<Run>,
}

impl Paragraph {
    /// Flattened run text of this paragraph (one string per node, never
    /// joined across nodes).
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    pub fn has_inline_image(&self) -> bool {
        self.runs.iter().any(|r| r.inline_image.is_some())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    pub col_widths: Vec<f32>, // points
    pub rows: Vec<TableRow>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TableCell {
    pub width: f32, // points
    pub grid_span: u16,
    pub shading: Option<[u8; 3]>,
    pub blocks: Vec<Block>,
}

impl Table {
    pub fn has_inline_image(&self) -> bool {
        self.rows
            .iter()
            .flat_map(|r| r.cells.iter())
            .flat_map(|c| c.blocks.iter())
            .any(Block::has_inline_image)
    }
}

/// A top-level (or cell-level) document block. The model is a closed union:
/// anything the reader does not recognize as a paragraph or table is skipped
/// at parse time and never reaches the engines.
#[derive(Clone, Debug, PartialEq)]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
}

impl Block {
    pub fn has_inline_image(&self) -> bool {
        match self {
            Block::Paragraph(p) => p.has_inline_image(),
            Block::Table(t) => t.has_inline_image(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    pub blocks: Vec<Block>,
}
