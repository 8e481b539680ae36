//! Image header sniffing: pixel dimensions, physical density, and the
//! derived size in inches used to lay out fallback icons.

use crate::model::ImageFormat;

pub const DEFAULT_DPI: (f32, f32) = (96.0, 96.0);

/// Pixel dimensions and container format from the file header.
pub fn image_dimensions(data: &[u8]) -> Option<(u32, u32, ImageFormat)> {
    // JPEG: starts with FF D8, dimensions in the first SOF marker
    if data.len() >= 2 && data[0] == 0xFF && data[1] == 0xD8 {
        let mut i = 2;
        while i + 4 < data.len() {
            if data[i] != 0xFF {
                return None;
            }
            let marker = data[i + 1];
            if marker == 0xD9 {
                break;
            }
            let len = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
            if (marker == 0xC0 || marker == 0xC1 || marker == 0xC2) && i + 9 < data.len() {
                let height = u16::from_be_bytes([data[i + 5], data[i + 6]]) as u32;
                let width = u16::from_be_bytes([data[i + 7], data[i + 8]]) as u32;
                return Some((width, height, ImageFormat::Jpeg));
            }
            i += 2 + len;
        }
        return None;
    }

    // PNG: starts with 89 50 4E 47, dimensions in IHDR chunk at bytes 16-23
    if data.len() >= 24 && data[0] == 0x89 && data[1] == 0x50 && data[2] == 0x4E && data[3] == 0x47
    {
        let width = u32::from_be_bytes([data[16], data[17], data[18], data[19]]);
        let height = u32::from_be_bytes([data[20], data[21], data[22], data[23]]);
        return Some((width, height, ImageFormat::Png));
    }

    None
}

/// Physical density in dots per inch, per axis. Assets produced without
/// density metadata (most icon sets) report the 96 DPI default.
pub fn image_dpi(data: &[u8]) -> (f32, f32) {
    if let Some(dpi) = png_dpi(data) {
        return dpi;
    }
    if let Some(dpi) = jpeg_dpi(data) {
        return dpi;
    }
    DEFAULT_DPI
}

/// Physical size in inches: pixels / dpi per axis.
pub fn size_in_inches(data: &[u8]) -> Option<(f32, f32)> {
    let (w, h, _) = image_dimensions(data)?;
    let (dpi_x, dpi_y) = image_dpi(data);
    Some((w as f32 / dpi_x, h as f32 / dpi_y))
}

/// Walk PNG chunks for pHYs (pixels per metre). Unit flag 1 means metres;
/// any other unit leaves the aspect-ratio-only values unused.
fn png_dpi(data: &[u8]) -> Option<(f32, f32)> {
    if data.len() < 8 || data[0] != 0x89 || &data[1..4] != b"PNG" {
        return None;
    }
    let mut i = 8;
    while i + 8 <= data.len() {
        let len = u32::from_be_bytes([data[i], data[i + 1], data[i + 2], data[i + 3]]) as usize;
        let kind = &data[i + 4..i + 8];
        if kind == b"pHYs" && i + 8 + 9 <= data.len() {
            let ppu_x = u32::from_be_bytes([data[i + 8], data[i + 9], data[i + 10], data[i + 11]]);
            let ppu_y =
                u32::from_be_bytes([data[i + 12], data[i + 13], data[i + 14], data[i + 15]]);
            let unit = data[i + 16];
            if unit == 1 && ppu_x > 0 && ppu_y > 0 {
                return Some((ppu_x as f32 * 0.0254, ppu_y as f32 * 0.0254));
            }
            return None;
        }
        if kind == b"IDAT" || kind == b"IEND" {
            // pHYs must precede IDAT; stop scanning once pixel data starts.
            return None;
        }
        i += 12 + len; // length + type + data + crc
    }
    None
}

/// JFIF APP0 density fields: unit 1 = dots per inch, 2 = dots per cm.
fn jpeg_dpi(data: &[u8]) -> Option<(f32, f32)> {
    if data.len() < 4 || data[0] != 0xFF || data[1] != 0xD8 {
        return None;
    }
    let mut i = 2;
    while i + 4 < data.len() {
        if data[i] != 0xFF {
            return None;
        }
        let marker = data[i + 1];
        if marker == 0xD9 || marker == 0xDA {
            break;
        }
        let len = u16::from_be_bytes([data[i + 2], data[i + 3]]) as usize;
        if marker == 0xE0 && len >= 14 && i + 2 + len <= data.len() {
            let seg = &data[i + 4..i + 2 + len];
            if &seg[0..5] == b"JFIF\0" {
                let unit = seg[7];
                let x = u16::from_be_bytes([seg[8], seg[9]]) as f32;
                let y = u16::from_be_bytes([seg[10], seg[11]]) as f32;
                if x > 0.0 && y > 0.0 {
                    match unit {
                        1 => return Some((x, y)),
                        2 => return Some((x * 2.54, y * 2.54)),
                        _ => return None,
                    }
                }
            }
            return None;
        }
        i += 2 + len;
    }
    None
}
