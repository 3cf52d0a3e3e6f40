//! Caption rendering onto preview images.
//!
//! Text is drawn with a built-in 5×7 dot font scaled by `font_scale`, so no
//! font files are needed. Each dot is a filled square; the outline is the
//! same square grown by `thickness` and painted black first.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

use crate::config::{CaptionBackground, PreviewConfig};

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;
/// Horizontal advance per character, in dots
const ADVANCE: u32 = GLYPH_WIDTH + 1;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

/// Caption appearance.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayStyle {
    /// Pixels per font dot
    pub font_scale: u32,
    pub font_color: Rgb<u8>,
    /// Outline width in pixels
    pub thickness: u32,
    /// Offset of the caption from the top-left corner
    pub border_px: u32,
    /// Box behind the caption; `None` draws text only
    pub background: Option<Rgb<u8>>,
    /// Padding between caption and box edge
    pub buffer: u32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            font_scale: 5,
            font_color: WHITE,
            thickness: 2,
            border_px: 50,
            background: Some(WHITE),
            buffer: 20,
        }
    }
}

impl From<&PreviewConfig> for OverlayStyle {
    fn from(config: &PreviewConfig) -> Self {
        Self {
            font_scale: config.font_scale.max(1),
            font_color: WHITE,
            thickness: config.thickness,
            border_px: config.border_px,
            background: match config.background {
                CaptionBackground::None => None,
                CaptionBackground::White => Some(WHITE),
                CaptionBackground::Black => Some(BLACK),
            },
            buffer: config.buffer,
        }
    }
}

impl OverlayStyle {
    /// Text colour after contrast rules: white boxes get black text and
    /// black boxes get white text.
    pub fn text_color(&self) -> Rgb<u8> {
        match self.background {
            Some(bg) if bg == WHITE => BLACK,
            Some(bg) if bg == BLACK => WHITE,
            _ => self.font_color,
        }
    }
}

/// Pixel size of `caption` at `font_scale`.
pub fn text_size(caption: &str, font_scale: u32) -> (u32, u32) {
    let chars = caption.chars().count() as u32;
    if chars == 0 {
        return (0, 0);
    }
    let width = (chars * ADVANCE - 1) * font_scale;
    (width, GLYPH_HEIGHT * font_scale)
}

/// Return a copy of `image` with `caption` burned into the top-left corner.
pub fn overlay_text(image: &RgbImage, caption: &str, style: &OverlayStyle) -> RgbImage {
    let mut out = image.clone();
    if caption.is_empty() || out.width() == 0 || out.height() == 0 {
        return out;
    }

    let scale = style.font_scale.max(1);
    let (text_w, text_h) = text_size(caption, scale);
    let x0 = style.border_px as i32;
    let y0 = style.border_px as i32;

    if let Some(bg) = style.background {
        let pad = style.buffer as i32;
        let rect = Rect::at(x0 - pad, y0 - pad)
            .of_size(text_w + 2 * style.buffer, text_h + 2 * style.buffer);
        draw_filled_rect_mut(&mut out, rect, bg);
    }

    let t = style.thickness as i32;
    let dot = scale as i32;
    let dots = lit_dots(caption);

    if t > 0 {
        let size = scale + 2 * style.thickness;
        for &(col, row) in &dots {
            let rect = Rect::at(x0 + col * dot - t, y0 + row * dot - t).of_size(size, size);
            draw_filled_rect_mut(&mut out, rect, BLACK);
        }
    }

    let color = style.text_color();
    for &(col, row) in &dots {
        let rect = Rect::at(x0 + col * dot, y0 + row * dot).of_size(scale, scale);
        draw_filled_rect_mut(&mut out, rect, color);
    }

    out
}

/// Dot coordinates (column, row) of every lit cell in the caption.
fn lit_dots(caption: &str) -> Vec<(i32, i32)> {
    let mut dots = Vec::new();
    for (i, c) in caption.chars().enumerate() {
        let origin = (i as u32 * ADVANCE) as i32;
        for (row, bits) in glyph(c).iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - col)) != 0 {
                    dots.push((origin + col as i32, row as i32));
                }
            }
        }
    }
    dots
}

/// 5×7 bitmap, one byte per row, bit 4 is the leftmost column.
/// Unknown characters render as a box.
fn glyph(c: char) -> [u8; 7] {
    match c {
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        'A' => [0x0E, 0x11, 0x11, 0x11, 0x1F, 0x11, 0x11],
        'B' => [0x1E, 0x11, 0x11, 0x1E, 0x11, 0x11, 0x1E],
        'C' => [0x0E, 0x11, 0x10, 0x10, 0x10, 0x11, 0x0E],
        'D' => [0x1C, 0x12, 0x11, 0x11, 0x11, 0x12, 0x1C],
        'E' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x1F],
        'F' => [0x1F, 0x10, 0x10, 0x1E, 0x10, 0x10, 0x10],
        'G' => [0x0E, 0x11, 0x10, 0x17, 0x11, 0x11, 0x0F],
        'H' => [0x11, 0x11, 0x11, 0x1F, 0x11, 0x11, 0x11],
        'I' => [0x0E, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'J' => [0x07, 0x02, 0x02, 0x02, 0x02, 0x12, 0x0C],
        'K' => [0x11, 0x12, 0x14, 0x18, 0x14, 0x12, 0x11],
        'L' => [0x10, 0x10, 0x10, 0x10, 0x10, 0x10, 0x1F],
        'M' => [0x11, 0x1B, 0x15, 0x15, 0x11, 0x11, 0x11],
        'N' => [0x11, 0x11, 0x19, 0x15, 0x13, 0x11, 0x11],
        'O' => [0x0E, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'P' => [0x1E, 0x11, 0x11, 0x1E, 0x10, 0x10, 0x10],
        'Q' => [0x0E, 0x11, 0x11, 0x11, 0x15, 0x12, 0x0D],
        'R' => [0x1E, 0x11, 0x11, 0x1E, 0x14, 0x12, 0x11],
        'S' => [0x0F, 0x10, 0x10, 0x0E, 0x01, 0x01, 0x1E],
        'T' => [0x1F, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04],
        'U' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x0E],
        'V' => [0x11, 0x11, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'W' => [0x11, 0x11, 0x11, 0x15, 0x15, 0x15, 0x0A],
        'X' => [0x11, 0x11, 0x0A, 0x04, 0x0A, 0x11, 0x11],
        'Y' => [0x11, 0x11, 0x11, 0x0A, 0x04, 0x04, 0x04],
        'Z' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x10, 0x1F],
        'a' => [0x00, 0x00, 0x0E, 0x01, 0x0F, 0x11, 0x0F],
        'b' => [0x10, 0x10, 0x16, 0x19, 0x11, 0x11, 0x1E],
        'c' => [0x00, 0x00, 0x0E, 0x10, 0x10, 0x11, 0x0E],
        'd' => [0x01, 0x01, 0x0D, 0x13, 0x11, 0x11, 0x0F],
        'e' => [0x00, 0x00, 0x0E, 0x11, 0x1F, 0x10, 0x0E],
        'f' => [0x06, 0x09, 0x08, 0x1C, 0x08, 0x08, 0x08],
        'g' => [0x00, 0x0F, 0x11, 0x11, 0x0F, 0x01, 0x0E],
        'h' => [0x10, 0x10, 0x16, 0x19, 0x11, 0x11, 0x11],
        'i' => [0x04, 0x00, 0x0C, 0x04, 0x04, 0x04, 0x0E],
        'j' => [0x02, 0x00, 0x06, 0x02, 0x02, 0x12, 0x0C],
        'k' => [0x10, 0x10, 0x12, 0x14, 0x18, 0x14, 0x12],
        'l' => [0x0C, 0x04, 0x04, 0x04, 0x04, 0x04, 0x0E],
        'm' => [0x00, 0x00, 0x1A, 0x15, 0x15, 0x11, 0x11],
        'n' => [0x00, 0x00, 0x16, 0x19, 0x11, 0x11, 0x11],
        'o' => [0x00, 0x00, 0x0E, 0x11, 0x11, 0x11, 0x0E],
        'p' => [0x00, 0x00, 0x1E, 0x11, 0x1E, 0x10, 0x10],
        'q' => [0x00, 0x00, 0x0D, 0x13, 0x0F, 0x01, 0x01],
        'r' => [0x00, 0x00, 0x16, 0x19, 0x10, 0x10, 0x10],
        's' => [0x00, 0x00, 0x0E, 0x10, 0x0E, 0x01, 0x1E],
        't' => [0x08, 0x08, 0x1C, 0x08, 0x08, 0x09, 0x06],
        'u' => [0x00, 0x00, 0x11, 0x11, 0x11, 0x13, 0x0D],
        'v' => [0x00, 0x00, 0x11, 0x11, 0x11, 0x0A, 0x04],
        'w' => [0x00, 0x00, 0x11, 0x11, 0x15, 0x15, 0x0A],
        'x' => [0x00, 0x00, 0x11, 0x0A, 0x04, 0x0A, 0x11],
        'y' => [0x00, 0x00, 0x11, 0x11, 0x0F, 0x01, 0x0E],
        'z' => [0x00, 0x00, 0x1F, 0x02, 0x04, 0x08, 0x1F],
        ' ' => [0x00; 7],
        '_' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x1F],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        '+' => [0x00, 0x04, 0x04, 0x1F, 0x04, 0x04, 0x00],
        '=' => [0x00, 0x00, 0x1F, 0x00, 0x1F, 0x00, 0x00],
        '.' => [0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x0C],
        ',' => [0x00, 0x00, 0x00, 0x00, 0x0C, 0x04, 0x08],
        ':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
        '/' => [0x00, 0x01, 0x02, 0x04, 0x08, 0x10, 0x00],
        '(' => [0x02, 0x04, 0x08, 0x08, 0x08, 0x04, 0x02],
        ')' => [0x08, 0x04, 0x02, 0x02, 0x02, 0x04, 0x08],
        _ => [0x1F, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1F],
    }
}
