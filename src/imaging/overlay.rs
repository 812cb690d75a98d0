//! Order number overlay.
//!
//! The number is rendered once into a coverage mask, trimmed to its inked
//! area, and stamped twice: centred in the top margin and mirrored in the
//! bottom margin. Each stamp is red with a white stroke so it stays legible
//! over both the white margin and the wrap.
//!
//! Glyphs come from the configured TrueType font. When no font is configured
//! or it cannot be loaded, a built-in 5×7 bitmap face is used instead, so a
//! missing font never blocks a print.

use super::calculations::number_positions;
use super::params::PrintPlan;
use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use image::{GrayImage, Luma, Rgb, RgbImage, imageops};
use imageproc::distance_transform::Norm;
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut, text_size};
use imageproc::morphology::dilate;
use imageproc::rect::Rect;
use std::path::Path;
use tracing::debug;

pub const NUMBER_FILL: Rgb<u8> = Rgb([255, 0, 0]);
pub const NUMBER_STROKE: Rgb<u8> = Rgb([255, 255, 255]);
pub const STROKE_PX: u8 = 5;

/// Glyph source for the order number.
pub enum NumberFont {
    TrueType(FontVec),
    Builtin,
}

impl NumberFont {
    /// Load the font at `path`, falling back to the built-in face.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return NumberFont::Builtin;
        };
        match std::fs::read(path) {
            Ok(bytes) => match FontVec::try_from_vec(bytes) {
                Ok(font) => {
                    debug!(font = %path.display(), "loaded number font");
                    NumberFont::TrueType(font)
                }
                Err(e) => {
                    debug!(font = %path.display(), "invalid font, using built-in face: {e}");
                    NumberFont::Builtin
                }
            },
            Err(e) => {
                debug!(font = %path.display(), "cannot read font, using built-in face: {e}");
                NumberFont::Builtin
            }
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, NumberFont::Builtin)
    }

    /// Coverage mask of `text` at `size_px`, trimmed to the inked area.
    /// `None` when nothing would be drawn.
    pub fn rasterize(&self, text: &str, size_px: f32) -> Option<GrayImage> {
        if text.trim().is_empty() || size_px < 1.0 {
            return None;
        }
        let mask = match self {
            NumberFont::TrueType(font) => rasterize_truetype(font, text, size_px),
            NumberFont::Builtin => rasterize_builtin(text, size_px),
        };
        trim_mask(&mask)
    }
}

fn rasterize_truetype(font: &FontVec, text: &str, size_px: f32) -> GrayImage {
    let scale = PxScale::from(size_px);
    let (width, _) = text_size(scale, font, text);
    let line_height = font.as_scaled(scale).height().ceil().max(1.0) as u32;
    // Slack for glyphs that overhang their advance box
    let pad = (size_px / 4.0).ceil() as u32;
    let mut mask = GrayImage::new(width + 2 * pad, line_height + 2 * pad);
    draw_text_mut(&mut mask, Luma([255]), pad as i32, pad as i32, scale, font, text);
    mask
}

const GLYPH_ROWS: u32 = 7;
const GLYPH_COLS: u32 = 5;

fn rasterize_builtin(text: &str, size_px: f32) -> GrayImage {
    let module = ((size_px / (GLYPH_ROWS + 1) as f32).round() as u32).max(1);
    let chars: Vec<char> = text.chars().collect();
    let advance = (GLYPH_COLS + 1) * module;
    let width = (chars.len() as u32 * advance).max(1);
    let mut mask = GrayImage::new(width, GLYPH_ROWS * module);
    for (i, c) in chars.iter().enumerate() {
        let origin = i as u32 * advance;
        for (row, bits) in builtin_glyph(*c).iter().enumerate() {
            for col in 0..GLYPH_COLS {
                if bits & (1 << (GLYPH_COLS - 1 - col)) != 0 {
                    let rect = Rect::at((origin + col * module) as i32, (row as u32 * module) as i32)
                        .of_size(module, module);
                    draw_filled_rect_mut(&mut mask, rect, Luma([255]));
                }
            }
        }
    }
    mask
}

/// 5×7 bitmap rows, most significant of the low five bits on the left.
/// Unknown characters render as an empty box.
fn builtin_glyph(c: char) -> [u8; 7] {
    match c.to_ascii_uppercase() {
        ' ' => [0; 7],
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
        '!' => [0x04, 0x04, 0x04, 0x04, 0x04, 0x00, 0x04],
        '‼' => [0x0A, 0x0A, 0x0A, 0x0A, 0x0A, 0x00, 0x0A],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        '#' => [0x0A, 0x0A, 0x1F, 0x0A, 0x1F, 0x0A, 0x0A],
        _ => [0x1F, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1F],
    }
}

/// Crop `mask` to the bounding box of its non-zero pixels.
fn trim_mask(mask: &GrayImage) -> Option<GrayImage> {
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (u32::MAX, u32::MAX, 0, 0);
    for (x, y, p) in mask.enumerate_pixels() {
        if p[0] > 0 {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
    }
    if min_x == u32::MAX {
        return None;
    }
    Some(imageops::crop_imm(mask, min_x, min_y, max_x - min_x + 1, max_y - min_y + 1).to_image())
}

/// Stamp `mask` onto `canvas` with its top-left at `at`: a white stroke of
/// `stroke` pixels first, then the fill blended by coverage. Pixels that fall
/// outside the canvas are skipped.
pub fn stamp(canvas: &mut RgbImage, mask: &GrayImage, at: (i64, i64), fill: Rgb<u8>, stroke: u8) {
    let r = stroke as u32;
    let mut padded = GrayImage::new(mask.width() + 2 * r, mask.height() + 2 * r);
    imageops::replace(&mut padded, mask, r as i64, r as i64);
    let outline = (stroke > 0).then(|| dilate(&padded, Norm::L2, stroke));

    let (cw, ch) = (canvas.width() as i64, canvas.height() as i64);
    let (ox, oy) = (at.0 - r as i64, at.1 - r as i64);
    for (x, y, coverage) in padded.enumerate_pixels() {
        let (cx, cy) = (ox + x as i64, oy + y as i64);
        if cx < 0 || cy < 0 || cx >= cw || cy >= ch {
            continue;
        }
        let pixel = canvas.get_pixel_mut(cx as u32, cy as u32);
        if outline.as_ref().is_some_and(|o| o.get_pixel(x, y)[0] > 0) {
            *pixel = NUMBER_STROKE;
        }
        let a = coverage[0] as u32;
        if a > 0 {
            for c in 0..3 {
                pixel[c] = ((fill[c] as u32 * a + pixel[c] as u32 * (255 - a) + 127) / 255) as u8;
            }
        }
    }
}

/// Draw `number` in the top and bottom margins of a finished canvas.
pub fn draw_numbers(canvas: &mut RgbImage, plan: &PrintPlan, number: &str, font: &NumberFont) {
    let Some(mask) = font.rasterize(number, plan.font_px) else {
        return;
    };
    let positions = number_positions(
        canvas.dimensions(),
        mask.dimensions(),
        plan.white_px,
        plan.black_px,
    );
    for at in positions {
        stamp(canvas, &mask, at, NUMBER_FILL, STROKE_PX);
    }
}
