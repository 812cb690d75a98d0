//! Pixel operations of the compositing pipeline.
//!
//! Each function takes an image and returns a new one; sizes come from a
//! [`PrintPlan`](super::params::PrintPlan) so no step converts centimetres on
//! its own. The order is fixed:
//!
//! 1. [`crop_and_resize`] — cut the crop rectangle, resample to the inner size
//! 2. [`stretch_wrap`] — grow each edge by the wrap width with mirrored edge strips
//! 3. [`white_frame`] — centre on a white canvas of the exact outer size
//! 4. [`black_outline`] — draw the thin black cutting guide on the outer edge
//!
//! The order number overlay is in [`overlay`](super::overlay).

use crate::types::CropRect;
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

/// Width of the edge strip sampled for each wrap side.
pub const EDGE_STRIP_PX: u32 = 20;

/// Inset of the corner patch sampled for each wrap corner.
pub const CORNER_INSET_PX: u32 = 20;

/// Cut `crop` out of `source` and resample it to exactly `size`.
pub fn crop_and_resize(source: &RgbImage, crop: CropRect, size: (u32, u32)) -> RgbImage {
    let cropped = imageops::crop_imm(source, crop.left, crop.top, crop.width(), crop.height());
    if (crop.width(), crop.height()) == size {
        return cropped.to_image();
    }
    imageops::resize(&cropped.to_image(), size.0, size.1, FilterType::Lanczos3)
}

/// Extend every side of `img` by `wrap` pixels of mirrored, stretched edge.
///
/// Each side takes its outermost [`EDGE_STRIP_PX`] strip, stretches it across
/// the wrap width and mirrors it, so the fold line continues the picture.
/// Corners are filled from a small patch [`CORNER_INSET_PX`] in from each
/// corner, blown up to twice the wrap size with the quadrant facing the
/// corner kept.
pub fn stretch_wrap(img: &RgbImage, wrap: u32) -> RgbImage {
    if wrap == 0 {
        return img.clone();
    }
    let (w, h) = img.dimensions();
    let mut out = RgbImage::from_pixel(w + 2 * wrap, h + 2 * wrap, WHITE);
    imageops::replace(&mut out, img, wrap as i64, wrap as i64);

    let strip_w = EDGE_STRIP_PX.min(w);
    let strip_h = EDGE_STRIP_PX.min(h);
    let stretch = |x, y, sw, sh, tw, th| {
        let strip = imageops::crop_imm(img, x, y, sw, sh).to_image();
        imageops::resize(&strip, tw, th, FilterType::Lanczos3)
    };

    let left = imageops::flip_horizontal(&stretch(0, 0, strip_w, h, wrap, h));
    let right = imageops::flip_horizontal(&stretch(w - strip_w, 0, strip_w, h, wrap, h));
    let top = imageops::flip_vertical(&stretch(0, 0, w, strip_h, w, wrap));
    let bottom = imageops::flip_vertical(&stretch(0, h - strip_h, w, strip_h, w, wrap));
    imageops::replace(&mut out, &left, 0, wrap as i64);
    imageops::replace(&mut out, &right, (wrap + w) as i64, wrap as i64);
    imageops::replace(&mut out, &top, wrap as i64, 0);
    imageops::replace(&mut out, &bottom, wrap as i64, (wrap + h) as i64);

    // Patch inset shrinks on small images so the four patches never overlap.
    let inset = CORNER_INSET_PX.min(w / 3).min(h / 3).max(1);
    let patch = inset.min(w.saturating_sub(inset)).min(h.saturating_sub(inset)).max(1);
    let far_x = w.saturating_sub(inset + patch);
    let far_y = h.saturating_sub(inset + patch);
    let corners = [
        // (patch x, patch y, quadrant x, quadrant y, dest x, dest y)
        (inset, inset, 0, 0, 0, 0),
        (far_x, inset, wrap, 0, w + wrap, 0),
        (inset, far_y, 0, wrap, 0, h + wrap),
        (far_x, far_y, wrap, wrap, w + wrap, h + wrap),
    ];
    for (px, py, qx, qy, dx, dy) in corners {
        let blown = stretch(px, py, patch, patch, 2 * wrap, 2 * wrap);
        let quadrant = imageops::crop_imm(&blown, qx, qy, wrap, wrap).to_image();
        imageops::replace(&mut out, &quadrant, dx as i64, dy as i64);
    }
    out
}

/// Place `img` on a white canvas of exactly `target` size at `offset`.
///
/// A negative offset crops the image on that side.
pub fn white_frame(img: &RgbImage, target: (u32, u32), offset: (i64, i64)) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(target.0, target.1, WHITE);
    imageops::replace(&mut canvas, img, offset.0, offset.1);
    canvas
}

/// Draw a `thickness`-pixel black outline along the outer edge, in place.
pub fn black_outline(canvas: &mut RgbImage, thickness: u32) {
    let (w, h) = canvas.dimensions();
    for i in 0..thickness {
        if 2 * i >= w || 2 * i >= h {
            break;
        }
        let rect = Rect::at(i as i32, i as i32).of_size(w - 2 * i, h - 2 * i);
        draw_hollow_rect_mut(canvas, rect, BLACK);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32, c: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(w, h, Rgb(c))
    }

    /// Left half red, right half blue.
    fn split(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, _| {
            if x < w / 2 { Rgb([255, 0, 0]) } else { Rgb([0, 0, 255]) }
        })
    }

    // =========================================================================
    // crop_and_resize
    // =========================================================================

    #[test]
    fn crop_and_resize_hits_exact_size() {
        let src = solid(200, 100, [10, 20, 30]);
        let crop = CropRect { left: 9, top: 9, right: 191, bottom: 91 };
        let out = crop_and_resize(&src, crop, (57, 33));
        assert_eq!(out.dimensions(), (57, 33));
        assert_eq!(*out.get_pixel(20, 20), Rgb([10, 20, 30]));
    }

    #[test]
    fn crop_without_resize_keeps_pixels() {
        let src = split(100, 10);
        let crop = CropRect { left: 60, top: 0, right: 100, bottom: 10 };
        let out = crop_and_resize(&src, crop, (40, 10));
        assert!(out.pixels().all(|p| *p == Rgb([0, 0, 255])));
    }

    // =========================================================================
    // stretch_wrap
    // =========================================================================

    #[test]
    fn wrap_grows_every_side() {
        let out = stretch_wrap(&solid(100, 80, [1, 2, 3]), 15);
        assert_eq!(out.dimensions(), (130, 110));
    }

    #[test]
    fn wrap_zero_is_identity() {
        let img = split(30, 20);
        assert_eq!(stretch_wrap(&img, 0), img);
    }

    #[test]
    fn wrap_continues_the_edge_colour() {
        let out = stretch_wrap(&split(100, 60), 12);
        // Left wrap comes from the red edge, right wrap from the blue edge
        assert_eq!(*out.get_pixel(3, 40), Rgb([255, 0, 0]));
        assert_eq!(*out.get_pixel(124 - 3, 40), Rgb([0, 0, 255]));
        // Corners sample near their own corner
        assert_eq!(*out.get_pixel(2, 2), Rgb([255, 0, 0]));
        assert_eq!(*out.get_pixel(121, 81), Rgb([0, 0, 255]));
    }

    #[test]
    fn wrap_mirrors_the_edge_strip() {
        // Column 0 black, everything else white: after mirroring the black
        // column lands next to the image, not at the outer edge.
        let img = RgbImage::from_fn(40, 40, |x, _| if x == 0 { BLACK } else { WHITE });
        let out = stretch_wrap(&img, 20);
        let inner = out.get_pixel(19, 30)[0];
        let outer = out.get_pixel(0, 30)[0];
        assert!(inner < outer, "inner {inner} should be darker than outer {outer}");
    }

    #[test]
    fn wrap_handles_tiny_images() {
        let out = stretch_wrap(&solid(3, 3, [9, 9, 9]), 10);
        assert_eq!(out.dimensions(), (23, 23));
        assert_eq!(*out.get_pixel(0, 0), Rgb([9, 9, 9]));
    }

    // =========================================================================
    // white_frame and black_outline
    // =========================================================================

    #[test]
    fn white_frame_is_exact_and_centred() {
        let canvas = white_frame(&solid(10, 10, [0, 0, 0]), (16, 14), (3, 2));
        assert_eq!(canvas.dimensions(), (16, 14));
        assert_eq!(*canvas.get_pixel(2, 2), WHITE);
        assert_eq!(*canvas.get_pixel(3, 2), BLACK);
        assert_eq!(*canvas.get_pixel(12, 11), BLACK);
        assert_eq!(*canvas.get_pixel(13, 12), WHITE);
    }

    #[test]
    fn white_frame_negative_offset_crops() {
        let canvas = white_frame(&split(12, 4), (10, 4), (-1, 0));
        assert_eq!(canvas.dimensions(), (10, 4));
        assert_eq!(*canvas.get_pixel(0, 0), Rgb([255, 0, 0]));
        assert_eq!(*canvas.get_pixel(9, 0), Rgb([0, 0, 255]));
    }

    #[test]
    fn black_outline_has_requested_thickness() {
        let mut canvas = solid(20, 10, [255, 255, 255]);
        black_outline(&mut canvas, 2);
        assert_eq!(*canvas.get_pixel(0, 5), BLACK);
        assert_eq!(*canvas.get_pixel(1, 5), BLACK);
        assert_eq!(*canvas.get_pixel(2, 5), WHITE);
        assert_eq!(*canvas.get_pixel(19, 9), BLACK);
        assert_eq!(*canvas.get_pixel(18, 8), BLACK);
        assert_eq!(*canvas.get_pixel(17, 7), WHITE);
    }

    #[test]
    fn black_outline_zero_draws_nothing() {
        let mut canvas = solid(8, 8, [255, 255, 255]);
        black_outline(&mut canvas, 0);
        assert!(canvas.pixels().all(|p| *p == WHITE));
    }
}
