//! Pure calculation functions for print geometry.
//!
//! All functions here are pure and testable without any I/O or images.
//! Every centimetre → pixel conversion in a pipeline run goes through
//! [`cm_to_px`], so all steps agree on rounding.

const CM_PER_INCH: f64 = 2.54;

/// Convert centimetres to pixels at `dpi`, rounding to the nearest pixel.
///
/// # Examples
/// ```
/// # use print_finish::imaging::cm_to_px;
/// assert_eq!(cm_to_px(2.54, 300), 300);
/// assert_eq!(cm_to_px(30.0, 300), 3543); // 3543.307…
/// ```
pub fn cm_to_px(cm: f64, dpi: u32) -> u32 {
    let px = (cm * dpi as f64 / CM_PER_INCH).round();
    if px <= 0.0 { 0 } else { px as u32 }
}

/// Final outer size of the print along one axis: the ordered size plus
/// wrap and white margin on both sides, converted in one go.
pub fn outer_target_px(size_cm: f64, wrap_cm: f64, white_cm: f64, dpi: u32) -> u32 {
    cm_to_px(size_cm + 2.0 * wrap_cm + 2.0 * white_cm, dpi)
}

/// Split the white margin along one axis so the canvas hits `target` exactly.
///
/// `inner` is the already-wrapped image extent and `white_px` the nominal
/// margin. Because the image, wrap and margin were each rounded separately,
/// `inner + 2·white_px` can miss `target` by a few pixels. The difference is
/// taken out of the two margins: the near side (left/top) absorbs
/// `ceil(delta/2)`, the far side `floor(delta/2)`, so they never differ by
/// more than one pixel.
///
/// Returns `(near, far)`. A negative value means the image overhangs the
/// canvas on that side by that many pixels, which only happens when the
/// margin is narrower than the rounding drift (e.g. `white_cm = 0`).
///
/// # Examples
/// ```
/// # use print_finish::imaging::margin_split;
/// // 1 px too wide: left margin loses it
/// assert_eq!(margin_split(100, 10, 119), (9, 10));
/// // 1 px too narrow: right margin gains it
/// assert_eq!(margin_split(100, 10, 121), (10, 11));
/// ```
pub fn margin_split(inner: u32, white_px: u32, target: u32) -> (i64, i64) {
    let white = white_px as i64;
    let delta = inner as i64 + 2 * white - target as i64;
    let floor_half = delta.div_euclid(2);
    let ceil_half = delta - floor_half;
    (white - ceil_half, white - floor_half)
}

/// Order number glyph height in pixels: `font_pt` points at `dpi`.
pub fn font_size_px(font_pt: u32, dpi: u32) -> f32 {
    font_pt as f32 / 72.0 * dpi as f32
}

/// Distance the number is nudged away from the centre of its margin band,
/// towards the sheet edge.
pub const NUMBER_EDGE_NUDGE_PX: i64 = 10;

/// Top-left positions of the top and bottom order numbers.
///
/// The text is centred horizontally. The top copy sits centred inside the
/// margin band (`white_px` plus the `black_px` outline) and is nudged
/// [`NUMBER_EDGE_NUDGE_PX`] towards the edge; the bottom copy mirrors it.
pub fn number_positions(
    canvas: (u32, u32),
    text: (u32, u32),
    white_px: u32,
    black_px: u32,
) -> [(i64, i64); 2] {
    let (canvas_w, canvas_h) = (canvas.0 as i64, canvas.1 as i64);
    let (text_w, text_h) = (text.0 as i64, text.1 as i64);
    let x = (canvas_w - text_w).div_euclid(2);
    let band = (white_px + black_px) as i64;
    let top = band.div_euclid(2) - text_h.div_euclid(2) - NUMBER_EDGE_NUDGE_PX;
    let bottom = canvas_h - top - text_h;
    [(x, top), (x, bottom)]
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // cm_to_px tests
    // =========================================================================

    #[test]
    fn cm_to_px_one_inch() {
        assert_eq!(cm_to_px(2.54, 300), 300);
        assert_eq!(cm_to_px(2.54, 72), 72);
    }

    #[test]
    fn cm_to_px_rounds_to_nearest() {
        // 2.8 cm at 300 dpi = 330.708…
        assert_eq!(cm_to_px(2.8, 300), 331);
        // 1.2 cm at 300 dpi = 141.732…
        assert_eq!(cm_to_px(1.2, 300), 142);
        // 40 cm at 300 dpi = 4724.409…
        assert_eq!(cm_to_px(40.0, 300), 4724);
    }

    #[test]
    fn cm_to_px_zero_and_negative() {
        assert_eq!(cm_to_px(0.0, 300), 0);
        assert_eq!(cm_to_px(-1.0, 300), 0);
    }

    // =========================================================================
    // margin_split tests
    // =========================================================================

    #[test]
    fn margin_split_exact() {
        assert_eq!(margin_split(100, 10, 120), (10, 10));
    }

    #[test]
    fn margin_split_overshoot_by_two() {
        assert_eq!(margin_split(100, 10, 118), (9, 9));
    }

    #[test]
    fn margin_split_overshoot_by_three() {
        // ceil(3/2)=2 from the near side, floor(3/2)=1 from the far side
        assert_eq!(margin_split(100, 10, 117), (8, 9));
    }

    #[test]
    fn margin_split_undershoot_by_three() {
        // delta = -3: ceil(-1.5) = -1, floor(-1.5) = -2
        assert_eq!(margin_split(100, 10, 123), (11, 12));
    }

    #[test]
    fn margin_split_always_sums_to_target() {
        for inner in 90..110u32 {
            for white in 0..6u32 {
                for target in 95..125u32 {
                    let (near, far) = margin_split(inner, white, target);
                    assert_eq!(inner as i64 + near + far, target as i64);
                    assert!((near - far).abs() <= 1);
                }
            }
        }
    }

    #[test]
    fn margin_split_zero_white_can_overhang() {
        let (near, far) = margin_split(101, 0, 100);
        assert_eq!((near, far), (-1, 0));
    }

    // =========================================================================
    // outer target vs. independently rounded parts
    // =========================================================================

    #[test]
    fn independent_rounding_drifts_from_target() {
        // 30 cm + 2·2.8 + 2·1.2 at 300 dpi: parts round up, the whole does not
        let parts = cm_to_px(30.0, 300) + 2 * cm_to_px(2.8, 300) + 2 * cm_to_px(1.2, 300);
        let target = outer_target_px(30.0, 2.8, 1.2, 300);
        assert_eq!(target, 4488);
        assert_eq!(parts, 4489);
        let (near, far) = margin_split(parts - 2 * cm_to_px(1.2, 300), cm_to_px(1.2, 300), target);
        assert_eq!((near, far), (141, 142));
    }

    // =========================================================================
    // font and number placement
    // =========================================================================

    #[test]
    fn font_size_is_points_at_dpi() {
        assert_eq!(font_size_px(72, 300), 300.0);
        assert_eq!(font_size_px(36, 100), 50.0);
    }

    #[test]
    fn number_positions_are_mirrored() {
        let [(x_top, y_top), (x_bottom, y_bottom)] =
            number_positions((1000, 2000), (200, 40), 142, 4);
        assert_eq!(x_top, 400);
        assert_eq!(x_bottom, 400);
        // (142+4)/2 - 40/2 - 10 = 43
        assert_eq!(y_top, 43);
        // Same distance from the bottom edge as the top copy from the top edge
        assert_eq!(2000 - (y_bottom + 40), y_top);
    }

    #[test]
    fn number_positions_can_start_off_canvas_for_huge_text() {
        let [(_, y_top), _] = number_positions((500, 500), (100, 400), 20, 0);
        assert!(y_top < 0);
    }
}
