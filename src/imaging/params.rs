//! Parameter types for the compositing pipeline.
//!
//! These structs describe *what* to print, not *how* to do it. They are the
//! interface between the workflow (which decides size, number and material)
//! and the [`backend`](super::backend) (which does the pixel work).
//!
//! ## Types
//!
//! - [`CompositingPreset`] — Everything one pipeline run needs: source image, order number, size, material, optional crop, settings.
//! - [`PrintPlan`] — Pixel geometry derived from a preset; every step reads its sizes from here.

use super::backend::CompositeError;
use super::calculations::{cm_to_px, font_size_px, margin_split, outer_target_px};
use super::source::SourceImage;
use crate::config::CompositingSettings;
use crate::types::{CropRect, Material};
use std::sync::Arc;

/// Largest print edge accepted, in centimetres.
pub const MAX_PRINT_CM: f64 = 1000.0;

/// Largest finished canvas accepted, in pixels.
///
/// The pipeline holds a few full-size RGB buffers at once, and a failed
/// allocation aborts the process rather than failing the item, so oversized
/// prints are refused up front. 256 Mpx covers 150x100 cm at 300 dpi.
pub const MAX_CANVAS_PIXELS: u64 = 256_000_000;

/// Smallest inner image edge, in pixels, that the wrap step can sample from.
pub const MIN_INNER_PX: u32 = 3;

/// Parameters for one compositing run.
#[derive(Debug, Clone)]
pub struct CompositingPreset {
    pub image: Arc<SourceImage>,
    /// Order number as printed on the margin and used in the filename.
    pub number: String,
    pub width_cm: f64,
    pub height_cm: f64,
    pub material: Material,
    /// Region of the source to print. `None` means the whole image minus
    /// `settings.crop_px` on every side.
    pub crop: Option<CropRect>,
    pub settings: CompositingSettings,
}

impl CompositingPreset {
    /// Reject presets the pipeline cannot honour before any pixel work starts.
    pub fn validate(&self) -> Result<(), CompositeError> {
        self.settings
            .validate()
            .map_err(|e| CompositeError::InvalidPreset(e.to_string()))?;
        for (axis, value) in [("width", self.width_cm), ("height", self.height_cm)] {
            if !value.is_finite() || value <= 0.0 || value > MAX_PRINT_CM {
                return Err(CompositeError::InvalidPreset(format!(
                    "{axis} must be in (0, {MAX_PRINT_CM}] cm, got {value}"
                )));
            }
        }
        let (w, h) = self.image.dimensions();
        if w == 0 || h == 0 {
            return Err(CompositeError::InvalidPreset("source image is empty".into()));
        }
        if let Some(rect) = self.crop.filter(|r| !r.fits(w, h)) {
            return Err(CompositeError::InvalidPreset(format!(
                "crop {}..{} x {}..{} does not fit a {w}x{h} image",
                rect.left, rect.right, rect.top, rect.bottom
            )));
        }
        let plan = PrintPlan::for_preset(self);
        if plan.inner.0 < MIN_INNER_PX || plan.inner.1 < MIN_INNER_PX {
            return Err(CompositeError::InvalidPreset(format!(
                "{}x{} cm at {} dpi is too small to print",
                self.width_cm, self.height_cm, self.settings.dpi
            )));
        }
        let pixels = u64::from(plan.target.0) * u64::from(plan.target.1);
        if pixels > MAX_CANVAS_PIXELS {
            return Err(CompositeError::InvalidPreset(format!(
                "{}x{} cm at {} dpi is {}x{} px, over the {} Mpx limit",
                self.width_cm,
                self.height_cm,
                self.settings.dpi,
                plan.target.0,
                plan.target.1,
                MAX_CANVAS_PIXELS / 1_000_000
            )));
        }
        Ok(())
    }

    /// Crop rectangle the pipeline will actually use.
    pub fn effective_crop(&self) -> CropRect {
        let (w, h) = self.image.dimensions();
        self.crop
            .unwrap_or_else(|| CropRect::trimmed(w, h, self.settings.crop_px))
    }

    /// Size label used in filenames, e.g. `30x40` or `30.5x40`.
    pub fn size_label(&self) -> String {
        format!("{}x{}", self.width_cm, self.height_cm)
    }
}

/// Pixel geometry for one print. All centimetre values are converted once,
/// here, with [`cm_to_px`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrintPlan {
    pub crop: CropRect,
    /// Image area after resize, before wrap.
    pub inner: (u32, u32),
    pub wrap_px: u32,
    pub white_px: u32,
    pub black_px: u32,
    /// Exact outer size of the finished canvas.
    pub target: (u32, u32),
    /// Offset of the wrapped image on the canvas; may be negative when the
    /// white margin is thinner than the rounding drift.
    pub offset: (i64, i64),
    pub font_px: f32,
}

impl PrintPlan {
    pub fn for_preset(preset: &CompositingPreset) -> Self {
        let s = &preset.settings;
        let inner = (
            cm_to_px(preset.width_cm, s.dpi),
            cm_to_px(preset.height_cm, s.dpi),
        );
        let wrap_px = cm_to_px(s.wrap_cm, s.dpi);
        let white_px = cm_to_px(s.white_cm, s.dpi);
        let target = (
            outer_target_px(preset.width_cm, s.wrap_cm, s.white_cm, s.dpi),
            outer_target_px(preset.height_cm, s.wrap_cm, s.white_cm, s.dpi),
        );
        let (left, _) = margin_split(inner.0 + 2 * wrap_px, white_px, target.0);
        let (top, _) = margin_split(inner.1 + 2 * wrap_px, white_px, target.1);
        Self {
            crop: preset.effective_crop(),
            inner,
            wrap_px,
            white_px,
            black_px: s.black_px,
            target,
            offset: (left, top),
            font_px: font_size_px(s.font_px, s.dpi),
        }
    }

    /// Size of the image after the wrap step.
    pub fn wrapped(&self) -> (u32, u32) {
        (
            self.inner.0 + 2 * self.wrap_px,
            self.inner.1 + 2 * self.wrap_px,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{gradient_source, test_settings};

    fn preset(width_cm: f64, height_cm: f64) -> CompositingPreset {
        CompositingPreset {
            image: gradient_source(120, 160),
            number: "501".into(),
            width_cm,
            height_cm,
            material: Material::Canvas,
            crop: None,
            settings: test_settings(),
        }
    }

    #[test]
    fn valid_preset_passes() {
        assert!(preset(20.0, 30.0).validate().is_ok());
    }

    #[test]
    fn zero_and_negative_sizes_rejected() {
        assert!(preset(0.0, 30.0).validate().is_err());
        assert!(preset(20.0, -1.0).validate().is_err());
        assert!(preset(f64::NAN, 30.0).validate().is_err());
        assert!(preset(20.0, MAX_PRINT_CM + 1.0).validate().is_err());
    }

    #[test]
    fn oversized_canvas_rejected_before_pixel_work() {
        let huge = preset(999.0, 999.0);
        let err = huge.validate().unwrap_err();
        assert!(err.to_string().contains("Mpx limit"), "got {err}");

        let mut at_300 = preset(150.0, 100.0);
        at_300.settings.dpi = 300;
        assert!(at_300.validate().is_ok());
        at_300.width_cm = 300.0;
        assert!(matches!(at_300.validate(), Err(CompositeError::InvalidPreset(_))));
    }

    #[test]
    fn crop_outside_image_rejected() {
        let mut p = preset(20.0, 30.0);
        p.crop = Some(CropRect { left: 0, top: 0, right: 121, bottom: 160 });
        let err = p.validate().unwrap_err();
        assert!(err.to_string().contains("does not fit"));
    }

    #[test]
    fn bad_settings_rejected() {
        let mut p = preset(20.0, 30.0);
        p.settings.dpi = 0;
        assert!(matches!(p.validate(), Err(CompositeError::InvalidPreset(_))));
    }

    #[test]
    fn default_crop_is_trimmed() {
        let p = preset(20.0, 30.0);
        let trim = p.settings.crop_px;
        assert_eq!(p.effective_crop(), CropRect::trimmed(120, 160, trim));
    }

    #[test]
    fn size_label_formats_fractions() {
        assert_eq!(preset(30.0, 40.0).size_label(), "30x40");
        assert_eq!(preset(30.5, 40.0).size_label(), "30.5x40");
    }

    #[test]
    fn plan_wrapped_plus_margins_is_target() {
        let p = preset(33.0, 47.0);
        let plan = PrintPlan::for_preset(&p);
        let (ww, wh) = plan.wrapped();
        let (_, right) = margin_split(ww, plan.white_px, plan.target.0);
        let (_, bottom) = margin_split(wh, plan.white_px, plan.target.1);
        assert_eq!(plan.offset.0 + ww as i64 + right, plan.target.0 as i64);
        assert_eq!(plan.offset.1 + wh as i64 + bottom, plan.target.1 as i64);
    }
}
