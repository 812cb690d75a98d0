//! Shared types used across the parser, the workflow and the imaging pipeline.
//!
//! [`Material`] and [`CropRect`] are part of the cropper wire format, so they
//! are serializable and must stay stable.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identity of the person submitting images. Every submitter gets exactly one
/// worker at a time.
pub type SubmitterId = u64;

/// Print substrate.
///
/// The variant order here is not the classification priority; see
/// [`crate::caption`] for the keyword table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Material {
    #[default]
    Canvas,
    MatteCanvas,
    Cotton,
    Banner,
}

impl Material {
    pub const ALL: [Material; 4] = [
        Material::Canvas,
        Material::MatteCanvas,
        Material::Cotton,
        Material::Banner,
    ];

    /// Human-readable name, also used as the output subdirectory and the
    /// filename suffix.
    pub fn name(self) -> &'static str {
        match self {
            Material::Canvas => "Canvas",
            Material::MatteCanvas => "Matte canvas",
            Material::Cotton => "Cotton",
            Material::Banner => "Banner",
        }
    }

    /// One-character filename prefix that makes non-default materials stand
    /// out in a sorted directory listing.
    pub fn prefix(self) -> &'static str {
        match self {
            Material::Banner => "_",
            Material::MatteCanvas => "@",
            Material::Canvas | Material::Cotton => "",
        }
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Material {
    type Err = String;

    /// Accepts the display name or the snake_case wire name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Material::ALL
            .into_iter()
            .find(|m| {
                m.name().to_lowercase() == wanted
                    || m.name().to_lowercase().replace(' ', "_") == wanted
            })
            .ok_or_else(|| format!("unknown material '{s}'"))
    }
}

/// A requested print size in whole centimetres, in caption order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SizeCandidate {
    pub width: u32,
    pub height: u32,
}

impl SizeCandidate {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_portrait(self) -> bool {
        self.width < self.height
    }

    /// Swap to landscape when the source image is landscape but the size was
    /// written portrait-first. Customers routinely write the short side first.
    pub fn oriented_for(self, image_width: u32, image_height: u32) -> Self {
        if image_width > image_height && self.is_portrait() {
            Self::new(self.height, self.width)
        } else {
            self
        }
    }
}

impl fmt::Display for SizeCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for SizeCandidate {
    type Err = String;

    /// Parses the canonical `WxH` form (also accepts `X`, `×` and Cyrillic `х`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (w, h) = s
            .split_once(['x', 'X', '×', 'х', 'Х'])
            .ok_or_else(|| format!("expected WxH, got '{s}'"))?;
        let width = w.trim().parse::<u32>().map_err(|e| format!("bad width in '{s}': {e}"))?;
        let height = h.trim().parse::<u32>().map_err(|e| format!("bad height in '{s}': {e}"))?;
        if width == 0 || height == 0 {
            return Err(format!("size must be non-zero, got '{s}'"));
        }
        Ok(Self { width, height })
    }
}

/// Pixel rectangle in source-image coordinates. `right` and `bottom` are
/// exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl CropRect {
    /// Whole image minus `trim` pixels on every side. Falls back to the whole
    /// image when the trim would leave nothing.
    pub fn trimmed(width: u32, height: u32, trim: u32) -> Self {
        if width <= trim * 2 || height <= trim * 2 {
            return Self {
                left: 0,
                top: 0,
                right: width,
                bottom: height,
            };
        }
        Self {
            left: trim,
            top: trim,
            right: width - trim,
            bottom: height - trim,
        }
    }

    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    /// Non-empty and fully inside a `width × height` image.
    pub fn fits(&self, width: u32, height: u32) -> bool {
        self.left < self.right
            && self.top < self.bottom
            && self.right <= width
            && self.bottom <= height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn material_prefixes() {
        assert_eq!(Material::Canvas.prefix(), "");
        assert_eq!(Material::Cotton.prefix(), "");
        assert_eq!(Material::Banner.prefix(), "_");
        assert_eq!(Material::MatteCanvas.prefix(), "@");
    }

    #[test]
    fn material_from_display_and_wire_names() {
        assert_eq!("Matte canvas".parse::<Material>(), Ok(Material::MatteCanvas));
        assert_eq!("matte_canvas".parse::<Material>(), Ok(Material::MatteCanvas));
        assert_eq!("BANNER".parse::<Material>(), Ok(Material::Banner));
        assert!("vinyl".parse::<Material>().is_err());
    }

    #[test]
    fn material_serializes_snake_case() {
        let json = serde_json::to_string(&Material::MatteCanvas).unwrap();
        assert_eq!(json, "\"matte_canvas\"");
    }

    #[test]
    fn size_display_is_canonical() {
        assert_eq!(SizeCandidate::new(30, 40).to_string(), "30x40");
    }

    #[test]
    fn size_parses_confusable_separators() {
        assert_eq!("30x40".parse::<SizeCandidate>(), Ok(SizeCandidate::new(30, 40)));
        assert_eq!("30х40".parse::<SizeCandidate>(), Ok(SizeCandidate::new(30, 40)));
        assert_eq!(" 50×70 ".parse::<SizeCandidate>(), Ok(SizeCandidate::new(50, 70)));
        assert!("30-40".parse::<SizeCandidate>().is_err());
        assert!("0x40".parse::<SizeCandidate>().is_err());
    }

    #[test]
    fn orientation_swaps_portrait_size_for_landscape_image() {
        let size = SizeCandidate::new(30, 40);
        assert_eq!(size.oriented_for(4000, 3000), SizeCandidate::new(40, 30));
        assert_eq!(size.oriented_for(3000, 4000), size);
        // Square images never trigger the swap
        assert_eq!(size.oriented_for(3000, 3000), size);
        // Landscape size on landscape image stays put
        let wide = SizeCandidate::new(60, 40);
        assert_eq!(wide.oriented_for(4000, 3000), wide);
    }

    #[test]
    fn trimmed_rect_removes_rim() {
        let r = CropRect::trimmed(100, 80, 9);
        assert_eq!(r, CropRect { left: 9, top: 9, right: 91, bottom: 71 });
        assert_eq!((r.width(), r.height()), (82, 62));
    }

    #[test]
    fn trimmed_rect_falls_back_for_tiny_images() {
        let r = CropRect::trimmed(10, 10, 9);
        assert_eq!(r, CropRect { left: 0, top: 0, right: 10, bottom: 10 });
    }

    #[test]
    fn rect_fits_checks_bounds() {
        let r = CropRect { left: 0, top: 0, right: 100, bottom: 50 };
        assert!(r.fits(100, 50));
        assert!(!r.fits(99, 50));
        let empty = CropRect { left: 10, top: 0, right: 10, bottom: 50 };
        assert!(!empty.fits(100, 50));
    }
}
