//! Pure Rust compositing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Step | Crate / function |
//! |---|---|
//! | Crop + resize | `image::imageops::crop_imm` + `resize` with `Lanczos3` |
//! | Wrap strips, corners | `image::imageops` resize, flip, replace |
//! | Black outline | `imageproc::drawing::draw_hollow_rect_mut` |
//! | Order number | `ab_glyph` + `imageproc::drawing::draw_text_mut`, stroke via `imageproc::morphology::dilate` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` (quality 100, DPI density, ICC profile) |

use super::backend::{Artifact, CompositeError, Compositor};
use super::icc::srgb_profile;
use super::operations::{black_outline, crop_and_resize, stretch_wrap, white_frame};
use super::overlay::{NumberFont, draw_numbers};
use super::params::{CompositingPreset, PrintPlan};
use crate::naming::{artifact_file_name, disambiguated_name};
use image::codecs::jpeg::{JpegEncoder, PixelDensity};
use image::{ExtendedColorType, ImageEncoder, RgbImage};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// JPEG quality of every finished print.
pub const JPEG_QUALITY: u8 = 100;

/// Give up looking for a free filename after this many attempts.
const MAX_NAME_ATTEMPTS: u32 = 10_000;

/// Pure Rust compositor using the `image` and `imageproc` crates.
///
/// See the [module docs](self) for the crate-to-step mapping.
pub struct RustCompositor;

impl RustCompositor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustCompositor {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the pixel steps for `preset` and return the finished canvas.
///
/// The canvas is exactly [`PrintPlan::target`] in size.
pub fn render(preset: &CompositingPreset, font: &NumberFont) -> RgbImage {
    let plan = PrintPlan::for_preset(preset);
    let inner = crop_and_resize(&preset.image.pixels, plan.crop, plan.inner);
    let wrapped = stretch_wrap(&inner, plan.wrap_px);
    let mut canvas = white_frame(&wrapped, plan.target, plan.offset);
    black_outline(&mut canvas, plan.black_px);
    draw_numbers(&mut canvas, &plan, &preset.number, font);
    canvas
}

/// Colour profile to embed: the source's own, else the configured file,
/// else the built-in sRGB profile.
fn output_profile(preset: &CompositingPreset) -> Vec<u8> {
    if let Some(icc) = &preset.image.icc_profile {
        return icc.clone();
    }
    if let Some(path) = &preset.settings.icc_profile {
        match std::fs::read(path) {
            Ok(bytes) if !bytes.is_empty() => return bytes,
            Ok(_) => warn!(profile = %path.display(), "empty ICC profile, using built-in sRGB"),
            Err(e) => warn!(profile = %path.display(), "cannot read ICC profile, using built-in sRGB: {e}"),
        }
    }
    srgb_profile().to_vec()
}

/// Atomically create the first free `base`, `base (2)`, … in `dir`.
fn create_unique(dir: &Path, base: &str) -> Result<(PathBuf, File), CompositeError> {
    for attempt in 1..=MAX_NAME_ATTEMPTS {
        let path = dir.join(disambiguated_name(base, attempt));
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(CompositeError::Io(std::io::Error::new(
        ErrorKind::AlreadyExists,
        format!("no free name for {base} in {}", dir.display()),
    )))
}

fn encode_jpeg(
    canvas: &RgbImage,
    file: File,
    dpi: u32,
    icc: Vec<u8>,
) -> Result<(), image::ImageError> {
    let mut writer = BufWriter::new(file);
    let mut encoder = JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY);
    encoder.set_pixel_density(PixelDensity::dpi(dpi.min(u16::MAX as u32) as u16));
    if let Err(e) = encoder.set_icc_profile(icc) {
        warn!("JPEG encoder rejected ICC profile: {e}");
    }
    encoder.write_image(
        canvas.as_raw(),
        canvas.width(),
        canvas.height(),
        ExtendedColorType::Rgb8,
    )?;
    writer.flush()?;
    Ok(())
}

impl Compositor for RustCompositor {
    fn composite(
        &self,
        preset: &CompositingPreset,
        output_root: &Path,
    ) -> Result<Artifact, CompositeError> {
        preset.validate()?;
        let font = NumberFont::load(preset.settings.font_path.as_deref());
        let canvas = render(preset, &font);
        debug!(
            number = %preset.number,
            width = canvas.width(),
            height = canvas.height(),
            "rendered print"
        );

        let dir = output_root.join(preset.material.name());
        std::fs::create_dir_all(&dir)?;
        let base = artifact_file_name(&preset.size_label(), &preset.number, preset.material);
        let (path, file) = create_unique(&dir, &base)?;

        // A failed encode leaves the partial file in place; its path travels
        // with the error so the operator can inspect or delete it.
        encode_jpeg(&canvas, file, preset.settings.dpi, output_profile(preset)).map_err(|e| {
            CompositeError::Save {
                path: path.clone(),
                reason: e.to_string(),
            }
        })?;
        info!(path = %path.display(), "saved print");

        Ok(Artifact {
            path,
            material: preset.material,
            number: preset.number.clone(),
            pixel_size: canvas.dimensions(),
        })
    }
}
