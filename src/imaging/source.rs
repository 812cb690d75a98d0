//! Decoded source images.
//!
//! Sources are decoded once, normalised to 8-bit RGB with EXIF orientation
//! applied, and shared between the workflow, the cropper and the pipeline
//! behind an `Arc`.

use super::backend::CompositeError;
use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader, RgbImage};
use std::io::Cursor;
use std::path::Path;
use std::sync::LazyLock;

const PHOTO_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    PHOTO_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// True when `path` has one of the [`supported_input_extensions`].
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            supported_input_extensions()
                .iter()
                .any(|s| s.eq_ignore_ascii_case(ext))
        })
}

/// An upright RGB image plus the colour profile it was delivered with.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceImage {
    pub pixels: RgbImage,
    pub icc_profile: Option<Vec<u8>>,
}

impl SourceImage {
    /// Wrap already-decoded pixels that carry no colour profile.
    pub fn from_pixels(pixels: RgbImage) -> Self {
        Self {
            pixels,
            icc_profile: None,
        }
    }

    /// Decode an in-memory image, sniffing the format from its contents.
    pub fn decode(bytes: &[u8]) -> Result<Self, CompositeError> {
        let mut decoder = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()?
            .into_decoder()?;
        let icc_profile = decoder.icc_profile().ok().flatten();
        let orientation = decoder.orientation()?;
        let mut img = DynamicImage::from_decoder(decoder)?;
        img.apply_orientation(orientation);
        Ok(Self {
            pixels: img.into_rgb8(),
            icc_profile,
        })
    }

    /// Read and decode an image file.
    pub fn open(path: &Path) -> Result<Self, CompositeError> {
        let bytes = std::fs::read(path)?;
        Self::decode(&bytes).map_err(|e| match e {
            CompositeError::Image(source) => CompositeError::Decode {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// Encode as lossless PNG, for handing to external tools.
    pub fn write_png(&self, path: &Path) -> Result<(), CompositeError> {
        self.pixels.save_with_format(path, ImageFormat::Png)?;
        Ok(())
    }
}
