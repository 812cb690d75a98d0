//! Print compositing — pure Rust, statically linked.
//!
//! | Step | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` + EXIF orientation + embedded ICC |
//! | **Crop → resize** | `crop_imm` + Lanczos3 |
//! | **Wrap / frame / outline** | `image::imageops`, `imageproc::drawing` |
//! | **Order number** | `ab_glyph` TrueType, built-in bitmap fallback |
//! | **Encode → JPEG** | quality 100, DPI density, ICC profile |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for print geometry (unit testable)
//! - **Parameters**: [`CompositingPreset`] and the derived [`PrintPlan`]
//! - **Backend**: [`Compositor`] trait + [`RustCompositor`]
//! - **Operations**: The individual pixel steps
//! - **Overlay**, **ICC**, **Source**: number text, colour profile, decoding

pub mod backend;
mod calculations;
pub mod icc;
pub mod operations;
pub mod overlay;
mod params;
pub mod rust_backend;
pub mod source;

pub use backend::{Artifact, CompositeError, Compositor};
pub use calculations::{cm_to_px, font_size_px, margin_split, number_positions, outer_target_px};
pub use params::{CompositingPreset, MAX_CANVAS_PIXELS, MAX_PRINT_CM, PrintPlan};
pub use rust_backend::{RustCompositor, render};
pub use source::{SourceImage, is_supported_image, supported_input_extensions};
