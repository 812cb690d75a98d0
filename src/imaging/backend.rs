//! Compositing backend trait and shared types.
//!
//! The [`Compositor`] trait turns a validated
//! [`CompositingPreset`](super::params::CompositingPreset) into a finished
//! print file. The production implementation is
//! [`RustCompositor`](super::rust_backend::RustCompositor); tests swap in a
//! recording mock so workflow logic can be exercised without pixel work.

use super::params::CompositingPreset;
use crate::types::Material;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompositeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("Invalid preset: {0}")]
    InvalidPreset(String),
    #[error("Failed to write {path}: {reason}")]
    Save { path: PathBuf, reason: String },
}

impl CompositeError {
    /// Path of a file that was created but not fully written, if any.
    pub fn partial_path(&self) -> Option<&Path> {
        match self {
            CompositeError::Save { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// A finished print file.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub path: PathBuf,
    pub material: Material,
    pub number: String,
    /// Final canvas size in pixels.
    pub pixel_size: (u32, u32),
}

/// Trait for compositing backends.
///
/// Implementations must validate the preset, never overwrite an existing
/// file, and place the result under `output_root/<material name>/`.
pub trait Compositor: Send + Sync {
    fn composite(
        &self,
        preset: &CompositingPreset,
        output_root: &Path,
    ) -> Result<Artifact, CompositeError>;
}
