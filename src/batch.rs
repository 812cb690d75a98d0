//! Non-interactive rendering of files and directories.
//!
//! The `render` command runs each input through the same caption rules and
//! compositor as the interactive workflow, but never asks anything: an input
//! whose caption yields zero or several sizes, or that asks for a manual crop,
//! is reported as skipped.
//!
//! The caption defaults to the file stem, so a folder of files named like
//! `501 30x40 banner.jpg` renders without any flags. Command-line overrides
//! replace the matching part of the parsed caption.
//!
//! Inputs are rendered in parallel on the global rayon pool; results come
//! back in input order.

use crate::caption::{self, OrderIntent};
use crate::config::CompositingSettings;
use crate::imaging::{Artifact, CompositingPreset, Compositor, SourceImage, is_supported_image};
use crate::types::{Material, SizeCandidate};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Input not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },
}

/// Command-line values that replace what the caption says.
#[derive(Debug, Clone, Default)]
pub struct RenderOverrides {
    /// Caption to parse instead of the file stem.
    pub caption: Option<String>,
    pub size: Option<SizeCandidate>,
    pub number: Option<String>,
    pub material: Option<Material>,
}

#[derive(Debug)]
pub enum RenderOutcome {
    Rendered(Artifact),
    Skipped(String),
    Failed(String),
}

#[derive(Debug)]
pub struct RenderEntry {
    pub source: PathBuf,
    pub outcome: RenderOutcome,
}

#[derive(Debug, Default)]
pub struct RenderReport {
    pub entries: Vec<RenderEntry>,
}

impl RenderReport {
    pub fn rendered(&self) -> usize {
        self.count(|o| matches!(o, RenderOutcome::Rendered(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, RenderOutcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, RenderOutcome::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&RenderOutcome) -> bool) -> usize {
        self.entries.iter().filter(|e| pred(&e.outcome)).count()
    }
}

/// Expand `paths` into the image files to render.
///
/// Files are taken as given if their extension is supported; directories are
/// walked recursively in file-name order.
pub fn collect_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>, BatchError> {
    let mut inputs = Vec::new();
    for path in paths {
        if path.is_file() {
            if is_supported_image(path) {
                inputs.push(path.clone());
            } else {
                warn!(path = %path.display(), "not a supported image, ignoring");
            }
        } else if path.is_dir() {
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry = entry.map_err(|source| BatchError::Walk {
                    path: path.clone(),
                    source,
                })?;
                if entry.file_type().is_file() && is_supported_image(entry.path()) {
                    inputs.push(entry.into_path());
                }
            }
        } else {
            return Err(BatchError::NotFound(path.clone()));
        }
    }
    Ok(inputs)
}

/// Caption rules plus overrides for one input file.
pub fn intent_for(path: &Path, overrides: &RenderOverrides) -> OrderIntent {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut intent = caption::parse(overrides.caption.as_deref().unwrap_or(&stem));
    if let Some(size) = overrides.size {
        intent.sizes = vec![size];
        intent.cropper_requested = false;
    }
    if let Some(number) = &overrides.number {
        intent.number = Some(number.clone());
    }
    if let Some(material) = overrides.material {
        intent.material = material;
        intent.material_guessed = false;
    }
    intent
}

/// Render every input with `compositor`, in parallel.
pub fn render_all(
    inputs: &[PathBuf],
    overrides: &RenderOverrides,
    settings: &CompositingSettings,
    output_root: &Path,
    compositor: &dyn Compositor,
) -> RenderReport {
    let entries = inputs
        .par_iter()
        .map(|source| {
            let outcome = render_one(source, overrides, settings, output_root, compositor);
            match &outcome {
                RenderOutcome::Rendered(artifact) => {
                    info!(source = %source.display(), path = %artifact.path.display(), "rendered")
                }
                RenderOutcome::Skipped(reason) => {
                    warn!(source = %source.display(), %reason, "skipped")
                }
                RenderOutcome::Failed(error) => {
                    warn!(source = %source.display(), %error, "failed")
                }
            }
            RenderEntry {
                source: source.clone(),
                outcome,
            }
        })
        .collect();
    RenderReport { entries }
}

fn render_one(
    source: &Path,
    overrides: &RenderOverrides,
    settings: &CompositingSettings,
    output_root: &Path,
    compositor: &dyn Compositor,
) -> RenderOutcome {
    let intent = intent_for(source, overrides);
    if intent.cropper_requested {
        return RenderOutcome::Skipped("manual crop requested".into());
    }
    let size = match intent.sizes.as_slice() {
        [] => return RenderOutcome::Skipped("no size found".into()),
        [only] => *only,
        _ => {
            return RenderOutcome::Skipped(format!(
                "several sizes: {}",
                intent.size_labels().join(", ")
            ));
        }
    };

    let image = match SourceImage::open(source) {
        Ok(image) => Arc::new(image),
        Err(e) => return RenderOutcome::Failed(e.to_string()),
    };
    let (w, h) = image.dimensions();
    let size = size.oriented_for(w, h);
    let preset = CompositingPreset {
        image,
        number: intent.display_number(),
        width_cm: size.width as f64,
        height_cm: size.height as f64,
        material: intent.material,
        crop: None,
        settings: settings.clone(),
    };
    match compositor.composite(&preset, output_root) {
        Ok(artifact) => RenderOutcome::Rendered(artifact),
        Err(e) => RenderOutcome::Failed(e.to_string()),
    }
}
