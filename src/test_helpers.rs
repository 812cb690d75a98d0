//! Shared test utilities for the print-finish test suite.
//!
//! Provides synthetic images, low-resolution settings that keep pixel tests
//! fast, and notification helpers for driving a [`Workflow`] from tests.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let preset = sample_preset("501");
//! let (workflow, mut rx, mock) = mock_workflow(MockCompositor::new(), ScriptedCropper::skipping());
//! workflow.submit(1, gradient_source(120, 160), Some("20x30 501".into()));
//! let ready = recv_until(&mut rx, is_terminal).await;
//! assert_eq!(mock.numbers(), vec!["501".to_string()]);
//! ```

use crate::config::CompositingSettings;
use crate::cropper::{CropRequest, CropResult, Cropper, CropperBridge, CropperError};
use crate::imaging::backend::tests::MockCompositor;
use crate::imaging::{CompositingPreset, SourceImage};
use crate::notify::{ArtifactShelf, Notification};
use crate::types::Material;
use crate::workflow::{Workflow, WorkflowDeps};
use image::{Rgb, RgbImage};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

// =========================================================================
// Images and presets
// =========================================================================

/// Red/green gradient with constant blue, so it never contains pure red.
pub fn gradient_pixels(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
        ])
    })
}

pub fn gradient_source(width: u32, height: u32) -> Arc<SourceImage> {
    Arc::new(SourceImage::from_pixels(gradient_pixels(width, height)))
}

/// Low-DPI settings: real geometry, small canvases.
pub fn test_settings() -> CompositingSettings {
    CompositingSettings {
        dpi: 50,
        wrap_cm: 2.8,
        white_cm: 1.2,
        black_px: 1,
        font_px: 36,
        crop_px: 9,
        font_path: None,
        icc_profile: None,
    }
}

/// A 20×30 cm canvas preset over a 120×160 gradient.
pub fn sample_preset(number: &str) -> CompositingPreset {
    CompositingPreset {
        image: gradient_source(120, 160),
        number: number.to_string(),
        width_cm: 20.0,
        height_cm: 30.0,
        material: Material::Canvas,
        crop: None,
        settings: test_settings(),
    }
}

// =========================================================================
// Cropper doubles
// =========================================================================

/// Cropper that replays a fixed answer and records every request.
pub struct ScriptedCropper {
    pub answer: Option<(String, f64, f64, Material)>,
    pub delay: Duration,
    /// Shared so a test can keep a handle after the cropper moves into a workflow.
    pub requests: Arc<Mutex<Vec<(String, Option<f64>, Option<f64>)>>>,
}

impl ScriptedCropper {
    /// Operator closes the tool without saving.
    pub fn skipping() -> Self {
        Self {
            answer: None,
            delay: Duration::ZERO,
            requests: Arc::default(),
        }
    }

    /// Operator confirms with the given number, size and material.
    pub fn answering(number: &str, width_cm: f64, height_cm: f64, material: Material) -> Self {
        Self {
            answer: Some((number.to_string(), width_cm, height_cm, material)),
            delay: Duration::ZERO,
            requests: Arc::default(),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl Cropper for ScriptedCropper {
    fn crop(&self, request: CropRequest) -> Result<Option<CropResult>, CropperError> {
        self.requests
            .lock()
            .unwrap()
            .push((request.number.clone(), request.width_cm, request.height_cm));
        std::thread::sleep(self.delay);
        Ok(self.answer.clone().map(|(number, width_cm, height_cm, material)| {
            let (w, h) = request.image.dimensions();
            CropResult {
                image: request.image.clone(),
                number,
                width_cm,
                height_cm,
                material,
                crop: crate::types::CropRect {
                    left: 0,
                    top: 0,
                    right: w,
                    bottom: h,
                },
            }
        }))
    }
}

// =========================================================================
// Workflow harness
// =========================================================================

/// Workflow over a mock compositor with fast cropper polling.
pub fn mock_workflow(
    compositor: MockCompositor,
    cropper: ScriptedCropper,
) -> (Workflow, mpsc::UnboundedReceiver<Notification>, Arc<MockCompositor>) {
    let compositor = Arc::new(compositor);
    let (tx, rx) = mpsc::unbounded_channel();
    let workflow = Workflow::new(
        WorkflowDeps {
            compositor: compositor.clone(),
            cropper: CropperBridge::new(Arc::new(cropper), Duration::from_millis(10)),
            settings: test_settings(),
            output_root: PathBuf::from("/virtual/out"),
            shelf: Arc::new(ArtifactShelf::new()),
        },
        tx,
    );
    (workflow, rx, compositor)
}

/// Receive notifications until `pred` matches; panics after five seconds.
pub async fn recv_until(
    rx: &mut mpsc::UnboundedReceiver<Notification>,
    pred: impl Fn(&Notification) -> bool,
) -> Notification {
    let deadline = Duration::from_secs(5);
    tokio::time::timeout(deadline, async {
        loop {
            match rx.recv().await {
                Some(n) if pred(&n) => return n,
                Some(_) => continue,
                None => panic!("notification channel closed"),
            }
        }
    })
    .await
    .expect("timed out waiting for notification")
}

/// True for the notifications that end an item.
pub fn is_terminal(n: &Notification) -> bool {
    matches!(
        n,
        Notification::ArtifactReady { .. } | Notification::Skipped { .. } | Notification::Failed { .. }
    )
}
