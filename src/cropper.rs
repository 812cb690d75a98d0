//! Bridge to the interactive manual crop tool.
//!
//! The tool is a blocking, opaque black box: it either returns a confirmed
//! crop (possibly with a corrected number, size and material) or nothing
//! when the operator closes it. [`CropperBridge`] runs it on its own OS
//! thread and lets the async workflow poll a single-slot channel, so one
//! submitter waiting on the tool never holds up anyone else.
//!
//! ## Adapters
//!
//! | Adapter | Behaviour |
//! |---|---|
//! | [`CommandCropper`] | Runs a configured program with the image as a temporary PNG |
//! | [`DisabledCropper`] | No tool configured: every request yields nothing |

use crate::imaging::{CompositeError, SourceImage};
use crate::types::{CropRect, Material};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::sync::mpsc::{TryRecvError, sync_channel};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum CropperError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cropper exited with {0}")]
    Exit(String),
    #[error("Cropper reply is not valid JSON: {0}")]
    Reply(#[from] serde_json::Error),
    #[error("Cropper image unusable: {0}")]
    Image(#[from] CompositeError),
    #[error("No cropper command configured")]
    Disabled,
}

/// What the workflow knows when it hands an image to the tool. The tool
/// pre-fills its form with these and lets the operator correct them.
#[derive(Debug, Clone)]
pub struct CropRequest {
    pub image: Arc<SourceImage>,
    pub number: String,
    pub width_cm: Option<f64>,
    pub height_cm: Option<f64>,
    pub material: Material,
}

/// The operator's confirmed answer.
#[derive(Debug, Clone)]
pub struct CropResult {
    /// Image to print from; may differ from the request when the operator
    /// rotated it.
    pub image: Arc<SourceImage>,
    pub number: String,
    pub width_cm: f64,
    pub height_cm: f64,
    pub material: Material,
    pub crop: CropRect,
}

/// A blocking crop tool. `Ok(None)` means the operator closed it without
/// confirming.
pub trait Cropper: Send + Sync + 'static {
    fn crop(&self, request: CropRequest) -> Result<Option<CropResult>, CropperError>;
}

/// Runs a [`Cropper`] off the async runtime and polls for its answer.
#[derive(Clone)]
pub struct CropperBridge {
    cropper: Arc<dyn Cropper>,
    poll_interval: Duration,
}

impl CropperBridge {
    pub fn new(cropper: Arc<dyn Cropper>, poll_interval: Duration) -> Self {
        Self {
            cropper,
            poll_interval,
        }
    }

    /// Hand `request` to the tool and wait for it cooperatively.
    ///
    /// Tool errors, a panicking tool thread and a closed tool all come back
    /// as `None`; the caller only needs to know there is no crop.
    pub async fn run(&self, request: CropRequest) -> Option<CropResult> {
        let (tx, rx) = sync_channel(1);
        let cropper = self.cropper.clone();
        let spawned = std::thread::Builder::new()
            .name("cropper".into())
            .spawn(move || {
                let outcome = match cropper.crop(request) {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        warn!("cropper failed: {e}");
                        None
                    }
                };
                // Receiver only disappears if the workflow task was dropped
                let _ = tx.send(outcome);
            });
        if let Err(e) = spawned {
            warn!("cannot start cropper thread: {e}");
            return None;
        }

        loop {
            match rx.try_recv() {
                Ok(outcome) => {
                    debug!(confirmed = outcome.is_some(), "cropper finished");
                    return outcome;
                }
                Err(TryRecvError::Empty) => tokio::time::sleep(self.poll_interval).await,
                Err(TryRecvError::Disconnected) => {
                    warn!("cropper thread ended without an answer");
                    return None;
                }
            }
        }
    }
}

/// Used when no crop tool is configured.
pub struct DisabledCropper;

impl Cropper for DisabledCropper {
    fn crop(&self, _request: CropRequest) -> Result<Option<CropResult>, CropperError> {
        Err(CropperError::Disabled)
    }
}

/// JSON the external tool prints on stdout when the operator confirms.
///
/// ```json
/// {"image": "/tmp/rotated.png", "number": "501", "width_cm": 30, "height_cm": 40,
///  "material": "banner", "crop": {"left": 0, "top": 0, "right": 800, "bottom": 600}}
/// ```
///
/// `image` is only needed when the tool produced a new file (e.g. rotated);
/// `crop` defaults to the whole image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CropReply {
    #[serde(default)]
    pub image: Option<PathBuf>,
    pub number: String,
    pub width_cm: f64,
    pub height_cm: f64,
    pub material: Material,
    #[serde(default)]
    pub crop: Option<CropRect>,
}

/// Runs an external program as the crop tool.
///
/// Invocation:
///
/// ```text
/// <program> <image.png> --number <n> --material <snake_case> [--width <cm>] [--height <cm>]
/// ```
///
/// Empty stdout means the operator closed the tool; a non-zero exit is an
/// error. Either way the workflow skips the item.
pub struct CommandCropper {
    program: PathBuf,
}

impl CommandCropper {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn arguments(request: &CropRequest, image: &Path) -> Vec<String> {
        let material = serde_json::to_value(request.material)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        let mut args = vec![
            image.display().to_string(),
            "--number".into(),
            request.number.clone(),
            "--material".into(),
            material,
        ];
        if let Some(w) = request.width_cm {
            args.extend(["--width".into(), w.to_string()]);
        }
        if let Some(h) = request.height_cm {
            args.extend(["--height".into(), h.to_string()]);
        }
        args
    }
}

/// Turn the tool's stdout into a result. Blank output means no crop.
pub fn parse_reply(stdout: &str, request: &CropRequest) -> Result<Option<CropResult>, CropperError> {
    if stdout.trim().is_empty() {
        return Ok(None);
    }
    let reply: CropReply = serde_json::from_str(stdout.trim())?;
    let image = match &reply.image {
        Some(path) => {
            let mut loaded = SourceImage::open(path)?;
            if loaded.icc_profile.is_none() {
                loaded.icc_profile = request.image.icc_profile.clone();
            }
            Arc::new(loaded)
        }
        None => request.image.clone(),
    };
    let (w, h) = image.dimensions();
    Ok(Some(CropResult {
        crop: reply.crop.unwrap_or(CropRect {
            left: 0,
            top: 0,
            right: w,
            bottom: h,
        }),
        image,
        number: reply.number,
        width_cm: reply.width_cm,
        height_cm: reply.height_cm,
        material: reply.material,
    }))
}

impl Cropper for CommandCropper {
    fn crop(&self, request: CropRequest) -> Result<Option<CropResult>, CropperError> {
        let file = tempfile::Builder::new()
            .prefix("print-finish-")
            .suffix(".png")
            .tempfile()?;
        request.image.write_png(file.path())?;

        debug!(program = %self.program.display(), "launching cropper");
        let output = Command::new(&self.program)
            .args(Self::arguments(&request, file.path()))
            .output()?;
        if !output.status.success() {
            return Err(CropperError::Exit(output.status.to_string()));
        }
        parse_reply(&String::from_utf8_lossy(&output.stdout), &request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{ScriptedCropper, gradient_source};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn request() -> CropRequest {
        CropRequest {
            image: gradient_source(40, 30),
            number: "501".into(),
            width_cm: Some(30.0),
            height_cm: None,
            material: Material::MatteCanvas,
        }
    }

    fn bridge(cropper: impl Cropper) -> CropperBridge {
        CropperBridge::new(Arc::new(cropper), Duration::from_millis(5))
    }

    struct PanickingCropper;

    impl Cropper for PanickingCropper {
        fn crop(&self, _request: CropRequest) -> Result<Option<CropResult>, CropperError> {
            panic!("tool crashed");
        }
    }

    /// Blocks until released, to prove the runtime keeps running meanwhile.
    struct GatedCropper(Arc<AtomicBool>);

    impl Cropper for GatedCropper {
        fn crop(&self, _request: CropRequest) -> Result<Option<CropResult>, CropperError> {
            while !self.0.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(2));
            }
            Ok(None)
        }
    }

    #[tokio::test]
    async fn confirmed_crop_comes_back() {
        let cropper = ScriptedCropper::answering("77", 40.0, 30.0, Material::Banner);
        let result = bridge(cropper).run(request()).await.unwrap();
        assert_eq!(result.number, "77");
        assert_eq!(result.material, Material::Banner);
        assert_eq!((result.width_cm, result.height_cm), (40.0, 30.0));
    }

    #[tokio::test]
    async fn closed_tool_is_none() {
        assert!(bridge(ScriptedCropper::skipping()).run(request()).await.is_none());
    }

    #[tokio::test]
    async fn disabled_tool_is_none() {
        assert!(bridge(DisabledCropper).run(request()).await.is_none());
    }

    #[tokio::test]
    async fn panicking_tool_is_none() {
        assert!(bridge(PanickingCropper).run(request()).await.is_none());
    }

    #[tokio::test]
    async fn waiting_does_not_block_the_runtime() {
        let gate = Arc::new(AtomicBool::new(false));
        let pending = tokio::spawn({
            let bridge = bridge(GatedCropper(gate.clone()));
            async move { bridge.run(request()).await }
        });
        // Other work on the runtime proceeds while the tool is open
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!pending.is_finished());
        gate.store(true, Ordering::SeqCst);
        assert!(pending.await.unwrap().is_none());
    }

    #[test]
    fn arguments_prefill_known_values() {
        let args = CommandCropper::arguments(&request(), Path::new("/tmp/in.png"));
        assert_eq!(
            args,
            vec!["/tmp/in.png", "--number", "501", "--material", "matte_canvas", "--width", "30"]
        );
    }

    #[test]
    fn blank_reply_is_none() {
        assert!(parse_reply("  \n", &request()).unwrap().is_none());
    }

    #[test]
    fn reply_without_image_reuses_source_and_full_crop() {
        let json = r#"{"number": "12", "width_cm": 30, "height_cm": 40, "material": "cotton"}"#;
        let result = parse_reply(json, &request()).unwrap().unwrap();
        assert_eq!(result.number, "12");
        assert_eq!(result.material, Material::Cotton);
        assert_eq!(result.crop, CropRect { left: 0, top: 0, right: 40, bottom: 30 });
        assert_eq!(result.image.dimensions(), (40, 30));
    }

    #[test]
    fn reply_with_rotated_image_loads_it() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("rotated.png");
        SourceImage::from_pixels(crate::test_helpers::gradient_pixels(30, 40))
            .write_png(&path)
            .unwrap();
        let json = serde_json::json!({
            "image": path,
            "number": "5",
            "width_cm": 30.0,
            "height_cm": 40.0,
            "material": "canvas",
            "crop": {"left": 1, "top": 2, "right": 29, "bottom": 39}
        })
        .to_string();
        let result = parse_reply(&json, &request()).unwrap().unwrap();
        assert_eq!(result.image.dimensions(), (30, 40));
        assert_eq!(result.crop, CropRect { left: 1, top: 2, right: 29, bottom: 39 });
    }

    #[test]
    fn malformed_reply_is_an_error() {
        assert!(matches!(
            parse_reply("{not json", &request()),
            Err(CropperError::Reply(_))
        ));
        assert!(parse_reply(r#"{"number": "1"}"#, &request()).is_err());
    }

    #[test]
    fn missing_program_is_an_io_error() {
        let cropper = CommandCropper::new("/nonexistent/crop-tool");
        assert!(matches!(cropper.crop(request()), Err(CropperError::Io(_))));
    }
}
