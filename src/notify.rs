//! Outbound notifications and artifact controls.
//!
//! The workflow reports progress as [`Notification`] values on an unbounded
//! channel; whichever transport is attached renders them. Finished files are
//! registered on the [`ArtifactShelf`] under a short opaque id so the
//! transport can offer open / open-folder / delete without exposing paths in
//! its controls.

use crate::types::SubmitterId;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, info};

/// Monotonic id of one submitted image within this process.
pub type ItemId = u64;

/// Length of the short artifact id handed to transports.
pub const SHORT_ID_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// Image accepted and waiting behind earlier items of the same submitter.
    Queued {
        submitter: SubmitterId,
        item: ItemId,
        position: usize,
    },
    /// No size found in the caption; waiting for a free-text reply.
    AwaitingText { submitter: SubmitterId, item: ItemId },
    /// Several sizes found; waiting for the submitter to pick one.
    AwaitingSize {
        submitter: SubmitterId,
        item: ItemId,
        candidates: Vec<String>,
    },
    /// Handed to the manual crop tool.
    AwaitingCropper { submitter: SubmitterId, item: ItemId },
    ArtifactReady {
        submitter: SubmitterId,
        item: ItemId,
        path: PathBuf,
        short_id: String,
        material_guessed: bool,
        missing_number: bool,
    },
    /// Closed in the crop tool; nothing was produced.
    Skipped {
        submitter: SubmitterId,
        item: ItemId,
        reason: String,
    },
    Failed {
        submitter: SubmitterId,
        item: ItemId,
        error: String,
        partial_path: Option<PathBuf>,
    },
}

impl Notification {
    pub fn submitter(&self) -> SubmitterId {
        match self {
            Notification::Queued { submitter, .. }
            | Notification::AwaitingText { submitter, .. }
            | Notification::AwaitingSize { submitter, .. }
            | Notification::AwaitingCropper { submitter, .. }
            | Notification::ArtifactReady { submitter, .. }
            | Notification::Skipped { submitter, .. }
            | Notification::Failed { submitter, .. } => *submitter,
        }
    }

    pub fn item(&self) -> ItemId {
        match self {
            Notification::Queued { item, .. }
            | Notification::AwaitingText { item, .. }
            | Notification::AwaitingSize { item, .. }
            | Notification::AwaitingCropper { item, .. }
            | Notification::ArtifactReady { item, .. }
            | Notification::Skipped { item, .. }
            | Notification::Failed { item, .. } => *item,
        }
    }
}

#[derive(Error, Debug)]
pub enum ControlError {
    #[error("Unknown artifact id '{0}'")]
    UnknownId(String),
    #[error("Artifact no longer on disk: {0}")]
    Missing(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// In-memory short id → path registry. Lost on restart.
#[derive(Default)]
pub struct ArtifactShelf {
    entries: Mutex<HashMap<String, PathBuf>>,
}

impl ArtifactShelf {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `path` and return its fresh short id.
    pub fn register(&self, path: &Path) -> String {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            let id: String = uuid::Uuid::new_v4()
                .simple()
                .to_string()
                .chars()
                .take(SHORT_ID_LEN)
                .collect();
            if !entries.contains_key(&id) {
                entries.insert(id.clone(), path.to_path_buf());
                return id;
            }
        }
    }

    pub fn path(&self, id: &str) -> Result<PathBuf, ControlError> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
            .ok_or_else(|| ControlError::UnknownId(id.to_string()))
    }

    fn existing(&self, id: &str) -> Result<PathBuf, ControlError> {
        let path = self.path(id)?;
        if !path.exists() {
            return Err(ControlError::Missing(path));
        }
        Ok(path)
    }

    /// Open the file in the system's default viewer.
    pub fn open(&self, id: &str) -> Result<PathBuf, ControlError> {
        let path = self.existing(id)?;
        launch(viewer_command(&path))?;
        Ok(path)
    }

    /// Show the file in the system file manager.
    pub fn open_folder(&self, id: &str) -> Result<PathBuf, ControlError> {
        let path = self.existing(id)?;
        launch(folder_command(&path))?;
        Ok(path)
    }

    /// Delete the file and forget its id.
    pub fn delete(&self, id: &str) -> Result<PathBuf, ControlError> {
        let path = self.existing(id)?;
        std::fs::remove_file(&path)?;
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id);
        info!(path = %path.display(), "deleted artifact");
        Ok(path)
    }
}

fn launch(mut command: Command) -> Result<(), ControlError> {
    debug!(?command, "launching");
    command.spawn()?;
    Ok(())
}

fn viewer_command(path: &Path) -> Command {
    let mut command = if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", ""]);
        c
    } else if cfg!(target_os = "macos") {
        Command::new("open")
    } else {
        Command::new("xdg-open")
    };
    command.arg(path);
    command
}

fn folder_command(path: &Path) -> Command {
    if cfg!(target_os = "windows") {
        let mut c = Command::new("explorer");
        c.arg(format!("/select,{}", path.display()));
        c
    } else if cfg!(target_os = "macos") {
        let mut c = Command::new("open");
        c.arg("-R").arg(path);
        c
    } else {
        let mut c = Command::new("xdg-open");
        c.arg(path.parent().unwrap_or(Path::new(".")));
        c
    }
}
