//! Per-submitter processing workflow.
//!
//! Every submitter gets one worker task that processes their images strictly
//! in arrival order; different submitters run fully concurrently. A worker
//! may suspend on a free-text reply, a size choice or the crop tool without
//! holding up anyone else.
//!
//! ```text
//! submit ──► registry queue ──► worker ──► item task
//!                                            │ parse caption
//!                                            │ (prompt | size choice | cropper)
//!                                            │ compositor on the blocking pool
//!                                            ▼
//!                                       notification
//! ```
//!
//! Each item runs in its own spawned task that the worker awaits, so an error
//! or a panic ends that item with a [`Notification::Failed`] and the worker
//! moves on. Workers end only by draining their queue.

mod item;
pub mod prompts;
pub mod registry;

use crate::config::CompositingSettings;
use crate::cropper::CropperBridge;
use crate::imaging::{CompositeError, Compositor, SourceImage};
use crate::notify::{ArtifactShelf, ItemId, Notification};
use crate::types::SubmitterId;
use prompts::{PromptBoard, PromptKind};
use registry::SubmitterRegistry;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error(transparent)]
    Composite(#[from] CompositeError),
    #[error("Compositing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("Prompt for submitter {0} was abandoned")]
    PromptAbandoned(SubmitterId),
}

impl WorkflowError {
    pub fn partial_path(&self) -> Option<&Path> {
        match self {
            WorkflowError::Composite(e) => e.partial_path(),
            _ => None,
        }
    }
}

/// One submitted image waiting for its worker.
#[derive(Debug, Clone)]
pub struct QueueItem {
    pub id: ItemId,
    pub submitter: SubmitterId,
    pub image: Arc<SourceImage>,
    pub caption: Option<String>,
}

/// Collaborators the workflow drives.
#[derive(Clone)]
pub struct WorkflowDeps {
    pub compositor: Arc<dyn Compositor>,
    pub cropper: CropperBridge,
    pub settings: CompositingSettings,
    pub output_root: PathBuf,
    pub shelf: Arc<ArtifactShelf>,
}

struct Shared {
    deps: WorkflowDeps,
    registry: SubmitterRegistry,
    prompts: PromptBoard,
    notifier: UnboundedSender<Notification>,
    next_item: AtomicU64,
}

impl Shared {
    fn notify(&self, notification: Notification) {
        if self.notifier.send(notification).is_err() {
            debug!("no one is listening for notifications");
        }
    }
}

/// Handle to the workflow. Cheap to clone; all clones share state.
///
/// [`submit`](Self::submit) spawns tasks and must be called from within a
/// tokio runtime.
#[derive(Clone)]
pub struct Workflow {
    shared: Arc<Shared>,
}

impl Workflow {
    pub fn new(deps: WorkflowDeps, notifier: UnboundedSender<Notification>) -> Self {
        Self {
            shared: Arc::new(Shared {
                deps,
                registry: SubmitterRegistry::new(),
                prompts: PromptBoard::new(),
                notifier,
                next_item: AtomicU64::new(1),
            }),
        }
    }

    /// Queue an image for `submitter`, starting their worker if needed.
    pub fn submit(
        &self,
        submitter: SubmitterId,
        image: Arc<SourceImage>,
        caption: Option<String>,
    ) -> ItemId {
        let id = self.shared.next_item.fetch_add(1, Ordering::Relaxed);
        let item = QueueItem {
            id,
            submitter,
            image,
            caption,
        };
        let shared = self.shared.clone();
        let outcome = self
            .shared
            .registry
            .enqueue(item, move || tokio::spawn(run_worker(shared, submitter)));
        info!(submitter, item = id, ahead = outcome.ahead, "image queued");
        if outcome.ahead > 0 {
            self.shared.notify(Notification::Queued {
                submitter,
                item: id,
                position: outcome.ahead,
            });
        }
        id
    }

    /// Answer `submitter`'s open free-text prompt. Returns `false` when no
    /// prompt was waiting.
    pub fn reply_text(&self, submitter: SubmitterId, text: &str) -> bool {
        self.shared
            .prompts
            .fulfil(submitter, PromptKind::FreeText, text.to_string())
    }

    /// Answer `submitter`'s open size choice with a `WxH` label.
    pub fn choose_size(&self, submitter: SubmitterId, size: &str) -> bool {
        self.shared
            .prompts
            .fulfil(submitter, PromptKind::SizeChoice, size.to_string())
    }

    /// Whether `submitter` has a worker or queued items.
    pub fn is_busy(&self, submitter: SubmitterId) -> bool {
        self.shared.registry.is_active(submitter)
    }

    pub fn shelf(&self) -> &Arc<ArtifactShelf> {
        &self.shared.deps.shelf
    }

    /// Wait until every queued item has finished, checking every `poll`.
    ///
    /// For use once no more input can arrive: a worker blocked on a prompt
    /// could never be answered, so its prompts are abandoned and the item
    /// ends as [`Notification::Failed`]. Crop tool sessions are waited for.
    pub async fn drain(&self, poll: Duration) {
        loop {
            let active = self.shared.registry.active_submitters();
            if active.is_empty() {
                break;
            }
            for submitter in active {
                if self.shared.prompts.is_waiting(submitter) {
                    warn!(
                        submitter,
                        queued = self.shared.registry.pending(submitter),
                        "input closed while waiting for an answer"
                    );
                    self.shared.prompts.abandon(submitter);
                }
            }
            tokio::time::sleep(poll).await;
        }
        debug!("all workers retired");
    }
}

async fn run_worker(shared: Arc<Shared>, submitter: SubmitterId) {
    debug!(submitter, "worker started");
    while let Some(queued) = shared.registry.next(submitter) {
        let item_id = queued.id;
        let task = tokio::spawn(item::process(shared.clone(), queued));
        let failure = match task.await {
            Ok(Ok(())) => None,
            Ok(Err(e)) => {
                warn!(submitter, item = item_id, "item failed: {e}");
                Some((e.to_string(), e.partial_path().map(Path::to_path_buf)))
            }
            Err(e) => {
                error!(submitter, item = item_id, "item task panicked: {e}");
                Some((format!("internal error: {e}"), None))
            }
        };
        if let Some((error, partial_path)) = failure {
            shared.notify(Notification::Failed {
                submitter,
                item: item_id,
                error,
                partial_path,
            });
        }
    }
    debug!(submitter, "worker retired");
}
