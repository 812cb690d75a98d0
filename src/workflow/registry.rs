//! Per-submitter queues and worker handles.
//!
//! All state lives behind one lock so the two racy decisions are atomic:
//! enqueue-and-maybe-spawn on ingress, and pop-or-retire in the worker. A
//! worker that finds its queue empty removes the whole submitter entry in the
//! same critical section, so an item arriving a moment later always sees
//! either a live worker that will still pop it, or no entry and spawns a
//! fresh one.

use super::QueueItem;
use crate::types::SubmitterId;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tokio::task::JoinHandle;

#[derive(Default)]
struct SubmitterState {
    queue: VecDeque<QueueItem>,
    worker: Option<JoinHandle<()>>,
}

impl SubmitterState {
    fn has_live_worker(&self) -> bool {
        self.worker.as_ref().is_some_and(|h| !h.is_finished())
    }
}

#[derive(Default)]
pub struct SubmitterRegistry {
    states: Mutex<HashMap<SubmitterId, SubmitterState>>,
}

/// What happened to an enqueued item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Enqueued {
    /// Items ahead of this one, including the one being worked on.
    pub ahead: usize,
    pub spawned_worker: bool,
}

impl SubmitterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `item` to its submitter's queue and call `spawn` if that
    /// submitter has no live worker. `spawn` runs under the registry lock and
    /// must not touch the registry itself synchronously.
    pub fn enqueue(&self, item: QueueItem, spawn: impl FnOnce() -> JoinHandle<()>) -> Enqueued {
        let mut states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        let state = states.entry(item.submitter).or_default();
        let live = state.has_live_worker();
        // The item under work has already been popped
        let ahead = state.queue.len() + usize::from(live);
        state.queue.push_back(item);
        if !live {
            state.worker = Some(spawn());
        }
        Enqueued {
            ahead,
            spawned_worker: !live,
        }
    }

    /// Next item for `submitter`'s worker. `None` retires the worker: the
    /// submitter's entry is gone when this returns.
    pub fn next(&self, submitter: SubmitterId) -> Option<QueueItem> {
        let mut states = self.states.lock().unwrap_or_else(|e| e.into_inner());
        let state = states.get_mut(&submitter)?;
        match state.queue.pop_front() {
            Some(item) => Some(item),
            None => {
                states.remove(&submitter);
                None
            }
        }
    }

    /// Whether `submitter` currently has state (queued items or a worker).
    pub fn is_active(&self, submitter: SubmitterId) -> bool {
        self.states
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(&submitter)
    }

    /// Items waiting behind the one in progress.
    pub fn pending(&self, submitter: SubmitterId) -> usize {
        self.states
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&submitter)
            .map_or(0, |s| s.queue.len())
    }

    /// Submitters that currently have a worker or queued items.
    pub fn active_submitters(&self) -> Vec<SubmitterId> {
        self.states
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .copied()
            .collect()
    }
}
