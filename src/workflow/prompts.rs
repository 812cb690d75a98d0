//! Pending interactive prompts.
//!
//! A prompt is a single-slot rendezvous: the worker opens it and suspends,
//! the transport fulfils it with the submitter's answer. There is at most one
//! prompt per (submitter, kind), and fulfilling removes it, so a second
//! answer to the same question goes nowhere.

use crate::types::SubmitterId;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    /// Waiting for a free-text description of the order.
    FreeText,
    /// Waiting for one of the listed sizes.
    SizeChoice,
}

/// Receiving half of an open prompt. Resolves to `None` if the prompt was
/// replaced before anyone answered.
pub struct PendingPrompt {
    rx: oneshot::Receiver<String>,
}

impl PendingPrompt {
    pub async fn answer(self) -> Option<String> {
        self.rx.await.ok()
    }
}

#[derive(Default)]
pub struct PromptBoard {
    slots: Mutex<HashMap<(SubmitterId, PromptKind), oneshot::Sender<String>>>,
}

impl PromptBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a prompt. Opening before announcing it means an answer can never
    /// arrive too early to be delivered.
    pub fn open(&self, submitter: SubmitterId, kind: PromptKind) -> PendingPrompt {
        let (tx, rx) = oneshot::channel();
        let previous = self
            .slots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert((submitter, kind), tx);
        if previous.is_some() {
            warn!(submitter, ?kind, "replaced an unanswered prompt");
        }
        debug!(submitter, ?kind, "prompt opened");
        PendingPrompt { rx }
    }

    /// Deliver `answer` to the open prompt, if any. Returns whether a prompt
    /// was waiting.
    pub fn fulfil(&self, submitter: SubmitterId, kind: PromptKind, answer: String) -> bool {
        let slot = self
            .slots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&(submitter, kind));
        match slot {
            Some(tx) => {
                debug!(submitter, ?kind, "prompt fulfilled");
                tx.send(answer).is_ok()
            }
            None => false,
        }
    }

    pub fn is_open(&self, submitter: SubmitterId, kind: PromptKind) -> bool {
        self.slots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(&(submitter, kind))
    }

    /// Whether `submitter` has any prompt waiting for an answer.
    pub fn is_waiting(&self, submitter: SubmitterId) -> bool {
        [PromptKind::FreeText, PromptKind::SizeChoice]
            .into_iter()
            .any(|kind| self.is_open(submitter, kind))
    }

    /// Close every prompt of `submitter` without an answer; waiters resolve
    /// to `None`. Returns how many were closed.
    pub fn abandon(&self, submitter: SubmitterId) -> usize {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let before = slots.len();
        slots.retain(|(owner, _), _| *owner != submitter);
        let closed = before - slots.len();
        if closed > 0 {
            debug!(submitter, closed, "prompts abandoned");
        }
        closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn answer_reaches_the_waiter() {
        let board = PromptBoard::new();
        let pending = board.open(1, PromptKind::FreeText);
        assert!(board.fulfil(1, PromptKind::FreeText, "30x40".into()));
        assert_eq!(pending.answer().await.as_deref(), Some("30x40"));
    }

    #[tokio::test]
    async fn fulfil_removes_the_slot() {
        let board = PromptBoard::new();
        let _pending = board.open(1, PromptKind::SizeChoice);
        assert!(board.is_open(1, PromptKind::SizeChoice));
        assert!(board.fulfil(1, PromptKind::SizeChoice, "30x40".into()));
        assert!(!board.is_open(1, PromptKind::SizeChoice));
        assert!(!board.fulfil(1, PromptKind::SizeChoice, "40x50".into()));
    }

    #[test]
    fn answers_without_prompt_are_dropped() {
        let board = PromptBoard::new();
        assert!(!board.fulfil(9, PromptKind::FreeText, "hello".into()));
    }

    #[tokio::test]
    async fn kinds_and_submitters_are_separate_slots() {
        let board = PromptBoard::new();
        let text = board.open(1, PromptKind::FreeText);
        let size = board.open(1, PromptKind::SizeChoice);
        let other = board.open(2, PromptKind::FreeText);
        assert!(board.fulfil(2, PromptKind::FreeText, "b".into()));
        assert!(board.fulfil(1, PromptKind::SizeChoice, "s".into()));
        assert!(board.fulfil(1, PromptKind::FreeText, "a".into()));
        assert_eq!(text.answer().await.as_deref(), Some("a"));
        assert_eq!(size.answer().await.as_deref(), Some("s"));
        assert_eq!(other.answer().await.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn replaced_prompt_resolves_to_none() {
        let board = PromptBoard::new();
        let first = board.open(1, PromptKind::FreeText);
        let _second = board.open(1, PromptKind::FreeText);
        assert_eq!(first.answer().await, None);
    }

    #[tokio::test]
    async fn abandon_closes_only_that_submitter() {
        let board = PromptBoard::new();
        let mine = board.open(1, PromptKind::SizeChoice);
        let theirs = board.open(2, PromptKind::FreeText);
        assert!(board.is_waiting(1));

        assert_eq!(board.abandon(1), 1);
        assert!(!board.is_waiting(1));
        assert!(board.is_waiting(2));
        assert_eq!(mine.answer().await, None);

        assert!(board.fulfil(2, PromptKind::FreeText, "still here".into()));
        assert_eq!(theirs.answer().await.as_deref(), Some("still here"));
        assert_eq!(board.abandon(9), 0);
    }

    #[tokio::test]
    async fn dropped_waiter_makes_fulfil_report_false() {
        let board = PromptBoard::new();
        drop(board.open(1, PromptKind::FreeText));
        assert!(!board.fulfil(1, PromptKind::FreeText, "late".into()));
    }
}
