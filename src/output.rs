//! CLI output formatting.
//!
//! Each display has a `format_*` function returning lines, so tests can check
//! the exact text, and a `print_*` wrapper that writes them to stdout. Format
//! functions are pure: no I/O, no side effects.
//!
//! # Output Format
//!
//! ## Parse
//!
//! ```text
//! Sizes:    30x40, 50x70
//! Number:   501
//! Material: Matte canvas
//! Cropper:  no
//! Urgent:   yes
//! ```
//!
//! ## Session notifications
//!
//! ```text
//! [7] #3 queued, 1 ahead
//! [7] #3 choose a size: 30x40 | 50x70
//! [7] #3 ready [a1b2c3d4] finished/Canvas/30x40 501 Canvas.jpg
//!     material not stated, printed on the default
//! ```
//!
//! ## Render
//!
//! ```text
//! 501 30x40.jpg → finished/Canvas/30x40 501 Canvas.jpg
//! 502 banner.jpg: skipped (no size found)
//!
//! Rendered 1, skipped 1, failed 0
//! ```

use crate::batch::{RenderOutcome, RenderReport};
use crate::caption::OrderIntent;
use crate::notify::Notification;
use std::path::Path;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ============================================================================
// Parse
// ============================================================================

pub fn format_intent(intent: &OrderIntent) -> Vec<String> {
    let sizes = if intent.sizes.is_empty() {
        "(none)".to_string()
    } else {
        intent.size_labels().join(", ")
    };
    let material = if intent.material_guessed {
        format!("{} (default)", intent.material)
    } else {
        intent.material.to_string()
    };
    vec![
        format!("Sizes:    {sizes}"),
        format!("Number:   {}", intent.number.as_deref().unwrap_or("(none)")),
        format!("Material: {material}"),
        format!("Cropper:  {}", yes_no(intent.cropper_requested)),
        format!("Urgent:   {}", yes_no(intent.urgent)),
    ]
}

pub fn print_intent(intent: &OrderIntent) {
    for line in format_intent(intent) {
        println!("{}", line);
    }
}

// ============================================================================
// Session notifications
// ============================================================================

/// Format one workflow notification. The first line always starts with
/// `[submitter] #item`; warnings follow as indented lines.
pub fn format_notification(notification: &Notification) -> Vec<String> {
    let head = format!("[{}] #{}", notification.submitter(), notification.item());
    match notification {
        Notification::Queued { position, .. } => {
            vec![format!("{head} queued, {position} ahead")]
        }
        Notification::AwaitingText { submitter, .. } => vec![format!(
            "{head} no size found, describe the order: text {submitter} <reply>"
        )],
        Notification::AwaitingSize {
            submitter,
            candidates,
            ..
        } => vec![
            format!("{head} choose a size: {}", candidates.join(" | ")),
            format!("{}choose {submitter} <WxH>", indent(1)),
        ],
        Notification::AwaitingCropper { .. } => {
            vec![format!("{head} opened in the crop tool")]
        }
        Notification::ArtifactReady {
            path,
            short_id,
            material_guessed,
            missing_number,
            ..
        } => {
            let mut lines = vec![format!("{head} ready [{short_id}] {}", path.display())];
            if *material_guessed {
                lines.push(format!(
                    "{}material not stated, printed on the default",
                    indent(1)
                ));
            }
            if *missing_number {
                lines.push(format!("{}no order number on the print", indent(1)));
            }
            lines
        }
        Notification::Skipped { reason, .. } => vec![format!("{head} skipped: {reason}")],
        Notification::Failed {
            error,
            partial_path,
            ..
        } => {
            let mut lines = vec![format!("{head} failed: {error}")];
            if let Some(path) = partial_path {
                lines.push(format!("{}incomplete file: {}", indent(1), path.display()));
            }
            lines
        }
    }
}

pub fn print_notification(notification: &Notification) {
    for line in format_notification(notification) {
        println!("{}", line);
    }
}

// ============================================================================
// Render
// ============================================================================

pub fn format_render_report(report: &RenderReport) -> Vec<String> {
    let mut lines: Vec<String> = report
        .entries
        .iter()
        .map(|entry| {
            let source = file_label(&entry.source);
            match &entry.outcome {
                RenderOutcome::Rendered(artifact) => {
                    format!("{source} \u{2192} {}", artifact.path.display())
                }
                RenderOutcome::Skipped(reason) => format!("{source}: skipped ({reason})"),
                RenderOutcome::Failed(error) => format!("{source}: failed ({error})"),
            }
        })
        .collect();
    lines.push(String::new());
    lines.push(format!(
        "Rendered {}, skipped {}, failed {}",
        report.rendered(),
        report.skipped(),
        report.failed()
    ));
    lines
}

pub fn print_render_report(report: &RenderReport) {
    for line in format_render_report(report) {
        println!("{}", line);
    }
}
