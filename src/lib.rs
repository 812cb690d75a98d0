//! # Print Finish
//!
//! Turns captioned customer photos into print-ready gallery-wrap files.
//! A customer sends an image with a free-text caption ("#501 30x40 matte");
//! the caption is parsed into an order, missing details are asked for, and
//! the image is composited into a JPEG with a mirrored wrap border, a white
//! margin carrying the order number, and a thin black cut outline.
//!
//! # Architecture
//!
//! ```text
//! caption ─► caption::parse ─► OrderIntent
//!                                 │
//!   submit ─► workflow (one worker per submitter, strict FIFO)
//!                                 │ prompt / size choice / crop tool
//!                                 ▼
//!                     imaging::Compositor ─► <root>/<material>/<name>.jpg
//!                                 │
//!                           notify::Notification ─► transport
//! ```
//!
//! Different submitters are processed fully concurrently; one submitter
//! waiting on a reply never holds up anyone else.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`caption`] | Free-text caption → sizes, order number, material, flags |
//! | [`workflow`] | Per-submitter queues, workers, prompts |
//! | [`cropper`] | Bridge to the blocking manual crop tool |
//! | [`imaging`] | Print geometry and the pure-Rust compositing backend |
//! | [`notify`] | Outbound notifications and open / folder / delete controls |
//! | [`batch`] | Non-interactive rendering of files and directories |
//! | [`session`] | Line-based command transport used by the `session` command |
//! | [`config`] | `print-finish.toml` loading, merging and validation |
//! | [`naming`] | Output file naming and collision suffixes |
//! | [`types`] | Shared types: materials, sizes, crop rectangles |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## One Rounding Rule
//!
//! Every centimetre value becomes pixels through [`imaging::cm_to_px`], and
//! the white margins are derived from the rounded outer target size, so the
//! finished file is always exactly the requested size at the configured dpi.
//!
//! ## Files Are Never Overwritten
//!
//! Output files are created with `create_new`; a name that already exists
//! gets a ` (2)`, ` (3)`, … suffix. Two workers finishing the same order at
//! the same moment cannot clobber each other.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, resampling, drawing and JPEG encoding are all done by the
//! `image`/`imageproc` stack with `ab_glyph` for text, so the binary has no
//! system dependencies. A missing font falls back to a built-in bitmap face
//! rather than failing the print.

pub mod batch;
pub mod caption;
pub mod config;
pub mod cropper;
pub mod imaging;
pub mod naming;
pub mod notify;
pub mod output;
pub mod session;
pub mod types;
pub mod workflow;

#[cfg(test)]
pub(crate) mod test_helpers;
