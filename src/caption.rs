//! Caption parsing: free text → [`OrderIntent`].
//!
//! Customers describe an order in whatever way they like:
//!
//! ```text
//! #4148 matte 40:60 2.30/40
//! 109 30х40 баннер
//! №45аапр глянец 1.50:70 2.40/60 3. 45/35
//! ```
//!
//! The parser pulls out every size candidate, the order number, the material
//! and two flags (manual crop requested, urgent). It never fails: anything it
//! cannot recognise is simply absent from the result, and the workflow decides
//! whether to ask the submitter.
//!
//! ## Rules
//!
//! - **Sizes** are `<digits><sep><digits>` with at least two digits on each
//!   side, so list markers like `2.` in `2.30/40` are skipped. The separator
//!   set covers the glyphs people actually type for "by": Latin `x`, Cyrillic
//!   `х` and `ч`, `×`, `*`, and punctuation `/ \ ; : . , -`. Order and
//!   duplicates are preserved.
//! - **Number** is the first run of digits (optionally followed by letters)
//!   that starts the text or follows `#`, `№`, `N`, `n` or a space. `x` and
//!   `х` are never part of a number so `30х40` stays a size.
//! - **Material** comes from [`MATERIAL_KEYWORDS`], checked in table order.
//!   No keyword means canvas, with `material_guessed` raised.
//! - **Cropper** is requested by `%`, `✂` or the word `cropper`.
//! - **Urgent** is flagged by `!`, `‼` or `🚨`.

use crate::types::{Material, SizeCandidate};
use regex::Regex;
use std::sync::LazyLock;

/// Marker appended to the order number of urgent orders.
pub const URGENT_MARKER: &str = " ‼";

static SIZE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{2,})[xх×*ч/\\;:.,\-](\d{2,})").expect("size pattern is valid")
});

static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:[#№Nn ]|^)(\d+[a-wyzA-WYZа-фц-яА-ФЦ-ЯёЁ]*)-?\b")
        .expect("number pattern is valid")
});

/// Keyword table for material classification, highest priority first.
///
/// Matching is substring-based on the lowercased caption, so stems like
/// `глян` cover `глянец` and `глянцевый`.
pub const MATERIAL_KEYWORDS: &[(Material, &[&str])] = &[
    (Material::MatteCanvas, &["мат", "matt"]),
    (Material::Canvas, &["холст", "глян", "хол", "canvas", "gloss"]),
    (Material::Cotton, &["хлоп", "cotton"]),
    (Material::Banner, &["баннер", "банер", "бан", "banner"]),
];

const CROPPER_MARKERS: &[&str] = &["%", "✂", "cropper"];
const URGENT_MARKERS: &[char] = &['!', '‼', '🚨'];

/// Everything a caption says about an order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrderIntent {
    /// Size candidates in caption order, duplicates kept.
    pub sizes: Vec<SizeCandidate>,
    /// Order number exactly as written (case preserved).
    pub number: Option<String>,
    pub material: Material,
    /// No material keyword was found; `material` is the canvas default.
    pub material_guessed: bool,
    /// The submitter asked for a manual crop.
    pub cropper_requested: bool,
    pub urgent: bool,
}

impl OrderIntent {
    /// Canonical `WxH` labels of all candidates.
    pub fn size_labels(&self) -> Vec<String> {
        self.sizes.iter().map(ToString::to_string).collect()
    }

    /// Number text as it should appear on the print: urgent orders get
    /// [`URGENT_MARKER`] appended, even when no number was given.
    pub fn display_number(&self) -> String {
        let mut number = self.number.clone().unwrap_or_default();
        if self.urgent {
            number.push_str(URGENT_MARKER);
        }
        number
    }

    /// Combine a follow-up reply with the original caption.
    ///
    /// Sizes always come from the reply. Number and material come from the
    /// reply when it states them, otherwise from the caption. Flags are
    /// OR-ed.
    pub fn with_reply(self, reply: OrderIntent) -> OrderIntent {
        let (material, material_guessed) = if reply.material_guessed {
            (self.material, self.material_guessed)
        } else {
            (reply.material, false)
        };
        OrderIntent {
            sizes: reply.sizes,
            number: reply.number.or(self.number),
            material,
            material_guessed,
            cropper_requested: self.cropper_requested || reply.cropper_requested,
            urgent: self.urgent || reply.urgent,
        }
    }
}

/// Parse a caption. Deterministic, no I/O.
pub fn parse(text: &str) -> OrderIntent {
    let lowered = text.to_lowercase();
    let (material, material_guessed) = match classify_material(&lowered) {
        Some(material) => (material, false),
        None => (Material::Canvas, true),
    };

    OrderIntent {
        sizes: parse_sizes(&lowered),
        number: parse_number(text),
        material,
        material_guessed,
        cropper_requested: CROPPER_MARKERS.iter().any(|m| lowered.contains(m)),
        urgent: text.contains(URGENT_MARKERS),
    }
}

fn parse_sizes(lowered: &str) -> Vec<SizeCandidate> {
    SIZE_RE
        .captures_iter(lowered)
        .filter_map(|caps| {
            let width = caps[1].parse::<u32>().ok()?;
            let height = caps[2].parse::<u32>().ok()?;
            (width > 0 && height > 0).then(|| SizeCandidate::new(width, height))
        })
        .collect()
}

fn parse_number(text: &str) -> Option<String> {
    NUMBER_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn classify_material(lowered: &str) -> Option<Material> {
    MATERIAL_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(material, _)| *material)
}
