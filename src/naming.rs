//! Centralized filename rules for finished prints.
//!
//! Every artifact follows the same pattern:
//!
//! ```text
//! <prefix><W>x<H> <number> <Material>.jpg
//! ```
//!
//! - `<prefix>` is `_` for banner and `@` for matte canvas so those jobs sort
//!   apart in a directory listing; the other materials have none.
//! - `<W>x<H>` is the ordered size in centimetres, fractions kept (`30.5x40`).
//! - `<number>` is the order number as printed on the margin, including the
//!   urgency marker when present.
//!
//! When a name is taken, ` (2)`, ` (3)`, … is inserted before the extension:
//! - `30x40 501 Canvas.jpg` → `30x40 501 Canvas (2).jpg`

use crate::types::Material;

/// Extension of every finished print.
pub const ARTIFACT_EXTENSION: &str = "jpg";

/// Characters that cannot appear in a filename on at least one target platform.
const FORBIDDEN: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Replace path separators and other reserved characters with `_`.
///
/// Order numbers from the parser are always safe, but the external cropper
/// may hand back anything.
pub fn sanitize_component(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if FORBIDDEN.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Base filename for a print, before any collision suffix.
pub fn artifact_file_name(size_label: &str, number: &str, material: Material) -> String {
    let number = sanitize_component(number);
    let mut name = format!("{}{}", material.prefix(), size_label);
    if !number.is_empty() {
        name.push(' ');
        name.push_str(&number);
    }
    name.push(' ');
    name.push_str(material.name());
    name.push('.');
    name.push_str(ARTIFACT_EXTENSION);
    name
}

/// The `attempt`-th candidate name for `base`. Attempt 1 is `base` itself.
pub fn disambiguated_name(base: &str, attempt: u32) -> String {
    if attempt <= 1 {
        return base.to_string();
    }
    match base.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem} ({attempt}).{ext}"),
        None => format!("{base} ({attempt})"),
    }
}
