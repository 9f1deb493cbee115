//! Delivery-channel compatibility.
//!
//! Chat clients play a handful of formats inline; anything else is
//! re-encoded to mp3 before sending (see
//! [`Transformer::reencode_for_delivery`](crate::Transformer::reencode_for_delivery)).

use std::path::Path;

/// Extensions the delivery channel plays directly.
pub const DIRECTLY_PLAYABLE: &[&str] = &["mp3", "ogg", "m4a", "aac"];

/// Whether a file with this extension (or path) plays without re-encoding.
///
/// Accepts `"mp3"`, `".mp3"` or a full path; comparison ignores case.
pub fn is_directly_playable(ext_or_path: impl AsRef<Path>) -> bool {
    let raw = ext_or_path.as_ref();
    let ext = match raw.extension() {
        Some(ext) => ext.to_string_lossy(),
        None => raw.to_string_lossy(),
    };
    let ext = ext.trim_start_matches('.');
    DIRECTLY_PLAYABLE
        .iter()
        .any(|p| p.eq_ignore_ascii_case(ext))
}

/// File name used for the mp3 delivery copy: same stem, `.mp3` extension.
pub fn delivery_file_name(file_name: &str) -> String {
    Path::new(file_name)
        .with_extension("mp3")
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("{}.mp3", file_name))
}
