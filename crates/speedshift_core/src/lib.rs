//! speedshift core - pitch/speed transform and tag rewriting.
//!
//! This crate contains all processing logic with zero bot or UI dependencies.
//! It can be driven by a chat bot, the bundled CLI, or any other front end.
//!
//! The pipeline for one request:
//!
//! ```text
//! probe (sample rate, tags) -> derive title -> build tag set + filter
//!   -> ffmpeg (timeout) -> validate output -> [delivery re-encode]
//! ```

pub mod codec;
pub mod config;
pub mod delivery;
pub mod errors;
pub mod logging;
pub mod models;
pub mod naming;
pub mod probe;
pub mod runner;
pub mod title;
pub mod transform;
pub mod workspace;

pub use codec::{AudioFormat, CodecParams};
pub use delivery::{delivery_file_name, is_directly_playable};
pub use errors::{ErrorKind, TransformError, TransformResult};
pub use models::{MediaFile, MediaKind, SpeedFactor, TagSet, TransformOutput, TransformRequest};
pub use naming::derive_output_name;
pub use title::{derive_output_title, derive_song_title};
pub use transform::{Timeouts, ToolPaths, ToolStatus, Transformer};
pub use workspace::{reap_stale_files, ReapReport};

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_returns_value() {
        assert!(!version().is_empty());
    }
}
