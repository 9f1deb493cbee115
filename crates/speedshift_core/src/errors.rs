//! Error types for the transform pipeline.
//!
//! Only failures that abort a request live in [`TransformError`]. Probe
//! failures and unknown output extensions degrade to defaults and are
//! reported through logging; [`ErrorKind`] still names them so callers can
//! classify every condition the pipeline knows about.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Flat classification of pipeline conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Input file does not exist.
    InputNotFound,
    /// Metadata probe failed (non-fatal, defaults are used).
    ProbeFailed,
    /// External tool exceeded its time limit.
    TranscodeTimeout,
    /// External tool could not be run or exited non-zero.
    TranscodeFailed,
    /// Output missing or zero bytes after a successful exit.
    EmptyOutput,
    /// Unknown output extension, mp3 parameters used (non-fatal).
    UnsupportedExtensionFallback,
}

/// A failure that aborts a transform, extraction or re-encode.
#[derive(Error, Debug)]
pub enum TransformError {
    /// A required input file was not found.
    #[error("Input file not found: {}", path.display())]
    InputNotFound { path: PathBuf },

    /// The external tool did not finish in time and was killed.
    #[error("{tool} timed out after {}s", timeout.as_secs())]
    TranscodeTimeout { tool: String, timeout: Duration },

    /// The external tool exited with a non-zero status.
    #[error("{tool} failed with exit code {exit_code}: {stderr}")]
    TranscodeFailed {
        tool: String,
        exit_code: i32,
        stderr: String,
    },

    /// The external tool could not be started.
    #[error("Failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: io::Error,
    },

    /// The tool reported success but the output is missing or empty.
    #[error("Output file missing or empty: {}", path.display())]
    EmptyOutput { path: PathBuf },
}

impl TransformError {
    /// Create an input not found error.
    pub fn input_not_found(path: impl Into<PathBuf>) -> Self {
        Self::InputNotFound { path: path.into() }
    }

    /// Create a timeout error.
    pub fn timeout(tool: impl Into<String>, timeout: Duration) -> Self {
        Self::TranscodeTimeout {
            tool: tool.into(),
            timeout,
        }
    }

    /// Create a transcode failed error.
    pub fn transcode_failed(
        tool: impl Into<String>,
        exit_code: i32,
        stderr: impl Into<String>,
    ) -> Self {
        Self::TranscodeFailed {
            tool: tool.into(),
            exit_code,
            stderr: stderr.into(),
        }
    }

    /// Create a spawn error.
    pub fn spawn(tool: impl Into<String>, source: io::Error) -> Self {
        Self::Spawn {
            tool: tool.into(),
            source,
        }
    }

    /// Create an empty output error.
    pub fn empty_output(path: impl Into<PathBuf>) -> Self {
        Self::EmptyOutput { path: path.into() }
    }

    /// Classification of this error.
    ///
    /// A tool that cannot be started counts as a failed transcode.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InputNotFound { .. } => ErrorKind::InputNotFound,
            Self::TranscodeTimeout { .. } => ErrorKind::TranscodeTimeout,
            Self::TranscodeFailed { .. } | Self::Spawn { .. } => ErrorKind::TranscodeFailed,
            Self::EmptyOutput { .. } => ErrorKind::EmptyOutput,
        }
    }
}

/// Result type for transform operations.
pub type TransformResult<T = crate::models::TransformOutput> = Result<T, TransformError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcode_failed_displays_context() {
        let err = TransformError::transcode_failed("ffmpeg", 1, "Invalid data found");
        let msg = err.to_string();
        assert!(msg.contains("ffmpeg"));
        assert!(msg.contains("exit code 1"));
        assert!(msg.contains("Invalid data found"));
        assert_eq!(err.kind(), ErrorKind::TranscodeFailed);
    }

    #[test]
    fn spawn_failure_is_a_failed_transcode() {
        let err = TransformError::spawn(
            "ffmpeg",
            io::Error::new(io::ErrorKind::NotFound, "no such file"),
        );
        assert_eq!(err.kind(), ErrorKind::TranscodeFailed);
        assert!(err.to_string().contains("Failed to run ffmpeg"));
    }

    #[test]
    fn timeout_reports_seconds() {
        let err = TransformError::timeout("ffmpeg", Duration::from_secs(300));
        assert_eq!(err.to_string(), "ffmpeg timed out after 300s");
        assert_eq!(err.kind(), ErrorKind::TranscodeTimeout);
    }
}
