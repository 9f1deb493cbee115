//! File probing using ffprobe.
//!
//! Metadata is always optional: every probe degrades to `None` or an empty
//! tag set on failure, and the sample-rate and tag probes are separate
//! calls that can fail independently.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use crate::errors::TransformError;
use crate::models::{MediaFile, TagSet};
use crate::runner::run_command;

/// Why a probe produced nothing. Logged, never propagated.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error(transparent)]
    Run(#[from] TransformError),

    #[error("ffprobe exited with code {exit_code:?}: {stderr}")]
    Failed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Failed to parse ffprobe output: {0}")]
    Parse(String),
}

/// Reads sample rate, codec and tags from media files.
#[derive(Debug, Clone)]
pub struct Prober {
    ffprobe: PathBuf,
    timeout: Duration,
}

impl Prober {
    /// Create a prober using the given ffprobe binary and per-call limit.
    pub fn new(ffprobe: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            ffprobe: ffprobe.into(),
            timeout,
        }
    }

    /// Sample rate of the first audio stream.
    pub async fn sample_rate(&self, path: &Path) -> Option<u32> {
        let result = self
            .first_audio_stream_entry(path, "sample_rate")
            .await
            .and_then(|out| {
                parse_sample_rate(&out)
                    .ok_or_else(|| ProbeError::Parse(format!("sample rate '{}'", out.trim())))
            });
        ok_or_log(path, "sample rate", result)
    }

    /// Codec name of the first audio stream (e.g. "mp3", "flac").
    pub async fn codec_name(&self, path: &Path) -> Option<String> {
        let result = self
            .first_audio_stream_entry(path, "codec_name")
            .await
            .and_then(|out| {
                first_line(&out)
                    .map(str::to_string)
                    .ok_or_else(|| ProbeError::Parse("empty codec name".to_string()))
            });
        ok_or_log(path, "codec name", result)
    }

    /// All container-level tags. Empty on any failure.
    pub async fn tags(&self, path: &Path) -> TagSet {
        let args: Vec<OsString> = vec![
            "-v".into(),
            "error".into(),
            "-show_entries".into(),
            "format_tags".into(),
            "-of".into(),
            "json".into(),
            path.into(),
        ];
        let result = self.run(&args).await.and_then(|out| parse_tags_json(&out));
        ok_or_log(path, "tags", result).unwrap_or_default()
    }

    /// Probe sample rate and tags into a [`MediaFile`].
    pub async fn media_file(&self, path: &Path) -> MediaFile {
        let sample_rate = self.sample_rate(path).await;
        let tags = self.tags(path).await;
        MediaFile::new(path)
            .with_sample_rate(sample_rate)
            .with_tags(tags)
    }

    async fn first_audio_stream_entry(&self, path: &Path, entry: &str) -> Result<String, ProbeError> {
        let args: Vec<OsString> = vec![
            "-v".into(),
            "error".into(),
            "-select_streams".into(),
            "a:0".into(),
            "-show_entries".into(),
            format!("stream={}", entry).into(),
            "-of".into(),
            "default=noprint_wrappers=1:nokey=1".into(),
            path.into(),
        ];
        self.run(&args).await
    }

    async fn run(&self, args: &[OsString]) -> Result<String, ProbeError> {
        let output = run_command(&self.ffprobe, args, self.timeout).await?;
        if !output.success {
            return Err(ProbeError::Failed {
                exit_code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}

fn ok_or_log<T>(path: &Path, what: &str, result: Result<T, ProbeError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!("Could not probe {} of {}: {}", what, path.display(), e);
            None
        }
    }
}

fn first_line(output: &str) -> Option<&str> {
    output.lines().map(str::trim).find(|l| !l.is_empty())
}

/// Parse ffprobe's bare `sample_rate` output. Zero and "N/A" are treated
/// as unknown.
pub fn parse_sample_rate(output: &str) -> Option<u32> {
    first_line(output)?.parse().ok().filter(|&rate| rate > 0)
}

/// Parse `-show_entries format_tags -of json` output.
///
/// A file without tags yields an empty set; malformed JSON is an error.
pub fn parse_tags_json(output: &str) -> Result<TagSet, ProbeError> {
    let json: Value =
        serde_json::from_str(output).map_err(|e| ProbeError::Parse(e.to_string()))?;

    let tags = json
        .get("format")
        .and_then(|f| f.get("tags"))
        .and_then(|t| t.as_object())
        .map(TagSet::from_json_object)
        .unwrap_or_default();

    Ok(tags)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sample_rate() {
        assert_eq!(parse_sample_rate("44100\n"), Some(44100));
        assert_eq!(parse_sample_rate("\n 48000 \n"), Some(48000));
        assert_eq!(parse_sample_rate("N/A\n"), None);
        assert_eq!(parse_sample_rate("0"), None);
        assert_eq!(parse_sample_rate(""), None);
    }

    #[test]
    fn parses_tags() {
        let out = r#"{
            "programs": [],
            "format": {
                "tags": {
                    "title": "Artist - Song",
                    "ARTIST": "Artist",
                    "album": "Album"
                }
            }
        }"#;
        let tags = parse_tags_json(out).unwrap();
        assert_eq!(tags.len(), 3);
        assert_eq!(tags.get("artist"), Some("Artist"));
        assert_eq!(tags.get("title"), Some("Artist - Song"));
    }

    #[test]
    fn untagged_file_yields_empty_set() {
        let tags = parse_tags_json(r#"{"format": {}}"#).unwrap();
        assert!(tags.is_empty());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(parse_tags_json("not json"), Err(ProbeError::Parse(_))));
    }

    #[tokio::test]
    async fn missing_ffprobe_degrades_to_defaults() {
        let prober = Prober::new("/nonexistent/ffprobe", Duration::from_secs(1));
        let file = prober.media_file(Path::new("/tmp/whatever.mp3")).await;
        assert_eq!(file.sample_rate, None);
        assert!(file.tags.is_empty());
        assert_eq!(prober.codec_name(Path::new("/tmp/whatever.mp3")).await, None);
    }
}
