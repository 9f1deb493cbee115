//! Speed/pitch transform, audio extraction and delivery re-encode.
//!
//! Speed and pitch change together by reinterpreting the waveform at a
//! scaled sample rate and resampling back to the original rate:
//!
//! ```text
//! asetrate=<rate * factor>,aresample=<rate>
//! ```
//!
//! Output metadata is rebuilt from scratch (`-map_metadata -1`): every
//! non-empty source tag except the title is passed explicitly, followed by
//! the newly derived title. The old title never reaches the output.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::codec::{AudioFormat, CodecParams};
use crate::errors::{TransformError, TransformResult};
use crate::models::{MediaFile, TagSet, TransformOutput, TransformRequest};
use crate::probe::Prober;
use crate::runner::{run_command, tool_name};
use crate::title::derive_output_title;

/// Sample rate assumed when the input's rate cannot be probed.
pub const FALLBACK_SAMPLE_RATE: u32 = 44100;

/// Sample rate of audio extracted from video.
pub const EXTRACT_SAMPLE_RATE: u32 = 44100;

/// Locations of the external tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

/// Wall-clock limits per external call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Transform, extraction and re-encode.
    pub transcode: Duration,
    /// Each individual probe.
    pub probe: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            transcode: Duration::from_secs(300),
            probe: Duration::from_secs(10),
        }
    }
}

/// Availability of the external tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolStatus {
    pub ffmpeg: bool,
    pub ffprobe: bool,
}

impl ToolStatus {
    pub fn all_available(&self) -> bool {
        self.ffmpeg && self.ffprobe
    }
}

/// Runs transform jobs. Holds only configuration, so one instance can be
/// shared by any number of concurrent requests.
#[derive(Debug, Clone, Default)]
pub struct Transformer {
    tools: ToolPaths,
    timeouts: Timeouts,
    fallback_sample_rate: Option<u32>,
}

impl Transformer {
    /// Create a transformer with the given tools and limits.
    pub fn new(tools: ToolPaths, timeouts: Timeouts) -> Self {
        Self {
            tools,
            timeouts,
            fallback_sample_rate: None,
        }
    }

    /// Override the sample rate assumed when probing fails.
    pub fn with_fallback_sample_rate(mut self, rate: u32) -> Self {
        self.fallback_sample_rate = Some(rate);
        self
    }

    pub fn tools(&self) -> &ToolPaths {
        &self.tools
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    /// Prober sharing this transformer's ffprobe path and probe limit.
    pub fn prober(&self) -> Prober {
        Prober::new(&self.tools.ffprobe, self.timeouts.probe)
    }

    fn fallback_sample_rate(&self) -> u32 {
        self.fallback_sample_rate.unwrap_or(FALLBACK_SAMPLE_RATE)
    }

    /// Change speed and pitch of `request.input()` and write the result to
    /// `request.output()`.
    ///
    /// Writes only the output file. Partial output left by a failed run is
    /// the caller's to delete.
    pub async fn transform(&self, request: &TransformRequest) -> TransformResult {
        let input = request.input();
        let output = request.output();
        let speed = request.speed();

        if !MediaFile::new(input).exists() {
            tracing::error!("Input file does not exist: {}", input.display());
            return Err(TransformError::input_not_found(input));
        }

        tracing::info!(
            "Processing audio: {} -> {} (speed: {})",
            input.display(),
            output.display(),
            speed
        );

        let source = self.prober().media_file(input).await;

        let current_rate = match source.sample_rate {
            Some(rate) => rate,
            None => {
                let fallback = self.fallback_sample_rate();
                tracing::warn!(
                    "Could not detect sample rate of {}, using {}",
                    input.display(),
                    fallback
                );
                fallback
            }
        };
        let new_rate = speed.scaled_rate(current_rate);
        let filter = resample_filter(new_rate, current_rate);

        let title = derive_output_title(
            source.tags.get("title"),
            source.tags.get("artist"),
            speed,
            request.original_filename(),
        );
        match &title {
            Some(t) => tracing::debug!("Output title: '{}'", t),
            None => tracing::debug!("No title available, title tag omitted"),
        }
        let output_tags = build_output_tags(&source.tags, title.as_deref());

        let codec = CodecParams::for_path(output);
        let args = build_transform_args(input, output, &filter, current_rate, &output_tags, codec);

        let result = self.run_ffmpeg(&args, output).await?;
        tracing::info!(
            "Audio processed: {} ({:.2} KB)",
            result.path.display(),
            result.size_bytes as f64 / 1024.0
        );
        Ok(result)
    }

    /// Demux the audio of a video file into 16-bit PCM WAV, 44.1 kHz stereo.
    pub async fn extract_audio_track(&self, video: &Path, output: &Path) -> TransformResult {
        if !video.exists() {
            tracing::error!("Video file does not exist: {}", video.display());
            return Err(TransformError::input_not_found(video));
        }

        tracing::info!("Extracting audio from video: {}", video.display());
        let args = build_extract_args(video, output);
        let result = self.run_ffmpeg(&args, output).await?;
        tracing::info!("Audio extracted: {}", result.path.display());
        Ok(result)
    }

    /// Re-encode a produced file to mp3 for delivery.
    ///
    /// All non-empty tags are carried over unchanged, title included.
    pub async fn reencode_for_delivery(&self, input: &Path, output: &Path) -> TransformResult {
        if !input.exists() {
            tracing::error!("Input file does not exist: {}", input.display());
            return Err(TransformError::input_not_found(input));
        }

        tracing::info!("Converting to mp3: {} -> {}", input.display(), output.display());

        let tags: TagSet = self
            .prober()
            .tags(input)
            .await
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .collect();
        let args = build_reencode_args(input, output, &tags);
        let result = self.run_ffmpeg(&args, output).await?;
        tracing::info!("Converted to mp3: {}", result.path.display());
        Ok(result)
    }

    /// Check that ffmpeg and ffprobe can be run.
    pub async fn check_tools(&self) -> ToolStatus {
        let status = ToolStatus {
            ffmpeg: self.tool_responds(&self.tools.ffmpeg).await,
            ffprobe: self.tool_responds(&self.tools.ffprobe).await,
        };
        if !status.ffmpeg {
            tracing::warn!(
                "ffmpeg not found at '{}'. Make sure ffmpeg is installed.",
                self.tools.ffmpeg.display()
            );
        }
        if !status.ffprobe {
            tracing::warn!(
                "ffprobe not found at '{}'. Metadata will not be preserved.",
                self.tools.ffprobe.display()
            );
        }
        status
    }

    async fn tool_responds(&self, program: &Path) -> bool {
        let args = [OsString::from("-version")];
        run_command(program, &args, self.timeouts.probe)
            .await
            .map(|out| out.success)
            .unwrap_or(false)
    }

    /// Run ffmpeg and validate the output file.
    async fn run_ffmpeg(&self, args: &[OsString], output: &Path) -> TransformResult {
        let tool = tool_name(&self.tools.ffmpeg);
        let result = run_command(&self.tools.ffmpeg, args, self.timeouts.transcode).await?;

        if !result.success {
            let stderr = result.stderr.trim();
            tracing::error!("{} error: {}", tool, stderr);
            return Err(TransformError::transcode_failed(
                tool,
                result.exit_code.unwrap_or(-1),
                stderr,
            ));
        }

        validate_output(output)
    }
}

/// Two-stage filter: reinterpret at `new_rate`, resample to `current_rate`.
pub fn resample_filter(new_rate: u32, current_rate: u32) -> String {
    format!("asetrate={},aresample={}", new_rate, current_rate)
}

/// Escape a tag value for ffmpeg's `key=value` metadata syntax.
pub fn escape_metadata_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | ':' | '=') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Output tag set: non-empty source tags minus any title, then `title`.
pub fn build_output_tags(source: &TagSet, title: Option<&str>) -> TagSet {
    let mut tags: TagSet = source
        .iter()
        .filter(|(k, v)| !v.is_empty() && !k.eq_ignore_ascii_case("title"))
        .collect();
    if let Some(title) = title {
        tags.insert("title", title);
    }
    tags
}

fn metadata_args(tags: &TagSet) -> Vec<OsString> {
    tags.iter()
        .flat_map(|(k, v)| {
            [
                OsString::from("-metadata"),
                OsString::from(format!("{}={}", k, escape_metadata_value(v))),
            ]
        })
        .collect()
}

fn codec_args(codec: &CodecParams) -> impl Iterator<Item = OsString> {
    codec.to_args().into_iter().map(OsString::from)
}

/// Full ffmpeg argument list for a speed/pitch transform.
pub fn build_transform_args(
    input: &Path,
    output: &Path,
    filter: &str,
    sample_rate: u32,
    tags: &TagSet,
    codec: &CodecParams,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-i".into(),
        input.into(),
        "-map_metadata".into(),
        "-1".into(),
        "-af".into(),
        filter.into(),
        "-ar".into(),
        sample_rate.to_string().into(),
    ];
    args.extend(metadata_args(tags));
    args.extend(codec_args(codec));
    args.push("-y".into());
    args.push(output.into());
    args
}

/// ffmpeg arguments for demuxing audio from video to WAV.
pub fn build_extract_args(video: &Path, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-i".into(), video.into(), "-vn".into()];
    args.extend(codec_args(AudioFormat::Wav.codec_params()));
    args.push("-ar".into());
    args.push(EXTRACT_SAMPLE_RATE.to_string().into());
    args.push("-ac".into());
    args.push("2".into());
    args.push("-y".into());
    args.push(output.into());
    args
}

/// ffmpeg arguments for the mp3 delivery re-encode.
pub fn build_reencode_args(input: &Path, output: &Path, tags: &TagSet) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-i".into(),
        input.into(),
        "-map_metadata".into(),
        "-1".into(),
    ];
    args.extend(metadata_args(tags));
    args.extend(codec_args(AudioFormat::Mp3.codec_params()));
    args.push("-y".into());
    args.push(output.into());
    args
}

/// The output must exist and be non-empty.
fn validate_output(output: &Path) -> TransformResult {
    match std::fs::metadata(output) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(TransformOutput {
            path: output.to_path_buf(),
            size_bytes: meta.len(),
        }),
        _ => {
            tracing::error!("Output file missing or empty: {}", output.display());
            Err(TransformError::empty_output(output))
        }
    }
}
