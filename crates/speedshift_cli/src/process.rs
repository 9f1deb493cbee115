//! The `process` command: one file in, one (or two) files out.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use speedshift_core::config::Settings;
use speedshift_core::models::TransformOutput;
use speedshift_core::{
    delivery_file_name, derive_output_name, is_directly_playable, MediaKind, SpeedFactor,
    TransformRequest, Transformer,
};

/// Options for one `process` run.
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    pub input: PathBuf,
    pub speed: SpeedFactor,
    /// Defaults to the configured temp directory.
    pub output_dir: Option<PathBuf>,
    /// Output extension, overriding the input's.
    pub format: Option<String>,
    /// Also produce an mp3 copy when the result is not directly playable.
    pub deliver: bool,
}

/// Files produced by a `process` run.
#[derive(Debug)]
pub struct ProcessOutcome {
    pub output: TransformOutput,
    pub delivery: Option<TransformOutput>,
}

/// File name of the result for `input_name`.
///
/// Video inputs default to mp3, since only their audio is kept.
pub fn output_file_name(
    input_name: &str,
    kind: MediaKind,
    speed: SpeedFactor,
    format: Option<&str>,
) -> String {
    let name = derive_output_name(input_name, speed);
    let format = format
        .map(|f| f.trim().trim_start_matches('.'))
        .filter(|f| !f.is_empty())
        .or((kind == MediaKind::Video).then_some("mp3"));

    match format {
        Some(ext) => with_extension(&name, ext),
        None => name,
    }
}

fn with_extension(name: &str, ext: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => format!("{}.{}", stem, ext),
        _ => format!("{}.{}", name, ext),
    }
}

/// Reject inputs over the configured size limit.
pub fn check_file_size(path: &Path, max_bytes: u64) -> Result<u64> {
    let size = fs::metadata(path)
        .with_context(|| format!("Cannot read {}", path.display()))?
        .len();
    if size > max_bytes {
        bail!(
            "File too large: {:.1} MB (max {} MB)",
            size as f64 / (1024.0 * 1024.0),
            max_bytes / (1024 * 1024)
        );
    }
    Ok(size)
}

/// Run the full pipeline for one input.
pub async fn run(settings: &Settings, opts: &ProcessOptions) -> Result<ProcessOutcome> {
    let input = &opts.input;
    let kind = MediaKind::from_path(input);
    if kind == MediaKind::Unsupported {
        bail!("Unsupported file type: {}", input.display());
    }

    check_file_size(input, settings.limits.max_file_size_bytes())?;

    if !opts.speed.is_in_recommended_range() {
        tracing::warn!(
            "Speed factor {} is outside the recommended range {}-{}",
            opts.speed,
            SpeedFactor::MIN,
            SpeedFactor::MAX
        );
    }

    let temp_dir = PathBuf::from(&settings.paths.temp_dir);
    let output_dir = opts.output_dir.clone().unwrap_or_else(|| temp_dir.clone());
    fs::create_dir_all(&temp_dir)
        .with_context(|| format!("Cannot create {}", temp_dir.display()))?;
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("Cannot create {}", output_dir.display()))?;

    let input_name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let output = output_dir.join(output_file_name(
        &input_name,
        kind,
        opts.speed,
        opts.format.as_deref(),
    ));
    if same_file(input, &output) {
        bail!(
            "Output {} would overwrite the input; choose another --output-dir or --format",
            output.display()
        );
    }
    let output_existed = output.exists();

    let transformer = settings.transformer();

    let extracted = if kind == MediaKind::Video {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string());
        let wav = temp_dir.join(format!("extracted_{}.wav", stem));
        transformer
            .extract_audio_track(input, &wav)
            .await
            .context("Could not extract audio from video")?;
        Some(wav)
    } else {
        None
    };
    let source = extracted.as_deref().unwrap_or(input);

    let request =
        TransformRequest::new(source, opts.speed, &output).with_original_filename(&input_name);
    let result = transformer.transform(&request).await;

    if let Some(wav) = &extracted {
        remove_quietly(wav);
    }
    let output = match result {
        Ok(output) => output,
        Err(e) => {
            if !output_existed {
                remove_quietly(&output);
            }
            return Err(e).context("Processing failed");
        }
    };

    let delivery = if opts.deliver && !is_directly_playable(&output.path) {
        deliver(&transformer, &output.path).await
    } else {
        None
    };

    Ok(ProcessOutcome { output, delivery })
}

/// mp3 copy next to `produced`. Failure keeps the original result.
async fn deliver(transformer: &Transformer, produced: &Path) -> Option<TransformOutput> {
    let name = produced
        .file_name()
        .map(|n| delivery_file_name(&n.to_string_lossy()))?;
    let target = produced.with_file_name(name);
    let target_existed = target.exists();

    match transformer.reencode_for_delivery(produced, &target).await {
        Ok(out) => Some(out),
        Err(e) => {
            tracing::warn!("Could not convert {} to mp3: {}", produced.display(), e);
            if !target_existed {
                remove_quietly(&target);
            }
            None
        }
    }
}

/// Whether two paths name the same file. `b` need not exist yet.
fn same_file(a: &Path, b: &Path) -> bool {
    fn resolve(path: &Path) -> Option<PathBuf> {
        if let Ok(resolved) = fs::canonicalize(path) {
            return Some(resolved);
        }
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        Some(fs::canonicalize(parent).ok()?.join(path.file_name()?))
    }

    match (resolve(a), resolve(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn remove_quietly(path: &Path) {
    if path.exists() {
        if let Err(e) = fs::remove_file(path) {
            tracing::debug!("Could not remove {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn speed(v: f64) -> SpeedFactor {
        SpeedFactor::new(v).unwrap()
    }

    #[test]
    fn audio_keeps_its_extension() {
        assert_eq!(
            output_file_name("Song.flac", MediaKind::Audio, speed(0.8), None),
            "Song (Slowed)_-20%.flac"
        );
    }

    #[test]
    fn format_overrides_extension() {
        assert_eq!(
            output_file_name("Song.flac", MediaKind::Audio, speed(1.2), Some(".ogg")),
            "Song (Speed Up)_+20%.ogg"
        );
    }

    #[test]
    fn video_defaults_to_mp3() {
        assert_eq!(
            output_file_name("clip.mp4", MediaKind::Video, speed(0.8), None),
            "clip (Slowed)_-20%.mp3"
        );
        assert_eq!(
            output_file_name("clip.mp4", MediaKind::Video, speed(0.8), Some("wav")),
            "clip (Slowed)_-20%.wav"
        );
    }

    #[test]
    fn oversized_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.mp3");
        fs::write(&path, vec![0u8; 2048]).unwrap();

        assert_eq!(check_file_size(&path, 4096).unwrap(), 2048);
        assert!(check_file_size(&path, 1024).is_err());
        assert!(check_file_size(&dir.path().join("absent.mp3"), 1024).is_err());
    }

    #[test]
    fn same_file_resolves_relative_and_missing_paths() {
        let dir = tempfile::tempdir().unwrap();
        let song = dir.path().join("song.mp3");
        fs::write(&song, b"x").unwrap();

        assert!(same_file(&song, &dir.path().join(".").join("song.mp3")));
        assert!(!same_file(&song, &dir.path().join("other.mp3")));
    }

    #[tokio::test]
    async fn unsupported_input_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, b"hello").unwrap();

        let opts = ProcessOptions {
            input: path,
            speed: speed(0.8),
            output_dir: Some(dir.path().to_path_buf()),
            format: None,
            deliver: false,
        };
        let err = run(&Settings::default(), &opts).await.unwrap_err();
        assert!(err.to_string().contains("Unsupported"));
    }

    #[cfg(unix)]
    mod with_fake_ffmpeg {
        use std::os::unix::fs::PermissionsExt;

        use super::*;

        /// Writes a few bytes to its last argument, then fails.
        const FAILING_FFMPEG: &str = "#!/bin/sh\nfor last; do :; done\nprintf partial > \"$last\"\necho 'conversion failed' >&2\nexit 1\n";

        fn settings_with(dir: &Path, ffmpeg_body: &str) -> Settings {
            let ffmpeg = dir.join("ffmpeg");
            fs::write(&ffmpeg, ffmpeg_body).unwrap();
            fs::set_permissions(&ffmpeg, fs::Permissions::from_mode(0o755)).unwrap();

            let mut settings = Settings::default();
            settings.tools.ffmpeg = ffmpeg.display().to_string();
            settings.tools.ffprobe = "/nonexistent/ffprobe".to_string();
            settings.paths.temp_dir = dir.join("temp").display().to_string();
            settings
        }

        fn opts(input: PathBuf, speed: SpeedFactor, output_dir: &Path) -> ProcessOptions {
            ProcessOptions {
                input,
                speed,
                output_dir: Some(output_dir.to_path_buf()),
                format: None,
                deliver: false,
            }
        }

        #[tokio::test]
        async fn output_equal_to_input_is_refused() {
            let dir = tempfile::tempdir().unwrap();
            let settings = settings_with(dir.path(), FAILING_FFMPEG);
            let input = dir.path().join("song.mp3");
            fs::write(&input, b"original audio").unwrap();

            let err = run(&settings, &opts(input.clone(), SpeedFactor::IDENTITY, dir.path()))
                .await
                .unwrap_err();

            assert!(err.to_string().contains("overwrite the input"));
            assert_eq!(fs::read(&input).unwrap(), b"original audio");
        }

        #[tokio::test]
        async fn already_annotated_name_is_not_overwritten() {
            let dir = tempfile::tempdir().unwrap();
            let settings = settings_with(dir.path(), FAILING_FFMPEG);
            let input = dir.path().join("Song (Slowed)_-20%.mp3");
            fs::write(&input, b"original audio").unwrap();

            assert!(run(&settings, &opts(input.clone(), speed(0.8), dir.path()))
                .await
                .is_err());
            assert!(input.exists());
        }

        #[tokio::test]
        async fn failed_run_removes_only_its_own_output() {
            let dir = tempfile::tempdir().unwrap();
            let settings = settings_with(dir.path(), FAILING_FFMPEG);
            let input = dir.path().join("song.mp3");
            fs::write(&input, b"original audio").unwrap();

            let fresh_dir = dir.path().join("fresh");
            assert!(run(&settings, &opts(input.clone(), speed(0.8), &fresh_dir))
                .await
                .is_err());
            assert!(!fresh_dir.join("song (Slowed)_-20%.mp3").exists());

            let kept_dir = dir.path().join("kept");
            fs::create_dir_all(&kept_dir).unwrap();
            let earlier = kept_dir.join("song (Slowed)_-20%.mp3");
            fs::write(&earlier, b"earlier result").unwrap();
            assert!(run(&settings, &opts(input.clone(), speed(0.8), &kept_dir))
                .await
                .is_err());
            assert!(earlier.exists());
            assert!(input.exists());
        }
    }
}
