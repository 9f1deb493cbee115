//! Output format -> encoder parameters.
//!
//! Pure data: one entry per supported extension, mp3 as the fallback for
//! anything unknown. Adding a format means adding a variant and a row.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Output formats with dedicated encoder settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Mp3,
    M4a,
    Aac,
    Ogg,
    Flac,
    Wav,
    Opus,
}

impl AudioFormat {
    /// All formats, in table order.
    pub const ALL: [AudioFormat; 7] = [
        AudioFormat::Mp3,
        AudioFormat::M4a,
        AudioFormat::Aac,
        AudioFormat::Ogg,
        AudioFormat::Flac,
        AudioFormat::Wav,
        AudioFormat::Opus,
    ];

    /// Look up a format by extension (case-insensitive, leading dot optional).
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.');
        Self::ALL
            .into_iter()
            .find(|f| f.extension().eq_ignore_ascii_case(ext))
    }

    /// Look up a format from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Canonical file extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::M4a => "m4a",
            AudioFormat::Aac => "aac",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Flac => "flac",
            AudioFormat::Wav => "wav",
            AudioFormat::Opus => "opus",
        }
    }

    /// Encoder parameters for this format.
    pub fn codec_params(self) -> &'static CodecParams {
        match self {
            AudioFormat::Mp3 => &MP3,
            AudioFormat::M4a | AudioFormat::Aac => &AAC,
            AudioFormat::Ogg => &VORBIS,
            AudioFormat::Flac => &FLAC,
            AudioFormat::Wav => &PCM_S16LE,
            AudioFormat::Opus => &OPUS,
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Encoder selection plus quality and container flags, as ffmpeg arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecParams {
    /// ffmpeg encoder name.
    pub encoder: &'static str,
    /// Quality/bitrate flags.
    pub quality: &'static [&'static str],
    /// Container-specific tag flags.
    pub tag_flags: &'static [&'static str],
}

/// libmp3lame VBR ~192 kbps, ID3v2.3 for the widest player support.
const MP3: CodecParams = CodecParams {
    encoder: "libmp3lame",
    quality: &["-q:a", "2"],
    tag_flags: &["-id3v2_version", "3", "-write_id3v2", "1"],
};

const AAC: CodecParams = CodecParams {
    encoder: "aac",
    quality: &["-b:a", "192k"],
    tag_flags: &[],
};

/// Vorbis quality 5, roughly 160 kbps.
const VORBIS: CodecParams = CodecParams {
    encoder: "libvorbis",
    quality: &["-q:a", "5"],
    tag_flags: &[],
};

const FLAC: CodecParams = CodecParams {
    encoder: "flac",
    quality: &["-compression_level", "5"],
    tag_flags: &[],
};

const PCM_S16LE: CodecParams = CodecParams {
    encoder: "pcm_s16le",
    quality: &[],
    tag_flags: &[],
};

const OPUS: CodecParams = CodecParams {
    encoder: "libopus",
    quality: &["-b:a", "128k"],
    tag_flags: &[],
};

impl CodecParams {
    /// Parameters for an output extension; unknown extensions get mp3.
    pub fn for_extension(ext: &str) -> &'static CodecParams {
        match AudioFormat::from_extension(ext) {
            Some(format) => format.codec_params(),
            None => {
                tracing::debug!(
                    "No codec entry for extension '{}', falling back to mp3",
                    ext
                );
                AudioFormat::Mp3.codec_params()
            }
        }
    }

    /// Parameters for an output path; unknown or missing extension gets mp3.
    pub fn for_path(path: &Path) -> &'static CodecParams {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        Self::for_extension(ext)
    }

    /// Render as ffmpeg arguments: `-acodec <encoder> <quality..> <tag flags..>`.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec!["-acodec".to_string(), self.encoder.to_string()];
        args.extend(self.quality.iter().map(|s| s.to_string()));
        args.extend(self.tag_flags.iter().map(|s| s.to_string()));
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mp3_params_match_table() {
        assert_eq!(
            CodecParams::for_extension(".mp3").to_args(),
            vec![
                "-acodec",
                "libmp3lame",
                "-q:a",
                "2",
                "-id3v2_version",
                "3",
                "-write_id3v2",
                "1"
            ]
        );
    }

    #[test]
    fn unknown_extension_falls_back_to_mp3() {
        assert_eq!(CodecParams::for_extension(".xyz"), AudioFormat::Mp3.codec_params());
        assert_eq!(CodecParams::for_extension(""), AudioFormat::Mp3.codec_params());
        assert_eq!(
            CodecParams::for_path(Path::new("/tmp/out")),
            AudioFormat::Mp3.codec_params()
        );
    }

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(AudioFormat::from_extension("FLAC"), Some(AudioFormat::Flac));
        assert_eq!(
            CodecParams::for_path(Path::new("song.OGG")).encoder,
            "libvorbis"
        );
    }

    #[test]
    fn m4a_and_aac_share_encoder() {
        assert_eq!(AudioFormat::M4a.codec_params(), AudioFormat::Aac.codec_params());
        assert_eq!(
            AudioFormat::Aac.codec_params().to_args(),
            vec!["-acodec", "aac", "-b:a", "192k"]
        );
    }

    #[test]
    fn every_format_round_trips_through_extension() {
        for format in AudioFormat::ALL {
            assert_eq!(AudioFormat::from_extension(format.extension()), Some(format));
        }
    }

    #[test]
    fn wav_has_no_quality_flags() {
        assert_eq!(
            AudioFormat::Wav.codec_params().to_args(),
            vec!["-acodec", "pcm_s16le"]
        );
    }
}
