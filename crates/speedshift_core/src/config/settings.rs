//! Settings struct with TOML-based sections.
//!
//! Each section maps to a TOML table and can be rewritten on its own.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::logging::LogLevel;
use crate::transform::{Timeouts, ToolPaths, Transformer, FALLBACK_SAMPLE_RATE};

/// Overrides `cleanup.max_age_hours`.
pub const ENV_CLEANUP_HOURS: &str = "SPEEDSHIFT_CLEANUP_HOURS";
/// Overrides `limits.max_file_size_mb`.
pub const ENV_MAX_FILE_SIZE_MB: &str = "SPEEDSHIFT_MAX_FILE_SIZE_MB";

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub paths: PathSettings,

    #[serde(default)]
    pub tools: ToolSettings,

    #[serde(default)]
    pub processing: ProcessingSettings,

    #[serde(default)]
    pub cleanup: CleanupSettings,

    #[serde(default)]
    pub limits: LimitSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Settings {
    /// Apply `SPEEDSHIFT_*` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup. Unparseable values are
    /// logged and ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(hours) = parse_override(&lookup, ENV_CLEANUP_HOURS) {
            self.cleanup.max_age_hours = hours;
        }
        if let Some(mb) = parse_override(&lookup, ENV_MAX_FILE_SIZE_MB) {
            self.limits.max_file_size_mb = mb;
        }
    }

    /// Tool locations for a [`Transformer`].
    pub fn tool_paths(&self) -> ToolPaths {
        ToolPaths {
            ffmpeg: PathBuf::from(&self.tools.ffmpeg),
            ffprobe: PathBuf::from(&self.tools.ffprobe),
        }
    }

    /// Per-call limits for a [`Transformer`].
    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            transcode: Duration::from_secs(self.processing.transcode_timeout_secs),
            probe: Duration::from_secs(self.processing.probe_timeout_secs),
        }
    }

    /// A transformer configured from these settings.
    pub fn transformer(&self) -> Transformer {
        Transformer::new(self.tool_paths(), self.timeouts())
            .with_fallback_sample_rate(self.processing.fallback_sample_rate)
    }
}

fn parse_override<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring invalid {}='{}'", key, raw);
            None
        }
    }
}

/// Working directories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathSettings {
    /// Intermediate and output files.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: String,

    /// Rolling log files.
    #[serde(default = "default_logs_dir")]
    pub logs_dir: String,
}

fn default_temp_dir() -> String {
    "temp".to_string()
}

fn default_logs_dir() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            temp_dir: default_temp_dir(),
            logs_dir: default_logs_dir(),
        }
    }
}

/// External tool locations. Bare names are resolved through `PATH`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSettings {
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,

    #[serde(default = "default_ffprobe")]
    pub ffprobe: String,
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            ffmpeg: default_ffmpeg(),
            ffprobe: default_ffprobe(),
        }
    }
}

/// Transform limits and fallbacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingSettings {
    /// Limit for each ffmpeg run, in seconds.
    #[serde(default = "default_transcode_timeout")]
    pub transcode_timeout_secs: u64,

    /// Limit for each ffprobe run, in seconds.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// Rate assumed when the input's rate cannot be detected.
    #[serde(default = "default_fallback_sample_rate")]
    pub fallback_sample_rate: u32,
}

fn default_transcode_timeout() -> u64 {
    300
}

fn default_probe_timeout() -> u64 {
    10
}

fn default_fallback_sample_rate() -> u32 {
    FALLBACK_SAMPLE_RATE
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            transcode_timeout_secs: default_transcode_timeout(),
            probe_timeout_secs: default_probe_timeout(),
            fallback_sample_rate: default_fallback_sample_rate(),
        }
    }
}

/// Temp directory reaping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupSettings {
    /// Files older than this are deleted.
    #[serde(default = "default_max_age_hours")]
    pub max_age_hours: u64,
}

fn default_max_age_hours() -> u64 {
    24
}

impl CleanupSettings {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_hours * 3600)
    }
}

impl Default for CleanupSettings {
    fn default() -> Self {
        Self {
            max_age_hours: default_max_age_hours(),
        }
    }
}

/// Input limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitSettings {
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,
}

fn default_max_file_size_mb() -> u64 {
    100
}

impl LimitSettings {
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            max_file_size_mb: default_max_file_size_mb(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default level when `RUST_LOG` is not set.
    #[serde(default)]
    pub level: LogLevel,

    /// Also write a daily log file under `paths.logs_dir`.
    #[serde(default = "default_true")]
    pub file: bool,
}

fn default_true() -> bool {
    true
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            file: default_true(),
        }
    }
}

/// Config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSection {
    Paths,
    Tools,
    Processing,
    Cleanup,
    Limits,
    Logging,
}

impl ConfigSection {
    pub const ALL: [ConfigSection; 6] = [
        ConfigSection::Paths,
        ConfigSection::Tools,
        ConfigSection::Processing,
        ConfigSection::Cleanup,
        ConfigSection::Limits,
        ConfigSection::Logging,
    ];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Tools => "tools",
            ConfigSection::Processing => "processing",
            ConfigSection::Cleanup => "cleanup",
            ConfigSection::Limits => "limits",
            ConfigSection::Logging => "logging",
        }
    }

    /// Comment written above the table in a generated file.
    pub(crate) fn description(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "Working directories",
            ConfigSection::Tools => "External tools (bare names are looked up on PATH)",
            ConfigSection::Processing => "Transform limits",
            ConfigSection::Cleanup => "Temp directory reaping",
            ConfigSection::Limits => "Input limits",
            ConfigSection::Logging => "Logging configuration",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_serialize() {
        let settings = Settings::default();
        let toml_str = toml::to_string_pretty(&settings).unwrap();
        assert!(toml_str.contains("[paths]"));
        assert!(toml_str.contains("[processing]"));
        assert!(toml_str.contains("level = \"info\""));
    }

    #[test]
    fn settings_roundtrip() {
        let mut settings = Settings::default();
        settings.tools.ffmpeg = "/opt/ffmpeg/bin/ffmpeg".to_string();
        settings.logging.level = LogLevel::Debug;
        let toml_str = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn partial_config_uses_defaults() {
        let toml_str = r#"
[cleanup]
max_age_hours = 2
"#;
        let settings: Settings = toml::from_str(toml_str).unwrap();
        assert_eq!(settings.cleanup.max_age_hours, 2);
        assert_eq!(settings.cleanup.max_age(), Duration::from_secs(7200));
        assert_eq!(settings.limits.max_file_size_mb, 100);
        assert_eq!(settings.processing.fallback_sample_rate, 44100);
        assert_eq!(settings.paths.temp_dir, "temp");
        assert!(settings.logging.file);
    }

    #[test]
    fn env_overrides_apply() {
        let mut settings = Settings::default();
        settings.apply_overrides_from(|key| match key {
            ENV_CLEANUP_HOURS => Some("6".to_string()),
            ENV_MAX_FILE_SIZE_MB => Some(" 20 ".to_string()),
            _ => None,
        });
        assert_eq!(settings.cleanup.max_age_hours, 6);
        assert_eq!(settings.limits.max_file_size_mb, 20);
        assert_eq!(settings.limits.max_file_size_bytes(), 20 * 1024 * 1024);
    }

    #[test]
    fn invalid_env_override_is_ignored() {
        let mut settings = Settings::default();
        settings.apply_overrides_from(|key| (key == ENV_CLEANUP_HOURS).then(|| "soon".to_string()));
        assert_eq!(settings.cleanup.max_age_hours, 24);
    }

    #[test]
    fn converts_to_transformer_config() {
        let mut settings = Settings::default();
        settings.processing.transcode_timeout_secs = 60;
        assert_eq!(settings.timeouts().transcode, Duration::from_secs(60));
        assert_eq!(settings.timeouts().probe, Duration::from_secs(10));
        assert_eq!(settings.tool_paths(), ToolPaths::default());
        assert_eq!(settings.transformer().timeouts(), settings.timeouts());
    }

    #[test]
    fn section_table_names() {
        let names: Vec<_> = ConfigSection::ALL.iter().map(|s| s.table_name()).collect();
        assert_eq!(
            names,
            vec!["paths", "tools", "processing", "cleanup", "limits", "logging"]
        );
    }
}
