//! Configuration management.
//!
//! TOML file with one table per concern. Whole-file saves and single-table
//! updates are both written atomically (temp file, then rename). Missing
//! keys fall back to defaults; unknown tables are dropped on load.
//!
//! # Example
//!
//! ```no_run
//! use speedshift_core::config::{ConfigManager, ConfigSection};
//!
//! let mut config = ConfigManager::new(".config/settings.toml");
//! config.load_or_create().unwrap();
//!
//! let transformer = config.settings().transformer();
//!
//! config.settings_mut().cleanup.max_age_hours = 6;
//! config.update_section(ConfigSection::Cleanup).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    CleanupSettings, ConfigSection, LimitSettings, LoggingSettings, PathSettings,
    ProcessingSettings, Settings, ToolSettings, ENV_CLEANUP_HOURS, ENV_MAX_FILE_SIZE_MB,
};
