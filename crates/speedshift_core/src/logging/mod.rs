//! Logging setup.
//!
//! Library code only emits `tracing` events; the binary installs a
//! subscriber once at startup with one of the functions below.
//!
//! ```no_run
//! use speedshift_core::logging::{init_tracing_with_file, LogLevel};
//!
//! // Keep the guard alive for the life of the process, or buffered
//! // file output is lost.
//! let _guard = init_tracing_with_file(LogLevel::Info, ".logs");
//! tracing::info!("ready");
//! ```

mod types;

pub use types::LogLevel;

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Prefix of the daily log files (`speedshift.log.YYYY-MM-DD`).
pub const LOG_FILE_PREFIX: &str = "speedshift.log";

/// Install a stderr subscriber.
///
/// `RUST_LOG` wins over `default_level` when set.
pub fn init_tracing(default_level: LogLevel) {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(env_filter(default_level))
        .init();
}

/// Install a stderr subscriber plus a daily rolling file in `dir`.
///
/// The returned guard flushes the file writer on drop.
pub fn init_tracing_with_file(default_level: LogLevel, dir: impl AsRef<Path>) -> WorkerGuard {
    let appender = tracing_appender::rolling::daily(dir.as_ref(), LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .with(env_filter(default_level))
        .init();

    guard
}

/// Initialize tracing for tests (only logs warnings and above).
#[cfg(test)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}

fn env_filter(default_level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = LevelFilter::from_level(default_level.to_tracing_level());
        EnvFilter::default().add_directive(level.into())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_to_filter_works() {
        assert_eq!(LogLevel::Debug.as_filter_str(), "debug");
        assert_eq!(LogLevel::Info.to_string(), "info");
    }

    #[test]
    fn default_filter_uses_configured_level() {
        if std::env::var_os("RUST_LOG").is_none() {
            assert_eq!(env_filter(LogLevel::Warn).max_level_hint(), Some(LevelFilter::WARN));
        }
    }

    #[test]
    fn test_tracing_can_be_installed_twice() {
        init_test_tracing();
        init_test_tracing();
        tracing::warn!("visible in test output");
    }
}
