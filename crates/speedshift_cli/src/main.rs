//! speedshift - change the speed and pitch of audio files from the command line.
//!
//! ```text
//! speedshift process song.flac --speed 0.8 --deliver
//! speedshift name "Song (Slowed)_-20%.mp3" --speed 1.2
//! speedshift title "Artist - Song" --artist Artist --speed 0.8
//! speedshift cleanup --max-age-hours 6
//! speedshift check-tools
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use speedshift_core::config::ConfigManager;
use speedshift_core::logging::{init_tracing, init_tracing_with_file};
use speedshift_core::{derive_output_name, derive_output_title, reap_stale_files, SpeedFactor};

mod process;

use process::ProcessOptions;

#[derive(Parser, Debug)]
#[command(name = "speedshift")]
#[command(about = "Slow down or speed up audio, pitch included, and fix up the tags")]
#[command(version)]
struct Cli {
    /// Config file (created with defaults if missing)
    #[arg(short, long, default_value = ".config/settings.toml", env = "SPEEDSHIFT_CONFIG")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Transform an audio or video file
    Process {
        input: PathBuf,

        /// Speed factor, e.g. 0.8 (slower, lower) or 1.2 (faster, higher)
        #[arg(short, long)]
        speed: SpeedFactor,

        /// Where to write the result (default: the temp directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Output format extension, e.g. mp3, flac, ogg
        #[arg(short, long)]
        format: Option<String>,

        /// Also write an mp3 copy if the result is not directly playable
        #[arg(long)]
        deliver: bool,
    },

    /// Print the output file name for a submitted file name
    Name {
        filename: String,

        #[arg(short, long)]
        speed: SpeedFactor,
    },

    /// Print the title tag a file would get
    Title {
        title: String,

        #[arg(short, long)]
        artist: Option<String>,

        #[arg(short, long)]
        speed: SpeedFactor,
    },

    /// Delete stale files from the temp directory
    Cleanup {
        /// Override the configured age limit
        #[arg(long)]
        max_age_hours: Option<u64>,
    },

    /// Check that ffmpeg and ffprobe can be run
    CheckTools,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = ConfigManager::new(&cli.config);
    config
        .load_or_create()
        .with_context(|| format!("Failed to load config {}", cli.config.display()))?;
    config.settings_mut().apply_env_overrides();
    config.ensure_dirs_exist().context("Failed to create working directories")?;

    let settings = config.settings().clone();
    let _guard = if settings.logging.file {
        Some(init_tracing_with_file(settings.logging.level, config.logs_dir()))
    } else {
        init_tracing(settings.logging.level);
        None
    };

    tracing::debug!("Config: {}", config.path().display());

    match cli.command {
        Command::Process {
            input,
            speed,
            output_dir,
            format,
            deliver,
        } => {
            let opts = ProcessOptions {
                input,
                speed,
                output_dir,
                format,
                deliver,
            };
            let outcome = process::run(&settings, &opts).await?;
            println!("{}", outcome.output.path.display());
            if let Some(delivery) = outcome.delivery {
                println!("{}", delivery.path.display());
            }
        }

        Command::Name { filename, speed } => {
            println!("{}", derive_output_name(&filename, speed));
        }

        Command::Title {
            title,
            artist,
            speed,
        } => match derive_output_title(Some(title.as_str()), artist.as_deref(), speed, None) {
            Some(derived) => println!("{}", derived),
            None => println!(),
        },

        Command::Cleanup { max_age_hours } => {
            let mut cleanup = settings.cleanup.clone();
            if let Some(hours) = max_age_hours {
                cleanup.max_age_hours = hours;
            }
            let report = reap_stale_files(&config.temp_dir(), cleanup.max_age())
                .context("Failed to clean temp directory")?;
            println!(
                "Removed {} file(s), {} bytes freed",
                report.removed, report.bytes_freed
            );
        }

        Command::CheckTools => {
            let status = settings.transformer().check_tools().await;
            println!("ffmpeg:  {}", if status.ffmpeg { "ok" } else { "missing" });
            println!("ffprobe: {}", if status.ffprobe { "ok" } else { "missing" });
            if !status.ffmpeg {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_process_command() {
        let cli = Cli::try_parse_from([
            "speedshift",
            "process",
            "song.flac",
            "--speed",
            "0,8",
            "--format",
            "ogg",
            "--deliver",
        ])
        .unwrap();

        match cli.command {
            Command::Process {
                input,
                speed,
                format,
                deliver,
                output_dir,
            } => {
                assert_eq!(input, PathBuf::from("song.flac"));
                assert_eq!(speed.value(), 0.8);
                assert_eq!(format.as_deref(), Some("ogg"));
                assert!(deliver);
                assert!(output_dir.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_non_positive_speed() {
        assert!(Cli::try_parse_from(["speedshift", "name", "a.mp3", "--speed", "0"]).is_err());
        assert!(Cli::try_parse_from(["speedshift", "name", "a.mp3", "--speed", "fast"]).is_err());
    }
}
