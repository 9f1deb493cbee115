//! Command runner for external process execution.
//!
//! Every tool call is awaited under a wall-clock limit. The child is spawned
//! with `kill_on_drop`, so when the limit expires the pending future is
//! dropped and the process is killed.

use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::errors::TransformError;

/// Captured output of a finished command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// Exit code, `None` if the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub success: bool,
}

/// Display name of a tool for logs and errors.
pub fn tool_name(program: &Path) -> String {
    program
        .file_name()
        .unwrap_or(program.as_os_str())
        .to_string_lossy()
        .into_owned()
}

/// Render a command line for logging.
pub fn format_command(program: &Path, args: &[OsString]) -> String {
    std::iter::once(program.as_os_str())
        .chain(args.iter().map(OsString::as_os_str))
        .map(OsStr::to_string_lossy)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run a command to completion, capturing stdout and stderr.
///
/// Errors only when the process cannot be started or waited on, or when it
/// exceeds `timeout`. A non-zero exit is reported through
/// [`CommandOutput::success`].
pub async fn run_command(
    program: &Path,
    args: &[OsString],
    timeout: Duration,
) -> Result<CommandOutput, TransformError> {
    let tool = tool_name(program);
    tracing::debug!("$ {}", format_command(program, args));

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| TransformError::spawn(&tool, e))?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => result.map_err(|e| TransformError::spawn(&tool, e))?,
        Err(_) => {
            tracing::error!("{} exceeded {}s, killed", tool, timeout.as_secs_f64());
            return Err(TransformError::timeout(tool, timeout));
        }
    };

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        exit_code: output.status.code(),
        success: output.status.success(),
    })
}
