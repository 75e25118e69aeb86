//! OS automation surface: running external helpers and reading their output.
//!
//! Keyboard simulation, icon extraction, shortcut resolution, application
//! discovery and per-application volume all go through PowerShell on
//! Windows. On every other platform the surface refuses to run anything and
//! reports [`LdError::Unsupported`].

mod apps;
pub mod scripts;

pub use apps::{AppCatalog, AppEntry, CATALOG_TTL};

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, trace, warn};

use crate::actions::tokenize_command_line;
use crate::error::{LdError, Result};

/// Runs an external command and returns its trimmed standard output.
#[async_trait]
pub trait OsAutomation: Send + Sync {
    /// Whether this surface can act on the current platform.
    fn supported(&self) -> bool;

    /// Run `command` with `args`, failing on non-zero exit or after `timeout`.
    async fn execute(&self, command: &str, args: &[String], timeout: Duration) -> Result<String>;
}

/// [`OsAutomation`] that spawns real processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAutomation;

#[async_trait]
impl OsAutomation for SystemAutomation {
    fn supported(&self) -> bool {
        cfg!(windows)
    }

    async fn execute(&self, command: &str, args: &[String], timeout: Duration) -> Result<String> {
        if !self.supported() {
            return Err(LdError::Unsupported("OS automation"));
        }
        trace!(command, ?timeout, "Running external command");
        let child = Command::new(command)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| LdError::Timeout(format!("{command} after {}ms", timeout.as_millis())))??;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if output.status.success() {
            return Ok(stdout);
        }
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        debug!(command, status = %output.status, "External command failed");
        Err(LdError::Automation(if stderr.is_empty() {
            format!("{command} exited with {}", output.status)
        } else {
            stderr
        }))
    }
}

/// Run a PowerShell script passed as `-EncodedCommand`.
pub async fn run_script(
    automation: &dyn OsAutomation,
    script: &str,
    extra_args: &[String],
    timeout: Duration,
) -> Result<String> {
    let mut args: Vec<String> = [
        "-NoProfile",
        "-NonInteractive",
        "-ExecutionPolicy",
        "Bypass",
        "-STA",
        "-EncodedCommand",
    ]
    .iter()
    .map(ToString::to_string)
    .collect();
    args.push(scripts::encode_command(script));
    args.extend_from_slice(extra_args);
    automation.execute("powershell", &args, timeout).await
}

/// Resolve the executable a command line launches.
///
/// `.lnk` shortcuts resolve to their target, bare names are looked up with
/// `where.exe`, and path-like tokens are returned unchanged. Lookup failures
/// fall back to the token itself.
pub async fn resolve_target(automation: &dyn OsAutomation, command_line: &str) -> Option<String> {
    let executable = tokenize_command_line(command_line).into_iter().next()?;
    if !automation.supported() {
        return Some(executable);
    }

    if executable.to_ascii_lowercase().ends_with(".lnk") {
        let script = scripts::resolve_shortcut(&executable);
        match run_script(automation, &script, &[], Duration::from_millis(3000)).await {
            Ok(target) if !target.is_empty() => return Some(target),
            Ok(_) => {}
            Err(e) => {
                debug!(shortcut = %executable, error = %e, "Shortcut resolution failed");
                return Some(executable);
            }
        }
    }

    let looks_like_path = executable.contains(['\\', '/', ':']);
    if looks_like_path {
        return Some(executable);
    }

    match automation
        .execute("where.exe", &[executable.clone()], Duration::from_millis(2500))
        .await
    {
        Ok(found) => Some(
            found
                .lines()
                .map(str::trim)
                .find(|l| !l.is_empty())
                .map_or(executable, ToString::to_string),
        ),
        Err(e) => {
            warn!(name = %executable, error = %e, "where.exe lookup failed");
            Some(executable)
        }
    }
}
