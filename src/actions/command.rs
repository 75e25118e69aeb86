//! Command-line tokenizing and detached process launching.

use std::process::Stdio;
use std::sync::Arc;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{LdError, Result};
use crate::status::StatusLine;

/// Split a command line into tokens.
///
/// Whitespace separates tokens, double quotes group (and are removed), and
/// `\"` is a literal quote.
pub fn tokenize_command_line(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.trim().chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' if chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Starts processes without waiting for them.
pub trait Launcher: Send + Sync {
    /// Start `program` detached. Errors only if the spawn itself fails.
    fn launch(&self, program: &str, args: &[String]) -> Result<()>;

    /// Open a URL with the platform's default handler.
    fn open_url(&self, url: &str) -> Result<()>;
}

/// [`Launcher`] that spawns real processes.
///
/// Exits are observed in the background and non-zero codes reported on the
/// status line; they never affect the launch result.
#[derive(Debug, Clone, Default)]
pub struct SystemLauncher {
    status: Option<Arc<StatusLine>>,
}

impl SystemLauncher {
    pub fn new(status: Arc<StatusLine>) -> Self {
        Self {
            status: Some(status),
        }
    }

    fn spawn_detached(&self, program: &str, args: &[String], label: &str) -> Result<()> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| LdError::Automation(format!("could not start {label}: {e}")))?;
        debug!(program, label, "Process started");

        let status = self.status.clone();
        let label = label.to_string();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(exit) if !exit.success() => {
                    let code = exit
                        .code()
                        .map_or_else(|| "signal".to_string(), |c| c.to_string());
                    warn!(program = %label, code = %code, "Process exited with failure");
                    if let Some(status) = status {
                        status.set(format!("Command exited with code {code}: {label}"));
                    }
                }
                Ok(_) => {}
                Err(e) => debug!(program = %label, error = %e, "Could not wait on process"),
            }
        });
        Ok(())
    }
}

impl Launcher for SystemLauncher {
    fn launch(&self, program: &str, args: &[String]) -> Result<()> {
        if cfg!(windows) {
            let mut full = vec!["/c".to_string(), "start".to_string(), String::new()];
            full.push(program.to_string());
            full.extend_from_slice(args);
            self.spawn_detached("cmd", &full, program)
        } else {
            self.spawn_detached(program, args, program)
        }
    }

    fn open_url(&self, url: &str) -> Result<()> {
        if cfg!(windows) {
            let args = ["/c", "start", "", url].map(String::from);
            self.spawn_detached("cmd", &args, url)
        } else if cfg!(target_os = "macos") {
            self.spawn_detached("open", &[url.to_string()], url)
        } else {
            self.spawn_detached("xdg-open", &[url.to_string()], url)
        }
    }
}
