//! CLI test runner with fluent assertions.
//!
//! Runs the `loopdeck` binary against a private config directory and checks
//! exit codes, output and JSON responses.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde_json::Value;
use tempfile::TempDir;

/// Runner for the compiled `loopdeck` binary.
///
/// # Example
///
/// ```ignore
/// let cli = CliRunner::new();
/// cli.run(&["init"]).assert_success();
/// ```
pub struct CliRunner {
    binary_path: PathBuf,
    config_dir: TempDir,
    env_vars: HashMap<String, String>,
}

impl Default for CliRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CliRunner {
    /// Runner with a fresh, empty config directory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            binary_path: PathBuf::from(env!("CARGO_BIN_EXE_loopdeck")),
            config_dir: TempDir::new().expect("Failed to create temp directory"),
            env_vars: HashMap::new(),
        }
    }

    /// Add an environment variable for command execution.
    #[must_use]
    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.env_vars.insert(key.to_string(), value.to_string());
        self
    }

    pub fn config_dir(&self) -> &Path {
        self.config_dir.path()
    }

    /// Execute the command with the given arguments.
    ///
    /// # Panics
    ///
    /// Panics if the binary cannot be started.
    #[must_use]
    pub fn run(&self, args: &[&str]) -> CliResult {
        let mut cmd = Command::new(&self.binary_path);
        cmd.args(args)
            .env("LOOPDECK_CONFIG_DIR", self.config_dir.path())
            .env("RUST_LOG", "off")
            .env_remove("LOOPDECK_JSON")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (key, value) in &self.env_vars {
            cmd.env(key, value);
        }

        let output = cmd.output().expect("Failed to execute command");
        CliResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            args: args.iter().map(|s| (*s).to_string()).collect(),
        }
    }

    /// Execute with `--json`.
    #[must_use]
    pub fn run_json(&self, args: &[&str]) -> CliResult {
        let mut full_args = vec!["--json"];
        full_args.extend(args);
        self.run(&full_args)
    }
}

/// Captured output from one CLI execution.
#[derive(Debug, Clone)]
pub struct CliResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub args: Vec<String>,
}

impl CliResult {
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    // === Fluent Assertions (all return &Self for chaining) ===

    pub fn assert_success(&self) -> &Self {
        assert!(
            self.success(),
            "Command {:?} failed with exit code {}: {}",
            self.args,
            self.exit_code,
            self.stderr
        );
        self
    }

    pub fn assert_failure(&self) -> &Self {
        assert!(
            !self.success(),
            "Command {:?} unexpectedly succeeded: {}",
            self.args,
            self.stdout
        );
        self
    }

    pub fn assert_stdout_contains(&self, needle: &str) -> &Self {
        assert!(
            self.stdout.contains(needle),
            "stdout of {:?} lacks {needle:?}:\n{}",
            self.args,
            self.stdout
        );
        self
    }

    pub fn assert_stderr_contains(&self, needle: &str) -> &Self {
        assert!(
            self.stderr.contains(needle),
            "stderr of {:?} lacks {needle:?}:\n{}",
            self.args,
            self.stderr
        );
        self
    }

    /// Parse stdout as JSON.
    ///
    /// # Panics
    ///
    /// Panics if stdout is not valid JSON.
    #[must_use]
    pub fn json(&self) -> Value {
        serde_json::from_str(self.stdout.trim())
            .unwrap_or_else(|_| panic!("Failed to parse JSON:\n{}", self.stdout))
    }

    /// Parse stderr as JSON (error reports in `--json` mode).
    #[must_use]
    pub fn stderr_json(&self) -> Value {
        let line = self
            .stderr
            .lines()
            .rev()
            .find(|l| l.trim_start().starts_with('{'))
            .unwrap_or_default();
        serde_json::from_str(line)
            .unwrap_or_else(|_| panic!("Failed to parse JSON:\n{}", self.stderr))
    }
}
