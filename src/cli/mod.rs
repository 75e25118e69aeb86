//! CLI argument definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Loopdeck - shortcut daemon for Loupedeck-style control surfaces.
///
/// Keeps per-profile key layouts, renders them onto the device and runs the
/// bound actions. Use --json for machine-parseable output.
#[derive(Parser, Debug)]
#[command(name = "loopdeck", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// JSON output (results on stdout, logs as JSON lines on stderr)
    #[arg(long, global = true, env = "LOOPDECK_JSON")]
    pub json: bool,

    /// Verbose output (-v debug, -vv trace)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (only errors are logged)
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Configuration directory (default: platform config dir + /loopdeck)
    #[arg(long, global = true, env = "LOOPDECK_CONFIG_DIR", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    // === Configuration ===
    /// Create the configuration directory and a default document
    Init,

    /// Load the configuration, repairing it, and list what was repaired
    Check,

    /// Strictly validate a configuration document
    Validate(ValidateArgs),

    // === Profiles & Actions ===
    /// Make a profile active
    Profile(ProfileArgs),

    /// Run the shortcut on a key
    Trigger(TriggerArgs),

    /// Run an action that is not bound to a key
    Exec(ExecArgs),

    // === Rendering ===
    /// Render the active profile to PNG files
    Render(RenderArgs),

    /// Set or clear a key's custom icon
    #[command(subcommand)]
    Icon(IconCommand),

    // === Discovery ===
    /// List installed applications
    Apps,

    // === Utilities ===
    /// Show version and build information
    Version,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// === Argument Structs ===

#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// JSON document to validate
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Save the document as the active configuration when it is valid
    #[arg(long, short = 'w')]
    pub write: bool,
}

#[derive(Parser, Debug)]
pub struct ProfileArgs {
    /// Profile identifier (home, 1-7)
    pub id: String,
}

#[derive(Parser, Debug)]
pub struct TriggerArgs {
    /// Key index (0-11, left-to-right, top-to-bottom)
    pub key: i64,

    /// Switch to this profile first
    #[arg(long, short = 'p')]
    pub profile: Option<String>,
}

#[derive(Parser, Debug)]
pub struct ExecArgs {
    /// Action type (command, app, url, key_press, macro, paste_text, multi_action, app_volume)
    pub action_type: String,

    /// Action value
    pub value: String,
}

#[derive(Parser, Debug)]
pub struct RenderArgs {
    /// Directory the key images are written to
    #[arg(long, short = 'o', value_name = "DIR")]
    pub out: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum IconCommand {
    /// Upload an image as a key's custom icon
    Set(IconSetArgs),

    /// Remove a key's custom icon
    Clear(IconClearArgs),
}

#[derive(Parser, Debug)]
pub struct IconSetArgs {
    /// Key index (0-11)
    pub key: i64,

    /// Image file (png, jpg, webp)
    pub image: PathBuf,

    /// Profile (default: the active one)
    #[arg(long, short = 'p')]
    pub profile: Option<String>,
}

#[derive(Parser, Debug)]
pub struct IconClearArgs {
    /// Key index (0-11)
    pub key: i64,

    /// Profile (default: the active one)
    #[arg(long, short = 'p')]
    pub profile: Option<String>,
}

#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
