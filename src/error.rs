//! Error types for Loopdeck operations.

use thiserror::Error;

/// Primary error type for Loopdeck operations.
#[derive(Error, Debug)]
pub enum LdError {
    // Device errors
    #[error("No control surface connected")]
    NotConnected,

    #[error("Device communication error: {0}")]
    DeviceCommunication(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    // Key / profile errors
    #[error("Invalid key index {index}: device has {max} keys (0-{max_idx})")]
    InvalidKeyIndex { index: i64, max: u8, max_idx: u8 },

    #[error("Unknown profile '{0}': expected home or 1-7")]
    UnknownProfile(String),

    #[error("Shortcut not found: profile {profile}, key {key}")]
    ShortcutNotFound { profile: String, key: u8 },

    // Image errors
    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    #[error("Invalid icon upload: {0}")]
    InvalidIcon(String),

    // Configuration errors
    #[error("Configuration parse error: {0}")]
    ConfigParse(String),

    #[error("Configuration rejected ({} violation(s))", .0.len())]
    Validation(Vec<String>),

    #[error("Settings error: {0}")]
    Settings(String),

    // OS automation errors
    #[error("{0} is only supported on Windows")]
    Unsupported(&'static str),

    #[error("External command failed: {0}")]
    Automation(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl LdError {
    /// Returns true if the error is recoverable by the user.
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotConnected
                | Self::InvalidKeyIndex { .. }
                | Self::UnknownProfile(_)
                | Self::InvalidIcon(_)
                | Self::Validation(_)
                | Self::Settings(_)
        )
    }

    /// Returns a suggestion for how to fix the error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::NotConnected => Some("Close the vendor software and reconnect the device"),
            Self::UnknownProfile(_) => Some("Use one of: home, 1, 2, 3, 4, 5, 6, 7"),
            Self::InvalidIcon(_) => Some("Upload a png, jpg or webp image"),
            Self::Validation(_) => Some("Fix every listed violation and submit again"),
            Self::Settings(_) => Some("Check settings.toml in the config directory"),
            _ => None,
        }
    }

    /// Returns true for failures that a later connection attempt may resolve.
    pub const fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::NotConnected | Self::DeviceCommunication(_) | Self::Timeout(_)
        )
    }
}

/// Convenience type alias for Results using LdError.
pub type Result<T> = std::result::Result<T, LdError>;
