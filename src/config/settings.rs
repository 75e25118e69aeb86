//! Runtime settings loaded from an optional `settings.toml`.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use super::path::StorePaths;
use crate::error::{LdError, Result};

/// Name of the optional settings file inside the config directory.
pub const SETTINGS_FILE: &str = "settings.toml";

/// Tunables that are not part of the shortcut document.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Panel brightness applied before each render (0.0 - 1.0).
    pub brightness: f32,
    /// Per-source timeout for remote favicon lookups.
    pub favicon_timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            brightness: 1.0,
            favicon_timeout_ms: 2500,
        }
    }
}

impl Settings {
    /// Load `settings.toml` from the config directory, or defaults if absent.
    pub fn load(paths: &StorePaths) -> Result<Self> {
        Self::load_file(&paths.config_dir().join(SETTINGS_FILE))
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No settings file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        let settings = Self::parse(&text)?;
        info!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut settings: Self = toml::from_str(text)
            .map_err(|e| LdError::Settings(e.message().to_string()))?;
        if !(0.0..=1.0).contains(&settings.brightness) {
            return Err(LdError::Settings(format!(
                "brightness must be between 0 and 1, got {}",
                settings.brightness
            )));
        }
        settings.favicon_timeout_ms = settings.favicon_timeout_ms.max(1);
        Ok(settings)
    }

    pub const fn favicon_timeout(&self) -> Duration {
        Duration::from_millis(self.favicon_timeout_ms)
    }
}
