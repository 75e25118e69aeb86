//! Storage layout and custom icon path confinement.
//!
//! Custom icons are referenced from the configuration by a path relative to
//! the config directory. A stored reference must live under `icons/`, must
//! not contain `..`, and must carry an image extension. Anything else is
//! treated as "no custom icon".

use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::error::{LdError, Result};

/// Relative prefix every stored icon path starts with.
pub const ICONS_PREFIX: &str = "icons/";

/// Name of the configuration document inside the config directory.
pub const CONFIG_FILE: &str = "shortcuts.json";

const ICON_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

/// Canonicalise a stored icon reference, or return an empty string if it is
/// not acceptable.
pub fn sanitize_icon_path(value: &str) -> String {
    let text = value.trim().replace('\\', "/");
    if text.is_empty() {
        return String::new();
    }
    if !text.starts_with(ICONS_PREFIX) || text.contains("..") {
        trace!(path = %text, "Icon path outside icons directory");
        return String::new();
    }
    let ext = Path::new(&text)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some(e) if ICON_EXTENSIONS.contains(&e) => text,
        _ => {
            trace!(path = %text, "Icon path has unsupported extension");
            String::new()
        }
    }
}

/// Where configuration state lives on disk.
#[derive(Debug, Clone)]
pub struct StorePaths {
    config_dir: PathBuf,
}

impl StorePaths {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    /// Default location: `<platform config dir>/loopdeck`.
    pub fn platform_default() -> Result<Self> {
        let base = dirs::config_dir().ok_or_else(|| {
            LdError::Settings("Could not determine the platform config directory".to_string())
        })?;
        Ok(Self::new(base.join("loopdeck")))
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    pub fn icons_dir(&self) -> PathBuf {
        self.config_dir.join(ICONS_PREFIX.trim_end_matches('/'))
    }

    /// Absolute location of a stored icon reference, or `None` if the
    /// reference does not resolve inside the icons directory.
    pub fn resolve_icon(&self, icon_path: &str) -> Option<PathBuf> {
        let clean = sanitize_icon_path(icon_path);
        if clean.is_empty() {
            return None;
        }
        let absolute = self.config_dir.join(&clean);
        if !absolute.starts_with(self.icons_dir()) {
            debug!(path = %absolute.display(), "Resolved icon escapes icons directory");
            return None;
        }
        Some(absolute)
    }

    /// Relative reference to store for a freshly written icon file.
    pub fn icon_reference(file_name: &str) -> String {
        format!("{ICONS_PREFIX}{file_name}")
    }
}
