//! Gateway that writes key images to PNG files instead of a device.
//!
//! Used by `loopdeck render --out <dir>` to inspect what a profile looks like
//! without hardware attached.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use super::{DeviceGateway, DeviceInfo};
use crate::error::{LdError, Result};
use crate::render::KeyBuffer;

/// Non-image state captured by a preview render.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PreviewState {
    pub brightness: Option<f32>,
    pub buttons: Vec<(u8, String)>,
}

/// Writes `key-NN.png` and `screen-<id>.png` into a directory.
pub struct PreviewGateway {
    info: DeviceInfo,
    dir: PathBuf,
    state: Mutex<PreviewState>,
}

impl PreviewGateway {
    /// Preview into `dir`, which must exist.
    pub fn new(info: DeviceInfo, dir: impl Into<PathBuf>) -> Self {
        Self {
            info,
            dir: dir.into(),
            state: Mutex::new(PreviewState::default()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn key_file(&self, key: u8) -> PathBuf {
        self.dir.join(format!("key-{key:02}.png"))
    }

    /// Brightness and LED calls seen so far.
    pub fn state(&self) -> PreviewState {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    async fn save(&self, path: PathBuf, buffer: &KeyBuffer) -> Result<()> {
        let image = buffer.to_rgb_image();
        let target = path.clone();
        tokio::task::spawn_blocking(move || image.save(&target))
            .await
            .map_err(|e| LdError::Other(e.to_string()))?
            .map_err(|e| LdError::ImageProcessing(format!("{}: {e}", path.display())))?;
        debug!(path = %path.display(), "Preview image written");
        Ok(())
    }
}

#[async_trait]
impl DeviceGateway for PreviewGateway {
    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    async fn draw_key(&self, key: u8, buffer: &KeyBuffer) -> Result<()> {
        if key >= self.info.key_count {
            return Err(LdError::InvalidKeyIndex {
                index: i64::from(key),
                max: self.info.key_count,
                max_idx: self.info.key_count.saturating_sub(1),
            });
        }
        self.save(self.key_file(key), buffer).await
    }

    async fn draw_screen(&self, id: &str, buffer: &KeyBuffer) -> Result<()> {
        self.save(self.dir.join(format!("screen-{id}.png")), buffer)
            .await
    }

    async fn set_brightness(&self, level: f32) -> Result<()> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .brightness = Some(level);
        Ok(())
    }

    async fn set_button_color(&self, id: u8, color: &str) -> Result<()> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .buttons
            .push((id, color.to_string()));
        Ok(())
    }
}
