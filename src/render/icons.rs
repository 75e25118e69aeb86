//! Icon acquisition for keys: custom uploads, favicons and app icons.

use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::RgbaImage;
use image::imageops::FilterType;
use tracing::{debug, trace};

use super::cache::{IconCache, IconSource};
use super::favicon::{IconFetcher, favicon_sources, is_http_url, url_domain};
use crate::automation::{OsAutomation, resolve_target, run_script, scripts};
use crate::config::{ActionType, Shortcut, StorePaths, sanitize_icon_path};
use crate::error::LdError;
use crate::image_ops::{decode_rgba, fit_app_icon, open_rgba, scale_to_fit};

const ICON_EXTRACT_TIMEOUT: Duration = Duration::from_millis(4500);

/// Box a custom icon is fit into.
pub fn custom_icon_size(key_size: u32) -> u32 {
    24.max(key_size * 62 / 100)
}

/// Box a favicon is fit into.
pub fn favicon_size(key_size: u32) -> u32 {
    20.max(key_size * 58 / 100)
}

/// Box an application icon is fit into.
pub fn app_icon_size(key_size: u32) -> u32 {
    24.max(key_size * 61 / 100)
}

/// Resolves and memoizes the icon drawn over a key.
pub struct IconResolver {
    paths: StorePaths,
    cache: IconCache,
    fetcher: Arc<dyn IconFetcher>,
    automation: Arc<dyn OsAutomation>,
}

impl IconResolver {
    pub fn new(
        paths: StorePaths,
        fetcher: Arc<dyn IconFetcher>,
        automation: Arc<dyn OsAutomation>,
    ) -> Self {
        Self {
            paths,
            cache: IconCache::new(),
            fetcher,
            automation,
        }
    }

    pub const fn cache(&self) -> &IconCache {
        &self.cache
    }

    /// Icon for a shortcut, by priority: custom upload, then favicon for
    /// `url` actions, then the launched executable's icon.
    pub async fn resolve(&self, shortcut: &Shortcut, key_size: u32) -> Option<RgbaImage> {
        if !shortcut.icon_path.is_empty() {
            return self.custom_icon(&shortcut.icon_path, key_size).await;
        }
        match shortcut.action_type {
            ActionType::Url if is_http_url(&shortcut.value) => {
                self.favicon(&shortcut.value, key_size).await
            }
            t if t.launches_executable() => self.app_icon(&shortcut.value, key_size).await,
            _ => None,
        }
    }

    /// Custom icon loaded from the icons directory.
    pub async fn custom_icon(&self, icon_path: &str, key_size: u32) -> Option<RgbaImage> {
        let clean = sanitize_icon_path(icon_path);
        if clean.is_empty() {
            return None;
        }
        if let Some(hit) = self.cache.get(IconSource::Custom, &clean, key_size) {
            return hit;
        }

        let icon = match self.paths.resolve_icon(&clean) {
            Some(path) => {
                let target = custom_icon_size(key_size);
                tokio::task::spawn_blocking(move || {
                    open_rgba(&path).map(|img| scale_to_fit(&img, target, FilterType::Triangle))
                })
                .await
                .ok()
                .and_then(|r| {
                    r.map_err(|e| debug!(icon = %clean, error = %e, "Custom icon unreadable"))
                        .ok()
                })
            }
            None => None,
        };
        self.cache
            .insert(IconSource::Custom, &clean, key_size, icon.clone());
        icon
    }

    /// Favicon for a URL's domain via the source chain; first success wins.
    pub async fn favicon(&self, url: &str, key_size: u32) -> Option<RgbaImage> {
        let domain = url_domain(url)?;
        if let Some(hit) = self.cache.get(IconSource::Favicon, &domain, key_size) {
            return hit;
        }

        let target = favicon_size(key_size);
        let mut icon = None;
        for source in favicon_sources(&domain) {
            match self.fetcher.fetch(&source).await.and_then(|b| decode_rgba(&b)) {
                Ok(img) => {
                    trace!(%source, "Favicon resolved");
                    icon = Some(scale_to_fit(&img, target, FilterType::Triangle));
                    break;
                }
                Err(e) => debug!(%source, error = %e, "Favicon source failed"),
            }
        }
        self.cache
            .insert(IconSource::Favicon, &domain, key_size, icon.clone());
        icon
    }

    /// Icon of the executable a command line launches.
    ///
    /// Skipped entirely where the automation surface is unavailable.
    pub async fn app_icon(&self, command_line: &str, key_size: u32) -> Option<RgbaImage> {
        if !self.automation.supported() {
            return None;
        }
        let exe = resolve_target(self.automation.as_ref(), command_line).await?;
        let identity = exe.to_lowercase();
        if let Some(hit) = self.cache.get(IconSource::App, &identity, key_size) {
            return hit;
        }

        let script = scripts::extract_icon(&exe);
        let icon = run_script(self.automation.as_ref(), &script, &[], ICON_EXTRACT_TIMEOUT)
            .await
            .and_then(|out| {
                let bytes = STANDARD
                    .decode(out.trim())
                    .map_err(|e| LdError::ImageProcessing(e.to_string()))?;
                decode_rgba(&bytes)
            })
            .map(|img| fit_app_icon(&img, app_icon_size(key_size)))
            .map_err(|e| debug!(exe = %exe, error = %e, "App icon extraction failed"))
            .ok();
        self.cache
            .insert(IconSource::App, &identity, key_size, icon.clone());
        icon
    }
}
