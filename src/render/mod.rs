//! Render pipeline: turns a profile into key images and indicator LEDs.
//!
//! Rendering happens in two passes. The fill pass draws every key's solid
//! background, one key at a time and in key order, so the device always
//! shows something right away. The icon pass then resolves icons for every
//! key with an action concurrently and redraws those keys with the icon
//! composited over the background. Finally the profile button LEDs are set.

mod buffer;
mod cache;
mod compose;
mod favicon;
mod icons;

pub use buffer::KeyBuffer;
pub use cache::{IconCache, IconSource};
pub use compose::composite_centered;
pub use favicon::{HttpFetcher, IconFetcher, favicon_sources, is_http_url, url_domain};
pub use icons::{IconResolver, app_icon_size, custom_icon_size, favicon_size};

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::color::{BLACK, Rgb};
use crate::config::{Configuration, ProfileId, Shortcut};
use crate::device::DeviceGateway;

/// What a render pass managed to do.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenderReport {
    /// Keys whose background was drawn.
    pub filled: Vec<u8>,
    /// Keys redrawn with an icon.
    pub iconed: Vec<u8>,
    /// Per-key draw failures, as `(key, reason)`.
    pub failures: Vec<(u8, String)>,
}

/// Produces key images for the active profile.
pub struct RenderPipeline {
    icons: IconResolver,
    brightness: f32,
}

impl RenderPipeline {
    pub fn new(icons: IconResolver, brightness: f32) -> Self {
        Self {
            icons,
            brightness: brightness.clamp(0.0, 1.0),
        }
    }

    pub const fn icons(&self) -> &IconResolver {
        &self.icons
    }

    /// Render `config`'s active profile onto `device`.
    ///
    /// Never fails: draw errors are logged per key and collected in the
    /// report, LED errors are ignored.
    #[instrument(skip_all, fields(profile = %config.active_profile))]
    pub async fn render_profile(
        &self,
        device: &dyn DeviceGateway,
        config: &Configuration,
    ) -> RenderReport {
        let key_size = device.info().key_size;
        let shortcuts = config.active_shortcuts();
        let mut report = RenderReport::default();

        if let Err(e) = device.set_brightness(self.brightness).await {
            debug!(error = %e, "Brightness not applied");
        }

        for item in shortcuts {
            let buffer = KeyBuffer::solid(key_size, Rgb::from_hex_lenient(&item.color).to_rgb565());
            match device.draw_key(item.key, &buffer).await {
                Ok(()) => report.filled.push(item.key),
                Err(e) => {
                    warn!(key = item.key, error = %e, "Background draw skipped");
                    report.failures.push((item.key, e.to_string()));
                }
            }
        }

        let pending = shortcuts
            .iter()
            .filter(|item| item.has_action())
            .map(|item| self.draw_icon(device, item, key_size));
        for (key, outcome) in join_all(pending).await {
            match outcome {
                Some(Ok(())) => report.iconed.push(key),
                Some(Err(reason)) => {
                    warn!(key, error = %reason, "Icon draw skipped");
                    report.failures.push((key, reason));
                }
                None => {}
            }
        }

        self.apply_leds(device, config).await;
        info!(
            filled = report.filled.len(),
            iconed = report.iconed.len(),
            failed = report.failures.len(),
            "Profile rendered"
        );
        report
    }

    /// Resolve and draw one key's icon. `None` when there is no icon.
    async fn draw_icon(
        &self,
        device: &dyn DeviceGateway,
        item: &Shortcut,
        key_size: u32,
    ) -> (u8, Option<Result<(), String>>) {
        let Some(icon) = self.icons.resolve(item, key_size).await else {
            return (item.key, None);
        };
        let background = Rgb::from_hex_lenient(&item.color);
        let mut buffer = KeyBuffer::solid(key_size, background.to_rgb565());
        composite_centered(&mut buffer, &icon, background);
        let outcome = device
            .draw_key(item.key, &buffer)
            .await
            .map_err(|e| e.to_string());
        (item.key, Some(outcome))
    }

    /// Light the active profile's button in its color; every other profile
    /// button goes dark.
    pub async fn apply_leds(&self, device: &dyn DeviceGateway, config: &Configuration) {
        let active = config.active_profile;
        let updates = ProfileId::ALL.into_iter().map(|profile| {
            let color = if profile == active {
                config.profile_color(profile).to_string()
            } else {
                BLACK.to_string()
            };
            async move {
                if let Err(e) = device.set_button_color(profile.button(), &color).await {
                    debug!(button = profile.button(), error = %e, "LED update ignored");
                }
            }
        });
        join_all(updates).await;
    }
}
