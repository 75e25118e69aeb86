//! Application context: every long-lived component plus the connected device.
//!
//! One [`App`] is built at startup and shared (behind an `Arc`) by the event
//! service and whatever outer surface drives it. All caches and maps live
//! here rather than in module statics, so tests build their own context
//! with recording collaborators.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::actions::{
    ActionOutcome, Debouncer, Dispatcher, Launcher, SessionVolume, SystemLauncher,
    VolumeCoalescer, VolumeControl, mixer_assignments,
};
use crate::automation::{AppCatalog, AppEntry, OsAutomation, SystemAutomation};
use crate::config::{
    ActionType, ConfigStore, Configuration, KEY_COUNT, ProfileId, ReadOutcome, Settings,
    StorePaths, validate_strict,
};
use crate::device::{DeviceGateway, Knob};
use crate::error::{LdError, Result};
use crate::image_ops::{decode_data_url, encode_png, prepare_upload};
use crate::render::{HttpFetcher, IconFetcher, IconResolver, IconSource, RenderPipeline, RenderReport};
use crate::status::StatusLine;

/// External capabilities the core depends on.
pub struct Collaborators {
    pub automation: Arc<dyn OsAutomation>,
    pub launcher: Arc<dyn Launcher>,
    pub fetcher: Arc<dyn IconFetcher>,
    pub volume: Arc<dyn VolumeControl>,
}

/// Result of a profile switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProfileSwitch {
    pub profile: ProfileId,
    pub changed: bool,
}

/// What the service is doing right now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub connected: bool,
    pub last_event: String,
    pub warnings: Vec<String>,
    pub active_profile: ProfileId,
}

/// Shared application context.
pub struct App {
    store: ConfigStore,
    settings: Settings,
    pipeline: RenderPipeline,
    dispatcher: Dispatcher,
    debouncer: Debouncer,
    coalescer: VolumeCoalescer,
    catalog: AppCatalog,
    automation: Arc<dyn OsAutomation>,
    status: Arc<StatusLine>,
    device: RwLock<Option<Arc<dyn DeviceGateway>>>,
}

impl App {
    /// Context wired to the real OS, network and process launcher.
    pub fn system(paths: StorePaths, settings: Settings) -> Result<Self> {
        let status = Arc::new(StatusLine::new());
        let automation: Arc<dyn OsAutomation> = Arc::new(SystemAutomation);
        let parts = Collaborators {
            automation: Arc::clone(&automation),
            launcher: Arc::new(SystemLauncher::new(Arc::clone(&status))),
            fetcher: Arc::new(HttpFetcher::new(settings.favicon_timeout())?),
            volume: Arc::new(SessionVolume::new(automation)),
        };
        Ok(Self::with_status(paths, settings, parts, status))
    }

    pub fn new(paths: StorePaths, settings: Settings, parts: Collaborators) -> Self {
        Self::with_status(paths, settings, parts, Arc::new(StatusLine::new()))
    }

    fn with_status(
        paths: StorePaths,
        settings: Settings,
        parts: Collaborators,
        status: Arc<StatusLine>,
    ) -> Self {
        let icons = IconResolver::new(
            paths.clone(),
            parts.fetcher,
            Arc::clone(&parts.automation),
        );
        Self {
            store: ConfigStore::new(paths),
            pipeline: RenderPipeline::new(icons, settings.brightness),
            dispatcher: Dispatcher::new(Arc::clone(&parts.automation), parts.launcher),
            debouncer: Debouncer::default(),
            coalescer: VolumeCoalescer::new(parts.volume, Arc::clone(&status)),
            catalog: AppCatalog::new(),
            automation: parts.automation,
            settings,
            status,
            device: RwLock::new(None),
        }
    }

    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    pub const fn paths(&self) -> &StorePaths {
        self.store.paths()
    }

    pub const fn pipeline(&self) -> &RenderPipeline {
        &self.pipeline
    }

    pub fn status_line(&self) -> &StatusLine {
        &self.status
    }

    pub const fn coalescer(&self) -> &VolumeCoalescer {
        &self.coalescer
    }

    // === Configuration ===

    pub async fn ensure_config(&self) -> Result<()> {
        self.store.ensure().await
    }

    /// Full read with repair. Repairs are kept as warnings.
    pub async fn read_config(&self) -> ReadOutcome {
        let outcome = self.store.read().await;
        if !outcome.issues.is_empty() {
            warn!(count = outcome.issues.len(), "Configuration repaired on load");
            self.status.set_warnings(outcome.issues.clone());
        }
        outcome
    }

    pub async fn write_config(&self, config: &Configuration) -> Result<()> {
        self.store.write(config).await
    }

    pub async fn current_config(&self) -> Configuration {
        self.store.current().await
    }

    /// Check a submitted document, reporting every violation.
    pub fn validate_strict(&self, payload: &Value) -> std::result::Result<Configuration, Vec<String>> {
        validate_strict(payload)
    }

    /// Validate, persist and render a submitted document.
    pub async fn submit_config(&self, payload: &Value) -> Result<Configuration> {
        let config = validate_strict(payload).map_err(LdError::Validation)?;
        self.write_config(&config).await?;
        self.status.set_warnings(Vec::new());
        self.render_profile(&config).await;
        self.status.set("Configuration saved");
        Ok(config)
    }

    // === Device ===

    /// The connected device, if any.
    pub fn device(&self) -> Option<Arc<dyn DeviceGateway>> {
        self.device
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_connected(&self) -> bool {
        self.device().is_some()
    }

    pub fn attach_device(&self, gateway: Arc<dyn DeviceGateway>) {
        self.status.set(format!("Connected: {}", gateway.info().kind));
        *self.device.write().unwrap_or_else(PoisonError::into_inner) = Some(gateway);
    }

    /// Forget the device and drop pending knob work.
    pub fn on_disconnect(&self, reason: Option<&str>) {
        self.device
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.coalescer.cancel_all();
        match reason {
            Some(reason) => self.status.set(format!("Disconnected: {reason}")),
            None => self.status.set("Disconnected"),
        }
    }

    /// Render the active profile, if a device is connected.
    pub async fn render_profile(&self, config: &Configuration) -> Option<RenderReport> {
        let Some(device) = self.device() else {
            debug!("No device connected, render skipped");
            return None;
        };
        let report = self.pipeline.render_profile(device.as_ref(), config).await;
        for (key, reason) in &report.failures {
            self.status.set(format!("Key {key} render skipped: {reason}"));
        }
        Some(report)
    }

    // === Profiles and actions ===

    /// Make `profile` active, persist and re-render.
    #[instrument(skip(self))]
    pub async fn switch_profile(&self, profile: ProfileId) -> Result<ProfileSwitch> {
        let mut config = self.current_config().await;
        if config.active_profile == profile {
            return Ok(ProfileSwitch {
                profile,
                changed: false,
            });
        }
        config.active_profile = profile;
        self.write_config(&config).await?;
        self.render_profile(&config).await;
        self.status.set(format!("Active profile: {}", profile.label()));
        Ok(ProfileSwitch {
            profile,
            changed: true,
        })
    }

    /// Run the shortcut bound to `key` in the active profile.
    #[instrument(skip(self))]
    pub async fn execute_shortcut(&self, key: u8) -> ActionOutcome {
        let config = self.current_config().await;
        let profile = config.active_profile;
        let Some(item) = config.shortcut(profile, key) else {
            self.status.set(format!("Key {key}: shortcut not found"));
            return ActionOutcome::failed("Shortcut not found");
        };
        if !self.debouncer.accept(key) {
            self.status.set(format!("Key {key}: ignored (debounced)"));
            return ActionOutcome::failed("Debounced");
        }
        if !item.has_action() {
            self.status.set(format!("Key {key}: no action configured"));
            return ActionOutcome::failed("No action value");
        }

        let outcome = self.dispatcher.execute(item.action_type, &item.value).await;
        self.status
            .set(format!("[{}] Key {key}: {}", profile.label(), outcome.text()));
        outcome
    }

    /// Run an action that is not bound to a key.
    pub async fn execute_action(&self, action_type: ActionType, value: &str) -> ActionOutcome {
        let outcome = self.dispatcher.execute(action_type, value).await;
        self.status.set(format!("Action {action_type}: {}", outcome.text()));
        outcome
    }

    /// Run `key`, first switching to `profile` when given and not active.
    pub async fn trigger(&self, key: i64, profile: Option<ProfileId>) -> Result<ActionOutcome> {
        let key = checked_key(key)?;
        if let Some(profile) = profile {
            self.switch_profile(profile).await?;
        }
        Ok(self.execute_shortcut(key).await)
    }

    /// Feed a knob rotation to the mixer, if the knob is bound.
    pub async fn handle_rotate(&self, knob: Knob, delta: i32) {
        if delta == 0 {
            return;
        }
        let config = self.current_config().await;
        match mixer_assignments(&config).remove(&knob) {
            Some(assignment) => self.coalescer.queue(knob, assignment, delta),
            None => debug!(%knob, "Knob not bound"),
        }
    }

    /// Profile buttons switch profiles; other buttons are ignored.
    pub async fn handle_button(&self, id: u8) {
        let Some(profile) = ProfileId::from_button(id) else {
            debug!(id, "Button has no binding");
            return;
        };
        if let Err(e) = self.switch_profile(profile).await {
            self.status.set(format!("Profile switch failed: {e}"));
        }
    }

    // === Custom icons ===

    /// Store an uploaded icon for a key and reference it from the shortcut.
    ///
    /// Returns the stored relative path.
    #[instrument(skip(self, data_url))]
    pub async fn save_custom_icon(
        &self,
        profile: Option<ProfileId>,
        key: i64,
        data_url: &str,
    ) -> Result<String> {
        let key = checked_key(key)?;
        let image = prepare_upload(&decode_data_url(data_url)?);
        let bytes = encode_png(&image)?;

        let mut config = self.current_config().await;
        let profile = profile.unwrap_or(config.active_profile);
        let file_name = format!(
            "key-{}-{key}-{}.png",
            profile.as_str(),
            Utc::now().timestamp_millis()
        );
        let paths = self.paths();
        tokio::fs::create_dir_all(paths.icons_dir()).await?;
        tokio::fs::write(paths.icons_dir().join(&file_name), bytes).await?;
        let reference = StorePaths::icon_reference(&file_name);

        let shortcut = config
            .shortcut_mut(profile, key)
            .ok_or_else(|| LdError::ShortcutNotFound {
                profile: profile.to_string(),
                key,
            })?;
        let previous = std::mem::replace(&mut shortcut.icon_path, reference.clone());
        self.write_config(&config).await?;
        self.remove_icon_file(&previous).await;
        self.pipeline.icons().cache().clear_source(IconSource::Custom);
        self.render_profile(&config).await;

        info!(%profile, key, path = %reference, "Custom icon stored");
        self.status.set(format!("Key {key}: custom icon updated"));
        Ok(reference)
    }

    /// Remove a key's custom icon.
    #[instrument(skip(self))]
    pub async fn clear_custom_icon(&self, profile: Option<ProfileId>, key: i64) -> Result<()> {
        let key = checked_key(key)?;
        let mut config = self.current_config().await;
        let profile = profile.unwrap_or(config.active_profile);
        let shortcut = config
            .shortcut_mut(profile, key)
            .ok_or_else(|| LdError::ShortcutNotFound {
                profile: profile.to_string(),
                key,
            })?;
        let previous = std::mem::take(&mut shortcut.icon_path);
        self.write_config(&config).await?;
        self.remove_icon_file(&previous).await;
        self.pipeline.icons().cache().clear_source(IconSource::Custom);
        self.render_profile(&config).await;
        self.status.set(format!("Key {key}: custom icon removed"));
        Ok(())
    }

    async fn remove_icon_file(&self, icon_path: &str) {
        if let Some(path) = self.paths().resolve_icon(icon_path) {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                debug!(path = %path.display(), error = %e, "Old icon not removed");
            }
        }
    }

    // === Misc ===

    /// Installed applications; empty when discovery is unavailable or fails.
    pub async fn list_apps(&self) -> Vec<AppEntry> {
        match self.catalog.list(self.automation.as_ref()).await {
            Ok(apps) => apps,
            Err(e) => {
                self.status.set(format!("App scan failed: {e}"));
                Vec::new()
            }
        }
    }

    pub async fn status(&self) -> StatusReport {
        let config = self.current_config().await;
        let snapshot = self.status.snapshot();
        StatusReport {
            connected: self.is_connected(),
            last_event: snapshot.last_event,
            warnings: snapshot.warnings,
            active_profile: config.active_profile,
        }
    }
}

fn checked_key(key: i64) -> Result<u8> {
    u8::try_from(key)
        .ok()
        .filter(|k| *k < KEY_COUNT)
        .ok_or(LdError::InvalidKeyIndex {
            index: key,
            max: KEY_COUNT,
            max_idx: KEY_COUNT - 1,
        })
}
