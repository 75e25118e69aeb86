//! Test fixtures: temporary config directories and a fully mocked app.
#![allow(dead_code)]

use std::sync::Arc;

use image::{Rgba, RgbaImage};
use tempfile::TempDir;

use loopdeck::app::{App, Collaborators};
use loopdeck::config::{ActionType, Configuration, ProfileId, Settings, Shortcut, StorePaths};
use loopdeck::device::mock::MockGateway;
use loopdeck::image_ops::encode_png;

use super::mocks::{CountingFetcher, RecordingAutomation, RecordingLauncher, RecordingVolume};

/// Encoded PNG filled with one RGBA color.
pub fn png_bytes(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    encode_png(&RgbaImage::from_pixel(width, height, Rgba(rgba))).expect("encode png")
}

/// A shortcut with an action on `key`.
pub fn shortcut(key: u8, action_type: ActionType, value: &str, color: &str) -> Shortcut {
    Shortcut {
        key,
        label: format!("Key {key}"),
        color: color.to_string(),
        action_type,
        value: value.to_string(),
        icon_path: String::new(),
    }
}

/// Default configuration with `items` placed into `profile`.
pub fn config_with(profile: ProfileId, items: Vec<Shortcut>) -> Configuration {
    let mut config = Configuration::default();
    for item in items {
        let slot = config
            .shortcut_mut(profile, item.key)
            .expect("key in range");
        *slot = item;
    }
    config
}

/// Temporary config directory plus an [`App`] wired to recording mocks.
pub struct TestEnv {
    pub dir: TempDir,
    pub paths: StorePaths,
    pub automation: Arc<RecordingAutomation>,
    pub launcher: Arc<RecordingLauncher>,
    pub fetcher: Arc<CountingFetcher>,
    pub volume: Arc<RecordingVolume>,
    pub app: Arc<App>,
}

impl TestEnv {
    /// Offline fetcher, unsupported automation.
    pub fn new() -> Self {
        Self::build(CountingFetcher::offline(), RecordingAutomation::unsupported())
    }

    pub fn with_fetcher(fetcher: CountingFetcher) -> Self {
        Self::build(fetcher, RecordingAutomation::unsupported())
    }

    pub fn with_automation(automation: RecordingAutomation) -> Self {
        Self::build(CountingFetcher::offline(), automation)
    }

    pub fn build(fetcher: CountingFetcher, automation: RecordingAutomation) -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let paths = StorePaths::new(dir.path());
        let automation = Arc::new(automation);
        let launcher = Arc::new(RecordingLauncher::new());
        let fetcher = Arc::new(fetcher);
        let volume = Arc::new(RecordingVolume::new());
        let app = Arc::new(App::new(
            paths.clone(),
            Settings::default(),
            Collaborators {
                automation: automation.clone(),
                launcher: launcher.clone(),
                fetcher: fetcher.clone(),
                volume: volume.clone(),
            },
        ));
        Self {
            dir,
            paths,
            automation,
            launcher,
            fetcher,
            volume,
            app,
        }
    }

    /// Attach a fresh mock device and return it.
    pub fn attach_mock(&self) -> Arc<MockGateway> {
        let gateway = Arc::new(MockGateway::live());
        self.app.attach_device(gateway.clone());
        gateway
    }

    /// Write `config` through the app.
    pub async fn store(&self, config: &Configuration) {
        self.app.ensure_config().await.expect("ensure config");
        self.app.write_config(config).await.expect("write config");
    }
}
