//! Integration tests for icon resolution, caching and custom icon uploads.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use loopdeck::config::{ActionType, Configuration, ProfileId, StorePaths};
use loopdeck::error::LdError;
use loopdeck::render::{IconResolver, IconSource, favicon_sources};

use crate::common::fixtures::{TestEnv, png_bytes, shortcut};
use crate::common::mocks::{CountingFetcher, RecordingAutomation};

fn resolver(fetcher: &Arc<CountingFetcher>, automation: &Arc<RecordingAutomation>) -> IconResolver {
    let dir = std::env::temp_dir().join("loopdeck-icon-cache-tests");
    IconResolver::new(StorePaths::new(dir), fetcher.clone(), automation.clone())
}

fn data_url(bytes: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(bytes))
}

// === Negative memoization ===

#[tokio::test]
async fn test_failed_favicon_is_not_fetched_twice() {
    let fetcher = Arc::new(CountingFetcher::offline());
    let automation = Arc::new(RecordingAutomation::unsupported());
    let icons = resolver(&fetcher, &automation);

    assert!(icons.favicon("https://nowhere.test/a", 90).await.is_none());
    let after_first = fetcher.requests();
    assert_eq!(after_first, favicon_sources("nowhere.test").len());

    // Same domain, same size: answered from the cache.
    assert!(icons.favicon("https://NOWHERE.test/other", 90).await.is_none());
    assert_eq!(fetcher.requests(), after_first);

    // A different size is a different entry.
    assert!(icons.favicon("https://nowhere.test", 72).await.is_none());
    assert_eq!(fetcher.requests(), after_first * 2);
}

#[tokio::test]
async fn test_favicon_chain_falls_through_to_later_source() {
    let sources = favicon_sources("late.test");
    let fetcher = Arc::new(
        CountingFetcher::offline().serving(&sources[2], png_bytes(32, 32, [0, 255, 0, 255])),
    );
    let automation = Arc::new(RecordingAutomation::unsupported());
    let icons = resolver(&fetcher, &automation);

    let icon = icons.favicon("https://late.test", 90).await.unwrap();
    assert_eq!(icon.dimensions(), (52, 52));
    assert_eq!(fetcher.urls(), sources[..3].to_vec());

    icons.favicon("https://late.test", 90).await.unwrap();
    assert_eq!(fetcher.requests(), 3);
}

#[tokio::test]
async fn test_failed_app_icon_extraction_is_memoized() {
    let fetcher = Arc::new(CountingFetcher::offline());
    let automation = Arc::new(RecordingAutomation::supported());
    automation.reply(Err(LdError::Automation("no icon".into())));
    let icons = resolver(&fetcher, &automation);

    let item = shortcut(0, ActionType::App, r"C:\Tools\tool.exe --quiet", "#000000");
    assert!(icons.resolve(&item, 90).await.is_none());
    assert_eq!(automation.call_count(), 1);

    assert!(icons.resolve(&item, 90).await.is_none());
    assert_eq!(automation.call_count(), 1);
}

#[tokio::test]
async fn test_app_icon_is_upscaled_and_cached() {
    let fetcher = Arc::new(CountingFetcher::offline());
    let automation = Arc::new(RecordingAutomation::supported());
    automation.reply(Ok(STANDARD.encode(png_bytes(32, 32, [9, 9, 9, 255]))));
    let icons = resolver(&fetcher, &automation);

    let icon = icons.app_icon(r"C:\Tools\tool.exe", 90).await.unwrap();
    assert_eq!(icon.dimensions(), (54, 54));
    assert_eq!(icons.cache().len(), 1);
}

#[tokio::test]
async fn test_app_icons_skipped_when_unsupported() {
    let fetcher = Arc::new(CountingFetcher::offline());
    let automation = Arc::new(RecordingAutomation::unsupported());
    let icons = resolver(&fetcher, &automation);

    assert!(icons.app_icon("notepad.exe", 90).await.is_none());
    assert!(icons.cache().is_empty());
}

#[tokio::test]
async fn test_bad_custom_path_is_ignored() {
    let fetcher = Arc::new(CountingFetcher::offline());
    let automation = Arc::new(RecordingAutomation::unsupported());
    let icons = resolver(&fetcher, &automation);

    assert!(icons.custom_icon("../secrets.png", 90).await.is_none());
    assert!(icons.custom_icon("icons/readme.txt", 90).await.is_none());
    assert!(icons.cache().is_empty());

    assert!(icons.custom_icon("icons/missing.png", 90).await.is_none());
    assert_eq!(
        icons.cache().get(IconSource::Custom, "icons/missing.png", 90),
        Some(None)
    );
}

// === Custom icon upload ===

#[tokio::test]
async fn test_upload_stores_scaled_png_and_replaces_previous() {
    let env = TestEnv::new();
    env.store(&Configuration::default()).await;

    let first = env
        .app
        .save_custom_icon(None, 5, &data_url(&png_bytes(256, 64, [1, 2, 3, 255])))
        .await
        .unwrap();
    assert!(first.starts_with("icons/key-home-5-"), "{first}");
    assert!(first.ends_with(".png"));

    let stored = env.dir.path().join(&first);
    let img = image::open(&stored).unwrap();
    assert_eq!((img.width(), img.height()), (128, 32));
    let config = env.app.current_config().await;
    assert_eq!(config.shortcut(ProfileId::Home, 5).unwrap().icon_path, first);

    // Make sure the second upload gets a different millisecond stamp.
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = env
        .app
        .save_custom_icon(None, 5, &data_url(&png_bytes(8, 8, [4, 5, 6, 255])))
        .await
        .unwrap();
    assert_ne!(first, second);
    assert!(!stored.exists(), "previous icon removed");
    assert!(env.dir.path().join(&second).exists());
}

#[tokio::test]
async fn test_upload_to_named_profile_and_clear() {
    let env = TestEnv::new();
    env.store(&Configuration::default()).await;

    let path = env
        .app
        .save_custom_icon(Some(ProfileId::P6), 0, &data_url(&png_bytes(16, 16, [0, 0, 0, 255])))
        .await
        .unwrap();
    assert!(path.starts_with("icons/key-6-0-"));

    env.app.clear_custom_icon(Some(ProfileId::P6), 0).await.unwrap();
    let config = env.app.current_config().await;
    assert!(config.shortcut(ProfileId::P6, 0).unwrap().icon_path.is_empty());
    assert!(!env.dir.path().join(&path).exists());
}

#[tokio::test]
async fn test_upload_rejections() {
    let env = TestEnv::new();
    env.store(&Configuration::default()).await;
    let good = data_url(&png_bytes(4, 4, [0, 0, 0, 255]));

    assert!(matches!(
        env.app.save_custom_icon(None, 12, &good).await,
        Err(LdError::InvalidKeyIndex { .. })
    ));
    assert!(matches!(
        env.app
            .save_custom_icon(None, 0, "data:image/gif;base64,R0lGODlh")
            .await,
        Err(LdError::InvalidIcon(_))
    ));
    assert!(matches!(
        env.app.save_custom_icon(None, 0, "not a data url").await,
        Err(LdError::InvalidIcon(_))
    ));
    assert_eq!(env.app.current_config().await, Configuration::default());
}

#[tokio::test]
async fn test_upload_renders_new_icon() {
    let env = TestEnv::new();
    env.store(&Configuration::default()).await;
    let mock = env.attach_mock();

    // A placeholder key has no action, so its icon only shows once bound.
    let mut config = env.app.current_config().await;
    *config.shortcut_mut(ProfileId::Home, 3).unwrap() =
        shortcut(3, ActionType::Command, "calc.exe", "#000000");
    env.app.write_config(&config).await.unwrap();

    env.app
        .save_custom_icon(None, 3, &data_url(&png_bytes(64, 64, [255, 255, 255, 255])))
        .await
        .unwrap();
    let draws = mock.draws_for(3);
    assert_eq!(draws.len(), 2);
    assert_eq!(draws[1].pixel(45, 45), 0xffff);
}
