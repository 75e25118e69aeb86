//! Integration tests for the connection and event loop.

use std::sync::Arc;
use std::time::Duration;

use loopdeck::config::{ActionType, Configuration, ProfileId};
use loopdeck::device::mock::MockConnector;
use loopdeck::device::{DeviceEvent, Knob, ReconnectPolicy};
use loopdeck::error::LdError;
use loopdeck::service::{self, ServiceExit};

use crate::common::fixtures::{TestEnv, config_with, shortcut};
use crate::common::init_test_logging;

fn fast_policy(max_attempts: u32) -> ReconnectPolicy {
    ReconnectPolicy {
        connect_timeout: Duration::from_secs(1),
        retry_delay: Duration::from_millis(10),
        reconnect_delay: Duration::from_millis(10),
        max_attempts: Some(max_attempts),
        ..Default::default()
    }
}

async fn wait_for<F: Fn() -> bool>(what: &str, check: F) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}

#[tokio::test]
async fn test_gives_up_after_attempt_budget() {
    let env = TestEnv::new();
    env.store(&Configuration::default()).await;
    let connector = Arc::new(MockConnector::scripted(vec![]));

    let exit = tokio::time::timeout(
        Duration::from_secs(5),
        service::run(env.app.clone(), connector.clone(), fast_policy(3)),
    )
    .await
    .unwrap();

    assert_eq!(exit, ServiceExit::AttemptsExhausted);
    assert_eq!(connector.attempts(), 3);
    assert!(!env.app.is_connected());
    assert!(
        env.app
            .status_line()
            .last()
            .contains("Connect failed: No control surface connected")
    );
}

#[tokio::test]
async fn test_gateway_fault_is_reported_apart_from_missing_device() {
    let env = TestEnv::new();
    env.store(&Configuration::default()).await;
    let connector = Arc::new(MockConnector::scripted(vec![Err(LdError::Other(
        "driver missing".into(),
    ))]));

    let exit = tokio::time::timeout(
        Duration::from_secs(5),
        service::run(env.app.clone(), connector.clone(), fast_policy(1)),
    )
    .await
    .unwrap();

    assert_eq!(exit, ServiceExit::AttemptsExhausted);
    assert!(
        env.app
            .status_line()
            .last()
            .contains("Device error: driver missing")
    );
}

#[tokio::test]
async fn test_events_are_routed_until_disconnect() {
    init_test_logging();
    let env = TestEnv::new();
    let mut config = config_with(
        ProfileId::Home,
        vec![
            shortcut(0, ActionType::Command, "notepad.exe", "#010203"),
            shortcut(1, ActionType::AppVolume, "spotify.exe", "#000000"),
        ],
    );
    config.profile_colors.insert(ProfileId::P2, "#00ff00".into());
    env.store(&config).await;

    let connector = Arc::new(MockConnector::scripted(vec![
        Err(LdError::DeviceCommunication("busy".into())),
        Ok(()),
    ]));
    let run = tokio::spawn(service::run(
        env.app.clone(),
        connector.clone(),
        fast_policy(2),
    ));

    wait_for("connection", || env.app.is_connected()).await;
    let sender = connector.take_sender().unwrap();
    let gateway = connector.gateways().remove(0);
    wait_for("initial render", || !gateway.draws_for(11).is_empty()).await;

    sender
        .send(DeviceEvent::TouchStart { keys: vec![0, 42] })
        .await
        .unwrap();
    wait_for("launch", || env.launcher.launches().len() == 1).await;

    sender
        .send(DeviceEvent::Rotate {
            knob: Knob::TopLeft,
            delta: 2,
        })
        .await
        .unwrap();
    wait_for("volume change", || env.volume.adjustments().len() == 1).await;
    assert_eq!(env.volume.adjustments()[0].0, "spotify");

    sender.send(DeviceEvent::ButtonDown { id: 2 }).await.unwrap();
    wait_for("profile switch", || {
        gateway
            .button_colors()
            .contains(&(2, "#00ff00".to_string()))
    })
    .await;

    sender
        .send(DeviceEvent::Disconnected {
            reason: Some("unplugged".into()),
        })
        .await
        .unwrap();
    let exit = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(exit, ServiceExit::AttemptsExhausted);
    assert_eq!(connector.attempts(), 2);
    assert!(!env.app.is_connected());
    assert_eq!(env.app.current_config().await.active_profile, ProfileId::P2);
}

#[tokio::test]
async fn test_closed_event_stream_counts_as_disconnect() {
    let env = TestEnv::new();
    env.store(&Configuration::default()).await;
    let connector = Arc::new(MockConnector::scripted(vec![Ok(())]));
    let run = tokio::spawn(service::run(
        env.app.clone(),
        connector.clone(),
        fast_policy(1),
    ));

    wait_for("connection", || env.app.is_connected()).await;
    drop(connector.take_sender());

    let exit = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(exit, ServiceExit::AttemptsExhausted);
    assert!(!env.app.is_connected());
}
