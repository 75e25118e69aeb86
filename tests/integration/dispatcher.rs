//! Integration tests for action dispatch, debouncing and knob coalescing.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use loopdeck::actions::{
    ActionOutcome, Dispatcher, MAX_DEPTH, MixerAssignment, VolumeCoalescer,
};
use loopdeck::config::{ActionType, ProfileId};
use loopdeck::device::Knob;
use loopdeck::error::LdError;
use loopdeck::status::StatusLine;

use crate::common::fixtures::{TestEnv, config_with, shortcut};
use crate::common::init_test_logging;
use crate::common::mocks::{Launch, RecordingAutomation, RecordingLauncher, RecordingVolume};

fn dispatcher(
    launcher: &Arc<RecordingLauncher>,
    automation: &Arc<RecordingAutomation>,
) -> Dispatcher {
    Dispatcher::new(automation.clone(), launcher.clone())
}

fn steps(items: &[(&str, &str)]) -> String {
    let steps: Vec<_> = items
        .iter()
        .map(|(t, v)| json!({"actionType": t, "value": v}))
        .collect();
    json!({ "steps": steps }).to_string()
}

// === Single actions ===

#[tokio::test]
async fn test_url_opens_and_http_value_wins_over_tag() {
    let launcher = Arc::new(RecordingLauncher::new());
    let automation = Arc::new(RecordingAutomation::unsupported());
    let d = dispatcher(&launcher, &automation);

    assert!(d.execute(ActionType::Url, "https://a.test").await.is_ok());
    assert!(d.execute(ActionType::Command, "http://b.test/x").await.is_ok());
    assert_eq!(
        d.execute(ActionType::Url, "ftp://c.test").await,
        ActionOutcome::failed("Invalid URL (http/https only)")
    );
    assert_eq!(
        launcher.launches(),
        vec![
            Launch::Url("https://a.test".into()),
            Launch::Url("http://b.test/x".into())
        ]
    );
}

#[tokio::test]
async fn test_command_is_tokenized() {
    let launcher = Arc::new(RecordingLauncher::new());
    let automation = Arc::new(RecordingAutomation::unsupported());
    let d = dispatcher(&launcher, &automation);

    let outcome = d
        .execute(ActionType::App, r#""C:\Program Files\App\app.exe" --flag "two words""#)
        .await;
    assert!(outcome.is_ok(), "{outcome:?}");
    assert_eq!(
        launcher.launches(),
        vec![Launch::Program {
            program: r"C:\Program Files\App\app.exe".into(),
            args: vec!["--flag".into(), "two words".into()],
        }]
    );
    assert_eq!(
        d.execute(ActionType::Command, "   ").await,
        ActionOutcome::failed("Empty command")
    );
}

#[tokio::test]
async fn test_keyboard_actions_unsupported_without_automation() {
    let launcher = Arc::new(RecordingLauncher::new());
    let automation = Arc::new(RecordingAutomation::unsupported());
    let d = dispatcher(&launcher, &automation);

    let expected = LdError::Unsupported("Keyboard input").to_string();
    for (t, v) in [
        (ActionType::KeyPress, "F5"),
        (ActionType::Macro, "abc"),
        (ActionType::PasteText, "hello"),
    ] {
        assert_eq!(d.execute(t, v).await, ActionOutcome::Failed(expected.clone()));
    }
    assert_eq!(automation.call_count(), 0);
}

#[tokio::test]
async fn test_key_press_runs_encoded_script() {
    let launcher = Arc::new(RecordingLauncher::new());
    let automation = Arc::new(RecordingAutomation::supported());
    let d = dispatcher(&launcher, &automation);

    assert!(d.execute(ActionType::KeyPress, "F5").await.is_ok());
    assert_eq!(
        d.execute(ActionType::KeyPress, "F0").await,
        ActionOutcome::failed("Invalid key (e.g. F1, DELETE, !, a, 5)")
    );
    let calls = automation.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].command, "powershell");
    assert!(calls[0].args.contains(&"-EncodedCommand".to_string()));
}

#[tokio::test]
async fn test_keyboard_failures_become_outcomes() {
    let launcher = Arc::new(RecordingLauncher::new());
    let automation = Arc::new(RecordingAutomation::supported());
    automation.reply(Err(LdError::Timeout("powershell after 2500ms".into())));
    let d = dispatcher(&launcher, &automation);

    match d.execute(ActionType::KeyPress, "ENTER").await {
        ActionOutcome::Failed(reason) => assert!(reason.contains("Timed out"), "{reason}"),
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(
        d.execute(ActionType::Macro, r#"{"keys": "", "delayMs": 50}"#).await,
        ActionOutcome::failed("Macro is empty (no keys)")
    );
    assert_eq!(
        d.execute(ActionType::PasteText, r#"{"text": "  "}"#).await,
        ActionOutcome::failed("Nothing to paste")
    );
}

#[tokio::test]
async fn test_app_volume_is_informational() {
    let launcher = Arc::new(RecordingLauncher::new());
    let automation = Arc::new(RecordingAutomation::supported());
    let d = dispatcher(&launcher, &automation);
    assert_eq!(
        d.execute(ActionType::AppVolume, "spotify.exe").await,
        ActionOutcome::done("Mixer ready (use the knobs)")
    );
    assert!(launcher.launches().is_empty());
}

// === Composite actions ===

#[tokio::test]
async fn test_failing_step_stops_the_sequence() {
    init_test_logging();
    let launcher = Arc::new(RecordingLauncher::failing(&["missing.exe"]));
    let automation = Arc::new(RecordingAutomation::unsupported());
    let d = dispatcher(&launcher, &automation);

    let value = steps(&[
        ("command", "notepad.exe"),
        ("command", "missing.exe"),
        ("url", "https://never.test"),
    ]);
    match d.execute(ActionType::MultiAction, &value).await {
        ActionOutcome::Failed(reason) => {
            assert!(reason.starts_with("Multi-action step 2:"), "{reason}");
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(launcher.launches().len(), 2, "step 3 never attempted");
}

#[tokio::test]
async fn test_all_steps_run_in_order() {
    let launcher = Arc::new(RecordingLauncher::new());
    let automation = Arc::new(RecordingAutomation::unsupported());
    let d = dispatcher(&launcher, &automation);

    let value = steps(&[("url", "https://one.test"), ("command", "two.exe")]);
    assert_eq!(
        d.execute(ActionType::MultiAction, &value).await,
        ActionOutcome::done("Multi-action done (2 step(s))")
    );
    assert_eq!(
        launcher.launches(),
        vec![
            Launch::Url("https://one.test".into()),
            Launch::Program {
                program: "two.exe".into(),
                args: vec![]
            },
        ]
    );
}

#[tokio::test]
async fn test_empty_and_self_nested_composites_fail() {
    let launcher = Arc::new(RecordingLauncher::new());
    let automation = Arc::new(RecordingAutomation::unsupported());
    let d = dispatcher(&launcher, &automation);

    assert_eq!(
        d.execute(ActionType::MultiAction, r#"{"steps": []}"#).await,
        ActionOutcome::failed("Multi-action is empty")
    );
    assert_eq!(
        d.execute(ActionType::MultiAction, "not json").await,
        ActionOutcome::failed("Multi-action is empty")
    );

    // A composite whose only step is itself terminates instead of looping.
    let inner = steps(&[("multi_action", "{}")]);
    let outer = steps(&[("multi_action", &inner)]);
    assert!(!d.execute(ActionType::MultiAction, &outer).await.is_ok());
    assert!(launcher.launches().is_empty());
}

#[tokio::test]
async fn test_depth_limit() {
    let launcher = Arc::new(RecordingLauncher::new());
    let automation = Arc::new(RecordingAutomation::unsupported());
    let d = dispatcher(&launcher, &automation);

    let value = steps(&[("command", "x.exe")]);
    assert!(
        d.execute_at(ActionType::MultiAction, &value, MAX_DEPTH - 1)
            .await
            .is_ok()
    );
    assert_eq!(
        d.execute_at(ActionType::MultiAction, &value, MAX_DEPTH).await,
        ActionOutcome::failed("Multi-action too deeply nested")
    );
}

// === Shortcut execution through the app ===

#[tokio::test]
async fn test_second_press_inside_window_is_debounced() {
    let env = TestEnv::new();
    let config = config_with(
        ProfileId::Home,
        vec![shortcut(1, ActionType::Command, "notepad.exe", "#123456")],
    );
    env.store(&config).await;

    let first = env.app.execute_shortcut(1).await;
    let second = env.app.execute_shortcut(1).await;
    assert!(first.is_ok());
    assert_eq!(second, ActionOutcome::failed("Debounced"));
    assert_eq!(env.launcher.launches().len(), 1);

    // Other keys are independent.
    assert_eq!(
        env.app.execute_shortcut(2).await,
        ActionOutcome::failed("No action value")
    );
}

#[tokio::test]
async fn test_status_line_records_outcome() {
    let env = TestEnv::new();
    let config = config_with(
        ProfileId::P2,
        vec![shortcut(7, ActionType::Url, "https://example.com", "#000000")],
    );
    env.store(&config).await;

    let outcome = env.app.trigger(7, Some(ProfileId::P2)).await.unwrap();
    assert!(outcome.is_ok());
    let last = env.app.status_line().last();
    assert!(last.ends_with("[2] Key 7: Opened URL: https://example.com"), "{last}");
    assert_eq!(env.app.status().await.active_profile, ProfileId::P2);
}

#[tokio::test]
async fn test_trigger_rejects_out_of_range_keys() {
    let env = TestEnv::new();
    env.store(&loopdeck::config::Configuration::default()).await;
    for key in [-1, 12, 300] {
        assert!(matches!(
            env.app.trigger(key, None).await,
            Err(LdError::InvalidKeyIndex { .. })
        ));
    }
}

// === Volume coalescing ===

fn assignment(target: &str) -> MixerAssignment {
    MixerAssignment {
        key: 0,
        label: "Music".into(),
        target: target.into(),
    }
}

#[tokio::test(start_paused = true)]
async fn test_rapid_rotation_is_one_adjustment() {
    let volume = Arc::new(RecordingVolume::new());
    let status = Arc::new(StatusLine::new());
    let coalescer = VolumeCoalescer::new(volume.clone(), status.clone());

    for delta in [1, 1, -1, 2, 1] {
        coalescer.queue(Knob::TopLeft, assignment("spotify"), delta);
    }
    assert_eq!(coalescer.pending(Knob::TopLeft), 4);
    assert!(volume.adjustments().is_empty());

    tokio::time::sleep(Duration::from_millis(100)).await;
    tokio::task::yield_now().await;

    let calls = volume.adjustments();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "spotify");
    assert!((calls[0].1 - 0.12).abs() < 1e-9);
    assert_eq!(coalescer.pending(Knob::TopLeft), 0);
    assert!(status.last().ends_with("[MIX] Music (50%)"));
}

#[tokio::test(start_paused = true)]
async fn test_large_turns_are_clamped_and_knobs_independent() {
    let volume = Arc::new(RecordingVolume::new());
    let coalescer = VolumeCoalescer::new(volume.clone(), Arc::new(StatusLine::new()));

    coalescer.queue(Knob::TopLeft, assignment("a"), 20);
    coalescer.queue(Knob::BottomRight, assignment("b"), -30);
    tokio::time::sleep(Duration::from_millis(100)).await;
    tokio::task::yield_now().await;

    let mut calls = volume.adjustments();
    calls.sort_by(|x, y| x.0.cmp(&y.0));
    assert_eq!(calls.len(), 2);
    assert!((calls[0].1 - 0.24).abs() < 1e-9);
    assert!((calls[1].1 + 0.24).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn test_extreme_deltas_saturate() {
    let volume = Arc::new(RecordingVolume::new());
    let coalescer = VolumeCoalescer::new(volume.clone(), Arc::new(StatusLine::new()));

    coalescer.queue(Knob::CenterRight, assignment("a"), i32::MAX);
    coalescer.queue(Knob::CenterRight, assignment("a"), i32::MAX);
    assert_eq!(coalescer.pending(Knob::CenterRight), i32::MAX);
    tokio::time::sleep(Duration::from_millis(100)).await;
    tokio::task::yield_now().await;

    let calls = volume.adjustments();
    assert_eq!(calls.len(), 1);
    assert!((calls[0].1 - 0.24).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_drops_pending_changes() {
    let volume = Arc::new(RecordingVolume::new());
    let coalescer = VolumeCoalescer::new(volume.clone(), Arc::new(StatusLine::new()));

    coalescer.queue(Knob::CenterLeft, assignment("a"), 3);
    coalescer.queue(Knob::CenterLeft, assignment("a"), -3);
    coalescer.cancel_all();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(volume.adjustments().is_empty());
    assert_eq!(coalescer.pending(Knob::CenterLeft), 0);
}

#[tokio::test(start_paused = true)]
async fn test_net_zero_rotation_is_not_applied() {
    let volume = Arc::new(RecordingVolume::new());
    let coalescer = VolumeCoalescer::new(volume.clone(), Arc::new(StatusLine::new()));

    coalescer.queue(Knob::TopRight, assignment("a"), 2);
    coalescer.queue(Knob::TopRight, assignment("a"), -2);
    tokio::time::sleep(Duration::from_millis(100)).await;
    tokio::task::yield_now().await;

    assert!(volume.adjustments().is_empty());
}

#[tokio::test]
async fn test_unbound_knob_is_ignored() {
    let env = TestEnv::new();
    env.store(&loopdeck::config::Configuration::default()).await;
    env.app.handle_rotate(Knob::TopLeft, 3).await;
    assert_eq!(env.app.coalescer().pending(Knob::TopLeft), 0);
}
