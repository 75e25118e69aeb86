//! Action dispatcher: turns an action tag and value into an effect.
//!
//! Dispatch order (first match wins):
//!
//! | Condition                          | Effect                          |
//! |------------------------------------|---------------------------------|
//! | `url` tag, or value is an http URL | open with the default handler   |
//! | `app_volume`                       | informational; knobs drive it   |
//! | `key_press`                        | one keystroke                   |
//! | `macro`                            | keystrokes with a delay         |
//! | `paste_text`                       | type text in one go             |
//! | `multi_action`                     | run steps in order              |
//! | anything else                      | launch the command line         |
//!
//! Failures never escape as errors; they come back as
//! [`ActionOutcome::Failed`] with a readable reason.

mod command;
mod debounce;
mod keyboard;
mod mixer;

pub use command::{Launcher, SystemLauncher, tokenize_command_line};
pub use debounce::{DEBOUNCE_WINDOW, Debouncer};
pub use keyboard::{
    DEFAULT_MACRO_DELAY_MS, MAX_MACRO_DELAY_MS, MacroSpec, key_token, paste_text, paste_timeout,
};
pub use mixer::{
    COALESCE_DELAY, MAX_STEP, MixerAssignment, STEP_PER_TICK, SessionVolume, VolumeCoalescer,
    VolumeControl, VolumeReport, mixer_assignments, normalize_mixer_target,
};

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use tracing::debug;

use crate::automation::{OsAutomation, run_script, scripts};
use crate::config::ActionType;
use crate::error::LdError;
use crate::render::is_http_url;

/// Deepest composite nesting accepted.
pub const MAX_DEPTH: u32 = 3;

/// Pause between composite steps.
pub const STEP_PAUSE: Duration = Duration::from_millis(40);

const KEY_PRESS_TIMEOUT: Duration = Duration::from_millis(2500);

/// Result of running one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Done(String),
    Failed(String),
}

impl ActionOutcome {
    pub fn done(message: impl Into<String>) -> Self {
        Self::Done(message.into())
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }

    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Done(_))
    }

    /// The message or the failure reason.
    pub fn text(&self) -> &str {
        match self {
            Self::Done(text) | Self::Failed(text) => text,
        }
    }
}

/// Serializes as `{"ok": true, "message": ...}` or `{"ok": false, "reason": ...}`.
impl Serialize for ActionOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        match self {
            Self::Done(message) => {
                map.serialize_entry("ok", &true)?;
                map.serialize_entry("message", message)?;
            }
            Self::Failed(reason) => {
                map.serialize_entry("ok", &false)?;
                map.serialize_entry("reason", reason)?;
            }
        }
        map.end()
    }
}

/// One step of a composite action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub action_type: ActionType,
    pub value: String,
}

/// Parse `{"steps": [{"actionType", "value"}, ...]}`.
///
/// Malformed input yields no steps. Nested `multi_action` steps are dropped.
pub fn parse_steps(value: &str) -> Vec<Step> {
    let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(value.trim()) else {
        return Vec::new();
    };
    let Some(Value::Array(steps)) = obj.get("steps") else {
        return Vec::new();
    };
    steps
        .iter()
        .filter_map(Value::as_object)
        .map(|step| Step {
            action_type: ActionType::normalize(
                step.get("actionType").and_then(Value::as_str).unwrap_or(""),
            ),
            value: match step.get("value") {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            },
        })
        .filter(|step| step.action_type != ActionType::MultiAction)
        .collect()
}

/// Executes actions against the OS.
pub struct Dispatcher {
    automation: Arc<dyn OsAutomation>,
    launcher: Arc<dyn Launcher>,
    step_pause: Duration,
}

impl Dispatcher {
    pub fn new(automation: Arc<dyn OsAutomation>, launcher: Arc<dyn Launcher>) -> Self {
        Self {
            automation,
            launcher,
            step_pause: STEP_PAUSE,
        }
    }

    /// Run an action at top level.
    pub async fn execute(&self, action_type: ActionType, value: &str) -> ActionOutcome {
        self.execute_at(action_type, value, 0).await
    }

    /// Run an action at nesting `depth`.
    pub fn execute_at<'a>(
        &'a self,
        action_type: ActionType,
        value: &'a str,
        depth: u32,
    ) -> BoxFuture<'a, ActionOutcome> {
        async move {
            debug!(action = %action_type, depth, "Executing action");
            if action_type == ActionType::Url || is_http_url(value) {
                return self.open_url(value);
            }
            match action_type {
                ActionType::AppVolume => ActionOutcome::done("Mixer ready (use the knobs)"),
                ActionType::KeyPress => self.key_press(value).await,
                ActionType::Macro => self.run_macro(value).await,
                ActionType::PasteText => self.paste(value).await,
                ActionType::MultiAction => self.run_steps(value, depth + 1).await,
                ActionType::Command | ActionType::App | ActionType::Url => self.run_command(value),
            }
        }
        .boxed()
    }

    fn open_url(&self, value: &str) -> ActionOutcome {
        let url = value.trim();
        if !is_http_url(url) {
            return ActionOutcome::failed("Invalid URL (http/https only)");
        }
        match self.launcher.open_url(url) {
            Ok(()) => ActionOutcome::done(format!("Opened URL: {url}")),
            Err(e) => ActionOutcome::failed(format!("Could not open URL: {e}")),
        }
    }

    fn run_command(&self, value: &str) -> ActionOutcome {
        let tokens = tokenize_command_line(value);
        let Some((program, args)) = tokens.split_first() else {
            return ActionOutcome::failed("Empty command");
        };
        match self.launcher.launch(program, args) {
            Ok(()) => ActionOutcome::done(format!("Command launched: {program}")),
            Err(e) => ActionOutcome::failed(format!("Command failed to start: {e}")),
        }
    }

    async fn keyboard(&self, script: &str, timeout: Duration, message: String) -> ActionOutcome {
        if !self.automation.supported() {
            return ActionOutcome::failed(LdError::Unsupported("Keyboard input").to_string());
        }
        match run_script(self.automation.as_ref(), script, &[], timeout).await {
            Ok(_) => ActionOutcome::Done(message),
            Err(e) => ActionOutcome::failed(format!("Keyboard script failed: {e}")),
        }
    }

    async fn key_press(&self, value: &str) -> ActionOutcome {
        let Some(token) = key_token(value) else {
            return ActionOutcome::failed("Invalid key (e.g. F1, DELETE, !, a, 5)");
        };
        let script = scripts::send_key(&token);
        self.keyboard(&script, KEY_PRESS_TIMEOUT, format!("Key sent: {}", value.trim()))
            .await
    }

    async fn run_macro(&self, value: &str) -> ActionOutcome {
        let spec = MacroSpec::parse(value);
        let keys = spec.chars();
        if keys.is_empty() {
            return ActionOutcome::failed("Macro is empty (no keys)");
        }
        let script = scripts::send_macro(&keys, spec.delay_ms);
        let message = format!("Macro sent ({} key(s), {} ms)", keys.len(), spec.delay_ms);
        self.keyboard(&script, spec.timeout(), message).await
    }

    async fn paste(&self, value: &str) -> ActionOutcome {
        let text = paste_text(value);
        if text.trim().is_empty() {
            return ActionOutcome::failed("Nothing to paste");
        }
        let script = scripts::send_text(&text);
        self.keyboard(&script, paste_timeout(&text), "Text typed".to_string())
            .await
    }

    async fn run_steps(&self, value: &str, depth: u32) -> ActionOutcome {
        if depth > MAX_DEPTH {
            return ActionOutcome::failed("Multi-action too deeply nested");
        }
        let steps = parse_steps(value);
        if steps.is_empty() {
            return ActionOutcome::failed("Multi-action is empty");
        }
        for (i, step) in steps.iter().enumerate() {
            debug!(step = i + 1, action = %step.action_type, "Running step");
            let outcome = self.execute_at(step.action_type, &step.value, depth).await;
            if let ActionOutcome::Failed(reason) = outcome {
                return ActionOutcome::failed(format!("Multi-action step {}: {reason}", i + 1));
            }
            tokio::time::sleep(self.step_pause).await;
        }
        ActionOutcome::done(format!("Multi-action done ({} step(s))", steps.len()))
    }
}
