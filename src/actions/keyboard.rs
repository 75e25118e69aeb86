//! Keyboard simulation payloads: single keys, macros and pasted text.

use std::time::Duration;

use serde_json::Value;

use crate::automation::scripts::escape_send_keys;

/// Delay between macro keystrokes when none is given.
pub const DEFAULT_MACRO_DELAY_MS: u64 = 120;

/// Upper bound for the macro delay.
pub const MAX_MACRO_DELAY_MS: u64 = 10_000;

/// Named keys accepted by `key_press`, mapped to their SendKeys names.
const KEY_ALIASES: &[(&str, &str)] = &[
    ("DEL", "DEL"),
    ("DELETE", "DEL"),
    ("BACKSPACE", "BACKSPACE"),
    ("BS", "BACKSPACE"),
    ("ENTER", "ENTER"),
    ("RETURN", "ENTER"),
    ("TAB", "TAB"),
    ("ESC", "ESC"),
    ("ESCAPE", "ESC"),
    ("SPACE", "SPACE"),
    ("HOME", "HOME"),
    ("END", "END"),
    ("INSERT", "INS"),
    ("INS", "INS"),
    ("PAGEUP", "PGUP"),
    ("PGUP", "PGUP"),
    ("PAGEDOWN", "PGDN"),
    ("PGDN", "PGDN"),
    ("LEFT", "LEFT"),
    ("RIGHT", "RIGHT"),
    ("UP", "UP"),
    ("DOWN", "DOWN"),
];

/// SendKeys token for a `key_press` value, or `None` if it names no key.
///
/// A single character is sent literally; longer values must be `F1`-`F24`
/// or one of the named keys (case-insensitive).
pub fn key_token(value: &str) -> Option<String> {
    let raw = value.trim();
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (None, _) => return None,
        (Some(c), None) => return Some(escape_send_keys(&c.to_string())),
        _ => {}
    }

    let upper = raw.to_ascii_uppercase();
    if let Some(digits) = upper.strip_prefix('F') {
        let function_key = !digits.starts_with('0')
            && digits.chars().all(|c| c.is_ascii_digit())
            && digits.parse::<u8>().is_ok_and(|n| (1..=24).contains(&n));
        if function_key {
            return Some(format!("{{{upper}}}"));
        }
    }
    KEY_ALIASES
        .iter()
        .find(|(alias, _)| *alias == upper)
        .map(|(_, name)| format!("{{{name}}}"))
}

/// A parsed `macro` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroSpec {
    pub keys: String,
    pub delay_ms: u64,
}

impl MacroSpec {
    /// Parse `{"keys": ..., "delayMs": ...}` or plain text (sent with the
    /// default delay). `text` is accepted in place of `keys`.
    pub fn parse(value: &str) -> Self {
        let raw = value.trim();
        if raw.is_empty() {
            return Self {
                keys: String::new(),
                delay_ms: DEFAULT_MACRO_DELAY_MS,
            };
        }
        if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(raw) {
            let keys = obj
                .get("keys")
                .filter(|v| !v.is_null())
                .or_else(|| obj.get("text"))
                .map(value_text)
                .unwrap_or_default();
            return Self {
                keys,
                delay_ms: clamp_delay(obj.get("delayMs")),
            };
        }
        Self {
            keys: raw.to_string(),
            delay_ms: DEFAULT_MACRO_DELAY_MS,
        }
    }

    /// Individual keystrokes.
    pub fn chars(&self) -> Vec<char> {
        self.keys.chars().collect()
    }

    /// Time allowed for the helper to type the whole macro.
    pub fn timeout(&self) -> Duration {
        let n = self.keys.chars().count() as u64;
        Duration::from_millis(3000.max(1500 + n * (self.delay_ms + 20)))
    }
}

/// Text of a `paste_text` value: `{"text": ...}` or the raw value.
pub fn paste_text(value: &str) -> String {
    let raw = value.trim();
    if raw.is_empty() {
        return String::new();
    }
    if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(raw) {
        return obj
            .get("text")
            .filter(|v| !v.is_null())
            .or_else(|| obj.get("keys"))
            .map(value_text)
            .unwrap_or_default();
    }
    value.to_string()
}

/// Time allowed for the helper to type `text`.
pub fn paste_timeout(text: &str) -> Duration {
    let n = text.chars().count() as u64;
    Duration::from_millis(2500.max(1200 + n * 10))
}

/// Clamp a macro delay to `[0, 10000]`; non-numbers get the default.
fn clamp_delay(value: Option<&Value>) -> u64 {
    let n = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match n {
        Some(n) if n.is_finite() => n.round().clamp(0.0, MAX_MACRO_DELAY_MS as f64) as u64,
        _ => DEFAULT_MACRO_DELAY_MS,
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
