//! Lenient load-time repair.
//!
//! Never rejects: any JSON value (including garbage) is turned into a complete
//! configuration, with one human-readable issue per corrected discrepancy.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::path::sanitize_icon_path;
use super::schema::{
    ActionType, CONFIG_VERSION, Configuration, KEY_COUNT, MAX_LABEL_LEN, ProfileId, Shortcut,
    default_shortcuts,
};
use crate::color::{WHITE, is_hex_color, normalize_hex};

/// Result of lenient normalization.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub config: Configuration,
    pub issues: Vec<String>,
}

/// Repair an arbitrary JSON document into a valid configuration.
pub fn normalize_lenient(input: &Value) -> Normalized {
    let mut config = Configuration::default();
    let mut issues = Vec::new();

    let Some(root) = input.as_object() else {
        issues.push("Configuration missing or not an object, defaults applied.".to_string());
        return finish(config, issues);
    };

    if let Some(legacy) = root.get("shortcuts").filter(|v| v.is_array()) {
        issues.push(format!(
            "Migrated v1 configuration to v{CONFIG_VERSION} (shortcuts moved to profile HOME)."
        ));
        let home = normalize_shortcuts(Some(legacy), ProfileId::Home, &mut issues);
        config.profiles.insert(ProfileId::Home, home);
        return finish(config, issues);
    }

    if root.get("version").and_then(Value::as_u64) != Some(u64::from(CONFIG_VERSION)) {
        issues.push(format!(
            "Invalid configuration version ({}), version {CONFIG_VERSION} applied.",
            describe(root.get("version"))
        ));
    }

    let Some(profiles) = root.get("profiles").and_then(Value::as_object) else {
        issues.push("profiles missing or not an object, defaults applied.".to_string());
        return finish(config, issues);
    };

    match root
        .get("activeProfile")
        .and_then(Value::as_str)
        .and_then(ProfileId::parse)
    {
        Some(active) => config.active_profile = active,
        None => issues.push(format!(
            "Invalid activeProfile ({}), profile HOME applied.",
            describe(root.get("activeProfile"))
        )),
    }

    normalize_profile_colors(root, &mut config, &mut issues);

    for profile in ProfileId::ALL {
        let list = normalize_shortcuts(profiles.get(profile.as_str()), profile, &mut issues);
        config.profiles.insert(profile, list);
    }

    finish(config, issues)
}

fn finish(config: Configuration, issues: Vec<String>) -> Normalized {
    if issues.is_empty() {
        debug!("Configuration is already normalized");
    } else {
        warn!(count = issues.len(), "Configuration repaired on load");
    }
    Normalized { config, issues }
}

fn normalize_profile_colors(
    root: &Map<String, Value>,
    config: &mut Configuration,
    issues: &mut Vec<String>,
) {
    let Some(colors) = root.get("profileColors").and_then(Value::as_object) else {
        issues.push("profileColors missing, white applied to every profile.".to_string());
        return;
    };

    for profile in ProfileId::ALL {
        let raw = colors.get(profile.as_str());
        match raw.and_then(Value::as_str).map(str::trim) {
            Some(text) if is_hex_color(text) => {
                config
                    .profile_colors
                    .insert(profile, text.to_ascii_lowercase());
            }
            _ => {
                issues.push(format!(
                    "profileColors.{profile}: invalid color ({}), white applied.",
                    describe(raw)
                ));
                config.profile_colors.insert(profile, WHITE.to_string());
            }
        }
    }
}

fn normalize_shortcuts(
    raw: Option<&Value>,
    profile: ProfileId,
    issues: &mut Vec<String>,
) -> Vec<Shortcut> {
    let mut result = default_shortcuts();

    let Some(items) = raw.and_then(Value::as_array) else {
        issues.push(format!(
            "Profile {}: shortcuts missing or not a list, defaults applied.",
            profile.label()
        ));
        return result;
    };

    let mut seen = [false; KEY_COUNT as usize];
    for item in items {
        let Some(obj) = item.as_object() else {
            issues.push(format!(
                "Profile {}: ignored a shortcut that is not an object.",
                profile.label()
            ));
            continue;
        };

        let key = match parse_key(obj.get("key")) {
            Some(k) if (0..i64::from(KEY_COUNT)).contains(&k) => k as u8,
            _ => {
                issues.push(format!(
                    "Profile {}: ignored shortcut with invalid key ({}).",
                    profile.label(),
                    describe(obj.get("key"))
                ));
                continue;
            }
        };

        if seen[usize::from(key)] {
            issues.push(format!(
                "Profile {}: duplicate key {key}, entry ignored.",
                profile.label()
            ));
            continue;
        }
        seen[usize::from(key)] = true;
        result[usize::from(key)] = sanitize_shortcut(obj, key);
    }

    for (key, present) in seen.iter().enumerate() {
        if !present {
            issues.push(format!(
                "Profile {}: key {key} missing, default applied.",
                profile.label()
            ));
        }
    }

    result
}

/// Build a canonical shortcut from a raw object whose key is already known.
pub(crate) fn sanitize_shortcut(obj: &Map<String, Value>, key: u8) -> Shortcut {
    Shortcut {
        key,
        label: sanitize_label(obj.get("label"), key),
        color: normalize_hex(obj.get("color").and_then(Value::as_str).unwrap_or("")),
        action_type: obj
            .get("actionType")
            .and_then(Value::as_str)
            .map_or(ActionType::Command, ActionType::normalize),
        value: scalar_text(obj.get("value")).trim().to_string(),
        icon_path: sanitize_icon_path(obj.get("iconPath").and_then(Value::as_str).unwrap_or("")),
    }
}

/// Interpret a raw `key` field as an integer. Integral floats and numeric
/// strings are accepted.
pub(crate) fn parse_key(raw: Option<&Value>) -> Option<i64> {
    match raw? {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < 1e9)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn sanitize_label(raw: Option<&Value>, key: u8) -> String {
    let text = match raw {
        None | Some(Value::Null | Value::Array(_) | Value::Object(_)) => format!("Key {key}"),
        Some(other) => scalar_text(Some(other)),
    };
    let clipped: String = text.trim().chars().take(MAX_LABEL_LEN).collect();
    match clipped.trim_end() {
        "" => format!("Key {key}"),
        label => label.to_string(),
    }
}

fn scalar_text(raw: Option<&Value>) -> String {
    match raw {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn describe(raw: Option<&Value>) -> String {
    raw.map_or_else(|| "missing".to_string(), Value::to_string)
}
