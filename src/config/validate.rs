//! Strict write-time validation.
//!
//! Reports every violation at once. Only a payload with zero violations is
//! turned into a write-ready configuration.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use super::normalize::{parse_key, sanitize_shortcut};
use super::schema::{
    ActionType, CONFIG_VERSION, Configuration, KEY_COUNT, MAX_LABEL_LEN, ProfileId, Shortcut,
};
use crate::color::{WHITE, is_hex_color};
use crate::error::LdError;

/// Validate a submitted configuration.
///
/// On success the returned configuration is sorted by key with labels,
/// colors, values and icon paths in their canonical forms.
pub fn validate_strict(input: &Value) -> Result<Configuration, Vec<String>> {
    let Some(root) = input.as_object() else {
        return Err(vec!["Invalid JSON payload: expected an object.".to_string()]);
    };
    let mut errors = Vec::new();

    if root.get("version").and_then(Value::as_u64) != Some(u64::from(CONFIG_VERSION)) {
        errors.push(format!("version must be {CONFIG_VERSION}."));
    }

    let active = root
        .get("activeProfile")
        .and_then(Value::as_str)
        .and_then(ProfileId::parse);
    if active.is_none() {
        errors.push(format!(
            "activeProfile must be one of: {}.",
            profile_list()
        ));
    }

    let profiles = root.get("profiles").and_then(Value::as_object);
    if profiles.is_none() {
        errors.push("profiles must be an object.".to_string());
    }

    let mut profile_colors: BTreeMap<ProfileId, String> = ProfileId::ALL
        .into_iter()
        .map(|p| (p, WHITE.to_string()))
        .collect();
    if let Some(raw) = root.get("profileColors") {
        match raw.as_object() {
            None => errors.push("profileColors must be an object.".to_string()),
            Some(colors) => {
                for profile in ProfileId::ALL {
                    match colors.get(profile.as_str()).and_then(Value::as_str) {
                        Some(text) if is_hex_color(text) => {
                            profile_colors.insert(profile, text.to_ascii_lowercase());
                        }
                        _ => errors.push(format!("profileColors.{profile} must match #RRGGBB.")),
                    }
                }
            }
        }
    }

    let mut normalized = BTreeMap::new();
    for profile in ProfileId::ALL {
        let raw = profiles.and_then(|p| p.get(profile.as_str()));
        if let Some(list) = validate_shortcuts(raw, profile, &mut errors) {
            normalized.insert(profile, list);
        }
    }

    if !errors.is_empty() {
        debug!(violations = errors.len(), "Strict validation rejected configuration");
        return Err(errors);
    }

    Ok(Configuration {
        version: CONFIG_VERSION,
        active_profile: active.unwrap_or_default(),
        profile_colors,
        profiles: normalized,
    })
}

/// Same as [`validate_strict`] with the violations wrapped in [`LdError`].
pub fn validate_strict_error(input: &Value) -> crate::error::Result<Configuration> {
    validate_strict(input).map_err(LdError::Validation)
}

fn validate_shortcuts(
    raw: Option<&Value>,
    profile: ProfileId,
    errors: &mut Vec<String>,
) -> Option<Vec<Shortcut>> {
    let Some(items) = raw.and_then(Value::as_array) else {
        errors.push(format!("profiles.{profile} must be an array."));
        return None;
    };

    if items.len() != usize::from(KEY_COUNT) {
        errors.push(format!(
            "profiles.{profile} must contain exactly {KEY_COUNT} entries."
        ));
    }

    let mut seen = [false; KEY_COUNT as usize];
    let mut out = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let Some(obj) = item.as_object() else {
            errors.push(format!("profiles.{profile}[{index}] must be an object."));
            continue;
        };

        let key = match parse_key(obj.get("key")) {
            Some(k) if (0..i64::from(KEY_COUNT)).contains(&k) => {
                let k = k as u8;
                if seen[usize::from(k)] {
                    errors.push(format!("profiles.{profile} contains duplicate key {k}."));
                } else {
                    seen[usize::from(k)] = true;
                }
                Some(k)
            }
            _ => {
                errors.push(format!(
                    "profiles.{profile}[{index}].key must be an integer between 0 and {}.",
                    KEY_COUNT - 1
                ));
                None
            }
        };

        match obj.get("label").and_then(Value::as_str) {
            Some(label)
                if !label.trim().is_empty() && label.chars().count() <= MAX_LABEL_LEN => {}
            _ => errors.push(format!(
                "profiles.{profile}[{index}].label must be a string of 1 to {MAX_LABEL_LEN} characters."
            )),
        }

        if !obj
            .get("color")
            .and_then(Value::as_str)
            .is_some_and(is_hex_color)
        {
            errors.push(format!(
                "profiles.{profile}[{index}].color must match #RRGGBB."
            ));
        }

        if obj
            .get("actionType")
            .and_then(Value::as_str)
            .and_then(ActionType::parse_exact)
            .is_none()
        {
            let tags: Vec<&str> = ActionType::ALL.iter().map(|t| t.as_str()).collect();
            errors.push(format!(
                "profiles.{profile}[{index}].actionType must be one of: {}.",
                tags.join(", ")
            ));
        }

        if !obj.get("value").is_some_and(Value::is_string) {
            errors.push(format!("profiles.{profile}[{index}].value must be a string."));
        }

        if obj.get("iconPath").is_some_and(|v| !v.is_string()) {
            errors.push(format!(
                "profiles.{profile}[{index}].iconPath must be a string."
            ));
        }

        if let Some(k) = key {
            out.push(sanitize_shortcut(obj, k));
        }
    }

    for (key, present) in seen.iter().enumerate() {
        if !present {
            errors.push(format!("profiles.{profile} must contain key {key}."));
        }
    }

    out.sort_by_key(|s| s.key);
    Some(out)
}

fn profile_list() -> String {
    ProfileId::ALL
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
