//! Persisted configuration document: profiles of key shortcuts.
//!
//! The on-disk JSON uses camelCase field names:
//!
//! ```json
//! {
//!   "version": 2,
//!   "activeProfile": "home",
//!   "profileColors": { "home": "#ffffff", "1": "#ff0000", ... },
//!   "profiles": { "home": [ { "key": 0, "label": "Key 0", ... } ], ... }
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::color::{BLACK, WHITE};
use crate::error::LdError;

/// Current schema version written to disk.
pub const CONFIG_VERSION: u32 = 2;

/// Number of touch keys on the control surface.
pub const KEY_COUNT: u8 = 12;

/// Maximum label length (in characters).
pub const MAX_LABEL_LEN: usize = 30;

/// The closed set of profiles. `Home` is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum ProfileId {
    #[default]
    #[serde(rename = "home")]
    Home,
    #[serde(rename = "1")]
    P1,
    #[serde(rename = "2")]
    P2,
    #[serde(rename = "3")]
    P3,
    #[serde(rename = "4")]
    P4,
    #[serde(rename = "5")]
    P5,
    #[serde(rename = "6")]
    P6,
    #[serde(rename = "7")]
    P7,
}

impl ProfileId {
    /// All profiles, in hardware button order.
    pub const ALL: [Self; 8] = [
        Self::Home,
        Self::P1,
        Self::P2,
        Self::P3,
        Self::P4,
        Self::P5,
        Self::P6,
        Self::P7,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Home => "home",
            Self::P1 => "1",
            Self::P2 => "2",
            Self::P3 => "3",
            Self::P4 => "4",
            Self::P5 => "5",
            Self::P6 => "6",
            Self::P7 => "7",
        }
    }

    /// Name shown on the status line.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Home => "HOME",
            other => other.as_str(),
        }
    }

    /// Hardware profile button bound to this profile.
    pub const fn button(self) -> u8 {
        self as u8
    }

    /// Profile bound to a hardware profile button, if any.
    pub fn from_button(id: u8) -> Option<Self> {
        Self::ALL.get(usize::from(id)).copied()
    }

    /// Parse an identifier exactly as stored (`home`, `1` .. `7`).
    pub fn parse(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == text)
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileId {
    type Err = LdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s.trim()).ok_or_else(|| LdError::UnknownProfile(s.to_string()))
    }
}

/// What a key does when pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Launch a command line as a detached process.
    #[default]
    Command,
    /// Open an http(s) URL.
    Url,
    /// Launch an application (same mechanics as `Command`).
    App,
    /// Bind the key's application to a mixer knob.
    AppVolume,
    /// Simulate one named key.
    KeyPress,
    /// Run a sequence of sub-actions.
    MultiAction,
    /// Type characters one by one with a delay.
    Macro,
    /// Type a block of text at once.
    PasteText,
}

impl ActionType {
    pub const ALL: [Self; 8] = [
        Self::Command,
        Self::Url,
        Self::App,
        Self::AppVolume,
        Self::KeyPress,
        Self::MultiAction,
        Self::Macro,
        Self::PasteText,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::Url => "url",
            Self::App => "app",
            Self::AppVolume => "app_volume",
            Self::KeyPress => "key_press",
            Self::MultiAction => "multi_action",
            Self::Macro => "macro",
            Self::PasteText => "paste_text",
        }
    }

    /// Exact tag match, used by strict validation.
    pub fn parse_exact(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == text)
    }

    /// Case-insensitive match; unknown tags become `Command`.
    pub fn normalize(text: &str) -> Self {
        Self::parse_exact(&text.trim().to_ascii_lowercase()).unwrap_or_default()
    }

    /// Whether the key may show an icon extracted from an executable.
    pub const fn launches_executable(self) -> bool {
        matches!(self, Self::Command | Self::App | Self::AppVolume)
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Binding for one physical key within one profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shortcut {
    pub key: u8,
    pub label: String,
    pub color: String,
    pub action_type: ActionType,
    pub value: String,
    #[serde(default)]
    pub icon_path: String,
}

impl Shortcut {
    /// Unassigned key: black, no action.
    pub fn placeholder(key: u8) -> Self {
        Self {
            key,
            label: format!("Key {key}"),
            color: BLACK.to_string(),
            action_type: ActionType::Command,
            value: String::new(),
            icon_path: String::new(),
        }
    }

    pub fn has_action(&self) -> bool {
        !self.value.is_empty()
    }
}

/// One placeholder per key.
pub fn default_shortcuts() -> Vec<Shortcut> {
    (0..KEY_COUNT).map(Shortcut::placeholder).collect()
}

/// Root persisted document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pub version: u32,
    pub active_profile: ProfileId,
    pub profile_colors: BTreeMap<ProfileId, String>,
    pub profiles: BTreeMap<ProfileId, Vec<Shortcut>>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            active_profile: ProfileId::Home,
            profile_colors: ProfileId::ALL
                .into_iter()
                .map(|p| (p, WHITE.to_string()))
                .collect(),
            profiles: ProfileId::ALL
                .into_iter()
                .map(|p| (p, default_shortcuts()))
                .collect(),
        }
    }
}

impl Configuration {
    /// Shortcuts of the active profile (empty if the profile is somehow absent).
    pub fn active_shortcuts(&self) -> &[Shortcut] {
        self.shortcuts(self.active_profile)
    }

    pub fn shortcuts(&self, profile: ProfileId) -> &[Shortcut] {
        self.profiles.get(&profile).map_or(&[], Vec::as_slice)
    }

    pub fn shortcut(&self, profile: ProfileId, key: u8) -> Option<&Shortcut> {
        self.shortcuts(profile).iter().find(|s| s.key == key)
    }

    pub fn shortcut_mut(&mut self, profile: ProfileId, key: u8) -> Option<&mut Shortcut> {
        self.profiles
            .get_mut(&profile)
            .and_then(|list| list.iter_mut().find(|s| s.key == key))
    }

    /// Indicator color for a profile button, white when missing.
    pub fn profile_color(&self, profile: ProfileId) -> &str {
        self.profile_colors
            .get(&profile)
            .map_or(WHITE, String::as_str)
    }
}
