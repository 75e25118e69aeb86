//! Device description, input events and reconnection policy.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::KEY_COUNT;

/// Information about a connected control surface.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceInfo {
    /// Device kind/model identifier
    pub kind: String,
    /// Number of touch keys
    pub key_count: u8,
    /// Edge length of a key image in pixels
    pub key_size: u32,
    /// Number of key columns
    pub cols: u8,
    /// Number of key rows
    pub rows: u8,
}

impl DeviceInfo {
    /// The 12-key, 90 px layout of the Loupedeck Live family.
    pub fn live() -> Self {
        Self {
            kind: "LoupedeckLive".to_string(),
            key_count: KEY_COUNT,
            key_size: 90,
            cols: 4,
            rows: 3,
        }
    }
}

/// The six rotary encoders, in mixer binding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Knob {
    #[serde(rename = "knobTL")]
    TopLeft,
    #[serde(rename = "knobCL")]
    CenterLeft,
    #[serde(rename = "knobBL")]
    BottomLeft,
    #[serde(rename = "knobTR")]
    TopRight,
    #[serde(rename = "knobCR")]
    CenterRight,
    #[serde(rename = "knobBR")]
    BottomRight,
}

impl Knob {
    /// Binding order: the n-th `app_volume` shortcut drives `ALL[n]`.
    pub const ALL: [Self; 6] = [
        Self::TopLeft,
        Self::CenterLeft,
        Self::BottomLeft,
        Self::TopRight,
        Self::CenterRight,
        Self::BottomRight,
    ];

    pub const fn id(self) -> &'static str {
        match self {
            Self::TopLeft => "knobTL",
            Self::CenterLeft => "knobCL",
            Self::BottomLeft => "knobBL",
            Self::TopRight => "knobTR",
            Self::CenterRight => "knobCR",
            Self::BottomRight => "knobBR",
        }
    }
}

impl fmt::Display for Knob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Knob {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.id() == s)
            .ok_or_else(|| format!("unknown knob '{s}'"))
    }
}

/// Input emitted by the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    /// A hardware button went down (profile buttons are 0-7).
    ButtonDown { id: u8 },
    /// One or more touch keys were touched.
    TouchStart { keys: Vec<u8> },
    /// A knob turned by `delta` detents.
    Rotate { knob: Knob, delta: i32 },
    /// The device went away.
    Disconnected { reason: Option<String> },
}

/// Connection retry options.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Bound on discovery and on the connect handshake, each.
    pub connect_timeout: Duration,
    /// Delay after a failed connection attempt (default: 3000ms).
    pub retry_delay: Duration,
    /// Delay after a disconnect before reconnecting (default: 2000ms).
    pub reconnect_delay: Duration,
    /// Backoff factor applied to `retry_delay` on consecutive failures (default: 1.0).
    pub backoff_factor: f32,
    /// Maximum delay cap (default: 10000ms).
    pub max_delay: Duration,
    /// Stop after this many connection attempts (default: unbounded).
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(7),
            retry_delay: Duration::from_millis(3000),
            reconnect_delay: Duration::from_millis(2000),
            backoff_factor: 1.0,
            max_delay: Duration::from_millis(10000),
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before the attempt following `failures` consecutive failures.
    pub fn delay_after(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(16) as i32;
        let secs = self.retry_delay.as_secs_f32() * self.backoff_factor.powi(exponent);
        Duration::try_from_secs_f32(secs.min(self.max_delay.as_secs_f32()))
            .unwrap_or(self.max_delay)
    }
}
