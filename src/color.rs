//! Hex color parsing and packing into the device's RGB565 pixel format.

use serde::{Deserialize, Serialize};
use tracing::trace;

/// Fallback fill for keys.
pub const BLACK: &str = "#000000";

/// Fallback profile indicator color.
pub const WHITE: &str = "#ffffff";

/// An 8-bit-per-channel RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Self = Self::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a strict `#rrggbb` string. Anything else yields `None`.
    pub fn from_hex(text: &str) -> Option<Self> {
        if !is_hex_color(text) {
            return None;
        }
        let bytes = hex::decode(&text[1..]).ok()?;
        Some(Self::new(bytes[0], bytes[1], bytes[2]))
    }

    /// Parse leniently: surrounding whitespace is ignored and invalid input is black.
    pub fn from_hex_lenient(text: &str) -> Self {
        Self::from_hex(text.trim()).unwrap_or(Self::BLACK)
    }

    /// Pack into RGB565 (5 bits red, 6 green, 5 blue), truncating low bits.
    pub const fn to_rgb565(self) -> u16 {
        rgb565(self.r, self.g, self.b)
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Pack an RGB triple into RGB565.
pub const fn rgb565(r: u8, g: u8, b: u8) -> u16 {
    ((r as u16 >> 3) << 11) | ((g as u16 >> 2) << 5) | (b as u16 >> 3)
}

/// Unpack RGB565 back to 8-bit channels (low bits replicated).
pub const fn unpack_rgb565(value: u16) -> Rgb {
    let r5 = ((value >> 11) & 0x1f) as u8;
    let g6 = ((value >> 5) & 0x3f) as u8;
    let b5 = (value & 0x1f) as u8;
    Rgb::new(
        (r5 << 3) | (r5 >> 2),
        (g6 << 2) | (g6 >> 4),
        (b5 << 3) | (b5 >> 2),
    )
}

/// True for exactly `#` followed by six hex digits.
pub fn is_hex_color(text: &str) -> bool {
    text.len() == 7
        && text.starts_with('#')
        && text[1..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Trim and lowercase a hex color, or return `fallback` if it is malformed.
pub fn normalize_hex_or(text: &str, fallback: &str) -> String {
    let trimmed = text.trim();
    if is_hex_color(trimmed) {
        trimmed.to_ascii_lowercase()
    } else {
        trace!(input = %text, fallback, "Malformed hex color replaced");
        fallback.to_string()
    }
}

/// Trim and lowercase a hex color, falling back to black.
pub fn normalize_hex(text: &str) -> String {
    normalize_hex_or(text, BLACK)
}

/// Pack a hex color straight to RGB565; malformed input packs as black.
pub fn hex_to_rgb565(text: &str) -> u16 {
    Rgb::from_hex_lenient(text).to_rgb565()
}
