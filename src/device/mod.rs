//! Device gateway abstraction for the control surface.
//!
//! The transport itself (USB/serial protocol, discovery) lives outside this
//! crate. Everything here talks to it through [`DeviceGateway`] and
//! [`Connector`], which keeps rendering and dispatch testable without
//! hardware.

mod info;
pub mod mock;
mod preview;

pub use info::{DeviceEvent, DeviceInfo, Knob, ReconnectPolicy};
pub use preview::{PreviewGateway, PreviewState};

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::render::KeyBuffer;

/// Output operations on a connected device.
///
/// # Implementation Notes
///
/// - Key indices are 0-based, left-to-right, top-to-bottom
/// - Key buffers are already sized to `info().key_size`
#[async_trait]
pub trait DeviceGateway: Send + Sync {
    /// Get device information.
    fn info(&self) -> &DeviceInfo;

    /// Replace the image of one touch key.
    async fn draw_key(&self, key: u8, buffer: &KeyBuffer) -> Result<()>;

    /// Replace the image of a whole screen region (e.g. `"left"`, `"center"`).
    async fn draw_screen(&self, id: &str, buffer: &KeyBuffer) -> Result<()>;

    /// Set display brightness (0.0 - 1.0).
    async fn set_brightness(&self, level: f32) -> Result<()>;

    /// Set the LED color of a hardware button (`#rrggbb`).
    async fn set_button_color(&self, id: u8, color: &str) -> Result<()>;
}

/// A device found by discovery but not yet connected.
#[derive(Debug, Clone)]
pub struct Discovered {
    pub info: DeviceInfo,
    pub path: String,
}

/// An open connection: the output side plus the inbound event stream.
pub struct Connection {
    pub gateway: Arc<dyn DeviceGateway>,
    pub events: mpsc::Receiver<DeviceEvent>,
}

/// Discovery and connection of devices.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn discover(&self) -> Result<Discovered>;

    async fn connect(&self, device: Discovered) -> Result<Connection>;
}
