//! Mock gateway implementation for unit testing.
//!
//! This module provides a mock control surface that records all
//! operations and supports assertions for testing.
//!
//! # Example
//!
//! ```rust,ignore
//! use loopdeck::device::mock::{MockGateway, Operation};
//!
//! let mock = MockGateway::live();
//! mock.set_button_color(0, "#ffffff").await.unwrap();
//! mock.assert_contains(&Operation::SetButtonColor { id: 0, color: "#ffffff".into() });
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use super::{Connection, Connector, DeviceEvent, DeviceGateway, DeviceInfo, Discovered};
use crate::error::{LdError, Result};
use crate::render::KeyBuffer;

/// Recorded operation for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    DrawKey { key: u8, buffer: KeyBuffer },
    DrawScreen { id: String },
    SetBrightness { percent: u8 },
    SetButtonColor { id: u8, color: String },
}

/// Configuration for mock behavior.
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Keys whose draw calls fail.
    pub failing_keys: Vec<u8>,
    /// Buttons whose LED calls fail.
    pub failing_buttons: Vec<u8>,
}

/// Mock gateway for testing without real hardware.
pub struct MockGateway {
    info: DeviceInfo,
    operation_log: Mutex<Vec<Operation>>,
    config: MockConfig,
    connected: AtomicBool,
}

impl MockGateway {
    pub fn new(info: DeviceInfo) -> Self {
        debug!(kind = %info.kind, "Creating mock gateway");
        Self {
            info,
            operation_log: Mutex::new(Vec::new()),
            config: MockConfig::default(),
            connected: AtomicBool::new(true),
        }
    }

    /// Mock with the standard 12-key layout.
    pub fn live() -> Self {
        Self::new(DeviceInfo::live())
    }

    #[must_use]
    pub fn with_config(mut self, config: MockConfig) -> Self {
        self.config = config;
        self
    }

    /// Make every subsequent call fail.
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    // === Assertions ===

    pub fn operations(&self) -> Vec<Operation> {
        self.operation_log.lock().unwrap().clone()
    }

    /// Buffers drawn to one key, in order.
    pub fn draws_for(&self, key: u8) -> Vec<KeyBuffer> {
        self.operations()
            .into_iter()
            .filter_map(|op| match op {
                Operation::DrawKey { key: k, buffer } if k == key => Some(buffer),
                _ => None,
            })
            .collect()
    }

    /// LED colors set, in order.
    pub fn button_colors(&self) -> Vec<(u8, String)> {
        self.operations()
            .into_iter()
            .filter_map(|op| match op {
                Operation::SetButtonColor { id, color } => Some((id, color)),
                _ => None,
            })
            .collect()
    }

    /// Assert a specific operation was performed at least once.
    ///
    /// # Panics
    ///
    /// Panics if the operation was not found.
    pub fn assert_contains(&self, expected: &Operation) {
        let ops = self.operations();
        assert!(
            ops.contains(expected),
            "Expected operation {expected:?} not found in: {ops:#?}",
        );
    }

    /// Assert no operations were performed.
    ///
    /// # Panics
    ///
    /// Panics if any operations were recorded.
    pub fn assert_no_operations(&self) {
        let ops = self.operations();
        assert!(ops.is_empty(), "Expected no operations, but found: {ops:#?}");
    }

    pub fn clear_operations(&self) {
        self.operation_log.lock().unwrap().clear();
    }

    // === Internal Helpers ===

    fn record_op(&self, op: Operation) {
        trace!(?op, "Recording operation");
        self.operation_log.lock().unwrap().push(op);
    }

    fn check_connected(&self) -> Result<()> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(LdError::DeviceCommunication("Mock device disconnected".to_string()))
        }
    }
}

#[async_trait]
impl DeviceGateway for MockGateway {
    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    async fn draw_key(&self, key: u8, buffer: &KeyBuffer) -> Result<()> {
        self.check_connected()?;
        if self.config.failing_keys.contains(&key) {
            return Err(LdError::DeviceCommunication(format!(
                "Mock key {key} configured to fail"
            )));
        }
        if key >= self.info.key_count {
            return Err(LdError::InvalidKeyIndex {
                index: i64::from(key),
                max: self.info.key_count,
                max_idx: self.info.key_count - 1,
            });
        }
        self.record_op(Operation::DrawKey {
            key,
            buffer: buffer.clone(),
        });
        Ok(())
    }

    async fn draw_screen(&self, id: &str, _buffer: &KeyBuffer) -> Result<()> {
        self.check_connected()?;
        self.record_op(Operation::DrawScreen { id: id.to_string() });
        Ok(())
    }

    async fn set_brightness(&self, level: f32) -> Result<()> {
        self.check_connected()?;
        self.record_op(Operation::SetBrightness {
            percent: (level.clamp(0.0, 1.0) * 100.0).round() as u8,
        });
        Ok(())
    }

    async fn set_button_color(&self, id: u8, color: &str) -> Result<()> {
        self.check_connected()?;
        if self.config.failing_buttons.contains(&id) {
            return Err(LdError::DeviceCommunication(format!(
                "Mock button {id} configured to fail"
            )));
        }
        self.record_op(Operation::SetButtonColor {
            id,
            color: color.to_string(),
        });
        Ok(())
    }
}

/// Scripted connector: each `connect` pops the next outcome.
///
/// `Ok` outcomes hand out a fresh [`MockGateway`] and return the sender side
/// of its event channel through [`MockConnector::take_sender`].
pub struct MockConnector {
    outcomes: Mutex<VecDeque<Result<()>>>,
    senders: Mutex<VecDeque<mpsc::Sender<DeviceEvent>>>,
    gateways: Mutex<Vec<Arc<MockGateway>>>,
    attempts: AtomicUsize,
}

impl MockConnector {
    /// Connector whose attempts succeed or fail in the given order; once the
    /// script runs out, no device is present.
    pub fn scripted(outcomes: Vec<Result<()>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            senders: Mutex::new(VecDeque::new()),
            gateways: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Event sender of the oldest not-yet-taken connection.
    pub fn take_sender(&self) -> Option<mpsc::Sender<DeviceEvent>> {
        self.senders.lock().unwrap().pop_front()
    }

    /// Gateways handed out so far.
    pub fn gateways(&self) -> Vec<Arc<MockGateway>> {
        self.gateways.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn discover(&self) -> Result<Discovered> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Ok(Discovered {
            info: DeviceInfo::live(),
            path: "mock://0".to_string(),
        })
    }

    async fn connect(&self, device: Discovered) -> Result<Connection> {
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(LdError::NotConnected));
        outcome?;

        let gateway = Arc::new(MockGateway::new(device.info));
        let (tx, rx) = mpsc::channel(32);
        self.senders.lock().unwrap().push_back(tx);
        self.gateways.lock().unwrap().push(Arc::clone(&gateway));
        Ok(Connection {
            gateway,
            events: rx,
        })
    }
}
