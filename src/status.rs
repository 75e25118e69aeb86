//! Human-readable status line and load warnings.
//!
//! The latest event is kept as `[HH:MM:SS] text` for whoever asks (the API
//! layer, the CLI), and every update is also logged.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Local;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Default)]
struct Inner {
    last: String,
    warnings: Vec<String>,
}

/// Last event plus the issues reported by the latest configuration read.
#[derive(Debug, Default)]
pub struct StatusLine {
    inner: RwLock<Inner>,
}

/// Point-in-time copy of the status line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub last_event: String,
    pub warnings: Vec<String>,
}

impl StatusLine {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Record a new event, stamped with local time.
    pub fn set(&self, text: impl Into<String>) {
        let text = text.into();
        info!(event = %text, "Status");
        self.write().last = format!("[{}] {text}", Local::now().format("%H:%M:%S"));
    }

    /// The last recorded event, empty before the first one.
    pub fn last(&self) -> String {
        self.read().last.clone()
    }

    /// Replace the held configuration warnings.
    pub fn set_warnings(&self, warnings: Vec<String>) {
        self.write().warnings = warnings;
    }

    pub fn warnings(&self) -> Vec<String> {
        self.read().warnings.clone()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let inner = self.read();
        StatusSnapshot {
            last_event: inner.last.clone(),
            warnings: inner.warnings.clone(),
        }
    }
}
