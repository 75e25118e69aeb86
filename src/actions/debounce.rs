//! Per-key press debouncing.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

/// Minimum spacing between two accepted presses of the same key.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(250);

/// Remembers when each key was last accepted.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    last_accepted: Mutex<HashMap<u8, Instant>>,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEBOUNCE_WINDOW)
    }
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: Mutex::new(HashMap::new()),
        }
    }

    /// Accept or reject a press of `key` happening now.
    pub fn accept(&self, key: u8) -> bool {
        self.accept_at(key, Instant::now())
    }

    /// Accept or reject a press of `key` at `now`. Rejected presses don't
    /// move the window.
    pub fn accept_at(&self, key: u8, now: Instant) -> bool {
        let mut last = self
            .last_accepted
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if last
            .get(&key)
            .is_some_and(|prev| now.saturating_duration_since(*prev) < self.window)
        {
            trace!(key, "Press debounced");
            return false;
        }
        last.insert(key, now);
        true
    }
}
