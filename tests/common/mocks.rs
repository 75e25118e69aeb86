//! Recording collaborators for tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tracing::trace;

use loopdeck::actions::{Launcher, VolumeControl, VolumeReport};
use loopdeck::automation::OsAutomation;
use loopdeck::error::{LdError, Result};
use loopdeck::render::IconFetcher;

/// One call seen by [`RecordingAutomation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutomationCall {
    pub command: String,
    pub args: Vec<String>,
}

/// Automation surface that records every call and answers from a queue.
///
/// With no queued reply a call succeeds with empty output.
pub struct RecordingAutomation {
    supported: bool,
    calls: Mutex<Vec<AutomationCall>>,
    replies: Mutex<Vec<Result<String>>>,
}

impl RecordingAutomation {
    pub fn supported() -> Self {
        Self::with_support(true)
    }

    pub fn unsupported() -> Self {
        Self::with_support(false)
    }

    fn with_support(supported: bool) -> Self {
        Self {
            supported,
            calls: Mutex::new(Vec::new()),
            replies: Mutex::new(Vec::new()),
        }
    }

    /// Queue the reply for the next call (replies are used in order).
    pub fn reply(&self, reply: Result<String>) {
        self.replies.lock().unwrap().push(reply);
    }

    pub fn calls(&self) -> Vec<AutomationCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl OsAutomation for RecordingAutomation {
    fn supported(&self) -> bool {
        self.supported
    }

    async fn execute(&self, command: &str, args: &[String], _timeout: Duration) -> Result<String> {
        if !self.supported {
            return Err(LdError::Unsupported("OS automation"));
        }
        trace!(command, "Recorded automation call");
        self.calls.lock().unwrap().push(AutomationCall {
            command: command.to_string(),
            args: args.to_vec(),
        });
        let mut replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            Ok(String::new())
        } else {
            replies.remove(0)
        }
    }
}

/// What a [`RecordingLauncher`] was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launch {
    Program { program: String, args: Vec<String> },
    Url(String),
}

/// Launcher that records instead of spawning. Programs named in
/// `failing` fail to start.
#[derive(Default)]
pub struct RecordingLauncher {
    launches: Mutex<Vec<Launch>>,
    failing: Vec<String>,
}

impl RecordingLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(programs: &[&str]) -> Self {
        Self {
            launches: Mutex::new(Vec::new()),
            failing: programs.iter().map(ToString::to_string).collect(),
        }
    }

    pub fn launches(&self) -> Vec<Launch> {
        self.launches.lock().unwrap().clone()
    }
}

impl Launcher for RecordingLauncher {
    fn launch(&self, program: &str, args: &[String]) -> Result<()> {
        self.launches.lock().unwrap().push(Launch::Program {
            program: program.to_string(),
            args: args.to_vec(),
        });
        if self.failing.iter().any(|p| p == program) {
            return Err(LdError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{program} not found"),
            )));
        }
        Ok(())
    }

    fn open_url(&self, url: &str) -> Result<()> {
        self.launches.lock().unwrap().push(Launch::Url(url.to_string()));
        Ok(())
    }
}

/// Fetcher that serves canned bytes by URL and counts requests.
#[derive(Default)]
pub struct CountingFetcher {
    responses: HashMap<String, Vec<u8>>,
    requests: AtomicUsize,
    urls: Mutex<Vec<String>>,
}

impl CountingFetcher {
    /// Every request fails.
    pub fn offline() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn serving(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.responses.insert(url.to_string(), bytes);
        self
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl IconFetcher for CountingFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.to_string());
        self.responses
            .get(url)
            .cloned()
            .ok_or_else(|| LdError::Other(format!("{url}: offline")))
    }
}

/// Volume control that records `(target, step)` pairs.
#[derive(Default)]
pub struct RecordingVolume {
    adjustments: Mutex<Vec<(String, f64)>>,
}

impl RecordingVolume {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn adjustments(&self) -> Vec<(String, f64)> {
        self.adjustments.lock().unwrap().clone()
    }
}

#[async_trait]
impl VolumeControl for RecordingVolume {
    async fn adjust(&self, target: &str, step: f64) -> Result<VolumeReport> {
        self.adjustments
            .lock()
            .unwrap()
            .push((target.to_string(), step));
        Ok(VolumeReport {
            sessions: 1,
            volume: Some(50),
        })
    }
}
