//! Installed application catalog with a short-lived cache.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use super::{OsAutomation, run_script, scripts};
use crate::error::{LdError, Result};

/// How long a discovered catalog is reused.
pub const CATALOG_TTL: Duration = Duration::from_secs(60);

const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(15);

/// One launchable application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppEntry {
    pub name: String,
    pub command: String,
}

#[derive(Debug, Default)]
struct Cached {
    apps: Vec<AppEntry>,
    at: Option<Instant>,
}

/// Cached application discovery.
#[derive(Debug, Default)]
pub struct AppCatalog {
    cached: Mutex<Cached>,
}

impl AppCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discovered applications, sorted by name.
    ///
    /// A failed discovery is cached as an empty list for the TTL and the
    /// error returned once so the caller can report it.
    pub async fn list(&self, automation: &dyn OsAutomation) -> Result<Vec<AppEntry>> {
        let mut cached = self.cached.lock().await;
        if cached.at.is_some_and(|at| at.elapsed() < CATALOG_TTL) {
            debug!(count = cached.apps.len(), "App catalog served from cache");
            return Ok(cached.apps.clone());
        }

        cached.at = Some(Instant::now());
        cached.apps.clear();
        if !automation.supported() {
            return Ok(Vec::new());
        }

        let raw = run_script(automation, scripts::APP_DISCOVERY, &[], DISCOVERY_TIMEOUT).await?;
        cached.apps = parse_catalog(&raw)?;
        info!(count = cached.apps.len(), "App catalog refreshed");
        Ok(cached.apps.clone())
    }
}

/// Parse the discovery output. A single result arrives as a bare object.
fn parse_catalog(raw: &str) -> Result<Vec<AppEntry>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    let parsed: Value =
        serde_json::from_str(raw).map_err(|e| LdError::Automation(format!("app list: {e}")))?;
    let items = match parsed {
        Value::Array(items) => items,
        obj @ Value::Object(_) => vec![obj],
        _ => Vec::new(),
    };
    let apps = items
        .iter()
        .filter_map(|item| {
            let name = item.get("name")?.as_str()?.trim();
            let command = item.get("command")?.as_str()?.trim();
            (!name.is_empty() && !command.is_empty()).then(|| AppEntry {
                name: name.to_string(),
                command: command.to_string(),
            })
        })
        .collect();
    Ok(apps)
}
