//! On-disk configuration store with an mtime-validated in-memory cache.
//!
//! All access goes through one async mutex, so a read-repair-persist or a
//! write-then-stat sequence is never interleaved with another caller.

use std::path::Path;
use std::time::SystemTime;

use serde_json::Value;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::normalize::normalize_lenient;
use super::path::StorePaths;
use super::schema::Configuration;
use crate::error::Result;

/// Configuration plus the repairs made while loading it.
#[derive(Debug, Clone)]
pub struct ReadOutcome {
    pub config: Configuration,
    pub issues: Vec<String>,
}

#[derive(Debug, Default)]
struct Cache {
    config: Option<Configuration>,
    mtime: Option<SystemTime>,
}

/// Owner of the canonical configuration document.
#[derive(Debug)]
pub struct ConfigStore {
    paths: StorePaths,
    cache: Mutex<Cache>,
}

impl ConfigStore {
    pub fn new(paths: StorePaths) -> Self {
        Self {
            paths,
            cache: Mutex::new(Cache::default()),
        }
    }

    pub const fn paths(&self) -> &StorePaths {
        &self.paths
    }

    /// Create the storage directories and a default document if absent.
    #[instrument(skip(self), fields(dir = %self.paths.config_dir().display()))]
    pub async fn ensure(&self) -> Result<()> {
        fs::create_dir_all(self.paths.config_dir()).await?;
        fs::create_dir_all(self.paths.icons_dir()).await?;
        let file = self.paths.config_file();
        if fs::try_exists(&file).await? {
            debug!("Configuration file present");
            return Ok(());
        }
        let _guard = self.cache.lock().await;
        persist(&file, &Configuration::default()).await?;
        info!(path = %file.display(), "Created default configuration");
        Ok(())
    }

    /// Load the document, repairing it if needed. Never fails: unreadable or
    /// unparsable files are replaced by defaults.
    pub async fn read(&self) -> ReadOutcome {
        let mut cache = self.cache.lock().await;
        let file = self.paths.config_file();

        if let Some(config) = fresh(&cache, &file).await {
            return ReadOutcome {
                config,
                issues: Vec::new(),
            };
        }

        let (config, issues) = match fs::read_to_string(&file).await {
            Err(e) => {
                warn!(path = %file.display(), error = %e, "Configuration unreadable, using defaults");
                let issue = format!("Configuration file unreadable ({e}), defaults created.");
                (Configuration::default(), vec![issue])
            }
            Ok(text) => match serde_json::from_str::<Value>(&text) {
                Err(e) => {
                    warn!(path = %file.display(), error = %e, "Configuration is not valid JSON, using defaults");
                    let issue = format!("Configuration file is not valid JSON ({e}), defaults applied.");
                    (Configuration::default(), vec![issue])
                }
                Ok(value) => {
                    let normalized = normalize_lenient(&value);
                    (normalized.config, normalized.issues)
                }
            },
        };

        if !issues.is_empty() {
            if let Err(e) = persist(&file, &config).await {
                warn!(error = %e, "Could not persist repaired configuration");
            }
        }

        cache.mtime = modified(&file).await;
        cache.config = Some(config.clone());
        ReadOutcome { config, issues }
    }

    /// Persist a configuration verbatim. Callers must pass a document that
    /// already satisfies the schema invariants.
    pub async fn write(&self, config: &Configuration) -> Result<()> {
        let mut cache = self.cache.lock().await;
        let file = self.paths.config_file();
        persist(&file, config).await?;
        cache.mtime = modified(&file).await;
        cache.config = Some(config.clone());
        debug!(active = %config.active_profile, "Configuration written");
        Ok(())
    }

    /// Cached document if the file is unchanged, otherwise a full read.
    pub async fn current(&self) -> Configuration {
        {
            let cache = self.cache.lock().await;
            if let Some(config) = fresh(&cache, &self.paths.config_file()).await {
                return config;
            }
        }
        self.read().await.config
    }
}

async fn fresh(cache: &Cache, file: &Path) -> Option<Configuration> {
    let config = cache.config.as_ref()?;
    let recorded = cache.mtime?;
    (modified(file).await? == recorded).then(|| config.clone())
}

async fn modified(file: &Path) -> Option<SystemTime> {
    fs::metadata(file).await.ok()?.modified().ok()
}

/// Replace the whole document: write a sibling temp file, then rename.
async fn persist(file: &Path, config: &Configuration) -> Result<()> {
    let text = serde_json::to_string_pretty(config)
        .map_err(|e| crate::error::LdError::ConfigParse(e.to_string()))?;
    let tmp = file.with_extension("json.tmp");
    fs::write(&tmp, text).await?;
    fs::rename(&tmp, file).await?;
    Ok(())
}
