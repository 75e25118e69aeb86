//! Memoization of resolved icons, including failed lookups.

use std::collections::HashMap;
use std::sync::Mutex;

use image::RgbaImage;
use tracing::{debug, trace};

/// Where an icon came from; also the unit of invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IconSource {
    /// User upload under `icons/`.
    Custom,
    /// Remote favicon for a domain.
    Favicon,
    /// Icon extracted from an executable.
    App,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    source: IconSource,
    identity: String,
    size: u32,
}

/// Shared icon cache keyed by `(source, identity, key size)`.
///
/// A stored `None` records that resolution failed, so the lookup is not
/// retried until the entry is cleared.
#[derive(Debug, Default)]
pub struct IconCache {
    entries: Mutex<HashMap<CacheKey, Option<RgbaImage>>>,
}

impl IconCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` on a miss; `Some(None)` for a memoized failure.
    ///
    /// Hits hand out a copy so callers can't disturb the cached image.
    pub fn get(&self, source: IconSource, identity: &str, size: u32) -> Option<Option<RgbaImage>> {
        let key = CacheKey {
            source,
            identity: identity.to_string(),
            size,
        };
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let hit = entries.get(&key).cloned();
        if hit.is_some() {
            trace!(?source, identity, size, "Icon cache hit");
        }
        hit
    }

    pub fn insert(&self, source: IconSource, identity: &str, size: u32, icon: Option<RgbaImage>) {
        let key = CacheKey {
            source,
            identity: identity.to_string(),
            size,
        };
        trace!(?source, identity, size, negative = icon.is_none(), "Icon cached");
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, icon);
    }

    /// Drop every entry of one source.
    pub fn clear_source(&self, source: IconSource) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|k, _| k.source != source);
        debug!(?source, removed = before - entries.len(), "Icon cache cleared");
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
