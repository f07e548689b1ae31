//! Decoded models cached by URL.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::model::{ModelData, ModelInstance};
use crate::quality::AssetKey;

#[derive(Debug)]
struct CacheEntry {
    key: AssetKey,
    model: Arc<ModelData>,
    last_used: u64,
}

/// Owned by the loader and only touched from the render thread.
#[derive(Debug, Default)]
pub struct ModelCache {
    entries: FxHashMap<String, CacheEntry>,
}

impl ModelCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: String, key: AssetKey, model: Arc<ModelData>, frame: u64) {
        self.entries.insert(
            url,
            CacheEntry {
                key,
                model,
                last_used: frame,
            },
        );
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    pub fn get(&self, url: &str) -> Option<&Arc<ModelData>> {
        self.entries.get(url).map(|e| &e.model)
    }

    pub fn touch(&mut self, url: &str, frame: u64) {
        if let Some(entry) = self.entries.get_mut(url) {
            entry.last_used = entry.last_used.max(frame);
        }
    }

    pub fn last_used(&self, url: &str) -> Option<u64> {
        self.entries.get(url).map(|e| e.last_used)
    }

    /// A fresh instance sharing the cached geometry.
    pub fn instantiate(&mut self, url: &str, frame: u64) -> Option<ModelInstance> {
        let entry = self.entries.get_mut(url)?;
        entry.last_used = entry.last_used.max(frame);
        Some(ModelInstance::new(url.to_string(), Arc::clone(&entry.model)))
    }

    /// Handles to the model held outside the cache.
    pub fn outstanding_refs(&self, url: &str) -> usize {
        self.entries
            .get(url)
            .map_or(0, |e| Arc::strong_count(&e.model) - 1)
    }

    pub fn remove(&mut self, url: &str) -> Option<Arc<ModelData>> {
        self.entries.remove(url).map(|e| e.model)
    }

    /// `(url, key, last_used)` for every entry.
    pub fn iter(&self) -> impl Iterator<Item = (&str, AssetKey, u64)> {
        self.entries
            .iter()
            .map(|(url, e)| (url.as_str(), e.key, e.last_used))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
