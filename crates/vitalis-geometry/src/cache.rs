//! Cache of generated LOD chains keyed by descriptor.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::descriptor::{GeometryDescriptor, LodChain};

/// Shares generated chains between structures with identical descriptors.
///
/// Entries are keyed by [`GeometryDescriptor::descriptor_key`]; the descriptor is kept
/// alongside so a key collision never returns the wrong chain.
#[derive(Default)]
pub struct LodGeneratorCache {
    chains: FxHashMap<u64, Vec<(GeometryDescriptor, Arc<LodChain>)>>,
    hits: u64,
    misses: u64,
}

impl LodGeneratorCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached chain for `descriptor`, generating it on first use.
    pub fn get_or_generate(&mut self, descriptor: &GeometryDescriptor) -> Arc<LodChain> {
        let bucket = self.chains.entry(descriptor.descriptor_key()).or_default();
        if let Some((_, chain)) = bucket.iter().find(|(d, _)| d == descriptor) {
            self.hits += 1;
            return Arc::clone(chain);
        }
        self.misses += 1;
        let chain = Arc::new(LodChain::generate(descriptor));
        bucket.push((descriptor.clone(), Arc::clone(&chain)));
        chain
    }

    /// Number of distinct chains stored.
    pub fn len(&self) -> usize {
        self.chains.values().map(Vec::len).sum()
    }

    /// Whether the cache holds no chains.
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// `(hits, misses)` since creation.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}
