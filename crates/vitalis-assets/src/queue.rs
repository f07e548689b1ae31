//! Priority queue of pending asset loads.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rustc_hash::FxHashMap;

use crate::quality::AssetKey;

#[derive(Clone, Debug)]
struct QueueEntry {
    key: AssetKey,
    priority: f32,
    /// Stale entries left behind by re-pushes and removals are skipped on pop.
    generation: u64,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    /// Higher priority first, then cheaper tiers, then oldest.
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .total_cmp(&other.priority)
            .then_with(|| other.key.quality.cmp(&self.key.quality))
            .then_with(|| other.generation.cmp(&self.generation))
    }
}

/// Loads waiting for a worker, ordered by region importance.
#[derive(Debug, Default)]
pub struct LoadQueue {
    heap: BinaryHeap<QueueEntry>,
    live: FxHashMap<AssetKey, (u64, f32)>,
    next_generation: u64,
}

impl LoadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a load or change the priority of a queued one.
    pub fn push(&mut self, key: AssetKey, priority: f32) {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.live.insert(key, (generation, priority));
        self.heap.push(QueueEntry {
            key,
            priority,
            generation,
        });
    }

    /// Remove and return the most important load with its priority.
    pub fn pop(&mut self) -> Option<(AssetKey, f32)> {
        while let Some(entry) = self.heap.pop() {
            if let Some(&(generation, priority)) = self.live.get(&entry.key)
                && generation == entry.generation
            {
                self.live.remove(&entry.key);
                return Some((entry.key, priority));
            }
        }
        None
    }

    pub fn remove(&mut self, key: AssetKey) -> bool {
        self.live.remove(&key).is_some()
    }

    pub fn contains(&self, key: AssetKey) -> bool {
        self.live.contains_key(&key)
    }

    pub fn priority_of(&self, key: AssetKey) -> Option<f32> {
        self.live.get(&key).map(|&(_, p)| p)
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
        self.live.clear();
    }
}
