//! Resident model memory accounting and LRU eviction selection.

use rustc_hash::FxHashMap;

use crate::quality::{AssetKey, MemoryTier};

/// Tracks bytes held by loaded assets and bytes reserved for loads in flight.
///
/// Loads reserve their manifest estimate when dispatched so that concurrent downloads
/// cannot jointly overshoot the limit.
#[derive(Clone, Debug)]
pub struct MemoryBudget {
    limit: u64,
    resident: FxHashMap<AssetKey, u64>,
    reserved: FxHashMap<AssetKey, u64>,
    resident_total: u64,
    reserved_total: u64,
}

impl MemoryBudget {
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            resident: FxHashMap::default(),
            reserved: FxHashMap::default(),
            resident_total: 0,
            reserved_total: 0,
        }
    }

    pub fn for_tier(tier: MemoryTier) -> Self {
        Self::new(tier.budget_bytes())
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Lowering the limit never evicts by itself; the next dispatch does.
    pub fn set_limit(&mut self, limit: u64) {
        self.limit = limit;
    }

    pub fn resident_bytes(&self) -> u64 {
        self.resident_total
    }

    pub fn reserved_bytes(&self) -> u64 {
        self.reserved_total
    }

    /// Resident plus reserved bytes.
    pub fn used(&self) -> u64 {
        self.resident_total + self.reserved_total
    }

    /// Whether admitting `incoming` more bytes would break the limit.
    pub fn would_exceed(&self, incoming: u64) -> bool {
        self.used().saturating_add(incoming) > self.limit
    }

    /// Bytes that must be freed before `incoming` fits.
    pub fn shortfall(&self, incoming: u64) -> u64 {
        self.used()
            .saturating_add(incoming)
            .saturating_sub(self.limit)
    }

    /// Reserve bytes for a load that is about to start.
    pub fn reserve(&mut self, key: AssetKey, bytes: u64) {
        if let Some(old) = self.reserved.insert(key, bytes) {
            self.reserved_total -= old;
        }
        self.reserved_total += bytes;
    }

    pub fn release_reservation(&mut self, key: AssetKey) {
        if let Some(bytes) = self.reserved.remove(&key) {
            self.reserved_total -= bytes;
        }
    }

    /// Turn a reservation into resident usage. The larger of the estimate and the
    /// measured size is recorded.
    pub fn commit(&mut self, key: AssetKey, measured: u64) -> u64 {
        let estimate = self.reserved.get(&key).copied().unwrap_or(0);
        self.release_reservation(key);
        let bytes = estimate.max(measured);
        if let Some(old) = self.resident.insert(key, bytes) {
            self.resident_total -= old;
        }
        self.resident_total += bytes;
        bytes
    }

    pub fn on_evicted(&mut self, key: AssetKey) {
        if let Some(bytes) = self.resident.remove(&key) {
            self.resident_total -= bytes;
        }
    }

    pub fn resident_usage(&self, key: AssetKey) -> Option<u64> {
        self.resident.get(&key).copied()
    }
}

/// A resident asset that may be evicted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EvictionCandidate {
    pub key: AssetKey,
    pub bytes: u64,
    /// Frame the asset was last needed.
    pub last_used: u64,
}

/// Pick least-recently-used candidates until `needed` bytes are covered.
///
/// Returns nothing when the candidates cannot cover `needed` between them, so a load
/// that cannot fit never costs other regions their models.
pub fn select_evictions(candidates: &[EvictionCandidate], needed: u64) -> Vec<AssetKey> {
    if needed == 0 {
        return Vec::new();
    }
    let available: u64 = candidates.iter().map(|c| c.bytes).sum();
    if available < needed {
        return Vec::new();
    }

    let mut ordered: Vec<_> = candidates.to_vec();
    ordered.sort_by_key(|c| (c.last_used, c.key));

    let mut freed = 0u64;
    let mut evictions = Vec::new();
    for candidate in ordered {
        if freed >= needed {
            break;
        }
        freed += candidate.bytes;
        evictions.push(candidate.key);
    }
    evictions
}

#[cfg(test)]
mod tests {
    use vitalis_geometry::BodyRegion;

    use super::*;
    use crate::quality::ModelQuality;

    fn key(region: BodyRegion) -> AssetKey {
        AssetKey::new(region, ModelQuality::Standard)
    }

    /// Reservations count against the limit until committed or released.
    #[test]
    fn test_reserve_commit_release() {
        let mut budget = MemoryBudget::new(1000);
        budget.reserve(key(BodyRegion::Head), 400);
        assert_eq!(budget.used(), 400);
        assert!(budget.would_exceed(601));
        assert!(!budget.would_exceed(600));

        assert_eq!(budget.commit(key(BodyRegion::Head), 300), 400);
        assert_eq!(budget.reserved_bytes(), 0);
        assert_eq!(budget.resident_bytes(), 400);

        budget.reserve(key(BodyRegion::Neck), 100);
        budget.release_reservation(key(BodyRegion::Neck));
        assert_eq!(budget.used(), 400);

        budget.on_evicted(key(BodyRegion::Head));
        assert_eq!(budget.used(), 0);
    }

    #[test]
    fn test_shortfall() {
        let mut budget = MemoryBudget::new(1000);
        budget.reserve(key(BodyRegion::Head), 800);
        assert_eq!(budget.shortfall(100), 0);
        assert_eq!(budget.shortfall(300), 100);
    }

    /// The oldest assets go first, and only as many as needed.
    #[test]
    fn test_select_evictions_lru_order() {
        let candidates = [
            EvictionCandidate {
                key: key(BodyRegion::Head),
                bytes: 100,
                last_used: 30,
            },
            EvictionCandidate {
                key: key(BodyRegion::Neck),
                bytes: 100,
                last_used: 10,
            },
            EvictionCandidate {
                key: key(BodyRegion::Pelvis),
                bytes: 100,
                last_used: 20,
            },
        ];
        let evicted = select_evictions(&candidates, 150);
        assert_eq!(evicted, vec![key(BodyRegion::Neck), key(BodyRegion::Pelvis)]);
    }

    /// Candidates that cannot cover the shortfall are left alone.
    #[test]
    fn test_select_evictions_insufficient() {
        let candidates = [EvictionCandidate {
            key: key(BodyRegion::Head),
            bytes: 100,
            last_used: 0,
        }];
        assert!(select_evictions(&candidates, 150).is_empty());
        assert!(select_evictions(&candidates, 0).is_empty());
    }
}
