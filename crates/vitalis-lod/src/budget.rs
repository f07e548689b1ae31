//! The global triangle budget.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use vitalis_geometry::StructureId;

/// Device class the triangle budget is derived from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlatformProfile {
    #[default]
    Mobile,
    Tablet,
    Desktop,
}

impl PlatformProfile {
    /// Triangles per frame this device class can afford.
    pub fn triangle_budget(self) -> u64 {
        match self {
            PlatformProfile::Mobile => 500_000,
            PlatformProfile::Tablet => 1_000_000,
            PlatformProfile::Desktop => 2_000_000,
        }
    }
}

/// Per-frame triangle reservations.
///
/// `allocated() <= total()` holds after every call; a reservation that would break it
/// is refused and leaves the budget unchanged.
#[derive(Clone, Debug)]
pub struct TriangleBudget {
    total: u64,
    allocated: u64,
    allocations: FxHashMap<StructureId, u32>,
}

impl TriangleBudget {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            allocated: 0,
            allocations: FxHashMap::default(),
        }
    }

    pub fn for_platform(profile: PlatformProfile) -> Self {
        Self::new(profile.triangle_budget())
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn allocated(&self) -> u64 {
        self.allocated
    }

    pub fn remaining(&self) -> u64 {
        self.total - self.allocated
    }

    /// Triangles currently reserved for `id` (0 if none).
    pub fn allocation(&self, id: StructureId) -> u32 {
        self.allocations.get(&id).copied().unwrap_or(0)
    }

    pub fn allocations(&self) -> impl Iterator<Item = (StructureId, u32)> + '_ {
        self.allocations.iter().map(|(id, tris)| (*id, *tris))
    }

    /// Change the total. Shrinking below the current reservations clears them all.
    pub fn set_total(&mut self, total: u64) {
        self.total = total;
        if self.allocated > total {
            self.clear();
        }
    }

    /// Reserve `triangles` for `id`, replacing any previous reservation for it.
    /// Returns `false` (and changes nothing) if the budget cannot cover it.
    pub fn try_reserve(&mut self, id: StructureId, triangles: u32) -> bool {
        let previous = u64::from(self.allocation(id));
        let after = self.allocated - previous + u64::from(triangles);
        if after > self.total {
            return false;
        }
        self.allocated = after;
        self.allocations.insert(id, triangles);
        true
    }

    /// Release the reservation for `id`.
    pub fn release(&mut self, id: StructureId) {
        if let Some(triangles) = self.allocations.remove(&id) {
            self.allocated -= u64::from(triangles);
        }
    }

    pub fn clear(&mut self) {
        self.allocations.clear();
        self.allocated = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reservations that would exceed the total are refused without side effects.
    #[test]
    fn test_reservation_refused_when_over_total() {
        let mut budget = TriangleBudget::new(1000);
        assert!(budget.try_reserve(StructureId(0), 600));
        assert!(!budget.try_reserve(StructureId(1), 500));
        assert_eq!(budget.allocated(), 600);
        assert_eq!(budget.allocation(StructureId(1)), 0);
    }

    /// Re-reserving replaces the previous amount.
    #[test]
    fn test_re_reserve_replaces() {
        let mut budget = TriangleBudget::new(1000);
        assert!(budget.try_reserve(StructureId(0), 600));
        assert!(budget.try_reserve(StructureId(0), 900));
        assert_eq!(budget.allocated(), 900);
        budget.release(StructureId(0));
        assert_eq!(budget.allocated(), 0);
    }

    #[test]
    fn test_platform_budgets() {
        assert_eq!(TriangleBudget::for_platform(PlatformProfile::Mobile).total(), 500_000);
        assert_eq!(PlatformProfile::Desktop.triangle_budget(), 2_000_000);
    }

    /// Shrinking the total below current use drops every reservation.
    #[test]
    fn test_shrink_total_clears() {
        let mut budget = TriangleBudget::new(1000);
        budget.try_reserve(StructureId(0), 800);
        budget.set_total(500);
        assert_eq!(budget.allocated(), 0);
        assert!(budget.allocated() <= budget.total());
    }
}
