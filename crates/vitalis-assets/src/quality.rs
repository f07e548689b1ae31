//! Model quality tiers and device memory tiers.

use serde::{Deserialize, Serialize};
use vitalis_geometry::BodyRegion;

/// Fidelity of a region model, ordered from cheapest to best.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum ModelQuality {
    /// Procedural primitives. Always available, never loaded.
    #[default]
    Preview,
    /// Compressed GLB.
    Standard,
    /// Full-fidelity GLB.
    High,
}

impl ModelQuality {
    pub const ALL: [ModelQuality; 3] = [
        ModelQuality::Preview,
        ModelQuality::Standard,
        ModelQuality::High,
    ];

    /// Tiers that come from loaded assets, cheapest first.
    pub const LOADABLE: [ModelQuality; 2] = [ModelQuality::Standard, ModelQuality::High];

    pub fn name(self) -> &'static str {
        match self {
            ModelQuality::Preview => "preview",
            ModelQuality::Standard => "standard",
            ModelQuality::High => "high",
        }
    }

    pub fn is_loadable(self) -> bool {
        self != ModelQuality::Preview
    }
}

impl std::fmt::Display for ModelQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Resident model memory allowed on a device class.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryTier {
    Low,
    #[default]
    Medium,
    High,
}

impl MemoryTier {
    pub fn budget_bytes(self) -> u64 {
        const MB: u64 = 1024 * 1024;
        match self {
            MemoryTier::Low => 75 * MB,
            MemoryTier::Medium => 150 * MB,
            MemoryTier::High => 300 * MB,
        }
    }
}

/// One loadable asset: a region at a quality tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetKey {
    pub region: BodyRegion,
    pub quality: ModelQuality,
}

impl AssetKey {
    pub fn new(region: BodyRegion, quality: ModelQuality) -> Self {
        Self { region, quality }
    }
}

impl std::fmt::Display for AssetKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.region, self.quality)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_ordering() {
        assert!(ModelQuality::Preview < ModelQuality::Standard);
        assert!(ModelQuality::Standard < ModelQuality::High);
        assert!(!ModelQuality::Preview.is_loadable());
    }

    /// Memory tiers are 75, 150 and 300 MB.
    #[test]
    fn test_memory_tier_budgets() {
        assert_eq!(MemoryTier::Low.budget_bytes(), 75 * 1024 * 1024);
        assert_eq!(MemoryTier::Medium.budget_bytes(), 150 * 1024 * 1024);
        assert_eq!(MemoryTier::High.budget_bytes(), 300 * 1024 * 1024);
    }
}
