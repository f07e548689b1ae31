//! Distance-based detail selection with configurable thresholds and hysteresis.

use serde::{Deserialize, Serialize};
use vitalis_geometry::DetailLevel;

/// Distance boundaries between detail levels, in scene units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LodThresholds {
    /// Closer than this renders at [`DetailLevel::Closeup`].
    pub near: f32,
    /// Closer than this (and not closer than `near`) renders at [`DetailLevel::Near`].
    pub medium: f32,
    /// Closer than this (and not closer than `medium`) renders at
    /// [`DetailLevel::Medium`]. Anything further is [`DetailLevel::Far`].
    pub far: f32,
}

impl Default for LodThresholds {
    fn default() -> Self {
        Self {
            near: 3.0,
            medium: 10.0,
            far: 20.0,
        }
    }
}

impl LodThresholds {
    /// Create custom thresholds.
    ///
    /// # Panics
    ///
    /// Panics if the thresholds are not positive and strictly increasing.
    pub fn custom(near: f32, medium: f32, far: f32) -> Self {
        let thresholds = Self { near, medium, far };
        assert!(near > 0.0, "thresholds must be positive");
        assert!(thresholds.is_valid(), "thresholds must be strictly increasing");
        thresholds
    }

    /// Whether the thresholds are finite, positive and strictly increasing.
    pub fn is_valid(&self) -> bool {
        [self.near, self.medium, self.far].iter().all(|t| t.is_finite())
            && 0.0 < self.near
            && self.near < self.medium
            && self.medium < self.far
    }

    /// The boundary between `level` and its next coarser level, or `None` for the
    /// coarsest level.
    pub fn boundary_below(&self, level: DetailLevel) -> Option<f32> {
        match level {
            DetailLevel::Closeup => Some(self.near),
            DetailLevel::Near => Some(self.medium),
            DetailLevel::Medium => Some(self.far),
            DetailLevel::Far => None,
        }
    }

    /// Gap between a boundary and the next finer boundary (or zero).
    fn gap_below(&self, level: DetailLevel) -> f32 {
        match level {
            DetailLevel::Closeup => self.near,
            DetailLevel::Near => self.medium - self.near,
            DetailLevel::Medium => self.far - self.medium,
            DetailLevel::Far => 0.0,
        }
    }
}

/// Width of the hysteresis band around each threshold.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum DeadBand {
    /// Fraction of the gap between a threshold and the next finer one.
    Fraction(f32),
    /// Fixed distance in scene units.
    Absolute(f32),
}

impl Default for DeadBand {
    fn default() -> Self {
        DeadBand::Fraction(0.1)
    }
}

impl DeadBand {
    pub fn is_valid(&self) -> bool {
        match *self {
            DeadBand::Fraction(f) => f.is_finite() && (0.0..1.0).contains(&f),
            DeadBand::Absolute(units) => units.is_finite() && units >= 0.0,
        }
    }
}

/// Maps camera distance to a detail level, smoothing changes with a dead band.
#[derive(Clone, Debug, Default)]
pub struct LodSelector {
    thresholds: LodThresholds,
    dead_band: DeadBand,
}

impl LodSelector {
    pub fn new(thresholds: LodThresholds, dead_band: DeadBand) -> Self {
        Self {
            thresholds,
            dead_band,
        }
    }

    pub fn thresholds(&self) -> &LodThresholds {
        &self.thresholds
    }

    pub fn dead_band(&self) -> DeadBand {
        self.dead_band
    }

    /// Level for `distance` with no hysteresis applied.
    pub fn select_raw(&self, distance: f32) -> DetailLevel {
        let t = &self.thresholds;
        if distance < t.near {
            DetailLevel::Closeup
        } else if distance < t.medium {
            DetailLevel::Near
        } else if distance < t.far {
            DetailLevel::Medium
        } else {
            DetailLevel::Far
        }
    }

    /// Dead-band margin around the boundary below `level`.
    pub fn margin_below(&self, level: DetailLevel) -> f32 {
        match self.dead_band {
            DeadBand::Fraction(f) => f * self.thresholds.gap_below(level),
            DeadBand::Absolute(units) => units,
        }
    }

    /// Level for `distance` given the level the structure currently resolves to.
    ///
    /// Each boundary between `current` and the raw level is crossed only when the
    /// distance passes it by more than the dead-band margin; otherwise the walk
    /// stops. A non-finite distance keeps `current`.
    pub fn resolve(&self, current: DetailLevel, distance: f32) -> DetailLevel {
        if distance.is_nan() {
            return current;
        }
        let raw = self.select_raw(distance);
        let mut level = current;

        while level != raw {
            if raw > level {
                // Moving inward: cross the boundary below the next finer level.
                let Some(finer) = level.finer() else { break };
                let Some(boundary) = self.thresholds.boundary_below(finer) else {
                    break;
                };
                if distance < boundary - self.margin_below(finer) {
                    level = finer;
                } else {
                    break;
                }
            } else {
                let Some(boundary) = self.thresholds.boundary_below(level) else {
                    break;
                };
                if distance >= boundary + self.margin_below(level) {
                    level = level.coarser().unwrap_or(level);
                } else {
                    break;
                }
            }
        }

        level
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_selector() -> LodSelector {
        LodSelector::new(LodThresholds::default(), DeadBand::default())
    }

    /// Raw selection follows the strict `<` rule at each boundary.
    #[test]
    fn test_raw_threshold_boundaries() {
        let selector = default_selector();
        assert_eq!(selector.select_raw(0.0), DetailLevel::Closeup);
        assert_eq!(selector.select_raw(2.999), DetailLevel::Closeup);
        assert_eq!(selector.select_raw(3.0), DetailLevel::Near);
        assert_eq!(selector.select_raw(10.0), DetailLevel::Medium);
        assert_eq!(selector.select_raw(19.99), DetailLevel::Medium);
        assert_eq!(selector.select_raw(20.0), DetailLevel::Far);
        assert_eq!(selector.select_raw(f32::MAX), DetailLevel::Far);
    }

    /// Raw level never gets finer as distance grows.
    #[test]
    fn test_raw_monotonic_with_distance() {
        let selector = default_selector();
        let mut prev = DetailLevel::FINEST;
        for i in 0..400 {
            let level = selector.select_raw(i as f32 * 0.1);
            assert!(level <= prev, "level got finer at d={}", i as f32 * 0.1);
            prev = level;
        }
    }

    /// Fractional margins scale with the gap below each threshold.
    #[test]
    fn test_fraction_margins() {
        let selector = default_selector();
        assert!((selector.margin_below(DetailLevel::Closeup) - 0.3).abs() < 1e-6);
        assert!((selector.margin_below(DetailLevel::Near) - 0.7).abs() < 1e-6);
        assert!((selector.margin_below(DetailLevel::Medium) - 1.0).abs() < 1e-6);
    }

    /// A camera hovering inside the dead band never changes the resolved level.
    #[test]
    fn test_hysteresis_stability_over_many_evaluations() {
        let selector = default_selector();
        let mut level = selector.resolve(DetailLevel::Near, 9.5);
        assert_eq!(level, DetailLevel::Near);
        for i in 0..200 {
            // Oscillates between 9.4 and 10.6, inside the 0.7 margin around 10.
            let d = 10.0 + 0.6 * if i % 2 == 0 { 1.0 } else { -1.0 };
            let next = selector.resolve(level, d);
            assert_eq!(next, level, "flicker at evaluation {i}, d={d}");
            level = next;
        }
    }

    /// Leaving the dead band does change the level.
    #[test]
    fn test_crossing_beyond_margin_changes_level() {
        let selector = default_selector();
        assert_eq!(selector.resolve(DetailLevel::Near, 10.69), DetailLevel::Near);
        assert_eq!(selector.resolve(DetailLevel::Near, 10.71), DetailLevel::Medium);
        assert_eq!(selector.resolve(DetailLevel::Medium, 9.31), DetailLevel::Medium);
        assert_eq!(selector.resolve(DetailLevel::Medium, 9.29), DetailLevel::Near);
    }

    /// With a two-unit absolute band, 18 units keeps both medium and far.
    #[test]
    fn test_absolute_dead_band_around_far_threshold() {
        let selector = LodSelector::new(LodThresholds::default(), DeadBand::Absolute(2.0));
        assert_eq!(selector.resolve(DetailLevel::Medium, 18.0), DetailLevel::Medium);
        assert_eq!(selector.resolve(DetailLevel::Far, 18.0), DetailLevel::Far);
        assert_eq!(selector.resolve(DetailLevel::Medium, 21.0), DetailLevel::Medium);
        assert_eq!(selector.resolve(DetailLevel::Medium, 22.0), DetailLevel::Far);
        assert_eq!(selector.resolve(DetailLevel::Far, 17.9), DetailLevel::Medium);
    }

    /// Large jumps walk across several boundaries in one resolution.
    #[test]
    fn test_resolve_walks_multiple_boundaries() {
        let selector = default_selector();
        assert_eq!(selector.resolve(DetailLevel::Far, 1.0), DetailLevel::Closeup);
        assert_eq!(selector.resolve(DetailLevel::Closeup, 50.0), DetailLevel::Far);
        assert_eq!(selector.resolve(DetailLevel::Far, 25.0), DetailLevel::Far);
    }

    /// NaN distances keep the current level.
    #[test]
    fn test_nan_distance_keeps_level() {
        let selector = default_selector();
        assert_eq!(selector.resolve(DetailLevel::Near, f32::NAN), DetailLevel::Near);
    }

    #[test]
    #[should_panic(expected = "strictly increasing")]
    fn test_non_increasing_thresholds_panic() {
        LodThresholds::custom(10.0, 5.0, 20.0);
    }
}
