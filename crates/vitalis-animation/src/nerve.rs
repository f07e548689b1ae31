//! Discrete signals travelling along nerve paths.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::spline::PathSpline;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NerveSettings {
    /// Seconds between spawned pulses.
    pub interval_seconds: f32,
    /// World units per second.
    pub velocity: f32,
    pub max_pulses: usize,
}

impl Default for NerveSettings {
    fn default() -> Self {
        Self {
            interval_seconds: 0.5,
            velocity: 1.5,
            max_pulses: 64,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NervePulse {
    pub path: usize,
    pub arc: f32,
    pub active: bool,
}

/// Fixed pool of pulses spawned round-robin across the nerve paths.
#[derive(Clone, Debug)]
pub struct NerveSignals {
    settings: NerveSettings,
    paths: Vec<PathSpline>,
    pulses: Vec<NervePulse>,
    timer: f32,
    next_path: usize,
}

impl NerveSignals {
    pub fn new(settings: NerveSettings, paths: Vec<PathSpline>) -> Self {
        Self {
            pulses: vec![NervePulse::default(); settings.max_pulses],
            settings,
            paths,
            timer: 0.0,
            next_path: 0,
        }
    }

    /// Advance the spawn timer and every pulse. At most `limit` pulses are live.
    pub fn update(&mut self, step: f32, limit: usize) {
        let limit = limit.min(self.pulses.len());
        let mut live = 0;
        for pulse in self.pulses.iter_mut().filter(|p| p.active) {
            live += 1;
            if live > limit {
                pulse.active = false;
            }
        }
        if self.paths.is_empty() || step <= 0.0 {
            return;
        }

        for pulse in self.pulses.iter_mut().filter(|p| p.active) {
            let Some(path) = self.paths.get(pulse.path) else {
                pulse.active = false;
                continue;
            };
            pulse.arc += self.settings.velocity * step / path.length();
            if pulse.arc >= 1.0 {
                pulse.active = false;
            }
        }

        self.timer += step;
        let interval = self.settings.interval_seconds.max(f32::EPSILON);
        while self.timer >= interval {
            self.timer -= interval;
            if self.active_count() >= limit {
                continue;
            }
            if let Some(slot) = self.pulses.iter_mut().find(|p| !p.active) {
                *slot = NervePulse {
                    path: self.next_path % self.paths.len(),
                    arc: 0.0,
                    active: true,
                };
                self.next_path = self.next_path.wrapping_add(1);
            }
        }
    }

    pub fn active_count(&self) -> usize {
        self.pulses.iter().filter(|p| p.active).count()
    }

    pub fn capacity(&self) -> usize {
        self.pulses.len()
    }

    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.pulses
            .iter()
            .filter(|p| p.active)
            .filter_map(|p| self.paths.get(p.path).map(|path| path.sample(p.arc)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nerve(length: f32) -> PathSpline {
        PathSpline::new("nerve", vec![Vec3::ZERO, Vec3::new(0.0, length, 0.0)]).unwrap()
    }

    /// Pulses spawn on the interval, move at constant velocity, and expire at the end.
    #[test]
    fn test_pulse_lifecycle() {
        let settings = NerveSettings {
            interval_seconds: 1.0,
            velocity: 1.0,
            max_pulses: 4,
        };
        let mut signals = NerveSignals::new(settings, vec![nerve(1.25)]);
        signals.update(1.0, 4);
        assert_eq!(signals.active_count(), 1);
        signals.update(0.5, 4);
        let y = signals.positions().next().unwrap().y;
        assert!((y - 0.5).abs() < 1e-5);
        signals.update(1.0, 4);
        // First pulse reached the end, second just spawned.
        assert_eq!(signals.active_count(), 1);
    }

    #[test]
    fn test_pool_is_bounded() {
        let settings = NerveSettings {
            interval_seconds: 0.01,
            velocity: 0.001,
            max_pulses: 4,
        };
        let mut signals = NerveSignals::new(settings, vec![nerve(10.0)]);
        for _ in 0..100 {
            signals.update(0.1, 3);
            assert!(signals.active_count() <= 3);
        }
        assert_eq!(signals.capacity(), 4);
    }
}
