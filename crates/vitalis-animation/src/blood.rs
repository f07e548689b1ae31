//! Blood cells carried along vessel paths, pulsing with the heartbeat.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::particles::{FlowSettings, ParticleStream};
use crate::spline::PathSpline;

/// Speed multiplier applied inside a blockage.
pub const BLOCKAGE_SLOWDOWN: f32 = 0.1;

/// A narrowed region of a vessel that slows every particle inside it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Blockage {
    pub center: Vec3,
    pub radius: f32,
}

impl Blockage {
    pub fn contains(&self, point: Vec3) -> bool {
        point.distance_squared(self.center) <= self.radius * self.radius
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BloodFlowSettings {
    pub flow: FlowSettings,
    /// Extra speed at the peak of the arterial pulse, as a fraction of base speed.
    pub pulse_gain: f32,
}

impl Default for BloodFlowSettings {
    fn default() -> Self {
        Self {
            flow: FlowSettings::default(),
            pulse_gain: 1.5,
        }
    }
}

#[derive(Clone, Debug)]
pub struct BloodFlow {
    stream: ParticleStream,
    pulse_gain: f32,
    blockages: Vec<Blockage>,
}

impl BloodFlow {
    pub fn new(settings: BloodFlowSettings, vessels: Vec<PathSpline>, seed: u64) -> Self {
        Self {
            stream: ParticleStream::new(settings.flow, vessels, seed),
            pulse_gain: settings.pulse_gain,
            blockages: Vec::new(),
        }
    }

    pub fn stream(&self) -> &ParticleStream {
        &self.stream
    }

    pub fn active_particles(&self) -> usize {
        self.stream.pool().active_count()
    }

    pub fn set_blockages(&mut self, blockages: Vec<Blockage>) {
        self.blockages = blockages;
    }

    pub fn blockages(&self) -> &[Blockage] {
        &self.blockages
    }

    /// Speed multiplier for a given arterial pulse in `[0, 1]`.
    pub fn pulse_speed_scale(&self, arterial_pulse: f32) -> f32 {
        1.0 + self.pulse_gain * arterial_pulse.clamp(0.0, 1.0)
    }

    pub fn update(&mut self, dt: f32, arterial_pulse: f32, quality_multiplier: f32) {
        let scale = self.pulse_speed_scale(arterial_pulse);
        let blockages = &self.blockages;
        self.stream.update(dt, quality_multiplier, scale, |position| {
            if blockages.iter().any(|b| b.contains(position)) {
                BLOCKAGE_SLOWDOWN
            } else {
                1.0
            }
        });
    }

    /// Positions of every live blood cell.
    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.stream.positions()
    }

    pub fn clear(&mut self) {
        self.stream.clear();
    }
}
