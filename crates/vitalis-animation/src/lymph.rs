//! Slow lymph flow with periodically pulsing nodes.

use std::f32::consts::PI;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::clock::advance_phase;
use crate::particles::{FlowSettings, ParticleStream};
use crate::spline::PathSpline;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LymphFlowSettings {
    pub flow: FlowSettings,
    /// Seconds between node pulses.
    pub node_period_seconds: f32,
}

impl Default for LymphFlowSettings {
    fn default() -> Self {
        Self {
            flow: FlowSettings {
                base_speed: 0.05,
                spawn_rate: 8.0,
                max_particles: 120,
                lifetime_seconds: 40.0,
                speed_jitter: 0.2,
            },
            node_period_seconds: 4.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct LymphaticFlow {
    stream: ParticleStream,
    node_period: f32,
    node_phase: f32,
}

impl LymphaticFlow {
    pub fn new(settings: LymphFlowSettings, vessels: Vec<PathSpline>, seed: u64) -> Self {
        Self {
            stream: ParticleStream::new(settings.flow, vessels, seed),
            node_period: settings.node_period_seconds,
            node_phase: 0.0,
        }
    }

    /// Advance node pulsing only.
    pub fn advance_phase(&mut self, step: f32) {
        self.node_phase = advance_phase(self.node_phase, step, self.node_period);
    }

    /// Advance node pulsing and move particles.
    pub fn update(&mut self, step: f32, quality_multiplier: f32) {
        self.advance_phase(step);
        self.stream.update(step, quality_multiplier, 1.0, |_| 1.0);
    }

    /// Node swelling in `[0, 1]`, `sin²` over the pulse period.
    pub fn node_pulse(&self) -> f32 {
        (PI * self.node_phase).sin().powi(2)
    }

    pub fn node_phase(&self) -> f32 {
        self.node_phase
    }

    pub fn active_particles(&self) -> usize {
        self.stream.pool().active_count()
    }

    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.stream.positions()
    }
}
