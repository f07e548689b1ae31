//! Oscillating joints and the muscles that follow them.

use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::clock::advance_phase;
use crate::error::JointRangeError;

/// Anatomical limits of a joint, in radians.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct JointRange {
    min: f32,
    max: f32,
}

impl JointRange {
    pub fn new(name: &str, min: f32, max: f32) -> Result<Self, JointRangeError> {
        if !min.is_finite() || !max.is_finite() {
            return Err(JointRangeError::NonFinite {
                name: name.to_string(),
            });
        }
        if min >= max {
            return Err(JointRangeError::Inverted {
                name: name.to_string(),
                min,
                max,
            });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f32 {
        self.min
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    pub fn mid(&self) -> f32 {
        (self.min + self.max) * 0.5
    }

    pub fn half_range(&self) -> f32 {
        (self.max - self.min) * 0.5
    }
}

/// A joint swinging continuously within its range.
#[derive(Clone, Debug, PartialEq)]
pub struct JointOscillator {
    pub name: String,
    range: JointRange,
    period: f32,
    phase: f32,
}

impl JointOscillator {
    pub fn new(name: impl Into<String>, range: JointRange, period_seconds: f32) -> Self {
        Self {
            name: name.into(),
            range,
            period: period_seconds,
            phase: 0.0,
        }
    }

    pub fn range(&self) -> JointRange {
        self.range
    }

    pub fn advance(&mut self, step: f32) {
        self.phase = advance_phase(self.phase, step, self.period);
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// `mid + half_range·sin(2π·phase)`, always within the range.
    pub fn angle(&self) -> f32 {
        (self.range.mid() + self.range.half_range() * (TAU * self.phase).sin())
            .clamp(self.range.min, self.range.max)
    }

    /// Angle mapped to `[0, 1]` across the range.
    pub fn normalized_flexion(&self) -> f32 {
        (self.angle() - self.range.min) / (self.range.max - self.range.min)
    }
}

/// A muscle whose contraction follows a driving joint's flexion.
#[derive(Clone, Debug, PartialEq)]
pub struct MuscleDrive {
    pub name: String,
    /// Index of the driving joint.
    pub joint: usize,
    /// Extra twitch added by a spasm overlay, `[0, 1]`.
    spasm: f32,
}

impl MuscleDrive {
    pub fn new(name: impl Into<String>, joint: usize) -> Self {
        Self {
            name: name.into(),
            joint,
            spasm: 0.0,
        }
    }

    pub fn set_spasm(&mut self, spasm: f32) {
        self.spasm = spasm.clamp(0.0, 1.0);
    }

    /// Contraction in `[0, 1]`.
    pub fn contraction(&self, joints: &[JointOscillator]) -> f32 {
        let flexion = joints
            .get(self.joint)
            .map_or(0.0, JointOscillator::normalized_flexion);
        (flexion + self.spasm).min(1.0)
    }
}
