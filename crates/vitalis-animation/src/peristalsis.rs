//! Travelling contraction wave along the digestive tract.

use std::f32::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::clock::advance_phase;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeristalsisSettings {
    pub segments: usize,
    /// Segments spanned by one full wave.
    pub wavelength: f32,
    pub period_seconds: f32,
}

impl Default for PeristalsisSettings {
    fn default() -> Self {
        Self {
            segments: 16,
            wavelength: 6.0,
            period_seconds: 8.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Peristalsis {
    settings: PeristalsisSettings,
    phase: f32,
    contractions: Vec<f32>,
}

impl Peristalsis {
    pub fn new(settings: PeristalsisSettings) -> Self {
        let mut peristalsis = Self {
            contractions: vec![0.0; settings.segments],
            settings,
            phase: 0.0,
        };
        peristalsis.recompute();
        peristalsis
    }

    pub fn advance(&mut self, step: f32) {
        self.phase = advance_phase(self.phase, step, self.settings.period_seconds);
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Contraction of segment `i`: `max(0, sin(2π(phase − i/wavelength)))²`.
    pub fn segment_contraction(&self, segment: usize) -> f32 {
        let wavelength = self.settings.wavelength.max(f32::EPSILON);
        let wave = (TAU * (self.phase - segment as f32 / wavelength)).sin();
        wave.max(0.0).powi(2)
    }

    /// Refresh the cached per-segment contractions.
    pub fn recompute(&mut self) {
        for i in 0..self.contractions.len() {
            self.contractions[i] = self.segment_contraction(i);
        }
    }

    pub fn contractions(&self) -> &[f32] {
        &self.contractions
    }
}
