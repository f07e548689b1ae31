//! Breathing cycle driving lung volume, diaphragm and ribs.

use std::f32::consts::PI;

use crate::clock::advance_phase;

const INHALE_END: f32 = 0.4;
const EXHALE_START: f32 = 0.5;
const EXHALE_END: f32 = 0.9;

/// Diaphragm travel at full inspiration, metres.
pub const MAX_DIAPHRAGM_TRAVEL: f32 = 0.04;
/// Rib cage expansion at full inspiration, as a fraction of rest size.
pub const MAX_INTERCOSTAL_EXPANSION: f32 = 0.05;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RespiratoryPhase {
    Inhale,
    InspiratoryPause,
    Exhale,
    ExpiratoryPause,
}

/// `-(cos(πt) - 1) / 2`
pub fn ease_in_out_sine(t: f32) -> f32 {
    -((PI * t.clamp(0.0, 1.0)).cos() - 1.0) / 2.0
}

#[derive(Clone, Debug, PartialEq)]
pub struct RespiratoryCycle {
    breaths_per_minute: f32,
    phase: f32,
    /// Fraction of breath depth lost to restriction, `[0, 0.95]`.
    restriction: f32,
}

impl Default for RespiratoryCycle {
    fn default() -> Self {
        Self::new(12.0)
    }
}

impl RespiratoryCycle {
    pub fn new(breaths_per_minute: f32) -> Self {
        Self {
            breaths_per_minute: if breaths_per_minute.is_finite() && breaths_per_minute > 0.0 {
                breaths_per_minute
            } else {
                12.0
            },
            phase: 0.0,
            restriction: 0.0,
        }
    }

    pub fn breaths_per_minute(&self) -> f32 {
        self.breaths_per_minute
    }

    pub fn period(&self) -> f32 {
        60.0 / self.breaths_per_minute
    }

    pub fn advance(&mut self, step: f32) {
        self.phase = advance_phase(self.phase, step, self.period());
    }

    pub fn phase(&self) -> f32 {
        self.phase
    }

    pub fn set_phase(&mut self, phase: f32) {
        self.phase = if phase.is_finite() {
            phase.rem_euclid(1.0)
        } else {
            0.0
        };
    }

    pub fn restriction(&self) -> f32 {
        self.restriction
    }

    pub fn set_restriction(&mut self, restriction: f32) {
        self.restriction = if restriction.is_finite() {
            restriction.clamp(0.0, 0.95)
        } else {
            0.0
        };
    }

    pub fn respiratory_phase(&self) -> RespiratoryPhase {
        if self.phase < INHALE_END {
            RespiratoryPhase::Inhale
        } else if self.phase < EXHALE_START {
            RespiratoryPhase::InspiratoryPause
        } else if self.phase < EXHALE_END {
            RespiratoryPhase::Exhale
        } else {
            RespiratoryPhase::ExpiratoryPause
        }
    }

    /// Lung fill in `[0, 1]`, eased through inhale and exhale and held in the pauses.
    pub fn lung_volume(&self) -> f32 {
        let fill = match self.respiratory_phase() {
            RespiratoryPhase::Inhale => ease_in_out_sine(self.phase / INHALE_END),
            RespiratoryPhase::InspiratoryPause => 1.0,
            RespiratoryPhase::Exhale => {
                1.0 - ease_in_out_sine((self.phase - EXHALE_START) / (EXHALE_END - EXHALE_START))
            }
            RespiratoryPhase::ExpiratoryPause => 0.0,
        };
        fill * (1.0 - self.restriction)
    }

    /// Downward diaphragm displacement in metres.
    pub fn diaphragm_displacement(&self) -> f32 {
        self.lung_volume() * MAX_DIAPHRAGM_TRAVEL
    }

    /// Fractional rib cage expansion.
    pub fn intercostal_expansion(&self) -> f32 {
        self.lung_volume() * MAX_INTERCOSTAL_EXPANSION
    }
}
