//! Cardiac cycle: phase, valve states and chamber contraction.
//!
//! Everything here is a pure function of the cycle phase in `[0, 1)`:
//!
//! | phase          | stage               | AV valves | semilunar valves |
//! |----------------|---------------------|-----------|------------------|
//! | `[0.00, 0.15)` | atrial systole      | open      | closed           |
//! | `[0.15, 0.20)` | ventricular systole | closed    | closed           |
//! | `[0.20, 0.45)` | ventricular systole | closed    | open             |
//! | `[0.45, 0.50)` | diastole            | closed    | closed           |
//! | `[0.50, 1.00)` | diastole            | open      | closed           |
//!
//! The two closed-closed gaps are the isovolumetric contraction and relaxation
//! intervals, so the atrioventricular and semilunar valves are never open together.

use std::f32::consts::PI;

use tracing::warn;

use crate::clock::advance_phase;

pub const ATRIAL_SYSTOLE_END: f32 = 0.15;
pub const VENTRICULAR_SYSTOLE_END: f32 = 0.45;
const SEMILUNAR_OPEN: f32 = 0.20;
const AV_OPEN: f32 = 0.50;

/// Coarse stage of the cardiac cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CardiacPhase {
    AtrialSystole,
    VentricularSystole,
    Diastole,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Valve {
    Mitral,
    Tricuspid,
    Aortic,
    Pulmonary,
}

impl Valve {
    pub const ALL: [Valve; 4] = [Valve::Mitral, Valve::Tricuspid, Valve::Aortic, Valve::Pulmonary];

    /// Mitral and tricuspid sit between atria and ventricles.
    pub fn is_atrioventricular(self) -> bool {
        matches!(self, Valve::Mitral | Valve::Tricuspid)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Chamber {
    LeftAtrium,
    RightAtrium,
    LeftVentricle,
    RightVentricle,
}

impl Chamber {
    pub const ALL: [Chamber; 4] = [
        Chamber::LeftAtrium,
        Chamber::RightAtrium,
        Chamber::LeftVentricle,
        Chamber::RightVentricle,
    ];

    pub fn is_atrium(self) -> bool {
        matches!(self, Chamber::LeftAtrium | Chamber::RightAtrium)
    }
}

/// Heart rhythm driven by the simulation clock.
#[derive(Clone, Debug, PartialEq)]
pub struct CardiacCycle {
    bpm: f32,
    phase: f32,
    /// Beat strength multiplier; arrhythmia lowers it on irregular beats.
    strength: f32,
}

impl Default for CardiacCycle {
    fn default() -> Self {
        Self::new(75.0)
    }
}

impl CardiacCycle {
    pub fn new(bpm: f32) -> Self {
        Self {
            bpm: sanitize_rate(bpm, 75.0),
            phase: 0.0,
            strength: 1.0,
        }
    }

    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    pub fn set_bpm(&mut self, bpm: f32) {
        self.bpm = sanitize_rate(bpm, self.bpm);
    }

    /// Seconds per beat.
    pub fn period(&self) -> f32 {
        60.0 / self.bpm
    }

    pub fn advance(&mut self, step: f32) {
        self.phase = advance_phase(self.phase, step, self.period());
    }

    /// Normalised position in the current beat.
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Force the phase. Values outside `[0, 1)` wrap; non-finite values reset to 0.
    pub fn set_phase(&mut self, phase: f32) {
        self.phase = sanitize_phase(phase);
    }

    pub fn set_strength(&mut self, strength: f32) {
        self.strength = if strength.is_finite() {
            strength.clamp(0.0, 1.0)
        } else {
            1.0
        };
    }

    pub fn strength(&self) -> f32 {
        self.strength
    }

    pub fn cardiac_phase(&self) -> CardiacPhase {
        cardiac_phase_at(self.phase)
    }

    pub fn is_valve_open(&self, valve: Valve) -> bool {
        valve_open_at(valve, self.phase)
    }

    /// Contraction of a chamber in `[0, 1]`, a sine envelope over its systole window.
    pub fn chamber_contraction(&self, chamber: Chamber) -> f32 {
        chamber_contraction_at(chamber, self.phase) * self.strength
    }

    /// Arterial pressure pulse in `[0, 1]`. Peaks mid ventricular systole.
    pub fn arterial_pulse(&self) -> f32 {
        chamber_contraction_at(Chamber::LeftVentricle, self.phase) * self.strength
    }
}

pub fn cardiac_phase_at(phase: f32) -> CardiacPhase {
    let phase = sanitize_phase(phase);
    if phase < ATRIAL_SYSTOLE_END {
        CardiacPhase::AtrialSystole
    } else if phase < VENTRICULAR_SYSTOLE_END {
        CardiacPhase::VentricularSystole
    } else {
        CardiacPhase::Diastole
    }
}

pub fn valve_open_at(valve: Valve, phase: f32) -> bool {
    let phase = sanitize_phase(phase);
    if valve.is_atrioventricular() {
        !(ATRIAL_SYSTOLE_END..AV_OPEN).contains(&phase)
    } else {
        (SEMILUNAR_OPEN..VENTRICULAR_SYSTOLE_END).contains(&phase)
    }
}

pub fn chamber_contraction_at(chamber: Chamber, phase: f32) -> f32 {
    let phase = sanitize_phase(phase);
    let (start, end) = if chamber.is_atrium() {
        (0.0, ATRIAL_SYSTOLE_END)
    } else {
        (ATRIAL_SYSTOLE_END, VENTRICULAR_SYSTOLE_END)
    };
    if (start..end).contains(&phase) {
        (PI * (phase - start) / (end - start)).sin()
    } else {
        0.0
    }
}

fn sanitize_phase(phase: f32) -> f32 {
    if !phase.is_finite() {
        warn!("Cardiac phase desynchronised ({phase}), resetting to 0");
        return 0.0;
    }
    phase.rem_euclid(1.0)
}

fn sanitize_rate(rate: f32, fallback: f32) -> f32 {
    if rate.is_finite() && rate > 0.0 {
        rate
    } else {
        warn!("Ignoring invalid rate {rate}, keeping {fallback}");
        fallback
    }
}
