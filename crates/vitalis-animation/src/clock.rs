//! The single simulation clock every animation subsystem reads from.

use tracing::warn;

/// Fastest playback multiplier accepted by [`SimulationClock::set_speed`].
pub const MAX_SPEED: f32 = 4.0;

/// Monotonic simulation time with play/pause and a speed multiplier.
///
/// Pausing freezes the input to the animation subsystems, not their state: while paused
/// [`advance`](Self::advance) yields a zero step, so resuming continues from exactly the
/// phase that was showing.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationClock {
    time: f64,
    paused: bool,
    speed: f32,
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationClock {
    pub fn new() -> Self {
        Self {
            time: 0.0,
            paused: false,
            speed: 1.0,
        }
    }

    /// Consume a wall-clock frame delta and return the scaled simulation step.
    pub fn advance(&mut self, dt: f32) -> f32 {
        if self.paused || !dt.is_finite() || dt <= 0.0 {
            return 0.0;
        }
        let step = dt * self.speed;
        self.time += f64::from(step);
        step
    }

    /// Simulation seconds elapsed.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn play(&mut self) {
        self.paused = false;
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Set the playback multiplier, clamped to `[0, MAX_SPEED]`. Non-finite values are
    /// ignored.
    pub fn set_speed(&mut self, speed: f32) {
        if !speed.is_finite() {
            warn!("Ignoring non-finite animation speed {speed}");
            return;
        }
        self.speed = speed.clamp(0.0, MAX_SPEED);
    }
}

/// Advance a normalised phase by `step` seconds of a cycle lasting `period` seconds.
pub(crate) fn advance_phase(phase: f32, step: f32, period: f32) -> f32 {
    if period <= 0.0 || !period.is_finite() {
        return phase;
    }
    (phase + step / period).rem_euclid(1.0)
}
