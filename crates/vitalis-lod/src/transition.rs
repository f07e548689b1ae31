//! Crossfade state machine for detail level changes.

use rustc_hash::FxHashMap;
use vitalis_geometry::{DetailLevel, StructureId};

/// The state of a structure's level transition.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LodTransitionState {
    /// No transition in progress.
    Stable { level: DetailLevel },
    /// Crossfading from one level to the next.
    Transitioning {
        from: DetailLevel,
        to: DetailLevel,
        /// 0.0 when the change starts, 1.0 when complete.
        progress: f32,
        /// Total duration in seconds.
        duration: f32,
    },
}

/// Tracks crossfades for every structure whose level changed recently.
#[derive(Debug)]
pub struct LodTransitionManager {
    duration: f32,
    states: FxHashMap<StructureId, LodTransitionState>,
}

impl LodTransitionManager {
    /// Create a manager whose crossfades last `duration` seconds (default 0.3).
    pub fn new(duration: f32) -> Self {
        Self {
            duration: duration.max(0.0),
            states: FxHashMap::default(),
        }
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn set_duration(&mut self, duration: f32) {
        self.duration = duration.max(0.0);
    }

    /// Start a crossfade for `id`. A change mid-transition restarts from zero.
    pub fn on_level_changed(&mut self, id: StructureId, from: DetailLevel, to: DetailLevel) {
        let state = if self.duration <= 0.0 {
            LodTransitionState::Stable { level: to }
        } else {
            LodTransitionState::Transitioning {
                from,
                to,
                progress: 0.0,
                duration: self.duration,
            }
        };
        self.states.insert(id, state);
    }

    /// Cut any transition for `id` and show `level` immediately.
    pub fn snap(&mut self, id: StructureId, level: DetailLevel) {
        self.states.insert(id, LodTransitionState::Stable { level });
    }

    /// Advance all transitions by `dt` seconds. Returns the structures that finished
    /// this frame.
    pub fn update(&mut self, dt: f32) -> Vec<StructureId> {
        let mut completed = Vec::new();

        for (id, state) in &mut self.states {
            if let LodTransitionState::Transitioning {
                to,
                progress,
                duration,
                ..
            } = state
            {
                *progress += dt.max(0.0) / *duration;
                if *progress >= 1.0 {
                    completed.push(*id);
                    *state = LodTransitionState::Stable { level: *to };
                }
            }
        }

        completed
    }

    pub fn get_state(&self, id: StructureId) -> Option<&LodTransitionState> {
        self.states.get(&id)
    }

    /// Transition progress in `[0, 1]`; 1.0 when stable or untracked.
    pub fn progress(&self, id: StructureId) -> f32 {
        match self.states.get(&id) {
            Some(LodTransitionState::Transitioning { progress, .. }) => progress.clamp(0.0, 1.0),
            _ => 1.0,
        }
    }

    /// `(old_alpha, new_alpha)` for the outgoing and incoming meshes.
    pub fn crossfade_alphas(&self, id: StructureId) -> (f32, f32) {
        match self.states.get(&id) {
            Some(LodTransitionState::Transitioning { progress, .. }) => {
                let t = smooth_step(*progress);
                (1.0 - t, t)
            }
            _ => (0.0, 1.0),
        }
    }

    /// The level being faded out, if a transition is running.
    pub fn outgoing_level(&self, id: StructureId) -> Option<DetailLevel> {
        match self.states.get(&id) {
            Some(LodTransitionState::Transitioning { from, .. }) => Some(*from),
            _ => None,
        }
    }

    pub fn transitioning_count(&self) -> usize {
        self.states
            .values()
            .filter(|s| matches!(s, LodTransitionState::Transitioning { .. }))
            .count()
    }

    pub fn remove(&mut self, id: StructureId) {
        self.states.remove(&id);
    }
}

impl Default for LodTransitionManager {
    fn default() -> Self {
        Self::new(0.3)
    }
}

/// Hermite smooth step.
pub fn smooth_step(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}
