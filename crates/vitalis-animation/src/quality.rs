//! Animation richness tiers and the subsystems they scale.

use serde::{Deserialize, Serialize};
use vitalis_geometry::BodySystem;

/// Global animation richness. Scales element counts such as particles and pulses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AnimationQuality {
    /// No animation at all.
    Off,
    Subtle,
    #[default]
    Standard,
    /// Everything, plus condition annotations.
    Educational,
}

impl AnimationQuality {
    pub const ALL: [AnimationQuality; 4] = [
        AnimationQuality::Off,
        AnimationQuality::Subtle,
        AnimationQuality::Standard,
        AnimationQuality::Educational,
    ];

    /// Fraction of the configured element counts shown at this tier.
    pub fn multiplier(self) -> f32 {
        match self {
            AnimationQuality::Off => 0.0,
            AnimationQuality::Subtle => 0.35,
            AnimationQuality::Standard => 0.7,
            AnimationQuality::Educational => 1.0,
        }
    }

    /// `count` scaled by [`multiplier`](Self::multiplier), rounded to nearest.
    pub fn scale_count(self, count: usize) -> usize {
        (count as f32 * self.multiplier()).round() as usize
    }

    pub fn shows_annotations(self) -> bool {
        self == AnimationQuality::Educational
    }

    pub fn name(self) -> &'static str {
        match self {
            AnimationQuality::Off => "off",
            AnimationQuality::Subtle => "subtle",
            AnimationQuality::Standard => "standard",
            AnimationQuality::Educational => "educational",
        }
    }
}

/// Independently toggleable animation subsystem.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subsystem {
    Heart,
    Respiratory,
    BloodFlow,
    Digestive,
    Muscle,
    Nerve,
    Joint,
    Lymphatic,
}

impl Subsystem {
    pub const ALL: [Subsystem; 8] = [
        Subsystem::Heart,
        Subsystem::Respiratory,
        Subsystem::BloodFlow,
        Subsystem::Digestive,
        Subsystem::Muscle,
        Subsystem::Nerve,
        Subsystem::Joint,
        Subsystem::Lymphatic,
    ];

    pub(crate) fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Subsystem::Heart => "heart",
            Subsystem::Respiratory => "respiratory",
            Subsystem::BloodFlow => "blood-flow",
            Subsystem::Digestive => "digestive",
            Subsystem::Muscle => "muscle",
            Subsystem::Nerve => "nerve",
            Subsystem::Joint => "joint",
            Subsystem::Lymphatic => "lymphatic",
        }
    }

    /// Body system whose structures host this subsystem's visuals.
    pub fn host_system(self) -> BodySystem {
        match self {
            Subsystem::Heart | Subsystem::BloodFlow => BodySystem::Cardiovascular,
            Subsystem::Respiratory => BodySystem::Respiratory,
            Subsystem::Digestive => BodySystem::Digestive,
            Subsystem::Muscle => BodySystem::Muscular,
            Subsystem::Nerve => BodySystem::Nervous,
            Subsystem::Joint => BodySystem::Skeletal,
            Subsystem::Lymphatic => BodySystem::Lymphatic,
        }
    }
}

impl std::fmt::Display for Subsystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Which subsystems have at least one host structure that was not culled this frame.
/// Subsystems without a visible host still advance their phase but skip per-element work.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubsystemActivity {
    visible: [bool; 8],
}

impl Default for SubsystemActivity {
    fn default() -> Self {
        Self::all_visible()
    }
}

impl SubsystemActivity {
    pub fn all_visible() -> Self {
        Self { visible: [true; 8] }
    }

    pub fn none_visible() -> Self {
        Self { visible: [false; 8] }
    }

    /// Mark every subsystem hosted by `system` as visible.
    pub fn mark_system_visible(&mut self, system: BodySystem) {
        for subsystem in Subsystem::ALL {
            if subsystem.host_system() == system {
                self.visible[subsystem.index()] = true;
            }
        }
    }

    pub fn set(&mut self, subsystem: Subsystem, visible: bool) {
        self.visible[subsystem.index()] = visible;
    }

    pub fn is_visible(&self, subsystem: Subsystem) -> bool {
        self.visible[subsystem.index()]
    }
}
