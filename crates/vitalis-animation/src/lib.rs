//! Scripted physiology: heartbeat, breathing, blood and lymph flow, peristalsis, nerve
//! pulses, joints and muscles, plus pathology overlays, all driven by one simulation
//! clock and scaled by an animation quality tier.

mod blood;
mod clock;
mod conditions;
mod engine;
mod error;
mod heart;
mod joint;
mod lymph;
mod nerve;
mod particles;
mod peristalsis;
mod quality;
mod respiration;
mod rig;
mod spline;

pub use blood::{BLOCKAGE_SLOWDOWN, Blockage, BloodFlow, BloodFlowSettings};
pub use clock::{MAX_SPEED, SimulationClock};
pub use conditions::{
    Annotation, ConditionEffect, ConditionId, ConditionKind, ConditionOverlay, ConditionSpec,
    ConditionStage, Severity, arrhythmia_wave, default_annotations, heartbeat_ease,
};
pub use engine::{AnimationEngine, AnimationSettings, AnimationStats};
pub use error::{AnimationError, JointRangeError};
pub use heart::{
    ATRIAL_SYSTOLE_END, CardiacCycle, CardiacPhase, Chamber, VENTRICULAR_SYSTOLE_END, Valve,
    cardiac_phase_at, chamber_contraction_at, valve_open_at,
};
pub use joint::{JointOscillator, JointRange, MuscleDrive};
pub use lymph::{LymphFlowSettings, LymphaticFlow};
pub use nerve::{NervePulse, NerveSettings, NerveSignals};
pub use particles::{FlowParticle, FlowSettings, ParticlePool, ParticleStream};
pub use peristalsis::{Peristalsis, PeristalsisSettings};
pub use quality::{AnimationQuality, Subsystem, SubsystemActivity};
pub use respiration::{
    MAX_DIAPHRAGM_TRAVEL, MAX_INTERCOSTAL_EXPANSION, RespiratoryCycle, RespiratoryPhase,
    ease_in_out_sine,
};
pub use rig::{AnimationRig, JointDef, MuscleDef, PathDef, RigDef};
pub use spline::PathSpline;
