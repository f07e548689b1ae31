//! The animation engine: one clock driving every physiological subsystem.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::blood::{Blockage, BloodFlow, BloodFlowSettings};
use crate::clock::SimulationClock;
use crate::conditions::{ConditionEffect, ConditionId, ConditionKind, ConditionOverlay, ConditionSpec};
use crate::heart::CardiacCycle;
use crate::joint::{JointOscillator, MuscleDrive};
use crate::lymph::{LymphFlowSettings, LymphaticFlow};
use crate::nerve::{NerveSettings, NerveSignals};
use crate::peristalsis::{Peristalsis, PeristalsisSettings};
use crate::quality::{AnimationQuality, Subsystem, SubsystemActivity};
use crate::respiration::RespiratoryCycle;
use crate::rig::AnimationRig;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationSettings {
    pub quality: AnimationQuality,
    pub speed: f32,
    pub heart_bpm: f32,
    pub breaths_per_minute: f32,
    pub blood: BloodFlowSettings,
    pub lymph: LymphFlowSettings,
    pub peristalsis: PeristalsisSettings,
    pub nerve: NerveSettings,
    /// Seeds particle jitter and condition randomness.
    pub seed: u64,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            quality: AnimationQuality::default(),
            speed: 1.0,
            heart_bpm: 75.0,
            breaths_per_minute: 12.0,
            blood: BloodFlowSettings::default(),
            lymph: LymphFlowSettings::default(),
            peristalsis: PeristalsisSettings::default(),
            nerve: NerveSettings::default(),
            seed: 0x5EED,
        }
    }
}

/// Per-frame counters.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AnimationStats {
    pub time: f64,
    pub step: f32,
    pub blood_particles: usize,
    pub lymph_particles: usize,
    pub nerve_pulses: usize,
    pub active_conditions: usize,
}

pub struct AnimationEngine {
    clock: SimulationClock,
    quality: AnimationQuality,
    enabled: [bool; 8],
    heart: CardiacCycle,
    respiration: RespiratoryCycle,
    blood: BloodFlow,
    lymph: LymphaticFlow,
    peristalsis: Peristalsis,
    nerves: NerveSignals,
    nerve_capacity: usize,
    joints: Vec<JointOscillator>,
    muscles: Vec<MuscleDrive>,
    conditions: Vec<ConditionOverlay>,
    effects: Vec<ConditionEffect>,
    next_condition: u32,
    rng: ChaCha8Rng,
    stats: AnimationStats,
}

impl AnimationEngine {
    pub fn new(settings: AnimationSettings, rig: AnimationRig) -> Self {
        let mut clock = SimulationClock::new();
        clock.set_speed(settings.speed);
        let AnimationRig {
            vessels,
            lymph_vessels,
            nerves,
            joints,
            muscles,
        } = rig;
        info!(
            "Animation engine ready: {} vessels, {} nerves, {} joints, quality {}",
            vessels.len(),
            nerves.len(),
            joints.len(),
            settings.quality.name()
        );
        Self {
            clock,
            quality: settings.quality,
            enabled: [true; 8],
            heart: CardiacCycle::new(settings.heart_bpm),
            respiration: RespiratoryCycle::new(settings.breaths_per_minute),
            blood: BloodFlow::new(settings.blood, vessels, settings.seed),
            lymph: LymphaticFlow::new(settings.lymph, lymph_vessels, settings.seed.wrapping_add(1)),
            peristalsis: Peristalsis::new(settings.peristalsis),
            nerve_capacity: settings.nerve.max_pulses,
            nerves: NerveSignals::new(settings.nerve, nerves),
            joints,
            muscles,
            conditions: Vec::new(),
            effects: Vec::new(),
            next_condition: 0,
            rng: ChaCha8Rng::seed_from_u64(settings.seed.wrapping_add(2)),
            stats: AnimationStats::default(),
        }
    }

    pub fn play(&mut self) {
        self.clock.play();
    }

    pub fn pause(&mut self) {
        self.clock.pause();
    }

    pub fn is_paused(&self) -> bool {
        self.clock.is_paused()
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.clock.set_speed(speed);
    }

    pub fn speed(&self) -> f32 {
        self.clock.speed()
    }

    pub fn time(&self) -> f64 {
        self.clock.time()
    }

    pub fn quality(&self) -> AnimationQuality {
        self.quality
    }

    pub fn set_quality(&mut self, quality: AnimationQuality) {
        if quality != self.quality {
            debug!("Animation quality {} -> {}", self.quality.name(), quality.name());
            self.quality = quality;
        }
    }

    /// Flip a subsystem on or off and return its new state.
    pub fn toggle_subsystem(&mut self, subsystem: Subsystem) -> bool {
        let enabled = !self.enabled[subsystem.index()];
        self.set_subsystem_enabled(subsystem, enabled);
        enabled
    }

    /// A disabled subsystem keeps its phase and resumes from it when re-enabled.
    pub fn set_subsystem_enabled(&mut self, subsystem: Subsystem, enabled: bool) {
        let slot = &mut self.enabled[subsystem.index()];
        if *slot != enabled {
            debug!("Subsystem {subsystem} {}", if enabled { "enabled" } else { "disabled" });
            *slot = enabled;
        }
    }

    pub fn is_subsystem_enabled(&self, subsystem: Subsystem) -> bool {
        self.enabled[subsystem.index()]
    }

    pub fn add_condition(&mut self, spec: ConditionSpec) -> ConditionId {
        let id = ConditionId(self.next_condition);
        self.next_condition = self.next_condition.wrapping_add(1);
        info!("Condition {:?} added: {} ({:?})", id, spec.kind.name(), spec.severity);
        self.conditions.push(ConditionOverlay::new(id, spec));
        self.refresh_condition_inputs();
        id
    }

    pub fn remove_condition(&mut self, id: ConditionId) -> bool {
        let before = self.conditions.len();
        self.conditions.retain(|c| c.id() != id);
        let removed = self.conditions.len() != before;
        if removed {
            info!("Condition {:?} removed", id);
            self.effects.retain(|e| e.id != id);
            self.refresh_condition_inputs();
        }
        removed
    }

    pub fn conditions(&self) -> &[ConditionOverlay] {
        &self.conditions
    }

    /// Effects evaluated in the last [`update`](Self::update).
    pub fn condition_effects(&self) -> &[ConditionEffect] {
        &self.effects
    }

    /// Inputs that only change when the set of overlays changes.
    fn refresh_condition_inputs(&mut self) {
        let blockages = self
            .conditions
            .iter()
            .filter(|c| c.kind() == ConditionKind::Blockage)
            .map(|c| Blockage {
                center: c.spec().center,
                radius: c.spec().radius,
            })
            .collect();
        self.blood.set_blockages(blockages);
        let restriction = self
            .conditions
            .iter()
            .map(ConditionOverlay::breath_restriction)
            .fold(0.0, f32::max);
        self.respiration.set_restriction(restriction);
        if !self.conditions.iter().any(|c| c.kind() == ConditionKind::Arrhythmia) {
            self.heart.set_strength(1.0);
        }
        if !self.conditions.iter().any(|c| c.kind() == ConditionKind::MuscleSpasm) {
            for muscle in &mut self.muscles {
                muscle.set_spasm(0.0);
            }
        }
    }

    /// Advance by one wall-clock frame. `activity` says which subsystems have a visible
    /// host this frame; the rest advance their phase but skip per-element work.
    pub fn update(&mut self, dt: f32, activity: &SubsystemActivity) -> AnimationStats {
        let clock_step = self.clock.advance(dt);
        let step = if self.quality == AnimationQuality::Off {
            0.0
        } else {
            clock_step
        };
        let multiplier = self.quality.multiplier();
        let time = self.clock.time();

        self.effects.clear();
        let annotate = self.quality.shows_annotations();
        let mut beat_strength: f32 = 1.0;
        let mut spasm: f32 = 0.0;
        for overlay in &mut self.conditions {
            let effect = overlay.update(time, step, &mut self.rng, annotate);
            beat_strength = beat_strength.min(overlay.beat_strength());
            if effect.kind == ConditionKind::MuscleSpasm {
                spasm = spasm.max(effect.intensity);
            }
            self.effects.push(effect);
        }

        let on = |s: Subsystem| self.enabled[s.index()];
        let visible = |s: Subsystem| self.enabled[s.index()] && activity.is_visible(s);

        if on(Subsystem::Heart) {
            self.heart.set_strength(beat_strength);
            self.heart.advance(step);
        }
        if on(Subsystem::Respiratory) {
            self.respiration.advance(step);
        }
        if visible(Subsystem::BloodFlow) {
            self.blood
                .update(step, self.heart.arterial_pulse(), multiplier);
        } else if on(Subsystem::BloodFlow) && multiplier == 0.0 {
            self.blood.clear();
        }
        if on(Subsystem::Digestive) {
            self.peristalsis.advance(step);
            if visible(Subsystem::Digestive) {
                self.peristalsis.recompute();
            }
        }
        if on(Subsystem::Joint) {
            for joint in &mut self.joints {
                joint.advance(step);
            }
        }
        if on(Subsystem::Muscle) && !self.conditions.is_empty() {
            for muscle in &mut self.muscles {
                muscle.set_spasm(spasm);
            }
        }
        if visible(Subsystem::Nerve) {
            let limit = self.quality.scale_count(self.nerve_capacity);
            self.nerves.update(step, limit);
        }
        if visible(Subsystem::Lymphatic) {
            self.lymph.update(step, multiplier);
        } else if on(Subsystem::Lymphatic) {
            self.lymph.advance_phase(step);
        }

        self.stats = AnimationStats {
            time,
            step,
            blood_particles: self.blood.active_particles(),
            lymph_particles: self.lymph.active_particles(),
            nerve_pulses: self.nerves.active_count(),
            active_conditions: self.conditions.len(),
        };
        self.stats
    }

    pub fn stats(&self) -> AnimationStats {
        self.stats
    }

    pub fn heart(&self) -> &CardiacCycle {
        &self.heart
    }

    pub fn respiration(&self) -> &RespiratoryCycle {
        &self.respiration
    }

    pub fn blood(&self) -> &BloodFlow {
        &self.blood
    }

    pub fn lymph(&self) -> &LymphaticFlow {
        &self.lymph
    }

    pub fn peristalsis(&self) -> &Peristalsis {
        &self.peristalsis
    }

    pub fn nerves(&self) -> &NerveSignals {
        &self.nerves
    }

    pub fn joints(&self) -> &[JointOscillator] {
        &self.joints
    }

    pub fn muscles(&self) -> &[MuscleDrive] {
        &self.muscles
    }

    /// Contraction of muscle `index`, or 0 when the muscle subsystem is off.
    pub fn muscle_contraction(&self, index: usize) -> f32 {
        if !self.is_subsystem_enabled(Subsystem::Muscle) {
            return 0.0;
        }
        self.muscles
            .get(index)
            .map_or(0.0, |m| m.contraction(&self.joints))
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::conditions::Severity;

    const DT: f32 = 1.0 / 60.0;

    fn engine(quality: AnimationQuality) -> AnimationEngine {
        let settings = AnimationSettings {
            quality,
            ..AnimationSettings::default()
        };
        AnimationEngine::new(settings, AnimationRig::default_body().unwrap())
    }

    fn run(engine: &mut AnimationEngine, frames: usize, activity: &SubsystemActivity) {
        for _ in 0..frames {
            engine.update(DT, activity);
        }
    }

    /// Resuming continues from the exact phase shown when paused.
    #[test]
    fn test_pause_resume_continuity() {
        let all = SubsystemActivity::all_visible();
        let mut e = engine(AnimationQuality::Standard);
        run(&mut e, 10, &all);
        let heart = e.heart().phase();
        let breath = e.respiration().phase();
        let time = e.time();

        e.pause();
        run(&mut e, 30, &all);
        assert_eq!(e.heart().phase(), heart);
        assert_eq!(e.respiration().phase(), breath);
        assert_eq!(e.time(), time);

        e.play();
        e.update(DT, &all);
        let expected = heart + DT / e.heart().period();
        assert!((e.heart().phase() - expected).abs() < 1e-5);
    }

    /// Double speed advances phase twice as far per frame.
    #[test]
    fn test_speed_scaling() {
        let all = SubsystemActivity::all_visible();
        let mut normal = engine(AnimationQuality::Standard);
        let mut fast = engine(AnimationQuality::Standard);
        fast.set_speed(2.0);
        normal.update(0.1, &all);
        fast.update(0.1, &all);
        assert!((normal.heart().phase() - 0.125).abs() < 1e-5);
        assert!((fast.heart().phase() - 0.25).abs() < 1e-5);
        assert!((fast.time() - 0.2).abs() < 1e-6);
    }

    /// A toggled-off subsystem keeps its phase while the others run on.
    #[test]
    fn test_toggle_keeps_phase() {
        let all = SubsystemActivity::all_visible();
        let mut e = engine(AnimationQuality::Standard);
        run(&mut e, 5, &all);
        assert!(!e.toggle_subsystem(Subsystem::Heart));
        let heart = e.heart().phase();
        let breath = e.respiration().phase();
        run(&mut e, 20, &all);
        assert_eq!(e.heart().phase(), heart);
        assert!(e.respiration().phase() > breath);
        assert!(e.toggle_subsystem(Subsystem::Heart));
        e.update(DT, &all);
        assert!(e.heart().phase() > heart);
    }

    /// Culled hosts cost nothing per element but their phases still move.
    #[test]
    fn test_culled_subsystems_skip_particles() {
        let none = SubsystemActivity::none_visible();
        let mut e = engine(AnimationQuality::Educational);
        run(&mut e, 120, &none);
        assert_eq!(e.blood().active_particles(), 0);
        assert_eq!(e.lymph().active_particles(), 0);
        assert_eq!(e.nerves().active_count(), 0);
        assert!(e.heart().phase() > 0.0);
        assert!(e.lymph().node_phase() > 0.0);
    }

    /// Particle counts stay inside the quality-scaled pool limit.
    #[test]
    fn test_particle_counts_bounded() {
        let all = SubsystemActivity::all_visible();
        let capacity = AnimationSettings::default().blood.flow.max_particles;
        let mut e = engine(AnimationQuality::Educational);
        for _ in 0..600 {
            let stats = e.update(DT, &all);
            assert!(stats.blood_particles <= capacity);
        }
        assert!(e.blood().active_particles() > 0);

        e.set_quality(AnimationQuality::Subtle);
        let stats = e.update(DT, &all);
        assert!(stats.blood_particles <= AnimationQuality::Subtle.scale_count(capacity));

        e.set_quality(AnimationQuality::Off);
        let stats = e.update(DT, &all);
        assert_eq!(stats.blood_particles, 0);
        assert_eq!(stats.step, 0.0);
    }

    #[test]
    fn test_restriction_condition_lifecycle() {
        let mut e = engine(AnimationQuality::Standard);
        let id = e.add_condition(ConditionSpec::new(
            ConditionKind::RespiratoryRestriction,
            Severity::Moderate,
            Vec3::new(0.0, 1.3, 0.0),
            0.1,
        ));
        assert!((e.respiration().restriction() - 0.42).abs() < 1e-6);
        assert!(e.remove_condition(id));
        assert_eq!(e.respiration().restriction(), 0.0);
        assert!(!e.remove_condition(id));
    }

    #[test]
    fn test_blockage_condition_installs_blockage() {
        let mut e = engine(AnimationQuality::Standard);
        let center = Vec3::new(0.0, 1.05, -0.05);
        let id = e.add_condition(ConditionSpec::new(ConditionKind::Blockage, Severity::Severe, center, 0.05));
        assert_eq!(e.blood().blockages(), &[Blockage { center, radius: 0.05 }]);
        e.remove_condition(id);
        assert!(e.blood().blockages().is_empty());
    }

    /// Annotations are reported only at the educational tier.
    #[test]
    fn test_annotations_only_when_educational() {
        let all = SubsystemActivity::all_visible();
        let spec = ConditionSpec::new(ConditionKind::TumorGrowth, Severity::Mild, Vec3::ZERO, 0.02);

        let mut standard = engine(AnimationQuality::Standard);
        standard.add_condition(spec.clone());
        standard.update(DT, &all);
        assert!(standard.condition_effects()[0].annotation.is_none());

        let mut educational = engine(AnimationQuality::Educational);
        educational.add_condition(spec);
        educational.update(DT, &all);
        let effect = &educational.condition_effects()[0];
        assert_eq!(effect.annotation.as_ref().unwrap().id, "tumor-intro");
    }

    #[test]
    fn test_muscle_follows_joint() {
        let all = SubsystemActivity::all_visible();
        let mut e = engine(AnimationQuality::Standard);
        run(&mut e, 30, &all);
        let expected = e.joints()[e.muscles()[0].joint].normalized_flexion();
        assert!((e.muscle_contraction(0) - expected).abs() < 1e-6);
        e.toggle_subsystem(Subsystem::Muscle);
        assert_eq!(e.muscle_contraction(0), 0.0);
    }
}
