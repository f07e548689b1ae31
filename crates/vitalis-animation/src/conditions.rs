//! Pathology overlays layered on top of the normal physiology.
//!
//! Each overlay is attached to a point (and optionally a structure) and produces a
//! [`ConditionEffect`] every frame: a progress value through its own cycle, an
//! intensity, a scale to apply to the host, and a glow amount. In educational mode the
//! overlay also reports which annotation is due at its current progress.

use std::borrow::Cow;
use std::f32::consts::PI;

use glam::Vec3;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use vitalis_geometry::StructureId;

use crate::respiration::ease_in_out_sine;

const INFLAMMATION_CYCLE_SECONDS: f64 = 2.0;
const EDEMA_CYCLE_SECONDS: f64 = 8.0;
const TUMOR_GROWTH_SECONDS: f32 = 30.0;
const SPASM_BASE_HZ: f32 = 3.0;
const NERVE_FLASH_SECONDS: f64 = 0.3;
const ARRHYTHMIA_BEATS_PER_SECOND: f64 = 1.5;
const GENERIC_CYCLE_SECONDS: f64 = 2.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Mild,
    #[default]
    Moderate,
    Severe,
    Critical,
}

impl Severity {
    pub fn multiplier(self) -> f32 {
        match self {
            Severity::Mild => 0.4,
            Severity::Moderate => 0.7,
            Severity::Severe => 1.0,
            Severity::Critical => 1.3,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionKind {
    Inflammation,
    Arrhythmia,
    Edema,
    MuscleSpasm,
    NervePain,
    RespiratoryRestriction,
    TumorGrowth,
    Blockage,
    Infection,
    Ischemia,
    Hemorrhage,
}

impl ConditionKind {
    pub fn name(self) -> &'static str {
        match self {
            ConditionKind::Inflammation => "inflammation",
            ConditionKind::Arrhythmia => "arrhythmia",
            ConditionKind::Edema => "edema",
            ConditionKind::MuscleSpasm => "muscle-spasm",
            ConditionKind::NervePain => "nerve-pain",
            ConditionKind::RespiratoryRestriction => "respiratory-restriction",
            ConditionKind::TumorGrowth => "tumor-growth",
            ConditionKind::Blockage => "blockage",
            ConditionKind::Infection => "infection",
            ConditionKind::Ischemia => "ischemia",
            ConditionKind::Hemorrhage => "hemorrhage",
        }
    }
}

/// Named stage an overlay is in, for display.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConditionStage {
    Active,
    Expanding,
    Contracting,
    Normal,
    Irregular,
    Swelling,
    Spasming,
    Relaxed,
    Firing,
    EarlyGrowth,
    Advanced,
}

/// Educational text shown while an overlay's progress is inside its window.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: Cow<'static, str>,
    pub title: Cow<'static, str>,
    pub description: Cow<'static, str>,
    /// Progress at which the annotation appears.
    pub trigger: f32,
    /// Display time in seconds; covers `duration / 10` of progress.
    pub duration: f32,
}

impl Annotation {
    const fn builtin(
        id: &'static str,
        title: &'static str,
        description: &'static str,
        trigger: f32,
        duration: f32,
    ) -> Self {
        Self {
            id: Cow::Borrowed(id),
            title: Cow::Borrowed(title),
            description: Cow::Borrowed(description),
            trigger,
            duration,
        }
    }

    /// Whether `progress` is in `[trigger, trigger + duration / 10)`.
    pub fn covers(&self, progress: f32) -> bool {
        progress >= self.trigger && progress < self.trigger + self.duration / 10.0
    }
}

static INFLAMMATION_NOTES: [Annotation; 2] = [
    Annotation::builtin(
        "inflammation-intro",
        "Inflammation Response",
        "Blood vessels dilate and become more permeable, allowing immune cells to reach the affected area.",
        0.0,
        3.0,
    ),
    Annotation::builtin(
        "inflammation-peak",
        "Peak Inflammatory Response",
        "Swelling, redness, heat, and pain are at their maximum as the body fights the cause of inflammation.",
        0.5,
        3.0,
    ),
];
static ARRHYTHMIA_NOTES: [Annotation; 1] = [Annotation::builtin(
    "arrhythmia-intro",
    "Irregular Heart Rhythm",
    "The heart's electrical signals become disorganized, causing irregular heartbeats.",
    0.0,
    4.0,
)];
static BLOCKAGE_NOTES: [Annotation; 2] = [
    Annotation::builtin(
        "blockage-intro",
        "Blood Flow Obstruction",
        "Plaque buildup or clot is restricting blood flow through the vessel.",
        0.0,
        3.0,
    ),
    Annotation::builtin(
        "blockage-effect",
        "Downstream Effects",
        "Tissues beyond the blockage receive less oxygen and nutrients, which can cause damage over time.",
        0.4,
        4.0,
    ),
];
static EDEMA_NOTES: [Annotation; 1] = [Annotation::builtin(
    "edema-intro",
    "Fluid Accumulation",
    "Excess fluid is leaking from blood vessels into surrounding tissues.",
    0.0,
    4.0,
)];
static SPASM_NOTES: [Annotation; 1] = [Annotation::builtin(
    "spasm-intro",
    "Involuntary Contraction",
    "The muscle is contracting involuntarily due to nerve irritation, fatigue, or electrolyte imbalance.",
    0.0,
    3.0,
)];
static NERVE_NOTES: [Annotation; 1] = [Annotation::builtin(
    "nerve-intro",
    "Nerve Signal Disruption",
    "Pain signals are being transmitted due to nerve damage or compression.",
    0.0,
    3.0,
)];
static RESPIRATORY_NOTES: [Annotation; 1] = [Annotation::builtin(
    "respiratory-intro",
    "Airway Restriction",
    "Inflammation or constriction is limiting airflow in the respiratory system.",
    0.0,
    4.0,
)];
static TUMOR_NOTES: [Annotation; 1] = [Annotation::builtin(
    "tumor-intro",
    "Abnormal Cell Growth",
    "Cells are dividing uncontrollably, forming a mass that may compress surrounding tissues.",
    0.0,
    5.0,
)];
static INFECTION_NOTES: [Annotation; 1] = [Annotation::builtin(
    "infection-intro",
    "Pathogen Invasion",
    "Foreign organisms are multiplying in the tissue, triggering an immune response.",
    0.0,
    4.0,
)];
static ISCHEMIA_NOTES: [Annotation; 1] = [Annotation::builtin(
    "ischemia-intro",
    "Reduced Blood Supply",
    "Tissue is not receiving adequate oxygen-rich blood, causing cellular stress.",
    0.0,
    4.0,
)];
static HEMORRHAGE_NOTES: [Annotation; 1] = [Annotation::builtin(
    "hemorrhage-intro",
    "Active Bleeding",
    "Blood is escaping from a damaged vessel into surrounding tissue.",
    0.0,
    3.0,
)];

/// Built-in annotations for a condition kind.
pub fn default_annotations(kind: ConditionKind) -> &'static [Annotation] {
    match kind {
        ConditionKind::Inflammation => &INFLAMMATION_NOTES,
        ConditionKind::Arrhythmia => &ARRHYTHMIA_NOTES,
        ConditionKind::Edema => &EDEMA_NOTES,
        ConditionKind::MuscleSpasm => &SPASM_NOTES,
        ConditionKind::NervePain => &NERVE_NOTES,
        ConditionKind::RespiratoryRestriction => &RESPIRATORY_NOTES,
        ConditionKind::TumorGrowth => &TUMOR_NOTES,
        ConditionKind::Blockage => &BLOCKAGE_NOTES,
        ConditionKind::Infection => &INFECTION_NOTES,
        ConditionKind::Ischemia => &ISCHEMIA_NOTES,
        ConditionKind::Hemorrhage => &HEMORRHAGE_NOTES,
    }
}

/// Sharp rise then slow fall, for twitch-like motion.
pub fn heartbeat_ease(t: f32) -> f32 {
    if t < 0.3 {
        (t / 0.3).powi(2)
    } else {
        1.0 - ((t - 0.3) / 0.7).clamp(0.0, 1.0).sqrt()
    }
}

/// Base beat wave with high-frequency interference scaled by `irregularity`.
pub fn arrhythmia_wave(t: f32, irregularity: f32) -> f32 {
    let base = (t * PI * 2.0).sin();
    let noise = (t * PI * 7.3).sin() * (t * PI * 11.7).sin();
    base + noise * irregularity
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConditionId(pub u32);

/// What to attach and where.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConditionSpec {
    pub kind: ConditionKind,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub structure: Option<StructureId>,
    pub center: Vec3,
    pub radius: f32,
    /// Replaces the built-in annotations when non-empty.
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl ConditionSpec {
    pub fn new(kind: ConditionKind, severity: Severity, center: Vec3, radius: f32) -> Self {
        Self {
            kind,
            severity,
            structure: None,
            center,
            radius,
            annotations: Vec::new(),
        }
    }

    pub fn on_structure(mut self, structure: StructureId) -> Self {
        self.structure = Some(structure);
        self
    }
}

/// Per-frame output of an overlay.
#[derive(Clone, Debug, PartialEq)]
pub struct ConditionEffect {
    pub id: ConditionId,
    pub kind: ConditionKind,
    pub structure: Option<StructureId>,
    pub progress: f32,
    pub intensity: f32,
    pub scale: Vec3,
    pub glow: f32,
    pub stage: ConditionStage,
    pub annotation: Option<Annotation>,
}

/// A live overlay.
#[derive(Clone, Debug)]
pub struct ConditionOverlay {
    id: ConditionId,
    spec: ConditionSpec,
    /// Simulation seconds since the overlay was added.
    elapsed: f32,
    /// Cycle index of the last random roll, for arrhythmia beats and spasm twitches.
    last_roll: Option<i64>,
    irregular: bool,
    strength: f32,
}

impl ConditionOverlay {
    pub fn new(id: ConditionId, spec: ConditionSpec) -> Self {
        Self {
            id,
            spec,
            elapsed: 0.0,
            last_roll: None,
            irregular: false,
            strength: 1.0,
        }
    }

    pub fn id(&self) -> ConditionId {
        self.id
    }

    pub fn spec(&self) -> &ConditionSpec {
        &self.spec
    }

    pub fn kind(&self) -> ConditionKind {
        self.spec.kind
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Depth lost from every breath while this overlay is active.
    pub fn breath_restriction(&self) -> f32 {
        match self.spec.kind {
            ConditionKind::RespiratoryRestriction => 0.6 * self.spec.severity.multiplier(),
            _ => 0.0,
        }
    }

    /// Beat strength imposed on the heart; 1 unless an irregular beat is in progress.
    pub fn beat_strength(&self) -> f32 {
        match self.spec.kind {
            ConditionKind::Arrhythmia => self.strength,
            _ => 1.0,
        }
    }

    fn annotations(&self) -> &[Annotation] {
        if self.spec.annotations.is_empty() {
            default_annotations(self.spec.kind)
        } else {
            &self.spec.annotations
        }
    }

    /// First annotation whose window contains `progress`.
    pub fn active_annotation(&self, progress: f32) -> Option<&Annotation> {
        self.annotations().iter().find(|a| a.covers(progress))
    }

    /// Advance by `step` and evaluate at simulation `time`.
    pub fn update(
        &mut self,
        time: f64,
        step: f32,
        rng: &mut ChaCha8Rng,
        annotate: bool,
    ) -> ConditionEffect {
        self.elapsed += step.max(0.0);
        let severity = self.spec.severity.multiplier();
        let cycle = |seconds: f64| (time.rem_euclid(seconds) / seconds) as f32;

        let mut progress = cycle(GENERIC_CYCLE_SECONDS);
        let mut intensity = severity;
        let mut scale = Vec3::ONE;
        let mut glow = 0.0;
        let mut stage = ConditionStage::Active;

        match self.spec.kind {
            ConditionKind::Inflammation => {
                let phase = cycle(INFLAMMATION_CYCLE_SECONDS);
                let pulse = ease_in_out_sine(phase);
                progress = phase;
                intensity = 0.3 + pulse * 0.7 * severity;
                scale = Vec3::splat(1.0 + pulse * 0.15 * severity);
                glow = 0.2 + pulse * 0.6 * severity;
                stage = if phase < 0.5 {
                    ConditionStage::Expanding
                } else {
                    ConditionStage::Contracting
                };
            }
            ConditionKind::Arrhythmia => {
                let irregularity = 0.2 + severity * 0.4;
                let beat_time = time * ARRHYTHMIA_BEATS_PER_SECOND;
                let beat = beat_time.floor() as i64;
                if self.last_roll != Some(beat) {
                    self.last_roll = Some(beat);
                    self.irregular = rng.random::<f32>() < irregularity * 0.3;
                    self.strength = if self.irregular {
                        0.5 + rng.random::<f32>() * 0.5
                    } else {
                        1.0
                    };
                }
                let raw = arrhythmia_wave(beat_time.fract() as f32, irregularity);
                progress = ((raw + 1.0) / 2.0).clamp(0.0, 1.0);
                intensity = self.strength;
                stage = if self.irregular {
                    ConditionStage::Irregular
                } else {
                    ConditionStage::Normal
                };
            }
            ConditionKind::Edema => {
                let swell = ease_in_out_sine(cycle(EDEMA_CYCLE_SECONDS));
                let max_swelling = 0.1 + severity * 0.2;
                progress = swell;
                intensity = swell * severity;
                scale = Vec3::new(
                    1.0 + swell * max_swelling,
                    1.0 + swell * max_swelling * 0.8,
                    1.0 + swell * max_swelling,
                );
                stage = ConditionStage::Swelling;
            }
            ConditionKind::MuscleSpasm => {
                let frequency = f64::from(SPASM_BASE_HZ * (0.5 + severity));
                let spasm_time = time * frequency;
                let twitch = spasm_time.floor() as i64;
                if self.last_roll != Some(twitch) {
                    self.last_roll = Some(twitch);
                    self.irregular = rng.random::<f32>() < 0.7 + severity * 0.3;
                }
                let phase = spasm_time.fract() as f32;
                let spasming = self.irregular && phase < 0.2;
                intensity = if spasming {
                    heartbeat_ease(phase / 0.2) * severity
                } else {
                    0.0
                };
                progress = intensity;
                scale = Vec3::new(1.0 - 0.1 * intensity, 1.0 + 0.05 * intensity, 1.0 - 0.1 * intensity);
                stage = if spasming {
                    ConditionStage::Spasming
                } else {
                    ConditionStage::Relaxed
                };
            }
            ConditionKind::NervePain => {
                progress = cycle(NERVE_FLASH_SECONDS);
                glow = (1.0 - progress) * severity;
                stage = ConditionStage::Firing;
            }
            ConditionKind::RespiratoryRestriction => {
                intensity = severity * 0.5;
            }
            ConditionKind::TumorGrowth => {
                progress = (self.elapsed / TUMOR_GROWTH_SECONDS).min(1.0);
                let max_growth = 2.0 + severity * 2.0;
                let growth = 1.0 + progress.powf(0.7) * (max_growth - 1.0);
                intensity = growth;
                scale = Vec3::splat(growth);
                stage = if progress < 0.5 {
                    ConditionStage::EarlyGrowth
                } else {
                    ConditionStage::Advanced
                };
            }
            ConditionKind::Blockage
            | ConditionKind::Infection
            | ConditionKind::Ischemia
            | ConditionKind::Hemorrhage => {}
        }

        let annotation = if annotate {
            self.active_annotation(progress).cloned()
        } else {
            None
        };

        ConditionEffect {
            id: self.id,
            kind: self.spec.kind,
            structure: self.spec.structure,
            progress,
            intensity,
            scale,
            glow,
            stage,
            annotation,
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    fn overlay(kind: ConditionKind, severity: Severity) -> ConditionOverlay {
        ConditionOverlay::new(ConditionId(1), ConditionSpec::new(kind, severity, Vec3::ZERO, 0.1))
    }

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    #[test]
    fn test_severity_multipliers() {
        assert_eq!(Severity::Mild.multiplier(), 0.4);
        assert_eq!(Severity::Moderate.multiplier(), 0.7);
        assert_eq!(Severity::Severe.multiplier(), 1.0);
        assert_eq!(Severity::Critical.multiplier(), 1.3);
    }

    /// Inflammation peaks mid-cycle at `1 + 0.15·severity`.
    #[test]
    fn test_inflammation_pulse() {
        let mut o = overlay(ConditionKind::Inflammation, Severity::Severe);
        let mut rng = rng();
        let start = o.update(0.0, 0.0, &mut rng, false);
        assert_eq!(start.scale, Vec3::ONE);
        assert!((start.intensity - 0.3).abs() < 1e-6);
        let peak = o.update(2.0 - 1e-6, 0.0, &mut rng, false);
        assert!((peak.scale.x - 1.15).abs() < 1e-3);
        assert!((peak.glow - 0.8).abs() < 1e-3);
        assert_eq!(peak.stage, ConditionStage::Contracting);
    }

    /// Tumor growth follows `progress^0.7` over thirty seconds of overlay time.
    #[test]
    fn test_tumor_growth_curve() {
        let mut o = overlay(ConditionKind::TumorGrowth, Severity::Severe);
        let mut rng = rng();
        let half = o.update(0.0, 15.0, &mut rng, false);
        let expected = 1.0 + 0.5f32.powf(0.7) * 3.0;
        assert!((half.scale.x - expected).abs() < 1e-4);
        let done = o.update(0.0, 100.0, &mut rng, false);
        assert!((done.scale.x - 4.0).abs() < 1e-5);
        assert_eq!(done.progress, 1.0);
        assert_eq!(done.stage, ConditionStage::Advanced);
    }

    #[test]
    fn test_edema_swells_less_vertically() {
        let mut o = overlay(ConditionKind::Edema, Severity::Severe);
        let effect = o.update(4.0, 0.0, &mut rng(), false);
        assert!((effect.progress - 0.5).abs() < 1e-5);
        assert!((effect.scale.x - 1.15).abs() < 1e-4);
        assert!((effect.scale.y - 1.12).abs() < 1e-4);
        assert!((effect.intensity - 0.5).abs() < 1e-4);
    }

    /// Restriction removes `0.6·severity` of breath depth.
    #[test]
    fn test_breath_restriction() {
        let o = overlay(ConditionKind::RespiratoryRestriction, Severity::Moderate);
        assert!((o.breath_restriction() - 0.42).abs() < 1e-6);
        assert_eq!(overlay(ConditionKind::Edema, Severity::Severe).breath_restriction(), 0.0);
    }

    /// Arrhythmia beat strengths stay in `[0.5, 1]` and the same seed repeats them.
    #[test]
    fn test_arrhythmia_is_seeded() {
        let run = || {
            let mut o = overlay(ConditionKind::Arrhythmia, Severity::Critical);
            let mut rng = rng();
            (0..2000)
                .map(|i| o.update(i as f64 * 0.05, 0.05, &mut rng, false).intensity)
                .collect::<Vec<_>>()
        };
        let a = run();
        assert_eq!(a, run());
        assert!(a.iter().all(|&s| (0.5..=1.0).contains(&s)));
        assert!(a.iter().any(|&s| s < 1.0));
    }

    #[test]
    fn test_spasm_twitch_bounded() {
        let mut o = overlay(ConditionKind::MuscleSpasm, Severity::Severe);
        let mut rng = rng();
        let mut saw_spasm = false;
        for i in 0..300 {
            let e = o.update(i as f64 * 0.01, 0.01, &mut rng, false);
            assert!((0.0..=1.0).contains(&e.intensity));
            saw_spasm |= e.stage == ConditionStage::Spasming;
        }
        assert!(saw_spasm);
    }

    /// Annotations show only inside `[trigger, trigger + duration/10)`.
    #[test]
    fn test_annotation_windows() {
        let o = overlay(ConditionKind::Inflammation, Severity::Mild);
        assert_eq!(o.active_annotation(0.1).unwrap().id, "inflammation-intro");
        assert!(o.active_annotation(0.35).is_none());
        assert_eq!(o.active_annotation(0.6).unwrap().id, "inflammation-peak");
        assert!(o.active_annotation(0.9).is_none());
    }

    #[test]
    fn test_custom_annotations_replace_defaults() {
        let mut spec = ConditionSpec::new(ConditionKind::Edema, Severity::Mild, Vec3::ZERO, 0.1);
        spec.annotations.push(Annotation {
            id: "custom".into(),
            title: "Custom".into(),
            description: "Authored note.".into(),
            trigger: 0.0,
            duration: 10.0,
        });
        let mut o = ConditionOverlay::new(ConditionId(3), spec);
        let effect = o.update(1.0, 0.0, &mut rng(), true);
        assert_eq!(effect.annotation.unwrap().id, "custom");
        let silent = o.update(1.0, 0.0, &mut rng(), false);
        assert!(silent.annotation.is_none());
    }
}
