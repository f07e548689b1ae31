//! Paths, joints and muscles the animation subsystems move along.
//!
//! A [`RigDef`] is plain data (RON friendly); [`AnimationRig::from_def`] validates it into
//! splines and oscillators. The default definition describes an adult standing at the
//! origin, Y up, in metres.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::AnimationError;
use crate::joint::{JointOscillator, JointRange, MuscleDrive};
use crate::spline::PathSpline;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathDef {
    pub name: String,
    pub points: Vec<Vec3>,
}

impl PathDef {
    fn new(name: &str, points: &[[f32; 3]]) -> Self {
        Self {
            name: name.to_string(),
            points: points.iter().map(|&p| Vec3::from_array(p)).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JointDef {
    pub name: String,
    /// Radians.
    pub min: f32,
    pub max: f32,
    pub period_seconds: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MuscleDef {
    pub name: String,
    /// Name of the driving joint.
    pub joint: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RigDef {
    pub vessels: Vec<PathDef>,
    pub lymph_vessels: Vec<PathDef>,
    pub nerves: Vec<PathDef>,
    pub joints: Vec<JointDef>,
    pub muscles: Vec<MuscleDef>,
}

impl Default for RigDef {
    fn default() -> Self {
        let joint = |name: &str, min_deg: f32, max_deg: f32, period_seconds: f32| JointDef {
            name: name.to_string(),
            min: min_deg.to_radians(),
            max: max_deg.to_radians(),
            period_seconds,
        };
        let muscle = |name: &str, joint: &str| MuscleDef {
            name: name.to_string(),
            joint: joint.to_string(),
        };
        Self {
            vessels: vec![
                PathDef::new(
                    "aorta",
                    &[[0.02, 1.30, 0.02], [0.03, 1.38, 0.0], [0.0, 1.36, -0.04], [0.0, 1.05, -0.05], [0.0, 0.95, -0.04]],
                ),
                PathDef::new(
                    "left-femoral-artery",
                    &[[0.0, 0.95, -0.04], [0.08, 0.85, 0.0], [0.10, 0.60, 0.02], [0.09, 0.45, 0.0]],
                ),
                PathDef::new(
                    "right-femoral-artery",
                    &[[0.0, 0.95, -0.04], [-0.08, 0.85, 0.0], [-0.10, 0.60, 0.02], [-0.09, 0.45, 0.0]],
                ),
                PathDef::new(
                    "left-carotid-artery",
                    &[[0.01, 1.38, 0.0], [0.03, 1.45, 0.01], [0.04, 1.55, 0.02]],
                ),
                PathDef::new(
                    "left-brachial-artery",
                    &[[0.03, 1.38, 0.0], [0.17, 1.40, -0.01], [0.24, 1.20, -0.01], [0.28, 1.05, 0.0]],
                ),
                PathDef::new(
                    "inferior-vena-cava",
                    &[[-0.02, 0.95, -0.04], [-0.03, 1.05, -0.05], [-0.02, 1.28, -0.01]],
                ),
            ],
            lymph_vessels: vec![
                PathDef::new(
                    "thoracic-duct",
                    &[[0.0, 1.0, -0.06], [0.0, 1.20, -0.06], [-0.02, 1.40, -0.03]],
                ),
                PathDef::new(
                    "left-leg-lymphatic",
                    &[[0.09, 0.45, 0.02], [0.10, 0.70, 0.03], [0.06, 0.92, 0.02]],
                ),
            ],
            nerves: vec![
                PathDef::new(
                    "spinal-cord",
                    &[[0.0, 1.55, -0.08], [0.0, 1.30, -0.10], [0.0, 1.05, -0.09]],
                ),
                PathDef::new(
                    "left-sciatic-nerve",
                    &[[0.05, 0.95, -0.08], [0.09, 0.75, -0.06], [0.10, 0.48, -0.04]],
                ),
                PathDef::new(
                    "right-sciatic-nerve",
                    &[[-0.05, 0.95, -0.08], [-0.09, 0.75, -0.06], [-0.10, 0.48, -0.04]],
                ),
                PathDef::new(
                    "left-median-nerve",
                    &[[0.05, 1.42, -0.05], [0.18, 1.38, -0.02], [0.25, 1.15, 0.0], [0.29, 0.95, 0.01]],
                ),
            ],
            joints: vec![
                joint("left-elbow", 0.0, 145.0, 4.0),
                joint("right-elbow", 0.0, 145.0, 4.5),
                joint("left-knee", 0.0, 135.0, 5.0),
                joint("right-knee", 0.0, 135.0, 5.5),
                joint("left-shoulder", -60.0, 180.0, 6.0),
                joint("cervical-spine", -50.0, 60.0, 7.0),
            ],
            muscles: vec![
                muscle("left-biceps", "left-elbow"),
                muscle("right-biceps", "right-elbow"),
                muscle("left-hamstrings", "left-knee"),
                muscle("right-hamstrings", "right-knee"),
                muscle("left-deltoid", "left-shoulder"),
                muscle("sternocleidomastoid", "cervical-spine"),
            ],
        }
    }
}

/// Validated rig ready for the animation engine.
#[derive(Clone, Debug, Default)]
pub struct AnimationRig {
    pub vessels: Vec<PathSpline>,
    pub lymph_vessels: Vec<PathSpline>,
    pub nerves: Vec<PathSpline>,
    pub joints: Vec<JointOscillator>,
    pub muscles: Vec<MuscleDrive>,
}

impl AnimationRig {
    pub fn from_def(def: &RigDef) -> Result<Self, AnimationError> {
        let splines = |paths: &[PathDef]| {
            paths
                .iter()
                .map(|p| PathSpline::new(&p.name, p.points.clone()))
                .collect::<Result<Vec<_>, _>>()
        };

        let joints = def
            .joints
            .iter()
            .map(|j| {
                if !j.period_seconds.is_finite() || j.period_seconds <= 0.0 {
                    return Err(AnimationError::InvalidSetting {
                        field: "joint period_seconds",
                        value: j.period_seconds,
                    });
                }
                let range = JointRange::new(&j.name, j.min, j.max)?;
                Ok(JointOscillator::new(j.name.clone(), range, j.period_seconds))
            })
            .collect::<Result<Vec<_>, AnimationError>>()?;

        let muscles = def
            .muscles
            .iter()
            .map(|m| {
                joints
                    .iter()
                    .position(|j| j.name == m.joint)
                    .map(|index| MuscleDrive::new(m.name.clone(), index))
                    .ok_or_else(|| AnimationError::UnknownJoint {
                        muscle: m.name.clone(),
                        joint: m.joint.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            vessels: splines(&def.vessels)?,
            lymph_vessels: splines(&def.lymph_vessels)?,
            nerves: splines(&def.nerves)?,
            joints,
            muscles,
        })
    }

    pub fn from_ron_str(source: &str) -> Result<Self, AnimationError> {
        let def: RigDef = ron::from_str(source).map_err(AnimationError::Parse)?;
        Self::from_def(&def)
    }

    /// The built-in full-body rig.
    pub fn default_body() -> Result<Self, AnimationError> {
        Self::from_def(&RigDef::default())
    }
}
