//! Animation rig validation errors.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum JointRangeError {
    #[error("joint `{name}` has non-finite limits")]
    NonFinite { name: String },

    #[error("joint `{name}` minimum {min} is not below maximum {max}")]
    Inverted { name: String, min: f32, max: f32 },
}

/// Problems in an [`AnimationRig`](crate::AnimationRig), reported before any
/// animation runs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnimationError {
    #[error("path `{0}` needs at least two distinct finite points")]
    DegeneratePath(String),

    #[error(transparent)]
    JointRange(#[from] JointRangeError),

    #[error("muscle `{muscle}` drives unknown joint `{joint}`")]
    UnknownJoint { muscle: String, joint: String },

    #[error("invalid {field}: {value}")]
    InvalidSetting { field: &'static str, value: f32 },

    #[error("failed to parse rig: {0}")]
    Parse(#[source] ron::error::SpannedError),
}
