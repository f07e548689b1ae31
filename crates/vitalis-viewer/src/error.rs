use thiserror::Error;
use vitalis_animation::AnimationError;
use vitalis_geometry::GeometryDescriptorError;

use crate::platform::PlatformError;

/// Startup failures. Per-frame work never fails.
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("failed to build anatomy: {0}")]
    Anatomy(#[from] GeometryDescriptorError),
    #[error("failed to build animation rig: {0}")]
    Rig(#[from] AnimationError),
    #[error("{0}")]
    Platform(#[from] PlatformError),
}
