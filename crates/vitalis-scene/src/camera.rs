use std::f32::consts::FRAC_PI_4;

use glam::Vec3;
use vitalis_lod::{CameraView, ViewFrustum};

/// Orbit-style camera pose plus projection parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraState {
    pub position: Vec3,
    pub target: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 1.2, 3.5),
            target: Vec3::new(0.0, 1.1, 0.0),
            fov_y: FRAC_PI_4,
            aspect: 16.0 / 9.0,
            near: 0.05,
            far: 200.0,
        }
    }
}

impl CameraState {
    /// Default projection, custom pose.
    pub fn looking_at(position: Vec3, target: Vec3) -> Self {
        Self {
            position,
            target,
            ..Self::default()
        }
    }

    pub fn view(&self) -> CameraView {
        CameraView {
            position: self.position,
            frustum: ViewFrustum::look_at(
                self.position,
                self.target,
                self.fov_y,
                self.aspect,
                self.near,
                self.far,
            ),
        }
    }

    pub fn distance_to(&self, point: Vec3) -> f32 {
        self.position.distance(point)
    }
}

#[cfg(test)]
mod tests {
    use vitalis_lod::Intersection;

    use super::*;

    /// The target is in view and the space behind the camera is not.
    #[test]
    fn test_view_frustum_faces_target() {
        let camera = CameraState::looking_at(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO);
        let view = camera.view();
        assert_eq!(view.position, camera.position);
        assert_ne!(view.frustum.test_sphere(Vec3::ZERO, 0.5), Intersection::Outside);
        assert_eq!(
            view.frustum.test_sphere(Vec3::new(0.0, 0.0, 20.0), 0.5),
            Intersection::Outside
        );
    }

    #[test]
    fn test_distance_to() {
        let camera = CameraState::looking_at(Vec3::new(3.0, 4.0, 0.0), Vec3::ZERO);
        assert!((camera.distance_to(Vec3::ZERO) - 5.0).abs() < 1e-6);
    }
}
