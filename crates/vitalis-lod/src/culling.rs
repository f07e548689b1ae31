//! Frustum and occlusion culling for structure bounding spheres.
//!
//! Both tests are conservative: anything that might be on screen is kept.

use glam::{Mat4, Vec3, Vec4};
use rustc_hash::FxHashSet;
use vitalis_geometry::{BoundingSphere, StructureId};

/// Result of a frustum test.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intersection {
    Inside,
    Intersecting,
    Outside,
}

/// Why a structure is not drawn this frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CullReason {
    /// Entirely outside the view frustum.
    Frustum,
    /// Hidden behind a nearer occluder.
    Occluded,
    /// Its body system layer is switched off.
    Hidden,
    /// Its visibility predicate rejects the current detail level.
    Predicate,
}

/// Six inward-facing planes extracted from a view-projection matrix.
///
/// Uses the Gribb/Hartmann method with a `[0, 1]` depth range, matching
/// [`Mat4::perspective_rh`].
#[derive(Clone, Debug)]
pub struct ViewFrustum {
    /// `Vec4(nx, ny, nz, d)` per plane, normalised.
    planes: [Vec4; 6],
}

impl ViewFrustum {
    pub fn from_view_proj(vp: &Mat4) -> Self {
        let row0 = vp.row(0);
        let row1 = vp.row(1);
        let row2 = vp.row(2);
        let row3 = vp.row(3);

        let mut planes = [
            row3 + row0, // left
            row3 - row0, // right
            row3 + row1, // bottom
            row3 - row1, // top
            row2,        // near
            row3 - row2, // far
        ];

        for plane in &mut planes {
            let len = plane.truncate().length();
            if len > 1e-8 {
                *plane /= len;
            }
        }

        Self { planes }
    }

    /// Frustum for a camera at `eye` looking at `target`.
    pub fn look_at(eye: Vec3, target: Vec3, fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        let view = Mat4::look_at_rh(eye, target, Vec3::Y);
        let proj = Mat4::perspective_rh(fov_y, aspect, near, far);
        Self::from_view_proj(&(proj * view))
    }

    pub fn test_sphere(&self, center: Vec3, radius: f32) -> Intersection {
        let mut all_inside = true;
        for plane in &self.planes {
            let signed_dist = plane.truncate().dot(center) + plane.w;
            if signed_dist < -radius {
                return Intersection::Outside;
            }
            if signed_dist < radius {
                all_inside = false;
            }
        }
        if all_inside {
            Intersection::Inside
        } else {
            Intersection::Intersecting
        }
    }

    /// Whether any part of the sphere may be visible.
    pub fn intersects_sphere(&self, sphere: &BoundingSphere) -> bool {
        self.test_sphere(sphere.center, sphere.radius) != Intersection::Outside
    }

    pub fn contains_point(&self, point: Vec3) -> bool {
        self.test_sphere(point, 0.0) != Intersection::Outside
    }
}

/// A structure that can hide others: a sphere fully inside its opaque geometry.
#[derive(Clone, Copy, Debug)]
pub struct Occluder {
    pub id: StructureId,
    pub center: Vec3,
    pub inscribed_radius: f32,
}

/// Whether `target` is certainly hidden behind `occluder` as seen from `camera`.
///
/// Requires the camera to be outside both spheres, the target's angular disc to lie
/// inside the occluder's, and the target's nearest point to be beyond the tangent
/// distance of the occluder (every ray in the occluder's cone has entered it by then).
pub fn is_hidden_behind(camera: Vec3, target: &BoundingSphere, occluder: &Occluder) -> bool {
    let to_occluder = occluder.center - camera;
    let occluder_dist = to_occluder.length();
    let r_o = occluder.inscribed_radius;
    if occluder_dist <= r_o || r_o <= 0.0 {
        return false;
    }

    let to_target = target.center - camera;
    let target_dist = to_target.length();
    if target_dist <= target.radius || target_dist < 1e-6 {
        return false;
    }

    let tangent_dist = (occluder_dist * occluder_dist - r_o * r_o).sqrt();
    if target_dist - target.radius < tangent_dist {
        return false;
    }

    let occluder_half_angle = (r_o / occluder_dist).asin();
    let target_half_angle = (target.radius / target_dist).asin();
    let cos_between = (to_occluder.dot(to_target) / (occluder_dist * target_dist)).clamp(-1.0, 1.0);
    let between = cos_between.acos();

    between + target_half_angle <= occluder_half_angle
}

/// CPU occlusion heuristic, evaluated every few frames and cached in between.
#[derive(Clone, Debug)]
pub struct OcclusionCuller {
    interval_frames: u32,
    frames_since: u32,
    evaluated_once: bool,
    occluded: FxHashSet<StructureId>,
}

impl OcclusionCuller {
    pub fn new(interval_frames: u32) -> Self {
        Self {
            interval_frames: interval_frames.max(1),
            frames_since: 0,
            evaluated_once: false,
            occluded: FxHashSet::default(),
        }
    }

    /// Count a frame and report whether occlusion should be re-evaluated.
    pub fn due(&mut self, force: bool) -> bool {
        self.frames_since = self.frames_since.saturating_add(1);
        force || !self.evaluated_once || self.frames_since >= self.interval_frames
    }

    /// Recompute the occluded set for `candidates`.
    pub fn evaluate(
        &mut self,
        camera: Vec3,
        candidates: &[(StructureId, BoundingSphere)],
        occluders: &[Occluder],
    ) {
        self.occluded.clear();
        for (id, sphere) in candidates {
            let hidden = occluders
                .iter()
                .filter(|o| o.id != *id)
                .any(|o| is_hidden_behind(camera, sphere, o));
            if hidden {
                self.occluded.insert(*id);
            }
        }
        self.frames_since = 0;
        self.evaluated_once = true;
    }

    /// Result of the most recent evaluation.
    pub fn is_occluded(&self, id: StructureId) -> bool {
        self.occluded.contains(&id)
    }

    pub fn occluded_count(&self) -> usize {
        self.occluded.len()
    }

    pub fn forget(&mut self, id: StructureId) {
        self.occluded.remove(&id);
    }
}

impl Default for OcclusionCuller {
    fn default() -> Self {
        Self::new(4)
    }
}
