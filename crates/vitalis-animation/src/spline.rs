//! Arc-length parameterised paths for particles and pulses.

use glam::Vec3;

use crate::error::AnimationError;

/// A polyline sampled by normalised arc length.
#[derive(Clone, Debug, PartialEq)]
pub struct PathSpline {
    points: Vec<Vec3>,
    /// Distance from the first point to each point.
    cumulative: Vec<f32>,
}

impl PathSpline {
    /// Needs at least two points and a non-zero, finite length.
    pub fn new(name: &str, points: Vec<Vec3>) -> Result<Self, AnimationError> {
        if points.len() < 2 || points.iter().any(|p| !p.is_finite()) {
            return Err(AnimationError::DegeneratePath(name.to_string()));
        }
        let mut cumulative = Vec::with_capacity(points.len());
        let mut total = 0.0;
        cumulative.push(0.0);
        for pair in points.windows(2) {
            total += pair[0].distance(pair[1]);
            cumulative.push(total);
        }
        if total <= f32::EPSILON {
            return Err(AnimationError::DegeneratePath(name.to_string()));
        }
        Ok(Self { points, cumulative })
    }

    pub fn length(&self) -> f32 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Position at normalised arc length `t`, clamped to `[0, 1]`.
    pub fn sample(&self, t: f32) -> Vec3 {
        let (i, local) = self.locate(t);
        self.points[i].lerp(self.points[i + 1], local)
    }

    /// Unit direction of travel at `t`.
    pub fn tangent(&self, t: f32) -> Vec3 {
        let (i, _) = self.locate(t);
        (self.points[i + 1] - self.points[i]).normalize_or_zero()
    }

    fn locate(&self, t: f32) -> (usize, f32) {
        let target = t.clamp(0.0, 1.0) * self.length();
        let segment = self
            .cumulative
            .partition_point(|&d| d <= target)
            .saturating_sub(1)
            .min(self.points.len() - 2);
        let start = self.cumulative[segment];
        let span = self.cumulative[segment + 1] - start;
        let local = if span > 0.0 {
            ((target - start) / span).clamp(0.0, 1.0)
        } else {
            0.0
        };
        (segment, local)
    }
}
