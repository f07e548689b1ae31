//! Scripted camera path for the headless tour.

use glam::Vec3;
use vitalis_scene::CameraState;

/// A camera pose the path passes through at `time`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Shot {
    pub time: f32,
    pub position: Vec3,
    pub target: Vec3,
    /// Jump to this shot instead of travelling to it.
    pub cut: bool,
}

impl Shot {
    pub fn new(time: f32, position: Vec3, target: Vec3) -> Self {
        Self {
            time,
            position,
            target,
            cut: false,
        }
    }

    pub fn cut(mut self) -> Self {
        self.cut = true;
        self
    }
}

/// Looping camera path through a list of shots.
#[derive(Clone, Debug)]
pub struct CameraDolly {
    shots: Vec<Shot>,
}

impl CameraDolly {
    /// Shots are ordered by time. An empty list holds the default camera.
    pub fn new(mut shots: Vec<Shot>) -> Self {
        shots.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { shots }
    }

    /// Whole body, heart, thorax side, head (cut), abdomen, and back out.
    pub fn tour() -> Self {
        let wide = Shot::new(0.0, Vec3::new(0.0, 1.1, 3.0), Vec3::new(0.0, 1.1, 0.0));
        Self::new(vec![
            wide,
            Shot::new(8.0, Vec3::new(0.15, 1.32, 0.45), Vec3::new(0.01, 1.3, 0.05)),
            Shot::new(14.0, Vec3::new(0.5, 1.3, 0.2), Vec3::new(0.0, 1.3, 0.0)),
            Shot::new(20.0, Vec3::new(0.0, 1.7, 0.4), Vec3::new(0.0, 1.67, 0.0)).cut(),
            Shot::new(26.0, Vec3::new(0.3, 1.1, 0.5), Vec3::new(0.05, 1.1, 0.0)),
            Shot::new(34.0, Vec3::new(0.0, 1.0, 4.0), Vec3::new(0.0, 1.0, 0.0)),
            Shot { time: 40.0, ..wide },
        ])
    }

    /// Loop length in seconds.
    pub fn duration(&self) -> f32 {
        self.shots.last().map_or(0.0, |s| s.time)
    }

    /// Map any time onto the loop.
    pub fn loop_time(&self, time: f32) -> f32 {
        let duration = self.duration();
        if duration > 0.0 { time.rem_euclid(duration) } else { 0.0 }
    }

    pub fn sample(&self, time: f32) -> CameraState {
        let (Some(first), Some(last)) = (self.shots.first(), self.shots.last()) else {
            return CameraState::default();
        };
        let t = self.loop_time(time);
        if t <= first.time {
            return CameraState::looking_at(first.position, first.target);
        }
        let Some(i) = self.shots.windows(2).position(|w| t < w[1].time) else {
            return CameraState::looking_at(last.position, last.target);
        };
        let (from, to) = (self.shots[i], self.shots[i + 1]);
        if to.cut {
            return CameraState::looking_at(from.position, from.target);
        }
        let span = (to.time - from.time).max(f32::EPSILON);
        let x = ((t - from.time) / span).clamp(0.0, 1.0);
        let eased = x * x * (3.0 - 2.0 * x);
        CameraState::looking_at(
            from.position.lerp(to.position, eased),
            from.target.lerp(to.target, eased),
        )
    }

    /// Whether a cut lies in `(from, to]`, following the loop when `to` wrapped.
    pub fn cut_between(&self, from: f32, to: f32) -> bool {
        let (from, to) = (self.loop_time(from), self.loop_time(to));
        self.shots.iter().filter(|s| s.cut).any(|s| {
            if from <= to {
                s.time > from && s.time <= to
            } else {
                s.time > from || s.time <= to
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec3, b: Vec3) -> bool {
        a.distance(b) < 1e-4
    }

    #[test]
    fn test_sample_hits_shots() {
        let dolly = CameraDolly::tour();
        assert_eq!(dolly.duration(), 40.0);
        let start = dolly.sample(0.0);
        assert!(close(start.position, Vec3::new(0.0, 1.1, 3.0)));
        let heart = dolly.sample(8.0);
        assert!(close(heart.position, Vec3::new(0.15, 1.32, 0.45)));
        assert!(close(heart.target, Vec3::new(0.01, 1.3, 0.05)));
    }

    /// Halfway between two shots is halfway along the path.
    #[test]
    fn test_sample_interpolates() {
        let dolly = CameraDolly::new(vec![
            Shot::new(0.0, Vec3::ZERO, Vec3::Z),
            Shot::new(2.0, Vec3::new(2.0, 0.0, 0.0), Vec3::Z),
        ]);
        let mid = dolly.sample(1.0);
        assert!(close(mid.position, Vec3::new(1.0, 0.0, 0.0)));
        let early = dolly.sample(0.5);
        assert!(early.position.x > 0.0 && early.position.x < 0.5);
    }

    /// A cut holds the previous pose until its time, then jumps.
    #[test]
    fn test_cut_holds_then_jumps() {
        let dolly = CameraDolly::tour();
        let before = dolly.sample(19.9);
        assert!(close(before.position, Vec3::new(0.5, 1.3, 0.2)));
        let after = dolly.sample(20.0);
        assert!(close(after.position, Vec3::new(0.0, 1.7, 0.4)));

        assert!(dolly.cut_between(19.9, 20.0));
        assert!(!dolly.cut_between(20.0, 21.0));
        assert!(!dolly.cut_between(39.9, 40.1));
        assert!(dolly.cut_between(39.0, 60.5));
    }

    #[test]
    fn test_loops() {
        let dolly = CameraDolly::tour();
        assert!(close(dolly.sample(41.0).position, dolly.sample(1.0).position));
        assert_eq!(dolly.loop_time(45.0), 5.0);
    }

    #[test]
    fn test_empty_path_holds_default() {
        let dolly = CameraDolly::new(Vec::new());
        assert_eq!(dolly.duration(), 0.0);
        assert_eq!(dolly.sample(3.0), CameraState::default());
        assert!(!dolly.cut_between(0.0, 1.0));
    }
}
