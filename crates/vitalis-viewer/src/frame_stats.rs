//! Frame pacing constants and rolling frame statistics.

use std::time::Duration;

use tracing::warn;
use vitalis_scene::FrameOutput;

/// Simulation step of the headless viewer: 60 Hz.
pub const FIXED_DT: f32 = 1.0 / 60.0;

/// Longest frame time fed to the scene. Longer frames are clamped and the
/// simulation accepts the slowdown rather than taking one huge step.
pub const MAX_FRAME_TIME: f32 = 0.25;

/// Sanitise a measured frame time.
pub fn clamp_frame_time(frame_time: f32) -> f32 {
    if !frame_time.is_finite() || frame_time <= 0.0 {
        return 0.0;
    }
    if frame_time > MAX_FRAME_TIME {
        warn!(
            "Frame time {:.1}ms exceeds maximum, clamping to {:.1}ms",
            frame_time * 1000.0,
            MAX_FRAME_TIME * 1000.0
        );
        return MAX_FRAME_TIME;
    }
    frame_time
}

/// Averages over one logging window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StatsSummary {
    pub frames: u32,
    pub avg_update_ms: f64,
    pub avg_triangles: u64,
    pub peak_triangles: u64,
    pub budget: u64,
    pub avg_rendered: f32,
    pub avg_culled: f32,
    pub omitted_frames: u32,
    pub avg_instances: f32,
    pub loads: usize,
    pub swaps: usize,
    pub evictions: usize,
    pub failures: usize,
}

/// Accumulates [`FrameOutput`]s between stats log lines.
#[derive(Clone, Debug, Default)]
pub struct StatsWindow {
    frames: u32,
    update_time: Duration,
    triangles: u64,
    peak_triangles: u64,
    budget: u64,
    rendered: usize,
    culled: usize,
    omitted_frames: u32,
    instances: usize,
    loads: usize,
    swaps: usize,
    evictions: usize,
    failures: usize,
}

impl StatsWindow {
    pub fn record(&mut self, output: &FrameOutput, update_time: Duration) {
        let lod = &output.lod;
        let triangles = output.total_triangles();
        self.frames += 1;
        self.update_time += update_time;
        self.triangles += triangles;
        self.peak_triangles = self.peak_triangles.max(triangles);
        self.budget = lod.budget;
        self.rendered += lod.rendered;
        self.culled += lod.culled_frustum + lod.culled_occluded + lod.culled_hidden + lod.culled_predicate;
        if lod.omitted > 0 {
            self.omitted_frames += 1;
        }
        self.instances += output.instances;
        self.loads += output.loader.loaded.len();
        self.swaps += output.loader.swaps.len();
        self.evictions += output.loader.evicted.len();
        self.failures += output.loader.failed.len();
    }

    pub fn frames(&self) -> u32 {
        self.frames
    }

    /// `None` until at least one frame was recorded.
    pub fn summary(&self) -> Option<StatsSummary> {
        if self.frames == 0 {
            return None;
        }
        let n = self.frames as f32;
        Some(StatsSummary {
            frames: self.frames,
            avg_update_ms: self.update_time.as_secs_f64() * 1000.0 / f64::from(self.frames),
            avg_triangles: self.triangles / u64::from(self.frames),
            peak_triangles: self.peak_triangles,
            budget: self.budget,
            avg_rendered: self.rendered as f32 / n,
            avg_culled: self.culled as f32 / n,
            omitted_frames: self.omitted_frames,
            avg_instances: self.instances as f32 / n,
            loads: self.loads,
            swaps: self.swaps,
            evictions: self.evictions,
            failures: self.failures,
        })
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use vitalis_lod::LodFrameReport;

    use super::*;

    fn output(triangles: u64, rendered: usize, omitted: usize) -> FrameOutput {
        FrameOutput {
            lod: LodFrameReport {
                rendered,
                culled_frustum: 2,
                omitted,
                triangles,
                budget: 1_000,
                ..Default::default()
            },
            instances: 10,
            ..Default::default()
        }
    }

    #[test]
    fn test_clamp_frame_time() {
        assert_eq!(clamp_frame_time(FIXED_DT), FIXED_DT);
        assert_eq!(clamp_frame_time(1.0), MAX_FRAME_TIME);
        assert_eq!(clamp_frame_time(-0.1), 0.0);
        assert_eq!(clamp_frame_time(f32::NAN), 0.0);
    }

    #[test]
    fn test_window_averages() {
        let mut window = StatsWindow::default();
        assert!(window.summary().is_none());
        window.record(&output(400, 4, 0), Duration::from_millis(2));
        window.record(&output(800, 6, 1), Duration::from_millis(4));

        let summary = window.summary().unwrap();
        assert_eq!(summary.frames, 2);
        assert_eq!(summary.avg_triangles, 600);
        assert_eq!(summary.peak_triangles, 800);
        assert_eq!(summary.budget, 1_000);
        assert_eq!(summary.avg_rendered, 5.0);
        assert_eq!(summary.avg_culled, 2.0);
        assert_eq!(summary.omitted_frames, 1);
        assert_eq!(summary.avg_instances, 10.0);
        assert!((summary.avg_update_ms - 3.0).abs() < 1e-9);

        window.reset();
        assert_eq!(window.frames(), 0);
    }
}
