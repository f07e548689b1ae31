//! The headless viewer: builds a scene from config and steps it along the tour.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};
use vitalis_animation::{AnimationEngine, AnimationRig, ConditionId};
use vitalis_assets::{AssetManifest, DirectoryResolver, FileSource, GltfDecoder, ProgressiveLoader};
use vitalis_config::Config;
use vitalis_scene::{FrameOutput, SceneCoordinator};

use crate::anatomy;
use crate::dolly::CameraDolly;
use crate::error::ViewerError;
use crate::frame_stats::{StatsSummary, StatsWindow, clamp_frame_time};
use crate::script::{self, Script};

/// Manifest from the asset root, or an empty one when it is missing or broken.
/// Without a manifest every region stays on its procedural preview.
pub fn load_manifest(config: &Config) -> AssetManifest {
    let path = config.manifest_path();
    if !path.exists() {
        info!("No asset manifest at {}, using procedural previews", path.display());
        return AssetManifest::new(Vec::new());
    }
    match AssetManifest::load(&path) {
        Ok(manifest) => manifest,
        Err(e) => {
            warn!("Ignoring asset manifest {}: {e}", path.display());
            AssetManifest::new(Vec::new())
        }
    }
}

pub struct Viewer {
    scene: SceneCoordinator,
    dolly: CameraDolly,
    script: Script,
    conditions: Vec<ConditionId>,
    stats: StatsWindow,
    stats_interval: u32,
    /// Wall time along the tour, seconds.
    time: f32,
}

impl Viewer {
    pub fn new(config: &Config) -> Result<Self, ViewerError> {
        let registry = Arc::new(anatomy::default_registry()?);
        let loader = ProgressiveLoader::new(
            load_manifest(config),
            Box::new(DirectoryResolver::new(config.memory.asset_root.clone())),
            Arc::new(FileSource),
            Arc::new(GltfDecoder),
            config.loader_settings(),
        );
        let animation = AnimationEngine::new(config.animation_settings(), AnimationRig::default_body()?);
        let scene = SceneCoordinator::new(registry, config.lod_settings(), loader, animation)
            .with_content(Box::new(anatomy::default_content()));

        Ok(Self {
            scene,
            dolly: CameraDolly::tour(),
            script: Script::tour(),
            conditions: Vec::new(),
            stats: StatsWindow::default(),
            stats_interval: config.debug.stats_interval_frames,
            time: 0.0,
        })
    }

    pub fn scene(&self) -> &SceneCoordinator {
        &self.scene
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    /// Push changed settings into the running scene.
    pub fn apply_config(&mut self, config: &Config) {
        self.scene.apply_lod_settings(config.lod_settings());
        self.scene.set_quality_tier(config.animation.quality);
        self.scene.set_memory_tier(config.memory.memory_tier);
        self.scene.set_speed(config.animation.speed);
        self.stats_interval = config.debug.stats_interval_frames;
    }

    /// Advance the tour by `frame_time` seconds and run one scene frame.
    pub fn step(&mut self, frame_time: f32) -> FrameOutput {
        let dt = clamp_frame_time(frame_time);
        let previous = self.time;
        self.time += dt;

        if self.dolly.loop_time(self.time) < self.dolly.loop_time(previous) {
            debug!("Tour looped");
            self.script.rewind();
        }
        let loop_time = self.dolly.loop_time(self.time);
        for event in self.script.due(loop_time) {
            script::apply(&mut self.scene, &event.action, &mut self.conditions);
        }

        if self.dolly.cut_between(previous, self.time) {
            self.scene.request_snap();
        }
        self.scene.set_camera_state(self.dolly.sample(self.time));

        let started = Instant::now();
        let output = self.scene.update(dt);
        self.stats.record(&output, started.elapsed());

        if self.stats_interval > 0 && self.stats.frames() >= self.stats_interval {
            if let Some(summary) = self.stats.summary() {
                self.log_summary(&summary, &output);
            }
            self.stats.reset();
        }
        output
    }

    fn log_summary(&self, summary: &StatsSummary, last: &FrameOutput) {
        info!(
            "{} frames: {:.2} ms/update, {} avg / {} peak of {} triangles, {:.1} rendered, {:.1} culled, {:.0} instances",
            summary.frames,
            summary.avg_update_ms,
            summary.avg_triangles,
            summary.peak_triangles,
            summary.budget,
            summary.avg_rendered,
            summary.avg_culled,
            summary.avg_instances,
        );
        if summary.omitted_frames > 0 {
            warn!("Budget exhausted on {} of {} frames", summary.omitted_frames, summary.frames);
        }
        if summary.loads + summary.swaps + summary.evictions + summary.failures > 0 {
            info!(
                "Assets: {} loaded, {} swaps, {} evicted, {} failed, {} bytes in use",
                summary.loads,
                summary.swaps,
                summary.evictions,
                summary.failures,
                self.scene.loader().memory().used(),
            );
        }
        let animation = &last.animation;
        info!(
            "Animation t={:.1}s: {} blood, {} lymph, {} nerve pulses, {} conditions",
            animation.time,
            animation.blood_particles,
            animation.lymph_particles,
            animation.nerve_pulses,
            animation.active_conditions,
        );
        for effect in self.scene.animation().condition_effects() {
            if let Some(annotation) = &effect.annotation {
                info!("{} [{}]: {}", effect.kind.name(), annotation.title, annotation.description);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use vitalis_animation::AnimationQuality;

    use super::*;
    use crate::frame_stats::FIXED_DT;

    fn config() -> Config {
        let mut config = Config::default();
        config.memory.asset_root = std::env::temp_dir().join("vitalis-missing-assets");
        config.debug.stats_interval_frames = 60;
        config
    }

    #[test]
    fn test_missing_manifest_is_empty() {
        let manifest = load_manifest(&config());
        assert!(manifest.entries.is_empty());
    }

    /// A broken manifest is ignored rather than fatal.
    #[test]
    fn test_broken_manifest_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config();
        config.memory.asset_root = dir.path().to_path_buf();
        std::fs::write(config.manifest_path(), "not ron at all (").unwrap();
        assert!(load_manifest(&config).entries.is_empty());
    }

    /// The tour stays inside the triangle budget and follows the script.
    #[test]
    fn test_tour_respects_budget() {
        let mut viewer = Viewer::new(&config()).unwrap();
        let heart = viewer.scene().registry().by_name("heart").unwrap().id;
        let skin = viewer.scene().registry().by_name("skin").unwrap().id;

        for _ in 0..(7.5 / FIXED_DT) as usize {
            let output = viewer.step(FIXED_DT);
            assert!(output.total_triangles() <= output.lod.budget);
        }
        assert_eq!(viewer.scene().selected(), Some(heart));
        assert!(viewer.scene().level_of(skin).is_none());
        assert_eq!(viewer.scene().animation().conditions().len(), 1);
        assert!(viewer.scene().lod().state(heart).unwrap().is_rendered());
    }

    #[test]
    fn test_apply_config() {
        let mut viewer = Viewer::new(&config()).unwrap();
        let mut changed = config();
        changed.animation.quality = AnimationQuality::Educational;
        changed.budget.triangle_budget = Some(750_000);
        viewer.apply_config(&changed);
        assert_eq!(viewer.scene().animation().quality(), AnimationQuality::Educational);
        assert_eq!(viewer.scene().lod().budget().total(), 750_000);
    }
}
