//! The scene coordinator owns every runtime subsystem and steps them in a fixed order
//! each frame: culling, budget allocation, asset swaps, instance buffers, animation.
//!
//! Nothing here is global. The host creates one [`SceneCoordinator`], feeds it camera
//! and user input through the runtime controls, and calls [`SceneCoordinator::update`]
//! once per frame on the render thread.

use std::collections::BTreeMap;
use std::sync::Arc;

use glam::Vec3;
use rustc_hash::FxHashMap;
use tracing::{debug, info};
use vitalis_animation::{
    AnimationEngine, AnimationQuality, AnimationStats, ConditionId, ConditionSpec, Subsystem,
    SubsystemActivity,
};
use vitalis_assets::{
    FrameRequirements, LoaderReport, MemoryTier, ModelInstance, ModelQuality, ProgressiveLoader,
};
use vitalis_geometry::{BodyRegion, BodySystem, DetailLevel, StructureId, StructureRegistry};
use vitalis_instancing::{InstancedElementKind, InstancedRenderer, InstancingFrame};
use vitalis_lod::{CameraView, LodFrameReport, LodSettings, LodStateManager};

use crate::camera::CameraState;
use crate::content::{ContentProvider, LevelContent, ReadingLevel, StaticContentProvider};

/// Added to the load priority of the selected structure's region.
const SELECTED_PRIORITY_BOOST: f32 = 10.0;

/// Model tier a region needs when its finest rendered structure is at `level`.
pub fn quality_for_level(level: DetailLevel) -> ModelQuality {
    match level {
        DetailLevel::Closeup | DetailLevel::Near => ModelQuality::High,
        DetailLevel::Medium => ModelQuality::Standard,
        DetailLevel::Far => ModelQuality::Preview,
    }
}

/// Everything that happened during one frame.
#[derive(Clone, Debug, Default)]
pub struct FrameOutput {
    pub frame: u64,
    pub lod: LodFrameReport,
    pub loader: LoaderReport,
    pub instanced_draws: usize,
    pub instances: usize,
    pub instanced_triangles: u64,
    /// Instances left out because the triangle budget ran out.
    pub instances_over_budget: usize,
    pub animation: AnimationStats,
}

impl FrameOutput {
    /// Structure triangles plus instanced triangles, never more than `lod.budget`.
    pub fn total_triangles(&self) -> u64 {
        self.lod.triangles + self.instanced_triangles
    }
}

#[derive(Clone, Copy, Debug)]
struct RegionDemand {
    level: DetailLevel,
    distance: f32,
}

pub struct SceneCoordinator {
    registry: Arc<StructureRegistry>,
    lod: LodStateManager,
    loader: ProgressiveLoader,
    animation: AnimationEngine,
    instancing: InstancedRenderer,
    content: Box<dyn ContentProvider>,
    camera: CameraState,
    view: CameraView,
    /// Reused every frame for the blood cell instances.
    blood_positions: Vec<Vec3>,
    frame: u64,
}

impl SceneCoordinator {
    /// Register every structure and start from the default camera.
    pub fn new(
        registry: Arc<StructureRegistry>,
        lod_settings: LodSettings,
        loader: ProgressiveLoader,
        animation: AnimationEngine,
    ) -> Self {
        let mut lod = LodStateManager::new(lod_settings);
        lod.register_all(&registry);
        let camera = CameraState::default();
        info!("Scene ready with {} structures", registry.len());
        Self {
            registry,
            lod,
            loader,
            animation,
            instancing: InstancedRenderer::with_default_anatomy(),
            content: Box::new(StaticContentProvider::new()),
            view: camera.view(),
            camera,
            blood_positions: Vec::new(),
            frame: 0,
        }
    }

    pub fn with_content(mut self, content: Box<dyn ContentProvider>) -> Self {
        self.content = content;
        self
    }

    pub fn with_instancing(mut self, instancing: InstancedRenderer) -> Self {
        self.instancing = instancing;
        self
    }

    pub fn with_camera(mut self, camera: CameraState) -> Self {
        self.set_camera_state(camera);
        self
    }

    // --- Runtime controls ---

    pub fn set_quality_tier(&mut self, quality: AnimationQuality) {
        if quality != self.animation.quality() {
            info!("Animation quality set to {}", quality.name());
        }
        self.animation.set_quality(quality);
    }

    pub fn play(&mut self) {
        self.animation.play();
    }

    pub fn pause(&mut self) {
        self.animation.pause();
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.animation.set_speed(speed);
    }

    /// Flip one animation subsystem on or off. Returns the new state.
    pub fn toggle_subsystem(&mut self, subsystem: Subsystem) -> bool {
        let enabled = self.animation.toggle_subsystem(subsystem);
        debug!("{subsystem} animation {}", if enabled { "enabled" } else { "disabled" });
        enabled
    }

    /// Select a structure. Unknown ids are ignored and return `false`.
    pub fn select_structure(&mut self, id: StructureId) -> bool {
        let Some(structure) = self.registry.get(id) else {
            return false;
        };
        debug!("Selected {}", structure.name);
        self.lod.select(Some(id));
        true
    }

    pub fn select_by_name(&mut self, name: &str) -> Option<StructureId> {
        let id = self.registry.by_name(name)?.id;
        self.select_structure(id);
        Some(id)
    }

    pub fn clear_selection(&mut self) {
        self.lod.select(None);
    }

    pub fn set_camera_state(&mut self, camera: CameraState) {
        self.camera = camera;
        self.view = camera.view();
    }

    /// Jump straight to target levels on the next frame, without crossfades.
    pub fn request_snap(&mut self) {
        self.lod.request_snap();
    }

    pub fn set_system_visible(&mut self, system: BodySystem, visible: bool) {
        self.lod.set_system_visible(system, visible);
    }

    pub fn add_condition(&mut self, spec: ConditionSpec) -> ConditionId {
        self.animation.add_condition(spec)
    }

    pub fn remove_condition(&mut self, id: ConditionId) -> bool {
        self.animation.remove_condition(id)
    }

    pub fn set_memory_tier(&mut self, tier: MemoryTier) {
        self.loader.set_memory_tier(tier);
    }

    pub fn apply_lod_settings(&mut self, settings: LodSettings) {
        self.lod.apply_settings(settings);
    }

    // --- Queries ---

    pub fn selected(&self) -> Option<StructureId> {
        self.lod.selected()
    }

    /// Educational text for the selected structure, if it has any at `level`.
    pub fn selected_content(&self, level: ReadingLevel) -> Option<LevelContent> {
        let structure = self.registry.get(self.lod.selected()?)?;
        let content_id = structure.content_id.as_deref()?;
        self.content.content_for_level(content_id, level)
    }

    pub fn level_of(&self, id: StructureId) -> Option<DetailLevel> {
        self.lod
            .state(id)
            .filter(|state| state.is_rendered())
            .map(|state| state.level)
    }

    /// A fresh instance of the region's current model, or `None` while on the preview.
    pub fn region_model(&self, region: BodyRegion) -> Option<ModelInstance> {
        self.loader.acquire(region)
    }

    pub fn registry(&self) -> &StructureRegistry {
        &self.registry
    }

    pub fn lod(&self) -> &LodStateManager {
        &self.lod
    }

    pub fn loader(&self) -> &ProgressiveLoader {
        &self.loader
    }

    pub fn animation(&self) -> &AnimationEngine {
        &self.animation
    }

    pub fn instancing(&self) -> &InstancedRenderer {
        &self.instancing
    }

    pub fn camera(&self) -> &CameraState {
        &self.camera
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Run one frame.
    pub fn update(&mut self, dt: f32) -> FrameOutput {
        self.frame += 1;
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        let lod = self.lod.update(&self.registry, &self.view, dt);

        // What is on screen drives loading, instancing and animation.
        let mut regions: BTreeMap<BodyRegion, RegionDemand> = BTreeMap::new();
        let mut systems: FxHashMap<BodySystem, DetailLevel> = FxHashMap::default();
        for (id, state) in self.lod.states() {
            if !state.is_rendered() {
                continue;
            }
            let Some(structure) = self.registry.get(id) else {
                continue;
            };
            regions
                .entry(structure.region)
                .and_modify(|demand| {
                    demand.level = demand.level.max(state.level);
                    demand.distance = demand.distance.min(state.distance);
                })
                .or_insert(RegionDemand {
                    level: state.level,
                    distance: state.distance,
                });
            systems
                .entry(structure.system)
                .and_modify(|level| *level = (*level).max(state.level))
                .or_insert(state.level);
        }

        let loader = self.update_assets(&regions, dt);

        self.blood_positions.clear();
        self.blood_positions.extend(self.animation.blood().positions());
        let mut host_levels = [None; 4];
        for kind in InstancedElementKind::ALL {
            host_levels[kind.index()] = systems.get(&kind.host_system()).copied();
        }
        let frame = InstancingFrame {
            frustum: &self.view.frustum,
            quality: self.animation.quality(),
            host_levels,
            blood_cells: &self.blood_positions,
            triangle_allowance: lod.budget.saturating_sub(lod.triangles),
        };
        self.instancing.prepare(&frame);

        let mut activity = SubsystemActivity::none_visible();
        for &system in systems.keys() {
            activity.mark_system_visible(system);
        }
        let animation = self.animation.update(dt, &activity);

        FrameOutput {
            frame: self.frame,
            lod,
            loader,
            instanced_draws: self.instancing.draws().len(),
            instances: self.instancing.instances().len(),
            instanced_triangles: self.instancing.total_triangles(),
            instances_over_budget: self.instancing.budget_limited(),
            animation,
        }
    }

    /// Request the tier each visible region needs, then let the loader swap models in.
    fn update_assets(&mut self, regions: &BTreeMap<BodyRegion, RegionDemand>, dt: f32) -> LoaderReport {
        let selected_region = self
            .lod
            .selected()
            .and_then(|id| self.registry.get(id))
            .map(|structure| structure.region);

        let mut requirements = FrameRequirements::new();
        for (&region, demand) in regions {
            requirements.mark_visible(region);
            let mut priority = 1.0 / (1.0 + demand.distance);
            if selected_region == Some(region) {
                priority += SELECTED_PRIORITY_BOOST;
            }
            // Best tier at or below the wanted one that the manifest actually offers.
            let wanted = quality_for_level(demand.level);
            let tier = ModelQuality::LOADABLE
                .into_iter()
                .rev()
                .filter(|&tier| tier <= wanted)
                .find(|&tier| self.loader.has_entry(region, tier));
            if let Some(tier) = tier {
                self.loader.request_quality(region, tier, priority);
            }
        }
        if let Some(region) = selected_region {
            requirements.mark_required(region);
        }
        self.loader.tick(dt, &requirements)
    }
}

#[cfg(test)]
mod tests {
    use vitalis_animation::{AnimationRig, AnimationSettings, ConditionKind, Severity};
    use vitalis_assets::{AssetManifest, GltfDecoder, IdentityResolver, LoaderSettings, MemorySource};
    use vitalis_geometry::{GeometryDescriptor, StructureDef};

    use super::*;

    fn registry() -> Arc<StructureRegistry> {
        let defs = vec![
            StructureDef::new(
                "heart",
                BodySystem::Cardiovascular,
                BodyRegion::Thorax,
                GeometryDescriptor::Sphere { radius: 0.06 },
            )
            .at(Vec3::new(0.0, 1.3, 0.05))
            .with_content("heart"),
            StructureDef::new(
                "left_lung",
                BodySystem::Respiratory,
                BodyRegion::Thorax,
                GeometryDescriptor::Capsule {
                    radius: 0.06,
                    length: 0.15,
                },
            )
            .at(Vec3::new(-0.08, 1.32, 0.0)),
            StructureDef::new(
                "spine",
                BodySystem::Skeletal,
                BodyRegion::Thorax,
                GeometryDescriptor::Cylinder {
                    radius_top: 0.02,
                    radius_bottom: 0.025,
                    height: 0.6,
                },
            )
            .at(Vec3::new(0.0, 1.25, -0.09)),
        ];
        Arc::new(StructureRegistry::from_definitions(defs).unwrap())
    }

    fn scene() -> SceneCoordinator {
        scene_with(LodSettings::default())
    }

    fn scene_with(settings: LodSettings) -> SceneCoordinator {
        let loader = ProgressiveLoader::new(
            AssetManifest::new(Vec::new()),
            Box::new(IdentityResolver),
            Arc::new(MemorySource::new()),
            Arc::new(GltfDecoder),
            LoaderSettings::default(),
        );
        let animation = AnimationEngine::new(
            AnimationSettings::default(),
            AnimationRig::default_body().unwrap(),
        );
        SceneCoordinator::new(registry(), settings, loader, animation)
    }

    #[test]
    fn test_quality_for_level() {
        assert_eq!(quality_for_level(DetailLevel::Closeup), ModelQuality::High);
        assert_eq!(quality_for_level(DetailLevel::Near), ModelQuality::High);
        assert_eq!(quality_for_level(DetailLevel::Medium), ModelQuality::Standard);
        assert_eq!(quality_for_level(DetailLevel::Far), ModelQuality::Preview);
    }

    /// Everything in front of the default camera renders and animates.
    #[test]
    fn test_frame_renders_visible_structures() {
        let mut scene = scene();
        let mut output = FrameOutput::default();
        for _ in 0..5 {
            output = scene.update(1.0 / 60.0);
        }
        assert_eq!(output.frame, 5);
        assert_eq!(output.lod.rendered, 3);
        assert!(output.lod.triangles <= output.lod.budget);
        assert!(output.animation.time > 0.0);
        assert!(output.instanced_draws > 0);
        assert!(output.total_triangles() >= output.lod.triangles);
    }

    /// Instanced elements share the structures' triangle budget.
    #[test]
    fn test_instances_fit_in_budget() {
        let settings = LodSettings {
            triangle_budget: 5_000,
            ..Default::default()
        };
        let camera = CameraState::looking_at(Vec3::new(0.0, 1.25, 2.0), Vec3::new(0.0, 1.25, 0.0));
        let mut scene = scene_with(settings).with_camera(camera);
        for _ in 0..6 {
            let output = scene.update(1.0 / 60.0);
            assert!(output.lod.triangles > 0);
            assert!(output.total_triangles() <= output.lod.budget);
            assert!(output.instances_over_budget > 0);
        }
    }

    /// Hiding the skeleton culls the spine and drops its instanced bones.
    #[test]
    fn test_hidden_system_drops_instances() {
        let mut scene = scene();
        scene.update(1.0 / 60.0);
        assert!(
            scene
                .instancing()
                .draws()
                .iter()
                .any(|d| d.kind == InstancedElementKind::Vertebra)
        );

        scene.set_system_visible(BodySystem::Skeletal, false);
        let output = scene.update(1.0 / 60.0);
        assert_eq!(output.lod.culled_hidden, 1);
        let spine = scene.registry().by_name("spine").unwrap().id;
        assert!(scene.level_of(spine).is_none());
        assert!(
            scene
                .instancing()
                .draws()
                .iter()
                .all(|d| !matches!(d.kind, InstancedElementKind::Vertebra | InstancedElementKind::Rib))
        );
    }

    /// Content follows the selection.
    #[test]
    fn test_selected_content() {
        let content = StaticContentProvider::new().with(
            "heart",
            ReadingLevel::PATIENT,
            LevelContent::new("Heart", "A muscular pump with four chambers."),
        );
        let mut scene = scene().with_content(Box::new(content));
        assert!(scene.selected_content(ReadingLevel::PATIENT).is_none());

        let heart = scene.select_by_name("heart").unwrap();
        assert_eq!(scene.selected(), Some(heart));
        assert_eq!(
            scene.selected_content(ReadingLevel::PATIENT).unwrap().title,
            "Heart"
        );
        assert!(scene.selected_content(ReadingLevel::PHYSICIAN).is_none());

        scene.select_by_name("left_lung").unwrap();
        assert!(scene.selected_content(ReadingLevel::PATIENT).is_none());

        scene.clear_selection();
        assert_eq!(scene.selected(), None);
        assert!(!scene.select_structure(StructureId(999)));
    }

    /// Pause freezes the clock and play resumes from the same time.
    #[test]
    fn test_pause_and_play() {
        let mut scene = scene();
        scene.update(0.1);
        scene.pause();
        let frozen = scene.update(0.1).animation.time;
        assert_eq!(scene.update(0.1).animation.time, frozen);
        scene.play();
        scene.set_speed(2.0);
        let resumed = scene.update(0.1).animation.time;
        assert!((resumed - frozen - 0.2).abs() < 1e-5);
    }

    #[test]
    fn test_runtime_controls_reach_animation() {
        let mut scene = scene();
        scene.set_quality_tier(AnimationQuality::Educational);
        assert_eq!(scene.animation().quality(), AnimationQuality::Educational);
        assert!(!scene.toggle_subsystem(Subsystem::Nerve));
        assert!(!scene.animation().is_subsystem_enabled(Subsystem::Nerve));

        let id = scene.add_condition(ConditionSpec::new(
            ConditionKind::Inflammation,
            Severity::Severe,
            Vec3::new(0.0, 1.3, 0.05),
            0.1,
        ));
        let output = scene.update(0.1);
        assert_eq!(output.animation.active_conditions, 1);
        assert!(scene.remove_condition(id));
        assert!(!scene.remove_condition(id));
    }

    /// A non-finite frame time is treated as zero.
    #[test]
    fn test_bad_dt_is_total() {
        let mut scene = scene();
        let output = scene.update(f32::NAN);
        assert_eq!(output.animation.time, 0.0);
        let output = scene.update(-1.0);
        assert_eq!(output.animation.time, 0.0);
    }
}
