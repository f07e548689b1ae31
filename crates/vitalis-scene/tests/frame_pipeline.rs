//! End-to-end frames through the scene coordinator.

use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::Vec3;
use vitalis_animation::{AnimationEngine, AnimationRig, AnimationSettings};
use vitalis_assets::{
    AssetKey, AssetLoadError, AssetManifest, IdentityResolver, LoaderSettings, ManifestEntry,
    MemorySource, ModelData, ModelDecoder, ModelNode, ModelQuality, ProgressiveLoader,
};
use vitalis_geometry::{
    BodyRegion, BodySystem, DetailLevel, GeometryDescriptor, StructureDef, StructureRegistry,
    Transform, build_mesh,
};
use vitalis_lod::{DeadBand, LodSettings, LodThresholds};
use vitalis_scene::{CameraState, SceneCoordinator};

const DT: f32 = 1.0 / 60.0;

/// Decodes anything into a small sphere.
struct SphereDecoder;

impl ModelDecoder for SphereDecoder {
    fn decode(&self, _url: &str, _bytes: &[u8]) -> Result<ModelData, AssetLoadError> {
        let mesh = build_mesh(&GeometryDescriptor::Sphere { radius: 1.0 }, DetailLevel::Far)
            .unwrap_or_default();
        Ok(ModelData {
            nodes: vec![ModelNode {
                name: Some("root".to_string()),
                transform: Transform::IDENTITY,
                mesh: Some(0),
                children: Vec::new(),
            }],
            roots: vec![0],
            meshes: vec![Arc::new(mesh)],
        })
    }
}

fn animation() -> AnimationEngine {
    AnimationEngine::new(
        AnimationSettings::default(),
        AnimationRig::default_body().unwrap(),
    )
}

fn loader(entries: Vec<ManifestEntry>, settings: LoaderSettings) -> ProgressiveLoader {
    let mut source = MemorySource::new();
    for entry in &entries {
        source.insert(entry.path.clone(), vec![0u8; 64]);
    }
    ProgressiveLoader::new(
        AssetManifest::new(entries),
        Box::new(IdentityResolver),
        Arc::new(source),
        Arc::new(SphereDecoder),
        settings,
    )
}

fn entry(region: BodyRegion, quality: ModelQuality, size_bytes: u64) -> ManifestEntry {
    ManifestEntry {
        region,
        quality,
        path: format!("{}_{}.glb", region.name(), quality.name()),
        size_bytes,
    }
}

fn scenario_settings() -> LodSettings {
    LodSettings {
        thresholds: LodThresholds::custom(3.0, 10.0, 20.0),
        dead_band: DeadBand::Absolute(2.0),
        ..LodSettings::default()
    }
}

fn single_structure_scene() -> SceneCoordinator {
    let registry = StructureRegistry::from_definitions(vec![StructureDef::new(
        "liver",
        BodySystem::Digestive,
        BodyRegion::Abdomen,
        GeometryDescriptor::Sphere { radius: 0.5 },
    )])
    .unwrap();
    SceneCoordinator::new(
        Arc::new(registry),
        scenario_settings(),
        loader(Vec::new(), LoaderSettings::default()),
        animation(),
    )
}

fn camera_at_distance(distance: f32) -> CameraState {
    CameraState::looking_at(Vec3::new(0.0, 0.0, distance), Vec3::ZERO)
}

/// 25 units resolves to far, 5 units reaches near one step per frame, and 18 units
/// sits in the dead band without changing the level.
#[test]
fn test_distance_scenario() {
    let mut scene = single_structure_scene();
    let liver = scene.registry().by_name("liver").unwrap().id;

    scene.set_camera_state(camera_at_distance(25.0));
    scene.update(DT);
    assert_eq!(scene.level_of(liver), Some(DetailLevel::Far));

    scene.set_camera_state(camera_at_distance(5.0));
    let mut previous = DetailLevel::Far;
    let mut frames = 0;
    while scene.level_of(liver) != Some(DetailLevel::Near) {
        scene.update(DT);
        frames += 1;
        let level = scene.level_of(liver).unwrap();
        assert!(level.steps_between(previous) <= 1, "{previous} -> {level}");
        assert!(level >= previous, "level moved away from the target");
        previous = level;
        assert!(frames <= 3, "near not reached within 3 frames");
    }

    // Out to 18: the medium/near boundary (10 + 2) is crossed, far (20 - 2) is not.
    scene.set_camera_state(camera_at_distance(18.0));
    for _ in 0..3 {
        scene.update(DT);
    }
    assert_eq!(scene.level_of(liver), Some(DetailLevel::Medium));
    for _ in 0..60 {
        scene.update(DT);
        assert_eq!(scene.level_of(liver), Some(DetailLevel::Medium));
    }
}

/// Coming in from far, 18 units is not far enough inside the band to leave far.
#[test]
fn test_dead_band_holds_far() {
    let mut scene = single_structure_scene();
    let liver = scene.registry().by_name("liver").unwrap().id;

    scene.set_camera_state(camera_at_distance(25.0));
    scene.update(DT);
    scene.set_camera_state(camera_at_distance(18.0));
    for _ in 0..60 {
        scene.update(DT);
        assert_eq!(scene.level_of(liver), Some(DetailLevel::Far));
    }
}

/// A snap skips the one-step rule.
#[test]
fn test_snap_jumps_to_target() {
    let mut scene = single_structure_scene();
    let liver = scene.registry().by_name("liver").unwrap().id;

    scene.set_camera_state(camera_at_distance(25.0));
    scene.update(DT);
    scene.set_camera_state(camera_at_distance(5.0));
    scene.request_snap();
    scene.update(DT);
    assert_eq!(scene.level_of(liver), Some(DetailLevel::Near));
}

/// Pausing freezes animation while LOD keeps following the camera.
#[test]
fn test_pause_keeps_lod_running() {
    let mut scene = single_structure_scene();
    let liver = scene.registry().by_name("liver").unwrap().id;
    scene.set_camera_state(camera_at_distance(25.0));
    scene.update(DT);
    scene.pause();
    let frozen = scene.update(DT).animation.time;

    scene.set_camera_state(camera_at_distance(5.0));
    scene.request_snap();
    let output = scene.update(DT);
    assert_eq!(output.animation.time, frozen);
    assert_eq!(scene.level_of(liver), Some(DetailLevel::Near));

    scene.play();
    assert!(scene.update(DT).animation.time > frozen);
}

/// Structures behind the camera cost nothing and are not drawn.
#[test]
fn test_culled_structures_cost_nothing() {
    let defs = vec![
        StructureDef::new(
            "stomach",
            BodySystem::Digestive,
            BodyRegion::Abdomen,
            GeometryDescriptor::Sphere { radius: 0.5 },
        ),
        StructureDef::new(
            "kidney",
            BodySystem::Urinary,
            BodyRegion::Abdomen,
            GeometryDescriptor::Sphere { radius: 0.5 },
        )
        .at(Vec3::new(0.0, 0.0, 20.0)),
    ];
    let registry = StructureRegistry::from_definitions(defs).unwrap();
    let mut scene = SceneCoordinator::new(
        Arc::new(registry),
        scenario_settings(),
        loader(Vec::new(), LoaderSettings::default()),
        animation(),
    );
    scene.set_camera_state(camera_at_distance(8.0));
    let output = scene.update(DT);

    let kidney = scene.registry().by_name("kidney").unwrap().id;
    let stomach = scene.registry().by_name("stomach").unwrap().id;
    assert_eq!(output.lod.culled_frustum, 1);
    assert_eq!(scene.lod().budget().allocation(kidney), 0);
    assert!(scene.level_of(kidney).is_none());
    assert_eq!(scene.level_of(stomach), Some(DetailLevel::Near));
    assert_eq!(
        output.lod.triangles,
        u64::from(scene.lod().budget().allocation(stomach))
    );
}

/// Looking away from one region and at another evicts the first region's models to
/// stay inside the memory budget.
#[test]
fn test_memory_eviction_on_region_change() {
    const BUDGET: u64 = 800_000;
    let entries = vec![
        entry(BodyRegion::Thorax, ModelQuality::Standard, 200_000),
        entry(BodyRegion::Thorax, ModelQuality::High, 500_000),
        entry(BodyRegion::Head, ModelQuality::Standard, 200_000),
        entry(BodyRegion::Head, ModelQuality::High, 500_000),
    ];
    let settings = LoaderSettings {
        memory_budget_bytes: Some(BUDGET),
        ..LoaderSettings::default()
    };
    let defs = vec![
        StructureDef::new(
            "heart",
            BodySystem::Cardiovascular,
            BodyRegion::Thorax,
            GeometryDescriptor::Sphere { radius: 0.5 },
        ),
        StructureDef::new(
            "brain",
            BodySystem::Nervous,
            BodyRegion::Head,
            GeometryDescriptor::Sphere { radius: 0.5 },
        )
        .at(Vec3::new(0.0, 50.0, 0.0)),
    ];
    let registry = StructureRegistry::from_definitions(defs).unwrap();
    let mut scene = SceneCoordinator::new(
        Arc::new(registry),
        scenario_settings(),
        loader(entries, settings),
        animation(),
    );

    let mut evicted: Vec<AssetKey> = Vec::new();
    let mut run_until = |scene: &mut SceneCoordinator, done: &dyn Fn(&SceneCoordinator) -> bool| {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            let output = scene.update(DT);
            evicted.extend(output.loader.evicted);
            assert!(scene.loader().memory().used() <= BUDGET);
            if done(scene) {
                return;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        panic!("scene did not settle in time");
    };

    // Close to the heart: the thorax streams up to its high tier.
    scene.set_camera_state(CameraState::looking_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO));
    run_until(&mut scene, &|s: &SceneCoordinator| {
        s.loader().active_quality(BodyRegion::Thorax) == ModelQuality::High
    });
    assert_eq!(scene.loader().active_quality(BodyRegion::Head), ModelQuality::Preview);

    // Turn to the brain: the head needs room the thorax is holding.
    scene.set_camera_state(CameraState::looking_at(
        Vec3::new(0.0, 50.0, 5.0),
        Vec3::new(0.0, 50.0, 0.0),
    ));
    run_until(&mut scene, &|s: &SceneCoordinator| {
        s.loader().active_quality(BodyRegion::Head) == ModelQuality::High
    });

    assert_eq!(scene.loader().active_quality(BodyRegion::Thorax), ModelQuality::Preview);
    assert!(evicted.contains(&AssetKey::new(BodyRegion::Thorax, ModelQuality::High)));
    assert!(evicted.contains(&AssetKey::new(BodyRegion::Thorax, ModelQuality::Standard)));
    assert!(scene.region_model(BodyRegion::Head).is_some());
}
