//! Anatomical structures as authored and as held by the registry.

use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::descriptor::{GeometryDescriptor, LodChain};
use crate::detail::DetailLevel;

/// Index of a structure in the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StructureId(pub u32);

impl std::fmt::Display for StructureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Physiological system a structure belongs to. Used for layer toggles and to
/// decide which animation subsystem drives it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodySystem {
    Skeletal,
    Muscular,
    Cardiovascular,
    Respiratory,
    Digestive,
    Nervous,
    Lymphatic,
    Integumentary,
    Urinary,
    Endocrine,
}

impl BodySystem {
    pub const ALL: [BodySystem; 10] = [
        BodySystem::Skeletal,
        BodySystem::Muscular,
        BodySystem::Cardiovascular,
        BodySystem::Respiratory,
        BodySystem::Digestive,
        BodySystem::Nervous,
        BodySystem::Lymphatic,
        BodySystem::Integumentary,
        BodySystem::Urinary,
        BodySystem::Endocrine,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BodySystem::Skeletal => "skeletal",
            BodySystem::Muscular => "muscular",
            BodySystem::Cardiovascular => "cardiovascular",
            BodySystem::Respiratory => "respiratory",
            BodySystem::Digestive => "digestive",
            BodySystem::Nervous => "nervous",
            BodySystem::Lymphatic => "lymphatic",
            BodySystem::Integumentary => "integumentary",
            BodySystem::Urinary => "urinary",
            BodySystem::Endocrine => "endocrine",
        }
    }
}

/// Body region. Region models are the unit of progressive loading.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BodyRegion {
    Head,
    Neck,
    Thorax,
    Abdomen,
    Pelvis,
    LeftArm,
    RightArm,
    LeftLeg,
    RightLeg,
}

impl BodyRegion {
    pub const ALL: [BodyRegion; 9] = [
        BodyRegion::Head,
        BodyRegion::Neck,
        BodyRegion::Thorax,
        BodyRegion::Abdomen,
        BodyRegion::Pelvis,
        BodyRegion::LeftArm,
        BodyRegion::RightArm,
        BodyRegion::LeftLeg,
        BodyRegion::RightLeg,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BodyRegion::Head => "head",
            BodyRegion::Neck => "neck",
            BodyRegion::Thorax => "thorax",
            BodyRegion::Abdomen => "abdomen",
            BodyRegion::Pelvis => "pelvis",
            BodyRegion::LeftArm => "left_arm",
            BodyRegion::RightArm => "right_arm",
            BodyRegion::LeftLeg => "left_leg",
            BodyRegion::RightLeg => "right_leg",
        }
    }
}

impl std::fmt::Display for BodyRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Translation, rotation and scale of a scene node.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Largest axis scale, used to scale bounding radii.
    pub fn max_scale(&self) -> f32 {
        self.scale.abs().max_element()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// World-space bounding sphere.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    pub fn distance_to(&self, point: Vec3) -> f32 {
        self.center.distance(point)
    }
}

fn default_priority() -> f32 {
    1.0
}

fn default_min_level() -> DetailLevel {
    DetailLevel::COARSEST
}

/// Authoring record for one structure, as read from the registry file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StructureDef {
    pub name: String,
    pub system: BodySystem,
    pub region: BodyRegion,
    pub geometry: GeometryDescriptor,
    #[serde(default)]
    pub transform: Transform,
    /// Budget weight; larger values are served first at equal distance.
    #[serde(default = "default_priority")]
    pub priority: f32,
    /// Coarsest level at which the structure is still drawn.
    #[serde(default = "default_min_level")]
    pub min_level: DetailLevel,
    #[serde(default)]
    pub content_id: Option<String>,
    /// Radius of a sphere fully inside the geometry, in local units. Structures with
    /// one can hide others from the camera.
    #[serde(default)]
    pub occluder_radius: Option<f32>,
}

impl StructureDef {
    pub fn new(
        name: impl Into<String>,
        system: BodySystem,
        region: BodyRegion,
        geometry: GeometryDescriptor,
    ) -> Self {
        Self {
            name: name.into(),
            system,
            region,
            geometry,
            transform: Transform::IDENTITY,
            priority: default_priority(),
            min_level: default_min_level(),
            content_id: None,
            occluder_radius: None,
        }
    }

    pub fn at(mut self, translation: Vec3) -> Self {
        self.transform.translation = translation;
        self
    }

    pub fn with_priority(mut self, priority: f32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_min_level(mut self, level: DetailLevel) -> Self {
        self.min_level = level;
        self
    }

    pub fn with_content(mut self, content_id: impl Into<String>) -> Self {
        self.content_id = Some(content_id.into());
        self
    }

    pub fn with_occluder_radius(mut self, radius: f32) -> Self {
        self.occluder_radius = Some(radius);
        self
    }
}

/// A registered structure. Immutable after the registry is built.
#[derive(Clone, Debug)]
pub struct AnatomicalStructure {
    pub id: StructureId,
    pub name: String,
    pub system: BodySystem,
    pub region: BodyRegion,
    pub geometry: GeometryDescriptor,
    pub transform: Transform,
    pub lod_chain: Arc<LodChain>,
    pub priority: f32,
    pub min_level: DetailLevel,
    pub content_id: Option<String>,
    /// World-space inscribed radius, if this structure occludes.
    pub occluder_radius: Option<f32>,
    pub bounds: BoundingSphere,
}

impl AnatomicalStructure {
    pub(crate) fn from_def(id: StructureId, def: StructureDef, lod_chain: Arc<LodChain>) -> Self {
        let scale = def.transform.max_scale();
        let bounds = BoundingSphere {
            center: def.transform.translation,
            radius: def.geometry.bounding_radius() * scale,
        };
        Self {
            id,
            name: def.name,
            system: def.system,
            region: def.region,
            geometry: def.geometry,
            transform: def.transform,
            lod_chain,
            priority: def.priority,
            min_level: def.min_level,
            content_id: def.content_id,
            occluder_radius: def.occluder_radius.map(|r| r * scale),
            bounds,
        }
    }

    /// Visibility predicate: whether the structure is drawn at `level`.
    pub fn visible_at(&self, level: DetailLevel) -> bool {
        level >= self.min_level
    }

    /// Triangles rendered at `level`.
    pub fn triangle_cost(&self, level: DetailLevel) -> u32 {
        self.lod_chain.triangle_cost(level)
    }
}
