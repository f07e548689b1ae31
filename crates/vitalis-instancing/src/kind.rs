//! The repeated elements drawn with instancing.

use glam::Vec4;
use serde::{Deserialize, Serialize};
use vitalis_geometry::{BodySystem, DetailLevel, GeometryDescriptor};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum InstancedElementKind {
    RedBloodCell,
    Alveolus,
    Vertebra,
    Rib,
}

impl InstancedElementKind {
    pub const ALL: [InstancedElementKind; 4] = [
        InstancedElementKind::RedBloodCell,
        InstancedElementKind::Alveolus,
        InstancedElementKind::Vertebra,
        InstancedElementKind::Rib,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            InstancedElementKind::RedBloodCell => "red-blood-cell",
            InstancedElementKind::Alveolus => "alveolus",
            InstancedElementKind::Vertebra => "vertebra",
            InstancedElementKind::Rib => "rib",
        }
    }

    /// Whether the instance count follows detail level and animation quality. Static
    /// anatomy is drawn in full whenever its host is granted.
    pub fn scales_with_detail(self) -> bool {
        matches!(
            self,
            InstancedElementKind::RedBloodCell | InstancedElementKind::Alveolus
        )
    }

    pub fn host_system(self) -> BodySystem {
        match self {
            InstancedElementKind::RedBloodCell => BodySystem::Cardiovascular,
            InstancedElementKind::Alveolus => BodySystem::Respiratory,
            InstancedElementKind::Vertebra | InstancedElementKind::Rib => BodySystem::Skeletal,
        }
    }

    /// Shared base mesh every instance of this kind is drawn with.
    pub fn descriptor(self) -> GeometryDescriptor {
        match self {
            InstancedElementKind::RedBloodCell => GeometryDescriptor::Torus {
                radius: 0.0025,
                tube: 0.0012,
            },
            InstancedElementKind::Alveolus => GeometryDescriptor::Sphere { radius: 0.004 },
            InstancedElementKind::Vertebra => GeometryDescriptor::Cylinder {
                radius_top: 0.018,
                radius_bottom: 0.02,
                height: 0.022,
            },
            InstancedElementKind::Rib => GeometryDescriptor::Torus {
                radius: 0.12,
                tube: 0.006,
            },
        }
    }

    pub fn base_color(self) -> Vec4 {
        match self {
            InstancedElementKind::RedBloodCell => Vec4::new(0.78, 0.08, 0.1, 1.0),
            InstancedElementKind::Alveolus => Vec4::new(0.95, 0.62, 0.65, 0.85),
            InstancedElementKind::Vertebra | InstancedElementKind::Rib => {
                Vec4::new(0.93, 0.9, 0.82, 1.0)
            }
        }
    }
}

impl std::fmt::Display for InstancedElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Share of a scaled kind's sources drawn at each detail level.
pub fn detail_fraction(level: DetailLevel) -> f32 {
    match level {
        DetailLevel::Far => 0.1,
        DetailLevel::Medium => 0.35,
        DetailLevel::Near => 0.7,
        DetailLevel::Closeup => 1.0,
    }
}
