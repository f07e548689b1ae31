//! Geometry descriptors and the LOD chains generated from them.

use std::hash::Hasher;

use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};

use crate::detail::DetailLevel;
use crate::error::GeometryDescriptorError;

/// How a structure's geometry is produced.
///
/// Primitive variants are tessellated procedurally. `Model` structures get their mesh
/// from a loaded asset and only declare the authored triangle count of each variant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GeometryDescriptor {
    Sphere {
        radius: f32,
    },
    Capsule {
        radius: f32,
        /// Length of the cylindrical body between the two cap centres.
        length: f32,
    },
    Cylinder {
        radius_top: f32,
        radius_bottom: f32,
        height: f32,
    },
    Torus {
        /// Distance from the torus centre to the tube centre.
        radius: f32,
        /// Tube radius.
        tube: f32,
    },
    Model {
        /// Authored triangle counts, finest variant first.
        triangle_counts: Vec<u32>,
        /// Radius of a sphere enclosing every variant.
        bounding_radius: f32,
    },
}

/// Tessellation parameters for one LOD variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tessellation {
    Sphere {
        width_segments: u32,
        height_segments: u32,
    },
    Capsule {
        radial_segments: u32,
        cap_segments: u32,
    },
    Cylinder {
        radial_segments: u32,
        height_segments: u32,
    },
    Torus {
        radial_segments: u32,
        tubular_segments: u32,
    },
    /// Index into the authored variant list of a model.
    Authored { variant: usize },
}

/// One geometry variant of a LOD chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GeometryLodLevel {
    pub level: DetailLevel,
    pub triangle_count: u32,
    pub tessellation: Tessellation,
}

// Per-level tessellation tables, finest (closeup) first.
const SPHERE_SEGMENTS: [(u32, u32); 4] = [(32, 24), (20, 14), (12, 8), (6, 4)];
const CAPSULE_SEGMENTS: [(u32, u32); 4] = [(32, 8), (16, 5), (10, 3), (6, 2)];
const CYLINDER_SEGMENTS: [(u32, u32); 4] = [(32, 4), (18, 2), (10, 1), (6, 1)];
const TORUS_SEGMENTS: [(u32, u32); 4] = [(24, 48), (14, 28), (8, 16), (4, 8)];

/// Levels in chain order (finest first).
const CHAIN_ORDER: [DetailLevel; 4] = [
    DetailLevel::Closeup,
    DetailLevel::Near,
    DetailLevel::Medium,
    DetailLevel::Far,
];

impl GeometryDescriptor {
    /// Short lower-case name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            GeometryDescriptor::Sphere { .. } => "sphere",
            GeometryDescriptor::Capsule { .. } => "capsule",
            GeometryDescriptor::Cylinder { .. } => "cylinder",
            GeometryDescriptor::Torus { .. } => "torus",
            GeometryDescriptor::Model { .. } => "model",
        }
    }

    /// Radius of a sphere centred on the local origin that encloses the geometry.
    pub fn bounding_radius(&self) -> f32 {
        match *self {
            GeometryDescriptor::Sphere { radius } => radius,
            GeometryDescriptor::Capsule { radius, length } => radius + length * 0.5,
            GeometryDescriptor::Cylinder {
                radius_top,
                radius_bottom,
                height,
            } => {
                let r = radius_top.max(radius_bottom);
                (r * r + height * height * 0.25).sqrt()
            }
            GeometryDescriptor::Torus { radius, tube } => radius + tube,
            GeometryDescriptor::Model {
                bounding_radius, ..
            } => bounding_radius,
        }
    }

    /// Check the authored values. `name` is used for diagnostics only.
    pub fn validate(&self, name: &str) -> Result<(), GeometryDescriptorError> {
        let positive = |field: &'static str, value: f32| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(GeometryDescriptorError::InvalidDimension {
                    name: name.to_string(),
                    field,
                    value,
                })
            }
        };

        match self {
            GeometryDescriptor::Sphere { radius } => positive("radius", *radius),
            GeometryDescriptor::Capsule { radius, length } => {
                positive("radius", *radius)?;
                positive("length", *length)
            }
            GeometryDescriptor::Cylinder {
                radius_top,
                radius_bottom,
                height,
            } => {
                positive("radius_top", *radius_top)?;
                positive("radius_bottom", *radius_bottom)?;
                positive("height", *height)
            }
            GeometryDescriptor::Torus { radius, tube } => {
                positive("radius", *radius)?;
                positive("tube", *tube)
            }
            GeometryDescriptor::Model {
                triangle_counts,
                bounding_radius,
            } => {
                positive("bounding_radius", *bounding_radius)?;
                if triangle_counts.is_empty() {
                    return Err(GeometryDescriptorError::EmptyModel {
                        name: name.to_string(),
                    });
                }
                if triangle_counts.len() > DetailLevel::COUNT {
                    return Err(GeometryDescriptorError::TooManyVariants {
                        name: name.to_string(),
                        max: DetailLevel::COUNT,
                        got: triangle_counts.len(),
                    });
                }
                let decreasing = triangle_counts.windows(2).all(|w| w[0] > w[1]);
                if !decreasing || triangle_counts.contains(&0) {
                    return Err(GeometryDescriptorError::InvalidTriangleCounts {
                        name: name.to_string(),
                        counts: triangle_counts.clone(),
                    });
                }
                Ok(())
            }
        }
    }

    /// Stable 64-bit key for caching generated chains.
    ///
    /// Equal descriptors always produce equal keys (floats are hashed by bit pattern).
    pub fn descriptor_key(&self) -> u64 {
        let mut hasher = FxHasher::default();
        match self {
            GeometryDescriptor::Sphere { radius } => {
                hasher.write_u8(0);
                hasher.write_u32(radius.to_bits());
            }
            GeometryDescriptor::Capsule { radius, length } => {
                hasher.write_u8(1);
                hasher.write_u32(radius.to_bits());
                hasher.write_u32(length.to_bits());
            }
            GeometryDescriptor::Cylinder {
                radius_top,
                radius_bottom,
                height,
            } => {
                hasher.write_u8(2);
                hasher.write_u32(radius_top.to_bits());
                hasher.write_u32(radius_bottom.to_bits());
                hasher.write_u32(height.to_bits());
            }
            GeometryDescriptor::Torus { radius, tube } => {
                hasher.write_u8(3);
                hasher.write_u32(radius.to_bits());
                hasher.write_u32(tube.to_bits());
            }
            GeometryDescriptor::Model {
                triangle_counts,
                bounding_radius,
            } => {
                hasher.write_u8(4);
                hasher.write_usize(triangle_counts.len());
                for count in triangle_counts {
                    hasher.write_u32(*count);
                }
                hasher.write_u32(bounding_radius.to_bits());
            }
        }
        hasher.finish()
    }
}

/// Produce the ordered LOD variants for a descriptor, finest first.
///
/// Primitive descriptors always yield all four levels. Models yield one variant per
/// authored count; the coarsest authored variant is assigned to [`DetailLevel::Far`]
/// and each finer variant to the next finer level.
pub fn generate_lods(descriptor: &GeometryDescriptor) -> Vec<GeometryLodLevel> {
    match descriptor {
        GeometryDescriptor::Sphere { .. } => primitive_chain(&SPHERE_SEGMENTS, |(w, h)| {
            (
                2 * w * (h - 1),
                Tessellation::Sphere {
                    width_segments: w,
                    height_segments: h,
                },
            )
        }),
        GeometryDescriptor::Capsule { .. } => primitive_chain(&CAPSULE_SEGMENTS, |(r, c)| {
            (
                4 * r * c,
                Tessellation::Capsule {
                    radial_segments: r,
                    cap_segments: c,
                },
            )
        }),
        GeometryDescriptor::Cylinder { .. } => primitive_chain(&CYLINDER_SEGMENTS, |(r, hs)| {
            (
                2 * r * hs + 2 * r,
                Tessellation::Cylinder {
                    radial_segments: r,
                    height_segments: hs,
                },
            )
        }),
        GeometryDescriptor::Torus { .. } => primitive_chain(&TORUS_SEGMENTS, |(r, t)| {
            (
                2 * r * t,
                Tessellation::Torus {
                    radial_segments: r,
                    tubular_segments: t,
                },
            )
        }),
        GeometryDescriptor::Model {
            triangle_counts, ..
        } => {
            let n = triangle_counts.len().min(DetailLevel::COUNT);
            triangle_counts
                .iter()
                .take(n)
                .enumerate()
                .map(|(variant, &triangle_count)| GeometryLodLevel {
                    level: DetailLevel::from_index(n - 1 - variant),
                    triangle_count,
                    tessellation: Tessellation::Authored { variant },
                })
                .collect()
        }
    }
}

fn primitive_chain(
    table: &[(u32, u32); 4],
    build: impl Fn((u32, u32)) -> (u32, Tessellation),
) -> Vec<GeometryLodLevel> {
    CHAIN_ORDER
        .iter()
        .zip(table.iter())
        .map(|(&level, &params)| {
            let (triangle_count, tessellation) = build(params);
            GeometryLodLevel {
                level,
                triangle_count,
                tessellation,
            }
        })
        .collect()
}

/// The generated variants of one descriptor, finest first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LodChain {
    levels: Vec<GeometryLodLevel>,
}

impl LodChain {
    /// Generate the chain for a descriptor.
    pub fn generate(descriptor: &GeometryDescriptor) -> Self {
        Self {
            levels: generate_lods(descriptor),
        }
    }

    /// All variants, finest first.
    pub fn levels(&self) -> &[GeometryLodLevel] {
        &self.levels
    }

    /// The finest authored level.
    pub fn finest_level(&self) -> DetailLevel {
        self.levels
            .first()
            .map(|l| l.level)
            .unwrap_or(DetailLevel::COARSEST)
    }

    /// Variant for a requested level.
    ///
    /// Requests finer than the finest variant clamp to the finest; this never fails.
    pub fn for_level(&self, level: DetailLevel) -> GeometryLodLevel {
        self.levels
            .iter()
            .find(|l| l.level <= level)
            .or_else(|| self.levels.last())
            .copied()
            .unwrap_or(GeometryLodLevel {
                level: DetailLevel::COARSEST,
                triangle_count: 0,
                tessellation: Tessellation::Authored { variant: 0 },
            })
    }

    /// Triangle count rendered when the structure is granted `level`.
    pub fn triangle_cost(&self, level: DetailLevel) -> u32 {
        self.for_level(level).triangle_count
    }

    /// Triangle cost indexed by [`DetailLevel::index`].
    pub fn costs(&self) -> [u32; DetailLevel::COUNT] {
        DetailLevel::ALL.map(|level| self.triangle_cost(level))
    }
}
