//! Anatomical structure definitions and geometry level-of-detail generation.
//!
//! Every structure in the viewer is described by a [`GeometryDescriptor`]. The LOD
//! generator turns a descriptor into a [`LodChain`]: a small ordered set of variants
//! with strictly decreasing triangle counts, one per [`DetailLevel`]. The
//! [`StructureRegistry`] holds the authored structures and is read-only at runtime.

mod cache;
mod descriptor;
mod detail;
mod error;
mod mesh;
mod registry;
mod structure;

pub use cache::LodGeneratorCache;
pub use descriptor::{GeometryDescriptor, GeometryLodLevel, LodChain, Tessellation, generate_lods};
pub use detail::DetailLevel;
pub use error::GeometryDescriptorError;
pub use mesh::{MeshData, MeshVertex, build_mesh};
pub use registry::StructureRegistry;
pub use structure::{
    AnatomicalStructure, BodyRegion, BodySystem, BoundingSphere, StructureDef, StructureId,
    Transform,
};
