//! Decoded models and per-consumer instances of them.

use std::sync::Arc;

use vitalis_geometry::{MeshData, Transform};

/// One node of a decoded scene graph.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelNode {
    pub name: Option<String>,
    pub transform: Transform,
    /// Index into [`ModelData::meshes`].
    pub mesh: Option<usize>,
    pub children: Vec<usize>,
}

/// A decoded region model. Immutable once built and shared by every instance.
#[derive(Debug, Default)]
pub struct ModelData {
    pub nodes: Vec<ModelNode>,
    pub roots: Vec<usize>,
    pub meshes: Vec<Arc<MeshData>>,
}

impl ModelData {
    /// Resident size of the vertex and index buffers.
    pub fn byte_size(&self) -> u64 {
        self.meshes.iter().map(|m| m.byte_size() as u64).sum()
    }

    pub fn triangle_count(&self) -> u64 {
        self.meshes.iter().map(|m| u64::from(m.triangle_count())).sum()
    }
}

/// A consumer's copy of a cached model.
///
/// The transform hierarchy is owned and may be mutated freely; geometry is shared with
/// the cache and every other instance.
#[derive(Clone, Debug)]
pub struct ModelInstance {
    url: String,
    model: Arc<ModelData>,
    /// Transform applied above every root node.
    pub root: Transform,
    /// Local transform per node, indexed like [`ModelData::nodes`].
    pub node_transforms: Vec<Transform>,
    /// Highlight tint, if the consumer has one applied.
    pub highlight: Option<[f32; 4]>,
}

impl ModelInstance {
    pub(crate) fn new(url: String, model: Arc<ModelData>) -> Self {
        let node_transforms = model.nodes.iter().map(|n| n.transform).collect();
        Self {
            url,
            model,
            root: Transform::IDENTITY,
            node_transforms,
            highlight: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn model(&self) -> &ModelData {
        &self.model
    }

    /// Whether two instances share geometry.
    pub fn shares_geometry_with(&self, other: &ModelInstance) -> bool {
        Arc::ptr_eq(&self.model, &other.model)
    }

    pub fn triangle_count(&self) -> u64 {
        self.model.triangle_count()
    }
}
