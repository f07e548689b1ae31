//! Turning fetched bytes into [`ModelData`].

use std::sync::Arc;

use glam::{Quat, Vec3};
use vitalis_geometry::{MeshData, MeshVertex, Transform};

use crate::error::AssetLoadError;
use crate::model::{ModelData, ModelNode};

/// Decodes a fetched asset. Runs on fetch worker threads.
pub trait ModelDecoder: Send + Sync {
    fn decode(&self, url: &str, bytes: &[u8]) -> Result<ModelData, AssetLoadError>;
}

/// Decodes glTF 2.0 binary (GLB) or embedded JSON glTF.
#[derive(Clone, Copy, Debug, Default)]
pub struct GltfDecoder;

impl ModelDecoder for GltfDecoder {
    fn decode(&self, url: &str, bytes: &[u8]) -> Result<ModelData, AssetLoadError> {
        let decode_err = |reason: String| AssetLoadError::Decode {
            url: url.to_string(),
            reason,
        };

        let (document, buffers, _images) =
            gltf::import_slice(bytes).map_err(|e| decode_err(e.to_string()))?;

        let mut meshes = Vec::new();
        for mesh in document.meshes() {
            let mut data = MeshData::default();
            for primitive in mesh.primitives() {
                let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));
                let positions: Vec<[f32; 3]> = reader
                    .read_positions()
                    .ok_or_else(|| decode_err(format!("mesh {} has no positions", mesh.index())))?
                    .collect();
                let normals: Vec<[f32; 3]> = reader
                    .read_normals()
                    .map(|iter| iter.collect())
                    .unwrap_or_default();
                let uvs: Vec<[f32; 2]> = reader
                    .read_tex_coords(0)
                    .map(|iter| iter.into_f32().collect())
                    .unwrap_or_default();

                let base = data.vertices.len() as u32;
                data.vertices
                    .extend(positions.iter().enumerate().map(|(i, &position)| MeshVertex {
                        position,
                        normal: normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
                        uv: uvs.get(i).copied().unwrap_or([0.0, 0.0]),
                    }));

                match reader.read_indices() {
                    Some(indices) => data
                        .indices
                        .extend(indices.into_u32().map(|index| base + index)),
                    None => data.indices.extend(base..base + positions.len() as u32),
                }
            }
            meshes.push(Arc::new(data));
        }

        let nodes = document
            .nodes()
            .map(|node| {
                let (translation, rotation, scale) = node.transform().decomposed();
                ModelNode {
                    name: node.name().map(str::to_string),
                    transform: Transform {
                        translation: Vec3::from(translation),
                        rotation: Quat::from_array(rotation),
                        scale: Vec3::from(scale),
                    },
                    mesh: node.mesh().map(|m| m.index()),
                    children: node.children().map(|c| c.index()).collect(),
                }
            })
            .collect();

        let roots = document
            .default_scene()
            .or_else(|| document.scenes().next())
            .map(|scene| scene.nodes().map(|n| n.index()).collect())
            .unwrap_or_default();

        Ok(ModelData {
            nodes,
            roots,
            meshes,
        })
    }
}
