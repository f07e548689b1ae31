//! Procedural mesh builders for primitive structures.

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use bytemuck::{Pod, Zeroable};

use crate::descriptor::{GeometryDescriptor, LodChain, Tessellation};
use crate::detail::DetailLevel;

/// Vertex layout shared by every procedural mesh.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// CPU-side vertex and index buffers for one LOD variant.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Number of triangles described by the index buffer.
    pub fn triangle_count(&self) -> u32 {
        (self.indices.len() / 3) as u32
    }

    /// Size of the vertex and index buffers in bytes.
    pub fn byte_size(&self) -> usize {
        std::mem::size_of_val(self.vertices.as_slice()) + std::mem::size_of_val(self.indices.as_slice())
    }

    /// Raw vertex bytes for upload.
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    fn push_vertex(&mut self, position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> u32 {
        let index = self.vertices.len() as u32;
        self.vertices.push(MeshVertex {
            position,
            normal,
            uv,
        });
        index
    }
}

/// Build the mesh of a primitive descriptor at the given detail level.
///
/// Returns `None` for model-backed descriptors, whose meshes come from loaded assets.
/// The number of triangles always equals the chain's declared count for that level.
pub fn build_mesh(descriptor: &GeometryDescriptor, level: DetailLevel) -> Option<MeshData> {
    let lod = LodChain::generate(descriptor).for_level(level);
    let mut mesh = MeshData::default();

    match (descriptor, lod.tessellation) {
        (
            GeometryDescriptor::Sphere { radius },
            Tessellation::Sphere {
                width_segments,
                height_segments,
            },
        ) => {
            let rings: Vec<Ring> = (0..=height_segments)
                .map(|j| {
                    let phi = j as f32 / height_segments as f32 * PI;
                    Ring {
                        y: radius * phi.cos(),
                        radius: radius * phi.sin(),
                        normal_xz: phi.sin(),
                        normal_y: phi.cos(),
                    }
                })
                .collect();
            lathe(&mut mesh, &rings, width_segments, true);
        }
        (
            GeometryDescriptor::Capsule { radius, length },
            Tessellation::Capsule {
                radial_segments,
                cap_segments,
            },
        ) => {
            let half = length * 0.5;
            let cap_ring = |phi: f32, offset: f32| Ring {
                y: offset + radius * phi.cos(),
                radius: radius * phi.sin(),
                normal_xz: phi.sin(),
                normal_y: phi.cos(),
            };
            let mut rings = Vec::with_capacity(2 * cap_segments as usize + 2);
            for k in 0..=cap_segments {
                rings.push(cap_ring(k as f32 / cap_segments as f32 * FRAC_PI_2, half));
            }
            for k in 0..=cap_segments {
                rings.push(cap_ring(
                    FRAC_PI_2 + k as f32 / cap_segments as f32 * FRAC_PI_2,
                    -half,
                ));
            }
            lathe(&mut mesh, &rings, radial_segments, true);
        }
        (
            GeometryDescriptor::Cylinder {
                radius_top,
                radius_bottom,
                height,
            },
            Tessellation::Cylinder {
                radial_segments,
                height_segments,
            },
        ) => {
            let slope_len = (height * height + (radius_bottom - radius_top).powi(2)).sqrt();
            let normal_xz = height / slope_len;
            let normal_y = (radius_bottom - radius_top) / slope_len;
            let rings: Vec<Ring> = (0..=height_segments)
                .map(|j| {
                    let t = j as f32 / height_segments as f32;
                    Ring {
                        y: height * 0.5 - t * height,
                        radius: radius_top + (radius_bottom - radius_top) * t,
                        normal_xz,
                        normal_y,
                    }
                })
                .collect();
            lathe(&mut mesh, &rings, radial_segments, false);
            cap(&mut mesh, height * 0.5, *radius_top, radial_segments, true);
            cap(&mut mesh, -height * 0.5, *radius_bottom, radial_segments, false);
        }
        (
            GeometryDescriptor::Torus { radius, tube },
            Tessellation::Torus {
                radial_segments,
                tubular_segments,
            },
        ) => {
            torus(&mut mesh, *radius, *tube, radial_segments, tubular_segments);
        }
        _ => return None,
    }

    debug_assert_eq!(mesh.triangle_count(), lod.triangle_count);
    Some(mesh)
}

/// One horizontal ring of a surface of revolution.
struct Ring {
    y: f32,
    radius: f32,
    normal_xz: f32,
    normal_y: f32,
}

/// Sweep `rings` (top to bottom) around the Y axis. With `poles`, the first and last
/// rings are treated as degenerate points and emit a single triangle per cell.
fn lathe(mesh: &mut MeshData, rings: &[Ring], radial: u32, poles: bool) {
    let base = mesh.vertices.len() as u32;
    let stride = radial + 1;

    for (j, ring) in rings.iter().enumerate() {
        let v = j as f32 / (rings.len() - 1) as f32;
        for ix in 0..=radial {
            let u = ix as f32 / radial as f32;
            let (sin, cos) = (u * TAU).sin_cos();
            mesh.push_vertex(
                [ring.radius * cos, ring.y, ring.radius * sin],
                [ring.normal_xz * cos, ring.normal_y, ring.normal_xz * sin],
                [u, v],
            );
        }
    }

    let rows = rings.len() as u32 - 1;
    for j in 0..rows {
        for ix in 0..radial {
            let a = base + j * stride + ix;
            let b = a + 1;
            let c = a + stride;
            let d = c + 1;
            if !(poles && j == 0) {
                mesh.indices.extend_from_slice(&[a, b, c]);
            }
            if !(poles && j == rows - 1) {
                mesh.indices.extend_from_slice(&[b, d, c]);
            }
        }
    }
}

/// Flat triangle-fan disc closing a cylinder end.
fn cap(mesh: &mut MeshData, y: f32, radius: f32, radial: u32, top: bool) {
    let normal = if top { [0.0, 1.0, 0.0] } else { [0.0, -1.0, 0.0] };
    let center = mesh.push_vertex([0.0, y, 0.0], normal, [0.5, 0.5]);
    let first = mesh.vertices.len() as u32;
    for ix in 0..=radial {
        let (sin, cos) = (ix as f32 / radial as f32 * TAU).sin_cos();
        mesh.push_vertex(
            [radius * cos, y, radius * sin],
            normal,
            [0.5 + 0.5 * cos, 0.5 + 0.5 * sin],
        );
    }
    for ix in 0..radial {
        let p0 = first + ix;
        let p1 = p0 + 1;
        if top {
            mesh.indices.extend_from_slice(&[center, p1, p0]);
        } else {
            mesh.indices.extend_from_slice(&[center, p0, p1]);
        }
    }
}

fn torus(mesh: &mut MeshData, radius: f32, tube: f32, radial: u32, tubular: u32) {
    let base = mesh.vertices.len() as u32;
    let stride = tubular + 1;
    for j in 0..=radial {
        let v = j as f32 / radial as f32;
        let (sin_v, cos_v) = (v * TAU).sin_cos();
        for i in 0..=tubular {
            let u = i as f32 / tubular as f32;
            let (sin_u, cos_u) = (u * TAU).sin_cos();
            let ring = radius + tube * cos_v;
            mesh.push_vertex(
                [ring * cos_u, tube * sin_v, ring * sin_u],
                [cos_v * cos_u, sin_v, cos_v * sin_u],
                [u, v],
            );
        }
    }
    for j in 0..radial {
        for i in 0..tubular {
            let a = base + j * stride + i;
            let b = a + 1;
            let c = a + stride;
            let d = c + 1;
            mesh.indices.extend_from_slice(&[a, b, c, b, d, c]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::generate_lods;

    fn descriptors() -> Vec<GeometryDescriptor> {
        vec![
            GeometryDescriptor::Sphere { radius: 0.4 },
            GeometryDescriptor::Capsule {
                radius: 0.1,
                length: 0.6,
            },
            GeometryDescriptor::Cylinder {
                radius_top: 0.05,
                radius_bottom: 0.08,
                height: 1.2,
            },
            GeometryDescriptor::Torus {
                radius: 0.3,
                tube: 0.05,
            },
        ]
    }

    /// Built meshes contain exactly the declared number of triangles at every level.
    #[test]
    fn test_mesh_triangle_count_matches_chain() {
        for descriptor in descriptors() {
            for lod in generate_lods(&descriptor) {
                let mesh = build_mesh(&descriptor, lod.level).unwrap();
                assert_eq!(
                    mesh.triangle_count(),
                    lod.triangle_count,
                    "{} at {}",
                    descriptor.kind(),
                    lod.level
                );
            }
        }
    }

    /// All indices reference existing vertices.
    #[test]
    fn test_indices_in_range() {
        for descriptor in descriptors() {
            let mesh = build_mesh(&descriptor, DetailLevel::Near).unwrap();
            let count = mesh.vertices.len() as u32;
            assert!(mesh.indices.iter().all(|&i| i < count));
        }
    }

    /// Sphere vertices lie on the sphere surface.
    #[test]
    fn test_sphere_vertices_on_surface() {
        let mesh = build_mesh(&GeometryDescriptor::Sphere { radius: 2.0 }, DetailLevel::Far)
            .unwrap();
        for v in &mesh.vertices {
            let [x, y, z] = v.position;
            let r = (x * x + y * y + z * z).sqrt();
            assert!((r - 2.0).abs() < 1e-4, "vertex radius {r}");
        }
    }

    /// Model descriptors have no procedural mesh.
    #[test]
    fn test_model_has_no_procedural_mesh() {
        let descriptor = GeometryDescriptor::Model {
            triangle_counts: vec![1000],
            bounding_radius: 1.0,
        };
        assert!(build_mesh(&descriptor, DetailLevel::Closeup).is_none());
    }

    #[test]
    fn test_vertex_bytes_length() {
        let mesh = build_mesh(&GeometryDescriptor::Sphere { radius: 1.0 }, DetailLevel::Far)
            .unwrap();
        assert_eq!(
            mesh.vertex_bytes().len(),
            mesh.vertices.len() * std::mem::size_of::<MeshVertex>()
        );
    }
}
