//! Per-frame instance buffer construction.
//!
//! Each kind owns a list of source placements. Every frame the renderer picks an evenly
//! spread subset sized by the host's granted detail level and the animation quality,
//! trims it to the triangles the structures left unreserved, drops instances outside
//! the view frustum, and appends the rest to one shared upload buffer. Each kind with
//! anything left becomes one [`InstancedDraw`].

use std::f32::consts::PI;

use glam::{Mat4, Quat, Vec3};
use tracing::{debug, trace};
use vitalis_animation::AnimationQuality;
use vitalis_geometry::{BoundingSphere, DetailLevel, LodChain};
use vitalis_lod::ViewFrustum;

use crate::instance::InstanceData;
use crate::kind::{InstancedElementKind, detail_fraction};
use crate::sources;

/// One draw call covering a contiguous range of the upload buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InstancedDraw {
    pub kind: InstancedElementKind,
    /// Detail level of the shared base mesh.
    pub level: DetailLevel,
    pub first_instance: u32,
    pub instance_count: u32,
    pub triangles_per_instance: u32,
}

impl InstancedDraw {
    pub fn triangle_count(&self) -> u64 {
        u64::from(self.instance_count) * u64::from(self.triangles_per_instance)
    }
}

/// Inputs for one frame.
pub struct InstancingFrame<'a> {
    pub frustum: &'a ViewFrustum,
    pub quality: AnimationQuality,
    /// Granted level of each kind's host, indexed by [`InstancedElementKind::index`].
    /// `None` when the host is culled or hidden.
    pub host_levels: [Option<DetailLevel>; 4],
    /// Live blood-flow particle positions.
    pub blood_cells: &'a [Vec3],
    /// Triangles the instances may use in total, normally what the triangle budget
    /// has left after structure allocation.
    pub triangle_allowance: u64,
}

/// Order in which kinds claim the triangle allowance. Static anatomy goes first so
/// the skeleton stays whole and the particle kinds thin out instead.
const ALLOWANCE_ORDER: [InstancedElementKind; 4] = [
    InstancedElementKind::Vertebra,
    InstancedElementKind::Rib,
    InstancedElementKind::Alveolus,
    InstancedElementKind::RedBloodCell,
];

#[derive(Clone, Copy, Debug)]
struct InstanceSource {
    model: Mat4,
    /// Bounding radius after the model's scale.
    radius: f32,
}

/// Sources and base mesh for one kind.
#[derive(Clone, Debug)]
pub struct InstanceBatch {
    kind: InstancedElementKind,
    chain: LodChain,
    base_radius: f32,
    sources: Vec<InstanceSource>,
}

impl InstanceBatch {
    pub fn new(kind: InstancedElementKind) -> Self {
        let descriptor = kind.descriptor();
        Self {
            kind,
            chain: LodChain::generate(&descriptor),
            base_radius: descriptor.bounding_radius(),
            sources: Vec::new(),
        }
    }

    pub fn kind(&self) -> InstancedElementKind {
        self.kind
    }

    pub fn chain(&self) -> &LodChain {
        &self.chain
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn set_sources(&mut self, models: impl IntoIterator<Item = Mat4>) {
        let base = self.base_radius;
        self.sources.clear();
        self.sources.extend(models.into_iter().map(|model| {
            let (scale, _, _) = model.to_scale_rotation_translation();
            InstanceSource {
                model,
                radius: base * scale.abs().max_element(),
            }
        }));
    }
}

/// Instances to draw out of `sources` for a kind at a host level and quality.
pub fn target_count(
    kind: InstancedElementKind,
    sources: usize,
    level: DetailLevel,
    quality: AnimationQuality,
) -> usize {
    if !kind.scales_with_detail() {
        return sources;
    }
    let fraction = detail_fraction(level) * quality.multiplier();
    ((sources as f32 * fraction).round() as usize).min(sources)
}

/// Owns every batch plus the shared upload buffer, reused frame to frame.
#[derive(Clone, Debug)]
pub struct InstancedRenderer {
    batches: Vec<InstanceBatch>,
    instances: Vec<InstanceData>,
    draws: Vec<InstancedDraw>,
    frustum_rejected: usize,
    budget_limited: usize,
}

impl Default for InstancedRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl InstancedRenderer {
    /// A renderer with no static placements.
    pub fn new() -> Self {
        Self {
            batches: InstancedElementKind::ALL.map(InstanceBatch::new).to_vec(),
            instances: Vec::new(),
            draws: Vec::with_capacity(InstancedElementKind::ALL.len()),
            frustum_rejected: 0,
            budget_limited: 0,
        }
    }

    /// A renderer with the built-in vertebrae, ribs and alveoli.
    pub fn with_default_anatomy() -> Self {
        let mut renderer = Self::new();
        renderer.set_sources(InstancedElementKind::Vertebra, sources::vertebrae());
        renderer.set_sources(InstancedElementKind::Rib, sources::ribs());
        renderer.set_sources(InstancedElementKind::Alveolus, sources::alveoli());
        renderer
    }

    /// Replace the placements of a static kind. Blood cells ignore this and follow the
    /// blood-flow particles instead.
    pub fn set_sources(&mut self, kind: InstancedElementKind, models: Vec<Mat4>) {
        self.batches[kind.index()].set_sources(models);
    }

    pub fn batch(&self, kind: InstancedElementKind) -> &InstanceBatch {
        &self.batches[kind.index()]
    }

    /// Rebuild the upload buffer and draw list for this frame.
    pub fn prepare(&mut self, frame: &InstancingFrame<'_>) -> &[InstancedDraw] {
        self.instances.clear();
        self.draws.clear();
        self.frustum_rejected = 0;
        self.budget_limited = 0;

        let blood = blood_cell_models(frame.blood_cells);
        self.batches[InstancedElementKind::RedBloodCell.index()].set_sources(blood);

        // Counts are charged before frustum rejection, so the allowance is never
        // exceeded whatever the frustum keeps.
        let mut counts = [0usize; 4];
        let mut allowance = frame.triangle_allowance;
        for kind in ALLOWANCE_ORDER {
            let batch = &self.batches[kind.index()];
            let Some(level) = frame.host_levels[kind.index()] else {
                continue;
            };
            let wanted = target_count(kind, batch.sources.len(), level, frame.quality);
            let per_instance = u64::from(batch.chain.triangle_cost(level));
            let affordable = if per_instance == 0 {
                wanted
            } else {
                wanted.min(usize::try_from(allowance / per_instance).unwrap_or(usize::MAX))
            };
            allowance -= affordable as u64 * per_instance;
            self.budget_limited += wanted - affordable;
            counts[kind.index()] = affordable;
        }
        if self.budget_limited > 0 {
            debug!(
                "{} instances over the triangle allowance of {}",
                self.budget_limited, frame.triangle_allowance
            );
        }

        for batch in &self.batches {
            let Some(level) = frame.host_levels[batch.kind.index()] else {
                continue;
            };
            let total = batch.sources.len();
            let count = counts[batch.kind.index()];
            if count == 0 {
                continue;
            }

            let first = self.instances.len();
            let color = batch.kind.base_color();
            for i in 0..count {
                let source = &batch.sources[i * total / count];
                let center = source.model.w_axis.truncate();
                let bounds = BoundingSphere {
                    center,
                    radius: source.radius,
                };
                if !frame.frustum.intersects_sphere(&bounds) {
                    self.frustum_rejected += 1;
                    continue;
                }
                self.instances.push(InstanceData::new(source.model, color));
            }

            let written = self.instances.len() - first;
            if written > 0 {
                self.draws.push(InstancedDraw {
                    kind: batch.kind,
                    level,
                    first_instance: first as u32,
                    instance_count: written as u32,
                    triangles_per_instance: batch.chain.triangle_cost(level),
                });
            }
            trace!(
                "{}: {} of {} sources at {}, {} in view",
                batch.kind,
                count,
                total,
                level.name(),
                written
            );
        }
        &self.draws
    }

    pub fn draws(&self) -> &[InstancedDraw] {
        &self.draws
    }

    pub fn instances(&self) -> &[InstanceData] {
        &self.instances
    }

    /// The instance buffer as raw bytes, ready for upload.
    pub fn upload_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.instances)
    }

    /// Instances selected this frame but outside the frustum.
    pub fn frustum_rejected(&self) -> usize {
        self.frustum_rejected
    }

    /// Instances dropped this frame because the triangle allowance ran out.
    pub fn budget_limited(&self) -> usize {
        self.budget_limited
    }

    pub fn total_triangles(&self) -> u64 {
        self.draws.iter().map(InstancedDraw::triangle_count).sum()
    }
}

/// Each cell tumbles a little so the disc faces vary along the stream.
fn blood_cell_models(positions: &[Vec3]) -> impl Iterator<Item = Mat4> + '_ {
    let golden = PI * (3.0 - 5f32.sqrt());
    positions.iter().enumerate().map(move |(i, &position)| {
        let tilt = Quat::from_rotation_x(i as f32 * golden) * Quat::from_rotation_z(i as f32 * 0.37);
        Mat4::from_rotation_translation(tilt, position)
    })
}
