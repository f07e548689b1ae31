//! Instanced rendering of high-count repeated elements: blood cells, alveoli, vertebrae
//! and ribs. Instance counts follow the host structure's granted detail level and the
//! animation quality, and instances outside the frustum are dropped before upload.

mod instance;
mod kind;
mod renderer;
pub mod sources;

pub use instance::InstanceData;
pub use kind::{InstancedElementKind, detail_fraction};
pub use renderer::{InstanceBatch, InstancedDraw, InstancedRenderer, InstancingFrame, target_count};
