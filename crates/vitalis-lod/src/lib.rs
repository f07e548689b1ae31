//! Level-of-detail management: distance-based selection with hysteresis, crossfade
//! transitions, frustum and occlusion culling, and triangle budget allocation.

mod allocator;
mod budget;
mod culling;
mod selector;
mod state;
mod transition;

pub use allocator::{Allocation, AllocationRequest, AllocationThrottle, BudgetAllocator};
pub use budget::{PlatformProfile, TriangleBudget};
pub use culling::{CullReason, Intersection, Occluder, OcclusionCuller, ViewFrustum, is_hidden_behind};
pub use selector::{DeadBand, LodSelector, LodThresholds};
pub use state::{CameraView, LodFrameReport, LodSettings, LodStateManager, StructureLodState};
pub use transition::{LodTransitionManager, LodTransitionState, smooth_step};
