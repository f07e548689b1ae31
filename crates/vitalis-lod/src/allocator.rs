//! Reconciles desired detail levels against the triangle budget.

use std::cmp::Ordering;

use glam::Vec3;
use rustc_hash::FxHashMap;
use vitalis_geometry::{DetailLevel, StructureId};

use crate::budget::TriangleBudget;

/// Lowest priority weight used for ranking, so zero-priority structures still sort
/// by distance.
const MIN_PRIORITY: f32 = 0.01;

/// One structure competing for triangles this pass.
#[derive(Clone, Debug)]
pub struct AllocationRequest {
    pub id: StructureId,
    /// Level the structure would like to be drawn at.
    pub desired: DetailLevel,
    /// Coarsest level it may be granted this pass.
    pub floor: DetailLevel,
    /// Triangle cost indexed by [`DetailLevel::index`].
    pub costs: [u32; DetailLevel::COUNT],
    pub priority: f32,
    pub distance: f32,
    /// Selected structures rank ahead of everything else.
    pub selected: bool,
}

impl AllocationRequest {
    fn cost(&self, level: DetailLevel) -> u32 {
        self.costs[level.index()]
    }

    fn score(&self) -> f32 {
        self.distance / self.priority.max(MIN_PRIORITY)
    }
}

/// Result of one allocation pass.
#[derive(Clone, Debug, Default)]
pub struct Allocation {
    /// Granted level per structure.
    pub grants: FxHashMap<StructureId, DetailLevel>,
    /// Structures that could not be given even the coarsest level.
    pub omitted: Vec<StructureId>,
    /// Structures granted a level below their floor. These drop more than one step
    /// at once and should not crossfade from their previous level.
    pub hard_cuts: Vec<StructureId>,
    /// Total triangles reserved.
    pub triangles: u64,
}

impl Allocation {
    pub fn granted(&self, id: StructureId) -> Option<DetailLevel> {
        self.grants.get(&id).copied()
    }

    pub fn is_hard_cut(&self, id: StructureId) -> bool {
        self.hard_cuts.contains(&id)
    }
}

/// Greedy allocator over a shared [`TriangleBudget`].
#[derive(Clone, Debug, Default)]
pub struct BudgetAllocator;

impl BudgetAllocator {
    pub fn new() -> Self {
        Self
    }

    /// Rank `requests` and reserve triangles for them in `budget`.
    ///
    /// The budget is cleared first. Every structure is ranked (selected first, then
    /// by `distance / priority`, then by id). A first pass reserves each floor level
    /// in rank order. When the floor does not fit, the structure keeps stepping down
    /// toward the coarsest level and takes the first that fits as a hard cut; only a
    /// structure whose coarsest level does not fit is omitted. A second pass upgrades
    /// each survivor toward its desired level, stepping down one level at a time until
    /// the upgrade fits.
    pub fn allocate(
        &self,
        requests: &mut [AllocationRequest],
        budget: &mut TriangleBudget,
    ) -> Allocation {
        budget.clear();
        requests.sort_by(rank);

        let mut allocation = Allocation::default();

        for request in requests.iter_mut() {
            request.floor = request.floor.min(request.desired);
            let mut level = Some(request.floor);
            while let Some(candidate) = level {
                if budget.try_reserve(request.id, request.cost(candidate)) {
                    break;
                }
                level = candidate.coarser();
            }
            match level {
                Some(granted) => {
                    allocation.grants.insert(request.id, granted);
                    if granted < request.floor {
                        allocation.hard_cuts.push(request.id);
                    }
                }
                None => allocation.omitted.push(request.id),
            }
        }

        for request in requests.iter() {
            let Some(granted) = allocation.granted(request.id) else {
                continue;
            };
            let mut level = request.desired;
            while level > granted {
                if budget.try_reserve(request.id, request.cost(level)) {
                    allocation.grants.insert(request.id, level);
                    break;
                }
                level = level.coarser().unwrap_or(granted);
            }
        }

        allocation.triangles = budget.allocated();

        if !allocation.hard_cuts.is_empty() {
            tracing::debug!(
                hard_cuts = allocation.hard_cuts.len(),
                "triangle budget forced structures below their floor"
            );
        }
        if !allocation.omitted.is_empty() {
            tracing::warn!(
                omitted = allocation.omitted.len(),
                budget = budget.total(),
                used = allocation.triangles,
                "triangle budget exhausted; omitting lowest ranked structures"
            );
        }

        allocation
    }
}

fn rank(a: &AllocationRequest, b: &AllocationRequest) -> Ordering {
    b.selected
        .cmp(&a.selected)
        .then_with(|| a.score().total_cmp(&b.score()))
        .then_with(|| a.id.cmp(&b.id))
}

/// Decides when an allocation pass is worth re-running.
#[derive(Clone, Debug)]
pub struct AllocationThrottle {
    realloc_distance: f32,
    interval_frames: u32,
    last_position: Option<Vec3>,
    frames_since: u32,
    dirty: bool,
}

impl AllocationThrottle {
    pub fn new(realloc_distance: f32, interval_frames: u32) -> Self {
        Self {
            realloc_distance,
            interval_frames: interval_frames.max(1),
            last_position: None,
            frames_since: 0,
            dirty: true,
        }
    }

    /// Force the next check to run (selection, registration or culling changes).
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Count a frame and report whether allocation should run.
    pub fn should_run(&mut self, camera: Vec3) -> bool {
        self.frames_since = self.frames_since.saturating_add(1);
        let moved = self
            .last_position
            .is_none_or(|last| last.distance(camera) > self.realloc_distance);
        self.dirty || moved || self.frames_since >= self.interval_frames
    }

    /// Record that allocation ran with the camera at `camera`.
    pub fn mark_ran(&mut self, camera: Vec3) {
        self.last_position = Some(camera);
        self.frames_since = 0;
        self.dirty = false;
    }
}

impl Default for AllocationThrottle {
    fn default() -> Self {
        Self::new(0.5, 10)
    }
}
