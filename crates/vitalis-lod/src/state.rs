//! Per-structure LOD state and the per-frame culling, selection and allocation pass.

use std::collections::BTreeMap;

use glam::Vec3;
use rustc_hash::FxHashSet;
use vitalis_geometry::{BodySystem, BoundingSphere, DetailLevel, StructureId, StructureRegistry};

use crate::allocator::{AllocationRequest, AllocationThrottle, BudgetAllocator};
use crate::budget::TriangleBudget;
use crate::culling::{CullReason, Occluder, OcclusionCuller, ViewFrustum};
use crate::selector::{DeadBand, LodSelector, LodThresholds};
use crate::transition::LodTransitionManager;

/// Tunables for the LOD pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct LodSettings {
    pub thresholds: LodThresholds,
    pub dead_band: DeadBand,
    /// Crossfade duration in seconds.
    pub transition_seconds: f32,
    /// Camera movement that forces a new allocation pass.
    pub realloc_distance: f32,
    /// Allocation runs at least this often even with a still camera.
    pub realloc_interval_frames: u32,
    pub occlusion_interval_frames: u32,
    /// Selected structures are never starved below this level (or their desired
    /// level, if coarser).
    pub selected_min_level: DetailLevel,
    pub triangle_budget: u64,
}

impl Default for LodSettings {
    fn default() -> Self {
        Self {
            thresholds: LodThresholds::default(),
            dead_band: DeadBand::default(),
            transition_seconds: 0.3,
            realloc_distance: 0.5,
            realloc_interval_frames: 10,
            occlusion_interval_frames: 4,
            selected_min_level: DetailLevel::Near,
            triangle_budget: 500_000,
        }
    }
}

/// Camera inputs for one LOD update.
#[derive(Clone, Debug)]
pub struct CameraView {
    pub position: Vec3,
    pub frustum: ViewFrustum,
}

/// Mutable LOD record for one registered structure.
#[derive(Clone, Debug, PartialEq)]
pub struct StructureLodState {
    /// Last granted level. Kept while culled so re-entry has a reference point.
    pub level: DetailLevel,
    /// Hysteresis-smoothed level for the current distance.
    pub target: DetailLevel,
    /// Crossfade progress toward `level`, 1.0 when settled.
    pub transition_progress: f32,
    /// Distance from the camera to the bounding-sphere centre.
    pub distance: f32,
    pub culled: Option<CullReason>,
    /// Could not be given any triangles by the last allocation pass.
    pub omitted: bool,
    /// Triangles reserved at `level`; zero when culled or omitted.
    pub triangle_cost: u32,
    /// The last allocation dropped the level below its one-step floor to stay in
    /// budget. Such drops snap instead of crossfading.
    pub hard_cut: bool,
    on_screen: bool,
    evaluated: bool,
}

impl StructureLodState {
    fn new() -> Self {
        Self {
            level: DetailLevel::COARSEST,
            target: DetailLevel::COARSEST,
            transition_progress: 1.0,
            distance: f32::INFINITY,
            culled: None,
            omitted: false,
            triangle_cost: 0,
            hard_cut: false,
            on_screen: false,
            evaluated: false,
        }
    }

    /// Whether the structure is drawn this frame.
    pub fn is_rendered(&self) -> bool {
        self.on_screen && self.culled.is_none() && !self.omitted
    }

    fn take_off_screen(&mut self) {
        self.on_screen = false;
        self.hard_cut = false;
        self.triangle_cost = 0;
        self.transition_progress = 1.0;
    }
}

/// Counters describing one LOD update.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LodFrameReport {
    pub rendered: usize,
    pub culled_frustum: usize,
    pub culled_occluded: usize,
    pub culled_hidden: usize,
    pub culled_predicate: usize,
    pub omitted: usize,
    /// Structures the allocator dropped more than one level this frame.
    pub hard_cuts: usize,
    pub triangles: u64,
    pub budget: u64,
    pub transitioning: usize,
    /// Whether the allocator ran this frame.
    pub reallocated: bool,
}

/// Owns every structure's LOD state and runs culling, hysteresis and the budget
/// allocator once per frame, in that order.
pub struct LodStateManager {
    settings: LodSettings,
    selector: LodSelector,
    transitions: LodTransitionManager,
    allocator: BudgetAllocator,
    budget: TriangleBudget,
    throttle: AllocationThrottle,
    occlusion: OcclusionCuller,
    states: BTreeMap<StructureId, StructureLodState>,
    selected: Option<StructureId>,
    hidden_systems: FxHashSet<BodySystem>,
    snap_requested: bool,
}

impl LodStateManager {
    pub fn new(settings: LodSettings) -> Self {
        Self {
            selector: LodSelector::new(settings.thresholds, settings.dead_band),
            transitions: LodTransitionManager::new(settings.transition_seconds),
            allocator: BudgetAllocator::new(),
            budget: TriangleBudget::new(settings.triangle_budget),
            throttle: AllocationThrottle::new(
                settings.realloc_distance,
                settings.realloc_interval_frames,
            ),
            occlusion: OcclusionCuller::new(settings.occlusion_interval_frames),
            states: BTreeMap::new(),
            selected: None,
            hidden_systems: FxHashSet::default(),
            snap_requested: false,
            settings,
        }
    }

    pub fn settings(&self) -> &LodSettings {
        &self.settings
    }

    /// Replace the tunables, keeping per-structure state.
    pub fn apply_settings(&mut self, settings: LodSettings) {
        self.selector = LodSelector::new(settings.thresholds, settings.dead_band);
        self.transitions.set_duration(settings.transition_seconds);
        self.budget.set_total(settings.triangle_budget);
        self.throttle =
            AllocationThrottle::new(settings.realloc_distance, settings.realloc_interval_frames);
        self.occlusion = OcclusionCuller::new(settings.occlusion_interval_frames);
        self.settings = settings;
        tracing::debug!(budget = self.settings.triangle_budget, "LOD settings applied");
    }

    pub fn register(&mut self, id: StructureId) {
        self.states.entry(id).or_insert_with(StructureLodState::new);
        self.throttle.mark_dirty();
    }

    pub fn register_all(&mut self, registry: &StructureRegistry) {
        for structure in registry.iter() {
            self.register(structure.id);
        }
    }

    pub fn unregister(&mut self, id: StructureId) {
        if self.states.remove(&id).is_some() {
            self.budget.release(id);
            self.transitions.remove(id);
            self.occlusion.forget(id);
            if self.selected == Some(id) {
                self.selected = None;
            }
            self.throttle.mark_dirty();
        }
    }

    pub fn state(&self, id: StructureId) -> Option<&StructureLodState> {
        self.states.get(&id)
    }

    pub fn states(&self) -> impl Iterator<Item = (StructureId, &StructureLodState)> {
        self.states.iter().map(|(id, state)| (*id, state))
    }

    pub fn transitions(&self) -> &LodTransitionManager {
        &self.transitions
    }

    pub fn budget(&self) -> &TriangleBudget {
        &self.budget
    }

    pub fn set_triangle_budget(&mut self, total: u64) {
        self.settings.triangle_budget = total;
        self.budget.set_total(total);
        self.throttle.mark_dirty();
    }

    /// Select a structure (or clear the selection) for a budget boost.
    pub fn select(&mut self, id: Option<StructureId>) {
        if self.selected != id {
            self.selected = id;
            self.throttle.mark_dirty();
        }
    }

    pub fn selected(&self) -> Option<StructureId> {
        self.selected
    }

    /// Jump straight to target levels on the next update, cutting crossfades.
    pub fn request_snap(&mut self) {
        self.snap_requested = true;
    }

    pub fn set_system_visible(&mut self, system: BodySystem, visible: bool) {
        let changed = if visible {
            self.hidden_systems.remove(&system)
        } else {
            self.hidden_systems.insert(system)
        };
        if changed {
            self.throttle.mark_dirty();
        }
    }

    pub fn is_system_visible(&self, system: BodySystem) -> bool {
        !self.hidden_systems.contains(&system)
    }

    /// Run one frame of culling, level selection and allocation.
    pub fn update(
        &mut self,
        registry: &StructureRegistry,
        camera: &CameraView,
        dt: f32,
    ) -> LodFrameReport {
        let snap = std::mem::take(&mut self.snap_requested);

        // Frustum and layer culling; gather occlusion inputs from what survives.
        let mut cull: Vec<(StructureId, Option<CullReason>)> = Vec::with_capacity(self.states.len());
        let mut candidates: Vec<(StructureId, BoundingSphere)> = Vec::new();
        let mut occluders: Vec<Occluder> = Vec::new();
        for (&id, state) in self.states.iter_mut() {
            let Some(structure) = registry.get(id) else {
                continue;
            };
            state.distance = structure.bounds.distance_to(camera.position);
            let reason = if self.hidden_systems.contains(&structure.system) {
                Some(CullReason::Hidden)
            } else if !camera.frustum.intersects_sphere(&structure.bounds) {
                Some(CullReason::Frustum)
            } else {
                candidates.push((id, structure.bounds));
                if let Some(inscribed_radius) = structure.occluder_radius {
                    occluders.push(Occluder {
                        id,
                        center: structure.bounds.center,
                        inscribed_radius,
                    });
                }
                None
            };
            cull.push((id, reason));
        }

        if self.occlusion.due(snap) {
            self.occlusion.evaluate(camera.position, &candidates, &occluders);
        }

        // Hysteresis targets, visibility predicate, and culling bookkeeping.
        let mut cull_changed = false;
        let mut converging = false;
        for (id, reason) in cull {
            let (Some(structure), Some(state)) = (registry.get(id), self.states.get_mut(&id))
            else {
                continue;
            };

            state.target = if state.evaluated {
                self.selector.resolve(state.target, state.distance)
            } else {
                self.selector.select_raw(state.distance)
            };
            state.evaluated = true;

            let reason = reason
                .or_else(|| self.occlusion.is_occluded(id).then_some(CullReason::Occluded))
                .or_else(|| (!structure.visible_at(state.target)).then_some(CullReason::Predicate));

            if reason != state.culled {
                cull_changed = true;
                if let Some(reason) = reason {
                    tracing::debug!(structure = %structure.name, ?reason, "structure culled");
                }
            }
            state.culled = reason;

            if reason.is_some() {
                state.omitted = false;
                state.take_off_screen();
                self.budget.release(id);
                self.transitions.remove(id);
            } else if (state.on_screen && state.level != state.target)
                || (!state.on_screen && !state.omitted)
            {
                converging = true;
            }
        }

        let throttle_due = self.throttle.should_run(camera.position);
        let reallocated = throttle_due || cull_changed || converging || snap;
        let mut hard_cuts = 0;
        if reallocated {
            hard_cuts = self.reallocate(registry, snap);
            self.throttle.mark_ran(camera.position);
        }

        self.transitions.update(dt);
        let mut report = LodFrameReport {
            triangles: self.budget.allocated(),
            budget: self.budget.total(),
            transitioning: self.transitions.transitioning_count(),
            hard_cuts,
            reallocated,
            ..Default::default()
        };
        for (&id, state) in self.states.iter_mut() {
            state.transition_progress = self.transitions.progress(id);
            match state.culled {
                Some(CullReason::Frustum) => report.culled_frustum += 1,
                Some(CullReason::Occluded) => report.culled_occluded += 1,
                Some(CullReason::Hidden) => report.culled_hidden += 1,
                Some(CullReason::Predicate) => report.culled_predicate += 1,
                None if state.omitted => report.omitted += 1,
                None if state.on_screen => report.rendered += 1,
                None => {}
            }
        }
        report
    }

    /// Returns how many structures were hard cut.
    fn reallocate(&mut self, registry: &StructureRegistry, snap: bool) -> usize {
        let mut requests: Vec<AllocationRequest> = self
            .states
            .iter()
            .filter(|(_, state)| state.culled.is_none())
            .filter_map(|(&id, state)| {
                let structure = registry.get(id)?;
                let previous = (state.on_screen && !snap).then_some(state.level);
                let desired = previous.map_or(state.target, |p| p.step_toward(state.target));
                let mut floor = previous.map_or(DetailLevel::COARSEST, |p| p.coarser().unwrap_or(p));
                floor = floor.max(structure.min_level.min(desired));
                let selected = self.selected == Some(id);
                if selected {
                    floor = floor.max(desired.min(self.settings.selected_min_level));
                }
                Some(AllocationRequest {
                    id,
                    desired,
                    floor,
                    costs: structure.lod_chain.costs(),
                    priority: structure.priority,
                    distance: state.distance,
                    selected,
                })
            })
            .collect();

        let allocation = self.allocator.allocate(&mut requests, &mut self.budget);

        let mut hard_cuts = 0;
        for request in &requests {
            let Some(state) = self.states.get_mut(&request.id) else {
                continue;
            };
            // A cut below the visibility predicate draws nothing worth the triangles.
            let granted = allocation.granted(request.id).filter(|&level| {
                registry
                    .get(request.id)
                    .is_some_and(|structure| structure.visible_at(level))
            });
            match granted {
                Some(level) => {
                    let hard_cut = allocation.is_hard_cut(request.id);
                    if hard_cut {
                        hard_cuts += 1;
                        tracing::debug!(id = %request.id, from = %state.level, to = %level, "budget hard cut");
                    }
                    if state.on_screen && !snap && !hard_cut {
                        if level != state.level {
                            tracing::debug!(id = %request.id, from = %state.level, to = %level, "detail level changed");
                            self.transitions.on_level_changed(request.id, state.level, level);
                        }
                    } else {
                        self.transitions.snap(request.id, level);
                    }
                    state.level = level;
                    state.on_screen = true;
                    state.omitted = false;
                    state.hard_cut = hard_cut;
                    state.triangle_cost = request.costs[level.index()];
                }
                None => {
                    state.omitted = true;
                    state.take_off_screen();
                    self.budget.release(request.id);
                    self.transitions.remove(request.id);
                }
            }
        }
        hard_cuts
    }
}
