//! Progressive region model loading under a memory budget.
//!
//! Every body region starts on its procedural preview. Higher tiers are requested per
//! region, fetched by the worker pool, and swapped in on the render thread once decoded.
//! Before a load is dispatched its estimated size is checked against the memory budget;
//! if it does not fit, least-recently-used models of other regions that are neither on
//! screen nor granted this frame are evicted. A load that still cannot fit stays queued.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use vitalis_geometry::{BodyRegion, Transform};

use crate::cache::ModelCache;
use crate::decoder::ModelDecoder;
use crate::error::AssetLoadError;
use crate::manifest::{AssetManifest, PathResolver};
use crate::memory::{EvictionCandidate, MemoryBudget, select_evictions};
use crate::model::ModelInstance;
use crate::quality::{AssetKey, MemoryTier, ModelQuality};
use crate::queue::LoadQueue;
use crate::source::AssetSource;
use crate::worker::{FetchJob, FetchWorkerPool, WorkerMessage};

/// Lifecycle of one `(region, tier)` asset.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum LoadState {
    #[default]
    NotRequested,
    Queued,
    Downloading { progress: u8 },
    Ready,
    Evicted,
    /// `retry_in` is `None` once the retry policy has given up.
    Errored { attempts: u32, retry_in: Option<f32> },
}

impl LoadState {
    /// Whether the asset is resident or on its way.
    pub fn is_pending_or_ready(self) -> bool {
        matches!(
            self,
            LoadState::Queued | LoadState::Downloading { .. } | LoadState::Ready
        )
    }
}

/// Exponential backoff for failed loads.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub base_delay_seconds: f32,
    pub max_delay_seconds: f32,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay_seconds: 1.0,
            max_delay_seconds: 30.0,
            max_attempts: 5,
        }
    }
}

impl RetryPolicy {
    /// Delay before the next try after `attempts` failures, or `None` to give up.
    pub fn delay_after(&self, attempts: u32) -> Option<f32> {
        if attempts == 0 || attempts >= self.max_attempts {
            return None;
        }
        let exponent = (attempts - 1).min(30) as i32;
        Some((self.base_delay_seconds * 2f32.powi(exponent)).min(self.max_delay_seconds))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderSettings {
    pub memory_tier: MemoryTier,
    /// Replaces the tier's byte budget when set.
    pub memory_budget_bytes: Option<u64>,
    pub max_concurrent: usize,
    pub worker_threads: usize,
    pub retry: RetryPolicy,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            memory_tier: MemoryTier::Medium,
            memory_budget_bytes: None,
            max_concurrent: 2,
            worker_threads: 2,
            retry: RetryPolicy::default(),
        }
    }
}

impl LoaderSettings {
    pub fn memory_limit(&self) -> u64 {
        self.memory_budget_bytes
            .unwrap_or_else(|| self.memory_tier.budget_bytes())
    }
}

/// Regions the current frame depends on. Their models are never evicted.
#[derive(Clone, Debug, Default)]
pub struct FrameRequirements {
    visible: FxHashSet<BodyRegion>,
    required: FxHashSet<BodyRegion>,
}

impl FrameRequirements {
    pub fn new() -> Self {
        Self::default()
    }

    /// A region with at least one structure on screen.
    pub fn mark_visible(&mut self, region: BodyRegion) {
        self.visible.insert(region);
    }

    /// A region with at least one structure granted triangles this frame.
    pub fn mark_required(&mut self, region: BodyRegion) {
        self.required.insert(region);
    }

    pub fn with_visible(mut self, region: BodyRegion) -> Self {
        self.mark_visible(region);
        self
    }

    pub fn with_required(mut self, region: BodyRegion) -> Self {
        self.mark_required(region);
        self
    }

    pub fn is_visible(&self, region: BodyRegion) -> bool {
        self.visible.contains(&region)
    }

    pub fn is_required(&self, region: BodyRegion) -> bool {
        self.required.contains(&region)
    }

    /// Whether eviction must leave this region alone.
    pub fn protects(&self, region: BodyRegion) -> bool {
        self.is_visible(region) || self.is_required(region)
    }

    fn regions(&self) -> impl Iterator<Item = BodyRegion> + '_ {
        self.visible.iter().chain(self.required.iter()).copied()
    }
}

/// A region's displayed model changed tier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwapEvent {
    pub region: BodyRegion,
    pub from: ModelQuality,
    pub to: ModelQuality,
}

/// Everything that happened during one [`ProgressiveLoader::tick`].
#[derive(Clone, Debug, Default)]
pub struct LoaderReport {
    pub swaps: Vec<SwapEvent>,
    pub loaded: Vec<AssetKey>,
    pub evicted: Vec<AssetKey>,
    pub failed: Vec<AssetKey>,
    pub cancelled: Vec<AssetKey>,
    pub dispatched: Vec<AssetKey>,
}

#[derive(Debug, Default)]
struct RegionSlot {
    active: ModelQuality,
    instance: Option<ModelInstance>,
    /// Root transform carried across swaps, used while on the preview.
    root: Transform,
}

/// Owns the model cache and drives every region from preview to its requested tier.
pub struct ProgressiveLoader {
    manifest: AssetManifest,
    resolver: Box<dyn PathResolver>,
    pool: FetchWorkerPool,
    settings: LoaderSettings,
    memory: MemoryBudget,
    cache: ModelCache,
    queue: LoadQueue,
    states: FxHashMap<AssetKey, LoadState>,
    attempts: FxHashMap<AssetKey, u32>,
    priorities: FxHashMap<AssetKey, f32>,
    in_flight: FxHashMap<AssetKey, Arc<AtomicBool>>,
    slots: FxHashMap<BodyRegion, RegionSlot>,
    frame: u64,
}

impl ProgressiveLoader {
    pub fn new(
        manifest: AssetManifest,
        resolver: Box<dyn PathResolver>,
        source: Arc<dyn AssetSource>,
        decoder: Arc<dyn ModelDecoder>,
        settings: LoaderSettings,
    ) -> Self {
        let max_concurrent = settings.max_concurrent.max(1);
        let pool = FetchWorkerPool::new(
            settings.worker_threads.max(1),
            max_concurrent * 2,
            source,
            decoder,
        );
        info!(
            "Asset loader started: {} entries, {} byte budget, {} concurrent loads",
            manifest.entries.len(),
            settings.memory_limit(),
            max_concurrent
        );
        Self {
            manifest,
            resolver,
            pool,
            memory: MemoryBudget::new(settings.memory_limit()),
            settings,
            cache: ModelCache::new(),
            queue: LoadQueue::new(),
            states: FxHashMap::default(),
            attempts: FxHashMap::default(),
            priorities: FxHashMap::default(),
            in_flight: FxHashMap::default(),
            slots: FxHashMap::default(),
            frame: 0,
        }
    }

    pub fn settings(&self) -> &LoaderSettings {
        &self.settings
    }

    pub fn set_memory_tier(&mut self, tier: MemoryTier) {
        self.settings.memory_tier = tier;
        self.memory.set_limit(self.settings.memory_limit());
    }

    pub fn memory(&self) -> &MemoryBudget {
        &self.memory
    }

    /// Whether the manifest lists `tier` for `region`.
    pub fn has_entry(&self, region: BodyRegion, tier: ModelQuality) -> bool {
        self.manifest.lookup(AssetKey::new(region, tier)).is_some()
    }

    pub fn state(&self, key: AssetKey) -> LoadState {
        self.states.get(&key).copied().unwrap_or_default()
    }

    /// Tier currently displayed for a region.
    pub fn active_quality(&self, region: BodyRegion) -> ModelQuality {
        self.slots
            .get(&region)
            .map_or(ModelQuality::Preview, |s| s.active)
    }

    /// An independent instance of the region's displayed model, or `None` while the
    /// region is on its procedural preview. Holding the instance pins the model.
    pub fn acquire(&self, region: BodyRegion) -> Option<ModelInstance> {
        self.slots.get(&region)?.instance.clone()
    }

    /// Move a region's model. Carried across swaps.
    pub fn set_region_root(&mut self, region: BodyRegion, root: Transform) {
        let slot = self.slots.entry(region).or_default();
        slot.root = root;
        if let Some(instance) = &mut slot.instance {
            instance.root = root;
        }
    }

    pub fn queued_count(&self) -> usize {
        self.queue.len()
    }

    pub fn downloading_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    /// Ask for `tier` on `region`. Missing loadable tiers up to `tier` are queued,
    /// cheapest first. Does nothing when `tier` or better is resident or on its way.
    pub fn request_quality(&mut self, region: BodyRegion, tier: ModelQuality, priority: f32) {
        if !tier.is_loadable() {
            return;
        }
        let satisfied = ModelQuality::LOADABLE
            .iter()
            .filter(|&&q| q >= tier)
            .any(|&q| self.state(AssetKey::new(region, q)).is_pending_or_ready());
        if satisfied {
            return;
        }

        for quality in ModelQuality::LOADABLE.into_iter().filter(|&q| q <= tier) {
            let key = AssetKey::new(region, quality);
            match self.state(key) {
                LoadState::NotRequested
                | LoadState::Evicted
                | LoadState::Errored { retry_in: None, .. } => {
                    if self.manifest.lookup(key).is_none() {
                        warn!("{}", AssetLoadError::MissingManifestEntry(key));
                        continue;
                    }
                    self.attempts.remove(&key);
                    self.enqueue(key, priority);
                }
                LoadState::Queued => {
                    let current = self.queue.priority_of(key).unwrap_or(f32::MIN);
                    if priority > current {
                        self.enqueue(key, priority);
                    }
                }
                LoadState::Downloading { .. }
                | LoadState::Ready
                | LoadState::Errored { retry_in: Some(_), .. } => {}
            }
        }
    }

    /// Abandon a queued or downloading load. Returns whether anything was cancelled.
    pub fn cancel(&mut self, region: BodyRegion, tier: ModelQuality) -> bool {
        let key = AssetKey::new(region, tier);
        match self.state(key) {
            LoadState::Queued => {
                self.queue.remove(key);
                self.states.insert(key, LoadState::NotRequested);
                debug!("Cancelled queued load {key}");
                true
            }
            LoadState::Downloading { .. } => match self.in_flight.get(&key) {
                Some(flag) => {
                    flag.store(true, Ordering::Relaxed);
                    debug!("Cancelling download {key}");
                    true
                }
                None => false,
            },
            LoadState::Errored { .. } => {
                self.attempts.remove(&key);
                self.states.insert(key, LoadState::NotRequested);
                true
            }
            _ => false,
        }
    }

    /// Advance the loader by one frame. Render thread only.
    pub fn tick(&mut self, dt: f32, requirements: &FrameRequirements) -> LoaderReport {
        self.frame += 1;
        let mut report = LoaderReport::default();

        for region in requirements.regions() {
            if let Some(instance) = self.slots.get(&region).and_then(|s| s.instance.as_ref()) {
                let url = instance.url().to_string();
                self.cache.touch(&url, self.frame);
            }
        }

        for message in self.pool.drain() {
            self.apply_message(message, &mut report);
        }

        self.advance_retries(dt);
        self.dispatch(requirements, &mut report);
        report
    }

    fn enqueue(&mut self, key: AssetKey, priority: f32) {
        self.queue.push(key, priority);
        self.priorities.insert(key, priority);
        self.states.insert(key, LoadState::Queued);
    }

    fn apply_message(&mut self, message: WorkerMessage, report: &mut LoaderReport) {
        match message {
            WorkerMessage::Progress { key, percent } => {
                if let Some(LoadState::Downloading { progress }) = self.states.get_mut(&key) {
                    *progress = (*progress).max(percent);
                }
            }
            WorkerMessage::Ready { key, url, model } => {
                self.in_flight.remove(&key);
                self.attempts.remove(&key);
                let bytes = self.memory.commit(key, model.byte_size());
                self.cache.insert(url, key, Arc::new(model), self.frame);
                self.states.insert(key, LoadState::Ready);
                report.loaded.push(key);
                info!("Loaded {key} ({bytes} bytes resident)");

                if key.quality > self.active_quality(key.region) {
                    self.swap_to(key.region, key.quality, report);
                }
            }
            WorkerMessage::Failed { key, error } => {
                self.in_flight.remove(&key);
                self.memory.release_reservation(key);
                let attempts = self.attempts.entry(key).or_insert(0);
                *attempts += 1;
                let attempts = *attempts;
                let retry_in = if error.is_retryable() {
                    self.settings.retry.delay_after(attempts)
                } else {
                    None
                };
                match retry_in {
                    Some(delay) => warn!("Load of {key} failed (attempt {attempts}), retrying in {delay:.1}s: {error}"),
                    None => warn!("Load of {key} failed (attempt {attempts}), giving up: {error}"),
                }
                self.states
                    .insert(key, LoadState::Errored { attempts, retry_in });
                report.failed.push(key);
            }
            WorkerMessage::Cancelled { key } => {
                self.in_flight.remove(&key);
                self.memory.release_reservation(key);
                self.states.insert(key, LoadState::NotRequested);
                report.cancelled.push(key);
            }
        }
    }

    fn advance_retries(&mut self, dt: f32) {
        let mut due = Vec::new();
        for (key, state) in &mut self.states {
            if let LoadState::Errored {
                retry_in: Some(remaining),
                ..
            } = state
            {
                *remaining -= dt;
                if *remaining <= 0.0 {
                    due.push(*key);
                }
            }
        }
        due.sort();
        for key in due {
            let priority = self.priorities.get(&key).copied().unwrap_or(0.0);
            self.enqueue(key, priority);
        }
    }

    fn dispatch(&mut self, requirements: &FrameRequirements, report: &mut LoaderReport) {
        let mut deferred = Vec::new();
        while self.in_flight.len() < self.settings.max_concurrent.max(1) {
            let Some((key, priority)) = self.queue.pop() else {
                break;
            };
            let Some(entry) = self.manifest.lookup(key) else {
                warn!("{}", AssetLoadError::MissingManifestEntry(key));
                self.states.insert(
                    key,
                    LoadState::Errored {
                        attempts: 0,
                        retry_in: None,
                    },
                );
                continue;
            };
            let size = entry.size_bytes;
            let url = self.resolver.resolve(&entry.path);

            if self.memory.would_exceed(size) {
                self.make_room(key.region, size, requirements, report);
                if self.memory.would_exceed(size) {
                    debug!("Deferring {key}: {size} bytes do not fit");
                    deferred.push((key, priority));
                    continue;
                }
            }

            let cancelled = Arc::new(AtomicBool::new(false));
            let job = FetchJob {
                key,
                url,
                cancelled: Arc::clone(&cancelled),
            };
            if self.pool.submit(job).is_err() {
                deferred.push((key, priority));
                break;
            }
            self.memory.reserve(key, size);
            self.in_flight.insert(key, cancelled);
            self.states
                .insert(key, LoadState::Downloading { progress: 0 });
            report.dispatched.push(key);
        }

        for (key, priority) in deferred {
            self.queue.push(key, priority);
        }
    }

    /// Evict models of other, unprotected regions until `incoming` bytes fit.
    fn make_room(
        &mut self,
        requesting: BodyRegion,
        incoming: u64,
        requirements: &FrameRequirements,
        report: &mut LoaderReport,
    ) {
        let needed = self.memory.shortfall(incoming);
        let candidates: Vec<EvictionCandidate> = self
            .cache
            .iter()
            .filter(|&(_, key, _)| key.region != requesting && !requirements.protects(key.region))
            .filter(|&(url, key, _)| !self.is_pinned(url, key))
            .filter_map(|(_, key, last_used)| {
                Some(EvictionCandidate {
                    key,
                    bytes: self.memory.resident_usage(key)?,
                    last_used,
                })
            })
            .collect();

        for key in select_evictions(&candidates, needed) {
            self.evict(key, report);
        }
    }

    /// Whether someone outside the loader holds an instance of this model.
    fn is_pinned(&self, url: &str, key: AssetKey) -> bool {
        let held_by_slot = self
            .slots
            .get(&key.region)
            .and_then(|s| s.instance.as_ref())
            .is_some_and(|i| i.url() == url);
        self.cache.outstanding_refs(url) > usize::from(held_by_slot)
    }

    fn evict(&mut self, key: AssetKey, report: &mut LoaderReport) {
        let Some(entry) = self.manifest.lookup(key) else {
            return;
        };
        let url = self.resolver.resolve(&entry.path);
        self.cache.remove(&url);
        self.memory.on_evicted(key);
        self.states.insert(key, LoadState::Evicted);
        report.evicted.push(key);
        info!("Evicted {key}");

        if self.active_quality(key.region) == key.quality {
            let fallback = ModelQuality::LOADABLE
                .into_iter()
                .rev()
                .filter(|&q| q < key.quality)
                .find(|&q| self.state(AssetKey::new(key.region, q)) == LoadState::Ready)
                .unwrap_or(ModelQuality::Preview);
            self.swap_to(key.region, fallback, report);
        }
    }

    /// Install a new instance for `region`, then drop the old one.
    fn swap_to(&mut self, region: BodyRegion, quality: ModelQuality, report: &mut LoaderReport) {
        let url = if quality.is_loadable() {
            self.manifest
                .lookup(AssetKey::new(region, quality))
                .map(|e| self.resolver.resolve(&e.path))
        } else {
            None
        };
        let mut instance = match &url {
            Some(url) => match self.cache.instantiate(url, self.frame) {
                Some(instance) => Some(instance),
                None => return,
            },
            None => None,
        };

        let slot = self.slots.entry(region).or_default();
        let root = slot
            .instance
            .as_ref()
            .map_or(slot.root, |old| old.root);
        if let Some(instance) = &mut instance {
            instance.root = root;
        }
        slot.root = root;
        let from = slot.active;
        let previous = std::mem::replace(&mut slot.instance, instance);
        slot.active = quality;
        drop(previous);

        debug!("Swapped {region} from {from} to {quality}");
        report.swaps.push(SwapEvent {
            region,
            from,
            to: quality,
        });
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;
    use std::time::{Duration, Instant};

    use glam::Vec3;

    use super::*;
    use crate::manifest::{IdentityResolver, ManifestEntry};
    use crate::model::ModelData;
    use crate::model::tests::sphere_model;
    use crate::source::{AssetStream, MemorySource};

    const ESTIMATE: u64 = 10_000;

    struct SphereDecoder;

    impl ModelDecoder for SphereDecoder {
        fn decode(&self, _url: &str, _bytes: &[u8]) -> Result<ModelData, AssetLoadError> {
            Ok(sphere_model())
        }
    }

    /// Serves a large asset slowly so a cancel can land mid-download.
    struct SlowSource;

    struct SlowReader {
        remaining: usize,
    }

    impl Read for SlowReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            std::thread::sleep(Duration::from_millis(5));
            let n = self.remaining.min(buf.len());
            buf[..n].fill(0);
            self.remaining -= n;
            Ok(n)
        }
    }

    impl AssetSource for SlowSource {
        fn open(&self, _url: &str) -> Result<AssetStream, AssetLoadError> {
            let len = 8 * 1024 * 1024;
            Ok(AssetStream {
                reader: Box::new(SlowReader { remaining: len }),
                len: Some(len as u64),
            })
        }
    }

    fn url(region: BodyRegion, quality: ModelQuality) -> String {
        format!("{}_{}.glb", region.name(), quality.name())
    }

    fn manifest() -> AssetManifest {
        let mut entries = Vec::new();
        for region in [
            BodyRegion::Head,
            BodyRegion::Neck,
            BodyRegion::Thorax,
            BodyRegion::Abdomen,
        ] {
            for quality in ModelQuality::LOADABLE {
                entries.push(ManifestEntry {
                    region,
                    quality,
                    path: url(region, quality),
                    size_bytes: ESTIMATE,
                });
            }
        }
        AssetManifest::new(entries)
    }

    fn memory_source() -> MemorySource {
        let mut source = MemorySource::new();
        for entry in manifest().entries {
            source.insert(entry.path, vec![0u8; 16]);
        }
        source
    }

    fn loader_with(source: Arc<dyn AssetSource>, settings: LoaderSettings) -> ProgressiveLoader {
        ProgressiveLoader::new(
            manifest(),
            Box::new(IdentityResolver),
            source,
            Arc::new(SphereDecoder),
            settings,
        )
    }

    fn small_budget(bytes: u64) -> LoaderSettings {
        LoaderSettings {
            memory_budget_bytes: Some(bytes),
            ..LoaderSettings::default()
        }
    }

    /// Tick until `done` holds, collecting every report.
    fn pump(
        loader: &mut ProgressiveLoader,
        requirements: &FrameRequirements,
        done: impl Fn(&ProgressiveLoader) -> bool,
    ) -> LoaderReport {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut all = LoaderReport::default();
        while Instant::now() < deadline {
            let report = loader.tick(0.016, requirements);
            all.swaps.extend(report.swaps);
            all.loaded.extend(report.loaded);
            all.evicted.extend(report.evicted);
            all.failed.extend(report.failed);
            all.cancelled.extend(report.cancelled);
            all.dispatched.extend(report.dispatched);
            if done(loader) {
                return all;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        panic!("loader did not settle in time");
    }

    fn key(region: BodyRegion, quality: ModelQuality) -> AssetKey {
        AssetKey::new(region, quality)
    }

    fn load(loader: &mut ProgressiveLoader, region: BodyRegion, requirements: &FrameRequirements) {
        loader.request_quality(region, ModelQuality::Standard, 1.0);
        pump(loader, requirements, |l| {
            l.state(key(region, ModelQuality::Standard)) == LoadState::Ready
        });
    }

    /// A requested tier loads and replaces the preview, keeping the root transform.
    #[test]
    fn test_load_swaps_from_preview() {
        let mut loader = loader_with(Arc::new(memory_source()), LoaderSettings::default());
        let root = Transform::from_translation(Vec3::new(1.0, 2.0, 3.0));
        loader.set_region_root(BodyRegion::Thorax, root);
        assert!(loader.acquire(BodyRegion::Thorax).is_none());

        loader.request_quality(BodyRegion::Thorax, ModelQuality::Standard, 1.0);
        let report = pump(&mut loader, &FrameRequirements::new(), |l| {
            l.active_quality(BodyRegion::Thorax) == ModelQuality::Standard
        });

        assert_eq!(
            report.swaps,
            vec![SwapEvent {
                region: BodyRegion::Thorax,
                from: ModelQuality::Preview,
                to: ModelQuality::Standard,
            }]
        );
        let instance = loader.acquire(BodyRegion::Thorax).unwrap();
        assert_eq!(instance.root, root);
        assert_eq!(loader.memory().resident_bytes(), ESTIMATE);
    }

    /// Requesting High queues Standard too, and re-requesting is a no-op.
    #[test]
    fn test_request_queues_lower_tiers_once() {
        let mut loader = loader_with(Arc::new(memory_source()), LoaderSettings::default());
        loader.request_quality(BodyRegion::Head, ModelQuality::High, 1.0);
        assert_eq!(loader.state(key(BodyRegion::Head, ModelQuality::Standard)), LoadState::Queued);
        assert_eq!(loader.state(key(BodyRegion::Head, ModelQuality::High)), LoadState::Queued);
        assert_eq!(loader.queued_count(), 2);

        loader.request_quality(BodyRegion::Head, ModelQuality::Standard, 1.0);
        loader.request_quality(BodyRegion::Head, ModelQuality::High, 1.0);
        loader.request_quality(BodyRegion::Head, ModelQuality::Preview, 1.0);
        assert_eq!(loader.queued_count(), 2);

        pump(&mut loader, &FrameRequirements::new(), |l| {
            l.active_quality(BodyRegion::Head) == ModelQuality::High
        });
    }

    /// A load over budget evicts an invisible region's model first.
    #[test]
    fn test_memory_budget_evicts_invisible_region() {
        let mut loader = loader_with(Arc::new(memory_source()), small_budget(2 * ESTIMATE + 5_000));
        let none = FrameRequirements::new();
        load(&mut loader, BodyRegion::Head, &none);
        load(&mut loader, BodyRegion::Neck, &none);
        assert_eq!(loader.memory().resident_bytes(), 2 * ESTIMATE);

        let frame = FrameRequirements::new()
            .with_visible(BodyRegion::Thorax)
            .with_visible(BodyRegion::Neck)
            .with_required(BodyRegion::Neck);
        loader.request_quality(BodyRegion::Thorax, ModelQuality::Standard, 2.0);
        let report = pump(&mut loader, &frame, |l| {
            l.state(key(BodyRegion::Thorax, ModelQuality::Standard)) == LoadState::Ready
        });

        assert_eq!(report.evicted, vec![key(BodyRegion::Head, ModelQuality::Standard)]);
        assert_eq!(loader.state(key(BodyRegion::Head, ModelQuality::Standard)), LoadState::Evicted);
        assert_eq!(loader.active_quality(BodyRegion::Head), ModelQuality::Preview);
        assert_eq!(loader.active_quality(BodyRegion::Neck), ModelQuality::Standard);
        assert!(loader.memory().used() <= loader.memory().limit());
        assert!(report.swaps.contains(&SwapEvent {
            region: BodyRegion::Head,
            from: ModelQuality::Standard,
            to: ModelQuality::Preview,
        }));
    }

    /// When every resident region is protected, the load waits in the queue.
    #[test]
    fn test_protected_regions_are_never_evicted() {
        let mut loader = loader_with(Arc::new(memory_source()), small_budget(2 * ESTIMATE + 5_000));
        let none = FrameRequirements::new();
        load(&mut loader, BodyRegion::Head, &none);
        load(&mut loader, BodyRegion::Neck, &none);

        let frame = FrameRequirements::new()
            .with_visible(BodyRegion::Head)
            .with_required(BodyRegion::Neck);
        loader.request_quality(BodyRegion::Thorax, ModelQuality::Standard, 2.0);
        for _ in 0..20 {
            let report = loader.tick(0.016, &frame);
            assert!(report.evicted.is_empty());
        }
        assert_eq!(loader.state(key(BodyRegion::Thorax, ModelQuality::Standard)), LoadState::Queued);
        assert_eq!(loader.memory().resident_bytes(), 2 * ESTIMATE);
    }

    /// An instance held by a consumer pins its model.
    #[test]
    fn test_held_instance_pins_model() {
        let mut loader = loader_with(Arc::new(memory_source()), small_budget(ESTIMATE + 5_000));
        let none = FrameRequirements::new();
        load(&mut loader, BodyRegion::Head, &none);
        let held = loader.acquire(BodyRegion::Head).unwrap();

        loader.request_quality(BodyRegion::Thorax, ModelQuality::Standard, 1.0);
        for _ in 0..10 {
            loader.tick(0.016, &none);
        }
        assert_eq!(loader.state(key(BodyRegion::Thorax, ModelQuality::Standard)), LoadState::Queued);

        drop(held);
        pump(&mut loader, &none, |l| {
            l.state(key(BodyRegion::Thorax, ModelQuality::Standard)) == LoadState::Ready
        });
        assert_eq!(loader.state(key(BodyRegion::Head, ModelQuality::Standard)), LoadState::Evicted);
    }

    /// Acquired instances are independent of each other.
    #[test]
    fn test_acquired_instances_are_independent() {
        let mut loader = loader_with(Arc::new(memory_source()), LoaderSettings::default());
        load(&mut loader, BodyRegion::Head, &FrameRequirements::new());
        let mut a = loader.acquire(BodyRegion::Head).unwrap();
        let b = loader.acquire(BodyRegion::Head).unwrap();
        a.highlight = Some([1.0, 0.0, 0.0, 1.0]);
        a.node_transforms[0].translation = Vec3::splat(9.0);
        assert!(b.highlight.is_none());
        assert_ne!(b.node_transforms[0].translation, Vec3::splat(9.0));
        assert!(a.shares_geometry_with(&b));
    }

    /// Delays double from the base and stop at the cap and attempt limit.
    #[test]
    fn test_retry_policy_backoff() {
        let policy = RetryPolicy {
            max_attempts: 10,
            ..RetryPolicy::default()
        };
        let delays: Vec<_> = (1..=7).map(|a| policy.delay_after(a).unwrap()).collect();
        assert_eq!(delays, vec![1.0, 2.0, 4.0, 8.0, 16.0, 30.0, 30.0]);
        assert_eq!(policy.delay_after(10), None);
        assert_eq!(RetryPolicy::default().delay_after(5), None);
    }

    /// Transient failures back off and then recover; the preview stays up meanwhile.
    #[test]
    fn test_failure_retries_then_recovers() {
        let source = memory_source();
        source.fail_next(&url(BodyRegion::Head, ModelQuality::Standard), 2);
        let settings = LoaderSettings {
            retry: RetryPolicy {
                base_delay_seconds: 0.02,
                ..RetryPolicy::default()
            },
            ..LoaderSettings::default()
        };
        let mut loader = loader_with(Arc::new(source), settings);
        let head = key(BodyRegion::Head, ModelQuality::Standard);
        loader.request_quality(BodyRegion::Head, ModelQuality::Standard, 1.0);

        let report = pump(&mut loader, &FrameRequirements::new(), |l| {
            matches!(l.state(head), LoadState::Errored { .. })
        });
        assert_eq!(report.failed, vec![head]);
        assert!(matches!(
            loader.state(head),
            LoadState::Errored {
                attempts: 1,
                retry_in: Some(_)
            }
        ));
        assert_eq!(loader.active_quality(BodyRegion::Head), ModelQuality::Preview);
        assert_eq!(loader.memory().used(), 0);

        pump(&mut loader, &FrameRequirements::new(), |l| l.state(head) == LoadState::Ready);
        assert_eq!(loader.active_quality(BodyRegion::Head), ModelQuality::Standard);
    }

    /// After the attempt limit the asset stays errored with no retry scheduled.
    #[test]
    fn test_failure_gives_up() {
        let source = memory_source();
        source.fail_next(&url(BodyRegion::Head, ModelQuality::Standard), 100);
        let settings = LoaderSettings {
            retry: RetryPolicy {
                base_delay_seconds: 0.01,
                max_delay_seconds: 0.01,
                max_attempts: 2,
            },
            ..LoaderSettings::default()
        };
        let mut loader = loader_with(Arc::new(source), settings);
        let head = key(BodyRegion::Head, ModelQuality::Standard);
        loader.request_quality(BodyRegion::Head, ModelQuality::Standard, 1.0);
        pump(&mut loader, &FrameRequirements::new(), |l| {
            l.state(head)
                == LoadState::Errored {
                    attempts: 2,
                    retry_in: None,
                }
        });
        assert_eq!(loader.active_quality(BodyRegion::Head), ModelQuality::Preview);
    }

    #[test]
    fn test_cancel_queued() {
        let mut loader = loader_with(Arc::new(memory_source()), LoaderSettings::default());
        loader.request_quality(BodyRegion::Head, ModelQuality::Standard, 1.0);
        assert!(loader.cancel(BodyRegion::Head, ModelQuality::Standard));
        assert_eq!(
            loader.state(key(BodyRegion::Head, ModelQuality::Standard)),
            LoadState::NotRequested
        );
        assert_eq!(loader.queued_count(), 0);
        assert!(!loader.cancel(BodyRegion::Head, ModelQuality::Standard));
    }

    /// A download cancelled mid-read returns to NotRequested and caches nothing.
    #[test]
    fn test_cancel_during_download() {
        let mut loader = loader_with(Arc::new(SlowSource), LoaderSettings::default());
        let head = key(BodyRegion::Head, ModelQuality::Standard);
        loader.request_quality(BodyRegion::Head, ModelQuality::Standard, 1.0);
        let report = loader.tick(0.016, &FrameRequirements::new());
        assert_eq!(report.dispatched, vec![head]);
        assert!(matches!(loader.state(head), LoadState::Downloading { .. }));

        assert!(loader.cancel(BodyRegion::Head, ModelQuality::Standard));
        let report = pump(&mut loader, &FrameRequirements::new(), |l| {
            l.state(head) == LoadState::NotRequested
        });
        assert_eq!(report.cancelled, vec![head]);
        assert_eq!(loader.cached_count(), 0);
        assert_eq!(loader.memory().used(), 0);
        assert_eq!(loader.active_quality(BodyRegion::Head), ModelQuality::Preview);
    }

    #[test]
    fn test_missing_manifest_entry_is_ignored() {
        let mut loader = loader_with(Arc::new(memory_source()), LoaderSettings::default());
        assert!(!loader.has_entry(BodyRegion::LeftLeg, ModelQuality::Standard));
        assert!(loader.has_entry(BodyRegion::Head, ModelQuality::High));
        loader.request_quality(BodyRegion::LeftLeg, ModelQuality::Standard, 1.0);
        assert_eq!(loader.queued_count(), 0);
        assert_eq!(
            loader.state(key(BodyRegion::LeftLeg, ModelQuality::Standard)),
            LoadState::NotRequested
        );
    }
}
