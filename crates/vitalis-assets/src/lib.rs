//! Progressive loading of body region models.
//!
//! Regions render procedural previews until a [`ProgressiveLoader`] has fetched and
//! decoded a better tier on its worker threads. Decoded models live in a URL-keyed cache
//! under a [`MemoryBudget`]; consumers get independent [`ModelInstance`]s that share the
//! cached geometry.

mod cache;
mod decoder;
mod error;
mod loader;
mod manifest;
mod memory;
mod model;
mod quality;
mod queue;
mod source;
mod worker;

pub use cache::ModelCache;
pub use decoder::{GltfDecoder, ModelDecoder};
pub use error::AssetLoadError;
pub use loader::{
    FrameRequirements, LoadState, LoaderReport, LoaderSettings, ProgressiveLoader, RetryPolicy,
    SwapEvent,
};
pub use manifest::{AssetManifest, DirectoryResolver, IdentityResolver, ManifestEntry, PathResolver};
pub use memory::{EvictionCandidate, MemoryBudget, select_evictions};
pub use model::{ModelData, ModelInstance, ModelNode};
pub use quality::{AssetKey, MemoryTier, ModelQuality};
pub use queue::LoadQueue;
pub use source::{AssetSource, AssetStream, FileSource, MemorySource};
pub use worker::{FetchJob, FetchWorkerPool, READ_CHUNK_BYTES, WorkerMessage};
