//! Asset manifest and path resolution.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use vitalis_geometry::BodyRegion;

use crate::error::AssetLoadError;
use crate::quality::{AssetKey, ModelQuality};

/// Where one region model lives and roughly how large it is once resident.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub region: BodyRegion,
    pub quality: ModelQuality,
    /// Path understood by the [`PathResolver`].
    pub path: String,
    /// Estimated resident size, used for memory checks before loading.
    pub size_bytes: u64,
}

impl ManifestEntry {
    pub fn key(&self) -> AssetKey {
        AssetKey::new(self.region, self.quality)
    }
}

/// Maps `(region, quality)` to loadable model files.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetManifest {
    pub entries: Vec<ManifestEntry>,
}

impl AssetManifest {
    pub fn new(entries: Vec<ManifestEntry>) -> Self {
        Self { entries }
    }

    pub fn from_ron_str(source: &str) -> Result<Self, AssetLoadError> {
        Ok(ron::from_str(source)?)
    }

    pub fn load(path: &Path) -> Result<Self, AssetLoadError> {
        let contents = std::fs::read_to_string(path).map_err(|source| AssetLoadError::Io {
            url: path.display().to_string(),
            source,
        })?;
        Self::from_ron_str(&contents)
    }

    pub fn lookup(&self, key: AssetKey) -> Option<&ManifestEntry> {
        self.entries
            .iter()
            .find(|e| e.region == key.region && e.quality == key.quality)
    }
}

/// Turns manifest paths into URLs an [`AssetSource`](crate::AssetSource) can open.
/// Platform packaging rules live behind this trait.
pub trait PathResolver: Send + Sync {
    fn resolve(&self, path: &str) -> String;
}

/// Resolves paths relative to a directory.
#[derive(Clone, Debug)]
pub struct DirectoryResolver {
    root: PathBuf,
}

impl DirectoryResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl PathResolver for DirectoryResolver {
    fn resolve(&self, path: &str) -> String {
        self.root.join(path).display().to_string()
    }
}

/// Uses manifest paths unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityResolver;

impl PathResolver for IdentityResolver {
    fn resolve(&self, path: &str) -> String {
        path.to_string()
    }
}
