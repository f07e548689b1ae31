//! Byte sources the fetch workers read from.

use std::io::Read;
use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap;

use crate::error::AssetLoadError;

/// An opened asset: a reader plus its length when known.
pub struct AssetStream {
    pub reader: Box<dyn Read + Send>,
    pub len: Option<u64>,
}

/// Something that can open a resolved URL for reading. Shared by all workers.
pub trait AssetSource: Send + Sync {
    fn open(&self, url: &str) -> Result<AssetStream, AssetLoadError>;
}

/// Reads assets from the local filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileSource;

impl AssetSource for FileSource {
    fn open(&self, url: &str) -> Result<AssetStream, AssetLoadError> {
        let file = std::fs::File::open(url).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                AssetLoadError::NotFound(url.to_string())
            } else {
                AssetLoadError::Io {
                    url: url.to_string(),
                    source,
                }
            }
        })?;
        let len = file.metadata().ok().map(|m| m.len());
        Ok(AssetStream {
            reader: Box::new(file),
            len,
        })
    }
}

/// In-memory assets, with optional injected failures.
#[derive(Default)]
pub struct MemorySource {
    assets: FxHashMap<String, Arc<[u8]>>,
    failures: Mutex<FxHashMap<String, u32>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: impl Into<String>, bytes: impl Into<Arc<[u8]>>) {
        self.assets.insert(url.into(), bytes.into());
    }

    /// Make the next `times` opens of `url` fail with an I/O error.
    pub fn fail_next(&self, url: &str, times: u32) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert(url.to_string(), times);
        }
    }
}

impl AssetSource for MemorySource {
    fn open(&self, url: &str) -> Result<AssetStream, AssetLoadError> {
        if let Ok(mut failures) = self.failures.lock()
            && let Some(remaining) = failures.get_mut(url)
            && *remaining > 0
        {
            *remaining -= 1;
            return Err(AssetLoadError::Io {
                url: url.to_string(),
                source: std::io::Error::other("injected failure"),
            });
        }
        let bytes = self
            .assets
            .get(url)
            .ok_or_else(|| AssetLoadError::NotFound(url.to_string()))?;
        Ok(AssetStream {
            len: Some(bytes.len() as u64),
            reader: Box::new(SharedBytes {
                bytes: Arc::clone(bytes),
                pos: 0,
            }),
        })
    }
}

struct SharedBytes {
    bytes: Arc<[u8]>,
    pos: usize,
}

impl Read for SharedBytes {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let remaining = &self.bytes[self.pos..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        Ok(n)
    }
}
