//! Asset loading errors.

use thiserror::Error;

use crate::quality::AssetKey;

/// Failure on the asynchronous load path. Always recoverable: the region keeps
/// showing its placeholder.
#[derive(Debug, Error)]
pub enum AssetLoadError {
    #[error("failed to read `{url}`: {source}")]
    Io {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("asset `{0}` not found")]
    NotFound(String),

    #[error("failed to decode `{url}`: {reason}")]
    Decode { url: String, reason: String },

    #[error("no manifest entry for {0}")]
    MissingManifestEntry(AssetKey),

    #[error("failed to parse asset manifest: {0}")]
    Manifest(#[from] ron::error::SpannedError),
}

impl AssetLoadError {
    /// Whether retrying can help.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            AssetLoadError::MissingManifestEntry(_) | AssetLoadError::Manifest(_)
        )
    }
}
