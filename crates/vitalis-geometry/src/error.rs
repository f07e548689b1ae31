//! Errors raised while loading authored structure data.

/// Malformed structure authoring data. Raised once at registry load time; never at
/// runtime.
#[derive(Debug, thiserror::Error)]
pub enum GeometryDescriptorError {
    /// A dimension is zero, negative, or not finite.
    #[error("structure `{name}`: `{field}` must be positive and finite, got {value}")]
    InvalidDimension {
        name: String,
        field: &'static str,
        value: f32,
    },

    /// A model-backed structure lists no authored variants.
    #[error("structure `{name}`: model has no authored LOD variants")]
    EmptyModel { name: String },

    /// More authored variants than there are detail levels.
    #[error("structure `{name}`: at most {max} authored variants are supported, got {got}")]
    TooManyVariants {
        name: String,
        max: usize,
        got: usize,
    },

    /// Authored triangle counts are not strictly decreasing or contain zero.
    #[error(
        "structure `{name}`: authored triangle counts must be non-zero and strictly decreasing, got {counts:?}"
    )]
    InvalidTriangleCounts { name: String, counts: Vec<u32> },

    /// Priority weight is negative or not finite.
    #[error("structure `{name}`: priority must be non-negative and finite, got {value}")]
    InvalidPriority { name: String, value: f32 },

    /// Two structures share a name.
    #[error("duplicate structure name `{0}`")]
    DuplicateName(String),

    /// The registry file could not be parsed.
    #[error("failed to parse structure registry: {0}")]
    Parse(#[source] ron::error::SpannedError),
}
