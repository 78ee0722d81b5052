//! Error types for naksha-map

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// naksha-map error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML sidecar parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Raster image decoding/encoding error
    #[error("Image error: {0}")]
    Image(String),

    /// Malformed map document or stream
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Map document version not supported
    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// Supported format version
        expected: u8,
        /// Version found in the document
        found: u8,
    },

    /// Rejected configuration value (resolution, name, size, thresholds)
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Raster dimensions do not match the map
    #[error("Dimension mismatch: expected {expected:?}, found {found:?}")]
    DimensionMismatch {
        /// Dimensions the map currently has
        expected: (usize, usize),
        /// Dimensions that were supplied
        found: (usize, usize),
    },

    /// Combined load sources disagree on a shared field
    #[error("Metadata conflict: {0}")]
    MetadataConflict(String),
}
