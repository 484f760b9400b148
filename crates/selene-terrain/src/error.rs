//! Heightmap error types.

use std::path::PathBuf;

/// Errors that can occur when building or loading a heightmap.
#[derive(Debug, thiserror::Error)]
pub enum HeightmapError {
    /// The file could not be opened or decoded.
    #[error("failed to decode heightmap {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Width or height is zero.
    #[error("heightmap has empty dimensions {width}x{height}")]
    EmptyDimensions { width: u32, height: u32 },

    /// The sample count does not match `width * height`.
    #[error("heightmap expected {expected} samples, got {actual}")]
    SampleCountMismatch { expected: usize, actual: usize },
}
