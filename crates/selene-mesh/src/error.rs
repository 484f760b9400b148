//! Mesh builder error types.

use selene_cubesphere::RegionError;

/// Rejected inputs to [`PatchMeshBuilder`](crate::PatchMeshBuilder).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MeshBuildError {
    /// Fewer than two vertices per edge cannot form a quad.
    #[error("grid resolution must be at least 2 vertices per edge, got {resolution}")]
    ResolutionTooLow { resolution: u32 },

    /// The resolution would overflow 32-bit indices.
    #[error("grid resolution {resolution} exceeds the 32-bit index range")]
    ResolutionTooHigh { resolution: u32 },

    /// Radius is zero, negative, or not finite.
    #[error("body radius must be positive and finite, got {radius}")]
    InvalidRadius { radius: f64 },

    /// Face index outside `0..6`.
    #[error("cube face index {index} is out of range 0..6")]
    InvalidFace { index: u8 },

    /// Degenerate or out-of-face UV rectangle.
    #[error(transparent)]
    Region(#[from] RegionError),
}
