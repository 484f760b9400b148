//! LOD engine error types.

use selene_mesh::MeshBuildError;
use selene_render::{DeviceError, UploadError};

/// Failures surfaced by [`LodForest`](crate::LodForest).
///
/// Running out of split budget is not among them: unsplit candidates simply
/// wait for a later frame.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LodError {
    #[error("invalid LOD parameters: {0}")]
    InvalidParams(String),

    #[error("mesh build failed: {0}")]
    MeshBuild(#[from] MeshBuildError),

    #[error("mesh upload failed: {0}")]
    Upload(#[from] UploadError),

    #[error("device failure: {0}")]
    Device(#[from] DeviceError),
}
