//! Camera-adaptive level of detail for a cube-sphere body: six patch quadtrees
//! refined by screen-space error under a shared per-frame split budget, with
//! fence-gated teardown of replaced meshes.

mod camera;
mod error;
mod forest;
mod metric;
mod params;
mod patch;
mod walker;

pub use camera::CameraState;
pub use error::LodError;
pub use forest::{ForestStats, FrameStats, LodForest};
pub use metric::{geometric_error, screen_space_error};
pub use params::{LodParams, MAX_DEPTH_LIMIT};
pub use patch::{Patch, PatchArena, PatchId, bounding_radius};
pub use walker::{DrawWalker, WalkStats};
