//! Device-side plumbing for terrain patches: the graphics device seam, staged
//! uploads, fence-gated destruction, frustum culling, and per-draw parameters.

pub mod deferred;
pub mod device;
pub mod draw;
pub mod error;
pub mod frustum;
pub mod gpu_mesh;
pub mod headless;
pub mod push_constants;
pub mod staging;
pub mod terrain_pipeline;
pub mod upload;
pub mod wgpu_device;

pub use deferred::DeferredDestroyQueue;
pub use device::{BufferUsage, FenceValue, GpuDevice};
pub use draw::{DrawRecorder, RecordedDraw, RecordingDrawRecorder, WgpuDrawList};
pub use error::{DeviceError, StagingError, UploadError};
pub use frustum::Frustum;
pub use gpu_mesh::GpuPatchMesh;
pub use headless::{HeadlessBuffer, HeadlessCommands, HeadlessDevice, HeadlessStaging, Violation};
pub use push_constants::PatchPushConstants;
pub use staging::StagingArena;
pub use terrain_pipeline::{TERRAIN_SHADER_SOURCE, TerrainPipeline};
pub use upload::{UploadBatcher, UploadStats};
pub use wgpu_device::{RenderContextError, WgpuDevice, init_headless_device_blocking};
