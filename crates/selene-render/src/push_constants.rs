//! Per-draw parameters consumed by the terrain shader.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use static_assertions::const_assert_eq;

/// Fixed 112-byte per-draw payload.
///
/// | Offset | Field              |
/// |--------|--------------------|
/// | 0      | view-projection    |
/// | 64     | camera offset, pad |
/// | 80     | light direction    |
/// | 96     | camera pos, pad    |
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PatchPushConstants {
    /// Column-major view-projection for camera-relative positions.
    pub view_proj: [[f32; 4]; 4],
    /// Patch world centre minus camera position.
    pub camera_offset: [f32; 3],
    pub _pad0: f32,
    /// Direction towards the light, `w` unused.
    pub light_direction: [f32; 4],
    /// Camera position in planet space, for lighting only.
    pub camera_position: [f32; 3],
    pub _pad1: f32,
}

const_assert_eq!(std::mem::size_of::<PatchPushConstants>(), 112);

impl PatchPushConstants {
    pub fn new(view_proj: Mat4, camera_offset: Vec3, light_direction: Vec3, camera_position: Vec3) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            camera_offset: camera_offset.to_array(),
            _pad0: 0.0,
            light_direction: light_direction.extend(0.0).to_array(),
            camera_position: camera_position.to_array(),
            _pad1: 0.0,
        }
    }

    pub fn camera_offset(&self) -> Vec3 {
        Vec3::from_array(self.camera_offset)
    }
}
