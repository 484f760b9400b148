//! GPU vertex format for terrain patches.

use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert_eq;

/// One terrain patch vertex.
///
/// `position` is relative to the owning patch's world centre, never
/// planet-centred, so single precision stays accurate at planetary scale.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct PatchVertex {
    /// Offset from the patch world centre, in metres.
    pub position: [f32; 3],
    /// Unit outward surface normal.
    pub normal: [f32; 3],
    /// Sampled elevation above the reference radius, in metres.
    pub height: f32,
}

const_assert_eq!(std::mem::size_of::<PatchVertex>(), 28);

impl PatchVertex {
    pub fn new(position: [f32; 3], normal: [f32; 3], height: f32) -> Self {
        Self {
            position,
            normal,
            height,
        }
    }
}
