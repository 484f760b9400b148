//! The graphics device seam.
//!
//! The LOD engine never talks to a graphics API directly. It creates buffers,
//! records copies, and submits work through [`GpuDevice`], and it gates every
//! destruction on a [`FenceValue`] the device reports complete.

use std::fmt;

use crate::DeviceError;

/// Monotonic identifier of one submission. Later submissions compare greater.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FenceValue(pub u64);

impl fmt::Display for FenceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fence#{}", self.0)
    }
}

/// What a device-local buffer will be bound as.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    Vertex,
    Index,
}

/// The operations the LOD engine needs from a graphics device.
///
/// Buffers are owned values: destroying one consumes it, so a buffer cannot be
/// destroyed twice or used after destruction.
pub trait GpuDevice {
    /// Device-local buffer, used as a copy destination and then for drawing.
    type Buffer;
    /// Host-visible buffer, mapped for writing when created.
    type StagingBuffer;
    /// A command buffer being recorded.
    type CommandBuffer;

    fn create_device_local_buffer(
        &mut self,
        label: &str,
        size: u64,
        usage: BufferUsage,
    ) -> Result<Self::Buffer, DeviceError>;

    /// Create a host-visible buffer that starts out mapped for writing.
    fn create_host_visible_buffer(
        &mut self,
        label: &str,
        size: u64,
    ) -> Result<Self::StagingBuffer, DeviceError>;

    /// Copy `bytes` into a mapped staging buffer at `offset`.
    fn write_staging(
        &mut self,
        staging: &mut Self::StagingBuffer,
        offset: u64,
        bytes: &[u8],
    ) -> Result<(), DeviceError>;

    /// Make the staging buffer's host writes visible to the device.
    fn unmap_staging(&mut self, staging: &mut Self::StagingBuffer);

    fn begin_commands(&mut self, label: &str) -> Self::CommandBuffer;

    fn record_copy(
        &mut self,
        commands: &mut Self::CommandBuffer,
        src: &Self::StagingBuffer,
        src_offset: u64,
        dst: &Self::Buffer,
        size: u64,
    );

    /// Order preceding transfer writes before later vertex and index reads.
    fn record_transfer_barrier(&mut self, commands: &mut Self::CommandBuffer);

    /// Submit recorded work and return the fence that signals its completion.
    fn submit(&mut self, commands: Self::CommandBuffer) -> FenceValue;

    /// Submit an empty command buffer, yielding a fence that completes after
    /// everything submitted before it.
    fn submit_marker(&mut self) -> FenceValue;

    /// Non-blocking completion query.
    fn is_complete(&mut self, fence: FenceValue) -> bool;

    /// Block until `fence` has completed.
    fn wait(&mut self, fence: FenceValue) -> Result<(), DeviceError>;

    fn destroy_buffer(&mut self, buffer: Self::Buffer);

    fn destroy_staging(&mut self, staging: Self::StagingBuffer);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fence_values_order_by_submission() {
        assert!(FenceValue(3) > FenceValue(2));
        assert_eq!(FenceValue(7).max(FenceValue(4)), FenceValue(7));
        assert_eq!(FenceValue(12).to_string(), "fence#12");
    }
}
