//! [`GpuDevice`] backed by a real wgpu device and queue.
//!
//! Fence values map onto queue submissions. Completion is observed through
//! `Queue::on_submitted_work_done` callbacks and non-blocking polls, and
//! [`GpuDevice::wait`] blocks on the submission index.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::staging::align_up;
use crate::{BufferUsage, DeviceError, FenceValue, GpuDevice};

/// Error type for headless device initialization.
#[derive(Debug, thiserror::Error)]
pub enum RenderContextError {
    /// No compatible GPU adapter found.
    #[error("no compatible GPU adapter found")]
    NoAdapter,

    /// Failed to request GPU device.
    #[error("failed to request GPU device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),
}

#[derive(Debug)]
struct InFlight {
    fence: FenceValue,
    index: wgpu::SubmissionIndex,
    done: Arc<AtomicBool>,
}

/// A wgpu device and queue with fence bookkeeping.
#[derive(Debug)]
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    in_flight: VecDeque<InFlight>,
    last_submitted: u64,
    completed: u64,
}

impl WgpuDevice {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            in_flight: VecDeque::new(),
            last_submitted: 0,
            completed: 0,
        }
    }

    /// Create a device without a surface, for offscreen rendering.
    pub async fn new_headless() -> Result<Self, RenderContextError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|_| RenderContextError::NoAdapter)?;

        let info = adapter.get_info();
        tracing::info!(
            "Selected GPU: {} ({:?}, {:?})",
            info.name,
            info.backend,
            info.device_type
        );

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("selene-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                experimental_features: wgpu::ExperimentalFeatures::default(),
                trace: wgpu::Trace::Off,
            })
            .await?;

        Ok(Self::new(device, queue))
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn last_submitted(&self) -> FenceValue {
        FenceValue(self.last_submitted)
    }

    fn submit_encoder(&mut self, encoder: wgpu::CommandEncoder) -> FenceValue {
        let index = self.queue.submit([encoder.finish()]);
        let done = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&done);
        self.queue.on_submitted_work_done(move || {
            flag.store(true, Ordering::Release);
        });

        self.last_submitted += 1;
        let fence = FenceValue(self.last_submitted);
        self.in_flight.push_back(InFlight { fence, index, done });
        fence
    }

    /// Pop submissions whose completion callbacks have fired.
    fn retire_signalled(&mut self) {
        while let Some(front) = self.in_flight.front() {
            if !front.done.load(Ordering::Acquire) {
                break;
            }
            self.completed = front.fence.0;
            self.in_flight.pop_front();
        }
    }

    fn retire_through(&mut self, fence: FenceValue) {
        while self.in_flight.front().is_some_and(|s| s.fence <= fence) {
            self.in_flight.pop_front();
        }
        self.completed = self.completed.max(fence.0);
    }
}

impl GpuDevice for WgpuDevice {
    type Buffer = wgpu::Buffer;
    type StagingBuffer = wgpu::Buffer;
    type CommandBuffer = wgpu::CommandEncoder;

    fn create_device_local_buffer(
        &mut self,
        label: &str,
        size: u64,
        usage: BufferUsage,
    ) -> Result<wgpu::Buffer, DeviceError> {
        let size = align_up(size.max(wgpu::COPY_BUFFER_ALIGNMENT), wgpu::COPY_BUFFER_ALIGNMENT);
        let max = self.device.limits().max_buffer_size;
        if size > max {
            tracing::error!("Buffer '{label}' of {size} bytes exceeds device limit {max}");
            return Err(DeviceError::Allocation {
                label: label.to_string(),
                size,
                reason: format!("exceeds max_buffer_size {max}"),
            });
        }
        let usage = match usage {
            BufferUsage::Vertex => wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            BufferUsage::Index => wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST,
        };
        Ok(self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage,
            mapped_at_creation: false,
        }))
    }

    fn create_host_visible_buffer(
        &mut self,
        label: &str,
        size: u64,
    ) -> Result<wgpu::Buffer, DeviceError> {
        let size = align_up(size.max(wgpu::MAP_ALIGNMENT), wgpu::MAP_ALIGNMENT);
        let max = self.device.limits().max_buffer_size;
        if size > max {
            tracing::error!("Staging buffer '{label}' of {size} bytes exceeds device limit {max}");
            return Err(DeviceError::Allocation {
                label: label.to_string(),
                size,
                reason: format!("exceeds max_buffer_size {max}"),
            });
        }
        Ok(self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::MAP_WRITE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: true,
        }))
    }

    fn write_staging(
        &mut self,
        staging: &mut wgpu::Buffer,
        offset: u64,
        bytes: &[u8],
    ) -> Result<(), DeviceError> {
        let len = bytes.len() as u64;
        if offset + len > staging.size() {
            return Err(DeviceError::WriteOutOfBounds {
                offset,
                len,
                size: staging.size(),
            });
        }
        if offset % wgpu::MAP_ALIGNMENT != 0 || len % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
            return Err(DeviceError::Misaligned { offset, len });
        }
        if len == 0 {
            return Ok(());
        }
        staging
            .slice(offset..offset + len)
            .get_mapped_range_mut()
            .copy_from_slice(bytes);
        Ok(())
    }

    fn unmap_staging(&mut self, staging: &mut wgpu::Buffer) {
        staging.unmap();
    }

    fn begin_commands(&mut self, label: &str) -> wgpu::CommandEncoder {
        self.device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) })
    }

    fn record_copy(
        &mut self,
        commands: &mut wgpu::CommandEncoder,
        src: &wgpu::Buffer,
        src_offset: u64,
        dst: &wgpu::Buffer,
        size: u64,
    ) {
        commands.copy_buffer_to_buffer(src, src_offset, dst, 0, size);
    }

    /// wgpu inserts transfer-to-vertex barriers itself; nothing to record.
    fn record_transfer_barrier(&mut self, _commands: &mut wgpu::CommandEncoder) {}

    fn submit(&mut self, commands: wgpu::CommandEncoder) -> FenceValue {
        self.submit_encoder(commands)
    }

    fn submit_marker(&mut self) -> FenceValue {
        let encoder = self.begin_commands("fence-marker");
        self.submit_encoder(encoder)
    }

    fn is_complete(&mut self, fence: FenceValue) -> bool {
        if fence.0 <= self.completed {
            return true;
        }
        if let Err(e) = self.device.poll(wgpu::PollType::Poll) {
            tracing::warn!("Device poll failed: {e}");
        }
        self.retire_signalled();
        fence.0 <= self.completed
    }

    fn wait(&mut self, fence: FenceValue) -> Result<(), DeviceError> {
        if fence.0 <= self.completed {
            return Ok(());
        }
        let index = self
            .in_flight
            .iter()
            .find(|s| s.fence == fence)
            .map(|s| s.index.clone());
        let Some(index) = index else {
            // Unknown fences are either retired already or never submitted.
            self.completed = self.completed.max(fence.0.min(self.last_submitted));
            return Ok(());
        };
        self.device
            .poll(wgpu::PollType::Wait {
                submission_index: Some(index),
                timeout: None,
            })
            .map_err(|e| {
                tracing::error!("Waiting on {fence} failed: {e}");
                DeviceError::Lost {
                    fence: fence.0,
                    reason: e.to_string(),
                }
            })?;
        self.retire_through(fence);
        Ok(())
    }

    fn destroy_buffer(&mut self, buffer: wgpu::Buffer) {
        buffer.destroy();
    }

    fn destroy_staging(&mut self, staging: wgpu::Buffer) {
        staging.destroy();
    }
}

/// Create a headless wgpu device synchronously using `pollster`.
pub fn init_headless_device_blocking() -> Result<WgpuDevice, RenderContextError> {
    pollster::block_on(WgpuDevice::new_headless())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UploadBatcher;
    use selene_cubesphere::{CubeFace, CubeFaceRegion};
    use selene_mesh::PatchMeshBuilder;
    use selene_terrain::FlatHeightfield;

    fn test_device() -> Option<WgpuDevice> {
        init_headless_device_blocking().ok()
    }

    #[test]
    fn test_marker_fences_complete_after_wait() {
        let Some(mut device) = test_device() else {
            return;
        };
        let a = device.submit_marker();
        let b = device.submit_marker();
        assert!(a < b);
        device.wait(b).unwrap();
        assert!(device.is_complete(a));
        assert!(device.is_complete(b));
    }

    #[test]
    fn test_batched_upload_round_trip() {
        let Some(mut device) = test_device() else {
            return;
        };
        let data = PatchMeshBuilder::new(1000.0, 9)
            .unwrap()
            .build(&CubeFaceRegion::root(CubeFace::PosX), &FlatHeightfield);

        let mut batcher = UploadBatcher::new(4, 1 << 20);
        let mesh = batcher.upload(&mut device, "patch", &data).unwrap();
        let fence = batcher.flush(&mut device).unwrap().unwrap();
        device.wait(fence).unwrap();

        assert!(device.is_complete(fence));
        assert_eq!(batcher.reclaim_staging(&mut device), 1);
        assert!(mesh.vertex_buffer.size() >= data.vertex_bytes().len() as u64);
        device.destroy_buffer(mesh.vertex_buffer);
        device.destroy_buffer(mesh.index_buffer);
    }

    #[test]
    fn test_misaligned_staging_write_is_rejected() {
        let Some(mut device) = test_device() else {
            return;
        };
        let mut staging = device.create_host_visible_buffer("staging", 64).unwrap();
        let err = device.write_staging(&mut staging, 4, &[0; 4]).unwrap_err();
        assert_eq!(err, DeviceError::Misaligned { offset: 4, len: 4 });
        device.unmap_staging(&mut staging);
        device.destroy_staging(staging);
    }
}
