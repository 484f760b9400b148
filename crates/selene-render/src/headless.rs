//! An in-memory [`GpuDevice`] that models asynchronous execution.
//!
//! Submitted work does not run until the caller retires it with
//! [`HeadlessDevice::complete_through`] or [`HeadlessDevice::complete_all`]
//! (or immediately, with auto-complete on). Copies execute at retirement, so a
//! buffer read before its transfer retired sees stale bytes. Every misuse the
//! fence discipline exists to prevent is recorded as a [`Violation`] instead of
//! being silently tolerated.

use std::collections::{HashMap, VecDeque};

use crate::{BufferUsage, DeviceError, FenceValue, GpuDevice};

/// A soundness violation observed by the headless device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Violation {
    /// A buffer was destroyed while an unretired submission still references it.
    DestroyedInFlight { label: String, fence: FenceValue },
    /// A device buffer was read before the transfer writing it retired.
    ReadBeforeTransfer { label: String },
    /// A submission recorded copies without a trailing transfer barrier.
    MissingBarrier { fence: FenceValue },
    /// A submission copies out of a staging buffer that is still mapped.
    SubmittedWhileMapped { label: String, fence: FenceValue },
    /// Host write into a staging buffer that is no longer mapped.
    WriteUnmapped { label: String },
    /// A copy range exceeds its source or destination.
    CopyOutOfBounds { label: String },
}

/// Handle to a device-local buffer.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct HeadlessBuffer {
    id: u64,
    size: u64,
}

impl HeadlessBuffer {
    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Handle to a host-visible staging buffer.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct HeadlessStaging {
    id: u64,
    size: u64,
}

#[derive(Clone, Copy, Debug)]
enum Op {
    Copy {
        src: u64,
        src_offset: u64,
        dst: u64,
        size: u64,
    },
    Barrier,
}

/// Commands recorded for one submission.
#[derive(Debug)]
pub struct HeadlessCommands {
    label: String,
    ops: Vec<Op>,
}

impl HeadlessCommands {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Number of copies recorded so far.
    pub fn copy_count(&self) -> usize {
        self.ops.iter().filter(|op| matches!(op, Op::Copy { .. })).count()
    }
}

#[derive(Debug)]
struct DeviceBuffer {
    label: String,
    usage: BufferUsage,
    data: Vec<u8>,
    /// Submitted-but-unretired transfers targeting this buffer, or unsubmitted copies.
    awaiting_transfer: bool,
}

#[derive(Debug)]
struct StagingState {
    label: String,
    data: Vec<u8>,
    mapped: bool,
}

#[derive(Debug)]
struct Submission {
    fence: FenceValue,
    label: String,
    ops: Vec<Op>,
}

/// Host-memory graphics device for tests and headless runs.
#[derive(Debug, Default)]
pub struct HeadlessDevice {
    next_id: u64,
    buffers: HashMap<u64, DeviceBuffer>,
    staging: HashMap<u64, StagingState>,
    in_flight: VecDeque<Submission>,
    last_submitted: u64,
    completed: u64,
    auto_complete: bool,
    allocation_limit: Option<usize>,
    allocations: usize,
    peak_live_buffers: usize,
    violations: Vec<Violation>,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retire every submission as soon as it is made, like a synchronous device.
    pub fn with_auto_complete(mut self) -> Self {
        self.auto_complete = true;
        self
    }

    /// Fail every buffer creation after `count` successful ones.
    pub fn with_allocation_limit(mut self, count: usize) -> Self {
        self.allocation_limit = Some(count);
        self
    }

    pub fn set_auto_complete(&mut self, enabled: bool) {
        self.auto_complete = enabled;
    }

    /// Retire submissions up to and including `fence`, executing their copies in order.
    pub fn complete_through(&mut self, fence: FenceValue) {
        while let Some(front) = self.in_flight.front() {
            if front.fence > fence {
                break;
            }
            if let Some(submission) = self.in_flight.pop_front() {
                self.execute(submission);
            }
        }
        self.completed = self.completed.max(fence.0.min(self.last_submitted));
    }

    /// Retire everything submitted so far.
    pub fn complete_all(&mut self) {
        self.complete_through(FenceValue(self.last_submitted));
    }

    pub fn completed_fence(&self) -> FenceValue {
        FenceValue(self.completed)
    }

    pub fn last_submitted(&self) -> FenceValue {
        FenceValue(self.last_submitted)
    }

    pub fn pending_submissions(&self) -> usize {
        self.in_flight.len()
    }

    /// Device-local plus staging buffers currently alive.
    pub fn live_buffer_count(&self) -> usize {
        self.buffers.len() + self.staging.len()
    }

    pub fn live_staging_count(&self) -> usize {
        self.staging.len()
    }

    pub fn peak_live_buffers(&self) -> usize {
        self.peak_live_buffers
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Device-visible contents of a buffer.
    ///
    /// Reading before the transfer that fills it has retired is recorded as a
    /// [`Violation::ReadBeforeTransfer`].
    pub fn read_buffer(&mut self, buffer: &HeadlessBuffer) -> Option<&[u8]> {
        let state = self.buffers.get(&buffer.id)?;
        if state.awaiting_transfer {
            self.violations.push(Violation::ReadBeforeTransfer {
                label: state.label.clone(),
            });
        }
        self.buffers.get(&buffer.id).map(|s| s.data.as_slice())
    }

    pub fn buffer_usage(&self, buffer: &HeadlessBuffer) -> Option<BufferUsage> {
        self.buffers.get(&buffer.id).map(|s| s.usage)
    }

    pub fn is_staging_mapped(&self, staging: &HeadlessStaging) -> bool {
        self.staging.get(&staging.id).is_some_and(|s| s.mapped)
    }

    pub fn staging_contents(&self, staging: &HeadlessStaging) -> &[u8] {
        self.staging
            .get(&staging.id)
            .map(|s| s.data.as_slice())
            .unwrap_or(&[])
    }

    fn allocate_id(&mut self, label: &str, size: u64) -> Result<u64, DeviceError> {
        if self.allocation_limit.is_some_and(|limit| self.allocations >= limit) {
            return Err(DeviceError::Allocation {
                label: label.to_string(),
                size,
                reason: "allocation limit reached".to_string(),
            });
        }
        self.allocations += 1;
        self.next_id += 1;
        Ok(self.next_id)
    }

    fn track_peak(&mut self) {
        self.peak_live_buffers = self.peak_live_buffers.max(self.live_buffer_count());
    }

    fn in_flight_fence_for(&self, id: u64) -> Option<FenceValue> {
        self.in_flight.iter().find_map(|s| {
            s.ops
                .iter()
                .any(|op| matches!(op, Op::Copy { src, dst, .. } if *src == id || *dst == id))
                .then_some(s.fence)
        })
    }

    fn execute(&mut self, submission: Submission) {
        for op in &submission.ops {
            let Op::Copy {
                src,
                src_offset,
                dst,
                size,
            } = *op
            else {
                continue;
            };
            let Some(source) = self.staging.get(&src) else {
                continue;
            };
            let (start, end) = (src_offset as usize, (src_offset + size) as usize);
            if end > source.data.len() {
                self.violations.push(Violation::CopyOutOfBounds {
                    label: source.label.clone(),
                });
                continue;
            }
            let bytes = source.data[start..end].to_vec();
            if let Some(target) = self.buffers.get_mut(&dst) {
                if bytes.len() > target.data.len() {
                    self.violations.push(Violation::CopyOutOfBounds {
                        label: target.label.clone(),
                    });
                    continue;
                }
                target.data[..bytes.len()].copy_from_slice(&bytes);
            }
        }

        let written: Vec<u64> = submission
            .ops
            .iter()
            .filter_map(|op| match op {
                Op::Copy { dst, .. } => Some(*dst),
                Op::Barrier => None,
            })
            .collect();
        for dst in written {
            let still_pending = self.in_flight.iter().any(|s| {
                s.ops
                    .iter()
                    .any(|op| matches!(op, Op::Copy { dst: d, .. } if *d == dst))
            });
            if let Some(target) = self.buffers.get_mut(&dst) {
                target.awaiting_transfer = still_pending;
            }
        }
        tracing::trace!(
            "Retired {} ({})",
            submission.fence,
            submission.label
        );
    }
}

impl GpuDevice for HeadlessDevice {
    type Buffer = HeadlessBuffer;
    type StagingBuffer = HeadlessStaging;
    type CommandBuffer = HeadlessCommands;

    fn create_device_local_buffer(
        &mut self,
        label: &str,
        size: u64,
        usage: BufferUsage,
    ) -> Result<HeadlessBuffer, DeviceError> {
        let id = self.allocate_id(label, size)?;
        self.buffers.insert(
            id,
            DeviceBuffer {
                label: label.to_string(),
                usage,
                data: vec![0; size as usize],
                awaiting_transfer: false,
            },
        );
        self.track_peak();
        Ok(HeadlessBuffer { id, size })
    }

    fn create_host_visible_buffer(
        &mut self,
        label: &str,
        size: u64,
    ) -> Result<HeadlessStaging, DeviceError> {
        let id = self.allocate_id(label, size)?;
        self.staging.insert(
            id,
            StagingState {
                label: label.to_string(),
                data: vec![0; size as usize],
                mapped: true,
            },
        );
        self.track_peak();
        Ok(HeadlessStaging { id, size })
    }

    fn write_staging(
        &mut self,
        staging: &mut HeadlessStaging,
        offset: u64,
        bytes: &[u8],
    ) -> Result<(), DeviceError> {
        let len = bytes.len() as u64;
        if offset + len > staging.size {
            return Err(DeviceError::WriteOutOfBounds {
                offset,
                len,
                size: staging.size,
            });
        }
        if let Some(state) = self.staging.get_mut(&staging.id) {
            if !state.mapped {
                self.violations.push(Violation::WriteUnmapped {
                    label: state.label.clone(),
                });
            }
            state.data[offset as usize..(offset + len) as usize].copy_from_slice(bytes);
        }
        Ok(())
    }

    fn unmap_staging(&mut self, staging: &mut HeadlessStaging) {
        if let Some(state) = self.staging.get_mut(&staging.id) {
            state.mapped = false;
        }
    }

    fn begin_commands(&mut self, label: &str) -> HeadlessCommands {
        HeadlessCommands {
            label: label.to_string(),
            ops: Vec::new(),
        }
    }

    fn record_copy(
        &mut self,
        commands: &mut HeadlessCommands,
        src: &HeadlessStaging,
        src_offset: u64,
        dst: &HeadlessBuffer,
        size: u64,
    ) {
        if let Some(target) = self.buffers.get_mut(&dst.id) {
            target.awaiting_transfer = true;
        }
        commands.ops.push(Op::Copy {
            src: src.id,
            src_offset,
            dst: dst.id,
            size,
        });
    }

    fn record_transfer_barrier(&mut self, commands: &mut HeadlessCommands) {
        commands.ops.push(Op::Barrier);
    }

    fn submit(&mut self, commands: HeadlessCommands) -> FenceValue {
        self.last_submitted += 1;
        let fence = FenceValue(self.last_submitted);

        let last_copy = commands
            .ops
            .iter()
            .rposition(|op| matches!(op, Op::Copy { .. }));
        if let Some(last_copy) = last_copy {
            let barrier_after = commands.ops[last_copy..]
                .iter()
                .any(|op| matches!(op, Op::Barrier));
            if !barrier_after {
                self.violations.push(Violation::MissingBarrier { fence });
            }
        }
        for op in &commands.ops {
            if let Op::Copy { src, .. } = op
                && let Some(state) = self.staging.get(src)
                && state.mapped
            {
                self.violations.push(Violation::SubmittedWhileMapped {
                    label: state.label.clone(),
                    fence,
                });
            }
        }

        self.in_flight.push_back(Submission {
            fence,
            label: commands.label,
            ops: commands.ops,
        });
        if self.auto_complete {
            self.complete_through(fence);
        }
        fence
    }

    fn submit_marker(&mut self) -> FenceValue {
        let marker = self.begin_commands("fence-marker");
        self.submit(marker)
    }

    fn is_complete(&mut self, fence: FenceValue) -> bool {
        fence.0 <= self.completed
    }

    fn wait(&mut self, fence: FenceValue) -> Result<(), DeviceError> {
        self.complete_through(fence);
        Ok(())
    }

    fn destroy_buffer(&mut self, buffer: HeadlessBuffer) {
        if let Some(fence) = self.in_flight_fence_for(buffer.id) {
            let label = self
                .buffers
                .get(&buffer.id)
                .map(|s| s.label.clone())
                .unwrap_or_default();
            self.violations.push(Violation::DestroyedInFlight { label, fence });
        }
        self.buffers.remove(&buffer.id);
    }

    fn destroy_staging(&mut self, staging: HeadlessStaging) {
        if let Some(fence) = self.in_flight_fence_for(staging.id) {
            let label = self
                .staging
                .get(&staging.id)
                .map(|s| s.label.clone())
                .unwrap_or_default();
            self.violations.push(Violation::DestroyedInFlight { label, fence });
        }
        self.staging.remove(&staging.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staged_copy(device: &mut HeadlessDevice, bytes: &[u8]) -> (HeadlessStaging, HeadlessBuffer, HeadlessCommands) {
        let mut staging = device.create_host_visible_buffer("staging", 64).unwrap();
        device.write_staging(&mut staging, 0, bytes).unwrap();
        let dst = device
            .create_device_local_buffer("vertices", bytes.len() as u64, BufferUsage::Vertex)
            .unwrap();
        let mut commands = device.begin_commands("upload");
        device.record_copy(&mut commands, &staging, 0, &dst, bytes.len() as u64);
        device.record_transfer_barrier(&mut commands);
        device.unmap_staging(&mut staging);
        (staging, dst, commands)
    }

    #[test]
    fn test_copies_execute_only_on_retire() {
        let mut device = HeadlessDevice::new();
        let (staging, dst, commands) = staged_copy(&mut device, &[1, 2, 3, 4]);
        let fence = device.submit(commands);

        assert!(!device.is_complete(fence));
        assert_eq!(device.read_buffer(&dst).unwrap(), &[0, 0, 0, 0]);
        assert!(matches!(
            device.violations()[0],
            Violation::ReadBeforeTransfer { .. }
        ));

        device.complete_through(fence);
        assert!(device.is_complete(fence));
        assert_eq!(device.read_buffer(&dst).unwrap(), &[1, 2, 3, 4]);
        assert_eq!(device.violations().len(), 1);

        device.destroy_staging(staging);
        device.destroy_buffer(dst);
        assert_eq!(device.live_buffer_count(), 0);
        assert_eq!(device.violations().len(), 1);
    }

    #[test]
    fn test_destroy_in_flight_is_a_violation() {
        let mut device = HeadlessDevice::new();
        let (staging, dst, commands) = staged_copy(&mut device, &[9; 8]);
        let fence = device.submit(commands);
        device.destroy_buffer(dst);
        device.destroy_staging(staging);

        let in_flight: Vec<_> = device
            .violations()
            .iter()
            .filter(|v| matches!(v, Violation::DestroyedInFlight { fence: f, .. } if *f == fence))
            .collect();
        assert_eq!(in_flight.len(), 2);
    }

    #[test]
    fn test_missing_barrier_is_a_violation() {
        let mut device = HeadlessDevice::new();
        let mut staging = device.create_host_visible_buffer("staging", 8).unwrap();
        let dst = device
            .create_device_local_buffer("indices", 8, BufferUsage::Index)
            .unwrap();
        let mut commands = device.begin_commands("upload");
        device.record_copy(&mut commands, &staging, 0, &dst, 8);
        device.unmap_staging(&mut staging);
        let fence = device.submit(commands);
        assert_eq!(device.violations(), &[Violation::MissingBarrier { fence }]);
    }

    #[test]
    fn test_submitting_mapped_staging_is_a_violation() {
        let mut device = HeadlessDevice::new();
        let staging = device.create_host_visible_buffer("staging", 8).unwrap();
        let dst = device
            .create_device_local_buffer("indices", 8, BufferUsage::Index)
            .unwrap();
        let mut commands = device.begin_commands("upload");
        device.record_copy(&mut commands, &staging, 0, &dst, 8);
        device.record_transfer_barrier(&mut commands);
        device.submit(commands);
        assert!(matches!(
            device.violations()[0],
            Violation::SubmittedWhileMapped { .. }
        ));
    }

    #[test]
    fn test_markers_complete_in_order() {
        let mut device = HeadlessDevice::new();
        let a = device.submit_marker();
        let b = device.submit_marker();
        let c = device.submit_marker();
        assert!(a < b && b < c);

        device.complete_through(b);
        assert!(device.is_complete(a));
        assert!(device.is_complete(b));
        assert!(!device.is_complete(c));
        assert_eq!(device.pending_submissions(), 1);

        device.wait(c).unwrap();
        assert!(device.is_complete(c));
    }

    #[test]
    fn test_auto_complete_retires_on_submit() {
        let mut device = HeadlessDevice::new().with_auto_complete();
        let (_staging, dst, commands) = staged_copy(&mut device, &[4, 3, 2, 1]);
        let fence = device.submit(commands);
        assert!(device.is_complete(fence));
        assert_eq!(device.read_buffer(&dst).unwrap(), &[4, 3, 2, 1]);
        assert!(device.violations().is_empty());
    }

    #[test]
    fn test_allocation_limit_fails_creation() {
        let mut device = HeadlessDevice::new().with_allocation_limit(1);
        device
            .create_device_local_buffer("first", 4, BufferUsage::Vertex)
            .unwrap();
        let err = device
            .create_device_local_buffer("second", 4, BufferUsage::Vertex)
            .unwrap_err();
        assert!(matches!(err, DeviceError::Allocation { .. }));
    }

    #[test]
    fn test_staging_write_out_of_bounds_is_error() {
        let mut device = HeadlessDevice::new();
        let mut staging = device.create_host_visible_buffer("staging", 8).unwrap();
        let err = device.write_staging(&mut staging, 4, &[0; 8]).unwrap_err();
        assert_eq!(
            err,
            DeviceError::WriteOutOfBounds {
                offset: 4,
                len: 8,
                size: 8
            }
        );
    }

    #[test]
    fn test_peak_live_buffers_is_tracked() {
        let mut device = HeadlessDevice::new();
        let a = device.create_device_local_buffer("a", 4, BufferUsage::Vertex).unwrap();
        let b = device.create_device_local_buffer("b", 4, BufferUsage::Index).unwrap();
        device.destroy_buffer(a);
        device.destroy_buffer(b);
        assert_eq!(device.live_buffer_count(), 0);
        assert_eq!(device.peak_live_buffers(), 2);
    }
}
