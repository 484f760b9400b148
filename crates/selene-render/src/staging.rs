//! Bump-allocated host-visible staging memory for one upload batch.
//!
//! An arena is opened with a fixed capacity, written front to back, and closed
//! before the command buffer that reads it is submitted. The closed buffer is
//! handed back to the caller, who must keep it alive until the submission's
//! fence completes.

use crate::{GpuDevice, StagingError};

/// Offset alignment for staging writes (the map alignment of most backends).
pub const STAGING_ALIGNMENT: u64 = 8;

/// Round `value` up to the next multiple of `align` (a power of two).
pub fn align_up(value: u64, align: u64) -> u64 {
    (value + align - 1) & !(align - 1)
}

/// One shared host-visible buffer with a monotonically increasing write offset.
#[derive(Debug)]
pub struct StagingArena<S> {
    buffer: Option<S>,
    capacity: u64,
    offset: u64,
}

impl<S> Default for StagingArena<S> {
    fn default() -> Self {
        Self {
            buffer: None,
            capacity: 0,
            offset: 0,
        }
    }
}

impl<S> StagingArena<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a batch backed by a fresh host-visible buffer of `capacity` bytes.
    pub fn begin_batch<D>(&mut self, device: &mut D, capacity: u64) -> Result<(), StagingError>
    where
        D: GpuDevice<StagingBuffer = S>,
    {
        if self.buffer.is_some() {
            return Err(StagingError::AlreadyOpen);
        }
        let capacity = align_up(capacity.max(STAGING_ALIGNMENT), STAGING_ALIGNMENT);
        self.buffer = Some(device.create_host_visible_buffer("patch-staging", capacity)?);
        self.capacity = capacity;
        self.offset = 0;
        Ok(())
    }

    /// Bump-allocate and copy `bytes`, returning their offset in the arena.
    ///
    /// Fails without writing anything if the arena cannot hold them.
    pub fn write<D>(&mut self, device: &mut D, bytes: &[u8]) -> Result<u64, StagingError>
    where
        D: GpuDevice<StagingBuffer = S>,
    {
        let Some(buffer) = self.buffer.as_mut() else {
            return Err(StagingError::NotOpen);
        };
        let start = align_up(self.offset, STAGING_ALIGNMENT);
        let len = bytes.len() as u64;
        if start + len > self.capacity {
            return Err(StagingError::CapacityExceeded {
                requested: len,
                offset: start,
                capacity: self.capacity,
            });
        }
        device.write_staging(buffer, start, bytes)?;
        self.offset = start + len;
        Ok(start)
    }

    /// Unmap and close the batch, returning the buffer for submission tracking.
    pub fn end_batch<D>(&mut self, device: &mut D) -> Result<S, StagingError>
    where
        D: GpuDevice<StagingBuffer = S>,
    {
        let mut buffer = self.buffer.take().ok_or(StagingError::NotOpen)?;
        device.unmap_staging(&mut buffer);
        self.capacity = 0;
        self.offset = 0;
        Ok(buffer)
    }

    pub fn is_open(&self) -> bool {
        self.buffer.is_some()
    }

    /// The open batch's buffer, for recording copies out of it.
    pub fn buffer(&self) -> Option<&S> {
        self.buffer.as_ref()
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Bytes used so far, including alignment padding.
    pub fn used(&self) -> u64 {
        self.offset
    }

    /// Whether `len` more bytes fit after alignment.
    pub fn fits(&self, len: u64) -> bool {
        self.is_open() && align_up(self.offset, STAGING_ALIGNMENT) + len <= self.capacity
    }
}
