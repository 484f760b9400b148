//! Fence-gated destruction of replaced patch meshes.
//!
//! Meshes replaced during a frame are parked as pending. At the end of the
//! frame they are sealed with the fence of that frame's final submission,
//! which completes only after every earlier submission that could still read
//! them. A sealed entry is destroyed once the device reports its fence
//! complete, never earlier.

use std::collections::VecDeque;

use crate::{FenceValue, GpuDevice, GpuPatchMesh};

#[derive(Debug)]
struct DeferredEntry<B> {
    fence: FenceValue,
    mesh: GpuPatchMesh<B>,
}

/// Meshes waiting for the device to finish with them.
#[derive(Debug)]
pub struct DeferredDestroyQueue<B> {
    pending: Vec<GpuPatchMesh<B>>,
    sealed: VecDeque<DeferredEntry<B>>,
    destroyed_total: u64,
}

impl<B> Default for DeferredDestroyQueue<B> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
            sealed: VecDeque::new(),
            destroyed_total: 0,
        }
    }
}

impl<B> DeferredDestroyQueue<B> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a replaced mesh until its fence is known.
    pub fn defer(&mut self, mesh: GpuPatchMesh<B>) {
        self.pending.push(mesh);
    }

    /// Tag every pending mesh with `fence`. Fences must be non-decreasing.
    pub fn seal(&mut self, fence: FenceValue) {
        debug_assert!(self.sealed.back().is_none_or(|e| e.fence <= fence));
        self.sealed.extend(
            self.pending
                .drain(..)
                .map(|mesh| DeferredEntry { fence, mesh }),
        );
    }

    /// Destroy every sealed mesh whose fence has completed. Returns how many were freed.
    pub fn collect_completed<D>(&mut self, device: &mut D) -> usize
    where
        D: GpuDevice<Buffer = B>,
    {
        let mut freed = 0;
        while let Some(front) = self.sealed.front() {
            if !device.is_complete(front.fence) {
                break;
            }
            if let Some(entry) = self.sealed.pop_front() {
                device.destroy_buffer(entry.mesh.vertex_buffer);
                device.destroy_buffer(entry.mesh.index_buffer);
                freed += 1;
            }
        }
        self.destroyed_total += freed as u64;
        freed
    }

    /// Destroy everything, pending included. The caller must already have
    /// waited for the device to go idle.
    pub fn destroy_all<D>(&mut self, device: &mut D) -> usize
    where
        D: GpuDevice<Buffer = B>,
    {
        let meshes = self
            .pending
            .drain(..)
            .chain(self.sealed.drain(..).map(|e| e.mesh));
        let mut freed = 0;
        for mesh in meshes {
            device.destroy_buffer(mesh.vertex_buffer);
            device.destroy_buffer(mesh.index_buffer);
            freed += 1;
        }
        self.destroyed_total += freed as u64;
        freed
    }

    /// Meshes awaiting destruction, sealed or not.
    pub fn len(&self) -> usize {
        self.pending.len() + self.sealed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Bytes still held on the device by queued meshes.
    pub fn byte_size(&self) -> u64 {
        self.pending
            .iter()
            .chain(self.sealed.iter().map(|e| &e.mesh))
            .map(|m| m.byte_size)
            .sum()
    }

    /// The newest fence any sealed entry waits on.
    pub fn latest_fence(&self) -> Option<FenceValue> {
        self.sealed.back().map(|e| e.fence)
    }

    pub fn destroyed_total(&self) -> u64 {
        self.destroyed_total
    }
}
