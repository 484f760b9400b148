//! Batched host-to-device mesh uploads.
//!
//! Each mesh gets its own device-local vertex and index buffers, but all the
//! meshes of a batch share one staging arena and one command buffer. A batch
//! is submitted when it holds `meshes_per_batch` meshes, when the arena is
//! full, or when the caller flushes at the end of the frame. Submitted arenas
//! stay alive until their fence completes.

use selene_mesh::PatchMeshData;

use crate::staging::{STAGING_ALIGNMENT, align_up};
use crate::{BufferUsage, FenceValue, GpuDevice, GpuPatchMesh, StagingArena, StagingError, UploadError};

/// Running totals for diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UploadStats {
    pub meshes_uploaded: u64,
    pub bytes_uploaded: u64,
    pub batches_submitted: u64,
}

/// Moves built meshes onto the device in batches.
pub struct UploadBatcher<D: GpuDevice> {
    meshes_per_batch: usize,
    staging_capacity: u64,
    arena: StagingArena<D::StagingBuffer>,
    commands: Option<D::CommandBuffer>,
    batched: usize,
    in_flight: Vec<(FenceValue, D::StagingBuffer)>,
    stats: UploadStats,
}

impl<D: GpuDevice> UploadBatcher<D> {
    /// `staging_capacity` is the default arena size; a single mesh larger than
    /// it gets an arena of its own size.
    pub fn new(meshes_per_batch: usize, staging_capacity: u64) -> Self {
        Self {
            meshes_per_batch: meshes_per_batch.max(1),
            staging_capacity,
            arena: StagingArena::new(),
            commands: None,
            batched: 0,
            in_flight: Vec::new(),
            stats: UploadStats::default(),
        }
    }

    /// Create device buffers for `mesh` and record the copies that fill them.
    ///
    /// The returned mesh must not be drawn until the batch holding it has been
    /// flushed; its contents land when that submission executes.
    pub fn upload(
        &mut self,
        device: &mut D,
        label: &str,
        mesh: &PatchMeshData,
    ) -> Result<GpuPatchMesh<D::Buffer>, UploadError> {
        let vertex_bytes = mesh.vertex_bytes();
        let index_bytes = mesh.index_bytes();
        let needed = align_up(vertex_bytes.len() as u64, STAGING_ALIGNMENT)
            + align_up(index_bytes.len() as u64, STAGING_ALIGNMENT);

        if self.arena.is_open() && !self.arena.fits(needed) {
            self.flush(device)?;
        }
        if !self.arena.is_open() {
            self.arena
                .begin_batch(device, self.staging_capacity.max(needed))?;
            self.commands = Some(device.begin_commands("patch-upload"));
        }

        let vertex_buffer = device.create_device_local_buffer(
            &format!("{label}-vertices"),
            vertex_bytes.len() as u64,
            BufferUsage::Vertex,
        )?;
        let index_buffer = device.create_device_local_buffer(
            &format!("{label}-indices"),
            index_bytes.len() as u64,
            BufferUsage::Index,
        )?;

        let vertex_offset = self.arena.write(device, vertex_bytes)?;
        let index_offset = self.arena.write(device, index_bytes)?;

        let (Some(commands), Some(staging)) = (self.commands.as_mut(), self.arena.buffer()) else {
            return Err(StagingError::NotOpen.into());
        };
        device.record_copy(
            commands,
            staging,
            vertex_offset,
            &vertex_buffer,
            vertex_bytes.len() as u64,
        );
        device.record_copy(
            commands,
            staging,
            index_offset,
            &index_buffer,
            index_bytes.len() as u64,
        );

        self.batched += 1;
        self.stats.meshes_uploaded += 1;
        self.stats.bytes_uploaded += mesh.byte_size();

        if self.batched >= self.meshes_per_batch {
            self.flush(device)?;
        }

        Ok(GpuPatchMesh {
            vertex_buffer,
            index_buffer,
            index_count: mesh.index_count(),
            byte_size: mesh.byte_size(),
        })
    }

    /// Submit the open batch, if any, behind a transfer barrier.
    pub fn flush(&mut self, device: &mut D) -> Result<Option<FenceValue>, UploadError> {
        if !self.arena.is_open() {
            return Ok(None);
        }
        let staging = self.arena.end_batch(device)?;
        let mut commands = match self.commands.take() {
            Some(commands) => commands,
            None => device.begin_commands("patch-upload"),
        };
        device.record_transfer_barrier(&mut commands);
        let fence = device.submit(commands);

        tracing::trace!("Submitted {} patch uploads as {fence}", self.batched);
        self.in_flight.push((fence, staging));
        self.batched = 0;
        self.stats.batches_submitted += 1;
        Ok(Some(fence))
    }

    /// Free staging arenas whose submissions have completed.
    pub fn reclaim_staging(&mut self, device: &mut D) -> usize {
        let mut freed = 0;
        let mut still_in_flight = Vec::with_capacity(self.in_flight.len());
        for (fence, staging) in self.in_flight.drain(..) {
            if device.is_complete(fence) {
                device.destroy_staging(staging);
                freed += 1;
            } else {
                still_in_flight.push((fence, staging));
            }
        }
        self.in_flight = still_in_flight;
        freed
    }

    /// Free every in-flight arena. The caller must already have waited for the device.
    pub fn release_all(&mut self, device: &mut D) {
        for (_, staging) in self.in_flight.drain(..) {
            device.destroy_staging(staging);
        }
    }

    /// Meshes recorded into the open batch but not yet submitted.
    pub fn batched(&self) -> usize {
        self.batched
    }

    pub fn in_flight_batches(&self) -> usize {
        self.in_flight.len()
    }

    pub fn stats(&self) -> UploadStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HeadlessDevice, Violation};
    use selene_cubesphere::{CubeFace, CubeFaceRegion};
    use selene_mesh::PatchMeshBuilder;
    use selene_terrain::FlatHeightfield;

    fn sample_mesh(face: CubeFace) -> PatchMeshData {
        PatchMeshBuilder::new(1000.0, 5)
            .unwrap()
            .build(&CubeFaceRegion::root(face), &FlatHeightfield)
    }

    #[test]
    fn test_upload_contents_land_after_retire() {
        let mut device = HeadlessDevice::new();
        let mut batcher = UploadBatcher::new(8, 1 << 16);
        let data = sample_mesh(CubeFace::PosX);

        let gpu = batcher.upload(&mut device, "patch", &data).unwrap();
        assert_eq!(batcher.batched(), 1);
        let fence = batcher.flush(&mut device).unwrap().unwrap();
        device.complete_through(fence);

        assert_eq!(device.read_buffer(&gpu.vertex_buffer).unwrap(), data.vertex_bytes());
        assert_eq!(device.read_buffer(&gpu.index_buffer).unwrap(), data.index_bytes());
        assert_eq!(gpu.index_count, data.index_count());
        assert!(device.violations().is_empty());
    }

    #[test]
    fn test_batch_submits_when_full() {
        let mut device = HeadlessDevice::new();
        let mut batcher = UploadBatcher::new(2, 1 << 16);
        for face in CubeFace::ALL {
            batcher.upload(&mut device, "patch", &sample_mesh(face)).unwrap();
        }
        assert_eq!(batcher.batched(), 0);
        assert_eq!(batcher.in_flight_batches(), 3);
        assert_eq!(device.pending_submissions(), 3);
        assert_eq!(batcher.stats().batches_submitted, 3);
        assert_eq!(batcher.stats().meshes_uploaded, 6);
    }

    #[test]
    fn test_small_arena_splits_batches() {
        let mut device = HeadlessDevice::new();
        let data = sample_mesh(CubeFace::NegY);
        let mut batcher = UploadBatcher::new(64, data.byte_size() + 16);
        batcher.upload(&mut device, "a", &data).unwrap();
        batcher.upload(&mut device, "b", &data).unwrap();
        assert_eq!(batcher.in_flight_batches(), 1);
        assert_eq!(batcher.batched(), 1);
    }

    #[test]
    fn test_oversized_mesh_gets_its_own_arena() {
        let mut device = HeadlessDevice::new();
        let mut batcher = UploadBatcher::new(4, 64);
        let data = sample_mesh(CubeFace::PosZ);
        let gpu = batcher.upload(&mut device, "big", &data).unwrap();
        batcher.flush(&mut device).unwrap();
        device.complete_all();
        assert_eq!(device.read_buffer(&gpu.vertex_buffer).unwrap(), data.vertex_bytes());
    }

    #[test]
    fn test_flush_with_nothing_batched_is_none() {
        let mut device = HeadlessDevice::new();
        let mut batcher = UploadBatcher::<HeadlessDevice>::new(4, 1024);
        assert_eq!(batcher.flush(&mut device).unwrap(), None);
        assert_eq!(device.pending_submissions(), 0);
    }

    #[test]
    fn test_staging_is_reclaimed_only_after_completion() {
        let mut device = HeadlessDevice::new();
        let mut batcher = UploadBatcher::new(4, 1 << 16);
        batcher
            .upload(&mut device, "patch", &sample_mesh(CubeFace::PosY))
            .unwrap();
        let fence = batcher.flush(&mut device).unwrap().unwrap();

        assert_eq!(batcher.reclaim_staging(&mut device), 0);
        assert_eq!(device.live_staging_count(), 1);

        device.complete_through(fence);
        assert_eq!(batcher.reclaim_staging(&mut device), 1);
        assert_eq!(device.live_staging_count(), 0);
        assert!(
            !device
                .violations()
                .iter()
                .any(|v| matches!(v, Violation::DestroyedInFlight { .. }))
        );
    }

    #[test]
    fn test_allocation_failure_propagates() {
        let mut device = HeadlessDevice::new().with_allocation_limit(2);
        let mut batcher = UploadBatcher::new(4, 1 << 16);
        let err = batcher
            .upload(&mut device, "patch", &sample_mesh(CubeFace::NegX))
            .unwrap_err();
        assert!(matches!(err, UploadError::Device(_)));
    }
}
