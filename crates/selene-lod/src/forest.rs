//! Six patch quadtrees refined against the camera each frame.
//!
//! One traversal per frame merges interior nodes whose children have all
//! become too fine, and collects every leaf that wants to split. The split
//! candidates from all six faces are ranked together by screen-space error
//! and granted from a shared budget, four children at a time. Meshes replaced
//! by either transition go to the deferred-destroy queue, sealed with the
//! fence of the frame's last submission.

use std::sync::Arc;

use glam::DVec3;
use selene_cubesphere::{CubeFace, CubeFaceRegion};
use selene_mesh::PatchMeshBuilder;
use selene_render::{
    DeferredDestroyQueue, FenceValue, Frustum, GpuDevice, GpuPatchMesh, UploadBatcher, UploadStats,
};
use selene_terrain::Heightfield;
use tracing::{debug, info};

use crate::{CameraState, LodError, LodParams, Patch, PatchArena, PatchId, bounding_radius, screen_space_error};

/// Children created by one split.
const CHILDREN_PER_SPLIT: u32 = 4;

/// What one call to [`LodForest::update`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub splits: u32,
    pub merges: u32,
    /// Meshes built and uploaded this frame, for splits, merges and rebuilds.
    pub meshes_built: u32,
    /// Leaves that wanted to split, granted or not.
    pub candidates: u32,
    /// Deferred meshes whose fences had completed at the start of the frame.
    pub deferred_destroyed: u32,
    /// Fence sealing this frame's replaced meshes, if anything was submitted.
    pub fence: Option<FenceValue>,
}

/// Snapshot of the forest for diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ForestStats {
    pub leaf_count: usize,
    pub interior_count: usize,
    pub drawable_leaves: usize,
    pub max_depth: u32,
    /// Bytes held by meshes attached to patches.
    pub gpu_bytes: u64,
    pub deferred_backlog: usize,
    pub deferred_bytes: u64,
    pub uploads: UploadStats,
    pub last_frame: FrameStats,
}

#[derive(Clone, Copy, Debug)]
struct SplitCandidate {
    id: PatchId,
    error: f64,
}

/// Camera-adaptive LOD state for one cube-sphere body.
///
/// Patch meshes live on the device behind `D`. Call
/// [`release_all_device_resources`](Self::release_all_device_resources)
/// before dropping the forest or the device.
pub struct LodForest<D: GpuDevice> {
    params: LodParams,
    builder: PatchMeshBuilder,
    heightfield: Arc<dyn Heightfield>,
    max_displacement: f64,
    arena: PatchArena<D::Buffer>,
    roots: [PatchId; 6],
    uploader: UploadBatcher<D>,
    deferred: DeferredDestroyQueue<D::Buffer>,
    last_fence: Option<FenceValue>,
    last_frame: FrameStats,
    frame_index: u64,
}

impl<D: GpuDevice> LodForest<D> {
    /// Build and upload the six root patches.
    pub fn new(
        device: &mut D,
        heightfield: Arc<dyn Heightfield>,
        radius: f64,
        params: LodParams,
    ) -> Result<Self, LodError> {
        params.validate()?;
        let builder = PatchMeshBuilder::new(radius, params.grid_resolution)?;
        let max_displacement = heightfield.max_displacement().abs();
        let uploader = UploadBatcher::new(
            params.meshes_per_batch as usize,
            staging_capacity(params.grid_resolution, params.meshes_per_batch),
        );

        let mut arena = PatchArena::new();
        let roots = CubeFace::ALL.map(|face| {
            let region = CubeFaceRegion::root(face);
            let center = builder.world_center(&region, heightfield.as_ref());
            let bound = bounding_radius(&region, center, radius, max_displacement);
            arena.insert(Patch::new(region, center, bound))
        });

        let mut forest = Self {
            params,
            builder,
            heightfield,
            max_displacement,
            arena,
            roots,
            uploader,
            deferred: DeferredDestroyQueue::new(),
            last_fence: None,
            last_frame: FrameStats::default(),
            frame_index: 0,
        };
        for root in roots {
            forest.rebuild_mesh(device, root)?;
        }
        forest.last_fence = forest.uploader.flush(device)?;

        info!(
            "LOD forest ready: radius {radius} m, {} roots, grid {}, {} bytes uploaded",
            roots.len(),
            params.grid_resolution,
            forest.uploader.stats().bytes_uploaded
        );
        Ok(forest)
    }

    /// Re-evaluate every tree against `camera`: merge, split under the budget,
    /// upload new meshes and retire replaced ones.
    ///
    /// Returns an error only when the device fails. On return every new mesh
    /// has been submitted behind a transfer barrier and is safe to draw.
    pub fn update(&mut self, device: &mut D, camera: &CameraState) -> Result<FrameStats, LodError> {
        let mut frame = FrameStats {
            deferred_destroyed: self.deferred.collect_completed(device) as u32,
            ..FrameStats::default()
        };
        self.uploader.reclaim_staging(device);

        let frustum = Frustum::from_view_projection(&camera.view_projection);
        let mut candidates = Vec::new();
        for root in self.roots {
            self.evaluate(device, root, camera, &frustum, &mut candidates, &mut frame)?;
        }
        frame.candidates = candidates.len() as u32;

        candidates.sort_by(|a, b| b.error.total_cmp(&a.error));
        let mut budget = self.params.max_splits_per_frame;
        for candidate in &candidates {
            if budget < CHILDREN_PER_SPLIT {
                break;
            }
            self.split(device, candidate.id)?;
            budget -= CHILDREN_PER_SPLIT;
            frame.splits += 1;
            frame.meshes_built += CHILDREN_PER_SPLIT;
        }

        frame.fence = self.end_frame(device)?;
        self.frame_index += 1;
        self.last_frame = frame;
        debug!(
            "LOD frame {}: {} splits, {} merges, {} candidates, {} deferred freed, {} leaves",
            self.frame_index,
            frame.splits,
            frame.merges,
            frame.candidates,
            frame.deferred_destroyed,
            self.active_leaf_count()
        );
        Ok(frame)
    }

    /// Number of leaves across all six trees.
    pub fn active_leaf_count(&self) -> usize {
        self.arena.iter().filter(|(_, patch)| patch.is_leaf()).count()
    }

    pub fn stats(&self) -> ForestStats {
        let mut stats = ForestStats {
            deferred_backlog: self.deferred.len(),
            deferred_bytes: self.deferred.byte_size(),
            uploads: self.uploader.stats(),
            last_frame: self.last_frame,
            ..ForestStats::default()
        };
        for (_, patch) in self.arena.iter() {
            if patch.is_leaf() {
                stats.leaf_count += 1;
                if patch.is_drawable() {
                    stats.drawable_leaves += 1;
                }
            } else {
                stats.interior_count += 1;
            }
            stats.max_depth = stats.max_depth.max(patch.depth());
            stats.gpu_bytes += patch.mesh().map_or(0, |mesh| mesh.byte_size);
        }
        stats
    }

    /// Wait for the device, free every mesh and staging buffer, and collapse
    /// the forest to six mesh-less roots. A later [`update`](Self::update)
    /// rebuilds what it needs.
    pub fn release_all_device_resources(&mut self, device: &mut D) -> Result<(), LodError> {
        self.uploader.flush(device)?;
        let fence = device.submit_marker();
        device.wait(fence)?;

        let mut stack: Vec<PatchId> = Vec::new();
        for root in self.roots {
            if let Some(patch) = self.arena.get_mut(root) {
                if let Some(children) = patch.children.take() {
                    stack.extend(children);
                }
                if let Some(mesh) = patch.mesh.take() {
                    destroy_mesh(device, mesh);
                }
            }
        }
        let mut removed = 0usize;
        while let Some(id) = stack.pop() {
            if let Some(mut patch) = self.arena.remove(id) {
                if let Some(children) = patch.children.take() {
                    stack.extend(children);
                }
                if let Some(mesh) = patch.mesh.take() {
                    destroy_mesh(device, mesh);
                }
                removed += 1;
            }
        }
        let deferred = self.deferred.destroy_all(device);
        self.uploader.release_all(device);
        self.last_fence = Some(fence);

        info!("Released LOD device resources: {removed} patches removed, {deferred} deferred meshes freed");
        Ok(())
    }

    pub fn roots(&self) -> &[PatchId; 6] {
        &self.roots
    }

    pub fn patch(&self, id: PatchId) -> Option<&Patch<D::Buffer>> {
        self.arena.get(id)
    }

    pub fn patches(&self) -> impl Iterator<Item = (PatchId, &Patch<D::Buffer>)> {
        self.arena.iter()
    }

    pub fn params(&self) -> &LodParams {
        &self.params
    }

    pub fn radius(&self) -> f64 {
        self.builder.radius()
    }

    pub fn max_displacement(&self) -> f64 {
        self.max_displacement
    }

    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }

    /// Fence of the most recent submission the forest made.
    pub fn last_fence(&self) -> Option<FenceValue> {
        self.last_fence
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Screen-space error of a patch as seen from `camera`.
    pub fn screen_error(&self, patch: &Patch<D::Buffer>, camera: &CameraState) -> f64 {
        screen_space_error(
            patch.bounding_radius(),
            self.params.grid_resolution,
            patch.world_center(),
            camera.position,
            camera.fov_y,
            camera.screen_height,
        )
    }

    /// Merge or recurse from `id`, pushing split candidates. Recursion depth
    /// is bounded by `max_depth`.
    fn evaluate(
        &mut self,
        device: &mut D,
        id: PatchId,
        camera: &CameraState,
        frustum: &Frustum,
        candidates: &mut Vec<SplitCandidate>,
        frame: &mut FrameStats,
    ) -> Result<(), LodError> {
        let Some(patch) = self.arena.get(id) else {
            return Ok(());
        };

        if let Some(children) = patch.children {
            if self.merge_eligible(&children, camera) {
                self.merge(device, id, children)?;
                frame.merges += 1;
                frame.meshes_built += 1;
            } else {
                for child in children {
                    self.evaluate(device, child, camera, frustum, candidates, frame)?;
                }
            }
            return Ok(());
        }

        if patch.mesh().is_none() {
            self.rebuild_mesh(device, id)?;
            frame.meshes_built += 1;
        }

        let Some(patch) = self.arena.get(id) else {
            return Ok(());
        };
        if patch.depth() >= self.params.max_depth {
            return Ok(());
        }
        let error = self.screen_error(patch, camera);
        if error <= self.params.split_threshold {
            return Ok(());
        }
        let visible = frustum.intersects_sphere(
            camera.relative(patch.world_center()),
            patch.bounding_radius() as f32,
        );
        if visible {
            candidates.push(SplitCandidate { id, error });
        }
        Ok(())
    }

    fn merge_eligible(&self, children: &[PatchId; 4], camera: &CameraState) -> bool {
        let mut max_error = 0.0_f64;
        for &child in children {
            let Some(patch) = self.arena.get(child) else {
                return false;
            };
            if !patch.is_leaf() {
                return false;
            }
            max_error = max_error.max(self.screen_error(patch, camera));
        }
        max_error < self.params.merge_threshold
    }

    /// Give `id` a mesh again and retire its four leaf children.
    fn merge(&mut self, device: &mut D, id: PatchId, children: [PatchId; 4]) -> Result<(), LodError> {
        let has_mesh = self.arena.get(id).is_some_and(|patch| patch.mesh().is_some());
        if !has_mesh {
            self.rebuild_mesh(device, id)?;
        }
        for child in children {
            if let Some(mut patch) = self.arena.remove(child) {
                if let Some(mesh) = patch.mesh.take() {
                    self.deferred.defer(mesh);
                }
            }
        }
        if let Some(patch) = self.arena.get_mut(id) {
            patch.children = None;
        }
        Ok(())
    }

    /// Build and upload four children, then retire the parent's mesh.
    fn split(&mut self, device: &mut D, id: PatchId) -> Result<(), LodError> {
        let Some(region) = self.arena.get(id).map(|patch| *patch.region()) else {
            return Ok(());
        };

        // All four meshes exist before the tree changes.
        let child_regions = region.children();
        let mut built = Vec::with_capacity(child_regions.len());
        for child_region in &child_regions {
            built.push(self.build_and_upload(device, child_region)?);
        }

        let mut ids = [id; 4];
        for (slot, (child_region, (center, mesh))) in
            ids.iter_mut().zip(child_regions.into_iter().zip(built))
        {
            let bound = bounding_radius(&child_region, center, self.builder.radius(), self.max_displacement);
            let mut patch = Patch::new(child_region, center, bound);
            patch.mesh = Some(mesh);
            *slot = self.arena.insert(patch);
        }

        if let Some(parent) = self.arena.get_mut(id) {
            parent.children = Some(ids);
            if let Some(mesh) = parent.mesh.take() {
                self.deferred.defer(mesh);
            }
        }
        Ok(())
    }

    fn rebuild_mesh(&mut self, device: &mut D, id: PatchId) -> Result<(), LodError> {
        let Some(region) = self.arena.get(id).map(|patch| *patch.region()) else {
            return Ok(());
        };
        let (_, mesh) = self.build_and_upload(device, &region)?;
        if let Some(patch) = self.arena.get_mut(id) {
            if let Some(old) = patch.mesh.replace(mesh) {
                self.deferred.defer(old);
            }
        }
        Ok(())
    }

    fn build_and_upload(
        &mut self,
        device: &mut D,
        region: &CubeFaceRegion,
    ) -> Result<(DVec3, GpuPatchMesh<D::Buffer>), LodError> {
        let data = self.builder.build(region, self.heightfield.as_ref());
        let (u0, _) = region.u_range();
        let (v0, _) = region.v_range();
        let label = format!(
            "patch-f{}-d{}-{:.6}-{:.6}",
            region.face().index(),
            region.depth(),
            u0,
            v0
        );
        let mesh = self.uploader.upload(device, &label, &data)?;
        Ok((data.world_center, mesh))
    }

    /// Submit outstanding uploads and seal this frame's replaced meshes.
    fn end_frame(&mut self, device: &mut D) -> Result<Option<FenceValue>, LodError> {
        let mut fence = self.uploader.flush(device)?;
        if fence.is_none() && self.deferred.pending_len() > 0 {
            fence = Some(device.submit_marker());
        }
        if let Some(fence) = fence {
            self.deferred.seal(fence);
            self.last_fence = Some(fence);
        }
        Ok(fence)
    }
}

fn destroy_mesh<D: GpuDevice>(device: &mut D, mesh: GpuPatchMesh<D::Buffer>) {
    device.destroy_buffer(mesh.vertex_buffer);
    device.destroy_buffer(mesh.index_buffer);
}

/// Staging bytes for a full batch of meshes at `resolution`.
fn staging_capacity(resolution: u32, meshes_per_batch: u32) -> u64 {
    let n = u64::from(resolution);
    let vertices = n * n + 4 * n;
    let indices = 6 * (n - 1) * (n - 1) + 24 * (n - 1);
    let per_mesh = vertices * std::mem::size_of::<selene_mesh::PatchVertex>() as u64
        + indices * std::mem::size_of::<u32>() as u64
        + 16;
    per_mesh * u64::from(meshes_per_batch.max(1))
}
