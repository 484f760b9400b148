//! Frustum-culled draw traversal.

use glam::{DVec3, Mat4, Vec3};
use selene_render::{DrawRecorder, Frustum, GpuDevice, PatchPushConstants};

use crate::{LodForest, PatchId};

/// Counts from one walk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WalkStats {
    pub drawn: usize,
    /// Subtrees rejected by the frustum test.
    pub culled: usize,
    /// Visible leaves skipped because they have no mesh.
    pub meshless: usize,
}

/// Issues one indexed draw per visible leaf that has a mesh.
#[derive(Clone, Copy, Debug)]
pub struct DrawWalker {
    view_projection: Mat4,
    camera_position: DVec3,
    light_direction: Vec3,
    frustum: Frustum,
}

impl DrawWalker {
    /// `view_projection` is camera-relative, as in [`CameraState`](crate::CameraState).
    pub fn new(view_projection: Mat4, camera_position: DVec3, light_direction: Vec3) -> Self {
        Self {
            view_projection,
            camera_position,
            light_direction: light_direction.normalize_or_zero(),
            frustum: Frustum::from_view_projection(&view_projection),
        }
    }

    pub fn draw<D, R>(&self, forest: &LodForest<D>, recorder: &mut R) -> WalkStats
    where
        D: GpuDevice,
        R: DrawRecorder<D::Buffer>,
    {
        let mut stats = WalkStats::default();
        for &root in forest.roots() {
            self.visit(forest, root, recorder, &mut stats);
        }
        stats
    }

    // Depth is bounded by the forest's max_depth.
    fn visit<D, R>(&self, forest: &LodForest<D>, id: PatchId, recorder: &mut R, stats: &mut WalkStats)
    where
        D: GpuDevice,
        R: DrawRecorder<D::Buffer>,
    {
        let Some(patch) = forest.patch(id) else {
            return;
        };
        let offset = (patch.world_center() - self.camera_position).as_vec3();
        if !self
            .frustum
            .intersects_sphere(offset, patch.bounding_radius() as f32)
        {
            stats.culled += 1;
            return;
        }

        if let Some(children) = patch.children() {
            for &child in children {
                self.visit(forest, child, recorder, stats);
            }
            return;
        }

        let Some(mesh) = patch.mesh() else {
            stats.meshless += 1;
            return;
        };
        let constants = PatchPushConstants::new(
            self.view_projection,
            offset,
            self.light_direction,
            self.camera_position.as_vec3(),
        );
        recorder.push_constants(&constants);
        recorder.draw_indexed(mesh);
        stats.drawn += 1;
    }
}
