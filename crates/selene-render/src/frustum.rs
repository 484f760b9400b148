//! View frustum culling of bounding spheres in camera-relative space.

use glam::{Mat4, Vec3, Vec4};

const LEFT: usize = 0;
const RIGHT: usize = 1;
const BOTTOM: usize = 2;
const TOP: usize = 3;
const NEAR: usize = 4;
const FAR: usize = 5;

/// Six inward-facing planes extracted from a view-projection matrix.
///
/// The matrix must map camera-relative positions (camera at the origin) to
/// clip space with depth in `[0, w]`. Both conventional and reverse-Z
/// projections satisfy this.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frustum {
    /// Each `Vec4(a, b, c, d)` has a unit normal `(a, b, c)`.
    planes: [Vec4; 6],
}

impl Frustum {
    /// Gribb-Hartmann row combination, with each plane normalized.
    pub fn from_view_projection(vp: &Mat4) -> Self {
        let rows = [vp.row(0), vp.row(1), vp.row(2), vp.row(3)];

        let mut planes = [Vec4::ZERO; 6];
        planes[LEFT] = rows[3] + rows[0];
        planes[RIGHT] = rows[3] - rows[0];
        planes[BOTTOM] = rows[3] + rows[1];
        planes[TOP] = rows[3] - rows[1];
        // Depth range [0, w]: z >= 0 and z <= w.
        planes[NEAR] = rows[2];
        planes[FAR] = rows[3] - rows[2];

        for plane in &mut planes {
            let len = plane.truncate().length();
            if len > 0.0 {
                *plane /= len;
            }
        }

        Self { planes }
    }

    /// Signed distance from `point` to plane `index` (positive inside).
    pub fn signed_distance(&self, index: usize, point: Vec3) -> f32 {
        let plane = self.planes[index];
        plane.truncate().dot(point) + plane.w
    }

    /// False only when the sphere lies entirely outside one plane.
    ///
    /// Planes with a zero normal (an infinite far plane) never cull.
    pub fn intersects_sphere(&self, center: Vec3, radius: f32) -> bool {
        self.planes.iter().all(|plane| {
            if plane.truncate() == Vec3::ZERO {
                return true;
            }
            plane.truncate().dot(center) + plane.w >= -radius
        })
    }

    pub fn planes(&self) -> &[Vec4; 6] {
        &self.planes
    }
}
