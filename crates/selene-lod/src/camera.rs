//! Per-frame camera inputs to the LOD controller.

use glam::{DVec3, Mat4, Vec3};

/// Where the camera is and how it projects.
///
/// `view_projection` is camera-relative: its view transform places the eye at
/// the origin, so it stays precise at planetary distances. World positions are
/// brought into that space by subtracting `position` in double precision.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraState {
    pub position: DVec3,
    /// Vertical field of view in radians.
    pub fov_y: f64,
    /// Viewport height in pixels.
    pub screen_height: f64,
    pub view_projection: Mat4,
}

impl CameraState {
    /// Camera at `position` facing `target`, with an infinite reverse-Z projection.
    pub fn looking_at(
        position: DVec3,
        target: DVec3,
        up: DVec3,
        fov_y: f64,
        aspect: f32,
        near: f32,
        screen_height: f64,
    ) -> Self {
        let forward = (target - position).normalize_or_zero().as_vec3();
        let mut up = up.normalize_or_zero().as_vec3();
        if forward.cross(up).length_squared() < 1e-6 {
            up = if forward.y.abs() < 0.9 { Vec3::Y } else { Vec3::Z };
        }
        let view = Mat4::look_to_rh(Vec3::ZERO, forward, up);
        let projection = Mat4::perspective_infinite_reverse_rh(fov_y as f32, aspect, near);
        Self {
            position,
            fov_y,
            screen_height,
            view_projection: projection * view,
        }
    }

    /// `world` relative to the camera, narrowed after the subtraction.
    pub fn relative(&self, world: DVec3) -> Vec3 {
        (world - self.position).as_vec3()
    }
}
