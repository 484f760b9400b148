//! Scripted camera descent from orbit toward the surface.

use glam::DVec3;
use selene_config::{CameraConfig, WindowConfig};
use selene_cubesphere::direction_to_lat_lon;
use selene_lod::CameraState;
use selene_terrain::Heightfield;

/// Straight-down descent along a fixed direction from the body's centre.
///
/// Altitude is measured from the terrain under the camera and shrinks by a
/// fixed fraction each frame until it reaches the floor.
#[derive(Clone, Debug)]
pub struct DescentPath {
    direction: DVec3,
    radius: f64,
    altitude: f64,
    min_altitude: f64,
    descent_rate: f64,
    fov_y: f64,
    aspect: f32,
    screen_height: f64,
}

impl DescentPath {
    pub fn new(direction: DVec3, radius: f64, camera: &CameraConfig, window: &WindowConfig) -> Self {
        let mut direction = direction.normalize_or_zero();
        if direction == DVec3::ZERO {
            direction = DVec3::X;
        }
        Self {
            direction,
            radius,
            altitude: camera.start_altitude_m.max(camera.min_altitude_m),
            min_altitude: camera.min_altitude_m.max(1.0),
            descent_rate: camera.descent_rate.clamp(0.0, 1.0),
            fov_y: camera.fov_y_degrees.to_radians(),
            aspect: window.width.max(1) as f32 / window.height.max(1) as f32,
            screen_height: f64::from(window.height.max(1)),
        }
    }

    pub fn altitude(&self) -> f64 {
        self.altitude
    }

    /// Camera for the current altitude, looking at the body's centre.
    pub fn camera(&self, heightfield: &dyn Heightfield) -> CameraState {
        let (lat, lon) = direction_to_lat_lon(self.direction);
        let surface = self.radius + heightfield.sample(lat, lon);
        let position = self.direction * (surface + self.altitude);
        let up = if self.direction.y.abs() < 0.9 { DVec3::Y } else { DVec3::Z };
        // Near plane scales with altitude to keep depth precision near the ground.
        let near = (self.altitude * 0.01).clamp(0.1, 1000.0) as f32;
        CameraState::looking_at(
            position,
            DVec3::ZERO,
            up,
            self.fov_y,
            self.aspect,
            near,
            self.screen_height,
        )
    }

    pub fn advance(&mut self) {
        self.altitude = (self.altitude * (1.0 - self.descent_rate)).max(self.min_altitude);
    }
}
