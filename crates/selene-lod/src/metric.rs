//! Screen-space error: the projected pixel size of one mesh cell.

use glam::DVec3;

/// World-space size of one grid cell of a patch with this bounding radius.
pub fn geometric_error(bounding_radius: f64, grid_resolution: u32) -> f64 {
    2.0 * bounding_radius / f64::from(grid_resolution.max(2) - 1)
}

/// Pinhole projection of a patch's geometric error into pixels.
///
/// Distance is floored at a tenth of the bounding radius so the error stays
/// finite with the camera inside the bounding sphere.
pub fn screen_space_error(
    bounding_radius: f64,
    grid_resolution: u32,
    world_center: DVec3,
    camera_position: DVec3,
    fov_y: f64,
    screen_height: f64,
) -> f64 {
    let distance = (world_center - camera_position)
        .length()
        .max(bounding_radius * 0.1);
    let pixels_per_radian = screen_height / (2.0 * (fov_y * 0.5).tan());
    geometric_error(bounding_radius, grid_resolution) / distance * pixels_per_radian
}

#[cfg(test)]
mod tests {
    use super::*;

    const FOV: f64 = 70.0 * std::f64::consts::PI / 180.0;

    #[test]
    fn test_geometric_error_is_cell_size() {
        assert_eq!(geometric_error(32.0, 33), 2.0);
    }

    #[test]
    fn test_error_grows_as_camera_approaches() {
        let center = DVec3::new(1000.0, 0.0, 0.0);
        let mut previous = 0.0;
        for d in [100_000.0, 50_000.0, 10_000.0, 2_000.0, 500.0, 120.0] {
            let cam = center + DVec3::new(d, 0.0, 0.0);
            let e = screen_space_error(1000.0, 33, center, cam, FOV, 720.0);
            assert!(e >= previous, "error fell from {previous} to {e} at d={d}");
            previous = e;
        }
    }

    #[test]
    fn test_error_shrinks_as_camera_recedes() {
        let center = DVec3::ZERO;
        let near = screen_space_error(500.0, 33, center, DVec3::new(0.0, 2_000.0, 0.0), FOV, 720.0);
        let far = screen_space_error(500.0, 33, center, DVec3::new(0.0, 4_000.0, 0.0), FOV, 720.0);
        assert!(far < near);
        assert!((near / far - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_distance_floor_inside_bounding_sphere() {
        let inside = screen_space_error(1000.0, 33, DVec3::ZERO, DVec3::ZERO, FOV, 720.0);
        let at_floor = screen_space_error(1000.0, 33, DVec3::ZERO, DVec3::new(100.0, 0.0, 0.0), FOV, 720.0);
        assert!(inside.is_finite());
        assert_eq!(inside, at_floor);
    }

    #[test]
    fn test_error_scales_with_screen_height() {
        let cam = DVec3::new(0.0, 0.0, 10_000.0);
        let a = screen_space_error(100.0, 33, DVec3::ZERO, cam, FOV, 720.0);
        let b = screen_space_error(100.0, 33, DVec3::ZERO, cam, FOV, 1440.0);
        assert!((b / a - 2.0).abs() < 1e-12);
    }
}
