//! Displaced surface sampling shared by mesh generation and patch bounds.

use glam::DVec3;
use selene_cubesphere::{CubeFace, direction_to_lat_lon, face_uv_to_sphere};
use selene_terrain::Heightfield;

/// Planet-centred position of the displaced surface at face coordinate `(u, v)`.
///
/// Returns the position and the sampled elevation in metres.
pub fn surface_position(
    face: CubeFace,
    u: f64,
    v: f64,
    radius: f64,
    heightfield: &dyn Heightfield,
) -> (DVec3, f64) {
    let dir = face_uv_to_sphere(face, u, v);
    let (lat, lon) = direction_to_lat_lon(dir);
    let elevation = heightfield.sample(lat, lon);
    (dir * (radius + elevation), elevation)
}

/// Outward surface normal at `(u, v)` by central differencing over half a grid step.
///
/// Falls back to the radial direction when the tangent samples coincide.
pub fn surface_normal(
    face: CubeFace,
    u: f64,
    v: f64,
    half_step: (f64, f64),
    radius: f64,
    heightfield: &dyn Heightfield,
) -> DVec3 {
    let (hu, hv) = half_step;
    let sample = |su: f64, sv: f64| surface_position(face, su, sv, radius, heightfield).0;

    let du = sample(u + hu, v) - sample(u - hu, v);
    let dv = sample(u, v + hv) - sample(u, v - hv);
    let n = du.cross(dv);

    let len = n.length();
    if len > 1e-12 && len.is_finite() {
        n / len
    } else {
        face_uv_to_sphere(face, u, v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use selene_terrain::{FlatHeightfield, FnHeightfield};

    #[test]
    fn test_flat_surface_lies_on_radius() {
        for face in CubeFace::ALL {
            let (p, h) = surface_position(face, 0.3, -0.7, 1000.0, &FlatHeightfield);
            assert!((p.length() - 1000.0).abs() < 1e-9);
            assert_eq!(h, 0.0);
        }
    }

    #[test]
    fn test_elevation_is_added_along_radial() {
        let hf = FnHeightfield::new(|_lat: f64, _lon: f64| 25.0, 25.0);
        let (p, h) = surface_position(CubeFace::PosY, 0.0, 0.0, 100.0, &hf);
        assert_eq!(h, 25.0);
        assert!((p - DVec3::new(0.0, 125.0, 0.0)).length() < 1e-9);
    }

    #[test]
    fn test_flat_normal_is_radial_and_outward() {
        for face in CubeFace::ALL {
            let n = surface_normal(face, 0.2, 0.4, (0.01, 0.01), 500.0, &FlatHeightfield);
            let radial = face_uv_to_sphere(face, 0.2, 0.4);
            assert!((n.length() - 1.0).abs() < 1e-9);
            assert!(n.dot(radial) > 0.999, "face {face:?} normal {n:?}");
        }
    }

    #[test]
    fn test_zero_step_falls_back_to_radial() {
        let n = surface_normal(CubeFace::NegZ, 0.1, 0.1, (0.0, 0.0), 10.0, &FlatHeightfield);
        assert_eq!(n, face_uv_to_sphere(CubeFace::NegZ, 0.1, 0.1));
    }

    #[test]
    fn test_sloped_terrain_tilts_normal() {
        // Elevation rising with longitude tilts normals away from radial.
        let hf = FnHeightfield::new(|_lat: f64, lon: f64| lon * 50_000.0, 50_000.0 * std::f64::consts::PI);
        let n = surface_normal(CubeFace::PosX, 0.0, 0.0, (0.01, 0.01), 100_000.0, &hf);
        let radial = face_uv_to_sphere(CubeFace::PosX, 0.0, 0.0);
        assert!(n.dot(radial) < 0.99);
        assert!(n.dot(radial) > 0.0);
    }
}
