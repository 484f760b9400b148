//! Cube-to-sphere projection.
//!
//! A face coordinate `(u, v) ∈ [-1, 1]²` is first placed on the surface of the
//! `[-1, 1]` cube using the face basis, then normalized onto the unit sphere.

use glam::DVec3;

use crate::CubeFace;

/// Place a face coordinate on the surface of the `[-1, 1]` cube.
///
/// The face center `(0, 0)` maps to the face normal.
#[inline]
#[must_use]
pub fn face_uv_to_cube_point(face: CubeFace, u: f64, v: f64) -> DVec3 {
    face.normal() + u * face.tangent() + v * face.bitangent()
}

/// Project a face coordinate onto the unit sphere.
///
/// Returns a unit-length direction. All computation is in `f64`.
#[inline]
#[must_use]
pub fn face_uv_to_sphere(face: CubeFace, u: f64, v: f64) -> DVec3 {
    face_uv_to_cube_point(face, u, v).normalize()
}
