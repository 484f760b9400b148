//! Conversion between unit directions and latitude/longitude.
//!
//! Y is the polar axis: latitude is measured from the XZ plane toward +Y, and
//! longitude is `atan2(z, x)`.

use glam::DVec3;

/// Latitude and longitude (radians) of a unit direction.
///
/// The `y` component is clamped to `[-1, 1]` before `asin` so that slightly
/// denormalized inputs never produce NaN.
#[inline]
#[must_use]
pub fn direction_to_lat_lon(dir: DVec3) -> (f64, f64) {
    let lat = dir.y.clamp(-1.0, 1.0).asin();
    let lon = dir.z.atan2(dir.x);
    (lat, lon)
}

/// Unit direction for a latitude/longitude pair (radians).
#[inline]
#[must_use]
pub fn lat_lon_to_direction(lat: f64, lon: f64) -> DVec3 {
    let (sin_lat, cos_lat) = lat.sin_cos();
    let (sin_lon, cos_lon) = lon.sin_cos();
    DVec3::new(cos_lat * cos_lon, sin_lat, cos_lat * sin_lon)
}
