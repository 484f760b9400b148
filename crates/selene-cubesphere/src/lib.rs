//! Cube-sphere geometry: cube faces, cube-to-sphere projection, face regions, and lat/lon mapping.

mod cube_face;
mod geo;
mod projection;
mod region;

pub use cube_face::CubeFace;
pub use geo::{direction_to_lat_lon, lat_lon_to_direction};
pub use projection::{face_uv_to_cube_point, face_uv_to_sphere};
pub use region::{CubeFaceRegion, RegionError};
