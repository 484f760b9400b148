//! Patch mesh generation: displaced cube-sphere grids with normals and crack-hiding skirts.

pub mod builder;
pub mod error;
pub mod surface;
pub mod vertex;
pub mod vertex_format;

pub use builder::{PatchMeshBuilder, PatchMeshData};
pub use error::MeshBuildError;
pub use surface::{surface_normal, surface_position};
pub use vertex::PatchVertex;
pub use vertex_format::{PATCH_VERTEX_ATTRIBUTES, PATCH_VERTEX_LAYOUT, patch_vertex_buffer_layout};
