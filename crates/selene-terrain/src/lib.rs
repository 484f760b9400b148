//! Elevation sources for the planetary surface: the `Heightfield` query trait,
//! a flat fallback, and an equirectangular heightmap loaded from disk.

mod error;
mod heightfield;
mod heightmap;
mod loader;

pub use error::HeightmapError;
pub use heightfield::{FlatHeightfield, FnHeightfield, Heightfield};
pub use heightmap::Heightmap;
pub use loader::{HeightmapImport, load_heightmap, load_or_flat};
