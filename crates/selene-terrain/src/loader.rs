//! Heightmap import from 16-bit grayscale images.

use std::path::Path;
use std::sync::Arc;

use crate::{FlatHeightfield, Heightfield, Heightmap, HeightmapError};

/// How raw 16-bit samples map to elevations in metres.
///
/// `elevation = offset + sample / 65535 * scale`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeightmapImport {
    pub elevation_scale_m: f64,
    pub elevation_offset_m: f64,
}

impl Default for HeightmapImport {
    /// A ±10 km relief range, which covers lunar topography.
    fn default() -> Self {
        Self {
            elevation_scale_m: 20_000.0,
            elevation_offset_m: -10_000.0,
        }
    }
}

/// Load an equirectangular heightmap from a grayscale image on disk.
///
/// Color images are converted to luma first.
pub fn load_heightmap(path: &Path, import: &HeightmapImport) -> Result<Heightmap, HeightmapError> {
    let image = image::open(path)
        .map_err(|source| HeightmapError::Decode {
            path: path.to_path_buf(),
            source,
        })?
        .into_luma16();

    let (width, height) = image.dimensions();
    let elevations = image
        .into_raw()
        .into_iter()
        .map(|raw| {
            (import.elevation_offset_m + f64::from(raw) / 65535.0 * import.elevation_scale_m) as f32
        })
        .collect();

    Heightmap::from_grid(width, height, elevations)
}

/// Load a heightmap if a path is given, falling back to a flat sphere when the
/// path is absent or the file cannot be read.
pub fn load_or_flat(path: Option<&Path>, import: &HeightmapImport) -> Arc<dyn Heightfield> {
    let Some(path) = path else {
        tracing::info!("No heightmap configured, using a flat sphere");
        return Arc::new(FlatHeightfield);
    };

    match load_heightmap(path, import) {
        Ok(map) => {
            tracing::info!(
                "Loaded heightmap {} ({}x{}, max displacement {:.1} m)",
                path.display(),
                map.width(),
                map.height(),
                map.max_displacement()
            );
            Arc::new(map)
        }
        Err(e) => {
            tracing::warn!("Heightmap unavailable, using a flat sphere: {e}");
            Arc::new(FlatHeightfield)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma};

    fn write_png(path: &Path, width: u32, height: u32, samples: Vec<u16>) {
        let buffer: ImageBuffer<Luma<u16>, Vec<u16>> =
            ImageBuffer::from_raw(width, height, samples).unwrap();
        buffer.save(path).unwrap();
    }

    #[test]
    fn test_load_png_applies_scale_and_offset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relief.png");
        write_png(&path, 2, 2, vec![0, 65535, 0, 65535]);

        let import = HeightmapImport {
            elevation_scale_m: 1000.0,
            elevation_offset_m: -200.0,
        };
        let map = load_heightmap(&path, &import).unwrap();
        assert_eq!(map.width(), 2);
        assert_eq!(map.height(), 2);
        assert!((map.max_displacement() - 800.0).abs() < 1e-3);
    }

    #[test]
    fn test_missing_file_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_heightmap(&dir.path().join("absent.png"), &HeightmapImport::default())
            .unwrap_err();
        assert!(matches!(err, HeightmapError::Decode { .. }));
    }

    #[test]
    fn test_missing_file_falls_back_to_flat() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.png");
        let field = load_or_flat(Some(&path), &HeightmapImport::default());
        assert_eq!(field.sample(0.3, 1.0), 0.0);
        assert_eq!(field.max_displacement(), 0.0);
    }

    #[test]
    fn test_no_path_is_flat() {
        let field = load_or_flat(None, &HeightmapImport::default());
        assert_eq!(field.sample(-1.0, 2.0), 0.0);
    }

    #[test]
    fn test_loaded_map_is_sampled_through_trait_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flat_high.png");
        write_png(&path, 4, 2, vec![65535; 8]);
        let import = HeightmapImport {
            elevation_scale_m: 500.0,
            elevation_offset_m: 0.0,
        };
        let field = load_or_flat(Some(&path), &import);
        assert!((field.sample(0.2, -2.0) - 500.0).abs() < 1e-3);
    }
}
