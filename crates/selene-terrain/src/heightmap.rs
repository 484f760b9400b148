//! Equirectangular elevation grid with bilinear sampling.
//!
//! Row 0 is the north pole (+Y), the last row is the south pole. Column 0 is
//! longitude −180°, and longitude wraps at the seam.

use std::f64::consts::PI;

use crate::{Heightfield, HeightmapError};

/// An equirectangular grid of elevations in metres.
#[derive(Clone, Debug)]
pub struct Heightmap {
    width: u32,
    height: u32,
    elevations: Vec<f32>,
    max_abs: f64,
}

impl Heightmap {
    /// Build a heightmap from row-major elevations in metres.
    pub fn from_grid(width: u32, height: u32, elevations: Vec<f32>) -> Result<Self, HeightmapError> {
        if width == 0 || height == 0 {
            return Err(HeightmapError::EmptyDimensions { width, height });
        }
        let expected = width as usize * height as usize;
        if elevations.len() != expected {
            return Err(HeightmapError::SampleCountMismatch {
                expected,
                actual: elevations.len(),
            });
        }
        let max_abs = elevations
            .iter()
            .fold(0.0_f64, |acc, &e| acc.max(f64::from(e).abs()));
        Ok(Self {
            width,
            height,
            elevations,
            max_abs,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn at(&self, x: usize, y: usize) -> f64 {
        f64::from(self.elevations[y * self.width as usize + x])
    }
}

impl Heightfield for Heightmap {
    fn sample(&self, lat: f64, lon: f64) -> f64 {
        let w = self.width as usize;
        let h = self.height as usize;

        let mut px = (lon / (2.0 * PI) + 0.5) * (w - 1) as f64;
        let py = ((0.5 - lat / PI) * (h - 1) as f64).clamp(0.0, (h - 1) as f64);
        if !px.is_finite() || !py.is_finite() {
            return 0.0;
        }

        // Wrap longitude at the seam.
        px = px.rem_euclid(w as f64);

        let x0 = (px.floor() as usize).min(w - 1);
        let y0 = (py.floor() as usize).min(h - 1);
        let x1 = (x0 + 1) % w;
        let y1 = (y0 + 1).min(h - 1);

        let fx = px - x0 as f64;
        let fy = py - y0 as f64;

        let top = self.at(x0, y0) * (1.0 - fx) + self.at(x1, y0) * fx;
        let bottom = self.at(x0, y1) * (1.0 - fx) + self.at(x1, y1) * fx;
        top * (1.0 - fy) + bottom * fy
    }

    fn max_displacement(&self) -> f64 {
        self.max_abs
    }
}
