//! Rectangular sub-regions of a cube face, as covered by one quadtree node.

use crate::CubeFace;

/// Errors produced when a region would be empty or leave the face.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegionError {
    /// A bound is NaN or infinite.
    #[error("region bounds must be finite: u=[{u0}, {u1}], v=[{v0}, {v1}]")]
    NonFinite { u0: f64, u1: f64, v0: f64, v1: f64 },

    /// The rectangle has zero or negative extent along an axis.
    #[error("degenerate region: u=[{u0}, {u1}], v=[{v0}, {v1}]")]
    Degenerate { u0: f64, u1: f64, v0: f64, v1: f64 },

    /// A bound lies outside the face's `[-1, 1]` parameter range.
    #[error("region exceeds face bounds [-1, 1]: u=[{u0}, {u1}], v=[{v0}, {v1}]")]
    OutOfRange { u0: f64, u1: f64, v0: f64, v1: f64 },
}

/// A cube face plus the UV rectangle `[u0, u1] × [v0, v1]` it covers.
///
/// Coordinates live in `[-1, 1]`. The depth is the number of bisections from
/// the face root. Regions are immutable once built.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CubeFaceRegion {
    face: CubeFace,
    u0: f64,
    u1: f64,
    v0: f64,
    v1: f64,
    depth: u32,
}

impl CubeFaceRegion {
    /// The whole face at depth 0.
    #[must_use]
    pub fn root(face: CubeFace) -> Self {
        Self {
            face,
            u0: -1.0,
            u1: 1.0,
            v0: -1.0,
            v1: 1.0,
            depth: 0,
        }
    }

    /// Build a region, rejecting non-finite, inverted, empty, or out-of-face bounds.
    pub fn new(
        face: CubeFace,
        (u0, u1): (f64, f64),
        (v0, v1): (f64, f64),
        depth: u32,
    ) -> Result<Self, RegionError> {
        if ![u0, u1, v0, v1].iter().all(|x| x.is_finite()) {
            return Err(RegionError::NonFinite { u0, u1, v0, v1 });
        }
        if u1 <= u0 || v1 <= v0 {
            return Err(RegionError::Degenerate { u0, u1, v0, v1 });
        }
        if u0 < -1.0 || u1 > 1.0 || v0 < -1.0 || v1 > 1.0 {
            return Err(RegionError::OutOfRange { u0, u1, v0, v1 });
        }
        Ok(Self {
            face,
            u0,
            u1,
            v0,
            v1,
            depth,
        })
    }

    pub fn face(&self) -> CubeFace {
        self.face
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// `(u0, u1)`
    pub fn u_range(&self) -> (f64, f64) {
        (self.u0, self.u1)
    }

    /// `(v0, v1)`
    pub fn v_range(&self) -> (f64, f64) {
        (self.v0, self.v1)
    }

    /// Extent along `u`.
    pub fn width(&self) -> f64 {
        self.u1 - self.u0
    }

    /// Extent along `v`.
    pub fn height(&self) -> f64 {
        self.v1 - self.v0
    }

    /// UV midpoint of the rectangle.
    pub fn mid_uv(&self) -> (f64, f64) {
        ((self.u0 + self.u1) * 0.5, (self.v0 + self.v1) * 0.5)
    }

    /// Whether `(u, v)` lies inside the closed rectangle.
    pub fn contains(&self, u: f64, v: f64) -> bool {
        (self.u0..=self.u1).contains(&u) && (self.v0..=self.v1).contains(&v)
    }

    /// The four quadrants produced by bisecting `u` and `v` at their midpoints.
    ///
    /// Ordered \[bottom-left, bottom-right, top-left, top-right\], where
    /// "bottom" is low `v` and "left" is low `u`.
    #[must_use]
    pub fn children(&self) -> [CubeFaceRegion; 4] {
        let (um, vm) = self.mid_uv();
        let depth = self.depth + 1;
        let quad = |u0, u1, v0, v1| CubeFaceRegion {
            face: self.face,
            u0,
            u1,
            v0,
            v1,
            depth,
        };
        [
            quad(self.u0, um, self.v0, vm),
            quad(um, self.u1, self.v0, vm),
            quad(self.u0, um, vm, self.v1),
            quad(um, self.u1, vm, self.v1),
        ]
    }

    /// The four corners followed by the four edge midpoints, as `(u, v)` pairs.
    #[must_use]
    pub fn corner_and_edge_points(&self) -> [(f64, f64); 8] {
        let (um, vm) = self.mid_uv();
        [
            (self.u0, self.v0),
            (self.u1, self.v0),
            (self.u0, self.v1),
            (self.u1, self.v1),
            (um, self.v0),
            (um, self.v1),
            (self.u0, vm),
            (self.u1, vm),
        ]
    }
}
