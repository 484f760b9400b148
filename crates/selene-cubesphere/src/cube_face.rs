//! The six faces of a cubesphere and their basis vectors.

use glam::DVec3;

/// The six faces of the cube that forms the cubesphere.
///
/// The discriminant is the face index used throughout the LOD engine.
/// Each face maps `(u, v) ∈ [-1, 1]²` to the cube point
/// `normal + u * tangent + v * bitangent`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum CubeFace {
    /// +X face: `(1, u, v)`
    PosX = 0,
    /// −X face: `(-1, -u, v)`
    NegX = 1,
    /// +Y face: `(u, 1, -v)`
    PosY = 2,
    /// −Y face: `(u, -1, v)`
    NegY = 3,
    /// +Z face: `(u, v, 1)`
    PosZ = 4,
    /// −Z face: `(-u, v, -1)`
    NegZ = 5,
}

impl CubeFace {
    /// All six faces in index order.
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PosX,
        CubeFace::NegX,
        CubeFace::PosY,
        CubeFace::NegY,
        CubeFace::PosZ,
        CubeFace::NegZ,
    ];

    /// Look up a face by its index (0–5).
    #[must_use]
    pub fn from_index(index: u8) -> Option<CubeFace> {
        Self::ALL.get(index as usize).copied()
    }

    /// The face index (0–5).
    #[must_use]
    pub fn index(self) -> u8 {
        self as u8
    }

    /// The opposite face (e.g., `PosX` → `NegX`).
    #[must_use]
    pub fn opposite(self) -> CubeFace {
        match self {
            CubeFace::PosX => CubeFace::NegX,
            CubeFace::NegX => CubeFace::PosX,
            CubeFace::PosY => CubeFace::NegY,
            CubeFace::NegY => CubeFace::PosY,
            CubeFace::PosZ => CubeFace::NegZ,
            CubeFace::NegZ => CubeFace::PosZ,
        }
    }

    /// Outward-pointing unit normal for this face.
    #[must_use]
    pub fn normal(self) -> DVec3 {
        match self {
            CubeFace::PosX => DVec3::X,
            CubeFace::NegX => DVec3::NEG_X,
            CubeFace::PosY => DVec3::Y,
            CubeFace::NegY => DVec3::NEG_Y,
            CubeFace::PosZ => DVec3::Z,
            CubeFace::NegZ => DVec3::NEG_Z,
        }
    }

    /// Tangent vector: direction of increasing `u` on this face.
    #[must_use]
    pub fn tangent(self) -> DVec3 {
        match self {
            CubeFace::PosX => DVec3::Y,
            CubeFace::NegX => DVec3::NEG_Y,
            CubeFace::PosY => DVec3::X,
            CubeFace::NegY => DVec3::X,
            CubeFace::PosZ => DVec3::X,
            CubeFace::NegZ => DVec3::NEG_X,
        }
    }

    /// Bitangent vector: direction of increasing `v` on this face.
    #[must_use]
    pub fn bitangent(self) -> DVec3 {
        match self {
            CubeFace::PosX => DVec3::Z,
            CubeFace::NegX => DVec3::Z,
            CubeFace::PosY => DVec3::NEG_Z,
            CubeFace::NegY => DVec3::Z,
            CubeFace::PosZ => DVec3::Y,
            CubeFace::NegZ => DVec3::Y,
        }
    }
}
