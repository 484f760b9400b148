//! Stateless generator for displaced patch meshes.
//!
//! A patch mesh is an `N × N` vertex grid over a cube-face UV rectangle,
//! projected onto the sphere and pushed out by the heightfield, followed by
//! four skirt strips that hang below the boundary edges. Triangles are
//! counter-clockwise when viewed from outside the body.

use glam::DVec3;
use selene_cubesphere::{CubeFace, CubeFaceRegion};
use selene_terrain::Heightfield;

use crate::{MeshBuildError, PatchVertex, surface_normal, surface_position};

/// Largest accepted grid resolution; keeps indices comfortably inside `u32`.
pub const MAX_GRID_RESOLUTION: u32 = 4096;

/// Skirt depth in grid cells, scaled by the patch's UV width.
const SKIRT_DEPTH_CELLS: f64 = 3.0;

/// Lateral skirt offset as a fraction of the skirt depth.
const SKIRT_LATERAL_FRACTION: f64 = 0.5;

/// CPU-side mesh produced by [`PatchMeshBuilder::build`].
#[derive(Clone, Debug, PartialEq)]
pub struct PatchMeshData {
    /// Grid vertices first (row-major, `v` major), then the four skirt strips.
    pub vertices: Vec<PatchVertex>,
    /// Grid triangles first, then skirt triangles.
    pub indices: Vec<u32>,
    /// Displaced surface point at the region's UV midpoint, planet-centred.
    pub world_center: DVec3,
    /// Number of leading vertices that belong to the surface grid.
    pub grid_vertex_count: u32,
    /// Number of leading indices that belong to the surface grid.
    pub grid_index_count: u32,
}

impl PatchMeshData {
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Total bytes this mesh occupies once uploaded.
    pub fn byte_size(&self) -> u64 {
        (self.vertex_bytes().len() + self.index_bytes().len()) as u64
    }
}

/// Builds patch meshes for a body of fixed radius at a fixed grid resolution.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PatchMeshBuilder {
    radius: f64,
    resolution: u32,
}

impl PatchMeshBuilder {
    /// `resolution` is the number of vertices along each patch edge.
    pub fn new(radius: f64, resolution: u32) -> Result<Self, MeshBuildError> {
        if resolution < 2 {
            return Err(MeshBuildError::ResolutionTooLow { resolution });
        }
        if resolution > MAX_GRID_RESOLUTION {
            return Err(MeshBuildError::ResolutionTooHigh { resolution });
        }
        if !radius.is_finite() || radius <= 0.0 {
            return Err(MeshBuildError::InvalidRadius { radius });
        }
        Ok(Self { radius, resolution })
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Displaced surface point at the region's UV midpoint.
    pub fn world_center(&self, region: &CubeFaceRegion, heightfield: &dyn Heightfield) -> DVec3 {
        let (mu, mv) = region.mid_uv();
        surface_position(region.face(), mu, mv, self.radius, heightfield).0
    }

    /// Build a mesh from raw face index and UV bounds, validating both.
    pub fn build_rect(
        &self,
        face_index: u8,
        u_range: (f64, f64),
        v_range: (f64, f64),
        depth: u32,
        heightfield: &dyn Heightfield,
    ) -> Result<PatchMeshData, MeshBuildError> {
        let face =
            CubeFace::from_index(face_index).ok_or(MeshBuildError::InvalidFace { index: face_index })?;
        let region = CubeFaceRegion::new(face, u_range, v_range, depth)?;
        Ok(self.build(&region, heightfield))
    }

    /// Build the mesh for `region`. Output depends only on the inputs.
    pub fn build(&self, region: &CubeFaceRegion, heightfield: &dyn Heightfield) -> PatchMeshData {
        let n = self.resolution as usize;
        let face = region.face();
        let (u0, u1) = region.u_range();
        let (v0, v1) = region.v_range();
        let step_u = (u1 - u0) / (n - 1) as f64;
        let step_v = (v1 - v0) / (n - 1) as f64;
        let half_step = (0.5 * step_u, 0.5 * step_v);

        // The last sample snaps to the exact bound so neighbours share edge vertices.
        let coord = |i: usize, lo: f64, hi: f64, step: f64| {
            if i == n - 1 { hi } else { lo + i as f64 * step }
        };

        let world_center = self.world_center(region, heightfield);

        let mut world = Vec::with_capacity(n * n);
        let mut vertices = Vec::with_capacity(n * n + 4 * n);
        for j in 0..n {
            let v = coord(j, v0, v1, step_v);
            for i in 0..n {
                let u = coord(i, u0, u1, step_u);
                let (p, height) = surface_position(face, u, v, self.radius, heightfield);
                let normal = surface_normal(face, u, v, half_step, self.radius, heightfield);
                world.push(p);
                vertices.push(PatchVertex::new(
                    (p - world_center).as_vec3().to_array(),
                    normal.as_vec3().to_array(),
                    height as f32,
                ));
            }
        }

        let mut indices = Vec::with_capacity(6 * (n - 1) * (n - 1) + 4 * 6 * (n - 1));
        for j in 0..n - 1 {
            for i in 0..n - 1 {
                let a = (j * n + i) as u32;
                let b = a + 1;
                let c = a + n as u32;
                let d = c + 1;
                indices.extend_from_slice(&[a, b, c, b, d, c]);
            }
        }
        let grid_index_count = indices.len() as u32;

        let skirt_depth = SKIRT_DEPTH_CELLS * (u1 - u0) * self.radius / (n - 1) as f64;
        let ni = n as isize;
        // (first vertex, stride along the edge, step towards the interior, flip)
        let edges: [(usize, usize, isize, bool); 4] = [
            (0, 1, ni, false),
            ((n - 1) * n, 1, -ni, true),
            (0, n, 1, true),
            (n - 1, n, -1, false),
        ];

        for (start, stride, inward_step, flip) in edges {
            let base = vertices.len() as u32;
            for k in 0..n {
                let e = start + k * stride;
                let interior = (e as isize + inward_step) as usize;
                let p = world[e];
                let down = -p.normalize_or_zero() * skirt_depth;
                let out = (p - world[interior]).normalize_or_zero()
                    * (SKIRT_LATERAL_FRACTION * skirt_depth);
                let s = p + down + out;
                let edge_vertex = vertices[e];
                vertices.push(PatchVertex::new(
                    (s - world_center).as_vec3().to_array(),
                    edge_vertex.normal,
                    edge_vertex.height,
                ));
            }
            for k in 0..n - 1 {
                let e0 = (start + k * stride) as u32;
                let e1 = e0 + stride as u32;
                let s0 = base + k as u32;
                let s1 = s0 + 1;
                if flip {
                    indices.extend_from_slice(&[e0, e1, s0, s0, e1, s1]);
                } else {
                    indices.extend_from_slice(&[e0, s0, e1, e1, s0, s1]);
                }
            }
        }

        PatchMeshData {
            vertices,
            indices,
            world_center,
            grid_vertex_count: (n * n) as u32,
            grid_index_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use selene_cubesphere::{RegionError, face_uv_to_sphere};
    use selene_terrain::{FlatHeightfield, FnHeightfield};

    const MOON_RADIUS: f64 = 1_737_400.0;

    fn world_of(mesh: &PatchMeshData, index: u32) -> DVec3 {
        let p = mesh.vertices[index as usize].position;
        mesh.world_center + DVec3::new(p[0] as f64, p[1] as f64, p[2] as f64)
    }

    fn descend(region: CubeFaceRegion, path: &[usize]) -> CubeFaceRegion {
        path.iter().fold(region, |r, &q| r.children()[q])
    }

    #[test]
    fn test_rejects_low_resolution() {
        assert_eq!(
            PatchMeshBuilder::new(1.0, 1),
            Err(MeshBuildError::ResolutionTooLow { resolution: 1 })
        );
    }

    #[test]
    fn test_rejects_bad_radius() {
        assert!(matches!(
            PatchMeshBuilder::new(0.0, 33),
            Err(MeshBuildError::InvalidRadius { .. })
        ));
        assert!(matches!(
            PatchMeshBuilder::new(f64::NAN, 33),
            Err(MeshBuildError::InvalidRadius { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_face_and_degenerate_rect() {
        let builder = PatchMeshBuilder::new(10.0, 5).unwrap();
        let err = builder
            .build_rect(6, (-1.0, 1.0), (-1.0, 1.0), 0, &FlatHeightfield)
            .unwrap_err();
        assert_eq!(err, MeshBuildError::InvalidFace { index: 6 });

        let err = builder
            .build_rect(0, (0.5, 0.5), (-1.0, 1.0), 0, &FlatHeightfield)
            .unwrap_err();
        assert!(matches!(err, MeshBuildError::Region(RegionError::Degenerate { .. })));
    }

    #[test]
    fn test_vertex_and_index_counts() {
        let builder = PatchMeshBuilder::new(10.0, 5).unwrap();
        let mesh = builder.build(&CubeFaceRegion::root(CubeFace::PosZ), &FlatHeightfield);
        assert_eq!(mesh.grid_vertex_count, 25);
        assert_eq!(mesh.vertices.len(), 25 + 4 * 5);
        assert_eq!(mesh.grid_index_count, 4 * 4 * 6);
        assert_eq!(mesh.indices.len(), 4 * 4 * 6 + 4 * 4 * 6);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
        assert_eq!(mesh.byte_size(), (45 * 28 + 192 * 4) as u64);
    }

    #[test]
    fn test_build_is_deterministic() {
        let hf = FnHeightfield::new(|lat: f64, lon: f64| 300.0 * (3.0 * lat).sin() * (2.0 * lon).cos(), 300.0);
        let builder = PatchMeshBuilder::new(MOON_RADIUS, 33).unwrap();
        let region = descend(CubeFaceRegion::root(CubeFace::NegY), &[2, 1]);
        let a = builder.build(&region, &hf);
        let b = builder.build(&region, &hf);
        assert_eq!(a.vertex_bytes(), b.vertex_bytes());
        assert_eq!(a.index_bytes(), b.index_bytes());
        assert_eq!(a.world_center, b.world_center);
    }

    #[test]
    fn test_flat_grid_lies_on_sphere() {
        let builder = PatchMeshBuilder::new(1000.0, 9).unwrap();
        for face in CubeFace::ALL {
            let mesh = builder.build(&CubeFaceRegion::root(face), &FlatHeightfield);
            for i in 0..mesh.grid_vertex_count {
                let r = world_of(&mesh, i).length();
                assert!((r - 1000.0).abs() < 1e-3, "face {face:?} vertex {i} at r={r}");
            }
        }
    }

    #[test]
    fn test_world_center_is_midpoint_sample() {
        let builder = PatchMeshBuilder::new(500.0, 5).unwrap();
        let hf = FnHeightfield::new(|_: f64, _: f64| 20.0, 20.0);
        let region = descend(CubeFaceRegion::root(CubeFace::PosX), &[3]);
        let mesh = builder.build(&region, &hf);
        let (mu, mv) = region.mid_uv();
        let expected = face_uv_to_sphere(CubeFace::PosX, mu, mv) * 520.0;
        assert!((mesh.world_center - expected).length() < 1e-9);
    }

    #[test]
    fn test_height_attribute_and_displacement() {
        let builder = PatchMeshBuilder::new(1000.0, 5).unwrap();
        let hf = FnHeightfield::new(|_: f64, _: f64| 100.0, 100.0);
        let mesh = builder.build(&CubeFaceRegion::root(CubeFace::PosY), &hf);
        for i in 0..mesh.grid_vertex_count {
            assert_eq!(mesh.vertices[i as usize].height, 100.0);
            assert!((world_of(&mesh, i).length() - 1100.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_normals_are_unit_length() {
        let hf = FnHeightfield::new(|lat: f64, lon: f64| 2000.0 * lat.cos() * lon.sin(), 2000.0);
        let builder = PatchMeshBuilder::new(MOON_RADIUS, 17).unwrap();
        let mesh = builder.build(&CubeFaceRegion::root(CubeFace::NegX), &hf);
        for v in &mesh.vertices {
            let n = glam::Vec3::from_array(v.normal);
            assert!((n.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_skirts_hang_below_surface() {
        let builder = PatchMeshBuilder::new(1000.0, 9).unwrap();
        let mesh = builder.build(&CubeFaceRegion::root(CubeFace::NegZ), &FlatHeightfield);
        for i in mesh.grid_vertex_count..mesh.vertices.len() as u32 {
            assert!(world_of(&mesh, i).length() < 1000.0 - 1e-3);
        }
    }

    #[test]
    fn test_grid_triangles_wind_ccw_from_outside() {
        let builder = PatchMeshBuilder::new(MOON_RADIUS, 9).unwrap();
        for face in CubeFace::ALL {
            let region = descend(CubeFaceRegion::root(face), &[0, 3]);
            let mesh = builder.build(&region, &FlatHeightfield);
            for tri in mesh.indices[..mesh.grid_index_count as usize].chunks(3) {
                let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| world_of(&mesh, i));
                let n = (b - a).cross(c - a);
                assert!(n.dot(a) > 0.0, "inward triangle on face {face:?}");
            }
        }
    }

    #[test]
    fn test_skirt_triangles_face_away_from_patch() {
        let builder = PatchMeshBuilder::new(MOON_RADIUS, 9).unwrap();
        for face in CubeFace::ALL {
            let region = descend(CubeFaceRegion::root(face), &[1, 2, 0]);
            let mesh = builder.build(&region, &FlatHeightfield);
            for tri in mesh.indices[mesh.grid_index_count as usize..].chunks(3) {
                let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| world_of(&mesh, i));
                let n = (b - a).cross(c - a);
                let centroid = (a + b + c) / 3.0;
                assert!(
                    n.dot(centroid - mesh.world_center) > 0.0,
                    "skirt triangle faces inward on face {face:?}"
                );
            }
        }
    }

    #[test]
    fn test_sibling_patches_share_edge_vertices() {
        let hf = FnHeightfield::new(
            |lat: f64, lon: f64| 1500.0 * (5.0 * lat).sin() + 800.0 * (7.0 * lon).cos(),
            2300.0,
        );
        let builder = PatchMeshBuilder::new(MOON_RADIUS, 33).unwrap();
        let n = 33u32;
        for face in CubeFace::ALL {
            let parent = descend(CubeFaceRegion::root(face), &[2, 2, 1]);
            let [bl, br, tl, _tr] = parent.children();
            let left = builder.build(&bl, &hf);
            let right = builder.build(&br, &hf);
            let top = builder.build(&tl, &hf);
            for k in 0..n {
                // Shared vertical edge: u = u1 of BL and u = u0 of BR.
                let a = world_of(&left, k * n + (n - 1));
                let b = world_of(&right, k * n);
                assert!((a - b).length() < 0.05, "face {face:?} row {k}: {a:?} vs {b:?}");

                // Shared horizontal edge: v = v1 of BL and v = v0 of TL.
                let c = world_of(&left, (n - 1) * n + k);
                let d = world_of(&top, k);
                assert!((c - d).length() < 0.05, "face {face:?} col {k}: {c:?} vs {d:?}");
            }
        }
    }
}
