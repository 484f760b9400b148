//! Quadtree nodes and the arena that owns them.
//!
//! Nodes reference their children by [`PatchId`] rather than owning them, so
//! tearing down a subtree is an explicit loop instead of a recursive drop.

use glam::DVec3;
use selene_cubesphere::{CubeFaceRegion, face_uv_to_sphere};
use selene_render::GpuPatchMesh;

/// Stable handle to a node in a [`PatchArena`].
///
/// The generation makes a handle to a removed node fail lookups instead of
/// aliasing whatever later reuses its slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PatchId {
    index: u32,
    generation: u32,
}

/// One quadtree node: a cube-face region, its bounds, an optional device mesh,
/// and either no children or exactly four.
#[derive(Debug)]
pub struct Patch<B> {
    region: CubeFaceRegion,
    world_center: DVec3,
    bounding_radius: f64,
    pub(crate) mesh: Option<GpuPatchMesh<B>>,
    pub(crate) children: Option<[PatchId; 4]>,
}

impl<B> Patch<B> {
    pub fn new(region: CubeFaceRegion, world_center: DVec3, bounding_radius: f64) -> Self {
        Self {
            region,
            world_center,
            bounding_radius,
            mesh: None,
            children: None,
        }
    }

    pub fn region(&self) -> &CubeFaceRegion {
        &self.region
    }

    pub fn depth(&self) -> u32 {
        self.region.depth()
    }

    pub fn world_center(&self) -> DVec3 {
        self.world_center
    }

    pub fn bounding_radius(&self) -> f64 {
        self.bounding_radius
    }

    pub fn mesh(&self) -> Option<&GpuPatchMesh<B>> {
        self.mesh.as_ref()
    }

    pub fn children(&self) -> Option<&[PatchId; 4]> {
        self.children.as_ref()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    /// A leaf that has a mesh to draw.
    pub fn is_drawable(&self) -> bool {
        self.is_leaf() && self.mesh.is_some()
    }
}

/// Conservative radius around `world_center` covering the region.
///
/// Takes the farthest corner or edge midpoint on the reference sphere, then
/// adds twice the heightfield's maximum displacement: once for the centre
/// sample, once for the surface being bounded.
pub fn bounding_radius(
    region: &CubeFaceRegion,
    world_center: DVec3,
    radius: f64,
    max_displacement: f64,
) -> f64 {
    let reach = region
        .corner_and_edge_points()
        .iter()
        .map(|&(u, v)| (face_uv_to_sphere(region.face(), u, v) * radius - world_center).length())
        .fold(0.0_f64, f64::max);
    reach + 2.0 * max_displacement.abs()
}

#[derive(Debug)]
struct Slot<B> {
    generation: u32,
    patch: Option<Patch<B>>,
}

/// Slab of patches with a free list.
#[derive(Debug)]
pub struct PatchArena<B> {
    slots: Vec<Slot<B>>,
    free: Vec<u32>,
    live: usize,
}

impl<B> Default for PatchArena<B> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }
}

impl<B> PatchArena<B> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, patch: Patch<B>) -> PatchId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.patch = Some(patch);
            return PatchId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            patch: Some(patch),
        });
        PatchId {
            index,
            generation: 0,
        }
    }

    pub fn get(&self, id: PatchId) -> Option<&Patch<B>> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.patch.as_ref())
    }

    pub fn get_mut(&mut self, id: PatchId) -> Option<&mut Patch<B>> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.patch.as_mut())
    }

    /// Remove a node, returning it with any mesh and child links it still holds.
    pub fn remove(&mut self, id: PatchId) -> Option<Patch<B>> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let patch = slot.patch.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
        Some(patch)
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (PatchId, &Patch<B>)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.patch.as_ref().map(|patch| {
                (
                    PatchId {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    patch,
                )
            })
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Patch<B>> {
        self.slots.iter_mut().filter_map(|slot| slot.patch.as_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use selene_cubesphere::CubeFace;

    fn leaf() -> Patch<()> {
        Patch::new(CubeFaceRegion::root(CubeFace::PosX), DVec3::X, 1.0)
    }

    #[test]
    fn test_insert_get_remove() {
        let mut arena = PatchArena::new();
        let id = arena.insert(leaf());
        assert_eq!(arena.len(), 1);
        assert!(arena.get(id).unwrap().is_leaf());
        assert!(arena.remove(id).is_some());
        assert!(arena.get(id).is_none());
        assert!(arena.is_empty());
    }

    #[test]
    fn test_stale_id_does_not_alias_reused_slot() {
        let mut arena = PatchArena::new();
        let old = arena.insert(leaf());
        arena.remove(old);
        let new = arena.insert(leaf());
        assert_ne!(old, new);
        assert!(arena.get(old).is_none());
        assert!(arena.get(new).is_some());
        assert!(arena.remove(old).is_none());
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn test_iter_visits_live_nodes_only() {
        let mut arena = PatchArena::new();
        let a = arena.insert(leaf());
        let b = arena.insert(leaf());
        arena.remove(a);
        let ids: Vec<_> = arena.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![b]);
    }

    #[test]
    fn test_drawable_requires_leaf_and_mesh() {
        let mut patch = leaf();
        assert!(!patch.is_drawable());
        patch.mesh = Some(GpuPatchMesh {
            vertex_buffer: (),
            index_buffer: (),
            index_count: 6,
            byte_size: 0,
        });
        assert!(patch.is_drawable());
        let mut arena = PatchArena::<()>::new();
        let ids = [(); 4].map(|_| arena.insert(leaf()));
        patch.children = Some(ids);
        assert!(!patch.is_drawable());
    }

    #[test]
    fn test_bounding_radius_covers_corners() {
        let region = CubeFaceRegion::root(CubeFace::PosY);
        let center = face_uv_to_sphere(CubeFace::PosY, 0.0, 0.0) * 1000.0;
        let r = bounding_radius(&region, center, 1000.0, 0.0);
        for (u, v) in region.corner_and_edge_points() {
            let p = face_uv_to_sphere(CubeFace::PosY, u, v) * 1000.0;
            assert!((p - center).length() <= r + 1e-9);
        }
    }

    #[test]
    fn test_bounding_radius_adds_displacement_margin() {
        let region = CubeFaceRegion::root(CubeFace::NegX).children()[2];
        let (mu, mv) = region.mid_uv();
        let center = face_uv_to_sphere(CubeFace::NegX, mu, mv) * 500.0;
        let flat = bounding_radius(&region, center, 500.0, 0.0);
        let bumpy = bounding_radius(&region, center, 500.0, 12.0);
        assert!((bumpy - flat - 24.0).abs() < 1e-9);
    }
}
