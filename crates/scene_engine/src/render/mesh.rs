//! Mesh geometry
//!
//! Pure data: positions, optional normals and texture coordinates, and one
//! index list per submesh. Backends upload and bind it; the scene only needs
//! the submesh count and the bounding box for culling.

use serde::{Deserialize, Serialize};

use crate::foundation::math::Vec3;
use crate::foundation::uid;
use crate::scene::AABB;

/// Vertex and index data of a mesh
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshData {
    /// Vertex positions
    pub positions: Vec<Vec3>,
    /// Vertex normals (empty or one per position)
    pub normals: Vec<Vec3>,
    /// Texture coordinates (empty or one per position)
    pub uvs: Vec<[f32; 2]>,
    /// Triangle index lists, one per submesh
    pub submeshes: Vec<Vec<u32>>,
}

impl MeshData {
    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Total number of indices over all submeshes
    pub fn index_count(&self) -> usize {
        self.submeshes.iter().map(Vec::len).sum()
    }

    /// Bounding box of all positions
    pub fn compute_aabb(&self) -> Option<AABB> {
        AABB::from_points(&self.positions)
    }
}

/// A named mesh with cached bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    /// Unique id used for sorting and snapshot references
    pub uid: u32,
    /// Display name
    pub name: String,
    data: MeshData,
    aabb: Option<AABB>,
}

impl Mesh {
    /// Create a mesh and compute its bounds
    pub fn new(name: impl Into<String>, data: MeshData) -> Self {
        let aabb = data.compute_aabb();
        Self {
            uid: uid::next_uid(),
            name: name.into(),
            data,
            aabb,
        }
    }

    /// Geometry
    pub fn data(&self) -> &MeshData {
        &self.data
    }

    /// Replace the geometry and recompute bounds
    pub fn set_data(&mut self, data: MeshData) {
        self.aabb = data.compute_aabb();
        self.data = data;
    }

    /// Object-space bounds, `None` for an empty mesh
    pub fn aabb(&self) -> Option<AABB> {
        self.aabb
    }

    /// Number of submeshes
    pub fn submesh_count(&self) -> usize {
        self.data.submeshes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mesh_bounds_follow_data() {
        let mut mesh = Mesh::new("triangle", MeshData {
            positions: vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 2.0, 0.0)],
            submeshes: vec![vec![0, 1, 2]],
            ..MeshData::default()
        });
        assert_eq!(mesh.aabb().unwrap().max, Vec3::new(1.0, 2.0, 0.0));
        assert_eq!(mesh.submesh_count(), 1);

        mesh.set_data(MeshData::default());
        assert!(mesh.aabb().is_none());
        assert_eq!(mesh.data().index_count(), 0);
    }
}
