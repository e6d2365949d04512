//! The mesh interchange format ("Mesh interchange format").

/// Axis-aligned bounding box over a mesh's vertices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: (f32, f32, f32),
    pub max: (f32, f32, f32),
}

impl Bounds {
    /// Computes bounds from a flat `x, y, z, x, y, z, ...` vertex buffer.
    /// Returns `None` for an empty buffer.
    pub fn from_vertices(vertices: &[f32]) -> Option<Bounds> {
        if vertices.is_empty() || vertices.len() % 3 != 0 {
            return None;
        }
        let mut min = (f32::INFINITY, f32::INFINITY, f32::INFINITY);
        let mut max = (f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY);
        for chunk in vertices.chunks_exact(3) {
            let (x, y, z) = (chunk[0], chunk[1], chunk[2]);
            min = (min.0.min(x), min.1.min(y), min.2.min(z));
            max = (max.0.max(x), max.1.max(y), max.2.max(z));
        }
        Some(Bounds { min, max })
    }
}

/// Vertex and face counts reported alongside a mesh (`stats`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshStats {
    pub vertex_count: usize,
    pub face_count: usize,
}

/// Manifold-validity status reported by the kernel for a handle
/// (`status(H)`).
#[derive(Debug, Clone, PartialEq)]
pub enum ManifoldStatus {
    Manifold,
    NonManifold { reason: String },
}

/// The raw mesh data returned by [`crate::CsgKernel::to_mesh`], before the
/// evaluator attaches color/modifier metadata and computes bounds/stats.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawMesh {
    /// Flat `x, y, z, ...` positions; length divisible by 3.
    pub vertices: Vec<f32>,
    /// Flat triangle indices into `vertices`; length divisible by 3.
    pub indices: Vec<u32>,
    /// Per-vertex normals, parallel to `vertices`, if the kernel supplies
    /// them. If `None`, the evaluator computes area-weighted face-normal
    /// averages.
    pub normals: Option<Vec<f32>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_from_vertices_computes_min_max() {
        let verts = vec![0.0, 0.0, 0.0, 10.0, 10.0, 10.0, 5.0, -5.0, 2.0];
        let bounds = Bounds::from_vertices(&verts).unwrap();
        assert_eq!(bounds.min, (0.0, -5.0, 0.0));
        assert_eq!(bounds.max, (10.0, 10.0, 10.0));
    }

    #[test]
    fn bounds_from_empty_vertices_is_none() {
        assert!(Bounds::from_vertices(&[]).is_none());
    }
}
