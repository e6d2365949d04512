//! Conversion from a [`GeometryHandle`] to the mesh interchange format:
//! bounds, stats, and the area-weighted-normal fallback when the kernel
//! supplies none.

use scad_csg::{Bounds, CsgKernel, GeometryHandle, HandleModifier, KernelError, MeshStats, RawMesh, Rgba};

/// `vertices`/`indices`/`normals`/`bounds`/`stats` plus the optional
/// `color`/`modifier` side-band.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
    pub normals: Vec<f32>,
    pub bounds: Bounds,
    pub stats: MeshStats,
    pub color: Option<Rgba>,
    pub modifier: Option<HandleModifier>,
}

/// Calls `kernel.to_mesh(handle)`, then fills in bounds/stats and, if the
/// kernel didn't supply normals, computes them.
pub fn to_mesh<K: CsgKernel>(kernel: &K, handle: &GeometryHandle) -> Result<Mesh, KernelError> {
    let raw = kernel.to_mesh(handle)?;
    Ok(from_raw(raw, handle))
}

fn from_raw(raw: RawMesh, handle: &GeometryHandle) -> Mesh {
    let RawMesh { vertices, indices, normals } = raw;
    let normals = normals.unwrap_or_else(|| area_weighted_normals(&vertices, &indices));
    let bounds = Bounds::from_vertices(&vertices).unwrap_or(Bounds { min: (0.0, 0.0, 0.0), max: (0.0, 0.0, 0.0) });
    let stats = MeshStats { vertex_count: vertices.len() / 3, face_count: indices.len() / 3 };
    Mesh { vertices, indices, normals, bounds, stats, color: handle.color, modifier: handle.modifier }
}

type V3 = [f32; 3];

fn sub(a: V3, b: V3) -> V3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn add(a: V3, b: V3) -> V3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

fn cross(a: V3, b: V3) -> V3 {
    [a[1] * b[2] - a[2] * b[1], a[2] * b[0] - a[0] * b[2], a[0] * b[1] - a[1] * b[0]]
}

fn length(v: V3) -> f32 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

fn scale(v: V3, s: f32) -> V3 {
    [v[0] * s, v[1] * s, v[2] * s]
}

fn vertex_at(vertices: &[f32], i: usize) -> V3 {
    [vertices[i * 3], vertices[i * 3 + 1], vertices[i * 3 + 2]]
}

/// Per-vertex normals as area-weighted averages of adjacent face normals,
/// normalized, falling back to the first contributing (unnormalized) face
/// normal when the weighted sum is zero-length.
fn area_weighted_normals(vertices: &[f32], indices: &[u32]) -> Vec<f32> {
    let vertex_count = vertices.len() / 3;
    let mut accum = vec![[0.0f32; 3]; vertex_count];
    let mut first_face = vec![None::<V3>; vertex_count];

    for tri in indices.chunks_exact(3) {
        let (ia, ib, ic) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        let (a, b, c) = (vertex_at(vertices, ia), vertex_at(vertices, ib), vertex_at(vertices, ic));
        // The unnormalized cross product's magnitude is twice the triangle's
        // area, so summing it directly across shared vertices gives an
        // area-weighted average without a separate weighting pass.
        let face_normal = cross(sub(b, a), sub(c, a));
        for &i in &[ia, ib, ic] {
            accum[i] = add(accum[i], face_normal);
            first_face[i].get_or_insert(face_normal);
        }
    }

    let mut normals = vec![0.0f32; vertices.len()];
    for (i, sum) in accum.into_iter().enumerate() {
        let len = length(sum);
        let n = if len > 1e-12 {
            scale(sum, 1.0 / len)
        } else {
            match first_face[i] {
                Some(face) if length(face) > 1e-12 => scale(face, 1.0 / length(face)),
                _ => [0.0, 0.0, 1.0],
            }
        };
        normals[i * 3..i * 3 + 3].copy_from_slice(&n);
    }
    normals
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_quad_normals_point_along_z() {
        let vertices = vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0];
        let indices = vec![0, 1, 2, 0, 2, 3];
        let normals = area_weighted_normals(&vertices, &indices);
        for chunk in normals.chunks_exact(3) {
            assert!((chunk[2] - 1.0).abs() < 1e-4, "expected +z normal, got {chunk:?}");
        }
    }

    #[test]
    fn degenerate_triangle_falls_back_without_panicking() {
        // Three coincident points: zero-area, zero cross product.
        let vertices = vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let indices = vec![0, 1, 2];
        let normals = area_weighted_normals(&vertices, &indices);
        assert_eq!(normals.len(), 9);
        assert!(normals.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn bounds_and_stats_match_vertex_and_index_counts() {
        struct Noop;
        impl scad_csg::CsgKernel for Noop {
            fn cube(&self, _: scad_csg::Vec3, _: bool) -> scad_csg::KernelResult<GeometryHandle> {
                unreachable!()
            }
            fn sphere(&self, _: f64, _: u32) -> scad_csg::KernelResult<GeometryHandle> {
                unreachable!()
            }
            fn cylinder(&self, _: f64, _: f64, _: f64, _: u32, _: bool) -> scad_csg::KernelResult<GeometryHandle> {
                unreachable!()
            }
            fn cone(&self, _: f64, _: f64, _: f64, _: u32, _: bool) -> scad_csg::KernelResult<GeometryHandle> {
                unreachable!()
            }
            fn circle(&self, _: f64, _: u32) -> scad_csg::KernelResult<GeometryHandle> {
                unreachable!()
            }
            fn square(&self, _: [f64; 2], _: bool) -> scad_csg::KernelResult<GeometryHandle> {
                unreachable!()
            }
            fn polygon(&self, _: Vec<[f64; 2]>) -> scad_csg::KernelResult<GeometryHandle> {
                unreachable!()
            }
            fn polyhedron(&self, _: Vec<scad_csg::Vec3>, _: Vec<Vec<u32>>) -> scad_csg::KernelResult<GeometryHandle> {
                unreachable!()
            }
            fn text(&self, _: String, _: f64, _: Option<String>) -> scad_csg::KernelResult<GeometryHandle> {
                unreachable!()
            }
            fn surface(&self, _: &str, _: bool, _: bool) -> scad_csg::KernelResult<GeometryHandle> {
                unreachable!()
            }
            fn translate(&self, _: &GeometryHandle, _: scad_csg::Vec3) -> scad_csg::KernelResult<GeometryHandle> {
                unreachable!()
            }
            fn rotate(&self, _: &GeometryHandle, _: scad_csg::Vec3) -> scad_csg::KernelResult<GeometryHandle> {
                unreachable!()
            }
            fn scale(&self, _: &GeometryHandle, _: scad_csg::Vec3) -> scad_csg::KernelResult<GeometryHandle> {
                unreachable!()
            }
            fn mirror(&self, _: &GeometryHandle, _: scad_csg::Vec3) -> scad_csg::KernelResult<GeometryHandle> {
                unreachable!()
            }
            fn multmatrix(&self, _: &GeometryHandle, _: scad_csg::Mat4) -> scad_csg::KernelResult<GeometryHandle> {
                unreachable!()
            }
            fn resize(&self, _: &GeometryHandle, _: scad_csg::Vec3, _: [bool; 3]) -> scad_csg::KernelResult<GeometryHandle> {
                unreachable!()
            }
            fn union(&self, _: &GeometryHandle, _: &GeometryHandle) -> scad_csg::KernelResult<GeometryHandle> {
                unreachable!()
            }
            fn union_multiple(&self, _: &[GeometryHandle]) -> scad_csg::KernelResult<GeometryHandle> {
                unreachable!()
            }
            fn subtract(&self, _: &GeometryHandle, _: &GeometryHandle) -> scad_csg::KernelResult<GeometryHandle> {
                unreachable!()
            }
            fn intersect(&self, _: &GeometryHandle, _: &GeometryHandle) -> scad_csg::KernelResult<GeometryHandle> {
                unreachable!()
            }
            fn hull(&self, _: &[GeometryHandle]) -> scad_csg::KernelResult<GeometryHandle> {
                unreachable!()
            }
            fn minkowski(&self, _: &[GeometryHandle]) -> scad_csg::KernelResult<GeometryHandle> {
                unreachable!()
            }
            fn linear_extrude(&self, _: &GeometryHandle, _: f64, _: f64, _: [f64; 2], _: u32) -> scad_csg::KernelResult<GeometryHandle> {
                unreachable!()
            }
            fn rotate_extrude(&self, _: &GeometryHandle, _: f64, _: u32) -> scad_csg::KernelResult<GeometryHandle> {
                unreachable!()
            }
            fn project_3d_to_2d(&self, _: &GeometryHandle, _: bool) -> scad_csg::KernelResult<GeometryHandle> {
                unreachable!()
            }
            fn slice_3d_to_2d(&self, _: &GeometryHandle, _: f64) -> scad_csg::KernelResult<GeometryHandle> {
                unreachable!()
            }
            fn offset_2d(&self, _: &GeometryHandle, _: f64, _: scad_csg::JoinType, _: f64, _: u32) -> scad_csg::KernelResult<GeometryHandle> {
                unreachable!()
            }
            fn to_mesh(&self, _: &GeometryHandle) -> scad_csg::KernelResult<RawMesh> {
                Ok(RawMesh {
                    vertices: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0],
                    indices: vec![0, 1, 2],
                    normals: None,
                })
            }
            fn status(&self, _: &GeometryHandle) -> scad_csg::ManifoldStatus {
                scad_csg::ManifoldStatus::Manifold
            }
        }

        let handle = GeometryHandle::new(scad_csg::HandleId(1), 1, None);
        let mesh = to_mesh(&Noop, &handle).expect("to_mesh");
        assert_eq!(mesh.stats.vertex_count, 3);
        assert_eq!(mesh.stats.face_count, 1);
        assert_eq!(mesh.bounds.max, (1.0, 1.0, 0.0));
    }
}
