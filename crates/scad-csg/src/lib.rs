//! The external, manifold-based CSG kernel contract.
//!
//! This crate defines only the *interface* the evaluator consumes: booleans,
//! affine transforms, extrusion, and mesh extraction. The kernel itself
//! (Boolean solvers, hull/Minkowski algorithms, tessellation) is explicitly
//! out of scope and is supplied by whatever implements
//! [`CsgKernel`] — this crate never implements one.

mod handle;
mod mesh;

pub use handle::{GeometryHandle, HandleId, HandleModifier, Rgba};
pub use mesh::{Bounds, ManifoldStatus, MeshStats, RawMesh};

use thiserror::Error;

/// A 3-component vector (position, scale, or Euler angles in degrees).
pub type Vec3 = [f64; 3];

/// A flattened row-major 4x4 affine matrix, as used by `multmatrix`.
pub type Mat4 = [f64; 16];

/// Failure reported by the CSG kernel, e.g. a refused operation or
/// non-manifold result (`kernel_error`).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct KernelError(pub String);

impl KernelError {
    pub fn new(message: impl Into<String>) -> Self {
        KernelError(message.into())
    }
}

pub type KernelResult<T> = Result<T, KernelError>;

/// The join style for 2D `offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Round,
    Miter,
}

/// The operations the evaluator's dispatcher (`scad-eval`) calls against an
/// external, manifold-guaranteeing CSG backend.
///
/// Every geometric method takes and returns [`GeometryHandle`]s by value;
/// handles are cheap to clone (reference-counted) and are never mutated in
/// place. Every handle a kernel returns is either manifold, or the call
/// fails with a [`KernelError`] instead of silently returning broken
/// geometry.
pub trait CsgKernel {
    // --- Primitives ---
    fn cube(&self, size: Vec3, center: bool) -> KernelResult<GeometryHandle>;
    fn sphere(&self, radius: f64, segments: u32) -> KernelResult<GeometryHandle>;
    fn cylinder(&self, height: f64, r1: f64, r2: f64, segments: u32, center: bool) -> KernelResult<GeometryHandle>;
    fn cone(&self, height: f64, r1: f64, r2: f64, segments: u32, center: bool) -> KernelResult<GeometryHandle>;
    fn circle(&self, radius: f64, segments: u32) -> KernelResult<GeometryHandle>;
    fn square(&self, size: [f64; 2], center: bool) -> KernelResult<GeometryHandle>;
    fn polygon(&self, points: Vec<[f64; 2]>) -> KernelResult<GeometryHandle>;
    fn polyhedron(&self, points: Vec<Vec3>, faces: Vec<Vec<u32>>) -> KernelResult<GeometryHandle>;
    fn text(&self, text: String, size: f64, font: Option<String>) -> KernelResult<GeometryHandle>;
    fn surface(&self, path: &str, center: bool, invert: bool) -> KernelResult<GeometryHandle>;

    // --- Affine transforms ---
    fn translate(&self, h: &GeometryHandle, v: Vec3) -> KernelResult<GeometryHandle>;
    fn rotate(&self, h: &GeometryHandle, euler_degrees: Vec3) -> KernelResult<GeometryHandle>;
    fn scale(&self, h: &GeometryHandle, v: Vec3) -> KernelResult<GeometryHandle>;
    fn mirror(&self, h: &GeometryHandle, plane_normal: Vec3) -> KernelResult<GeometryHandle>;
    fn multmatrix(&self, h: &GeometryHandle, matrix: Mat4) -> KernelResult<GeometryHandle>;
    fn resize(&self, h: &GeometryHandle, size: Vec3, auto: [bool; 3]) -> KernelResult<GeometryHandle>;

    // --- Booleans ---
    fn union(&self, a: &GeometryHandle, b: &GeometryHandle) -> KernelResult<GeometryHandle>;
    fn union_multiple(&self, hs: &[GeometryHandle]) -> KernelResult<GeometryHandle>;
    fn subtract(&self, a: &GeometryHandle, b: &GeometryHandle) -> KernelResult<GeometryHandle>;
    fn intersect(&self, a: &GeometryHandle, b: &GeometryHandle) -> KernelResult<GeometryHandle>;
    fn hull(&self, hs: &[GeometryHandle]) -> KernelResult<GeometryHandle>;
    fn minkowski(&self, hs: &[GeometryHandle]) -> KernelResult<GeometryHandle>;

    // --- 2D / extrusion ---
    fn linear_extrude(
        &self,
        h_2d: &GeometryHandle,
        height: f64,
        twist_degrees: f64,
        scale: [f64; 2],
        slices: u32,
    ) -> KernelResult<GeometryHandle>;
    fn rotate_extrude(&self, h_2d: &GeometryHandle, angle_degrees: f64, segments: u32) -> KernelResult<GeometryHandle>;
    fn project_3d_to_2d(&self, h: &GeometryHandle, cut: bool) -> KernelResult<GeometryHandle>;
    fn slice_3d_to_2d(&self, h: &GeometryHandle, z: f64) -> KernelResult<GeometryHandle>;
    fn offset_2d(
        &self,
        h_2d: &GeometryHandle,
        delta: f64,
        join: JoinType,
        miter_limit: f64,
        segments: u32,
    ) -> KernelResult<GeometryHandle>;

    // --- Extraction ---
    fn to_mesh(&self, h: &GeometryHandle) -> KernelResult<RawMesh>;
    fn status(&self, h: &GeometryHandle) -> ManifoldStatus;
}
