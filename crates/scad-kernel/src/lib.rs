//! Public entry points: `parse` turns source text into a
//! syntax tree, `evaluate` walks that tree against a caller-supplied
//! [`CsgKernel`] and produces the mesh interchange format. [`Kernel`] wraps
//! both behind the single-slot render queue for callers
//! that want jobs serialized and cancellable by deadline; [`evaluate`] itself
//! is a direct, unqueued call for embedding in a caller that already owns
//! its own scheduling.

mod mesh;
mod options;

pub use mesh::{to_mesh, Mesh};
pub use options::EvalOptions;

pub use scad_ast::stmt::Stmt;
pub use scad_csg::{CsgKernel, GeometryHandle, HandleModifier, Rgba};
pub use scad_diagnostics::{Diagnostic, DiagnosticCode, Diagnostics, Severity};
pub use scad_queue::{JobOptions, JobOutcome, ProgressCallback, ProgressStage, RenderQueue};

use scad_eval::Evaluator;
use scad_import::Resolver;
use scad_value::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info_span;

/// The result of [`parse`]: a best-effort tree plus whatever diagnostics
/// were recorded resynchronizing past malformed input.
#[derive(Debug, Clone, Default)]
pub struct ParseResult {
    pub tree: Vec<Stmt>,
    pub diagnostics: Diagnostics,
}

/// Tokenizes and parses `source`. Deterministic:
/// parsing the same bytes twice yields structurally equal trees and
/// identical diagnostics.
pub fn parse(source: &str) -> ParseResult {
    let result = scad_parser::parse(source);
    ParseResult { tree: result.program, diagnostics: result.diagnostics }
}

/// The result of [`evaluate`]: `mesh` is absent when the root produced no
/// geometry, in which case `diagnostics` explains why.
#[derive(Debug, Clone, Default)]
pub struct EvalResult {
    pub mesh: Option<Mesh>,
    pub diagnostics: Vec<Diagnostic>,
    pub elapsed_ms: u64,
    /// Rendered `echo()` output, in evaluation order.
    pub echoes: Vec<String>,
}

/// Evaluates an already-parsed `tree` against `kernel` directly, bypassing
/// the render queue. Suitable for a caller that owns its own scheduling;
/// [`Kernel::submit`] is the queued equivalent for callers that want the
/// single-slot FIFO render job model instead.
pub fn evaluate<K: CsgKernel>(tree: &[Stmt], kernel: &K, options: EvalOptions) -> EvalResult {
    let start = Instant::now();
    let span = info_span!("evaluate");
    let _enter = span.enter();

    let resolver = Resolver::new(options.current_dir.clone()).with_library_paths(options.library_paths.clone());
    let mut evaluator = Evaluator::new(kernel, resolver).with_deadline(options.timeout());
    seed_options(&mut evaluator, &options);

    let handle = evaluator.eval_program(tree);
    let mesh = handle.and_then(|h| to_mesh(kernel, &h).ok());

    EvalResult {
        mesh,
        diagnostics: evaluator.diagnostics.into_vec(),
        elapsed_ms: start.elapsed().as_millis() as u64,
        echoes: evaluator.echoes,
    }
}

/// Parses and evaluates `source` in one call — the common case when the
/// caller has no pre-parsed tree to reuse.
pub fn parse_and_evaluate<K: CsgKernel>(source: &str, kernel: &K, options: EvalOptions) -> EvalResult {
    let parsed = parse(source);
    let mut result = evaluate(&parsed.tree, kernel, options);
    let mut diagnostics = parsed.diagnostics;
    diagnostics.extend(Diagnostics::from_iter(result.diagnostics.drain(..)));
    diagnostics.sort_by_position();
    result.diagnostics = diagnostics.into_vec();
    result
}

fn seed_options<K: CsgKernel>(evaluator: &mut Evaluator<K>, options: &EvalOptions) {
    let (fn_, fa, fs) = options.fragment_defaults;
    evaluator.env.bind("$preview", Value::Bool(options.preview_mode));
    evaluator.env.bind("$fn", Value::Number(fn_));
    evaluator.env.bind("$fa", Value::Number(fa));
    evaluator.env.bind("$fs", Value::Number(fs));
}

/// The queued form of the public API: one script at a time, through the
/// single-slot FIFO render queue. Owns the worker
/// thread and the process-wide caches for its lifetime.
pub struct Kernel<K: CsgKernel + Send + Sync + 'static> {
    queue: RenderQueue,
    kernel: Arc<K>,
}

impl<K: CsgKernel + Send + Sync + 'static> Kernel<K> {
    pub fn new(kernel: Arc<K>) -> Self {
        Kernel { queue: RenderQueue::new(Arc::clone(&kernel)), kernel }
    }

    /// Enqueues `script` and resolves once the queue's worker reaches and
    /// finishes it, with its `JobOutcome` converted into the mesh
    /// interchange format via the same [`to_mesh`] conversion [`evaluate`]
    /// uses.
    pub async fn submit(&self, script: String, options: EvalOptions, progress: Option<ProgressCallback>) -> EvalResult {
        let job = scad_queue::RenderJob { script, options: options.into(), progress_callback: progress };
        let outcome = self.queue.enqueue(job).await.unwrap_or_else(|_| JobOutcome {
            handle: None,
            diagnostics: Diagnostics::new(),
            echoes: Vec::new(),
            elapsed: Duration::ZERO,
        });
        self.finish(outcome)
    }

    fn finish(&self, outcome: JobOutcome) -> EvalResult {
        let mesh = outcome.handle.and_then(|h| to_mesh(self.kernel.as_ref(), &h).ok());
        EvalResult {
            mesh,
            diagnostics: outcome.diagnostics.into_vec(),
            elapsed_ms: outcome.elapsed.as_millis() as u64,
            echoes: outcome.echoes,
        }
    }

    pub fn shutdown(self) {
        self.queue.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scad_csg::{Bounds, JoinType, KernelResult, Mat4, ManifoldStatus, RawMesh, Vec3};
    use std::sync::atomic::{AtomicU64, Ordering};

    /// A minimal kernel whose `to_mesh` always returns a unit-cube mesh with
    /// no precomputed normals, so tests exercise this crate's own
    /// area-weighted-normal fallback rather than any kernel-provided one.
    struct CubeKernel {
        next_id: AtomicU64,
    }

    impl CubeKernel {
        fn new() -> Self {
            CubeKernel { next_id: AtomicU64::new(1) }
        }

        fn handle(&self) -> GeometryHandle {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            GeometryHandle::new(scad_csg::HandleId(id), id, None)
        }
    }

    impl CsgKernel for CubeKernel {
        fn cube(&self, _size: Vec3, _center: bool) -> KernelResult<GeometryHandle> {
            Ok(self.handle())
        }
        fn sphere(&self, _radius: f64, _segments: u32) -> KernelResult<GeometryHandle> {
            Ok(self.handle())
        }
        fn cylinder(&self, _h: f64, _r1: f64, _r2: f64, _segments: u32, _center: bool) -> KernelResult<GeometryHandle> {
            Ok(self.handle())
        }
        fn cone(&self, _h: f64, _r1: f64, _r2: f64, _segments: u32, _center: bool) -> KernelResult<GeometryHandle> {
            Ok(self.handle())
        }
        fn circle(&self, _radius: f64, _segments: u32) -> KernelResult<GeometryHandle> {
            Ok(self.handle())
        }
        fn square(&self, _size: [f64; 2], _center: bool) -> KernelResult<GeometryHandle> {
            Ok(self.handle())
        }
        fn polygon(&self, _points: Vec<[f64; 2]>) -> KernelResult<GeometryHandle> {
            Ok(self.handle())
        }
        fn polyhedron(&self, _points: Vec<Vec3>, _faces: Vec<Vec<u32>>) -> KernelResult<GeometryHandle> {
            Ok(self.handle())
        }
        fn text(&self, _text: String, _size: f64, _font: Option<String>) -> KernelResult<GeometryHandle> {
            Ok(self.handle())
        }
        fn surface(&self, _path: &str, _center: bool, _invert: bool) -> KernelResult<GeometryHandle> {
            Ok(self.handle())
        }
        fn translate(&self, _h: &GeometryHandle, _v: Vec3) -> KernelResult<GeometryHandle> {
            Ok(self.handle())
        }
        fn rotate(&self, _h: &GeometryHandle, _euler_degrees: Vec3) -> KernelResult<GeometryHandle> {
            Ok(self.handle())
        }
        fn scale(&self, _h: &GeometryHandle, _v: Vec3) -> KernelResult<GeometryHandle> {
            Ok(self.handle())
        }
        fn mirror(&self, _h: &GeometryHandle, _plane_normal: Vec3) -> KernelResult<GeometryHandle> {
            Ok(self.handle())
        }
        fn multmatrix(&self, _h: &GeometryHandle, _matrix: Mat4) -> KernelResult<GeometryHandle> {
            Ok(self.handle())
        }
        fn resize(&self, _h: &GeometryHandle, _size: Vec3, _auto: [bool; 3]) -> KernelResult<GeometryHandle> {
            Ok(self.handle())
        }
        fn union(&self, _a: &GeometryHandle, _b: &GeometryHandle) -> KernelResult<GeometryHandle> {
            Ok(self.handle())
        }
        fn union_multiple(&self, _hs: &[GeometryHandle]) -> KernelResult<GeometryHandle> {
            Ok(self.handle())
        }
        fn subtract(&self, _a: &GeometryHandle, _b: &GeometryHandle) -> KernelResult<GeometryHandle> {
            Ok(self.handle())
        }
        fn intersect(&self, _a: &GeometryHandle, _b: &GeometryHandle) -> KernelResult<GeometryHandle> {
            Ok(self.handle())
        }
        fn hull(&self, _hs: &[GeometryHandle]) -> KernelResult<GeometryHandle> {
            Ok(self.handle())
        }
        fn minkowski(&self, _hs: &[GeometryHandle]) -> KernelResult<GeometryHandle> {
            Ok(self.handle())
        }
        fn linear_extrude(&self, _h: &GeometryHandle, _height: f64, _twist: f64, _scale: [f64; 2], _slices: u32) -> KernelResult<GeometryHandle> {
            Ok(self.handle())
        }
        fn rotate_extrude(&self, _h: &GeometryHandle, _angle: f64, _segments: u32) -> KernelResult<GeometryHandle> {
            Ok(self.handle())
        }
        fn project_3d_to_2d(&self, _h: &GeometryHandle, _cut: bool) -> KernelResult<GeometryHandle> {
            Ok(self.handle())
        }
        fn slice_3d_to_2d(&self, _h: &GeometryHandle, _z: f64) -> KernelResult<GeometryHandle> {
            Ok(self.handle())
        }
        fn offset_2d(&self, _h: &GeometryHandle, _delta: f64, _join: JoinType, _miter_limit: f64, _segments: u32) -> KernelResult<GeometryHandle> {
            Ok(self.handle())
        }
        fn to_mesh(&self, _h: &GeometryHandle) -> KernelResult<RawMesh> {
            // An axis-aligned unit cube, 8 vertices / 12 triangles, matching
            // scenario 1.
            let vertices = vec![
                0.0, 0.0, 0.0, 10.0, 0.0, 0.0, 10.0, 10.0, 0.0, 0.0, 10.0, 0.0, 0.0, 0.0, 10.0, 10.0, 0.0, 10.0, 10.0, 10.0, 10.0, 0.0, 10.0, 10.0,
            ];
            #[rustfmt::skip]
            let indices = vec![
                0, 1, 2, 0, 2, 3,
                4, 6, 5, 4, 7, 6,
                0, 4, 5, 0, 5, 1,
                1, 5, 6, 1, 6, 2,
                2, 6, 7, 2, 7, 3,
                3, 7, 4, 3, 4, 0,
            ];
            Ok(RawMesh { vertices, indices, normals: None })
        }
        fn status(&self, _h: &GeometryHandle) -> ManifoldStatus {
            ManifoldStatus::Manifold
        }
    }

    #[allow(dead_code)]
    fn unused_anchor(_: Bounds) {}

    #[test]
    fn parse_then_evaluate_cube_produces_spec_bounds() {
        let parsed = parse("cube(10);");
        assert!(parsed.diagnostics.is_empty());
        let kernel = CubeKernel::new();
        let result = evaluate(&parsed.tree, &kernel, EvalOptions::default());
        let mesh = result.mesh.expect("cube should produce a mesh");
        assert_eq!(mesh.bounds.min, (0.0, 0.0, 0.0));
        assert_eq!(mesh.bounds.max, (10.0, 10.0, 10.0));
        assert_eq!(mesh.stats.vertex_count, 8);
        assert_eq!(mesh.stats.face_count, 12);
        assert_eq!(mesh.normals.len(), mesh.vertices.len());
    }

    #[test]
    fn parse_and_evaluate_merges_parse_and_eval_diagnostics_in_position_order() {
        let kernel = CubeKernel::new();
        let result = parse_and_evaluate("assert(false, \"nope\"); cube(1);", &kernel, EvalOptions::default());
        assert!(result.mesh.is_some());
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].code, Some(DiagnosticCode::AssertionFailed));
    }

    #[test]
    fn failed_program_has_no_mesh_and_explains_why() {
        let kernel = CubeKernel::new();
        let result = parse_and_evaluate("not_a_module();", &kernel, EvalOptions::default());
        assert!(result.mesh.is_none());
        assert!(!result.diagnostics.is_empty());
    }

    #[tokio::test]
    async fn queued_kernel_resolves_with_the_same_mesh_shape() {
        let kernel = Kernel::new(Arc::new(CubeKernel::new()));
        let result = kernel.submit("cube(10);".to_string(), EvalOptions::default(), None).await;
        assert!(result.mesh.is_some());
        kernel.shutdown();
    }
}
