//! The single-slot FIFO render queue and memory monitor:
//! serializes jobs through one dedicated worker, reports progress stages,
//! and runs cache cleanup between jobs.

pub mod memory;
pub mod progress;

use memory::MemoryMonitor;
pub use memory::MemoryPressure;
pub use progress::{ProgressCallback, ProgressStage};
use progress::ProgressReporter;

use scad_cache::Caches;
use scad_csg::{CsgKernel, GeometryHandle};
use scad_diagnostics::Diagnostics;
use scad_error::EvalError;
use scad_eval::{EvalLimits, Evaluator};
use scad_import::Resolver;
use scad_value::Value;
use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, info_span};

/// The configuration surface a job carries through evaluation
/// (`options`).
#[derive(Debug, Clone)]
pub struct JobOptions {
    pub preview_mode: bool,
    pub disable_parallel: bool,
    pub timeout: Duration,
    /// `($fn, $fa, $fs)`.
    pub fragment_defaults: (f64, f64, f64),
    pub library_paths: Vec<PathBuf>,
    pub current_dir: PathBuf,
}

impl Default for JobOptions {
    fn default() -> Self {
        JobOptions {
            preview_mode: false,
            disable_parallel: false,
            timeout: Duration::from_secs(30),
            fragment_defaults: (0.0, 12.0, 2.0),
            library_paths: Vec::new(),
            current_dir: PathBuf::from("."),
        }
    }
}

/// One script submitted to the queue, plus an optional progress sink.
pub struct RenderJob {
    pub script: String,
    pub options: JobOptions,
    pub progress_callback: Option<ProgressCallback>,
}

/// The result of running one job: either geometry plus diagnostics, or just
/// diagnostics explaining why nothing was produced (`result`).
pub struct JobOutcome {
    pub handle: Option<GeometryHandle>,
    pub diagnostics: Diagnostics,
    pub echoes: Vec<String>,
    pub elapsed: Duration,
}

struct Envelope {
    job: RenderJob,
    reply: oneshot::Sender<JobOutcome>,
}

/// A single-slot FIFO queue: exactly one job evaluates at a time
/// ("Scheduling model"), processed on one dedicated worker
/// thread so evaluating one job never blocks accepting the next `enqueue`.
pub struct RenderQueue {
    sender: Sender<Envelope>,
    worker: Option<JoinHandle<()>>,
}

impl RenderQueue {
    /// Spawns the worker thread bound to one [`CsgKernel`] instance, shared
    /// across every job the queue ever runs.
    pub fn new<K: CsgKernel + Send + Sync + 'static>(kernel: Arc<K>) -> Self {
        let (sender, receiver) = mpsc::channel::<Envelope>();
        let worker = std::thread::spawn(move || {
            let mut caches = Caches::new();
            let mut monitor = MemoryMonitor::new();
            for envelope in receiver {
                // Pressure classified from the *previous* job's cleanup
                // decides whether this job starts in chunked mode; there is
                // no mid-job resampling point below the statement boundary.
                let chunked = monitor.pressure() >= MemoryPressure::High;
                monitor.start_job();
                let outcome = run_job(envelope.job, kernel.as_ref(), &mut caches, chunked);
                monitor.report_bytes(estimate_cache_bytes(&caches));
                monitor.clean_between_jobs(&mut caches);
                let _ = envelope.reply.send(outcome);
            }
        });
        RenderQueue { sender, worker: Some(worker) }
    }

    /// Enqueues a job and returns a future that resolves once the worker
    /// reaches it and finishes (`enqueue(...) -> future<result>`).
    pub fn enqueue(&self, job: RenderJob) -> oneshot::Receiver<JobOutcome> {
        let (reply, recv) = oneshot::channel();
        // The receiver only disconnects if the worker thread has panicked;
        // there is no partial-job state to report in that case.
        let _ = self.sender.send(Envelope { job, reply });
        recv
    }

    /// Drops the sending half and waits for the worker to drain and exit.
    pub fn shutdown(mut self) {
        drop(std::mem::replace(&mut self.sender, mpsc::channel().0));
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// A rough proxy for "pooled buffer usage": the corpus has
/// no heap-sampling crate, so cache occupancy stands in for it.
fn estimate_cache_bytes(caches: &Caches) -> u64 {
    const ASSUMED_HANDLE_BYTES: u64 = 256;
    (caches.primitives.fill_ratio() * 100.0) as u64 * ASSUMED_HANDLE_BYTES * 1024
}

fn run_job<K: CsgKernel>(job: RenderJob, kernel: &K, caches: &mut Caches, chunked: bool) -> JobOutcome {
    let start = Instant::now();
    let reporter = ProgressReporter::new(job.progress_callback);
    let span = info_span!("render_job");
    let _enter = span.enter();

    reporter.report(ProgressStage::Initializing, 0.0);
    let resolver = Resolver::new(job.options.current_dir.clone()).with_library_paths(job.options.library_paths.clone());

    reporter.report(ProgressStage::Parsing, 0.1);
    let parsed = scad_parser::parse(&job.script);

    reporter.report(ProgressStage::Analyzing, 0.3);
    let mut evaluator = Evaluator::new(kernel, resolver).with_deadline(job.options.timeout);
    evaluator.caches = std::mem::take(caches);
    seed_options(&mut evaluator, &job.options);
    evaluator.limits = EvalLimits::default();
    if chunked {
        debug!("starting job in chunked mode: memory pressure was high after the previous job");
    }
    evaluator.chunked = chunked;

    reporter.report(ProgressStage::Evaluating, 0.4);
    let handle = evaluator.eval_program(&parsed.program);

    reporter.report(ProgressStage::Serializing, 0.9);
    let mut diagnostics = parsed.diagnostics;
    diagnostics.extend(evaluator.diagnostics);
    diagnostics.sort_by_position();

    let echoes = evaluator.echoes;
    *caches = evaluator.caches;

    debug!(diagnostic_count = diagnostics.len(), "render job finished");
    reporter.report(ProgressStage::Complete, 1.0);
    JobOutcome { handle, diagnostics, echoes, elapsed: start.elapsed() }
}

fn seed_options<K: CsgKernel>(evaluator: &mut Evaluator<K>, options: &JobOptions) {
    let (fn_, fa, fs) = options.fragment_defaults;
    evaluator.env.bind("$preview", Value::Bool(options.preview_mode));
    evaluator.env.bind("$fn", Value::Number(fn_));
    evaluator.env.bind("$fa", Value::Number(fa));
    evaluator.env.bind("$fs", Value::Number(fs));
}

#[cfg(test)]
mod tests {
    use super::*;
    use scad_csg::{JoinType, KernelError, KernelResult, Mat4, ManifoldStatus, RawMesh, Vec3};
    use std::sync::atomic::{AtomicU64, Ordering};

    struct StubKernel {
        next_id: AtomicU64,
    }

    impl StubKernel {
        fn new() -> Self {
            StubKernel { next_id: AtomicU64::new(1) }
        }

        fn handle(&self) -> GeometryHandle {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            GeometryHandle::new(scad_csg::HandleId(id), id, None)
        }
    }

    impl CsgKernel for StubKernel {
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
            Ok(RawMesh::default())
        }
        fn status(&self, _h: &GeometryHandle) -> ManifoldStatus {
            ManifoldStatus::Manifold
        }
    }

    #[allow(dead_code)]
    fn unused_anchor(_: KernelError) {}

    #[tokio::test]
    async fn enqueued_job_resolves_with_geometry() {
        let queue = RenderQueue::new(Arc::new(StubKernel::new()));
        let outcome = queue
            .enqueue(RenderJob { script: "cube(1);".to_string(), options: JobOptions::default(), progress_callback: None })
            .await
            .unwrap();
        assert!(outcome.handle.is_some());
        assert!(!outcome.diagnostics.has_errors());
    }

    #[tokio::test]
    async fn jobs_run_in_fifo_order() {
        let queue = RenderQueue::new(Arc::new(StubKernel::new()));
        let first = queue.enqueue(RenderJob { script: "echo(1);".to_string(), options: JobOptions::default(), progress_callback: None });
        let second = queue.enqueue(RenderJob { script: "echo(2);".to_string(), options: JobOptions::default(), progress_callback: None });
        let first = first.await.unwrap();
        let second = second.await.unwrap();
        assert_eq!(first.echoes, vec!["1".to_string()]);
        assert_eq!(second.echoes, vec!["2".to_string()]);
    }

    #[tokio::test]
    async fn progress_callback_sees_complete_stage() {
        let queue = RenderQueue::new(Arc::new(StubKernel::new()));
        let (tx, rx) = std::sync::mpsc::channel();
        let callback: ProgressCallback = Box::new(move |stage, progress| {
            let _ = tx.send((stage, progress));
        });
        let _ = queue
            .enqueue(RenderJob { script: "cube(1);".to_string(), options: JobOptions::default(), progress_callback: Some(callback) })
            .await
            .unwrap();
        let stages: Vec<ProgressStage> = rx.try_iter().map(|(s, _)| s).collect();
        assert_eq!(stages.last(), Some(&ProgressStage::Complete));
    }

    #[test]
    fn unknown_identifier_produces_an_error_diagnostic_not_a_panic() {
        let kernel = Arc::new(StubKernel::new());
        let mut caches = Caches::new();
        let outcome = run_job(
            RenderJob { script: "x = undefined_fn();".to_string(), options: JobOptions::default(), progress_callback: None },
            kernel.as_ref(),
            &mut caches,
            false,
        );
        assert!(outcome.diagnostics.has_errors());
    }

    #[test]
    fn chunked_mode_clears_caches_between_top_level_statements() {
        let kernel = Arc::new(StubKernel::new());
        let mut caches = Caches::new();
        let outcome = run_job(
            RenderJob { script: "cube(1); cube(2); cube(3);".to_string(), options: JobOptions::default(), progress_callback: None },
            kernel.as_ref(),
            &mut caches,
            true,
        );
        assert!(outcome.handle.is_some());
        assert!(!outcome.diagnostics.has_errors());
    }
}
