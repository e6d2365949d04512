//! The tree-walking evaluator: expression evaluation, primitive/transform
//! dispatch, and statement evaluation, threaded through a single
//! [`Evaluator`].

pub mod dispatch;
pub mod expr;
pub mod stmt;

use scad_csg::{CsgKernel, GeometryHandle};
use scad_diagnostics::Diagnostics;
use scad_error::EvalError;
use scad_import::{CycleSet, Resolver};
use std::time::{Duration, Instant};

/// Hard ceilings the evaluator enforces.
#[derive(Debug, Clone, Copy)]
pub struct EvalLimits {
    pub max_recursion: usize,
    pub max_list_iterations: usize,
    pub max_range_values: usize,
}

impl Default for EvalLimits {
    fn default() -> Self {
        EvalLimits { max_recursion: 100, max_list_iterations: 10_000, max_range_values: 1_000 }
    }
}

/// The mutable state threaded through one evaluation job: environment,
/// caches, diagnostics, echo output, import bookkeeping, and the
/// cooperative cancellation deadline.
pub struct Evaluator<'k, K: CsgKernel> {
    pub kernel: &'k K,
    pub env: scad_value::Environment,
    pub caches: scad_cache::Caches,
    pub diagnostics: Diagnostics,
    /// Rendered `echo()` output, in evaluation order. `echo` produces no
    /// geometry of its own, so this is the only way to observe it.
    pub echoes: Vec<String>,
    resolver: Resolver,
    cycles: CycleSet,
    deadline: Option<Instant>,
    timed_out: bool,
    /// Set by the render queue's memory monitor under pressure, switching
    /// the evaluator to chunked mode; read by the statement evaluator
    /// between top-level statements.
    pub chunked: bool,
    depth: usize,
    pub limits: EvalLimits,
}

impl<'k, K: CsgKernel> Evaluator<'k, K> {
    pub fn new(kernel: &'k K, resolver: Resolver) -> Self {
        Evaluator {
            kernel,
            env: scad_value::Environment::with_defaults(),
            caches: scad_cache::Caches::new(),
            diagnostics: Diagnostics::new(),
            echoes: Vec::new(),
            resolver,
            cycles: CycleSet::new(),
            deadline: None,
            timed_out: false,
            chunked: false,
            depth: 0,
            limits: EvalLimits::default(),
        }
    }

    pub fn with_deadline(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn cycles_mut(&mut self) -> &mut CycleSet {
        &mut self.cycles
    }

    /// Splits the borrow so the resolver and the cycle set can be passed to
    /// [`scad_import::load`] together, which needs `&Resolver` and
    /// `&mut CycleSet` at once.
    pub fn import_parts(&mut self) -> (&Resolver, &mut CycleSet) {
        (&self.resolver, &mut self.cycles)
    }

    /// Checks the job deadline (checks the deadline at every
    /// statement boundary, every kernel call, and every list-comprehension
    /// iteration). Records the `timeout` diagnostic at most once.
    pub fn deadline_exceeded(&mut self) -> bool {
        let Some(deadline) = self.deadline else { return false };
        if Instant::now() < deadline {
            return false;
        }
        if !self.timed_out {
            self.timed_out = true;
            self.diagnostics.push(EvalError::Timeout.to_diagnostic());
        }
        true
    }

    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    /// Whether the recursion-depth guard (default 100) has
    /// already been reached — checked before entering one more level.
    pub fn depth_at_limit(&self) -> bool {
        self.depth >= self.limits.max_recursion
    }

    pub fn enter_depth(&mut self) {
        self.depth += 1;
    }

    pub fn exit_depth(&mut self) {
        self.depth -= 1;
    }

    /// Evaluates a parsed program, applying the top-level root-modifier
    /// rule, and returns the resulting geometry, if
    /// any.
    pub fn eval_program(&mut self, program: &[scad_ast::stmt::Stmt]) -> Option<GeometryHandle> {
        stmt::eval_root(self, program)
    }
}
