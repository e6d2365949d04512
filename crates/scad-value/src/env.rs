//! The scoped environment: a stack of frames holding variables and the
//! user function/module tables.

use crate::value::Value;
use rustc_hash::FxHashMap;
use scad_ast::{Expr, Param, Stmt};
use std::sync::Arc;

/// A user-defined, single-expression function.
#[derive(Debug, Clone)]
pub struct UserFunction {
    pub params: Vec<Param>,
    pub body: Expr,
}

/// A user-defined module: a parameter list plus a statement body.
#[derive(Debug, Clone)]
pub struct UserModule {
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
}

/// One level of lexical scope. Each frame holds a mapping name→value
/// (variables), and separate mappings for user functions and user modules.
#[derive(Debug, Default)]
pub struct Frame {
    vars: FxHashMap<Arc<str>, Value>,
    functions: FxHashMap<Arc<str>, Arc<UserFunction>>,
    modules: FxHashMap<Arc<str>, Arc<UserModule>>,
    /// The statement nodes passed as children to the module call that
    /// created this frame, consumed by `children()`/`children(i)`.
    children: Vec<Stmt>,
}

/// The frame stack the evaluator threads through statement and expression
/// evaluation. Frames are pushed/popped in strict LIFO order only.
#[derive(Debug, Default)]
pub struct Environment {
    frames: Vec<Frame>,
}

impl Environment {
    /// A fresh environment with one root frame and the special tessellation
    /// and viewport variables (`$fn`/`$fa`/`$fs`/`$t`/`$vp*`/...) bound to
    /// their conventional defaults.
    pub fn with_defaults() -> Self {
        let mut env = Environment { frames: vec![Frame::default()] };
        env.bind("$fn", Value::Number(0.0));
        env.bind("$fa", Value::Number(12.0));
        env.bind("$fs", Value::Number(2.0));
        env.bind("$t", Value::Number(0.0));
        env.bind("$children", Value::Number(0.0));
        env.bind("$preview", Value::Bool(true));
        env.bind("$vpr", Value::Vector(vec![Value::Number(55.0), Value::Number(0.0), Value::Number(25.0)]));
        env.bind("$vpt", Value::Vector(vec![Value::Number(0.0), Value::Number(0.0), Value::Number(0.0)]));
        env.bind("$vpd", Value::Number(140.0));
        env.bind("$vpf", Value::Number(22.5));
        env
    }

    /// Pushes a frame whose parent is the current top frame.
    pub fn enter_scope(&mut self) {
        self.frames.push(Frame::default());
    }

    /// Pops the top frame, discarding its bindings. Paired with
    /// `enter_scope`/`fork` to maintain LIFO discipline.
    pub fn exit_scope(&mut self) {
        self.frames.pop();
    }

    /// Produces a child frame mutable independently of its parent, used for
    /// module bodies, `let`, and `for` bodies. Mechanically identical to
    /// [`enter_scope`](Self::enter_scope); the distinct name documents
    /// intent at the call site.
    pub fn fork(&mut self) {
        self.enter_scope();
    }

    /// Inserts into the top frame only.
    pub fn bind(&mut self, name: impl Into<Arc<str>>, value: Value) {
        if let Some(top) = self.frames.last_mut() {
            top.vars.insert(name.into(), value);
        }
    }

    /// Walks frames innermost to outermost, returning the bound value or
    /// `Value::Undef` if unbound anywhere.
    pub fn lookup(&self, name: &str) -> Value {
        for frame in self.frames.iter().rev() {
            if let Some(v) = frame.vars.get(name) {
                return v.clone();
            }
        }
        Value::Undef
    }

    /// Registers a user function in the top frame. Module and function
    /// tables live in the same frame stack as variables, so a nested scope
    /// can shadow an outer module or function just like a variable.
    pub fn define_function(&mut self, name: impl Into<Arc<str>>, func: UserFunction) {
        if let Some(top) = self.frames.last_mut() {
            top.functions.insert(name.into(), Arc::new(func));
        }
    }

    pub fn define_module(&mut self, name: impl Into<Arc<str>>, module: UserModule) {
        if let Some(top) = self.frames.last_mut() {
            top.modules.insert(name.into(), Arc::new(module));
        }
    }

    pub fn lookup_function(&self, name: &str) -> Option<Arc<UserFunction>> {
        self.frames.iter().rev().find_map(|f| f.functions.get(name).cloned())
    }

    pub fn lookup_module(&self, name: &str) -> Option<Arc<UserModule>> {
        self.frames.iter().rev().find_map(|f| f.modules.get(name).cloned())
    }

    /// Attaches the child statements of the module call that created the
    /// current (top) frame, so `children()`/`children(i)` can resolve them.
    pub fn set_current_children(&mut self, children: Vec<Stmt>) {
        if let Some(top) = self.frames.last_mut() {
            top.children = children;
        }
    }

    /// The children attached to the innermost frame that has any, walking
    /// outward — a module body forks fresh frames for `let`/`for`, and
    /// `children()` calls inside those still need to see the enclosing
    /// module call's children.
    pub fn current_children(&self) -> &[Stmt] {
        for frame in self.frames.iter().rev() {
            if !frame.children.is_empty() {
                return &frame.children;
            }
        }
        &[]
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// The variable bindings of the innermost frame, for the expression
    /// memoizer's scope hash — a deliberate approximation
    /// of "vars in scope" to the frame most likely to vary between calls
    /// (loop/function-call bindings), rather than walking the whole stack.
    pub fn top_frame_bindings(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.frames.last().into_iter().flat_map(|f| f.vars.iter().map(|(k, v)| (k.as_ref(), v)))
    }
}
