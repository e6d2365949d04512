//! The statement evaluator: walks the tree depth-first,
//! accumulating geometry within each block and combining it by union, and
//! implements `if`/`for`/`let`/module calls/modifiers/booleans.

use crate::expr::{bind_params, eval_expr, eval_range_value, expand_range};
use crate::{dispatch, Evaluator};
use scad_ast::stmt::{ArgList, BooleanOp, ImportKind, ModifierKind, Stmt, StmtKind, TransformOp};
use scad_ast::{Expr, RangeExpr};
use scad_csg::{CsgKernel, GeometryHandle, HandleModifier};
use scad_error::EvalError;
use scad_position::Span;
use scad_value::{UserFunction, UserModule, Value};
use std::sync::Arc;

/// The root entry point ("Root-modifier rule"): if any
/// top-level statement is `Modifier('!')`, only those are evaluated and
/// everything else is discarded, even though definitions from the whole
/// program are still registered.
pub fn eval_root<K: CsgKernel>(ev: &mut Evaluator<K>, program: &[Stmt]) -> Option<GeometryHandle> {
    hoist_defs(ev, program);
    let roots: Vec<&Stmt> = program.iter().filter(|s| is_root_modifier(s)).collect();
    if roots.is_empty() {
        accumulate_union_top_level(ev, program.iter())
    } else {
        accumulate_union_top_level(ev, roots.into_iter())
    }
}

/// Like [`accumulate_union`], but additionally honors
/// [`Evaluator::chunked`] at the top level: under high memory pressure the
/// render queue sets `chunked`, and this loop processes one top-level
/// statement at a time, dropping the intermediate caches after each one
/// ("the evaluator switches to chunked mode (processes top-level
/// statements one at a time and drops intermediate caches)").
fn accumulate_union_top_level<'a, K: CsgKernel>(ev: &mut Evaluator<K>, stmts: impl Iterator<Item = &'a Stmt>) -> Option<GeometryHandle> {
    let mut acc: Option<GeometryHandle> = None;
    for stmt in stmts {
        if ev.deadline_exceeded() {
            break;
        }
        let next = eval_stmt(ev, stmt);
        acc = union_handles(ev, acc, next);
        if ev.chunked {
            ev.caches.clear_all();
        }
    }
    acc
}

fn is_root_modifier(stmt: &Stmt) -> bool {
    matches!(stmt.kind, StmtKind::Modifier { kind: ModifierKind::Root, .. })
}

/// First pass over a block: register every `ModuleDef`/`FunctionDef` before
/// evaluating any statement, so forward references within the same block
/// resolve ("First pass in a block").
fn hoist_defs<K: CsgKernel>(ev: &mut Evaluator<K>, stmts: &[Stmt]) {
    for stmt in stmts {
        match &stmt.kind {
            StmtKind::ModuleDef { name, params, body } => {
                ev.env.define_module(name.clone(), UserModule { params: params.clone(), body: body.clone() });
            }
            StmtKind::FunctionDef { name, params, expr } => {
                ev.env.define_function(name.clone(), UserFunction { params: params.clone(), body: expr.clone() });
            }
            _ => {}
        }
    }
}

/// Evaluates a block: hoists definitions, then evaluates each statement in
/// order and unions the resulting geometry ("accumulating
/// geometry handles within each block and combining them by union").
pub fn eval_block<K: CsgKernel>(ev: &mut Evaluator<K>, stmts: &[Stmt]) -> Option<GeometryHandle> {
    hoist_defs(ev, stmts);
    accumulate_union(ev, stmts.iter())
}

fn accumulate_union<'a, K: CsgKernel>(ev: &mut Evaluator<K>, stmts: impl Iterator<Item = &'a Stmt>) -> Option<GeometryHandle> {
    let mut acc: Option<GeometryHandle> = None;
    for stmt in stmts {
        if ev.deadline_exceeded() {
            break;
        }
        let next = eval_stmt(ev, stmt);
        acc = union_handles(ev, acc, next);
    }
    acc
}

/// Unions two optional handles, skipping whichever is absent
/// ("If a child evaluates to nothing, it is skipped").
fn union_handles<K: CsgKernel>(ev: &mut Evaluator<K>, a: Option<GeometryHandle>, b: Option<GeometryHandle>) -> Option<GeometryHandle> {
    match (a, b) {
        (None, x) | (x, None) => x,
        (Some(a), Some(b)) => match ev.kernel.union(&a, &b) {
            Ok(h) => Some(h),
            Err(e) => {
                ev.diagnostics.push(EvalError::Kernel { message: e.0, position: None }.to_diagnostic());
                Some(a)
            }
        },
    }
}

fn intersect_handles<K: CsgKernel>(ev: &mut Evaluator<K>, a: Option<GeometryHandle>, b: Option<GeometryHandle>) -> Option<GeometryHandle> {
    match (a, b) {
        (None, x) => x,
        (Some(a), None) => Some(a),
        (Some(a), Some(b)) => match ev.kernel.intersect(&a, &b) {
            Ok(h) => Some(h),
            Err(e) => {
                ev.diagnostics.push(EvalError::Kernel { message: e.0, position: None }.to_diagnostic());
                Some(a)
            }
        },
    }
}

fn eval_stmt<K: CsgKernel>(ev: &mut Evaluator<K>, stmt: &Stmt) -> Option<GeometryHandle> {
    if ev.deadline_exceeded() {
        return None;
    }
    match &stmt.kind {
        StmtKind::Empty | StmtKind::ModuleDef { .. } | StmtKind::FunctionDef { .. } => None,
        StmtKind::Primitive { op, params } => dispatch::primitive(ev, *op, params, Some(stmt.span.start)),
        StmtKind::Transform { op, params, children } => eval_transform(ev, *op, params, children, stmt.span),
        StmtKind::Boolean { op, children } => eval_boolean(ev, *op, children),
        StmtKind::ModuleCall { name, params, children } => eval_module_call(ev, name, params, children, stmt.span),
        StmtKind::If { cond, then_branch, else_branch } => {
            if eval_expr(ev, cond).is_truthy() {
                eval_block(ev, then_branch)
            } else {
                else_branch.as_ref().and_then(|branch| eval_block(ev, branch))
            }
        }
        StmtKind::For { var, range, body } => eval_for(ev, var, range, body, false),
        StmtKind::IntersectionFor { var, range, body } => eval_for(ev, var, range, body, true),
        StmtKind::Let { bindings, body } => eval_let(ev, bindings, body),
        StmtKind::Assignment { name, expr } => {
            let value = eval_expr(ev, expr);
            ev.env.bind(name.clone(), value);
            None
        }
        StmtKind::Echo { values } => {
            eval_echo(ev, values);
            None
        }
        StmtKind::Assert { cond, message } => {
            eval_assert(ev, cond, message, stmt.span);
            None
        }
        StmtKind::Import { kind, filename } => eval_import(ev, *kind, filename),
        StmtKind::Modifier { kind, child } => eval_modifier(ev, *kind, child),
        StmtKind::Children { args } => eval_children(ev, args, stmt.span),
    }
}

/// Transform dispatch, including the three extrusion/offset special cases
/// assigns to the statement evaluator rather than the plain
/// affine-transform dispatcher.
fn eval_transform<K: CsgKernel>(
    ev: &mut Evaluator<K>,
    op: TransformOp,
    params: &ArgList,
    children: &[Stmt],
    span: Span,
) -> Option<GeometryHandle> {
    let child = eval_block(ev, children);
    match op {
        TransformOp::Projection => eval_projection(ev, params, child),
        TransformOp::LinearExtrude => child.as_ref().and_then(|c| dispatch::linear_extrude(ev, params, c)),
        TransformOp::RotateExtrude => child.as_ref().and_then(|c| dispatch::rotate_extrude(ev, params, c)),
        TransformOp::Offset => eval_offset(ev, params, child),
        _ => dispatch::transform(ev, op, params, child, Some(span.start)),
    }
}

/// Projection from 3D to 2D: converts to a thin 3D extrusion (height 0.1)
/// so the result can carry through the 3D pipeline. On kernel failure,
/// returns the child unchanged and records a diagnostic.
fn eval_projection<K: CsgKernel>(ev: &mut Evaluator<K>, params: &ArgList, child: Option<GeometryHandle>) -> Option<GeometryHandle> {
    let child = child?;
    let cut = params.named("cut").map(|e| dispatch::eval_bool(ev, e, false)).unwrap_or(false);
    let projected = match ev.kernel.project_3d_to_2d(&child, cut) {
        Ok(h2d) => h2d,
        Err(e) => {
            ev.diagnostics.push(EvalError::Kernel { message: e.0, position: None }.to_diagnostic());
            return Some(child);
        }
    };
    match ev.kernel.linear_extrude(&projected, 0.1, 0.0, [1.0, 1.0], 1) {
        Ok(thin) => Some(thin),
        Err(e) => {
            ev.diagnostics.push(EvalError::Kernel { message: e.0, position: None }.to_diagnostic());
            Some(child)
        }
    }
}

/// : "for 3D inputs, project to 2D, offset ..., re-extrude
/// 0.1 thick." Projection is attempted unconditionally — the kernel
/// contract gives no way to query a handle's dimensionality, so an
/// already-2D child is assumed to pass through `project_3d_to_2d`
/// unchanged.
fn eval_offset<K: CsgKernel>(ev: &mut Evaluator<K>, params: &ArgList, child: Option<GeometryHandle>) -> Option<GeometryHandle> {
    let child = child?;
    let projected = match ev.kernel.project_3d_to_2d(&child, false) {
        Ok(h2d) => h2d,
        Err(e) => {
            ev.diagnostics.push(EvalError::Kernel { message: e.0, position: None }.to_diagnostic());
            return Some(child);
        }
    };
    let offset = dispatch::offset(ev, params, &projected)?;
    match ev.kernel.linear_extrude(&offset, 0.1, 0.0, [1.0, 1.0], 1) {
        Ok(thin) => Some(thin),
        Err(e) => {
            ev.diagnostics.push(EvalError::Kernel { message: e.0, position: None }.to_diagnostic());
            Some(offset)
        }
    }
}

/// Boolean ops: union/difference/intersection/hull/minkowski over each
/// evaluated child, preserving the first operand's color.
fn eval_boolean<K: CsgKernel>(ev: &mut Evaluator<K>, op: BooleanOp, children: &[Stmt]) -> Option<GeometryHandle> {
    let handles: Vec<GeometryHandle> = children.iter().filter_map(|c| eval_stmt(ev, c)).collect();
    let first = handles.first()?.clone();
    let first_color = first.color;

    let result = match op {
        BooleanOp::Union => ev.kernel.union_multiple(&handles),
        BooleanOp::Difference => {
            if handles.len() == 1 {
                Ok(first.clone())
            } else {
                match ev.kernel.union_multiple(&handles[1..]) {
                    Ok(rest) => ev.kernel.subtract(&first, &rest),
                    Err(e) => Err(e),
                }
            }
        }
        BooleanOp::Intersection => {
            let mut acc = Ok(first.clone());
            for h in &handles[1..] {
                acc = match acc {
                    Ok(cur) => ev.kernel.intersect(&cur, h),
                    Err(e) => Err(e),
                };
            }
            acc
        }
        BooleanOp::Hull => ev.kernel.hull(&handles),
        BooleanOp::Minkowski => ev.kernel.minkowski(&handles),
    };

    match result {
        Ok(handle) => Some(match first_color {
            Some(c) => handle.with_color(c),
            None => handle,
        }),
        Err(e) => {
            ev.diagnostics.push(EvalError::Kernel { message: e.0, position: None }.to_diagnostic());
            None
        }
    }
}

/// ModuleCall: look up by name, fork a frame, bind
/// parameters, set `$children`, and attach the call's child nodes.
fn eval_module_call<K: CsgKernel>(ev: &mut Evaluator<K>, name: &str, params: &ArgList, children: &[Stmt], span: Span) -> Option<GeometryHandle> {
    let Some(module) = ev.env.lookup_module(name) else {
        ev.diagnostics.push(EvalError::UnknownIdentifier { name: name.to_string(), position: Some(span.start) }.to_diagnostic());
        return None;
    };

    let evaluated: Vec<(Option<Arc<str>>, Value)> = params.iter().map(|arg| (arg.name.clone(), eval_expr(ev, &arg.value))).collect();

    ev.env.fork();
    bind_params(ev, &module.params, &evaluated);
    ev.env.bind("$children", Value::Number(children.len() as f64));
    ev.env.set_current_children(children.to_vec());
    let result = eval_block(ev, &module.body);
    ev.env.exit_scope();
    result
}

/// `for`/`intersection_for`: expand the range, bind the loop variable fresh
/// each iteration, and fold the iterations' geometry with union or
/// intersection respectively. (`if` is simpler — boolean-coerce the
/// condition and take the selected branch — and is folded directly into
/// [`eval_stmt`]'s `StmtKind::If` arm rather than getting its own helper.)
fn eval_for<K: CsgKernel>(ev: &mut Evaluator<K>, var: &str, range: &RangeExpr, body: &[Stmt], intersection: bool) -> Option<GeometryHandle> {
    let Value::Range { start, step, end } = eval_range_value(ev, range) else { return None };
    let Some(values) = expand_range(ev, start, step, end, range.span) else { return None };

    ev.env.fork();
    let mut acc: Option<GeometryHandle> = None;
    for v in values {
        if ev.deadline_exceeded() {
            break;
        }
        ev.env.bind(var, Value::Number(v));
        let iteration = eval_block(ev, body);
        acc = if intersection { intersect_handles(ev, acc, iteration) } else { union_handles(ev, acc, iteration) };
    }
    ev.env.exit_scope();
    acc
}

/// `let`: evaluate every binding's expression in the caller's scope first,
/// then fork and bind them all at once, so later bindings never see
/// earlier ones.
fn eval_let<K: CsgKernel>(ev: &mut Evaluator<K>, bindings: &[(Arc<str>, Expr)], body: &[Stmt]) -> Option<GeometryHandle> {
    let evaluated: Vec<(Arc<str>, Value)> = bindings.iter().map(|(name, expr)| (name.clone(), eval_expr(ev, expr))).collect();
    ev.env.fork();
    for (name, value) in evaluated {
        ev.env.bind(name, value);
    }
    let result = eval_block(ev, body);
    ev.env.exit_scope();
    result
}

fn eval_echo<K: CsgKernel>(ev: &mut Evaluator<K>, values: &[Expr]) {
    let rendered: Vec<String> = values.iter().map(|e| eval_expr(ev, e).stringify()).collect();
    ev.echoes.push(rendered.join(", "));
}

fn eval_assert<K: CsgKernel>(ev: &mut Evaluator<K>, cond: &Expr, message: &Option<Expr>, span: Span) {
    if eval_expr(ev, cond).is_truthy() {
        return;
    }
    let message = message.as_ref().map(|e| eval_expr(ev, e).stringify());
    ev.diagnostics.push(EvalError::Assertion { message, position: Some(span.start) }.to_diagnostic());
}

/// : `import` binds the file's definitions and assignments
/// into the enclosing scope; `include` executes every statement; `use`
/// registers only its modules.
fn eval_import<K: CsgKernel>(ev: &mut Evaluator<K>, kind: ImportKind, filename: &str) -> Option<GeometryHandle> {
    let (resolver, cycles) = ev.import_parts();
    let loaded = scad_import::load(resolver, cycles, kind, filename);
    for diagnostic in loaded.diagnostics {
        ev.diagnostics.push(diagnostic);
    }
    hoist_defs(ev, &loaded.statements);

    match kind {
        ImportKind::Include => accumulate_union(ev, loaded.statements.iter()),
        ImportKind::Import => {
            for stmt in &loaded.statements {
                if matches!(stmt.kind, StmtKind::Assignment { .. }) {
                    eval_stmt(ev, stmt);
                }
            }
            None
        }
        ImportKind::Use => None,
    }
}

/// `*` (disable) drops the subtree; `#`/`%` (highlight/transparent)
/// evaluate it and stamp the resulting handle. `!` (root) is handled at the
/// root by [`eval_root`]; encountered nested, it behaves like a plain
/// pass-through.
fn eval_modifier<K: CsgKernel>(ev: &mut Evaluator<K>, kind: ModifierKind, child: &Stmt) -> Option<GeometryHandle> {
    match kind {
        ModifierKind::Disable => None,
        ModifierKind::Root => eval_stmt(ev, child),
        ModifierKind::Highlight => eval_stmt(ev, child).map(|h| h.with_modifier(HandleModifier::Highlight)),
        ModifierKind::Transparent => eval_stmt(ev, child).map(|h| h.with_modifier(HandleModifier::Transparent)),
    }
}

/// `children()` unions all call children; `children(i)` selects the i-th
/// (0-based; out of range records a diagnostic).
fn eval_children<K: CsgKernel>(ev: &mut Evaluator<K>, args: &[Expr], span: Span) -> Option<GeometryHandle> {
    let kids = ev.env.current_children().to_vec();
    let Some(index_expr) = args.first() else {
        return accumulate_union(ev, kids.iter());
    };

    let index = eval_expr(ev, index_expr).as_number().unwrap_or(-1.0);
    if index < 0.0 || index as usize >= kids.len() {
        ev.diagnostics.push(
            EvalError::Type { message: format!("children index {index} out of range (0..{})", kids.len()), position: Some(span.start) }
                .to_diagnostic(),
        );
        return None;
    }
    eval_stmt(ev, &kids[index as usize])
}
