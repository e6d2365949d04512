//! Pure expression evaluation: operator semantics, the
//! recursion-depth guard, built-in/user-function call dispatch, list
//! comprehensions, and the expression memoizer.

use crate::Evaluator;
use scad_ast::{BinaryOp, CallArg, Expr, ExprKind, Generator, ListComprehension, RangeExpr, UnaryOp};
use scad_cache::MemoKey;
use scad_csg::CsgKernel;
use scad_error::EvalError;
use scad_value::Value;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Evaluates `expr`, guarding recursion depth (Guards
/// recursion depth at 100; exceeding the limit records a diagnostic and
/// returns `undef`).
pub fn eval_expr<K: CsgKernel>(ev: &mut Evaluator<K>, expr: &Expr) -> Value {
    if ev.depth_at_limit() {
        ev.diagnostics.push(EvalError::RecursionLimit { position: Some(expr.span.start) }.to_diagnostic());
        return Value::Undef;
    }
    ev.enter_depth();
    let result = eval_expr_inner(ev, expr);
    ev.exit_depth();
    result
}

fn eval_expr_inner<K: CsgKernel>(ev: &mut Evaluator<K>, expr: &Expr) -> Value {
    match &expr.kind {
        ExprKind::Number(n) => Value::Number(*n),
        ExprKind::String(s) => Value::Str(s.clone()),
        ExprKind::Bool(b) => Value::Bool(*b),
        ExprKind::Undef => Value::Undef,
        ExprKind::Vector(items) => Value::Vector(items.iter().map(|e| eval_expr(ev, e)).collect()),
        ExprKind::Variable(name) => ev.env.lookup(name),
        ExprKind::Binary(op, lhs, rhs) => eval_binary(ev, *op, lhs, rhs),
        ExprKind::Unary(op, operand) => eval_unary(ev, *op, operand),
        ExprKind::Ternary(cond, then_e, else_e) => {
            if eval_expr(ev, cond).is_truthy() {
                eval_expr(ev, then_e)
            } else {
                eval_expr(ev, else_e)
            }
        }
        ExprKind::Call(name, args) => eval_call(ev, name, args, expr),
        ExprKind::Range(range) => eval_range_value(ev, range),
        ExprKind::ListComprehension(lc) => eval_list_comprehension(ev, lc),
    }
}

fn eval_binary<K: CsgKernel>(ev: &mut Evaluator<K>, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Value {
    match op {
        // `&&`/`||` short-circuit.
        BinaryOp::Or => {
            let l = eval_expr(ev, lhs);
            if l.is_truthy() {
                Value::Bool(true)
            } else {
                Value::Bool(eval_expr(ev, rhs).is_truthy())
            }
        }
        BinaryOp::And => {
            let l = eval_expr(ev, lhs);
            if !l.is_truthy() {
                Value::Bool(false)
            } else {
                Value::Bool(eval_expr(ev, rhs).is_truthy())
            }
        }
        BinaryOp::Eq => Value::Bool(eval_expr(ev, lhs) == eval_expr(ev, rhs)),
        BinaryOp::NotEq => Value::Bool(eval_expr(ev, lhs) != eval_expr(ev, rhs)),
        BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => {
            eval_relational(op, eval_expr(ev, lhs), eval_expr(ev, rhs))
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul => {
            eval_arithmetic(op, eval_expr(ev, lhs), eval_expr(ev, rhs))
        }
        BinaryOp::Div => match (eval_expr(ev, lhs).as_number(), eval_expr(ev, rhs).as_number()) {
            (Some(a), Some(b)) => Value::Number(a / b),
            _ => Value::Undef,
        },
        BinaryOp::Mod => match (eval_expr(ev, lhs).as_number(), eval_expr(ev, rhs).as_number()) {
            (Some(a), Some(b)) => Value::Number(a % b),
            _ => Value::Undef,
        },
    }
}

fn eval_relational(op: BinaryOp, l: Value, r: Value) -> Value {
    if let (Some(a), Some(b)) = (l.as_number(), r.as_number()) {
        return Value::Bool(numeric_cmp(op, a, b));
    }
    if let (Some(a), Some(b)) = (l.as_str(), r.as_str()) {
        return Value::Bool(match op {
            BinaryOp::Lt => a < b,
            BinaryOp::Gt => a > b,
            BinaryOp::Le => a <= b,
            BinaryOp::Ge => a >= b,
            _ => unreachable!(),
        });
    }
    Value::Undef
}

fn numeric_cmp(op: BinaryOp, a: f64, b: f64) -> bool {
    match op {
        BinaryOp::Lt => a < b,
        BinaryOp::Gt => a > b,
        BinaryOp::Le => a <= b,
        BinaryOp::Ge => a >= b,
        _ => unreachable!(),
    }
}

/// `+`/`-`/`*` over numbers, strings (`+` only), and vectors — vectors
/// accept a scalar or same-shape vector operand, componentwise.
fn eval_arithmetic(op: BinaryOp, l: Value, r: Value) -> Value {
    match (op, &l, &r) {
        (BinaryOp::Add, Value::Str(a), Value::Str(b)) => Value::Str(Arc::from(format!("{a}{b}"))),
        _ => match (&l, &r) {
            (Value::Vector(_), _) | (_, Value::Vector(_)) => vector_arithmetic(op, &l, &r),
            _ => match (l.as_number(), r.as_number()) {
                (Some(a), Some(b)) => Value::Number(scalar_op(op, a, b)),
                _ => Value::Undef,
            },
        },
    }
}

fn scalar_op(op: BinaryOp, a: f64, b: f64) -> f64 {
    match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        _ => unreachable!(),
    }
}

fn vector_arithmetic(op: BinaryOp, l: &Value, r: &Value) -> Value {
    match (l, r) {
        (Value::Vector(a), Value::Vector(b)) if a.len() == b.len() => {
            let out: Option<Vec<Value>> = a
                .iter()
                .zip(b.iter())
                .map(|(x, y)| match (x.as_number(), y.as_number()) {
                    (Some(x), Some(y)) => Some(Value::Number(scalar_op(op, x, y))),
                    _ => None,
                })
                .collect();
            out.map(Value::Vector).unwrap_or(Value::Undef)
        }
        (Value::Vector(a), scalar) => {
            let Some(s) = scalar.as_number() else { return Value::Undef };
            let out: Option<Vec<Value>> =
                a.iter().map(|x| x.as_number().map(|x| Value::Number(scalar_op(op, x, s)))).collect();
            out.map(Value::Vector).unwrap_or(Value::Undef)
        }
        (scalar, Value::Vector(b)) => {
            let Some(s) = scalar.as_number() else { return Value::Undef };
            let out: Option<Vec<Value>> =
                b.iter().map(|y| y.as_number().map(|y| Value::Number(scalar_op(op, s, y)))).collect();
            out.map(Value::Vector).unwrap_or(Value::Undef)
        }
        _ => Value::Undef,
    }
}

fn eval_unary<K: CsgKernel>(ev: &mut Evaluator<K>, op: UnaryOp, operand: &Expr) -> Value {
    let v = eval_expr(ev, operand);
    match op {
        UnaryOp::Not => Value::Bool(!v.is_truthy()),
        UnaryOp::Neg => match &v {
            Value::Number(n) => Value::Number(-n),
            Value::Vector(items) => {
                let out: Option<Vec<Value>> = items.iter().map(|x| x.as_number().map(|n| Value::Number(-n))).collect();
                out.map(Value::Vector).unwrap_or(Value::Undef)
            }
            _ => Value::Undef,
        },
    }
}

/// Evaluates a `[start:end]`/`[start:step:end]` expression to a
/// [`Value::Range`], defaulting a missing step to `1.0`.
pub fn eval_range_value<K: CsgKernel>(ev: &mut Evaluator<K>, range: &RangeExpr) -> Value {
    let start = eval_expr(ev, &range.start).as_number().unwrap_or(0.0);
    let end = eval_expr(ev, &range.end).as_number().unwrap_or(0.0);
    let step = range.step.as_ref().map(|s| eval_expr(ev, s).as_number().unwrap_or(1.0)).unwrap_or(1.0);
    Value::Range { start, step, end }
}

/// Expands a [`Value::Range`] into its finite sequence, enforcing the
/// 1,000-value-per-range ceiling. Returns `None` and records a
/// `resource_limit` diagnostic if the ceiling is exceeded; `a > b` with a
/// positive default step (or the reverse with a negative step) yields an
/// empty sequence, not a diagnostic.
pub fn expand_range<K: CsgKernel>(ev: &mut Evaluator<K>, start: f64, step: f64, end: f64, span: scad_position::Span) -> Option<Vec<f64>> {
    if step == 0.0 {
        return Some(Vec::new());
    }
    let count = ((end - start) / step).floor();
    if count < 0.0 {
        return Some(Vec::new());
    }
    let count = count as usize + 1;
    if count > ev.limits.max_range_values {
        ev.diagnostics.push(
            EvalError::ResourceLimit { limit: ev.limits.max_range_values, position: Some(span.start) }.to_diagnostic(),
        );
        return None;
    }
    Some((0..count).map(|i| start + step * i as f64).collect())
}

fn eval_call<K: CsgKernel>(ev: &mut Evaluator<K>, name: &str, args: &[CallArg], expr: &Expr) -> Value {
    let evaluated: Vec<(Option<Arc<str>>, Value)> =
        args.iter().map(|a| (a.name.clone(), eval_expr(ev, &a.value))).collect();

    if scad_builtins::is_builtin(name) {
        let positional = crate::dispatch::resolve_builtin_args(name, &evaluated);
        return scad_builtins::call(name, &positional, &mut ev.caches.trig).unwrap_or(Value::Undef);
    }

    let Some(func) = ev.env.lookup_function(name) else {
        ev.diagnostics.push(
            EvalError::UnknownIdentifier { name: name.to_string(), position: Some(expr.span.start) }.to_diagnostic(),
        );
        return Value::Undef;
    };

    let memo_key = MemoKey::new(structural_hash(expr), MemoKey::hash_scope(ev.env.top_frame_bindings()));
    if let Some(cached) = ev.caches.expr_memo.get(&memo_key) {
        return cached;
    }

    ev.env.fork();
    bind_params(ev, &func.params, &evaluated);
    let result = eval_expr(ev, &func.body);
    ev.env.exit_scope();

    ev.caches.expr_memo.insert(memo_key, result.clone());
    result
}

/// Binds positional-then-named call arguments to `params`, falling back to
/// each parameter's default expression (evaluated in the *caller's* scope,
/// matching "first positional matches module's first
/// parameter").
pub(crate) fn bind_params<K: CsgKernel>(ev: &mut Evaluator<K>, params: &[scad_ast::Param], evaluated: &[(Option<Arc<str>>, Value)]) {
    let mut positional = evaluated.iter().filter(|(name, _)| name.is_none()).map(|(_, v)| v.clone());
    for param in params {
        let named = evaluated.iter().find(|(name, _)| name.as_deref() == Some(param.name.as_ref())).map(|(_, v)| v.clone());
        let value = named.or_else(|| positional.next()).unwrap_or(Value::Undef);
        let value = if value.is_undef() {
            param.default.as_ref().map(|d| eval_expr(ev, d)).unwrap_or(Value::Undef)
        } else {
            value
        };
        ev.env.bind(param.name.clone(), value);
    }
}

fn eval_list_comprehension<K: CsgKernel>(ev: &mut Evaluator<K>, lc: &ListComprehension) -> Value {
    ev.env.fork();
    let mut out = Vec::new();
    let mut total_iterations = 0usize;
    eval_generators(ev, &lc.generators, lc, &mut out, &mut total_iterations);
    ev.env.exit_scope();
    Value::Vector(out)
}

fn eval_generators<K: CsgKernel>(
    ev: &mut Evaluator<K>,
    generators: &[Generator],
    lc: &ListComprehension,
    out: &mut Vec<Value>,
    total_iterations: &mut usize,
) {
    let Some((gen, rest)) = generators.split_first() else {
        if lc.guard.as_ref().map(|g| eval_expr(ev, g).is_truthy()).unwrap_or(true) {
            out.push(eval_expr(ev, &lc.body));
        }
        return;
    };

    let Value::Range { start, step, end } = eval_range_value(ev, &gen.range) else { return };
    let Some(values) = expand_range(ev, start, step, end, gen.range.span) else { return };

    for v in values {
        if ev.deadline_exceeded() {
            return;
        }
        *total_iterations += 1;
        if *total_iterations > ev.limits.max_list_iterations {
            ev.diagnostics.push(
                EvalError::ResourceLimit { limit: ev.limits.max_list_iterations, position: Some(gen.range.span.start) }
                    .to_diagnostic(),
            );
            return;
        }
        ev.env.bind(gen.var.clone(), Value::Number(v));
        eval_generators(ev, rest, lc, out, total_iterations);
    }
}

/// A structural hash of `expr`'s shape, independent of source position —
/// the other half of the expression memoizer's key.
fn structural_hash(expr: &Expr) -> u64 {
    let mut hasher = rustc_hash::FxHasher::default();
    hash_expr(expr, &mut hasher);
    hasher.finish()
}

fn hash_expr(expr: &Expr, hasher: &mut rustc_hash::FxHasher) {
    match &expr.kind {
        ExprKind::Number(n) => {
            0u8.hash(hasher);
            n.to_bits().hash(hasher);
        }
        ExprKind::String(s) => {
            1u8.hash(hasher);
            s.hash(hasher);
        }
        ExprKind::Bool(b) => {
            2u8.hash(hasher);
            b.hash(hasher);
        }
        ExprKind::Undef => 3u8.hash(hasher),
        ExprKind::Vector(items) => {
            4u8.hash(hasher);
            items.len().hash(hasher);
            for i in items {
                hash_expr(i, hasher);
            }
        }
        ExprKind::Variable(name) => {
            5u8.hash(hasher);
            name.hash(hasher);
        }
        ExprKind::Binary(op, l, r) => {
            6u8.hash(hasher);
            (*op as u8).hash(hasher);
            hash_expr(l, hasher);
            hash_expr(r, hasher);
        }
        ExprKind::Unary(op, e) => {
            7u8.hash(hasher);
            (*op as u8).hash(hasher);
            hash_expr(e, hasher);
        }
        ExprKind::Ternary(c, t, e) => {
            8u8.hash(hasher);
            hash_expr(c, hasher);
            hash_expr(t, hasher);
            hash_expr(e, hasher);
        }
        ExprKind::Call(name, args) => {
            9u8.hash(hasher);
            name.hash(hasher);
            for a in args {
                a.name.hash(hasher);
                hash_expr(&a.value, hasher);
            }
        }
        ExprKind::Range(r) => {
            10u8.hash(hasher);
            hash_expr(&r.start, hasher);
            if let Some(s) = &r.step {
                hash_expr(s, hasher);
            }
            hash_expr(&r.end, hasher);
        }
        ExprKind::ListComprehension(lc) => {
            11u8.hash(hasher);
            for g in &lc.generators {
                g.var.hash(hasher);
                hash_expr(&g.range.start, hasher);
                hash_expr(&g.range.end, hasher);
            }
            if let Some(g) = &lc.guard {
                hash_expr(g, hasher);
            }
            hash_expr(&lc.body, hasher);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scad_parser::parse_expr;

    struct NullKernel;
    impl CsgKernel for NullKernel {
        fn cube(&self, _: scad_csg::Vec3, _: bool) -> scad_csg::KernelResult<scad_csg::GeometryHandle> {
            unreachable!()
        }
        fn sphere(&self, _: f64, _: u32) -> scad_csg::KernelResult<scad_csg::GeometryHandle> {
            unreachable!()
        }
        fn cylinder(&self, _: f64, _: f64, _: f64, _: u32, _: bool) -> scad_csg::KernelResult<scad_csg::GeometryHandle> {
            unreachable!()
        }
        fn cone(&self, _: f64, _: f64, _: f64, _: u32, _: bool) -> scad_csg::KernelResult<scad_csg::GeometryHandle> {
            unreachable!()
        }
        fn circle(&self, _: f64, _: u32) -> scad_csg::KernelResult<scad_csg::GeometryHandle> {
            unreachable!()
        }
        fn square(&self, _: [f64; 2], _: bool) -> scad_csg::KernelResult<scad_csg::GeometryHandle> {
            unreachable!()
        }
        fn polygon(&self, _: Vec<[f64; 2]>) -> scad_csg::KernelResult<scad_csg::GeometryHandle> {
            unreachable!()
        }
        fn polyhedron(&self, _: Vec<scad_csg::Vec3>, _: Vec<Vec<u32>>) -> scad_csg::KernelResult<scad_csg::GeometryHandle> {
            unreachable!()
        }
        fn text(&self, _: String, _: f64, _: Option<String>) -> scad_csg::KernelResult<scad_csg::GeometryHandle> {
            unreachable!()
        }
        fn surface(&self, _: &str, _: bool, _: bool) -> scad_csg::KernelResult<scad_csg::GeometryHandle> {
            unreachable!()
        }
        fn translate(&self, _: &scad_csg::GeometryHandle, _: scad_csg::Vec3) -> scad_csg::KernelResult<scad_csg::GeometryHandle> {
            unreachable!()
        }
        fn rotate(&self, _: &scad_csg::GeometryHandle, _: scad_csg::Vec3) -> scad_csg::KernelResult<scad_csg::GeometryHandle> {
            unreachable!()
        }
        fn scale(&self, _: &scad_csg::GeometryHandle, _: scad_csg::Vec3) -> scad_csg::KernelResult<scad_csg::GeometryHandle> {
            unreachable!()
        }
        fn mirror(&self, _: &scad_csg::GeometryHandle, _: scad_csg::Vec3) -> scad_csg::KernelResult<scad_csg::GeometryHandle> {
            unreachable!()
        }
        fn multmatrix(&self, _: &scad_csg::GeometryHandle, _: scad_csg::Mat4) -> scad_csg::KernelResult<scad_csg::GeometryHandle> {
            unreachable!()
        }
        fn resize(&self, _: &scad_csg::GeometryHandle, _: scad_csg::Vec3, _: [bool; 3]) -> scad_csg::KernelResult<scad_csg::GeometryHandle> {
            unreachable!()
        }
        fn union(&self, _: &scad_csg::GeometryHandle, _: &scad_csg::GeometryHandle) -> scad_csg::KernelResult<scad_csg::GeometryHandle> {
            unreachable!()
        }
        fn union_multiple(&self, _: &[scad_csg::GeometryHandle]) -> scad_csg::KernelResult<scad_csg::GeometryHandle> {
            unreachable!()
        }
        fn subtract(&self, _: &scad_csg::GeometryHandle, _: &scad_csg::GeometryHandle) -> scad_csg::KernelResult<scad_csg::GeometryHandle> {
            unreachable!()
        }
        fn intersect(&self, _: &scad_csg::GeometryHandle, _: &scad_csg::GeometryHandle) -> scad_csg::KernelResult<scad_csg::GeometryHandle> {
            unreachable!()
        }
        fn hull(&self, _: &[scad_csg::GeometryHandle]) -> scad_csg::KernelResult<scad_csg::GeometryHandle> {
            unreachable!()
        }
        fn minkowski(&self, _: &[scad_csg::GeometryHandle]) -> scad_csg::KernelResult<scad_csg::GeometryHandle> {
            unreachable!()
        }
        fn linear_extrude(
            &self,
            _: &scad_csg::GeometryHandle,
            _: f64,
            _: f64,
            _: [f64; 2],
            _: u32,
        ) -> scad_csg::KernelResult<scad_csg::GeometryHandle> {
            unreachable!()
        }
        fn rotate_extrude(&self, _: &scad_csg::GeometryHandle, _: f64, _: u32) -> scad_csg::KernelResult<scad_csg::GeometryHandle> {
            unreachable!()
        }
        fn project_3d_to_2d(&self, _: &scad_csg::GeometryHandle, _: bool) -> scad_csg::KernelResult<scad_csg::GeometryHandle> {
            unreachable!()
        }
        fn slice_3d_to_2d(&self, _: &scad_csg::GeometryHandle, _: f64) -> scad_csg::KernelResult<scad_csg::GeometryHandle> {
            unreachable!()
        }
        fn offset_2d(
            &self,
            _: &scad_csg::GeometryHandle,
            _: f64,
            _: scad_csg::JoinType,
            _: f64,
            _: u32,
        ) -> scad_csg::KernelResult<scad_csg::GeometryHandle> {
            unreachable!()
        }
        fn to_mesh(&self, _: &scad_csg::GeometryHandle) -> scad_csg::KernelResult<scad_csg::RawMesh> {
            unreachable!()
        }
        fn status(&self, _: &scad_csg::GeometryHandle) -> scad_csg::ManifoldStatus {
            unreachable!()
        }
    }

    fn new_evaluator() -> Evaluator<'static, NullKernel> {
        static KERNEL: NullKernel = NullKernel;
        Evaluator::new(&KERNEL, scad_import::Resolver::new("."))
    }

    #[test]
    fn arithmetic_on_numbers() {
        let mut ev = new_evaluator();
        let expr = parse_expr(&mut scad_parser_cursor_for("1 + 2 * 3"));
        assert_eq!(eval_expr(&mut ev, &expr), Value::Number(7.0));
    }

    fn scad_parser_cursor_for(src: &str) -> scad_parser::Cursor {
        scad_parser::Cursor::new(scad_lexer::tokenize(src))
    }

    #[test]
    fn string_concatenation() {
        let mut ev = new_evaluator();
        let expr = parse_expr(&mut scad_parser_cursor_for(r#""a" + "b""#));
        assert_eq!(eval_expr(&mut ev, &expr), Value::Str(Arc::from("ab")));
    }

    #[test]
    fn vector_scalar_multiply_is_componentwise() {
        let mut ev = new_evaluator();
        let expr = parse_expr(&mut scad_parser_cursor_for("[1,2,3] * 2"));
        assert_eq!(
            eval_expr(&mut ev, &expr),
            Value::Vector(vec![Value::Number(2.0), Value::Number(4.0), Value::Number(6.0)])
        );
    }

    #[test]
    fn short_circuit_or_skips_rhs_side_effects() {
        let mut ev = new_evaluator();
        let expr = parse_expr(&mut scad_parser_cursor_for("true || (1/0 > 0)"));
        assert_eq!(eval_expr(&mut ev, &expr), Value::Bool(true));
    }

    #[test]
    fn ternary_picks_one_branch() {
        let mut ev = new_evaluator();
        let expr = parse_expr(&mut scad_parser_cursor_for("1 < 2 ? 10 : 20"));
        assert_eq!(eval_expr(&mut ev, &expr), Value::Number(10.0));
    }

    #[test]
    fn undef_equals_only_undef() {
        let mut ev = new_evaluator();
        let expr = parse_expr(&mut scad_parser_cursor_for("undef == undef"));
        assert_eq!(eval_expr(&mut ev, &expr), Value::Bool(true));
    }

    #[test]
    fn unknown_identifier_call_records_diagnostic() {
        let mut ev = new_evaluator();
        let expr = parse_expr(&mut scad_parser_cursor_for("not_a_thing(1)"));
        assert_eq!(eval_expr(&mut ev, &expr), Value::Undef);
        assert!(!ev.diagnostics.is_empty());
    }

    #[test]
    fn list_comprehension_respects_guard() {
        let mut ev = new_evaluator();
        let expr = parse_expr(&mut scad_parser_cursor_for("[for (i = [0:4]) if (i > 1) i]"));
        assert_eq!(
            eval_expr(&mut ev, &expr),
            Value::Vector(vec![Value::Number(2.0), Value::Number(3.0), Value::Number(4.0)])
        );
    }

    #[test]
    fn trig_builtin_uses_degrees() {
        let mut ev = new_evaluator();
        let expr = parse_expr(&mut scad_parser_cursor_for("sin(90)"));
        assert_eq!(eval_expr(&mut ev, &expr), Value::Number(1.0));
    }
}
