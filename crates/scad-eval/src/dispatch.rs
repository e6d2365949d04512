//! Primitive & transform dispatch: parameter extraction via
//! fallback chains, primitive-cache lookups, and translation into
//! [`CsgKernel`] calls. Color application is the one "transform" that never
//! touches the kernel — it only stamps side-band metadata onto a handle.

use crate::expr::eval_expr;
use crate::Evaluator;
use scad_ast::stmt::{ArgList, PrimitiveOp, TransformOp};
use scad_ast::Expr;
use scad_csg::{CsgKernel, GeometryHandle, JoinType, Mat4, Rgba, Vec3};
use scad_error::EvalError;
use scad_value::Value;
use std::sync::Arc;

/// Per-builtin named-parameter order, for the handful of functions callers
/// commonly invoke with keyword arguments. Builtins absent
/// from this table are assumed positional-only.
fn builtin_param_names(name: &str) -> Option<&'static [&'static str]> {
    match name {
        "rands" => Some(&["min_value", "max_value", "value_count", "seed"]),
        "search" => Some(&["match_value", "array", "num_returns_per_match", "index_col_num"]),
        "lookup" => Some(&["key", "table"]),
        "atan2" => Some(&["y", "x"]),
        "pow" => Some(&["x", "y"]),
        _ => None,
    }
}

/// Reorders a call's already-evaluated (name, value) pairs into the
/// positional slice the builtin implementations expect, used by
/// `scad-eval`'s expression evaluator before dispatching to `scad-builtins`.
pub fn resolve_builtin_args(name: &str, evaluated: &[(Option<Arc<str>>, Value)]) -> Vec<Value> {
    let Some(names) = builtin_param_names(name) else {
        return evaluated.iter().map(|(_, v)| v.clone()).collect();
    };

    let mut out = vec![Value::Undef; names.len()];
    let mut filled = vec![false; names.len()];
    for (arg_name, value) in evaluated {
        if let Some(arg_name) = arg_name {
            if let Some(idx) = names.iter().position(|p| *p == arg_name.as_ref()) {
                out[idx] = value.clone();
                filled[idx] = true;
            }
        }
    }
    let mut positional = evaluated.iter().filter(|(n, _)| n.is_none()).map(|(_, v)| v.clone());
    for (idx, slot) in filled.iter().enumerate() {
        if !slot {
            if let Some(v) = positional.next() {
                out[idx] = v;
            }
        }
    }
    out
}

pub(crate) fn eval_number<K: CsgKernel>(ev: &mut Evaluator<K>, expr: &Expr, default: f64) -> f64 {
    eval_expr(ev, expr).as_number().unwrap_or(default)
}

pub(crate) fn eval_bool<K: CsgKernel>(ev: &mut Evaluator<K>, expr: &Expr, default: bool) -> bool {
    match eval_expr(ev, expr) {
        Value::Bool(b) => b,
        Value::Undef => default,
        v => v.is_truthy(),
    }
}

fn vec3_of(items: &[Value], default: Vec3) -> Vec3 {
    [
        items.first().and_then(Value::as_number).unwrap_or(default[0]),
        items.get(1).and_then(Value::as_number).unwrap_or(default[1]),
        items.get(2).and_then(Value::as_number).unwrap_or(default[2]),
    ]
}

/// A scalar broadcasts to all three components; a vector fills in order,
/// keeping `default` for any missing trailing component
/// ("if scalar, treated as uniform").
pub(crate) fn eval_vec3<K: CsgKernel>(ev: &mut Evaluator<K>, expr: &Expr, default: Vec3) -> Vec3 {
    match eval_expr(ev, expr) {
        Value::Number(n) => [n, n, n],
        Value::Vector(items) => vec3_of(&items, default),
        _ => default,
    }
}

pub(crate) fn eval_vec2<K: CsgKernel>(ev: &mut Evaluator<K>, expr: &Expr, default: [f64; 2]) -> [f64; 2] {
    match eval_expr(ev, expr) {
        Value::Number(n) => [n, n],
        Value::Vector(items) => [
            items.first().and_then(Value::as_number).unwrap_or(default[0]),
            items.get(1).and_then(Value::as_number).unwrap_or(default[1]),
        ],
        _ => default,
    }
}

/// Reads a local `$fn`/`$fa`/`$fs` override from the call's own arguments,
/// falling back to the current scope's value (special
/// names participate in the fragment calculation).
pub(crate) fn local_fragment_value<K: CsgKernel>(ev: &mut Evaluator<K>, params: &ArgList, key: &str, default: f64) -> f64 {
    match params.named(key) {
        Some(expr) => eval_number(ev, expr, default),
        None => default,
    }
}

pub(crate) fn fragments_for<K: CsgKernel>(ev: &mut Evaluator<K>, params: &ArgList, radius: f64) -> u32 {
    let fn_ = local_fragment_value(ev, params, "$fn", ev.env.lookup("$fn").as_number().unwrap_or(0.0));
    let fa = local_fragment_value(ev, params, "$fa", ev.env.lookup("$fa").as_number().unwrap_or(12.0));
    let fs = local_fragment_value(ev, params, "$fs", ev.env.lookup("$fs").as_number().unwrap_or(2.0));
    scad_builtins::fragments(radius, fn_, fa, fs)
}

/// The `_positional -> r -> radius` chain, falling back to `d`/`diameter`
/// halved, then `default`.
fn extract_radius<K: CsgKernel>(ev: &mut Evaluator<K>, params: &ArgList, default: f64) -> f64 {
    if let Some(expr) = params.resolve(&["_positional", "r", "radius"]) {
        return eval_number(ev, expr, default);
    }
    if let Some(expr) = params.named("d").or_else(|| params.named("diameter")) {
        return eval_number(ev, expr, default * 2.0) / 2.0;
    }
    default
}

fn canonical_num(n: f64) -> String {
    format!("{n:.6}")
}

fn canonical_vec3(v: Vec3) -> String {
    format!("[{},{},{}]", canonical_num(v[0]), canonical_num(v[1]), canonical_num(v[2]))
}

fn cache_primitive<K: CsgKernel>(
    ev: &mut Evaluator<K>,
    op: &str,
    canonical_params: &[String],
    build: impl FnOnce(&K) -> Result<GeometryHandle, scad_csg::KernelError>,
    position: Option<scad_position::Position>,
) -> Option<GeometryHandle> {
    let key = scad_cache::PrimitiveKey::new(op, canonical_params);
    if let Some(cached) = ev.caches.primitives.get(&key) {
        return Some(cached);
    }
    match build(ev.kernel) {
        Ok(handle) => {
            ev.caches.primitives.insert(key, handle.clone());
            Some(handle)
        }
        Err(e) => {
            ev.diagnostics.push(EvalError::Kernel { message: e.0, position }.to_diagnostic());
            None
        }
    }
}

/// Translates a `StmtKind::Primitive` call into one [`CsgKernel`] call,
/// consulting the primitive cache first.
pub fn primitive<K: CsgKernel>(
    ev: &mut Evaluator<K>,
    op: PrimitiveOp,
    params: &ArgList,
    position: Option<scad_position::Position>,
) -> Option<GeometryHandle> {
    match op {
        PrimitiveOp::Cube => {
            let size = params.resolve(&["_positional", "size"]).map(|e| eval_vec3(ev, e, [1.0, 1.0, 1.0])).unwrap_or([1.0, 1.0, 1.0]);
            let center = params.named("center").map(|e| eval_bool(ev, e, false)).unwrap_or(false);
            let keys = vec![canonical_vec3(size), center.to_string()];
            cache_primitive(ev, "cube", &keys, |k| k.cube(size, center), position)
        }
        PrimitiveOp::Sphere => {
            let r = extract_radius(ev, params, 1.0);
            let segments = fragments_for(ev, params, r);
            let keys = vec![canonical_num(r), segments.to_string()];
            cache_primitive(ev, "sphere", &keys, |k| k.sphere(r, segments), position)
        }
        PrimitiveOp::Cylinder | PrimitiveOp::Cone => {
            let h = params.resolve(&["_positional", "h", "height"]).map(|e| eval_number(ev, e, 1.0)).unwrap_or(1.0);
            let r_default = if matches!(op, PrimitiveOp::Cone) { 0.0 } else { 1.0 };
            let (r1, r2) = extract_cylinder_radii(ev, params, r_default);
            let segments = fragments_for(ev, params, r1.max(r2));
            let center = params.named("center").map(|e| eval_bool(ev, e, false)).unwrap_or(false);
            let keys =
                vec![canonical_num(h), canonical_num(r1), canonical_num(r2), segments.to_string(), center.to_string()];
            cache_primitive(ev, "cylinder", &keys, |k| k.cylinder(h, r1, r2, segments, center), position)
        }
        PrimitiveOp::Circle => {
            let r = extract_radius(ev, params, 1.0);
            let segments = fragments_for(ev, params, r);
            let keys = vec![canonical_num(r), segments.to_string()];
            cache_primitive(ev, "circle", &keys, |k| k.circle(r, segments), position)
        }
        PrimitiveOp::Square => {
            let size = params.resolve(&["_positional", "size"]).map(|e| eval_vec2(ev, e, [1.0, 1.0])).unwrap_or([1.0, 1.0]);
            let center = params.named("center").map(|e| eval_bool(ev, e, false)).unwrap_or(false);
            let keys = vec![format!("[{},{}]", canonical_num(size[0]), canonical_num(size[1])), center.to_string()];
            cache_primitive(ev, "square", &keys, |k| k.square(size, center), position)
        }
        PrimitiveOp::Polygon => {
            let points = params
                .resolve(&["_positional", "points"])
                .map(|e| eval_points_2d(ev, e))
                .unwrap_or_default();
            let keys = vec![format!("{points:?}")];
            cache_primitive(ev, "polygon", &keys, |k| k.polygon(points.clone()), position)
        }
        PrimitiveOp::Polyhedron => {
            let points = params.resolve(&["_positional", "points"]).map(|e| eval_points_3d(ev, e)).unwrap_or_default();
            let faces = params.named("faces").map(|e| eval_faces(ev, e)).unwrap_or_default();
            let keys = vec![format!("{points:?}"), format!("{faces:?}")];
            cache_primitive(ev, "polyhedron", &keys, |k| k.polyhedron(points.clone(), faces.clone()), position)
        }
        PrimitiveOp::Text => {
            let text = params
                .resolve(&["_positional", "text"])
                .map(|e| eval_expr(ev, e).as_str().map(str::to_string).unwrap_or_default())
                .unwrap_or_default();
            let size = params.named("size").map(|e| eval_number(ev, e, 10.0)).unwrap_or(10.0);
            let font = params.named("font").and_then(|e| eval_expr(ev, e).as_str().map(str::to_string));
            let keys = vec![text.clone(), canonical_num(size), font.clone().unwrap_or_default()];
            cache_primitive(ev, "text", &keys, |k| k.text(text.clone(), size, font.clone()), position)
        }
        PrimitiveOp::Surface => {
            let file = params
                .resolve(&["_positional", "file"])
                .map(|e| eval_expr(ev, e).as_str().map(str::to_string).unwrap_or_default())
                .unwrap_or_default();
            let center = params.named("center").map(|e| eval_bool(ev, e, false)).unwrap_or(false);
            let invert = params.named("invert").map(|e| eval_bool(ev, e, false)).unwrap_or(false);
            // Surface data is file-backed, so it is never primitive-cached —
            // the file may change between calls within the same job.
            match ev.kernel.surface(&file, center, invert) {
                Ok(handle) => Some(handle),
                Err(e) => {
                    ev.diagnostics.push(EvalError::Kernel { message: e.0, position }.to_diagnostic());
                    None
                }
            }
        }
    }
}

fn extract_cylinder_radii<K: CsgKernel>(ev: &mut Evaluator<K>, params: &ArgList, default: f64) -> (f64, f64) {
    let base = extract_radius(ev, params, default);
    let r1 = params
        .named("r1")
        .map(|e| eval_number(ev, e, base))
        .or_else(|| params.named("d1").map(|e| eval_number(ev, e, base * 2.0) / 2.0))
        .unwrap_or(base);
    let r2 = params
        .named("r2")
        .map(|e| eval_number(ev, e, r1))
        .or_else(|| params.named("d2").map(|e| eval_number(ev, e, r1 * 2.0) / 2.0))
        .unwrap_or(r1);
    (r1, r2)
}

fn eval_points_2d<K: CsgKernel>(ev: &mut Evaluator<K>, expr: &Expr) -> Vec<[f64; 2]> {
    match eval_expr(ev, expr) {
        Value::Vector(rows) => rows
            .iter()
            .filter_map(|row| row.as_vector().map(|r| [r.first().and_then(Value::as_number).unwrap_or(0.0), r.get(1).and_then(Value::as_number).unwrap_or(0.0)]))
            .collect(),
        _ => Vec::new(),
    }
}

fn eval_points_3d<K: CsgKernel>(ev: &mut Evaluator<K>, expr: &Expr) -> Vec<Vec3> {
    match eval_expr(ev, expr) {
        Value::Vector(rows) => rows.iter().filter_map(|row| row.as_vector().map(|r| vec3_of(r, [0.0, 0.0, 0.0]))).collect(),
        _ => Vec::new(),
    }
}

fn eval_faces<K: CsgKernel>(ev: &mut Evaluator<K>, expr: &Expr) -> Vec<Vec<u32>> {
    match eval_expr(ev, expr) {
        Value::Vector(rows) => rows
            .iter()
            .map(|row| row.as_vector().map(|r| r.iter().filter_map(|i| i.as_number()).map(|n| n as u32).collect()).unwrap_or_default())
            .collect(),
        _ => Vec::new(),
    }
}

/// `translate`/`rotate`/`scale`/`mirror`/`multmatrix`/`resize`/`color`
///. `child` is `None` when the subtree evaluated to no
/// geometry, in which case every transform but `color` is a no-op.
pub fn transform<K: CsgKernel>(
    ev: &mut Evaluator<K>,
    op: TransformOp,
    params: &ArgList,
    child: Option<GeometryHandle>,
    position: Option<scad_position::Position>,
) -> Option<GeometryHandle> {
    match op {
        TransformOp::Color => return child.map(|h| apply_color(ev, params, h)),
        _ => {}
    }
    let child = child?;
    let result = match op {
        TransformOp::Translate => {
            let v = params.resolve(&["_positional", "v"]).map(|e| eval_vec3(ev, e, [0.0, 0.0, 0.0])).unwrap_or([0.0, 0.0, 0.0]);
            ev.kernel.translate(&child, v)
        }
        TransformOp::Rotate => return Some(apply_rotate(ev, params, child)),
        TransformOp::Scale => {
            let v = params.resolve(&["_positional", "v"]).map(|e| eval_vec3(ev, e, [1.0, 1.0, 1.0])).unwrap_or([1.0, 1.0, 1.0]);
            ev.kernel.scale(&child, v)
        }
        TransformOp::Mirror => {
            let v = params.resolve(&["_positional", "v"]).map(|e| eval_vec3(ev, e, [1.0, 0.0, 0.0])).unwrap_or([1.0, 0.0, 0.0]);
            ev.kernel.mirror(&child, v)
        }
        TransformOp::Multmatrix => {
            let m = params.resolve(&["_positional", "m"]).map(|e| eval_matrix(ev, e)).unwrap_or(identity_matrix());
            ev.kernel.multmatrix(&child, m)
        }
        TransformOp::Resize => {
            let size = params.resolve(&["_positional", "newsize"]).map(|e| eval_vec3(ev, e, [0.0, 0.0, 0.0])).unwrap_or([0.0, 0.0, 0.0]);
            let auto = params.named("auto").map(|e| eval_auto(ev, e)).unwrap_or([false, false, false]);
            ev.kernel.resize(&child, size, auto)
        }
        TransformOp::Color | TransformOp::Offset | TransformOp::Projection | TransformOp::LinearExtrude | TransformOp::RotateExtrude => {
            unreachable!("handled by the statement evaluator or above")
        }
    };
    match result {
        Ok(handle) => Some(handle),
        Err(e) => {
            ev.diagnostics.push(EvalError::Kernel { message: e.0, position }.to_diagnostic());
            None
        }
    }
}

fn eval_auto<K: CsgKernel>(ev: &mut Evaluator<K>, expr: &Expr) -> [bool; 3] {
    match eval_expr(ev, expr) {
        Value::Bool(b) => [b, b, b],
        Value::Vector(items) => [
            items.first().map(Value::is_truthy).unwrap_or(false),
            items.get(1).map(Value::is_truthy).unwrap_or(false),
            items.get(2).map(Value::is_truthy).unwrap_or(false),
        ],
        _ => [false, false, false],
    }
}

fn identity_matrix() -> Mat4 {
    let mut m = [0.0; 16];
    m[0] = 1.0;
    m[5] = 1.0;
    m[10] = 1.0;
    m[15] = 1.0;
    m
}

fn eval_matrix<K: CsgKernel>(ev: &mut Evaluator<K>, expr: &Expr) -> Mat4 {
    let Value::Vector(rows) = eval_expr(ev, expr) else { return identity_matrix() };
    let mut m = identity_matrix();
    for (r, row) in rows.iter().take(4).enumerate() {
        if let Some(cols) = row.as_vector() {
            for (c, value) in cols.iter().take(4).enumerate() {
                if let Some(n) = value.as_number() {
                    m[r * 4 + c] = n;
                }
            }
        }
    }
    m
}

/// Rotate with a bare vector is Euler XYZ degrees; rotate with a scalar
/// angle (and optional `v` axis) is rotation about an arbitrary axis, which
/// the kernel trait only expresses via `multmatrix` — so this builds the
/// Rodrigues rotation matrix for that case.
fn apply_rotate<K: CsgKernel>(ev: &mut Evaluator<K>, params: &ArgList, child: GeometryHandle) -> GeometryHandle {
    let Some(first) = params.resolve(&["_positional", "a"]) else { return child };
    let value = eval_expr(ev, first);
    let result = match value {
        Value::Vector(items) => {
            let euler = vec3_of(&items, [0.0, 0.0, 0.0]);
            ev.kernel.rotate(&child, euler)
        }
        Value::Number(angle) => {
            let axis = params.named("v").map(|e| eval_vec3(ev, e, [0.0, 0.0, 1.0])).unwrap_or([0.0, 0.0, 1.0]);
            ev.kernel.multmatrix(&child, rodrigues_matrix(axis, angle))
        }
        _ => return child,
    };
    match result {
        Ok(handle) => handle,
        Err(e) => {
            ev.diagnostics.push(EvalError::Kernel { message: e.0, position: None }.to_diagnostic());
            child
        }
    }
}

/// The standard axis-angle-to-rotation-matrix formula, in row-major flat
/// form with the affine row/column fixed to identity.
fn rodrigues_matrix(axis: Vec3, angle_degrees: f64) -> Mat4 {
    let len = (axis[0] * axis[0] + axis[1] * axis[1] + axis[2] * axis[2]).sqrt();
    if len < 1e-12 {
        return identity_matrix();
    }
    let (x, y, z) = (axis[0] / len, axis[1] / len, axis[2] / len);
    let theta = angle_degrees.to_radians();
    let (s, c) = (theta.sin(), theta.cos());
    let t = 1.0 - c;
    let mut m = identity_matrix();
    m[0] = t * x * x + c;
    m[1] = t * x * y - s * z;
    m[2] = t * x * z + s * y;
    m[4] = t * x * y + s * z;
    m[5] = t * y * y + c;
    m[6] = t * y * z - s * x;
    m[8] = t * x * z - s * y;
    m[9] = t * y * z + s * x;
    m[10] = t * z * z + c;
    m
}

/// `linear_extrude(height, twist, scale, slices)`: slices
/// only matters when the extrusion twists, so it otherwise defaults to 1.
pub fn linear_extrude<K: CsgKernel>(ev: &mut Evaluator<K>, params: &ArgList, child_2d: &GeometryHandle) -> Option<GeometryHandle> {
    let height = params.resolve(&["_positional", "height"]).map(|e| eval_number(ev, e, 100.0)).unwrap_or(100.0);
    let twist = params.named("twist").map(|e| eval_number(ev, e, 0.0)).unwrap_or(0.0);
    let scale = params.named("scale").map(|e| eval_vec2(ev, e, [1.0, 1.0])).unwrap_or([1.0, 1.0]);
    let slices = params
        .named("slices")
        .map(|e| eval_number(ev, e, 1.0) as u32)
        .unwrap_or_else(|| if twist != 0.0 { fragments_for(ev, params, height) } else { 1 });
    match ev.kernel.linear_extrude(child_2d, height, twist, scale, slices) {
        Ok(handle) => Some(handle),
        Err(e) => {
            ev.diagnostics.push(EvalError::Kernel { message: e.0, position: None }.to_diagnostic());
            None
        }
    }
}

/// `rotate_extrude(angle, segments)`. The kernel trait has
/// no way to query the 2D profile's extent, so the segment count uses a
/// unit-radius proxy — the tightest reasonable approximation without
/// widening the kernel contract.
pub fn rotate_extrude<K: CsgKernel>(ev: &mut Evaluator<K>, params: &ArgList, child_2d: &GeometryHandle) -> Option<GeometryHandle> {
    let angle = params.resolve(&["_positional", "angle"]).map(|e| eval_number(ev, e, 360.0)).unwrap_or(360.0);
    let segments = fragments_for(ev, params, 1.0);
    match ev.kernel.rotate_extrude(child_2d, angle, segments) {
        Ok(handle) => Some(handle),
        Err(e) => {
            ev.diagnostics.push(EvalError::Kernel { message: e.0, position: None }.to_diagnostic());
            None
        }
    }
}

/// `offset(r | delta, chamfer)` (offset by `r` (round) or
/// `chamfer=true` (miter)).
pub fn offset<K: CsgKernel>(ev: &mut Evaluator<K>, params: &ArgList, child_2d: &GeometryHandle) -> Option<GeometryHandle> {
    let delta = params.resolve(&["_positional", "r", "delta"]).map(|e| eval_number(ev, e, 1.0)).unwrap_or(1.0);
    let chamfer = params.named("chamfer").map(|e| eval_bool(ev, e, false)).unwrap_or(false);
    let join = if chamfer { JoinType::Miter } else { JoinType::Round };
    let miter_limit = params.named("miter_limit").map(|e| eval_number(ev, e, 2.0)).unwrap_or(2.0);
    let segments = fragments_for(ev, params, delta.abs());
    match ev.kernel.offset_2d(child_2d, delta, join, miter_limit, segments) {
        Ok(handle) => Some(handle),
        Err(e) => {
            ev.diagnostics.push(EvalError::Kernel { message: e.0, position: None }.to_diagnostic());
            None
        }
    }
}

/// `translate`/`rotate`/etc. per-transform argument extraction feeds
/// straight into the kernel; `color` never does — it stamps side-band
/// metadata instead and never touches the kernel at all.
fn apply_color<K: CsgKernel>(ev: &mut Evaluator<K>, params: &ArgList, handle: GeometryHandle) -> GeometryHandle {
    match parse_color(ev, params) {
        Some(rgba) => handle.with_color(rgba),
        None => handle,
    }
}

pub fn parse_color<K: CsgKernel>(ev: &mut Evaluator<K>, params: &ArgList) -> Option<Rgba> {
    if let Some(expr) = params.resolve(&["_positional", "c"]) {
        match eval_expr(ev, expr) {
            Value::Vector(items) => {
                let r = items.first().and_then(Value::as_number).unwrap_or(0.0) as f32;
                let g = items.get(1).and_then(Value::as_number).unwrap_or(0.0) as f32;
                let b = items.get(2).and_then(Value::as_number).unwrap_or(0.0) as f32;
                let a = items.get(3).and_then(Value::as_number).unwrap_or(1.0) as f32;
                return Some(Rgba::new(r, g, b, a));
            }
            Value::Str(s) => return parse_color_string(&s),
            _ => {}
        }
    }
    let (r, g, b) = (
        params.named("r").map(|e| eval_number(ev, e, 0.0)),
        params.named("g").map(|e| eval_number(ev, e, 0.0)),
        params.named("b").map(|e| eval_number(ev, e, 0.0)),
    );
    if r.is_some() || g.is_some() || b.is_some() {
        let a = params.named("a").map(|e| eval_number(ev, e, 1.0)).unwrap_or(1.0);
        return Some(Rgba::new(r.unwrap_or(0.0) as f32, g.unwrap_or(0.0) as f32, b.unwrap_or(0.0) as f32, a as f32));
    }
    None
}

/// A CSS color name, or one of the `#RGB`/`#RGBA`/`#RRGGBB`/`#RRGGBBAA`
/// hex forms.
fn parse_color_string(s: &str) -> Option<Rgba> {
    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex_color(hex);
    }
    CSS_COLORS.get(s.to_ascii_lowercase().as_str()).map(|&[r, g, b]| Rgba::new(r, g, b, 1.0))
}

fn parse_hex_color(hex: &str) -> Option<Rgba> {
    let expand = |c: char| -> Option<u8> { u8::from_str_radix(&format!("{c}{c}"), 16).ok() };
    let channel = |s: &str| -> Option<u8> { u8::from_str_radix(s, 16).ok() };
    let (r, g, b, a) = match hex.len() {
        3 => {
            let mut chars = hex.chars();
            (expand(chars.next()?)?, expand(chars.next()?)?, expand(chars.next()?)?, 255)
        }
        4 => {
            let mut chars = hex.chars();
            (expand(chars.next()?)?, expand(chars.next()?)?, expand(chars.next()?)?, expand(chars.next()?)?)
        }
        6 => (channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?, 255),
        8 => (channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?, channel(&hex[6..8])?),
        _ => return None,
    };
    Some(Rgba::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, a as f32 / 255.0))
}

static CSS_COLORS: phf::Map<&'static str, [f32; 3]> = phf::phf_map! {
    "black" => [0.0, 0.0, 0.0],
    "white" => [1.0, 1.0, 1.0],
    "red" => [1.0, 0.0, 0.0],
    "lime" => [0.0, 1.0, 0.0],
    "green" => [0.0, 0.5019608, 0.0],
    "blue" => [0.0, 0.0, 1.0],
    "yellow" => [1.0, 1.0, 0.0],
    "cyan" => [0.0, 1.0, 1.0],
    "aqua" => [0.0, 1.0, 1.0],
    "magenta" => [1.0, 0.0, 1.0],
    "fuchsia" => [1.0, 0.0, 1.0],
    "silver" => [0.7529412, 0.7529412, 0.7529412],
    "gray" => [0.5019608, 0.5019608, 0.5019608],
    "grey" => [0.5019608, 0.5019608, 0.5019608],
    "maroon" => [0.5019608, 0.0, 0.0],
    "olive" => [0.5019608, 0.5019608, 0.0],
    "purple" => [0.5019608, 0.0, 0.5019608],
    "teal" => [0.0, 0.5019608, 0.5019608],
    "navy" => [0.0, 0.0, 0.5019608],
    "orange" => [1.0, 0.64705884, 0.0],
    "pink" => [1.0, 0.7529412, 0.79607844],
    "brown" => [0.64705884, 0.16470589, 0.16470589],
    "gold" => [1.0, 0.84313726, 0.0],
    "indigo" => [0.29411766, 0.0, 0.50980395],
    "violet" => [0.93333334, 0.50980395, 0.93333334],
    "khaki" => [0.9411765, 0.9019608, 0.54901963],
    "salmon" => [0.98039216, 0.5019608, 0.44705883],
    "skyblue" => [0.5294118, 0.80784315, 0.92156863],
    "tomato" => [1.0, 0.3882353, 0.2784314],
    "transparent" => [0.0, 0.0, 0.0],
};

#[cfg(test)]
mod tests {
    use super::*;
    use scad_ast::stmt::Arg;
    use scad_ast::{ExprKind, Expr};
    use scad_position::{Position, Span};

    fn num(n: f64) -> Expr {
        Expr::new(ExprKind::Number(n), Span::point(Position::START))
    }

    #[test]
    fn resolve_builtin_args_reorders_named_rands_call() {
        let evaluated = vec![
            (Some(Arc::from("seed")), Value::Number(7.0)),
            (None, Value::Number(0.0)),
            (None, Value::Number(1.0)),
            (None, Value::Number(5.0)),
        ];
        let args = resolve_builtin_args("rands", &evaluated);
        assert_eq!(args, vec![Value::Number(0.0), Value::Number(1.0), Value::Number(5.0), Value::Number(7.0)]);
    }

    #[test]
    fn resolve_builtin_args_passes_through_unknown_builtin_positionally() {
        let evaluated = vec![(None, Value::Number(1.0)), (None, Value::Number(2.0))];
        assert_eq!(resolve_builtin_args("min", &evaluated), vec![Value::Number(1.0), Value::Number(2.0)]);
    }

    #[test]
    fn css_color_name_resolves() {
        assert_eq!(parse_color_string("Red"), Some(Rgba::new(1.0, 0.0, 0.0, 1.0)));
    }

    #[test]
    fn hex_rgb_and_rgba_parse() {
        assert_eq!(parse_color_string("#f00"), Some(Rgba::new(1.0, 0.0, 0.0, 1.0)));
        let rgba = parse_color_string("#ff000080").unwrap();
        assert!((rgba.a - 0.5019608).abs() < 1e-4);
    }

    #[test]
    fn radius_fallback_chain_prefers_positional_over_named() {
        let mut params = ArgList::new(vec![Arg { name: None, value: num(5.0) }, Arg { name: Some(Arc::from("r")), value: num(9.0) }]);
        params.0.truncate(2);
        assert_eq!(params.resolve(&["_positional", "r", "radius"]).unwrap(), &num(5.0));
    }
}
