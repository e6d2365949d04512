//! Scalar math built-ins.

use scad_cache::TrigCache;
use scad_value::Value;

fn unary(args: &[Value], f: impl Fn(f64) -> f64) -> Value {
    match args.first().and_then(Value::as_number) {
        Some(n) => Value::Number(f(n)),
        None => Value::Undef,
    }
}

pub fn abs(args: &[Value]) -> Value {
    unary(args, f64::abs)
}

pub fn ceil(args: &[Value]) -> Value {
    unary(args, f64::ceil)
}

pub fn floor(args: &[Value]) -> Value {
    unary(args, f64::floor)
}

pub fn round(args: &[Value]) -> Value {
    unary(args, f64::round)
}

pub fn sqrt(args: &[Value]) -> Value {
    unary(args, f64::sqrt)
}

pub fn exp(args: &[Value]) -> Value {
    unary(args, f64::exp)
}

pub fn sign(args: &[Value]) -> Value {
    unary(args, |n| if n > 0.0 { 1.0 } else if n < 0.0 { -1.0 } else { 0.0 })
}

/// `log(x)` is base-10; `ln(x)` is natural ("log | base-10;
/// ln is natural").
pub fn log(args: &[Value]) -> Value {
    unary(args, f64::log10)
}

pub fn ln(args: &[Value]) -> Value {
    unary(args, f64::ln)
}

pub fn sin(args: &[Value], trig: &mut TrigCache) -> Value {
    match args.first().and_then(Value::as_number) {
        Some(n) => Value::Number(trig.sin_degrees(n)),
        None => Value::Undef,
    }
}

pub fn cos(args: &[Value], trig: &mut TrigCache) -> Value {
    match args.first().and_then(Value::as_number) {
        Some(n) => Value::Number(trig.cos_degrees(n)),
        None => Value::Undef,
    }
}

pub fn tan(args: &[Value], trig: &mut TrigCache) -> Value {
    match args.first().and_then(Value::as_number) {
        Some(n) => Value::Number(trig.tan_degrees(n)),
        None => Value::Undef,
    }
}

pub fn asin(args: &[Value]) -> Value {
    unary(args, |n| n.asin().to_degrees())
}

pub fn acos(args: &[Value]) -> Value {
    unary(args, |n| n.acos().to_degrees())
}

pub fn atan(args: &[Value]) -> Value {
    unary(args, |n| n.atan().to_degrees())
}

pub fn atan2(args: &[Value]) -> Value {
    match (args.first().and_then(Value::as_number), args.get(1).and_then(Value::as_number)) {
        (Some(y), Some(x)) => Value::Number(y.atan2(x).to_degrees()),
        _ => Value::Undef,
    }
}

pub fn pow(args: &[Value]) -> Value {
    match (args.first().and_then(Value::as_number), args.get(1).and_then(Value::as_number)) {
        (Some(x), Some(y)) => Value::Number(x.powf(y)),
        _ => Value::Undef,
    }
}

/// `min`/`max` are variadic; non-numeric arguments make
/// the whole call `undef`.
pub fn min(args: &[Value]) -> Value {
    variadic_extreme(args, f64::min, f64::INFINITY)
}

pub fn max(args: &[Value]) -> Value {
    variadic_extreme(args, f64::max, f64::NEG_INFINITY)
}

fn variadic_extreme(args: &[Value], combine: impl Fn(f64, f64) -> f64, seed: f64) -> Value {
    if args.is_empty() {
        return Value::Undef;
    }
    let mut acc = seed;
    for arg in args {
        match arg.as_number() {
            Some(n) => acc = combine(acc, n),
            None => return Value::Undef,
        }
    }
    Value::Number(acc)
}
