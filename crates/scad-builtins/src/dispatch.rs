//! Name-to-implementation dispatch for built-in function calls
//! (each failing with `undef` on type/arity mismatch).

use crate::{math, rands, string, vector};
use scad_cache::TrigCache;
use scad_value::Value;

/// Calls the built-in named `name` with already-evaluated `args`, or
/// returns `None` if `name` is not a built-in (the caller then tries a
/// user-defined function).
pub fn call(name: &str, args: &[Value], trig: &mut TrigCache) -> Option<Value> {
    Some(match name {
        "abs" => math::abs(args),
        "ceil" => math::ceil(args),
        "floor" => math::floor(args),
        "round" => math::round(args),
        "sqrt" => math::sqrt(args),
        "exp" => math::exp(args),
        "sign" => math::sign(args),
        "log" => math::log(args),
        "ln" => math::ln(args),
        "sin" => math::sin(args, trig),
        "cos" => math::cos(args, trig),
        "tan" => math::tan(args, trig),
        "asin" => math::asin(args),
        "acos" => math::acos(args),
        "atan" => math::atan(args),
        "atan2" => math::atan2(args),
        "min" => math::min(args),
        "max" => math::max(args),
        "pow" => math::pow(args),
        "norm" => vector::norm(args),
        "cross" => vector::cross(args),
        "concat" => vector::concat(args),
        "len" => vector::len(args),
        "str" => string::str_(args),
        "chr" => string::chr(args),
        "ord" => string::ord(args),
        "search" => string::search(args),
        "lookup" => string::lookup(args),
        "rands" => rands::rands(args),
        _ => return None,
    })
}

/// Whether `name` names a built-in at all, without calling it — used by
/// the evaluator to decide whether an unresolved call is a genuine unknown
/// identifier or a built-in invoked with the wrong arity.
pub fn is_builtin(name: &str) -> bool {
    matches!(
        name,
        "abs" | "ceil"
            | "floor"
            | "round"
            | "sqrt"
            | "exp"
            | "sign"
            | "log"
            | "ln"
            | "sin"
            | "cos"
            | "tan"
            | "asin"
            | "acos"
            | "atan"
            | "atan2"
            | "min"
            | "max"
            | "pow"
            | "norm"
            | "cross"
            | "concat"
            | "len"
            | "str"
            | "chr"
            | "ord"
            | "search"
            | "lookup"
            | "rands"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_name_returns_none() {
        let mut trig = TrigCache::new();
        assert!(call("not_a_builtin", &[], &mut trig).is_none());
        assert!(!is_builtin("not_a_builtin"));
    }

    #[test]
    fn known_name_dispatches() {
        let mut trig = TrigCache::new();
        assert_eq!(call("abs", &[Value::Number(-3.0)], &mut trig), Some(Value::Number(3.0)));
    }
}
