//! String and table built-ins.

use scad_value::Value;
use std::sync::Arc;

/// Concatenates every argument's stringified form into one string
/// (`str(...)`).
pub fn str_(args: &[Value]) -> Value {
    let mut out = String::new();
    for arg in args {
        out.push_str(&arg.stringify());
    }
    Value::Str(Arc::from(out))
}

/// Codepoint to single-character string; `undef` for an invalid codepoint
/// (`chr(n)`).
pub fn chr(args: &[Value]) -> Value {
    match args.first().and_then(Value::as_number) {
        Some(n) if n >= 0.0 && n.fract() == 0.0 => {
            char::from_u32(n as u32).map(|c| Value::Str(Arc::from(c.to_string()))).unwrap_or(Value::Undef)
        }
        _ => Value::Undef,
    }
}

/// First character's codepoint; `undef` for an empty or non-string
/// argument (`ord(s)`).
pub fn ord(args: &[Value]) -> Value {
    match args.first().and_then(Value::as_str) {
        Some(s) => s.chars().next().map(|c| Value::Number(c as u32 as f64)).unwrap_or(Value::Undef),
        None => Value::Undef,
    }
}

/// Returns the elements of a value (string chars as one-char strings, or
/// vector elements) for use as a `search` haystack/needle sequence.
fn elements_of(value: &Value) -> Option<Vec<Value>> {
    match value {
        Value::Vector(items) => Some(items.clone()),
        Value::Str(s) => Some(s.chars().map(|c| Value::Str(Arc::from(c.to_string()))).collect()),
        _ => None,
    }
}

/// Extracts the column used for comparison when a haystack element is
/// itself a row (a vector), per `match_type` (`search`).
fn row_key(item: &Value, match_type: usize) -> Value {
    match item {
        Value::Vector(cols) => cols.get(match_type).cloned().unwrap_or(Value::Undef),
        other => other.clone(),
    }
}

fn find_indices(needle: &Value, haystack: &[Value], n_returns: usize, match_type: usize) -> Vec<Value> {
    let mut out = Vec::new();
    for (i, item) in haystack.iter().enumerate() {
        if &row_key(item, match_type) == needle {
            out.push(Value::Number(i as f64));
            if n_returns != 0 && out.len() >= n_returns {
                break;
            }
        }
    }
    out
}

/// `search(needle, haystack, n_returns=1, match_type=0)`: if `needle` is a
/// vector, each of its elements is searched independently and the results
/// are returned as a vector of index-vectors; otherwise (including a string
/// needle, which is a single value here, not a per-character vector)
/// `needle` is searched as one value and the result is a flat index
/// vector.
pub fn search(args: &[Value]) -> Value {
    let Some(needle) = args.first() else {
        return Value::Undef;
    };
    let Some(haystack) = args.get(1).and_then(elements_of) else {
        return Value::Undef;
    };
    let n_returns = args.get(2).and_then(Value::as_number).map(|n| n.max(0.0) as usize).unwrap_or(1);
    let match_type = args.get(3).and_then(Value::as_number).map(|n| n.max(0.0) as usize).unwrap_or(0);

    match needle {
        Value::Vector(needle_elements) => Value::Vector(
            needle_elements
                .iter()
                .map(|n| Value::Vector(find_indices(n, &haystack, n_returns, match_type)))
                .collect(),
        ),
        other => Value::Vector(find_indices(other, &haystack, n_returns, match_type)),
    }
}

/// `lookup(key, table)`: `table` is a vector of `[k, v]` pairs; linearly
/// interpolates between the bracketing pairs and clamps at the endpoints.
pub fn lookup(args: &[Value]) -> Value {
    let Some(key) = args.first().and_then(Value::as_number) else {
        return Value::Undef;
    };
    let Some(table) = args.get(1).and_then(Value::as_vector) else {
        return Value::Undef;
    };

    let mut pairs: Vec<(f64, f64)> = Vec::new();
    for entry in table {
        if let Some(row) = entry.as_vector() {
            if row.len() >= 2 {
                if let (Some(k), Some(v)) = (row[0].as_number(), row[1].as_number()) {
                    pairs.push((k, v));
                }
            }
        }
    }
    if pairs.is_empty() {
        return Value::Undef;
    }
    pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    if key <= pairs[0].0 {
        return Value::Number(pairs[0].1);
    }
    if key >= pairs[pairs.len() - 1].0 {
        return Value::Number(pairs[pairs.len() - 1].1);
    }
    for window in pairs.windows(2) {
        let (k0, v0) = window[0];
        let (k1, v1) = window[1];
        if key >= k0 && key <= k1 {
            if (k1 - k0).abs() < f64::EPSILON {
                return Value::Number(v0);
            }
            let t = (key - k0) / (k1 - k0);
            return Value::Number(v0 + t * (v1 - v0));
        }
    }
    Value::Undef
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn str_concatenates_stringified_args() {
        let args = [Value::Number(1.0), Value::Str(Arc::from("x"))];
        assert_eq!(str_(&args), Value::Str(Arc::from("1x")));
    }

    #[test]
    fn chr_and_ord_round_trip() {
        let c = chr(&[Value::Number(65.0)]);
        assert_eq!(c, Value::Str(Arc::from("A")));
        assert_eq!(ord(&[c]), Value::Number(65.0));
    }

    #[test]
    fn search_single_needle_respects_n_returns() {
        let haystack = Value::Vector(vec![
            Value::Number(1.0),
            Value::Number(2.0),
            Value::Number(1.0),
            Value::Number(1.0),
        ]);
        let result = search(&[Value::Number(1.0), haystack, Value::Number(2.0)]);
        assert_eq!(result, Value::Vector(vec![Value::Number(0.0), Value::Number(2.0)]));
    }

    #[test]
    fn search_string_needle_returns_flat_indices() {
        let haystack = Value::Str(Arc::from("abracadabra"));
        let none = search(&[Value::Str(Arc::from("x")), haystack.clone()]);
        assert_eq!(none, Value::Vector(vec![]));

        let first = search(&[Value::Str(Arc::from("a")), haystack.clone(), Value::Number(1.0)]);
        assert_eq!(first, Value::Vector(vec![Value::Number(0.0)]));

        let all = search(&[Value::Str(Arc::from("a")), haystack, Value::Number(0.0)]);
        assert_eq!(
            all,
            Value::Vector(vec![
                Value::Number(0.0),
                Value::Number(3.0),
                Value::Number(5.0),
                Value::Number(7.0),
                Value::Number(10.0),
            ])
        );
    }

    #[test]
    fn search_vector_needle_returns_vector_of_index_vectors() {
        let haystack = Value::Vector(vec![Value::Number(3.0), Value::Number(1.0), Value::Number(2.0)]);
        let needle = Value::Vector(vec![Value::Number(1.0), Value::Number(2.0)]);
        let result = search(&[needle, haystack]);
        assert_eq!(
            result,
            Value::Vector(vec![Value::Vector(vec![Value::Number(1.0)]), Value::Vector(vec![Value::Number(2.0)])])
        );
    }

    #[test]
    fn lookup_interpolates_and_clamps() {
        let table = Value::Vector(vec![
            Value::Vector(vec![Value::Number(0.0), Value::Number(0.0)]),
            Value::Vector(vec![Value::Number(10.0), Value::Number(100.0)]),
        ]);
        assert_eq!(lookup(&[Value::Number(5.0), table.clone()]), Value::Number(50.0));
        assert_eq!(lookup(&[Value::Number(-5.0), table.clone()]), Value::Number(0.0));
        assert_eq!(lookup(&[Value::Number(20.0), table]), Value::Number(100.0));
    }
}
