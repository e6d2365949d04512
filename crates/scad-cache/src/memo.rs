//! The expression memoizer (: key `(structural hash of
//! expression, hash of numeric/boolean vars in scope, capped at 10
//! names)`, capacity 1,000).

use crate::lru::LruMap;
use scad_value::Value;

const CAPACITY: usize = 1_000;
const MAX_SCOPE_NAMES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoKey {
    expr_hash: u64,
    scope_hash: u64,
}

impl MemoKey {
    pub fn new(expr_hash: u64, scope_hash: u64) -> Self {
        MemoKey { expr_hash, scope_hash }
    }

    /// Hashes up to the first [`MAX_SCOPE_NAMES`] `(name, numeric-or-bool
    /// value)` pairs in scope, in the order given. Non-numeric/boolean
    /// variables do not affect the hash, matching the cache's restriction
    /// to "numeric/boolean vars".
    pub fn hash_scope<'a>(vars: impl Iterator<Item = (&'a str, &'a Value)>) -> u64 {
        use std::hash::{Hash, Hasher};
        let mut hasher = rustc_hash::FxHasher::default();
        for (name, value) in vars.take(MAX_SCOPE_NAMES) {
            let bits = match value {
                Value::Number(n) => Some(n.to_bits()),
                Value::Bool(b) => Some(*b as u64),
                _ => None,
            };
            if let Some(bits) = bits {
                name.hash(&mut hasher);
                bits.hash(&mut hasher);
            }
        }
        hasher.finish()
    }
}

pub struct ExprMemo {
    map: LruMap<MemoKey, Value>,
}

impl Default for ExprMemo {
    fn default() -> Self {
        ExprMemo { map: LruMap::new(CAPACITY) }
    }
}

impl ExprMemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, key: &MemoKey) -> Option<Value> {
        self.map.get(key).cloned()
    }

    pub fn insert(&mut self, key: MemoKey, value: Value) {
        self.map.insert(key, value);
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// : "if expression memo exceeds 50% fill, clear it".
    pub fn is_over_half_full(&self) -> bool {
        self.map.fill_ratio() > 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_hash_ignores_non_numeric_vars() {
        let vars_a = [("x", Value::Number(1.0)), ("s", Value::Str(std::sync::Arc::from("a")))];
        let vars_b = [("x", Value::Number(1.0)), ("s", Value::Str(std::sync::Arc::from("b")))];
        let a = MemoKey::hash_scope(vars_a.iter().map(|(n, v)| (*n, v)));
        let b = MemoKey::hash_scope(vars_b.iter().map(|(n, v)| (*n, v)));
        assert_eq!(a, b);
    }

    #[test]
    fn scope_hash_changes_with_numeric_values() {
        let vars_a = [("x", Value::Number(1.0))];
        let vars_b = [("x", Value::Number(2.0))];
        let a = MemoKey::hash_scope(vars_a.iter().map(|(n, v)| (*n, v)));
        let b = MemoKey::hash_scope(vars_b.iter().map(|(n, v)| (*n, v)));
        assert_ne!(a, b);
    }
}
