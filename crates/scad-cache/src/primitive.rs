//! The primitive geometry cache (: key
//! `(op, canonicalized param map)`, capacity 100).

use crate::lru::LruMap;
use scad_csg::GeometryHandle;

const CAPACITY: usize = 100;

/// A canonical cache key for one primitive call: the operation name plus
/// its parameters rendered in a stable, sorted textual form. Callers are
/// responsible for canonicalizing (sorting named args, formatting numbers
/// with a fixed precision) before constructing this key, so that
/// semantically identical calls always hash the same.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrimitiveKey(pub String);

impl PrimitiveKey {
    /// Builds a key from an operation name and a list of already-sorted
    /// `name=value` parameter strings.
    pub fn new(op: &str, canonical_params: &[String]) -> Self {
        let mut key = String::from(op);
        key.push('(');
        key.push_str(&canonical_params.join(","));
        key.push(')');
        PrimitiveKey(key)
    }
}

pub struct PrimitiveCache {
    map: LruMap<PrimitiveKey, GeometryHandle>,
}

impl Default for PrimitiveCache {
    fn default() -> Self {
        PrimitiveCache { map: LruMap::new(CAPACITY) }
    }
}

impl PrimitiveCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, key: &PrimitiveKey) -> Option<GeometryHandle> {
        self.map.get(key).cloned()
    }

    pub fn insert(&mut self, key: PrimitiveKey, handle: GeometryHandle) {
        self.map.insert(key, handle);
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    pub fn fill_ratio(&self) -> f64 {
        self.map.fill_ratio()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scad_csg::HandleId;

    #[test]
    fn same_canonical_key_hits_cache() {
        let mut cache = PrimitiveCache::new();
        let key = PrimitiveKey::new("cube", &["size=10".to_string()]);
        cache.insert(key.clone(), GeometryHandle::new(HandleId(1), 0, None));
        assert!(cache.get(&key).is_some());
    }
}
