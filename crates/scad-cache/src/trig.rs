//! The trig cache (: key "normalized integer degrees in
//! `[0, 360)`", capacity 360).
//!
//! `$fn`-driven tessellation calls `sin`/`cos` at the same handful of
//! integer degree values over and over; this cache skips recomputing them.

use crate::lru::LruMap;

const CAPACITY: usize = 360;
/// Degree values within this tolerance of an integer are treated as exact,
/// so near-integer angles produced by floating-point arithmetic still hit
/// the cache (consulted only when the degree argument
/// rounds cleanly to an integer degree within tolerance).
const TOLERANCE: f64 = 1e-9;

pub struct TrigCache {
    sin: LruMap<u16, f64>,
    cos: LruMap<u16, f64>,
    tan: LruMap<u16, f64>,
}

impl Default for TrigCache {
    fn default() -> Self {
        TrigCache { sin: LruMap::new(CAPACITY), cos: LruMap::new(CAPACITY), tan: LruMap::new(CAPACITY) }
    }
}

/// Normalizes `degrees` to an integer in `[0, 360)` if it is within
/// tolerance of one, otherwise returns `None` (direct computation is used).
fn normalize(degrees: f64) -> Option<u16> {
    let rounded = degrees.round();
    if (degrees - rounded).abs() > TOLERANCE {
        return None;
    }
    let normalized = ((rounded as i64).rem_euclid(360)) as u16;
    Some(normalized)
}

impl TrigCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sin_degrees(&mut self, degrees: f64) -> f64 {
        match normalize(degrees) {
            Some(key) => {
                if let Some(v) = self.sin.get(&key) {
                    *v
                } else {
                    let v = (key as f64).to_radians().sin();
                    self.sin.insert(key, v);
                    v
                }
            }
            None => degrees.to_radians().sin(),
        }
    }

    pub fn cos_degrees(&mut self, degrees: f64) -> f64 {
        match normalize(degrees) {
            Some(key) => {
                if let Some(v) = self.cos.get(&key) {
                    *v
                } else {
                    let v = (key as f64).to_radians().cos();
                    self.cos.insert(key, v);
                    v
                }
            }
            None => degrees.to_radians().cos(),
        }
    }

    pub fn tan_degrees(&mut self, degrees: f64) -> f64 {
        match normalize(degrees) {
            Some(key) => {
                if let Some(v) = self.tan.get(&key) {
                    *v
                } else {
                    let v = (key as f64).to_radians().tan();
                    self.tan.insert(key, v);
                    v
                }
            }
            None => degrees.to_radians().tan(),
        }
    }

    pub fn clear(&mut self) {
        self.sin.clear();
        self.cos.clear();
        self.tan.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_degrees_are_cached_and_correct() {
        let mut cache = TrigCache::new();
        assert!((cache.sin_degrees(90.0) - 1.0).abs() < 1e-12);
        assert!((cache.cos_degrees(180.0) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn negative_degrees_normalize_into_range() {
        let mut cache = TrigCache::new();
        let a = cache.sin_degrees(-90.0);
        let b = cache.sin_degrees(270.0);
        assert!((a - b).abs() < 1e-12);
    }

    #[test]
    fn non_integer_degrees_bypass_the_cache() {
        let mut cache = TrigCache::new();
        let v = cache.sin_degrees(45.5);
        assert!((v - 45.5f64.to_radians().sin()).abs() < 1e-12);
    }
}
