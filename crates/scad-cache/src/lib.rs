//! Fixed-capacity LRU caches consulted by the builtin library and the
//! primitive/transform dispatcher.

mod lru;
mod memo;
mod primitive;
mod trig;

pub use memo::{ExprMemo, MemoKey};
pub use primitive::{PrimitiveCache, PrimitiveKey};
pub use trig::TrigCache;

/// The three caches bundled together, since the render queue and memory
/// monitor clear them as a unit.
#[derive(Default)]
pub struct Caches {
    pub primitives: PrimitiveCache,
    pub expr_memo: ExprMemo,
    pub trig: TrigCache,
}

impl Caches {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear_all(&mut self) {
        self.primitives.clear();
        self.expr_memo.clear();
        self.trig.clear();
    }
}
