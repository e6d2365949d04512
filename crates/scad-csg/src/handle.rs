//! The opaque, reference-counted geometry handle.

use std::rc::Rc;

/// An identifier a [`CsgKernel`](crate::CsgKernel) implementation uses to
/// look up its own backing geometry. Scoped to one kernel instance; not
/// meaningful across kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleId(pub u64);

/// RGBA color, components clamped to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Rgba { r: r.clamp(0.0, 1.0), g: g.clamp(0.0, 1.0), b: b.clamp(0.0, 1.0), a: a.clamp(0.0, 1.0) }
    }
}

/// The two display-modifier glyphs that can be stamped onto a handle's
/// side-band metadata (`!` selects a root and never reaches a handle itself).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleModifier {
    Highlight,   // '#'
    Transparent, // '%'
}

/// An opaque, immutable reference to geometry owned by the external CSG
/// kernel, annotated with the side-band metadata the evaluator recognizes:
/// color, modifier, object identifier, and source line.
///
/// Cloning a handle is cheap — it shares the kernel-owned geometry via
/// reference counting; the kernel implementation is responsible for
/// releasing the underlying resource once the last clone drops.
#[derive(Debug, Clone)]
pub struct GeometryHandle {
    pub id: HandleId,
    pub color: Option<Rgba>,
    pub modifier: Option<HandleModifier>,
    pub object_id: u64,
    pub line: Option<u32>,
    refcount_token: Rc<()>,
}

impl GeometryHandle {
    pub fn new(id: HandleId, object_id: u64, line: Option<u32>) -> Self {
        GeometryHandle { id, color: None, modifier: None, object_id, line, refcount_token: Rc::new(()) }
    }

    /// Returns a clone of `self` with a replaced color, preserving
    /// everything else ("Color propagation").
    pub fn with_color(&self, color: Rgba) -> Self {
        let mut next = self.clone();
        next.color = Some(color);
        next
    }

    pub fn with_modifier(&self, modifier: HandleModifier) -> Self {
        let mut next = self.clone();
        next.modifier = Some(modifier);
        next
    }

    /// Number of live clones of this exact handle, for diagnostics/tests —
    /// not a substitute for the kernel's own resource accounting.
    pub fn strong_count(&self) -> usize {
        Rc::strong_count(&self.refcount_token)
    }
}

impl PartialEq for GeometryHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
