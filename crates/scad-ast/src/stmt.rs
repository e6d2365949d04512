//! The statement-level syntax tree ("Syntax tree").

use crate::expr::Expr;
use scad_position::Span;
use std::sync::Arc;

/// The three named primitive families and the two-dimensional shapes that
/// feed extrusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveOp {
    Cube,
    Sphere,
    Cylinder,
    Cone,
    Circle,
    Square,
    Polygon,
    Polyhedron,
    Text,
    Surface,
}

/// Affine and display transforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformOp {
    Translate,
    Rotate,
    Scale,
    Mirror,
    Multmatrix,
    Color,
    Resize,
    Offset,
    Projection,
    LinearExtrude,
    RotateExtrude,
}

/// CSG boolean combinators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOp {
    Union,
    Difference,
    Intersection,
    Hull,
    Minkowski,
}

/// The four display-modifier glyphs, applied to a statement's subtree
/// (`Modifier{kind, child}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierKind {
    Root,        // '!'
    Highlight,   // '#'
    Transparent, // '%'
    Disable,     // '*'
}

/// `import` pulls in definitions only; `include` also executes statements;
/// `use` imports modules only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    Import,
    Include,
    Use,
}

/// A single call argument: `name = expr` (named) or bare `expr` (positional).
#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    pub name: Option<Arc<str>>,
    pub value: Expr,
}

/// The reserved key under which the parser preserves the first positional
/// argument value (the parser preserves the first
/// positional value under a reserved key `_positional`).
pub const POSITIONAL_KEY: &str = "_positional";

/// Positional-and-named call arguments, in source order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArgList(pub Vec<Arg>);

impl ArgList {
    pub fn new(args: Vec<Arg>) -> Self {
        ArgList(args)
    }

    /// The first bare (unnamed) argument, stored under `_positional`.
    pub fn first_positional(&self) -> Option<&Expr> {
        self.0.iter().find(|a| a.name.is_none()).map(|a| &a.value)
    }

    /// Looks up a named argument by key.
    pub fn named(&self, key: &str) -> Option<&Expr> {
        self.0.iter().find(|a| a.name.as_deref() == Some(key)).map(|a| &a.value)
    }

    /// Implements the fallback chains used throughout e.g.
    /// radius extraction `_positional -> r -> radius`: tries `_positional`
    /// first (unless explicitly excluded), then each named key in order.
    pub fn resolve<'a>(&'a self, keys: &[&str]) -> Option<&'a Expr> {
        if keys.contains(&POSITIONAL_KEY) {
            if let Some(v) = self.first_positional() {
                return Some(v);
            }
        }
        for key in keys {
            if *key == POSITIONAL_KEY {
                continue;
            }
            if let Some(v) = self.named(key) {
                return Some(v);
            }
        }
        None
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arg> {
        self.0.iter()
    }
}

/// A module or function parameter, with an optional default expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Arc<str>,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// `;` by itself.
    Empty,
    Primitive {
        op: PrimitiveOp,
        params: ArgList,
    },
    Transform {
        op: TransformOp,
        params: ArgList,
        children: Vec<Stmt>,
    },
    Boolean {
        op: BooleanOp,
        children: Vec<Stmt>,
    },
    ModuleDef {
        name: Arc<str>,
        params: Vec<Param>,
        body: Vec<Stmt>,
    },
    FunctionDef {
        name: Arc<str>,
        params: Vec<Param>,
        expr: Expr,
    },
    ModuleCall {
        name: Arc<str>,
        params: ArgList,
        children: Vec<Stmt>,
    },
    If {
        cond: Expr,
        then_branch: Vec<Stmt>,
        else_branch: Option<Vec<Stmt>>,
    },
    For {
        var: Arc<str>,
        range: crate::expr::RangeExpr,
        body: Vec<Stmt>,
    },
    IntersectionFor {
        var: Arc<str>,
        range: crate::expr::RangeExpr,
        body: Vec<Stmt>,
    },
    Let {
        bindings: Vec<(Arc<str>, Expr)>,
        body: Vec<Stmt>,
    },
    Assignment {
        name: Arc<str>,
        expr: Expr,
    },
    Echo {
        values: Vec<Expr>,
    },
    Assert {
        cond: Expr,
        message: Option<Expr>,
    },
    Import {
        kind: ImportKind,
        filename: Arc<str>,
    },
    Modifier {
        kind: ModifierKind,
        child: Box<Stmt>,
    },
    Children {
        args: Vec<Expr>,
    },
}

/// One node of the statement tree, tagged with its source span
/// (each carrying a source line).
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Stmt { kind, span }
    }
}
