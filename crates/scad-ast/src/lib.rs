//! Syntax tree and expression tree definitions.
//!
//! The tree is produced once by `scad-parser` and is immutable afterward
//! (invariants); nothing in this crate mutates a tree in place.

pub mod expr;
pub mod stmt;

pub use expr::{BinaryOp, CallArg, Expr, ExprKind, Generator, ListComprehension, RangeExpr, UnaryOp};
pub use stmt::{Arg, ArgList, ImportKind, ModifierKind, Param, Stmt, StmtKind};
