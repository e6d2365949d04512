//! Statement grammar: program, block, and the per-statement dispatch that
//! turns a call name into `Primitive`/`Transform`/`Boolean`/`ModuleCall`.

use crate::cursor::Cursor;
use crate::expr::{
    expect_identifier, expect_operator, expect_punct, parse_expr, parse_optional_arg_name, parse_range_expr,
};
use scad_ast::stmt::{
    Arg, ArgList, BooleanOp, ImportKind, ModifierKind, Param, PrimitiveOp, Stmt, StmtKind, TransformOp,
};
use scad_token::{Keyword, ModifierGlyph, Operator, Punct, TokenKind};
use std::sync::Arc;

/// Parses a whole source file: statements until EOF.
pub fn parse_program(cur: &mut Cursor) -> Vec<Stmt> {
    let mut stmts = Vec::new();
    while !cur.at_eof() {
        stmts.push(parse_statement(cur));
    }
    stmts
}

/// `Block ::= '{' Statement* '}' | Statement`.
fn parse_block(cur: &mut Cursor) -> Vec<Stmt> {
    if matches!(cur.peek().kind, TokenKind::Punct(Punct::LBrace)) {
        cur.bump();
        let mut stmts = Vec::new();
        while !matches!(cur.peek().kind, TokenKind::Punct(Punct::RBrace) | TokenKind::Eof) {
            stmts.push(parse_statement(cur));
        }
        expect_punct(cur, Punct::RBrace, "}");
        stmts
    } else {
        vec![parse_statement(cur)]
    }
}

fn parse_statement(cur: &mut Cursor) -> Stmt {
    let start = cur.position();

    if matches!(cur.peek().kind, TokenKind::Punct(Punct::Semicolon)) {
        cur.bump();
        return Stmt::new(StmtKind::Empty, cur.span_since(start));
    }

    if let Some(kind) = modifier_kind(cur) {
        cur.bump();
        let child = parse_statement(cur);
        return Stmt::new(StmtKind::Modifier { kind, child: Box::new(child) }, cur.span_since(start));
    }

    match cur.peek().kind.clone() {
        TokenKind::Keyword(Keyword::Module) => parse_module_def(cur, start),
        TokenKind::Keyword(Keyword::Function) => parse_function_def(cur, start),
        TokenKind::Keyword(Keyword::If) => parse_if(cur, start),
        TokenKind::Keyword(Keyword::For) => parse_for(cur, start, false),
        TokenKind::Keyword(Keyword::IntersectionFor) => parse_for(cur, start, true),
        TokenKind::Keyword(Keyword::Let) => parse_let(cur, start),
        TokenKind::Keyword(Keyword::Echo) => parse_echo(cur, start),
        TokenKind::Keyword(Keyword::Assert) => parse_assert(cur, start),
        TokenKind::Keyword(Keyword::Import) => parse_import(cur, start, ImportKind::Import),
        TokenKind::Keyword(Keyword::Include) => parse_import(cur, start, ImportKind::Include),
        TokenKind::Keyword(Keyword::Use) => parse_import(cur, start, ImportKind::Use),
        TokenKind::Identifier(name) => parse_identifier_statement(cur, start, name),
        _ => {
            cur.error_unexpected("a statement");
            cur.synchronize();
            Stmt::new(StmtKind::Empty, cur.span_since(start))
        }
    }
}

/// Whether the current token is a leading modifier glyph: `!`/`#`/`%`
/// always are; `*` is only when [`Cursor::star_is_disable_modifier`] says
/// so.
fn modifier_kind(cur: &Cursor) -> Option<ModifierKind> {
    match cur.peek().kind {
        TokenKind::Modifier(ModifierGlyph::Root) => Some(ModifierKind::Root),
        TokenKind::Modifier(ModifierGlyph::Highlight) => Some(ModifierKind::Highlight),
        TokenKind::Modifier(ModifierGlyph::Transparent) => Some(ModifierKind::Transparent),
        TokenKind::Operator(Operator::Star) if cur.star_is_disable_modifier() => Some(ModifierKind::Disable),
        _ => None,
    }
}

fn parse_params(cur: &mut Cursor) -> Vec<Param> {
    expect_punct(cur, Punct::LParen, "(");
    let mut params = Vec::new();
    while !matches!(cur.peek().kind, TokenKind::Punct(Punct::RParen) | TokenKind::Eof) {
        let name = expect_identifier(cur);
        let default = if matches!(cur.peek().kind, TokenKind::Operator(Operator::Assign)) {
            cur.bump();
            Some(parse_expr(cur))
        } else {
            None
        };
        params.push(Param { name, default });
        if matches!(cur.peek().kind, TokenKind::Punct(Punct::Comma)) {
            cur.bump();
        } else {
            break;
        }
    }
    expect_punct(cur, Punct::RParen, ")");
    params
}

fn parse_module_def(cur: &mut Cursor, start: scad_position::Position) -> Stmt {
    cur.bump(); // 'module'
    let name = expect_identifier(cur);
    let params = parse_params(cur);
    let body = parse_block(cur);
    Stmt::new(StmtKind::ModuleDef { name, params, body }, cur.span_since(start))
}

fn parse_function_def(cur: &mut Cursor, start: scad_position::Position) -> Stmt {
    cur.bump(); // 'function'
    let name = expect_identifier(cur);
    let params = parse_params(cur);
    expect_operator(cur, Operator::Assign, "=");
    let expr = parse_expr(cur);
    expect_punct(cur, Punct::Semicolon, ";");
    Stmt::new(StmtKind::FunctionDef { name, params, expr }, cur.span_since(start))
}

fn parse_if(cur: &mut Cursor, start: scad_position::Position) -> Stmt {
    cur.bump(); // 'if'
    expect_punct(cur, Punct::LParen, "(");
    let cond = parse_expr(cur);
    expect_punct(cur, Punct::RParen, ")");
    let then_branch = parse_block(cur);
    let else_branch = if matches!(cur.peek().kind, TokenKind::Keyword(Keyword::Else)) {
        cur.bump();
        Some(parse_block(cur))
    } else {
        None
    };
    Stmt::new(StmtKind::If { cond, then_branch, else_branch }, cur.span_since(start))
}

fn parse_for(cur: &mut Cursor, start: scad_position::Position, intersection: bool) -> Stmt {
    cur.bump(); // 'for' / 'intersection_for'
    expect_punct(cur, Punct::LParen, "(");
    let var = expect_identifier(cur);
    expect_operator(cur, Operator::Assign, "=");
    let range = parse_range_expr(cur);
    expect_punct(cur, Punct::RParen, ")");
    let body = parse_block(cur);
    let kind = if intersection {
        StmtKind::IntersectionFor { var, range, body }
    } else {
        StmtKind::For { var, range, body }
    };
    Stmt::new(kind, cur.span_since(start))
}

fn parse_let(cur: &mut Cursor, start: scad_position::Position) -> Stmt {
    cur.bump(); // 'let'
    expect_punct(cur, Punct::LParen, "(");
    let mut bindings = Vec::new();
    while !matches!(cur.peek().kind, TokenKind::Punct(Punct::RParen) | TokenKind::Eof) {
        let name = expect_identifier(cur);
        expect_operator(cur, Operator::Assign, "=");
        let value = parse_expr(cur);
        bindings.push((name, value));
        if matches!(cur.peek().kind, TokenKind::Punct(Punct::Comma)) {
            cur.bump();
        } else {
            break;
        }
    }
    expect_punct(cur, Punct::RParen, ")");
    let body = parse_block(cur);
    Stmt::new(StmtKind::Let { bindings, body }, cur.span_since(start))
}

fn parse_echo(cur: &mut Cursor, start: scad_position::Position) -> Stmt {
    cur.bump(); // 'echo'
    expect_punct(cur, Punct::LParen, "(");
    let mut values = Vec::new();
    while !matches!(cur.peek().kind, TokenKind::Punct(Punct::RParen) | TokenKind::Eof) {
        values.push(parse_expr(cur));
        if matches!(cur.peek().kind, TokenKind::Punct(Punct::Comma)) {
            cur.bump();
        } else {
            break;
        }
    }
    expect_punct(cur, Punct::RParen, ")");
    expect_punct(cur, Punct::Semicolon, ";");
    Stmt::new(StmtKind::Echo { values }, cur.span_since(start))
}

fn parse_assert(cur: &mut Cursor, start: scad_position::Position) -> Stmt {
    cur.bump(); // 'assert'
    expect_punct(cur, Punct::LParen, "(");
    let cond = parse_expr(cur);
    let message = if matches!(cur.peek().kind, TokenKind::Punct(Punct::Comma)) {
        cur.bump();
        Some(parse_expr(cur))
    } else {
        None
    };
    expect_punct(cur, Punct::RParen, ")");
    expect_punct(cur, Punct::Semicolon, ";");
    Stmt::new(StmtKind::Assert { cond, message }, cur.span_since(start))
}

/// `import <path.ext>` / `import "path.ext"` (and `include`/`use`, sharing
/// the same filename grammar, ).
fn parse_import(cur: &mut Cursor, start: scad_position::Position, kind: ImportKind) -> Stmt {
    cur.bump(); // 'import' / 'include' / 'use'
    let filename = parse_import_filename(cur);
    if matches!(cur.peek().kind, TokenKind::Punct(Punct::Semicolon)) {
        cur.bump();
    }
    Stmt::new(StmtKind::Import { kind, filename }, cur.span_since(start))
}

/// A filename is a plain string literal, or `'<' ... '>'` with the path
/// reconstructed by concatenating every token's raw text up to the closing
/// `>` (the lexer has no notion of path syntax, so `.`/`/` arrive as
/// whatever punctuation or `Unknown` bytes it happens to produce).
fn parse_import_filename(cur: &mut Cursor) -> Arc<str> {
    if let TokenKind::Str(s) = &cur.peek().kind {
        let s = s.clone();
        cur.bump();
        return s;
    }
    if matches!(cur.peek().kind, TokenKind::Operator(Operator::Lt)) {
        cur.bump();
        let mut path = String::new();
        while !matches!(cur.peek().kind, TokenKind::Operator(Operator::Gt) | TokenKind::Eof) {
            path.push_str(&cur.bump().text);
        }
        if matches!(cur.peek().kind, TokenKind::Operator(Operator::Gt)) {
            cur.bump();
        } else {
            cur.error_unexpected("`>` closing the import path");
        }
        return Arc::from(path);
    }
    cur.error_unexpected("a filename string or `<path>`");
    Arc::from("")
}

fn parse_identifier_statement(cur: &mut Cursor, start: scad_position::Position, name: Arc<str>) -> Stmt {
    cur.bump(); // the identifier
    if matches!(cur.peek().kind, TokenKind::Operator(Operator::Assign)) {
        cur.bump();
        let expr = parse_expr(cur);
        expect_punct(cur, Punct::Semicolon, ";");
        return Stmt::new(StmtKind::Assignment { name, expr }, cur.span_since(start));
    }
    parse_call_statement(cur, start, name)
}

fn parse_call_statement(cur: &mut Cursor, start: scad_position::Position, name: Arc<str>) -> Stmt {
    expect_punct(cur, Punct::LParen, "(");
    let mut args = Vec::new();
    while !matches!(cur.peek().kind, TokenKind::Punct(Punct::RParen) | TokenKind::Eof) {
        let arg_name = parse_optional_arg_name(cur);
        let value = parse_expr(cur);
        args.push(Arg { name: arg_name, value });
        if matches!(cur.peek().kind, TokenKind::Punct(Punct::Comma)) {
            cur.bump();
        } else {
            break;
        }
    }
    expect_punct(cur, Punct::RParen, ")");
    let params = ArgList::new(args);

    let children = if matches!(cur.peek().kind, TokenKind::Punct(Punct::LBrace)) {
        parse_block(cur)
    } else if matches!(cur.peek().kind, TokenKind::Punct(Punct::Semicolon)) {
        cur.bump();
        Vec::new()
    } else {
        Vec::new()
    };

    let kind = if name.as_ref() == "children" {
        StmtKind::Children { args: params.0.into_iter().map(|a| a.value).collect() }
    } else if let Some(op) = primitive_op(&name) {
        StmtKind::Primitive { op, params }
    } else if let Some(op) = transform_op(&name) {
        StmtKind::Transform { op, params, children }
    } else if let Some(op) = boolean_op(&name) {
        StmtKind::Boolean { op, children }
    } else {
        StmtKind::ModuleCall { name, params, children }
    };
    Stmt::new(kind, cur.span_since(start))
}

fn primitive_op(name: &str) -> Option<PrimitiveOp> {
    Some(match name {
        "cube" => PrimitiveOp::Cube,
        "sphere" => PrimitiveOp::Sphere,
        "cylinder" => PrimitiveOp::Cylinder,
        "cone" => PrimitiveOp::Cone,
        "circle" => PrimitiveOp::Circle,
        "square" => PrimitiveOp::Square,
        "polygon" => PrimitiveOp::Polygon,
        "polyhedron" => PrimitiveOp::Polyhedron,
        "text" => PrimitiveOp::Text,
        "surface" => PrimitiveOp::Surface,
        _ => return None,
    })
}

fn transform_op(name: &str) -> Option<TransformOp> {
    Some(match name {
        "translate" => TransformOp::Translate,
        "rotate" => TransformOp::Rotate,
        "scale" => TransformOp::Scale,
        "mirror" => TransformOp::Mirror,
        "multmatrix" => TransformOp::Multmatrix,
        "color" => TransformOp::Color,
        "resize" => TransformOp::Resize,
        "offset" => TransformOp::Offset,
        "projection" => TransformOp::Projection,
        "linear_extrude" => TransformOp::LinearExtrude,
        "rotate_extrude" => TransformOp::RotateExtrude,
        _ => return None,
    })
}

fn boolean_op(name: &str) -> Option<BooleanOp> {
    Some(match name {
        "union" => BooleanOp::Union,
        "difference" => BooleanOp::Difference,
        "intersection" => BooleanOp::Intersection,
        "hull" => BooleanOp::Hull,
        "minkowski" => BooleanOp::Minkowski,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use scad_lexer::tokenize;

    fn parse(src: &str) -> Vec<Stmt> {
        let tokens = tokenize(src);
        let mut cur = Cursor::new(tokens);
        parse_program(&mut cur)
    }

    #[test]
    fn empty_statement() {
        let stmts = parse(";");
        assert_eq!(stmts.len(), 1);
        assert_eq!(stmts[0].kind, StmtKind::Empty);
    }

    #[test]
    fn root_modifier_wraps_child() {
        let stmts = parse("!cube(1);");
        match &stmts[0].kind {
            StmtKind::Modifier { kind: ModifierKind::Root, child } => {
                assert!(matches!(child.kind, StmtKind::Primitive { op: PrimitiveOp::Cube, .. }));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn star_after_semicolon_is_disable_modifier() {
        let stmts = parse("; *cube(1);");
        match &stmts[1].kind {
            StmtKind::Modifier { kind: ModifierKind::Disable, .. } => {}
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn star_mid_expression_is_multiplication() {
        let stmts = parse("x = 2 * 3;");
        match &stmts[0].kind {
            StmtKind::Assignment { expr, .. } => {
                assert!(matches!(expr.kind, scad_ast::ExprKind::Binary(scad_ast::expr::BinaryOp::Mul, _, _)));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn module_and_function_defs() {
        let stmts = parse("module ring(r=1) { circle(r); } function sq(x) = x * x;");
        assert!(matches!(stmts[0].kind, StmtKind::ModuleDef { .. }));
        assert!(matches!(stmts[1].kind, StmtKind::FunctionDef { .. }));
    }

    #[test]
    fn if_else() {
        let stmts = parse("if (x > 0) cube(1); else sphere(1);");
        match &stmts[0].kind {
            StmtKind::If { else_branch: Some(eb), .. } => assert_eq!(eb.len(), 1),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn for_with_range_header() {
        let stmts = parse("for (i = [0:2:10]) cube(i);");
        match &stmts[0].kind {
            StmtKind::For { var, .. } => assert_eq!(var.as_ref(), "i"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn let_statement_with_body() {
        let stmts = parse("let (a = 1, b = 2) cube(a + b);");
        match &stmts[0].kind {
            StmtKind::Let { bindings, body } => {
                assert_eq!(bindings.len(), 2);
                assert_eq!(body.len(), 1);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn echo_and_assert() {
        let stmts = parse(r#"echo("hi", 1); assert(1 < 2, "nope");"#);
        assert!(matches!(stmts[0].kind, StmtKind::Echo { .. }));
        assert!(matches!(stmts[1].kind, StmtKind::Assert { message: Some(_), .. }));
    }

    #[test]
    fn import_forms() {
        let stmts = parse(r#"import "thing.stl"; include <lib/foo.scad>; use <bar.scad>;"#);
        match &stmts[0].kind {
            StmtKind::Import { kind: ImportKind::Import, filename } => assert_eq!(filename.as_ref(), "thing.stl"),
            other => panic!("unexpected: {other:?}"),
        }
        match &stmts[1].kind {
            StmtKind::Import { kind: ImportKind::Include, filename } => {
                assert_eq!(filename.as_ref(), "lib/foo.scad")
            }
            other => panic!("unexpected: {other:?}"),
        }
        match &stmts[2].kind {
            StmtKind::Import { kind: ImportKind::Use, filename } => assert_eq!(filename.as_ref(), "bar.scad"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn dispatch_primitive_transform_boolean_module_call() {
        let stmts = parse(
            "cube(1); translate([1,0,0]) sphere(1); union() { cube(1); sphere(1); } my_module(1, r=2);",
        );
        assert!(matches!(stmts[0].kind, StmtKind::Primitive { op: PrimitiveOp::Cube, .. }));
        assert!(matches!(stmts[1].kind, StmtKind::Transform { op: TransformOp::Translate, .. }));
        match &stmts[2].kind {
            StmtKind::Boolean { op: BooleanOp::Union, children } => assert_eq!(children.len(), 2),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(matches!(stmts[3].kind, StmtKind::ModuleCall { .. }));
    }

    #[test]
    fn children_call() {
        let stmts = parse("module m() { children(0); } ");
        match &stmts[0].kind {
            StmtKind::ModuleDef { body, .. } => {
                assert!(matches!(body[0].kind, StmtKind::Children { .. }));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
