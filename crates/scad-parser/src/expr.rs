//! Expression grammar: precedence climbing over ternary → `||` → `&&` →
//! equality → relational → additive → multiplicative → unary → primary.

use crate::cursor::Cursor;
use scad_ast::{BinaryOp, CallArg, Expr, ExprKind, Generator, ListComprehension, RangeExpr, UnaryOp};
use scad_error::ParseError;
use scad_token::{Keyword, Operator, Punct, TokenKind};
use std::sync::Arc;

pub fn parse_expr(cur: &mut Cursor) -> Expr {
    parse_ternary(cur)
}

fn parse_ternary(cur: &mut Cursor) -> Expr {
    let start = cur.position();
    let cond = parse_or(cur);
    if matches!(cur.peek().kind, TokenKind::Operator(Operator::Question)) {
        cur.bump();
        let then_branch = parse_ternary(cur);
        expect_operator(cur, Operator::Colon, ":");
        let else_branch = parse_ternary(cur);
        let span = cur.span_since(start);
        return Expr::new(ExprKind::Ternary(Box::new(cond), Box::new(then_branch), Box::new(else_branch)), span);
    }
    cond
}

/// Entry point for range bounds, where ternary `?:` is not allowed
/// (ternary `:` is NOT allowed here).
fn parse_range_element(cur: &mut Cursor) -> Expr {
    parse_or(cur)
}

fn parse_or(cur: &mut Cursor) -> Expr {
    let start = cur.position();
    let mut lhs = parse_and(cur);
    while matches!(cur.peek().kind, TokenKind::Operator(Operator::OrOr)) {
        cur.bump();
        let rhs = parse_and(cur);
        let span = cur.span_since(start);
        lhs = Expr::new(ExprKind::Binary(BinaryOp::Or, Box::new(lhs), Box::new(rhs)), span);
    }
    lhs
}

fn parse_and(cur: &mut Cursor) -> Expr {
    let start = cur.position();
    let mut lhs = parse_equality(cur);
    while matches!(cur.peek().kind, TokenKind::Operator(Operator::AndAnd)) {
        cur.bump();
        let rhs = parse_equality(cur);
        let span = cur.span_since(start);
        lhs = Expr::new(ExprKind::Binary(BinaryOp::And, Box::new(lhs), Box::new(rhs)), span);
    }
    lhs
}

fn parse_equality(cur: &mut Cursor) -> Expr {
    let start = cur.position();
    let mut lhs = parse_relational(cur);
    loop {
        let op = match cur.peek().kind {
            TokenKind::Operator(Operator::EqEq) => BinaryOp::Eq,
            TokenKind::Operator(Operator::NotEq) => BinaryOp::NotEq,
            _ => break,
        };
        cur.bump();
        let rhs = parse_relational(cur);
        let span = cur.span_since(start);
        lhs = Expr::new(ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)), span);
    }
    lhs
}

fn parse_relational(cur: &mut Cursor) -> Expr {
    let start = cur.position();
    let mut lhs = parse_additive(cur);
    loop {
        let op = match cur.peek().kind {
            TokenKind::Operator(Operator::Lt) => BinaryOp::Lt,
            TokenKind::Operator(Operator::Gt) => BinaryOp::Gt,
            TokenKind::Operator(Operator::Le) => BinaryOp::Le,
            TokenKind::Operator(Operator::Ge) => BinaryOp::Ge,
            _ => break,
        };
        cur.bump();
        let rhs = parse_additive(cur);
        let span = cur.span_since(start);
        lhs = Expr::new(ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)), span);
    }
    lhs
}

fn parse_additive(cur: &mut Cursor) -> Expr {
    let start = cur.position();
    let mut lhs = parse_multiplicative(cur);
    loop {
        let op = match cur.peek().kind {
            TokenKind::Operator(Operator::Plus) => BinaryOp::Add,
            TokenKind::Operator(Operator::Minus) => BinaryOp::Sub,
            _ => break,
        };
        cur.bump();
        let rhs = parse_multiplicative(cur);
        let span = cur.span_since(start);
        lhs = Expr::new(ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)), span);
    }
    lhs
}

fn parse_multiplicative(cur: &mut Cursor) -> Expr {
    let start = cur.position();
    let mut lhs = parse_unary(cur);
    loop {
        let op = match cur.peek().kind {
            TokenKind::Operator(Operator::Star) => BinaryOp::Mul,
            TokenKind::Operator(Operator::Slash) => BinaryOp::Div,
            TokenKind::Modifier(scad_token::ModifierGlyph::Transparent) => BinaryOp::Mod,
            _ => break,
        };
        cur.bump();
        let rhs = parse_unary(cur);
        let span = cur.span_since(start);
        lhs = Expr::new(ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)), span);
    }
    lhs
}

fn parse_unary(cur: &mut Cursor) -> Expr {
    let start = cur.position();
    match cur.peek().kind {
        TokenKind::Operator(Operator::Minus) => {
            cur.bump();
            let operand = parse_unary(cur);
            let span = cur.span_since(start);
            Expr::new(ExprKind::Unary(UnaryOp::Neg, Box::new(operand)), span)
        }
        TokenKind::Modifier(scad_token::ModifierGlyph::Root) => {
            // A bare `!` only lexes here when it is not `!=`; in expression
            // position it is logical not (unary `!`).
            cur.bump();
            let operand = parse_unary(cur);
            let span = cur.span_since(start);
            Expr::new(ExprKind::Unary(UnaryOp::Not, Box::new(operand)), span)
        }
        TokenKind::Operator(Operator::Plus) => {
            // A leading `+` is accepted and discarded; it never changes
            // the operand's value.
            cur.bump();
            parse_unary(cur)
        }
        _ => parse_primary(cur),
    }
}

fn parse_primary(cur: &mut Cursor) -> Expr {
    let start = cur.position();
    let tok = cur.peek().clone();
    match tok.kind {
        TokenKind::Number(n) => {
            cur.bump();
            Expr::new(ExprKind::Number(n), cur.span_since(start))
        }
        TokenKind::Str(ref s) => {
            let s = s.clone();
            cur.bump();
            Expr::new(ExprKind::String(s), cur.span_since(start))
        }
        TokenKind::Identifier(ref name) => {
            let name = name.clone();
            cur.bump();
            match name.as_ref() {
                "true" => Expr::new(ExprKind::Bool(true), cur.span_since(start)),
                "false" => Expr::new(ExprKind::Bool(false), cur.span_since(start)),
                "undef" => Expr::new(ExprKind::Undef, cur.span_since(start)),
                _ => {
                    if matches!(cur.peek().kind, TokenKind::Punct(Punct::LParen)) {
                        parse_call(cur, name, start)
                    } else {
                        Expr::new(ExprKind::Variable(name), cur.span_since(start))
                    }
                }
            }
        }
        TokenKind::Punct(Punct::LParen) => {
            cur.bump();
            let inner = parse_ternary(cur);
            expect_punct(cur, Punct::RParen, ")");
            Expr::new(inner.kind, cur.span_since(start))
        }
        TokenKind::Punct(Punct::LBracket) => parse_bracket(cur, start),
        _ => {
            cur.error_unexpected("an expression");
            cur.bump();
            Expr::new(ExprKind::Undef, cur.span_since(start))
        }
    }
}

fn parse_call(cur: &mut Cursor, name: Arc<str>, start: scad_position::Position) -> Expr {
    expect_punct(cur, Punct::LParen, "(");
    let mut args = Vec::new();
    while !matches!(cur.peek().kind, TokenKind::Punct(Punct::RParen) | TokenKind::Eof) {
        let arg_name = parse_optional_arg_name(cur);
        let value = parse_ternary(cur);
        args.push(CallArg { name: arg_name, value });
        if matches!(cur.peek().kind, TokenKind::Punct(Punct::Comma)) {
            cur.bump();
        } else {
            break;
        }
    }
    expect_punct(cur, Punct::RParen, ")");
    Expr::new(ExprKind::Call(name, args), cur.span_since(start))
}

/// Looks ahead for `identifier '='` (not `==`) to detect a named argument.
pub(crate) fn parse_optional_arg_name(cur: &mut Cursor) -> Option<Arc<str>> {
    if let TokenKind::Identifier(name) = &cur.peek().kind {
        let name = name.clone();
        if matches!(cur.peek_at(1).kind, TokenKind::Operator(Operator::Assign)) {
            cur.bump();
            cur.bump();
            return Some(name);
        }
    }
    None
}

/// Parses the body of a `[ ... ]` expression: a list comprehension, a
/// range, or a vector literal, disambiguated by lookahead.
fn parse_bracket(cur: &mut Cursor, start: scad_position::Position) -> Expr {
    cur.bump(); // '['
    if matches!(cur.peek().kind, TokenKind::Keyword(Keyword::For)) {
        return parse_list_comprehension(cur, start);
    }

    if matches!(cur.peek().kind, TokenKind::Punct(Punct::RBracket)) {
        cur.bump();
        return Expr::new(ExprKind::Vector(Vec::new()), cur.span_since(start));
    }

    let first = parse_range_element(cur);
    if matches!(cur.peek().kind, TokenKind::Operator(Operator::Colon)) {
        let range = parse_range_tail(cur, first, start);
        expect_punct(cur, Punct::RBracket, "]");
        return Expr::new(ExprKind::Range(range), cur.span_since(start));
    }

    // A plain vector: reparse the first element at full ternary precedence
    // by continuing from where `first` already stands (ternary above `:`
    // cannot have started, since `:` would have been consumed above).
    let mut elements = vec![finish_ternary_from(cur, first)];
    while matches!(cur.peek().kind, TokenKind::Punct(Punct::Comma)) {
        cur.bump();
        elements.push(parse_ternary(cur));
    }
    expect_punct(cur, Punct::RBracket, "]");
    Expr::new(ExprKind::Vector(elements), cur.span_since(start))
}

/// Having parsed `first` as an or-level expression as a range lookahead
/// that turned out not to be a range, completes it into a full ternary
/// expression if a trailing `?:` follows.
fn finish_ternary_from(cur: &mut Cursor, first: Expr) -> Expr {
    let start = first.span.start;
    if matches!(cur.peek().kind, TokenKind::Operator(Operator::Question)) {
        cur.bump();
        let then_branch = parse_ternary(cur);
        expect_operator(cur, Operator::Colon, ":");
        let else_branch = parse_ternary(cur);
        let span = cur.span_since(start);
        return Expr::new(ExprKind::Ternary(Box::new(first), Box::new(then_branch), Box::new(else_branch)), span);
    }
    first
}

/// Parses `: step : end` (or `: end`) after `start` has already been
/// parsed, producing a [`RangeExpr`].
fn parse_range_tail(cur: &mut Cursor, start_expr: Expr, start: scad_position::Position) -> RangeExpr {
    cur.bump(); // ':'
    let second = parse_range_element(cur);
    if matches!(cur.peek().kind, TokenKind::Operator(Operator::Colon)) {
        cur.bump();
        let third = parse_range_element(cur);
        let span = cur.span_since(start);
        RangeExpr { start: Box::new(start_expr), step: Some(Box::new(second)), end: Box::new(third), span }
    } else {
        let span = cur.span_since(start);
        RangeExpr { start: Box::new(start_expr), step: None, end: Box::new(second), span }
    }
}

/// Parses the range header shared by `for`/`intersection_for` statements
/// (`'for' '(' name '=' Range ')'`). The range is always
/// bracketed: `[a:b]` or `[a:b:c]`.
pub(crate) fn parse_range_expr(cur: &mut Cursor) -> RangeExpr {
    let start = cur.position();
    expect_punct(cur, Punct::LBracket, "[");
    let first = parse_range_element(cur);
    if !matches!(cur.peek().kind, TokenKind::Operator(Operator::Colon)) {
        cur.error_unexpected("`:` in range expression");
        expect_punct(cur, Punct::RBracket, "]");
        let span = cur.span_since(start);
        return RangeExpr { start: Box::new(first.clone()), step: None, end: Box::new(first), span };
    }
    let range = parse_range_tail(cur, first, start);
    expect_punct(cur, Punct::RBracket, "]");
    range
}

fn parse_list_comprehension(cur: &mut Cursor, start: scad_position::Position) -> Expr {
    let mut generators = Vec::new();
    while matches!(cur.peek().kind, TokenKind::Keyword(Keyword::For)) {
        cur.bump();
        expect_punct(cur, Punct::LParen, "(");
        let var = expect_identifier(cur);
        expect_operator(cur, Operator::Assign, "=");
        let range = parse_range_expr(cur);
        expect_punct(cur, Punct::RParen, ")");
        generators.push(Generator { var, range });
    }
    let guard = if matches!(cur.peek().kind, TokenKind::Keyword(Keyword::If)) {
        cur.bump();
        expect_punct(cur, Punct::LParen, "(");
        let g = parse_ternary(cur);
        expect_punct(cur, Punct::RParen, ")");
        Some(Box::new(g))
    } else {
        None
    };
    let body = parse_ternary(cur);
    expect_punct(cur, Punct::RBracket, "]");
    let span = cur.span_since(start);
    Expr::new(ExprKind::ListComprehension(ListComprehension { generators, guard, body: Box::new(body) }), span)
}

pub(crate) fn expect_identifier(cur: &mut Cursor) -> Arc<str> {
    if let TokenKind::Identifier(name) = &cur.peek().kind {
        let name = name.clone();
        cur.bump();
        name
    } else {
        cur.error_unexpected("an identifier");
        Arc::from("")
    }
}

pub(crate) fn expect_punct(cur: &mut Cursor, punct: Punct, what: &str) {
    if matches!(&cur.peek().kind, TokenKind::Punct(p) if *p == punct) {
        cur.bump();
    } else {
        cur.error_unexpected(what);
    }
}

pub(crate) fn expect_operator(cur: &mut Cursor, op: Operator, what: &str) {
    if matches!(&cur.peek().kind, TokenKind::Operator(o) if *o == op) {
        cur.bump();
    } else {
        cur.error_unexpected(what);
    }
}

pub(crate) fn record_invalid_syntax(cur: &mut Cursor, message: impl Into<String>) {
    let position = cur.position();
    cur.error(ParseError::InvalidSyntax { message: message.into(), position });
}
