//! Token definitions shared by the SCAD lexer and parser.

use scad_position::Span;
use std::sync::Arc;

/// Reserved statement-level keywords.
///
/// `true`, `false`, and `undef` are deliberately absent: they lex as plain
/// identifiers and are recognized as literals by the expression evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Module,
    Function,
    If,
    Else,
    For,
    IntersectionFor,
    Let,
    Echo,
    Assert,
    Import,
    Include,
    Use,
}

impl Keyword {
    /// Maps an identifier's text onto a keyword, if it names one.
    pub fn lookup(ident: &str) -> Option<Keyword> {
        Some(match ident {
            "module" => Keyword::Module,
            "function" => Keyword::Function,
            "if" => Keyword::If,
            "else" => Keyword::Else,
            "for" => Keyword::For,
            "intersection_for" => Keyword::IntersectionFor,
            "let" => Keyword::Let,
            "echo" => Keyword::Echo,
            "assert" => Keyword::Assert,
            "import" => Keyword::Import,
            "include" => Keyword::Include,
            "use" => Keyword::Use,
            _ => return None,
        })
    }
}

/// Multi- and single-character operator glyphs.
///
/// Two-character operators are lexed as a single token; the lexer always
/// prefers the longer match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    EqEq,
    NotEq,
    Le,
    Ge,
    AndAnd,
    OrOr,
    Lt,
    Gt,
    Plus,
    Minus,
    Star,
    Slash,
    Assign,
    Question,
    Colon,
}

/// Structural punctuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punct {
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semicolon,
    Comma,
}

/// The three display-modifier glyphs.
///
/// `!` and `%` are ambiguous with the unary-not and modulo operators; the
/// lexer always produces `Modifier` for a bare occurrence (after ruling out
/// the two-character operators `!=`), and the parser resolves the role by
/// grammatical position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierGlyph {
    Root,        // '!'
    Highlight,   // '#'
    Transparent, // '%'
    Disable,     // '*' is lexed as Operator::Star; the parser decides its role.
}

/// The literal payload carried by `Number`, `String`, and `Identifier` tokens.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    Str(Arc<str>),
    Symbol(Arc<str>),
}

/// A classified lexeme, exhaustive over every token shape the lexer produces.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Str(Arc<str>),
    Identifier(Arc<str>),
    Keyword(Keyword),
    Operator(Operator),
    Punct(Punct),
    Modifier(ModifierGlyph),
    /// A byte the lexer could not classify. Never rejected by the lexer
    /// itself (the lexer never throws); the parser treats
    /// it as an unexpected token and records a diagnostic.
    Unknown(char),
    Eof,
}

/// A single lexical token with its source span.
///
/// `text` keeps the original slice so diagnostics can quote it; it is an
/// `Arc<str>` so cloning a token during lookahead/backtracking is cheap.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: Arc<str>,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<Arc<str>>, span: Span) -> Self {
        Token { kind, text: text.into(), span }
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }
}
