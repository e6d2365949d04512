//! Token cursor, lookahead, and error resynchronization
//! (a single position cursor and an error list).

use scad_diagnostics::Diagnostics;
use scad_error::ParseError;
use scad_position::{Position, Span};
use scad_token::{Punct, Token, TokenKind};

pub struct Cursor {
    tokens: Vec<Token>,
    pos: usize,
    pub diagnostics: Diagnostics,
    /// The kind of the token most recently consumed, used to decide whether
    /// a leading `*` is the disable-modifier or the multiplication operator
    /// (previous meaningful token is `;`, `{`, `}`, `)`,
    /// or SOF).
    prev_significant: Option<TokenKind>,
}

impl Cursor {
    pub fn new(tokens: Vec<Token>) -> Self {
        Cursor { tokens, pos: 0, diagnostics: Diagnostics::default(), prev_significant: None }
    }

    pub fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    pub fn peek_at(&self, offset: usize) -> &Token {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    pub fn at_eof(&self) -> bool {
        self.peek().is_eof()
    }

    pub fn position(&self) -> Position {
        self.peek().span.start
    }

    /// Whether a `*` at the current position starts a disable-modifier.
    pub fn star_is_disable_modifier(&self) -> bool {
        match &self.prev_significant {
            None => true,
            Some(TokenKind::Punct(Punct::Semicolon))
            | Some(TokenKind::Punct(Punct::LBrace))
            | Some(TokenKind::Punct(Punct::RBrace))
            | Some(TokenKind::Punct(Punct::RParen)) => true,
            _ => false,
        }
    }

    /// Consumes and returns the current token, advancing the cursor.
    pub fn bump(&mut self) -> Token {
        let tok = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if !tok.is_eof() {
            self.pos += 1;
        }
        self.prev_significant = Some(tok.kind.clone());
        tok
    }

    pub fn span_since(&self, start: Position) -> Span {
        Span::new(start, self.peek_at(0).span.start.max(start))
    }

    /// Records a diagnostic without consuming any input — used for
    /// semantic errors (unknown primitive name, bad literal) discovered
    /// mid-parse.
    pub fn error(&mut self, err: ParseError) {
        self.diagnostics.push(err.to_diagnostic());
    }

    /// Records an "unexpected token" diagnostic for the current token.
    pub fn error_unexpected(&mut self, expected: impl Into<String>) {
        let found = describe(&self.peek().kind);
        let position = self.position();
        self.error(ParseError::UnexpectedToken { expected: expected.into(), found, position });
    }

    /// Consumes tokens until the next statement boundary (`;` consumed, or
    /// `}`/EOF left for the caller), "resynchronize at
    /// the next statement boundary (`;` or `}`)".
    pub fn synchronize(&mut self) {
        loop {
            match &self.peek().kind {
                TokenKind::Eof | TokenKind::Punct(Punct::RBrace) => return,
                TokenKind::Punct(Punct::Semicolon) => {
                    self.bump();
                    return;
                }
                _ => {
                    self.bump();
                }
            }
        }
    }
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Number(n) => format!("number `{n}`"),
        TokenKind::Str(s) => format!("string \"{s}\""),
        TokenKind::Identifier(s) => format!("identifier `{s}`"),
        TokenKind::Keyword(k) => format!("keyword `{k:?}`"),
        TokenKind::Operator(o) => format!("operator `{o:?}`"),
        TokenKind::Punct(p) => format!("`{p:?}`"),
        TokenKind::Modifier(m) => format!("modifier `{m:?}`"),
        TokenKind::Unknown(c) => format!("unknown byte `{c}`"),
        TokenKind::Eof => "end of input".to_string(),
    }
}
