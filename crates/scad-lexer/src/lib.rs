//! Hand-written lexer for the SCAD declarative modeling language.
//!
//! The lexer streams over the input bytes, tracking `(line, column)`, and
//! classifies each byte through a 256-entry table built once at startup
//! rather than branching on ranges per character. It never fails: unknown
//! bytes become [`scad_token::TokenKind::Unknown`] tokens that the parser
//! rejects with a diagnostic.

mod classify;

use classify::{classify, CharClass};
use scad_position::{Position, Span};
use scad_token::{Keyword, ModifierGlyph, Operator, Punct, Token, TokenKind};
use std::sync::Arc;

/// Tokenizes `source` into a finite stream of tokens, always ending in one
/// `Eof` token. Deterministic: the same bytes always produce the same
/// tokens.
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let tok = lexer.next_token();
        let is_eof = tok.is_eof();
        tokens.push(tok);
        if is_eof {
            break;
        }
    }
    tokens
}

struct Lexer<'a> {
    src: &'a [u8],
    text: &'a str,
    pos: usize,
    position: Position,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Lexer { src: source.as_bytes(), text: source, pos: 0, position: Position::START }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        if b == b'\n' {
            self.position.advance_line();
        } else {
            self.position.advance_column();
        }
        Some(b)
    }

    fn slice(&self, start: usize) -> &'a str {
        &self.text[start..self.pos]
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(b) if classify(b) == CharClass::Whitespace => {
                    self.bump();
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while let Some(b) = self.peek() {
                        if b == b'\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    self.bump();
                    self.bump();
                    // Block comments do not nest.
                    loop {
                        match self.peek() {
                            None => break,
                            Some(b'*') if self.peek_at(1) == Some(b'/') => {
                                self.bump();
                                self.bump();
                                break;
                            }
                            Some(_) => {
                                self.bump();
                            }
                        }
                    }
                }
                _ => break,
            }
        }
    }

    fn next_token(&mut self) -> Token {
        self.skip_trivia();
        let start_pos = self.position;
        let start = self.pos;

        let Some(b) = self.peek() else {
            return Token::new(TokenKind::Eof, "", Span::point(start_pos));
        };

        let kind = match classify(b) {
            CharClass::Digit => self.lex_number(),
            CharClass::Quote => self.lex_string(b),
            CharClass::Alpha => self.lex_identifier(),
            CharClass::Operator => self.lex_operator(),
            CharClass::Punctuation => self.lex_punctuation(),
            CharClass::Whitespace | CharClass::Other => {
                self.bump();
                TokenKind::Unknown(b as char)
            }
        };

        let end_pos = self.position;
        Token::new(kind, self.slice(start), Span::new(start_pos, end_pos))
    }

    /// Integer part, optional `.` fraction, optional `e`/`E` exponent
    ///. A leading sign is never consumed here — unary
    /// `+`/`-` are handled by the parser's precedence climbing.
    fn lex_number(&mut self) -> TokenKind {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if classify(b) == CharClass::Digit) {
            self.bump();
        }
        if self.peek() == Some(b'.') && matches!(self.peek_at(1), Some(b) if classify(b) == CharClass::Digit)
        {
            self.bump();
            while matches!(self.peek(), Some(b) if classify(b) == CharClass::Digit) {
                self.bump();
            }
        }
        if matches!(self.peek(), Some(b'e') | Some(b'E')) {
            let save = self.pos;
            let save_line = self.position;
            self.bump();
            if matches!(self.peek(), Some(b'+') | Some(b'-')) {
                self.bump();
            }
            if matches!(self.peek(), Some(b) if classify(b) == CharClass::Digit) {
                while matches!(self.peek(), Some(b) if classify(b) == CharClass::Digit) {
                    self.bump();
                }
            } else {
                // Not actually an exponent; back out.
                self.pos = save;
                self.position = save_line;
            }
        }
        let text = &self.text[start..self.pos];
        let value = text.parse::<f64>().unwrap_or(f64::NAN);
        TokenKind::Number(value)
    }

    /// Double- or single-quoted strings with `\n \t \r \\ \" \'` escapes;
    /// an unknown escape yields the literal character.
    fn lex_string(&mut self, quote: u8) -> TokenKind {
        self.bump(); // opening quote
        let mut value = String::new();
        loop {
            match self.peek() {
                None => break,
                Some(b) if b == quote => {
                    self.bump();
                    break;
                }
                Some(b'\\') => {
                    self.bump();
                    match self.bump() {
                        Some(b'n') => value.push('\n'),
                        Some(b't') => value.push('\t'),
                        Some(b'r') => value.push('\r'),
                        Some(b'\\') => value.push('\\'),
                        Some(b'"') => value.push('"'),
                        Some(b'\'') => value.push('\''),
                        Some(other) => value.push(other as char),
                        None => break,
                    }
                }
                Some(_) => {
                    // Re-decode as UTF-8 so multi-byte source text survives.
                    let ch_start = self.pos;
                    self.bump();
                    while matches!(self.peek(), Some(b) if b & 0b1100_0000 == 0b1000_0000) {
                        self.bump();
                    }
                    value.push_str(&self.text[ch_start..self.pos]);
                }
            }
        }
        TokenKind::Str(Arc::from(value.as_str()))
    }

    fn lex_identifier(&mut self) -> TokenKind {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if classify(b) == CharClass::Alpha || classify(b) == CharClass::Digit)
        {
            self.bump();
        }
        let text = self.slice(start);
        if let Some(kw) = Keyword::lookup(text) {
            TokenKind::Keyword(kw)
        } else {
            TokenKind::Identifier(Arc::from(text))
        }
    }

    /// Two-character operators take precedence over one-character ones.
    /// `!`, `#`, `%` lex as modifiers unless they are the first half of
    /// `!=`.
    fn lex_operator(&mut self) -> TokenKind {
        let b = self.bump().expect("operator byte already peeked");
        let second = self.peek();
        macro_rules! two_char {
            ($c:expr, $op:expr) => {
                if second == Some($c) {
                    self.bump();
                    return TokenKind::Operator($op);
                }
            };
        }
        match b {
            b'=' => {
                two_char!(b'=', Operator::EqEq);
                TokenKind::Operator(Operator::Assign)
            }
            b'!' => {
                two_char!(b'=', Operator::NotEq);
                TokenKind::Modifier(ModifierGlyph::Root)
            }
            b'<' => {
                two_char!(b'=', Operator::Le);
                TokenKind::Operator(Operator::Lt)
            }
            b'>' => {
                two_char!(b'=', Operator::Ge);
                TokenKind::Operator(Operator::Gt)
            }
            b'&' => {
                two_char!(b'&', Operator::AndAnd);
                TokenKind::Unknown('&')
            }
            b'|' => {
                two_char!(b'|', Operator::OrOr);
                TokenKind::Unknown('|')
            }
            b'+' => TokenKind::Operator(Operator::Plus),
            b'-' => TokenKind::Operator(Operator::Minus),
            b'*' => TokenKind::Operator(Operator::Star),
            b'/' => TokenKind::Operator(Operator::Slash),
            b'%' => TokenKind::Modifier(ModifierGlyph::Transparent),
            b'?' => TokenKind::Operator(Operator::Question),
            b':' => TokenKind::Operator(Operator::Colon),
            b'#' => TokenKind::Modifier(ModifierGlyph::Highlight),
            other => TokenKind::Unknown(other as char),
        }
    }

    fn lex_punctuation(&mut self) -> TokenKind {
        let b = self.bump().expect("punctuation byte already peeked");
        match b {
            b'(' => TokenKind::Punct(Punct::LParen),
            b')' => TokenKind::Punct(Punct::RParen),
            b'{' => TokenKind::Punct(Punct::LBrace),
            b'}' => TokenKind::Punct(Punct::RBrace),
            b'[' => TokenKind::Punct(Punct::LBracket),
            b']' => TokenKind::Punct(Punct::RBracket),
            b';' => TokenKind::Punct(Punct::Semicolon),
            b',' => TokenKind::Punct(Punct::Comma),
            other => TokenKind::Unknown(other as char),
        }
    }
}
