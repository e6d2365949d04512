//! Error types for the SCAD lexer, parser, and evaluator.
//!
//! Every error here carries enough context to render a [`Diagnostic`].
//! None of these are meant to propagate across the public `scad-kernel`
//! interface as a Rust `Err` — the evaluator always converts them into
//! diagnostics and a safe fallback value, so callers always get a result
//! structure back rather than a panic or an error return.

use scad_diagnostics::{Diagnostic, DiagnosticCode};
use scad_position::Position;
use thiserror::Error;

/// Failures the parser can record while resynchronizing
/// (records a diagnostic and attempts to resynchronize).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    #[error("unexpected end of input")]
    UnexpectedEof { position: Position },

    #[error("unexpected token: expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String, position: Position },

    #[error("invalid syntax: {message}")]
    InvalidSyntax { message: String, position: Position },

    #[error("invalid number literal: {literal}")]
    InvalidNumber { literal: String, position: Position },

    #[error("unterminated string literal")]
    UnterminatedString { position: Position },
}

impl ParseError {
    pub fn position(&self) -> Position {
        match self {
            ParseError::UnexpectedEof { position }
            | ParseError::UnexpectedToken { position, .. }
            | ParseError::InvalidSyntax { position, .. }
            | ParseError::InvalidNumber { position, .. }
            | ParseError::UnterminatedString { position } => *position,
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::new(DiagnosticCode::SyntaxError, self.to_string(), Some(self.position()))
    }
}

/// Failures during expression/statement evaluation.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EvalError {
    #[error("unknown identifier: {name}")]
    UnknownIdentifier { name: String, position: Option<Position> },

    #[error("type error: {message}")]
    Type { message: String, position: Option<Position> },

    #[error("recursion limit exceeded")]
    RecursionLimit { position: Option<Position> },

    #[error("range expansion exceeded {limit} values")]
    ResourceLimit { limit: usize, position: Option<Position> },

    #[error("geometry kernel error: {message}")]
    Kernel { message: String, position: Option<Position> },

    #[error("import error: {message}")]
    Import { message: String, position: Option<Position> },

    #[error("assertion failed{}", message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Assertion { message: Option<String>, position: Option<Position> },

    #[error("job timed out")]
    Timeout,
}

impl EvalError {
    pub fn to_diagnostic(&self) -> Diagnostic {
        let code = match self {
            EvalError::UnknownIdentifier { .. } => DiagnosticCode::UnknownIdentifier,
            EvalError::Type { .. } => DiagnosticCode::TypeError,
            EvalError::RecursionLimit { .. } => DiagnosticCode::RecursionLimit,
            EvalError::ResourceLimit { .. } => DiagnosticCode::ResourceLimit,
            EvalError::Kernel { .. } => DiagnosticCode::KernelError,
            EvalError::Import { .. } => DiagnosticCode::ImportError,
            EvalError::Assertion { .. } => DiagnosticCode::AssertionFailed,
            EvalError::Timeout => DiagnosticCode::Timeout,
        };
        let position = match self {
            EvalError::UnknownIdentifier { position, .. }
            | EvalError::Type { position, .. }
            | EvalError::RecursionLimit { position }
            | EvalError::ResourceLimit { position, .. }
            | EvalError::Kernel { position, .. }
            | EvalError::Import { position, .. }
            | EvalError::Assertion { position, .. } => *position,
            EvalError::Timeout => None,
        };
        Diagnostic::new(code, self.to_string(), position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_converts_to_diagnostic_with_position() {
        let err = ParseError::UnexpectedToken {
            expected: ")".into(),
            found: ";".into(),
            position: Position::new(4, 2),
        };
        let diag = err.to_diagnostic();
        assert_eq!(diag.code, Some(DiagnosticCode::SyntaxError));
        assert_eq!(diag.position, Some(Position::new(4, 2)));
    }

    #[test]
    fn assertion_message_is_optional() {
        let err = EvalError::Assertion { message: Some("nope".into()), position: None };
        assert!(err.to_string().contains("nope"));
        let err2 = EvalError::Assertion { message: None, position: None };
        assert_eq!(err2.to_string(), "assertion failed");
    }
}
