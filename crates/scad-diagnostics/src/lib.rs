//! Stable diagnostic codes, severities, and the `Diagnostic` record used
//! throughout the SCAD kernel.
//!
//! # Code ranges
//!
//! | Range       | Category                         |
//! |-------------|-----------------------------------|
//! | SK001-SK099 | Lexing/parsing (`syntax_error`)   |
//! | SK100-SK199 | Name resolution / types           |
//! | SK200-SK299 | Resource and recursion limits      |
//! | SK300-SK399 | Geometry kernel and import errors  |
//! | SK400-SK499 | Assertions and job lifecycle       |

use scad_position::Position;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a diagnostic. Only `Error` makes a job unsuccessful
/// (A job's final success flag is true iff its diagnostic
/// list contains no errors).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Severity {
    Warning = 1,
    Error = 2,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// The error-kind taxonomy of each with a fixed string tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    SyntaxError,
    UnknownIdentifier,
    TypeError,
    RecursionLimit,
    KernelError,
    ImportError,
    AssertionFailed,
    Timeout,
    ResourceLimit,
}

impl DiagnosticCode {
    /// The stable short tag referenced by ("a short tag from
    /// the error taxonomy").
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::SyntaxError => "SK001",
            DiagnosticCode::UnknownIdentifier => "SK100",
            DiagnosticCode::TypeError => "SK101",
            DiagnosticCode::RecursionLimit => "SK200",
            DiagnosticCode::ResourceLimit => "SK201",
            DiagnosticCode::KernelError => "SK300",
            DiagnosticCode::ImportError => "SK301",
            DiagnosticCode::AssertionFailed => "SK400",
            DiagnosticCode::Timeout => "SK401",
        }
    }

    /// The default severity for this code. `Timeout` is the only error kind
    /// that is fatal to the job; everything else defaults to
    /// `Error` too, since "warnings allowed" is reserved for caller-injected
    /// notices, not the kinds in this enum.
    pub fn severity(&self) -> Severity {
        Severity::Error
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One diagnostic entry: `{message, line?, column?, code?}` #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub message: String,
    pub position: Option<Position>,
    pub code: Option<DiagnosticCode>,
    pub severity: Severity,
}

impl Diagnostic {
    pub fn new(code: DiagnosticCode, message: impl Into<String>, position: Option<Position>) -> Self {
        let severity = code.severity();
        Diagnostic { message: message.into(), position, code: Some(code), severity }
    }

    /// A plain warning with no stable code, e.g. caller-facing advisories
    /// that do not fail the job.
    pub fn warning(message: impl Into<String>, position: Option<Position>) -> Self {
        Diagnostic { message: message.into(), position, code: None, severity: Severity::Warning }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(pos) = self.position {
            write!(f, "{pos}: ")?;
        }
        if let Some(code) = self.code {
            write!(f, "[{code}] ")?;
        }
        write!(f, "{}", self.message)
    }
}

/// An ordered collection of diagnostics, sorted by source position when
/// available.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diag: Diagnostic) {
        self.0.push(diag);
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(Diagnostic::is_error)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.0.extend(other.0);
    }

    /// Sorts in place by source position; diagnostics without a position
    /// sort last and keep their relative order.
    pub fn sort_by_position(&mut self) {
        self.0.sort_by_key(|d| (d.position.is_none(), d.position));
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.0
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl FromIterator<Diagnostic> for Diagnostics {
    fn from_iter<T: IntoIterator<Item = Diagnostic>>(iter: T) -> Self {
        Diagnostics(iter.into_iter().collect())
    }
}
