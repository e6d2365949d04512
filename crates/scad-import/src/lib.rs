//! File-level `import`/`include`/`use` resolution: locating the source
//! file, detecting cycles, and filtering its parsed statements down to the
//! subset each import kind exposes to the enclosing scope.

mod cycle;
mod resolver;

pub use cycle::{CycleGuard, CycleSet};
pub use resolver::Resolver;

use scad_ast::stmt::{ImportKind, Stmt, StmtKind};
use scad_diagnostics::Diagnostic;
use scad_error::EvalError;
use std::path::Path;

/// The outcome of loading one `import`/`include`/`use` statement: the
/// statements it exposes to the caller's scope, plus any diagnostics
/// produced while resolving or parsing the file.
#[derive(Debug, Clone, Default)]
pub struct LoadedImport {
    pub statements: Vec<Stmt>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Resolves, reads, parses, and filters `filename` per `kind`.
///
/// `cycles` tracks the per-job set of files currently on the active import
/// stack; a cycle (or a file that cannot be found/read) produces an
/// `import_error` diagnostic and no statements.
pub fn load(resolver: &Resolver, cycles: &mut CycleSet, kind: ImportKind, filename: &str) -> LoadedImport {
    let Some(path) = resolver.resolve(filename) else {
        return import_error(format!("could not resolve `{filename}`"));
    };

    let Some(_guard) = cycles.enter(&path) else {
        return import_error(format!("import cycle detected: `{}`", path.display()));
    };

    let source = match std::fs::read_to_string(&path) {
        Ok(s) => s,
        Err(e) => return import_error(format!("could not read `{}`: {e}", path.display())),
    };

    let parsed = scad_parser::parse(&source);
    let statements = filter_statements(kind, parsed.program);
    LoadedImport { statements, diagnostics: parsed.diagnostics.into_vec() }
}

fn import_error(message: String) -> LoadedImport {
    let diagnostic = EvalError::Import { message, position: None }.to_diagnostic();
    LoadedImport { statements: Vec::new(), diagnostics: vec![diagnostic] }
}

/// Filters a parsed file's top-level statements down to what each import
/// kind exposes:
/// - `import`: module/function definitions and assignments only.
/// - `include`: every statement, as if inlined verbatim.
/// - `use`: module definitions only.
fn filter_statements(kind: ImportKind, program: Vec<Stmt>) -> Vec<Stmt> {
    match kind {
        ImportKind::Include => program,
        ImportKind::Import => program
            .into_iter()
            .filter(|s| matches!(s.kind, StmtKind::ModuleDef { .. } | StmtKind::FunctionDef { .. } | StmtKind::Assignment { .. }))
            .collect(),
        ImportKind::Use => program.into_iter().filter(|s| matches!(s.kind, StmtKind::ModuleDef { .. })).collect(),
    }
}
