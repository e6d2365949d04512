//! Per-job import cycle detection: a set of normalized filenames currently
//! being included. Entering a file adds to the set, leaving removes it;
//! re-entry records a diagnostic and loads nothing.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Tracks files currently being processed on the active import stack for
/// one evaluation job. Lives inside the evaluator's context, not globally,
/// so concurrent jobs never interfere with each other's cycle detection.
#[derive(Debug, Default)]
pub struct CycleSet {
    active: HashSet<PathBuf>,
}

impl CycleSet {
    pub fn new() -> Self {
        CycleSet::default()
    }

    /// Attempts to enter `path`. Returns `None` (and leaves the set
    /// unchanged) if `path` is already on the active stack — the caller
    /// should record an import-cycle diagnostic and skip the file.
    /// Otherwise returns a guard that removes `path` when dropped.
    pub fn enter(&mut self, path: &Path) -> Option<CycleGuard<'_>> {
        let normalized = normalize(path);
        if !self.active.insert(normalized.clone()) {
            return None;
        }
        Some(CycleGuard { set: self, path: normalized })
    }
}

fn normalize(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Removes its path from the [`CycleSet`] on drop, so a file is only
/// "active" for the duration of its own (and nested) evaluation.
pub struct CycleGuard<'a> {
    set: &'a mut CycleSet,
    path: PathBuf,
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.set.active.remove(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reentry_while_active_is_rejected() {
        let mut set = CycleSet::new();
        let guard = set.enter(Path::new("a.scad"));
        assert!(guard.is_some());
        assert!(set.enter(Path::new("a.scad")).is_none());
    }

    #[test]
    fn leaving_allows_reentry() {
        let mut set = CycleSet::new();
        {
            let _guard = set.enter(Path::new("a.scad"));
        }
        assert!(set.enter(Path::new("a.scad")).is_some());
    }

    #[test]
    fn distinct_files_do_not_conflict() {
        let mut set = CycleSet::new();
        let _a = set.enter(Path::new("a.scad"));
        assert!(set.enter(Path::new("b.scad")).is_some());
    }
}
