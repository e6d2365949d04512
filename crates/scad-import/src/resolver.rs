//! File resolution order for `import`/`include`/`use`
//! (current directory, `./lib/`, `./modules/`,
//! colon-separated paths from environment variable `OPENSCADPATH`, system
//! library paths).

use std::env;
use std::path::{Path, PathBuf};

const RELATIVE_SEARCH_DIRS: &[&str] = ["lib", "modules"];

#[cfg(unix)]
const PATH_SEPARATOR: char = ':';
#[cfg(windows)]
const PATH_SEPARATOR: char = ';';

#[cfg(unix)]
fn system_library_paths() -> Vec<PathBuf> {
    vec![PathBuf::from("/usr/share/scad-kernel/libraries"), PathBuf::from("/usr/local/share/scad-kernel/libraries")]
}

#[cfg(not(unix))]
fn system_library_paths() -> Vec<PathBuf> {
    Vec::new()
}

/// Resolves `import`/`include`/`use` filenames to a file on disk, searching
/// the current directory, `./lib/`, `./modules/`, `OPENSCADPATH`, and
/// finally the platform's system library paths, in that order.
pub struct Resolver {
    current_dir: PathBuf,
    extra_library_paths: Vec<PathBuf>,
}

impl Resolver {
    pub fn new(current_dir: impl Into<PathBuf>) -> Self {
        Resolver { current_dir: current_dir.into(), extra_library_paths: Vec::new() }
    }

    /// Extends the search path with caller-supplied directories
    /// (`options.library_paths`).
    pub fn with_library_paths(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.extra_library_paths.extend(paths);
        self
    }

    fn opensc_ad_path_dirs(&self) -> Vec<PathBuf> {
        env::var("OPENSCADPATH")
            .ok()
            .map(|raw| raw.split(PATH_SEPARATOR).map(PathBuf::from).collect())
            .unwrap_or_default()
    }

    /// Resolves `filename` to an existing file path, or `None` if it cannot
    /// be found anywhere in the search order.
    pub fn resolve(&self, filename: &str) -> Option<PathBuf> {
        let filename = Path::new(filename);
        if filename.is_absolute() {
            return filename.is_file().then(|| filename.to_path_buf());
        }

        let candidate = self.current_dir.join(filename);
        if candidate.is_file() {
            return Some(candidate);
        }

        for dir in RELATIVE_SEARCH_DIRS {
            let candidate = self.current_dir.join(dir).join(filename);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        for dir in self.opensc_ad_path_dirs().into_iter().chain(self.extra_library_paths.clone()) {
            let candidate = dir.join(filename);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        for dir in system_library_paths() {
            let candidate = dir.join(filename);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        None
    }
}
