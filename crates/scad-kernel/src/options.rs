//! `EvalOptions` (`options`): the single configuration surface
//! for [`crate::evaluate`] and [`crate::Kernel::submit`].

use scad_queue::JobOptions;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// `options` table, `serde`-(de)serializable the way the
/// teacher's wire types are (Configuration).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalOptions {
    /// Binds `$preview` in the initial environment.
    #[serde(default)]
    pub preview_mode: bool,
    /// Forces sequential sub-evaluation. Reserved: the evaluator has no
    /// internal parallelism to disable, so this only exists
    /// to round-trip the option through a caller that sets it regardless.
    #[serde(default)]
    pub disable_parallel: bool,
    /// Overrides the 30 s default job deadline.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Seeds `($fn, $fa, $fs)` in the initial environment.
    #[serde(default = "default_fragment_defaults")]
    pub fragment_defaults: (f64, f64, f64),
    /// Extends the import resolver's search path beyond `OPENSCADPATH`.
    #[serde(default)]
    pub library_paths: Vec<PathBuf>,
    /// The directory `import`/`include`/`use` filenames resolve relative to.
    /// Defaults to the process's working directory.
    #[serde(default = "default_current_dir")]
    pub current_dir: PathBuf,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_fragment_defaults() -> (f64, f64, f64) {
    (0.0, 12.0, 2.0)
}

fn default_current_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for EvalOptions {
    fn default() -> Self {
        EvalOptions {
            preview_mode: false,
            disable_parallel: false,
            timeout_ms: default_timeout_ms(),
            fragment_defaults: default_fragment_defaults(),
            library_paths: Vec::new(),
            current_dir: default_current_dir(),
        }
    }
}

impl EvalOptions {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl From<EvalOptions> for JobOptions {
    fn from(options: EvalOptions) -> Self {
        JobOptions {
            preview_mode: options.preview_mode,
            disable_parallel: options.disable_parallel,
            timeout: options.timeout(),
            fragment_defaults: options.fragment_defaults,
            library_paths: options.library_paths,
            current_dir: options.current_dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeout_is_thirty_seconds() {
        assert_eq!(EvalOptions::default().timeout(), Duration::from_secs(30));
    }

    #[test]
    fn round_trips_through_serde_json() {
        let options = EvalOptions { preview_mode: true, ..EvalOptions::default() };
        let json = serde_json::to_string(&options).expect("serialize");
        let back: EvalOptions = serde_json::from_str(&json).expect("deserialize");
        assert!(back.preview_mode);
        assert_eq!(back.timeout_ms, 30_000);
    }
}
