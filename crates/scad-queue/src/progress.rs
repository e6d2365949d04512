//! Progress stage reporting (Progress stages (reported
//! monotonically with progress in `[0,1]`)).

/// One of the six stages a job passes through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStage {
    Initializing,
    Parsing,
    Analyzing,
    Evaluating,
    Serializing,
    Complete,
}

impl ProgressStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressStage::Initializing => "initializing",
            ProgressStage::Parsing => "parsing",
            ProgressStage::Analyzing => "analyzing",
            ProgressStage::Evaluating => "evaluating",
            ProgressStage::Serializing => "serializing",
            ProgressStage::Complete => "complete",
        }
    }
}

/// A caller-supplied sink for stage/progress updates, optional per job.
pub type ProgressCallback = Box<dyn Fn(ProgressStage, f32) + Send>;

/// Wraps an optional [`ProgressCallback`] so job code can report
/// unconditionally without matching on `Option` at every call site.
pub(crate) struct ProgressReporter {
    callback: Option<ProgressCallback>,
}

impl ProgressReporter {
    pub(crate) fn new(callback: Option<ProgressCallback>) -> Self {
        ProgressReporter { callback }
    }

    pub(crate) fn report(&self, stage: ProgressStage, progress: f32) {
        if let Some(callback) = &self.callback {
            callback(stage, progress.clamp(0.0, 1.0));
        }
    }
}
