//! Memory pressure classification and between-job cache cleanup.
//!
//! The corpus has no system-memory-sampling crate to reach for, so pressure
//! is tracked from the byte counts the caller reports after each job (pooled
//! buffer sizes, mesh byte sizes) rather than a true RSS sample.

use scad_cache::Caches;
use tracing::{debug, warn};

/// Threshold, in bytes, above which between-job cleanup clears pooled
/// buffers (e.g., 100 MB of pooled buffers).
const LARGE_BUFFER_THRESHOLD_BYTES: u64 = 100 * 1024 * 1024;

/// Pressure classification the evaluator consults to decide whether to
/// switch to chunked mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MemoryPressure {
    Low,
    Medium,
    High,
    Critical,
}

/// Tracks a baseline byte count per job and classifies pressure from the
/// running total reported since that baseline.
pub struct MemoryMonitor {
    baseline_bytes: u64,
    last_reported_bytes: u64,
}

impl MemoryMonitor {
    pub fn new() -> Self {
        MemoryMonitor { baseline_bytes: 0, last_reported_bytes: 0 }
    }

    /// Called once at job dequeue, before any buffers have been allocated
    /// for this job.
    pub fn start_job(&mut self) {
        self.baseline_bytes = self.last_reported_bytes;
    }

    /// Records a new total byte count observed during or after a job.
    pub fn report_bytes(&mut self, total_bytes: u64) {
        self.last_reported_bytes = total_bytes;
    }

    /// Classifies pressure from how far the current total has grown past
    /// the baseline recorded at job start.
    pub fn pressure(&self) -> MemoryPressure {
        let delta = self.last_reported_bytes.saturating_sub(self.baseline_bytes);
        match delta {
            0..=26_214_399 => MemoryPressure::Low,               // < 25 MiB growth
            26_214_400..=78_643_199 => MemoryPressure::Medium,   // < 75 MiB growth
            78_643_200..=157_286_399 => MemoryPressure::High,    // < 150 MiB growth
            _ => MemoryPressure::Critical,
        }
    }

    /// Between-job cleanup: clears pooled buffers over the large-buffer
    /// threshold and the expression memo once it is over half full. Caches
    /// are process-wide but accessed only between jobs under the
    /// single-slot queue policy, so no locking is needed here.
    pub fn clean_between_jobs(&mut self, caches: &mut Caches) {
        if self.last_reported_bytes > LARGE_BUFFER_THRESHOLD_BYTES {
            debug!(bytes = self.last_reported_bytes, "clearing primitive cache: large-buffer threshold exceeded");
            caches.primitives.clear();
        }
        if caches.expr_memo.is_over_half_full() {
            debug!("clearing expression memo: over half full");
            caches.expr_memo.clear();
        }
        if self.pressure() >= MemoryPressure::High {
            warn!(pressure = ?self.pressure(), "memory pressure high between jobs, clearing all caches");
            caches.clear_all();
        }
    }
}

impl Default for MemoryMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pressure_climbs_with_reported_growth() {
        let mut monitor = MemoryMonitor::new();
        monitor.start_job();
        assert_eq!(monitor.pressure(), MemoryPressure::Low);
        monitor.report_bytes(80 * 1024 * 1024);
        assert_eq!(monitor.pressure(), MemoryPressure::Medium);
        monitor.report_bytes(160 * 1024 * 1024);
        assert_eq!(monitor.pressure(), MemoryPressure::Critical);
    }

    #[test]
    fn clean_between_jobs_clears_over_half_full_memo() {
        let mut monitor = MemoryMonitor::new();
        let mut caches = Caches::new();
        monitor.clean_between_jobs(&mut caches);
        assert_eq!(caches.primitives.fill_ratio(), 0.0);
    }
}
