//! Process-wide success counters: one per strategy plus a failure bucket.
//!
//! Counters are cumulative for the process lifetime; there is no windowing,
//! no decay and no reset. Increments are atomic, so concurrent pipeline runs
//! never lose updates, and `snapshot` is a point-in-time read that never
//! blocks writers.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use textpipe_core::ExtractionMethod;

/// Stats key for runs where every strategy was rejected.
pub const FAILURE_KEY: &str = "none";

#[derive(Debug)]
pub struct MethodStats {
    successes: [AtomicU64; ExtractionMethod::ALL.len()],
    failures: AtomicU64,
}

impl Default for MethodStats {
    fn default() -> Self {
        Self::new()
    }
}

impl MethodStats {
    pub const fn new() -> Self {
        const ZERO: AtomicU64 = AtomicU64::new(0);
        Self {
            successes: [ZERO; ExtractionMethod::ALL.len()],
            failures: AtomicU64::new(0),
        }
    }

    fn index(method: ExtractionMethod) -> usize {
        match method {
            ExtractionMethod::Readability => 0,
            ExtractionMethod::Arc90 => 1,
            ExtractionMethod::TextDensity => 2,
            ExtractionMethod::Paragraphs => 3,
            ExtractionMethod::RawHtml => 4,
        }
    }

    pub fn record_success(&self, method: ExtractionMethod) {
        // Relaxed: these are monotone counters with no cross-counter ordering.
        self.successes[Self::index(method)].fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count_for(&self, method: ExtractionMethod) -> u64 {
        self.successes[Self::index(method)].load(Ordering::Relaxed)
    }

    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Every method key plus [`FAILURE_KEY`], zero-valued entries included,
    /// so callers can rely on the key set being complete.
    pub fn snapshot(&self) -> BTreeMap<String, u64> {
        let mut out = BTreeMap::new();
        for method in ExtractionMethod::ALL {
            out.insert(method.as_str().to_string(), self.count_for(method));
        }
        out.insert(FAILURE_KEY.to_string(), self.failure_count());
        out
    }
}

/// The process-wide table backing the module-level `extract`/`stats_snapshot`
/// API. Initialized to all-zero on first use; never torn down.
pub fn global() -> Arc<MethodStats> {
    static GLOBAL: OnceLock<Arc<MethodStats>> = OnceLock::new();
    GLOBAL.get_or_init(|| Arc::new(MethodStats::new())).clone()
}
