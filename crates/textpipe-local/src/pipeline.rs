//! The arbitration pipeline: iterate the strategy registry in fixed order,
//! gate every attempt, accept the first pass, and record the outcome.

use crate::gate::{GateDecision, QualityGate};
use crate::normalize;
use crate::stats::MethodStats;
use crate::strategies::{default_registry, Attempt, Extractor};
use std::collections::{BTreeMap, BTreeSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use textpipe_core::{Error, ExtractionOutcome, Result};

fn env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_usize(key: &str, default: usize) -> usize {
    env(key)
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(default)
}

pub struct ExtractionPipeline {
    registry: Vec<Box<dyn Extractor>>,
    gate: QualityGate,
    stats: Arc<MethodStats>,
}

impl std::fmt::Debug for ExtractionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionPipeline")
            .field("strategies", &self.registry.len())
            .finish_non_exhaustive()
    }
}

impl ExtractionPipeline {
    /// Canonical registry and gate. The gate threshold can be tuned with
    /// `TEXTPIPE_MIN_CONTENT_CHARS`.
    pub fn new(stats: Arc<MethodStats>) -> Self {
        let min = env_usize(
            "TEXTPIPE_MIN_CONTENT_CHARS",
            crate::gate::DEFAULT_MIN_CONTENT_CHARS,
        );
        Self {
            registry: default_registry(),
            gate: QualityGate::new(min),
            stats,
        }
    }

    /// Custom registry/gate. The registry must be non-empty and free of
    /// duplicate strategy identifiers; order defines priority.
    pub fn with_registry(
        registry: Vec<Box<dyn Extractor>>,
        gate: QualityGate,
        stats: Arc<MethodStats>,
    ) -> Result<Self> {
        if registry.is_empty() {
            return Err(Error::InvalidRegistry("registry is empty".to_string()));
        }
        let mut seen = BTreeSet::new();
        for strategy in &registry {
            if !seen.insert(strategy.method()) {
                return Err(Error::InvalidRegistry(format!(
                    "duplicate strategy: {}",
                    strategy.method()
                )));
            }
        }
        Ok(Self {
            registry,
            gate,
            stats,
        })
    }

    /// Run the fallback chain over already-fetched HTML.
    ///
    /// Each strategy gets exactly one attempt; the first attempt that passes
    /// the gate short-circuits the chain. Exhaustion is a reported failure,
    /// not a degraded outcome. Deterministic for identical html + registry.
    pub fn extract_from_html(&self, url: &str, html: &str) -> Result<ExtractionOutcome> {
        let t0 = Instant::now();
        for strategy in &self.registry {
            let method = strategy.method();
            let attempt = guarded_attempt(strategy.as_ref(), url, html);
            let cleaned = normalize::clean(&attempt.text);
            let decision = self.gate.decide(&attempt, &cleaned);
            if !decision.passed() {
                tracing::debug!(
                    method = method.as_str(),
                    decision = decision.as_str(),
                    url,
                    "strategy rejected"
                );
                continue;
            }

            self.stats.record_success(method);
            let title = attempt
                .title
                .as_deref()
                .map(normalize::clean)
                .filter(|t| !t.is_empty());
            let mut timings_ms = BTreeMap::new();
            timings_ms.insert("extract".to_string(), t0.elapsed().as_millis());
            return Ok(ExtractionOutcome {
                url: url.to_string(),
                title,
                text_chars: cleaned.chars().count(),
                text: cleaned,
                method,
                warnings: attempt.warnings.iter().map(|w| w.to_string()).collect(),
                timings_ms,
            });
        }

        self.stats.record_failure();
        Err(Error::UnableToExtract(url.to_string()))
    }
}

/// A strategy that panics must not take the process down: the panic is
/// converted into a failed attempt and the chain moves on.
fn guarded_attempt(strategy: &dyn Extractor, url: &str, html: &str) -> Attempt {
    let method = strategy.method();
    match catch_unwind(AssertUnwindSafe(|| strategy.attempt(url, html))) {
        Ok(attempt) => attempt,
        Err(_) => {
            tracing::debug!(method = method.as_str(), "strategy panicked");
            Attempt::failure(method, "strategy_panicked")
        }
    }
}
