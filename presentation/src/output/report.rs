//! Aggregate view over a batch of invocation results

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use toolgate_domain::InvocationResult;

/// Counts and latency figures for a batch of calls to one tool
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub calls: usize,
    pub succeeded: usize,
    /// Failed calls per error kind
    pub failures: BTreeMap<String, usize>,
    /// Backend attempts summed over all calls
    pub attempts: u64,
    /// Distinct idempotency keys seen
    pub distinct_keys: usize,
    pub latency_p50_ms: u64,
    pub latency_p95_ms: u64,
    pub latency_max_ms: u64,
    pub wall_time_ms: u64,
}

impl BatchReport {
    pub fn from_results(results: &[InvocationResult], wall_time_ms: u64) -> Self {
        let mut failures = BTreeMap::new();
        for kind in results.iter().filter_map(InvocationResult::error_kind) {
            *failures.entry(kind.as_str().to_string()).or_insert(0) += 1;
        }

        let keys: BTreeSet<&str> = results
            .iter()
            .filter_map(|r| r.idempotency_key.as_deref())
            .collect();

        let mut latencies: Vec<u64> = results.iter().map(|r| r.latency_ms).collect();
        latencies.sort_unstable();

        Self {
            calls: results.len(),
            succeeded: results.iter().filter(|r| r.is_success()).count(),
            failures,
            attempts: results.iter().map(|r| u64::from(r.usage.attempts)).sum(),
            distinct_keys: keys.len(),
            latency_p50_ms: percentile(&latencies, 50),
            latency_p95_ms: percentile(&latencies, 95),
            latency_max_ms: latencies.last().copied().unwrap_or(0),
            wall_time_ms,
        }
    }

    pub fn failed(&self) -> usize {
        self.calls - self.succeeded
    }
}

/// Nearest-rank percentile of sorted values
fn percentile(sorted: &[u64], pct: usize) -> u64 {
    if sorted.is_empty() {
        return 0;
    }
    let rank = (pct * sorted.len()).div_ceil(100).max(1);
    sorted[rank.min(sorted.len()) - 1]
}
