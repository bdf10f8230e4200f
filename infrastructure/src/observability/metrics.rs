//! In-process metrics registry
//!
//! Series are keyed by metric name plus the sorted tag set. Counters add
//! up; observations and timings keep every sample.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use toolgate_application::ports::metrics::{Metrics, Tags};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricSeries {
    pub name: String,
    pub tags: Tags,
    pub count: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub samples: Vec<f64>,
}

impl MetricSeries {
    pub fn mean(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples.iter().sum::<f64>() / self.samples.len() as f64)
    }

    pub fn max(&self) -> Option<f64> {
        self.samples.iter().copied().reduce(f64::max)
    }
}

/// Point-in-time copy of every series, ordered by name then tags
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsSnapshot {
    pub series: Vec<MetricSeries>,
}

impl MetricsSnapshot {
    /// Counter total for `name` across all tag sets
    pub fn total(&self, name: &str) -> u64 {
        self.series
            .iter()
            .filter(|s| s.name == name)
            .map(|s| s.count)
            .sum()
    }
}

#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    series: Mutex<BTreeMap<(String, Tags), MetricSeries>>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let series = self.series.lock().unwrap_or_else(PoisonError::into_inner);
        MetricsSnapshot {
            series: series.values().cloned().collect(),
        }
    }

    pub fn counter(&self, name: &str) -> u64 {
        self.snapshot().total(name)
    }

    /// All samples recorded under `name`, across tag sets
    pub fn samples(&self, name: &str) -> Vec<f64> {
        self.snapshot()
            .series
            .into_iter()
            .filter(|s| s.name == name)
            .flat_map(|s| s.samples)
            .collect()
    }

    pub fn reset(&self) {
        self.series
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn record(&self, name: &str, tags: &Tags, count: u64, sample: Option<f64>) {
        let mut series = self.series.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = series
            .entry((name.to_string(), tags.clone()))
            .or_insert_with(|| MetricSeries {
                name: name.to_string(),
                tags: tags.clone(),
                ..MetricSeries::default()
            });
        entry.count += count;
        if let Some(sample) = sample {
            entry.samples.push(sample);
        }
    }
}

impl Metrics for InMemoryMetrics {
    fn incr(&self, name: &str, value: u64, tags: &Tags) {
        self.record(name, tags, value, None);
    }

    fn observe(&self, name: &str, value: f64, tags: &Tags) {
        self.record(name, tags, 1, Some(value));
    }

    fn timing_ms(&self, name: &str, ms: u64, tags: &Tags) {
        self.record(name, tags, 1, Some(ms as f64));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_counters_split_by_tags() {
        let metrics = InMemoryMetrics::new();
        metrics.incr("tool.invocations", 1, &tags(&[("status", "success")]));
        metrics.incr("tool.invocations", 1, &tags(&[("status", "success")]));
        metrics.incr("tool.invocations", 1, &tags(&[("status", "backend_error")]));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.series.len(), 2);
        assert_eq!(snapshot.total("tool.invocations"), 3);
        assert_eq!(metrics.counter("tool.cache_hits"), 0);
    }

    #[test]
    fn test_samples_and_stats() {
        let metrics = InMemoryMetrics::new();
        let t = tags(&[("tool", "add")]);
        metrics.timing_ms("tool.latency_ms", 10, &t);
        metrics.timing_ms("tool.latency_ms", 30, &t);
        metrics.observe("tool.attempts", 2.0, &t);

        assert_eq!(metrics.samples("tool.latency_ms"), vec![10.0, 30.0]);
        let series = &metrics.snapshot().series;
        let latency = series.iter().find(|s| s.name == "tool.latency_ms").unwrap();
        assert_eq!(latency.mean(), Some(20.0));
        assert_eq!(latency.max(), Some(30.0));
        assert_eq!(latency.count, 2);
    }

    #[test]
    fn test_reset() {
        let metrics = InMemoryMetrics::new();
        metrics.incr("x", 5, &Tags::new());
        metrics.reset();
        assert!(metrics.snapshot().series.is_empty());
    }
}
