//! Metrics port

use std::collections::BTreeMap;

/// Metric tags (sorted for stable series identity)
pub type Tags = BTreeMap<String, String>;

pub trait Metrics: Send + Sync {
    fn incr(&self, name: &str, value: u64, tags: &Tags);

    fn observe(&self, name: &str, value: f64, tags: &Tags);

    fn timing_ms(&self, name: &str, ms: u64, tags: &Tags);
}

/// Discards every metric
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMetrics;

impl Metrics for NoMetrics {
    fn incr(&self, _name: &str, _value: u64, _tags: &Tags) {}
    fn observe(&self, _name: &str, _value: f64, _tags: &Tags) {}
    fn timing_ms(&self, _name: &str, _ms: u64, _tags: &Tags) {}
}
