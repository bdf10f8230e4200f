//! Observability adapters: tracing-backed spans and in-process metrics

mod metrics;
mod tracer;

pub use metrics::{InMemoryMetrics, MetricSeries, MetricsSnapshot};
pub use tracer::TracingTracer;
