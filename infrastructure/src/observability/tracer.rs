//! Tracer port on top of `tracing` spans.
//!
//! `tracing` fields are fixed at span creation, so attributes set later are
//! collected and emitted with the closing event.

use std::collections::BTreeMap;
use std::time::Instant;
use toolgate_application::ports::metrics::Tags;
use toolgate_application::ports::tracer::{Span, Tracer};
use tracing::{debug, info_span, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingTracer;

impl TracingTracer {
    pub fn new() -> Self {
        Self
    }
}

impl Tracer for TracingTracer {
    fn start_span(&self, name: &str, tags: &Tags) -> Box<dyn Span> {
        let span = info_span!("span", name = %name, tags = ?tags);
        Box::new(TracingSpan {
            name: name.to_string(),
            span,
            started: Instant::now(),
            attributes: BTreeMap::new(),
        })
    }
}

struct TracingSpan {
    name: String,
    span: tracing::Span,
    started: Instant,
    attributes: BTreeMap<String, String>,
}

impl Span for TracingSpan {
    fn set_attribute(&mut self, key: &str, value: String) {
        self.attributes.insert(key.to_string(), value);
    }

    fn finish(self: Box<Self>, success: bool) {
        let elapsed_ms = self.started.elapsed().as_millis() as u64;
        let _entered = self.span.enter();
        if success {
            debug!(span = %self.name, elapsed_ms, attributes = ?self.attributes, "Span finished");
        } else {
            warn!(span = %self.name, elapsed_ms, attributes = ?self.attributes, "Span finished with error");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_lifecycle_without_subscriber() {
        let tracer = TracingTracer::new();
        let mut tags = Tags::new();
        tags.insert("tool".into(), "add".into());

        let mut span = tracer.start_span("tool.invoke", &tags);
        span.set_attribute("tool.status", "success".into());
        span.finish(true);
    }
}
