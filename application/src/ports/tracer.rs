//! Tracer port
//!
//! One span covers one invocation, from validation to result.

use super::metrics::Tags;

/// An open span, consumed by [`finish`](Span::finish)
pub trait Span: Send {
    fn set_attribute(&mut self, key: &str, value: String);

    fn finish(self: Box<Self>, success: bool);
}

pub trait Tracer: Send + Sync {
    fn start_span(&self, name: &str, tags: &Tags) -> Box<dyn Span>;
}

/// Produces spans that record nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTracer;

struct NoSpan;

impl Span for NoSpan {
    fn set_attribute(&mut self, _key: &str, _value: String) {}
    fn finish(self: Box<Self>, _success: bool) {}
}

impl Tracer for NoTracer {
    fn start_span(&self, _name: &str, _tags: &Tags) -> Box<dyn Span> {
        Box::new(NoSpan)
    }
}
