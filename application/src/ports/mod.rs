//! Port definitions (interfaces for external adapters)
//!
//! Ports define the boundaries between the invocation pipeline and its
//! collaborators. Every port except [`BackendStrategy`](backend::BackendStrategy)
//! ships a no-op implementation, so a pipeline can run with only a backend.
//!
//! | Port | No-op |
//! |------|-------|
//! | [`Validator`](validator::Validator) | [`NoValidation`](validator::NoValidation) |
//! | [`Security`](security::Security) | [`AllowAll`](security::AllowAll) |
//! | [`Memory`](memory::Memory) | [`NoMemory`](memory::NoMemory) |
//! | [`Metrics`](metrics::Metrics) | [`NoMetrics`](metrics::NoMetrics) |
//! | [`Tracer`](tracer::Tracer) | [`NoTracer`](tracer::NoTracer) |
//! | [`Limiter`](limiter::Limiter) | [`NoLimiter`](limiter::NoLimiter) |

pub mod backend;
pub mod limiter;
pub mod memory;
pub mod metrics;
pub mod security;
pub mod tracer;
pub mod validator;
