//! Application layer for toolgate
//!
//! This crate contains the invocation pipeline, the ports it runs against
//! and the backend registry. It depends only on the domain layer.

pub mod ports;
pub mod registry;
pub mod use_cases;

// Re-export commonly used types
pub use ports::{
    backend::BackendStrategy,
    limiter::{Limiter, NoLimiter},
    memory::{LockGuard, Memory, MemoryError, NoMemory},
    metrics::{Metrics, NoMetrics, Tags},
    security::{AllowAll, Security},
    tracer::{NoTracer, Span, Tracer},
    validator::{NoValidation, Validator},
};
pub use registry::{BackendRegistry, RegistryError};
pub use use_cases::invoke_tool::{InvocationContext, InvokeToolUseCase};
