//! Tool domain module
//!
//! A tool is described once by a [`ToolSpec`] and invoked many times, each
//! call carrying its own [`CallContext`] and producing one
//! [`InvocationResult`].
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────────┐
//! │ ToolSpec     │───▶│ CallContext  │───▶│ InvocationResult │
//! │ (per tool)   │    │ (per call)   │    │ (per call)       │
//! └──────┬───────┘    └──────────────┘    └──────────────────┘
//!        │
//!        ├─ parameters, timeout, permissions, options
//!        └─ idempotency, key strategy, circuit breaker, retry policy
//! ```

pub mod context;
pub mod entities;
pub mod value_objects;

pub use context::CallContext;
pub use entities::{ParameterType, ToolArgs, ToolParameter, ToolSpec};
pub use value_objects::{InvocationFailure, InvocationResult, Usage};
