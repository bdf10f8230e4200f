//! Domain layer for toolgate
//!
//! This crate contains the core types and policies of the invocation
//! pipeline. It performs no I/O and has no dependency on an async runtime.
//!
//! # Core Concepts
//!
//! ## Tools
//!
//! - **ToolSpec**: immutable per-tool configuration with its policies attached
//! - **CallContext**: per-call identity, trace ids, deadline and auth data
//! - **InvocationResult**: the single outcome of a call, success or failure
//!
//! ## Policies
//!
//! - **Idempotency**: key strategies deciding which calls are "the same"
//! - **Circuit breaker**: per-tool failure state machines
//! - **Retry**: attempt and delay schedules for transient failures
//!
//! ## Errors
//!
//! Every failure is an [`InvocationError`] carrying one [`ErrorKind`].

pub mod config;
pub mod core;
pub mod policy;
pub mod tool;

// Re-export commonly used types
pub use config::{ConfigIssue, ConfigIssueCode, OutputFormat, Severity};
pub use core::{
    clock::{Clock, ManualClock, SystemClock},
    error::{ErrorKind, InvocationError},
};
pub use policy::{
    AdaptiveCircuitBreaker, AdaptiveSettings, AttemptFn, AttemptFuture, BreakerSettings,
    CircuitBreaker, CircuitPermit, CircuitRejected, CircuitState, CustomRetry,
    CustomRetryStrategy, DisabledCircuitBreaker, ExponentialBackoff, FixedRetry, HashAlgorithm, IdempotencyConfig, IdempotencyKeyStrategy,
    KeyGenerator, RetryPolicy, StandardCircuitBreaker,
};
pub use tool::{
    CallContext, InvocationFailure, InvocationResult, ParameterType, ToolArgs, ToolParameter,
    ToolSpec, Usage,
};
