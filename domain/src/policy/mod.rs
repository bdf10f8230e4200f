//! Resilience policies attached to a [`ToolSpec`](crate::ToolSpec)
//!
//! - [`idempotency`]: key strategies and cache settings
//! - [`circuit_breaker`]: per-tool failure state machines
//! - [`retry`]: attempt and delay schedules
//!
//! Policies are plain values or shared instances chosen when a spec is
//! built; nothing here performs I/O.

pub mod circuit_breaker;
pub mod idempotency;
pub mod retry;

pub use circuit_breaker::{
    AdaptiveCircuitBreaker, AdaptiveSettings, BreakerSettings, CircuitBreaker, CircuitPermit,
    CircuitRejected, CircuitState, DisabledCircuitBreaker, StandardCircuitBreaker,
};
pub use idempotency::{HashAlgorithm, IdempotencyConfig, IdempotencyKeyStrategy, KeyGenerator};
pub use retry::{
    AttemptFn, AttemptFuture, CustomRetry, CustomRetryStrategy, ExponentialBackoff, FixedRetry,
    RetryPolicy,
};
