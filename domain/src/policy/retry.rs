//! Retry policies
//!
//! A policy decides how many times a failed backend call is attempted and
//! how long to wait in between. Only retryable errors (see
//! [`InvocationError::is_retryable`]) are ever retried; the async loop that
//! applies a policy lives in the application layer.
//!
//! | Policy | Attempts | Delay after attempt `n` |
//! |--------|----------|--------------------------|
//! | `None` | 1 | - |
//! | `Fixed` | `max_attempts` | `delay ± jitter` |
//! | `ExponentialBackoff` | `max_attempts` | `min(base * multiplier^(n-1), max) ± jitter * delay` |
//! | `Custom` | up to `max_attempts` | decided by the strategy |

use crate::core::error::InvocationError;
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_MULTIPLIER: f64 = 2.0;
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(60);
pub const DEFAULT_EXPONENTIAL_JITTER: f64 = 0.1;
/// Safety limit for custom strategies
pub const DEFAULT_CUSTOM_MAX_ATTEMPTS: u32 = 10;

/// Constant delay between attempts
#[derive(Debug, Clone, PartialEq)]
pub struct FixedRetry {
    pub max_attempts: u32,
    pub delay: Duration,
    /// Uniform jitter added to or subtracted from `delay`
    pub jitter: Duration,
}

impl FixedRetry {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            jitter: Duration::ZERO,
        }
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn next_delay(&self) -> Duration {
        let base = self.delay.as_secs_f64();
        let offset = (rand::random::<f64>() * 2.0 - 1.0) * self.jitter.as_secs_f64();
        Duration::from_secs_f64((base + offset).max(0.0))
    }
}

/// Exponentially growing delay between attempts
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialBackoff {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub multiplier: f64,
    pub max_delay: Duration,
    /// Jitter as a fraction of the computed delay
    pub jitter: f64,
}

impl ExponentialBackoff {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            multiplier: DEFAULT_MULTIPLIER,
            max_delay: DEFAULT_MAX_DELAY,
            jitter: DEFAULT_EXPONENTIAL_JITTER,
        }
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier.max(1.0);
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    /// Delay after attempt `attempt` (1-based) before jitter
    pub fn nominal_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = secs.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped.max(0.0))
    }

    pub fn next_delay(&self, attempt: u32) -> Duration {
        let nominal = self.nominal_delay(attempt).as_secs_f64();
        let offset = (rand::random::<f64>() * 2.0 - 1.0) * self.jitter * nominal;
        Duration::from_secs_f64((nominal + offset).max(0.0))
    }
}

/// Future produced by one backend attempt
pub type AttemptFuture<'a> = Pin<Box<dyn Future<Output = Result<Value, InvocationError>> + Send + 'a>>;

/// Callable that performs one more backend attempt
pub type AttemptFn<'a> = dyn Fn() -> AttemptFuture<'a> + Send + Sync + 'a;

/// Caller-defined retry logic.
///
/// The first attempt is always made by the pipeline. After each retryable
/// failure the strategy is called with the attempt function, the number of
/// the attempt about to be made (2, 3, ...) and the last error. It may
/// wait, call `attempt` (usually once) and return its outcome, or give up
/// by returning an error without calling it.
#[async_trait]
pub trait CustomRetryStrategy: Send + Sync + std::fmt::Debug {
    async fn retry(
        &self,
        attempt: &AttemptFn<'_>,
        attempt_number: u32,
        last_error: &InvocationError,
    ) -> Result<Value, InvocationError>;
}

/// Custom strategy plus its safety limit
#[derive(Debug, Clone)]
pub struct CustomRetry {
    pub strategy: Arc<dyn CustomRetryStrategy>,
    pub max_attempts: u32,
}

/// Retry schedule attached to a tool spec
#[derive(Debug, Clone, Default)]
pub enum RetryPolicy {
    /// Single attempt
    #[default]
    None,
    Fixed(FixedRetry),
    ExponentialBackoff(ExponentialBackoff),
    Custom(CustomRetry),
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        RetryPolicy::Fixed(FixedRetry::new(max_attempts, delay))
    }

    pub fn exponential(max_attempts: u32, base_delay: Duration) -> Self {
        RetryPolicy::ExponentialBackoff(ExponentialBackoff::new(max_attempts, base_delay))
    }

    pub fn custom(strategy: impl CustomRetryStrategy + 'static) -> Self {
        RetryPolicy::Custom(CustomRetry {
            strategy: Arc::new(strategy),
            max_attempts: DEFAULT_CUSTOM_MAX_ATTEMPTS,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            RetryPolicy::None => "none",
            RetryPolicy::Fixed(_) => "fixed",
            RetryPolicy::ExponentialBackoff(_) => "exponential",
            RetryPolicy::Custom(_) => "custom",
        }
    }

    /// Upper bound on backend attempts for one call
    pub fn max_attempts(&self) -> u32 {
        match self {
            RetryPolicy::None => 1,
            RetryPolicy::Fixed(fixed) => fixed.max_attempts,
            RetryPolicy::ExponentialBackoff(backoff) => backoff.max_attempts,
            RetryPolicy::Custom(custom) => custom.max_attempts.max(1),
        }
    }

    /// Delay to wait after failed attempt `attempt` (1-based).
    ///
    /// `None` when the policy would not make another attempt, or when the
    /// next attempt is scheduled by a custom strategy.
    pub fn delay_after(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_attempts() {
            return None;
        }
        match self {
            RetryPolicy::None | RetryPolicy::Custom(_) => None,
            RetryPolicy::Fixed(fixed) => Some(fixed.next_delay()),
            RetryPolicy::ExponentialBackoff(backoff) => Some(backoff.next_delay(attempt)),
        }
    }
}
