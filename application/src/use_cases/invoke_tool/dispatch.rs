//! Backend dispatch under a retry policy
//!
//! One [`Dispatch`] drives all backend attempts of a single call:
//!
//! ```text
//! ┌──────────┐   allow?   ┌─────────┐  min(spec.timeout, deadline)  ┌─────────┐
//! │ attempt  │──────────▶ │ limiter │─────────────────────────────▶ │ backend │
//! └────▲─────┘            └─────────┘                               └────┬────┘
//!      │  retryable error, delay fits before deadline                    │
//!      └─────────────────────────── sleep(delay) ◀──────────────────────┘
//! ```
//!
//! Non-retryable errors end the call immediately. Running out of attempts
//! yields `RetryExhausted`; running out of time yields `DeadlineExceeded`.
//! Both wrap the last underlying error.

use super::context::InvocationContext;
use crate::ports::backend::BackendStrategy;
use serde_json::Value;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use toolgate_domain::{
    AttemptFuture, CustomRetry, InvocationError, RetryPolicy, ToolArgs, ToolSpec,
};
use tracing::debug;

pub(crate) struct Dispatch<'a> {
    backend: &'a dyn BackendStrategy,
    spec: &'a ToolSpec,
    args: &'a ToolArgs,
    ctx: &'a InvocationContext,
    attempts: AtomicU32,
}

impl<'a> Dispatch<'a> {
    pub(crate) fn new(
        backend: &'a dyn BackendStrategy,
        spec: &'a ToolSpec,
        args: &'a ToolArgs,
        ctx: &'a InvocationContext,
    ) -> Self {
        Self {
            backend,
            spec,
            args,
            ctx,
            attempts: AtomicU32::new(0),
        }
    }

    /// Attempts made so far (limiter rejections included)
    pub(crate) fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Run the retry policy until success, a terminal error, exhaustion,
    /// the deadline or cancellation.
    pub(crate) async fn run(&self) -> Result<Value, InvocationError> {
        let cancelled = async {
            match &self.ctx.cancellation {
                Some(token) => token.cancelled().await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancelled => Err(InvocationError::cancelled(self.attempts())),
            outcome = self.run_policy() => outcome,
        }
    }

    async fn run_policy(&self) -> Result<Value, InvocationError> {
        if self.ctx.call.is_expired() {
            return Err(InvocationError::deadline_exceeded(None, 0));
        }
        match &self.spec.retry_policy {
            RetryPolicy::Custom(custom) => self.run_custom(custom).await,
            policy => self.run_scheduled(policy).await,
        }
    }

    async fn run_scheduled(&self, policy: &RetryPolicy) -> Result<Value, InvocationError> {
        let max_attempts = policy.max_attempts();
        let mut attempt = 1;

        loop {
            let err = match self.attempt().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if !err.is_retryable() {
                return Err(err);
            }
            if self.ctx.call.is_expired() {
                return Err(InvocationError::deadline_exceeded(Some(err), self.attempts()));
            }

            let Some(delay) = policy.delay_after(attempt) else {
                return Err(if max_attempts > 1 {
                    InvocationError::retry_exhausted(err, self.attempts())
                } else {
                    err
                });
            };
            if self.ctx.call.remaining().is_some_and(|left| delay >= left) {
                debug!(
                    tool = %self.spec.id,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Next retry would cross the deadline"
                );
                return Err(InvocationError::deadline_exceeded(Some(err), self.attempts()));
            }

            debug!(
                tool = %self.spec.id,
                attempt,
                kind = %err.kind,
                delay_ms = delay.as_millis() as u64,
                "Retrying after retryable error"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn run_custom(&self, custom: &CustomRetry) -> Result<Value, InvocationError> {
        let mut last = match self.attempt().await {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_retryable() => return Err(err),
            Err(err) => err,
        };

        let attempt_fn = || self.boxed_attempt();
        for attempt_number in 2..=custom.max_attempts.max(1) {
            if self.ctx.call.is_expired() {
                return Err(InvocationError::deadline_exceeded(Some(last), self.attempts()));
            }

            debug!(
                tool = %self.spec.id,
                attempt = attempt_number,
                kind = %last.kind,
                "Consulting custom retry strategy"
            );
            let attempts_before = self.attempts();
            let retry = custom.strategy.retry(&attempt_fn, attempt_number, &last);
            let outcome = match self.ctx.call.remaining() {
                Some(left) => tokio::time::timeout(left, retry).await.unwrap_or_else(|_| {
                    Err(InvocationError::deadline_exceeded(
                        Some(last.clone()),
                        self.attempts(),
                    ))
                }),
                None => retry.await,
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_retryable() => return Err(err),
                // No new attempt: the strategy gave up
                Err(err) if self.attempts() == attempts_before => {
                    debug!(tool = %self.spec.id, attempt = attempt_number, "Custom retry strategy gave up");
                    return Err(InvocationError::retry_exhausted(err, self.attempts()));
                }
                Err(err) => last = err,
            }
        }

        Err(InvocationError::retry_exhausted(last, self.attempts()))
    }

    fn boxed_attempt(&self) -> AttemptFuture<'_> {
        Box::pin(self.attempt())
    }

    /// One limiter check plus at most one backend call
    async fn attempt(&self) -> Result<Value, InvocationError> {
        let number = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;

        if !self.ctx.limiter.allow(&self.spec.id, &self.ctx.call).await {
            debug!(tool = %self.spec.id, attempt = number, "Attempt rejected by rate limiter");
            return Err(InvocationError::rate_limited(&self.spec.id));
        }

        let timeout = attempt_timeout(self.spec.timeout, self.ctx.call.remaining());
        debug!(
            tool = %self.spec.id,
            attempt = number,
            timeout_ms = timeout.as_millis() as u64,
            "Dispatching to backend"
        );
        match tokio::time::timeout(timeout, self.backend.execute(self.args, self.spec, timeout)).await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(InvocationError::backend_timeout(&self.spec.id, timeout)),
        }
    }
}

/// Per-attempt budget: the tool timeout, clipped to what is left before
/// the deadline
fn attempt_timeout(spec_timeout: Duration, remaining: Option<Duration>) -> Duration {
    match remaining {
        Some(left) => spec_timeout.min(left),
        None => spec_timeout,
    }
}
