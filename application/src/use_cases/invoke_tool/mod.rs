//! Invoke Tool use case
//!
//! Runs one tool call through the full pipeline:
//!
//! ```text
//! validate ─▶ authorize ─▶ egress ─▶ idempotency lookup ──hit──▶ cached result
//!                                          │ miss
//!                                          ▼
//!                                lock key, look up again ──hit──▶ cached result
//!                                          │ miss
//!                                          ▼
//!                                 circuit breaker gate ──open──▶ CircuitOpen
//!                                          │
//!                                          ▼
//!                           dispatch (retry + limiter + timeout)
//!                                          │
//!                                          ▼
//!                   record breaker, metrics, span ─▶ store result ─▶ unlock
//! ```
//!
//! Every stage before dispatch fails fast without touching the backend.
//! The key lock is held by an RAII guard, so it is released on every exit
//! path, early returns and cancellation included.

mod context;
mod dispatch;

pub use context::InvocationContext;

use crate::ports::backend::BackendStrategy;
use crate::ports::memory::LockGuard;
use crate::ports::metrics::Tags;
use crate::registry::{BackendRegistry, RegistryError};
use dispatch::Dispatch;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use toolgate_domain::policy::idempotency::cache_key;
use toolgate_domain::{CircuitPermit, InvocationError, InvocationResult, ToolArgs, ToolSpec, Usage};
use tracing::{debug, info, trace, warn};

/// Default bound on how long a call waits for another call holding the
/// same idempotency key
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(60);

pub const METRIC_INVOCATIONS: &str = "tool.invocations";
pub const METRIC_LATENCY_MS: &str = "tool.latency_ms";
pub const METRIC_ATTEMPTS: &str = "tool.attempts";
pub const METRIC_CACHE_HITS: &str = "tool.cache_hits";

/// What happened during a call, kept for shaping failure results and
/// reporting
#[derive(Debug, Default)]
struct CallSummary {
    key: Option<String>,
    input_bytes: usize,
    attempts: u32,
    cache_hit: bool,
    latency_ms: u64,
}

/// Use case for invoking one tool
///
/// Built once per tool; the backend is resolved from the registry at
/// build time. Calls may run concurrently on the same instance.
pub struct InvokeToolUseCase {
    spec: Arc<ToolSpec>,
    backend: Arc<dyn BackendStrategy>,
    lock_ttl: Duration,
}

impl InvokeToolUseCase {
    /// Resolve the tool's driver and build the pipeline
    pub fn new(spec: impl Into<Arc<ToolSpec>>, registry: &BackendRegistry) -> Result<Self, RegistryError> {
        let spec = spec.into();
        let backend = registry.resolve(&spec.driver)?;
        Ok(Self::with_backend(spec, backend))
    }

    pub fn with_backend(spec: impl Into<Arc<ToolSpec>>, backend: Arc<dyn BackendStrategy>) -> Self {
        Self {
            spec: spec.into(),
            backend,
            lock_ttl: DEFAULT_LOCK_TTL,
        }
    }

    pub fn with_lock_ttl(mut self, lock_ttl: Duration) -> Self {
        self.lock_ttl = lock_ttl;
        self
    }

    pub fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    /// Run the call; failures come back as a result carrying the error
    pub async fn execute(&self, args: &ToolArgs, ctx: &InvocationContext) -> InvocationResult {
        let (outcome, summary) = self.invoke(args, ctx).await;
        match outcome {
            Ok(result) => result,
            Err(err) => self.failure_result(&err, &summary),
        }
    }

    /// Run the call; failures come back as `Err`
    pub async fn try_execute(
        &self,
        args: &ToolArgs,
        ctx: &InvocationContext,
    ) -> Result<InvocationResult, InvocationError> {
        self.invoke(args, ctx).await.0
    }

    async fn invoke(
        &self,
        args: &ToolArgs,
        ctx: &InvocationContext,
    ) -> (Result<InvocationResult, InvocationError>, CallSummary) {
        let started = Instant::now();
        let tags = self.base_tags();
        let mut span = ctx.tracer.start_span("tool.invoke", &tags);
        span.set_attribute("tool.driver", self.spec.driver.clone());

        let mut summary = CallSummary {
            input_bytes: serde_json::to_vec(args).map_or(0, |bytes| bytes.len()),
            ..CallSummary::default()
        };
        let outcome = self.run(args, ctx, started, &mut summary).await;
        summary.latency_ms = elapsed_ms(started);

        let status = match &outcome {
            Ok(_) => "success".to_string(),
            Err(err) => err.kind.to_string(),
        };
        let mut status_tags = tags.clone();
        status_tags.insert("status".to_string(), status.clone());
        ctx.metrics.incr(METRIC_INVOCATIONS, 1, &status_tags);
        ctx.metrics.timing_ms(METRIC_LATENCY_MS, summary.latency_ms, &tags);
        if summary.attempts > 0 {
            ctx.metrics.observe(METRIC_ATTEMPTS, f64::from(summary.attempts), &tags);
        }
        if summary.cache_hit {
            ctx.metrics.incr(METRIC_CACHE_HITS, 1, &tags);
        }

        match &outcome {
            Ok(_) => info!(
                tool = %self.spec.id,
                attempts = summary.attempts,
                cached = summary.cache_hit,
                latency_ms = summary.latency_ms,
                "Tool invocation succeeded"
            ),
            Err(err) => warn!(
                tool = %self.spec.id,
                kind = %err.kind,
                attempts = summary.attempts,
                latency_ms = summary.latency_ms,
                "Tool invocation failed: {}",
                err.message
            ),
        }

        span.set_attribute("tool.status", status);
        if let Some(key) = &summary.key {
            span.set_attribute("tool.idempotency_key", key.clone());
        }
        span.finish(outcome.is_ok());

        (outcome, summary)
    }

    async fn run(
        &self,
        args: &ToolArgs,
        ctx: &InvocationContext,
        started: Instant,
        summary: &mut CallSummary,
    ) -> Result<InvocationResult, InvocationError> {
        let spec = self.spec.as_ref();

        // 1. Validation
        debug!(tool = %spec.id, "Validating arguments");
        ctx.validator.validate(args, spec)?;

        // 2. Authorization and egress
        ctx.security.authorize(&ctx.call, spec).await?;
        ctx.security.check_egress(spec.egress_target(), &ctx.call).await?;

        // 3-4. Idempotency lookup, then lock and look again
        let key = if spec.idempotency.enabled {
            Some(spec.idempotency_key_strategy.generate_key(args, &ctx.call, spec)?)
        } else {
            None
        };
        summary.key = key.clone();

        let _lock = match &key {
            Some(key) => {
                if let Some(hit) = self.cached(ctx, key).await {
                    summary.cache_hit = true;
                    return Ok(hit);
                }
                let lock = self.lock(ctx, key).await?;
                if let Some(hit) = self.cached(ctx, key).await {
                    summary.cache_hit = true;
                    return Ok(hit);
                }
                lock
            }
            None => None,
        };

        // 5. Circuit breaker gate
        let permit = CircuitPermit::acquire(&spec.circuit_breaker, &spec.id)?;

        // 6. Dispatch
        let dispatch = Dispatch::new(self.backend.as_ref(), spec, args, ctx);
        let outcome = dispatch.run().await;
        summary.attempts = dispatch.attempts();

        // 7. Breaker outcome
        match &outcome {
            Ok(_) => permit.succeed(),
            Err(err) if err.counts_as_breaker_failure() => permit.fail(),
            Err(_) => drop(permit),
        }

        let attempts = summary.attempts;
        let content = outcome.map_err(|err| match err.attempts {
            Some(_) => err,
            None => err.with_attempts(attempts),
        })?;

        let mut result = InvocationResult::success(&spec.id, content);
        result.usage = Usage {
            input_bytes: summary.input_bytes,
            output_bytes: result.content_bytes(),
            attempts,
            retries: attempts.saturating_sub(1),
            circuit_opened: false,
        };
        result.latency_ms = elapsed_ms(started);
        if let Some(key) = &key {
            result.idempotency_key = Some(key.clone());
        }

        // 8. Persist
        if let Some(key) = &key
            && spec.idempotency.persist_result
        {
            self.store(ctx, key, &result).await;
        }

        Ok(result)
    }

    async fn cached(&self, ctx: &InvocationContext, key: &str) -> Option<InvocationResult> {
        let record = match ctx.memory.get(&cache_key(key)).await {
            Ok(record) => record?,
            Err(e) => {
                warn!(tool = %self.spec.id, "Idempotency lookup failed, continuing uncached: {}", e);
                return None;
            }
        };
        match serde_json::from_value::<InvocationResult>(record) {
            Ok(result) => {
                debug!(tool = %self.spec.id, key, "Idempotency cache hit");
                Some(result)
            }
            Err(e) => {
                warn!(tool = %self.spec.id, key, "Ignoring unreadable idempotency record: {}", e);
                None
            }
        }
    }

    /// Wait for the key lock, at most `lock_ttl` and never past the call's
    /// deadline or cancellation. A lock the memory cannot grant is skipped.
    async fn lock(
        &self,
        ctx: &InvocationContext,
        key: &str,
    ) -> Result<Option<Box<dyn LockGuard>>, InvocationError> {
        let lock_key = format!("lock:{}", cache_key(key));
        trace!(tool = %self.spec.id, key, "Acquiring idempotency lock");

        let cancelled = async {
            match &ctx.cancellation {
                Some(token) => token.cancelled().await,
                None => std::future::pending::<()>().await,
            }
        };
        let deadline = async {
            match ctx.call.remaining() {
                Some(left) if left < self.lock_ttl => tokio::time::sleep(left).await,
                _ => std::future::pending::<()>().await,
            }
        };

        let acquired = tokio::select! {
            biased;
            _ = cancelled => return Err(InvocationError::cancelled(0)),
            _ = deadline => {
                debug!(tool = %self.spec.id, key, "Deadline passed waiting for idempotency lock");
                return Err(InvocationError::deadline_exceeded(None, 0));
            }
            acquired = ctx.memory.lock(&lock_key, self.lock_ttl) => acquired,
        };
        match acquired {
            Ok(guard) => Ok(Some(guard)),
            Err(e) => {
                warn!(tool = %self.spec.id, key, "Proceeding without idempotency lock: {}", e);
                Ok(None)
            }
        }
    }

    async fn store(&self, ctx: &InvocationContext, key: &str, result: &InvocationResult) {
        let record = match serde_json::to_value(result) {
            Ok(record) => record,
            Err(e) => {
                warn!(tool = %self.spec.id, "Cannot serialize result for caching: {}", e);
                return;
            }
        };
        if let Err(e) = ctx
            .memory
            .set(&cache_key(key), record, Some(self.spec.idempotency.ttl))
            .await
        {
            warn!(tool = %self.spec.id, key, "Failed to store idempotency record: {}", e);
        }
    }

    fn failure_result(&self, err: &InvocationError, summary: &CallSummary) -> InvocationResult {
        let mut result = InvocationResult::failure(&self.spec.id, err).with_latency_ms(summary.latency_ms);
        result.usage.input_bytes = summary.input_bytes;
        result.usage.output_bytes = result.content_bytes();
        result.usage.attempts = summary.attempts;
        result.usage.retries = summary.attempts.saturating_sub(1);
        result.idempotency_key = summary.key.clone();
        result
    }

    fn base_tags(&self) -> Tags {
        let mut tags = self.spec.metrics_tags.clone();
        tags.insert("tool".to_string(), self.spec.id.clone());
        tags.insert("driver".to_string(), self.spec.driver.clone());
        tags
    }
}

impl std::fmt::Debug for InvokeToolUseCase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvokeToolUseCase")
            .field("tool", &self.spec.id)
            .field("driver", &self.spec.driver)
            .field("lock_ttl", &self.lock_ttl)
            .finish()
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
