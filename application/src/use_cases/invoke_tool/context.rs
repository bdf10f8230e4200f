//! Invocation context: the per-call context plus the collaborators a call
//! runs against.

use crate::ports::limiter::{Limiter, NoLimiter};
use crate::ports::memory::{Memory, NoMemory};
use crate::ports::metrics::{Metrics, NoMetrics};
use crate::ports::security::{AllowAll, Security};
use crate::ports::tracer::{NoTracer, Tracer};
use crate::ports::validator::{NoValidation, Validator};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use toolgate_domain::CallContext;

/// Everything one call needs besides its arguments.
///
/// Created by the caller and only read by the pipeline. Collaborators that
/// are not supplied default to their no-op adapters. Cloning is cheap; the
/// collaborators are shared.
#[derive(Clone)]
pub struct InvocationContext {
    pub call: CallContext,
    pub validator: Arc<dyn Validator>,
    pub security: Arc<dyn Security>,
    pub memory: Arc<dyn Memory>,
    pub metrics: Arc<dyn Metrics>,
    pub tracer: Arc<dyn Tracer>,
    pub limiter: Arc<dyn Limiter>,
    /// Cancelling aborts the in-flight backend call and any retry wait
    pub cancellation: Option<CancellationToken>,
}

impl InvocationContext {
    pub fn new(call: CallContext) -> Self {
        Self {
            call,
            validator: Arc::new(NoValidation),
            security: Arc::new(AllowAll),
            memory: Arc::new(NoMemory),
            metrics: Arc::new(NoMetrics),
            tracer: Arc::new(NoTracer),
            limiter: Arc::new(NoLimiter),
            cancellation: None,
        }
    }

    pub fn with_call(mut self, call: CallContext) -> Self {
        self.call = call;
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_security(mut self, security: Arc<dyn Security>) -> Self {
        self.security = security;
        self
    }

    pub fn with_memory(mut self, memory: Arc<dyn Memory>) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_tracer(mut self, tracer: Arc<dyn Tracer>) -> Self {
        self.tracer = tracer;
        self
    }

    pub fn with_limiter(mut self, limiter: Arc<dyn Limiter>) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}

impl Default for InvocationContext {
    fn default() -> Self {
        Self::new(CallContext::default())
    }
}

impl std::fmt::Debug for InvocationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvocationContext")
            .field("call", &self.call)
            .field("cancellable", &self.cancellation.is_some())
            .finish_non_exhaustive()
    }
}
