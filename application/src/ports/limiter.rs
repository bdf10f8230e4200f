//! Rate limiter port

use async_trait::async_trait;
use toolgate_domain::CallContext;

/// Consulted before every backend attempt, retries included
#[async_trait]
pub trait Limiter: Send + Sync {
    /// `false` rejects the attempt with `RateLimited`
    async fn allow(&self, tool_id: &str, ctx: &CallContext) -> bool;
}

/// Never limits
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLimiter;

#[async_trait]
impl Limiter for NoLimiter {
    async fn allow(&self, _tool_id: &str, _ctx: &CallContext) -> bool {
        true
    }
}
