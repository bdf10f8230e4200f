//! Token bucket rate limiter
//!
//! One bucket per tool (or per tool and tenant). A bucket holds up to
//! `burst` tokens and refills continuously at `rate_per_second`; each
//! allowed attempt takes one token.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tokio::time::Instant;
use toolgate_application::ports::limiter::Limiter;
use toolgate_domain::CallContext;
use tracing::trace;

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    refilled_at: Instant,
}

#[derive(Debug)]
pub struct TokenBucketLimiter {
    rate_per_second: f64,
    burst: f64,
    per_tenant: bool,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl TokenBucketLimiter {
    /// `burst` is clamped to at least one token
    pub fn new(rate_per_second: f64, burst: u32) -> Self {
        Self {
            rate_per_second: rate_per_second.max(0.0),
            burst: f64::from(burst.max(1)),
            per_tenant: false,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Keep separate buckets per tenant
    pub fn per_tenant(mut self) -> Self {
        self.per_tenant = true;
        self
    }

    fn bucket_key(&self, tool_id: &str, ctx: &CallContext) -> String {
        match (&ctx.tenant_id, self.per_tenant) {
            (Some(tenant), true) => format!("{}:{}", tool_id, tenant),
            _ => tool_id.to_string(),
        }
    }

    fn take(&self, key: String) -> bool {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);
        let bucket = buckets.entry(key).or_insert(Bucket {
            tokens: self.burst,
            refilled_at: now,
        });

        let elapsed = now.duration_since(bucket.refilled_at).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rate_per_second).min(self.burst);
        bucket.refilled_at = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[async_trait]
impl Limiter for TokenBucketLimiter {
    async fn allow(&self, tool_id: &str, ctx: &CallContext) -> bool {
        let key = self.bucket_key(tool_id, ctx);
        let allowed = self.take(key);
        trace!(tool = tool_id, allowed, "Token bucket check");
        allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_burst_then_refill() {
        let limiter = TokenBucketLimiter::new(2.0, 3);
        let ctx = CallContext::new();

        for _ in 0..3 {
            assert!(limiter.allow("search", &ctx).await);
        }
        assert!(!limiter.allow("search", &ctx).await);

        // 2 tokens per second: one token after 500ms
        tokio::time::advance(Duration::from_millis(500)).await;
        assert!(limiter.allow("search", &ctx).await);
        assert!(!limiter.allow("search", &ctx).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refill_capped_at_burst() {
        let limiter = TokenBucketLimiter::new(10.0, 2);
        let ctx = CallContext::new();
        assert!(limiter.allow("t", &ctx).await);

        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(limiter.allow("t", &ctx).await);
        assert!(limiter.allow("t", &ctx).await);
        assert!(!limiter.allow("t", &ctx).await);
    }

    #[tokio::test]
    async fn test_buckets_are_per_tool() {
        let limiter = TokenBucketLimiter::new(0.0, 1);
        let ctx = CallContext::new();

        assert!(limiter.allow("a", &ctx).await);
        assert!(!limiter.allow("a", &ctx).await);
        assert!(limiter.allow("b", &ctx).await);
    }

    #[tokio::test]
    async fn test_per_tenant_buckets() {
        let limiter = TokenBucketLimiter::new(0.0, 1).per_tenant();
        let acme = CallContext::new().with_tenant("acme");
        let globex = CallContext::new().with_tenant("globex");

        assert!(limiter.allow("t", &acme).await);
        assert!(!limiter.allow("t", &acme).await);
        assert!(limiter.allow("t", &globex).await);
    }
}
