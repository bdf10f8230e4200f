//! Security port
//!
//! Decides whether a caller may invoke a tool and whether the tool may
//! reach its target.

use async_trait::async_trait;
use toolgate_domain::{CallContext, InvocationError, ToolSpec};

#[async_trait]
pub trait Security: Send + Sync {
    /// Fails with `AuthorizationDenied` when the caller may not use the tool
    async fn authorize(&self, ctx: &CallContext, spec: &ToolSpec) -> Result<(), InvocationError>;

    /// Fails with `EgressDenied` when `target` (a URL or driver name) is
    /// not reachable for this caller
    async fn check_egress(&self, target: &str, ctx: &CallContext) -> Result<(), InvocationError>;
}

/// Allows every caller and every target
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl Security for AllowAll {
    async fn authorize(&self, _ctx: &CallContext, _spec: &ToolSpec) -> Result<(), InvocationError> {
        Ok(())
    }

    async fn check_egress(&self, _target: &str, _ctx: &CallContext) -> Result<(), InvocationError> {
        Ok(())
    }
}
