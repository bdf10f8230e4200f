//! Backend strategy port
//!
//! A backend performs the actual work of a tool. Backends hold no per-call
//! state: everything they need arrives in `args` and `spec`, and one
//! instance serves every tool that uses its driver.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use toolgate_domain::{InvocationError, ToolArgs, ToolSpec};

#[async_trait]
pub trait BackendStrategy: Send + Sync {
    /// Driver name this backend is registered under
    fn driver(&self) -> &str;

    /// Execute one attempt.
    ///
    /// `timeout` is the budget for this attempt (never longer than
    /// `spec.timeout`). The pipeline enforces it as well, so a backend may
    /// use it only to configure its own client.
    async fn execute(
        &self,
        args: &ToolArgs,
        spec: &ToolSpec,
        timeout: Duration,
    ) -> Result<Value, InvocationError>;
}
