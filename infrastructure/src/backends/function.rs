//! `function` driver: in-process async functions looked up by tool id.

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use toolgate_application::ports::backend::BackendStrategy;
use toolgate_domain::{InvocationError, ToolArgs, ToolSpec};
use tracing::trace;

pub const FUNCTION_DRIVER: &str = "function";

/// A registered tool function.
///
/// Receives owned arguments; domain failures are returned as
/// `InvocationError` values (usually `BackendError`).
pub type ToolFunction =
    Arc<dyn Fn(ToolArgs) -> BoxFuture<'static, Result<Value, InvocationError>> + Send + Sync>;

#[derive(Default)]
pub struct FunctionBackend {
    functions: RwLock<HashMap<String, ToolFunction>>,
}

impl FunctionBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `function` under `name`, replacing any previous one
    pub fn register<F, Fut>(&self, name: impl Into<String>, function: F)
    where
        F: Fn(ToolArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, InvocationError>> + Send + 'static,
    {
        let function: ToolFunction =
            Arc::new(move |args: ToolArgs| -> BoxFuture<'static, _> { Box::pin(function(args)) });
        self.functions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), function);
    }

    pub fn with_function<F, Fut>(self, name: impl Into<String>, function: F) -> Self
    where
        F: Fn(ToolArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, InvocationError>> + Send + 'static,
    {
        self.register(name, function);
        self
    }

    /// Registered function names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .functions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Function for `spec`: by tool id, then by tool name
    fn lookup(&self, spec: &ToolSpec) -> Option<ToolFunction> {
        let functions = self.functions.read().unwrap_or_else(PoisonError::into_inner);
        functions
            .get(&spec.id)
            .or_else(|| functions.get(&spec.name))
            .cloned()
    }
}

#[async_trait]
impl BackendStrategy for FunctionBackend {
    fn driver(&self) -> &str {
        FUNCTION_DRIVER
    }

    async fn execute(
        &self,
        args: &ToolArgs,
        spec: &ToolSpec,
        _timeout: Duration,
    ) -> Result<Value, InvocationError> {
        let function = self.lookup(spec).ok_or_else(|| {
            InvocationError::backend(format!("No function registered for tool '{}'", spec.id))
        })?;
        trace!(tool = %spec.id, "Calling registered function");
        function(args.clone()).await
    }
}

impl std::fmt::Debug for FunctionBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionBackend")
            .field("functions", &self.names())
            .finish()
    }
}
