//! Backend registry
//!
//! Maps driver names to backend strategies. Tools name a driver in their
//! spec; the registry is consulted once, when an invocation pipeline is
//! built for the tool, so an unknown driver surfaces as a build error rather
//! than a failed call.
//!
//! Registration is open at runtime: backends can be added, replaced or
//! removed while pipelines built earlier keep the instance they resolved.

use crate::ports::backend::BackendStrategy;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Unknown driver '{driver}' (registered: {})", .registered.join(", "))]
    UnknownDriver {
        driver: String,
        registered: Vec<String>,
    },
}

#[derive(Default)]
pub struct BackendRegistry {
    backends: RwLock<HashMap<String, Arc<dyn BackendStrategy>>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend under its own driver name
    pub fn register(&self, backend: Arc<dyn BackendStrategy>) {
        let driver = backend.driver().to_string();
        self.register_as(driver, backend);
    }

    /// Register a backend under `driver`, replacing any previous entry
    pub fn register_as(&self, driver: impl Into<String>, backend: Arc<dyn BackendStrategy>) {
        let driver = driver.into();
        debug!("Registering backend for driver '{}'", driver);
        self.backends
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(driver, backend);
    }

    /// Builder-style registration
    pub fn with_backend(self, backend: Arc<dyn BackendStrategy>) -> Self {
        self.register(backend);
        self
    }

    pub fn unregister(&self, driver: &str) -> Option<Arc<dyn BackendStrategy>> {
        self.backends
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(driver)
    }

    pub fn resolve(&self, driver: &str) -> Result<Arc<dyn BackendStrategy>, RegistryError> {
        let backends = self.backends.read().unwrap_or_else(PoisonError::into_inner);
        backends
            .get(driver)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownDriver {
                driver: driver.to_string(),
                registered: sorted_keys(&backends),
            })
    }

    pub fn contains(&self, driver: &str) -> bool {
        self.backends
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(driver)
    }

    /// Registered driver names, sorted
    pub fn drivers(&self) -> Vec<String> {
        sorted_keys(&self.backends.read().unwrap_or_else(PoisonError::into_inner))
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("drivers", &self.drivers())
            .finish()
    }
}

fn sorted_keys(backends: &HashMap<String, Arc<dyn BackendStrategy>>) -> Vec<String> {
    let mut keys: Vec<String> = backends.keys().cloned().collect();
    keys.sort();
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::time::Duration;
    use toolgate_domain::{InvocationError, ToolArgs, ToolSpec};

    // ==================== Test Mocks ====================

    struct StaticBackend {
        driver: &'static str,
        reply: Value,
    }

    #[async_trait]
    impl BackendStrategy for StaticBackend {
        fn driver(&self) -> &str {
            self.driver
        }

        async fn execute(
            &self,
            _args: &ToolArgs,
            _spec: &ToolSpec,
            _timeout: Duration,
        ) -> Result<Value, InvocationError> {
            Ok(self.reply.clone())
        }
    }

    fn backend(driver: &'static str, reply: Value) -> Arc<dyn BackendStrategy> {
        Arc::new(StaticBackend { driver, reply })
    }

    // ==================== Tests ====================

    #[test]
    fn test_register_and_resolve() {
        let registry = BackendRegistry::new()
            .with_backend(backend("function", json!(1)))
            .with_backend(backend("http", json!(2)));

        assert!(registry.contains("function"));
        assert_eq!(registry.drivers(), vec!["function", "http"]);
        assert_eq!(registry.resolve("http").unwrap().driver(), "http");
    }

    #[test]
    fn test_unknown_driver_lists_registered() {
        let registry = BackendRegistry::new().with_backend(backend("function", json!(1)));

        let err = registry.resolve("ftp").err().unwrap();
        assert_eq!(
            err,
            RegistryError::UnknownDriver {
                driver: "ftp".into(),
                registered: vec!["function".into()],
            }
        );
        assert_eq!(err.to_string(), "Unknown driver 'ftp' (registered: function)");
    }

    #[tokio::test]
    async fn test_register_replaces_existing() {
        let registry = BackendRegistry::new();
        registry.register(backend("function", json!("old")));
        registry.register(backend("function", json!("new")));

        let resolved = registry.resolve("function").unwrap();
        let spec = ToolSpec::new("t", "function");
        let value = resolved
            .execute(&ToolArgs::new(), &spec, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(value, json!("new"));
        assert_eq!(registry.drivers().len(), 1);
    }

    #[test]
    fn test_unregister() {
        let registry = BackendRegistry::new().with_backend(backend("database", json!(null)));

        assert!(registry.unregister("database").is_some());
        assert!(!registry.contains("database"));
        assert!(registry.unregister("database").is_none());
    }

    #[test]
    fn test_register_as_alias() {
        let registry = BackendRegistry::new();
        registry.register_as("rest", backend("http", json!(null)));

        assert!(registry.contains("rest"));
        assert!(!registry.contains("http"));
    }
}
