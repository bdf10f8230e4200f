//! Infrastructure layer for toolgate
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, the reference backends, and configuration
//! file loading.

pub mod backends;
pub mod config;
pub mod limiter;
pub mod memory;
pub mod observability;
pub mod security;
pub mod validation;

// Re-export commonly used types
#[cfg(feature = "http")]
pub use backends::{HTTP_DRIVER, HttpBackend};
pub use backends::{
    DATABASE_DRIVER, DatabaseBackend, DbOperation, DbStrategy, FUNCTION_DRIVER, FunctionBackend,
    InMemoryDbStrategy, demo_tool_specs, register_demo_functions,
};
pub use config::{
    ConfigError, ConfigLoader, ConfigSource, ConfigSourceKind, FileConfig, ToolSerializationError,
    tool_from_json, tool_from_value, tool_to_json, tool_to_value,
};
pub use limiter::TokenBucketLimiter;
pub use memory::InMemoryMemory;
pub use observability::{InMemoryMetrics, MetricsSnapshot, TracingTracer};
pub use security::BasicSecurity;
pub use validation::BasicValidator;
