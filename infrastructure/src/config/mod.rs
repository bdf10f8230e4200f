//! Configuration file loading for toolgate
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `TOOLGATE_*` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./toolgate.toml` or `./.toolgate.toml`
//! 4. Global: `$XDG_CONFIG_HOME/toolgate/config.toml` (platform config dir)
//! 5. Default values

mod file_config;
mod loader;
mod serializer;

pub use file_config::{
    FileCacheConfig, FileCircuitBreakerConfig, FileConfig, FileIdempotencyConfig,
    FileKeyStrategyConfig, FileLimiterConfig, FileOutputConfig, FileParameterConfig,
    FileRetryConfig, FileSecurityConfig, FileToolConfig,
};
pub use loader::{ConfigError, ConfigLoader, ConfigSource, ConfigSourceKind};
pub use serializer::{
    ToolSerializationError, tool_from_json, tool_from_value, tool_to_json, tool_to_value,
};
