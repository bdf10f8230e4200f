//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted to domain types on demand,
//! reporting every problem as a [`ConfigIssue`].

mod cache;
mod limiter;
mod output;
mod security;
mod tools;

pub use cache::FileCacheConfig;
pub use limiter::FileLimiterConfig;
pub use output::FileOutputConfig;
pub use security::FileSecurityConfig;
pub use tools::{
    FileCircuitBreakerConfig, FileIdempotencyConfig, FileKeyStrategyConfig, FileParameterConfig,
    FileRetryConfig, FileToolConfig,
};

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use toolgate_domain::{ConfigIssue, ConfigIssueCode, ToolSpec};

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// `[[tools]]` entries
    pub tools: Vec<FileToolConfig>,
    /// Authorization and egress settings
    pub security: FileSecurityConfig,
    /// Rate limiting
    pub limiter: FileLimiterConfig,
    /// Result cache and per-key locks
    pub cache: FileCacheConfig,
    /// Output settings
    pub output: FileOutputConfig,
}

impl FileConfig {
    /// Build every usable tool spec.
    ///
    /// Entries with an error are skipped; for duplicate ids the first entry
    /// wins.
    pub fn tool_specs(&self) -> (Vec<ToolSpec>, Vec<ConfigIssue>) {
        let mut specs = Vec::new();
        let mut issues = Vec::new();
        let mut seen = HashSet::new();

        for (index, entry) in self.tools.iter().enumerate() {
            let (spec, found) = entry.to_tool_spec(index);
            issues.extend(found);
            let Some(spec) = spec else { continue };

            if !seen.insert(spec.id.clone()) {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::DuplicateToolId {
                        id: spec.id.clone(),
                    },
                    format!(
                        "tools[{}]: duplicate tool id '{}', entry skipped",
                        index, spec.id
                    ),
                ));
                continue;
            }
            specs.push(spec);
        }
        (specs, issues)
    }

    /// Validate the entire configuration, returning all detected issues.
    ///
    /// Checks tool entries (empty and duplicate ids, unknown policy names,
    /// out-of-range numbers), the limiter and the cache section.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = self.tool_specs().1;
        issues.extend(self.limiter.validate());
        issues.extend(self.cache.validate());
        issues
    }

    /// Report tools whose driver is not in `drivers`
    pub fn validate_drivers(&self, drivers: &[String]) -> Vec<ConfigIssue> {
        self.tools
            .iter()
            .filter(|tool| !tool.id.trim().is_empty() && !drivers.contains(&tool.driver))
            .map(|tool| {
                ConfigIssue::error(
                    ConfigIssueCode::UnknownDriver {
                        tool: tool.id.clone(),
                        driver: tool.driver.clone(),
                    },
                    format!(
                        "tools.{}.driver: no backend registered for '{}' (available: {})",
                        tool.id,
                        tool.driver,
                        drivers.join(", ")
                    ),
                )
            })
            .collect()
    }
}
