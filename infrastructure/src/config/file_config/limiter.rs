//! Rate limiter configuration from TOML (`[limiter]` section)

use crate::limiter::TokenBucketLimiter;
use serde::{Deserialize, Serialize};
use toolgate_domain::{ConfigIssue, ConfigIssueCode};

/// Raw limiter configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLimiterConfig {
    pub enabled: bool,
    /// Tokens added per second to each bucket
    pub rate_per_second: f64,
    /// Bucket capacity
    pub burst: u32,
    /// Separate buckets per tenant
    pub per_tenant: bool,
}

impl Default for FileLimiterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            rate_per_second: 10.0,
            burst: 20,
            per_tenant: false,
        }
    }
}

impl FileLimiterConfig {
    /// The configured limiter, `None` when disabled
    pub fn to_limiter(&self) -> Option<TokenBucketLimiter> {
        if !self.enabled {
            return None;
        }
        let limiter = TokenBucketLimiter::new(self.rate_per_second, self.burst);
        Some(if self.per_tenant {
            limiter.per_tenant()
        } else {
            limiter
        })
    }

    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        if !self.rate_per_second.is_finite() || self.rate_per_second <= 0.0 {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::OutOfRange {
                    field: "limiter.rate_per_second".to_string(),
                    value: self.rate_per_second.to_string(),
                },
                format!(
                    "limiter.rate_per_second: {} never refills the bucket",
                    self.rate_per_second
                ),
            ));
        }
        if self.burst == 0 {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::OutOfRange {
                    field: "limiter.burst".to_string(),
                    value: "0".to_string(),
                },
                "limiter.burst: 0 is raised to 1",
            ));
        }
        issues
    }
}
