//! Result cache configuration from TOML (`[cache]` section)

use serde::{Deserialize, Serialize};
use std::time::Duration;
use toolgate_domain::{ConfigIssue, ConfigIssueCode};

const DEFAULT_LOCK_TTL_SECONDS: u64 = 60;
const DEFAULT_MAX_ENTRIES: u64 = 10_000;

/// Raw cache configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCacheConfig {
    /// How long a caller waits for (and may hold) a per-key lock
    pub lock_ttl_seconds: u64,
    /// Upper bound on stored results
    pub max_entries: u64,
}

impl Default for FileCacheConfig {
    fn default() -> Self {
        Self {
            lock_ttl_seconds: DEFAULT_LOCK_TTL_SECONDS,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

fn zero_fallback(field: &str, fallback: u64) -> ConfigIssue {
    ConfigIssue::warning(
        ConfigIssueCode::OutOfRange {
            field: field.to_string(),
            value: "0".to_string(),
        },
        format!("{}: 0 is out of range, falling back to {}", field, fallback),
    )
}

impl FileCacheConfig {
    pub fn lock_ttl(&self) -> (Duration, Vec<ConfigIssue>) {
        if self.lock_ttl_seconds == 0 {
            let issue = zero_fallback("cache.lock_ttl_seconds", DEFAULT_LOCK_TTL_SECONDS);
            return (Duration::from_secs(DEFAULT_LOCK_TTL_SECONDS), vec![issue]);
        }
        (Duration::from_secs(self.lock_ttl_seconds), vec![])
    }

    pub fn max_entries(&self) -> (u64, Vec<ConfigIssue>) {
        if self.max_entries == 0 {
            let issue = zero_fallback("cache.max_entries", DEFAULT_MAX_ENTRIES);
            return (DEFAULT_MAX_ENTRIES, vec![issue]);
        }
        (self.max_entries, vec![])
    }

    /// Every issue in the section
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = self.lock_ttl().1;
        issues.extend(self.max_entries().1);
        issues
    }
}
