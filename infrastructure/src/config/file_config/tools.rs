//! Tool entries from TOML (`[[tools]]` array)
//!
//! Each entry becomes one [`ToolSpec`]. Policy sub-tables are optional; an
//! entry with none of them gets idempotency on, the default key strategy, no
//! retries and no circuit breaker.
//!
//! ```toml
//! [[tools]]
//! id = "search"
//! driver = "http"
//! timeout_seconds = 10
//! options = { url = "https://api.example.com/search", method = "GET" }
//!
//! [[tools.parameters]]
//! name = "q"
//! type = "string"
//! required = true
//!
//! [tools.retry]
//! policy = "exponential"
//! max_attempts = 4
//!
//! [tools.circuit_breaker]
//! policy = "standard"
//! failure_threshold = 5
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use toolgate_domain::policy::circuit_breaker::{
    DEFAULT_ERROR_RATE_THRESHOLD, DEFAULT_FAILURE_THRESHOLD, DEFAULT_HALF_OPEN_MAX_CALLS,
    DEFAULT_MAX_THRESHOLD, DEFAULT_RECOVERY_TIMEOUT, DEFAULT_WINDOW_SIZE,
};
use toolgate_domain::policy::idempotency::{DEFAULT_IDEMPOTENCY_TTL, MAX_IDEMPOTENCY_TTL};
use toolgate_domain::policy::retry::{
    DEFAULT_EXPONENTIAL_JITTER, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_DELAY, DEFAULT_MULTIPLIER,
};
use toolgate_domain::{
    AdaptiveCircuitBreaker, CircuitBreaker, ConfigIssue, ConfigIssueCode, DisabledCircuitBreaker,
    ExponentialBackoff, FixedRetry, HashAlgorithm, IdempotencyConfig, IdempotencyKeyStrategy,
    ParameterType, RetryPolicy, StandardCircuitBreaker, ToolParameter, ToolSpec,
};

fn invalid_enum(field: String, value: &str, valid: &[&str], fallback: &str) -> ConfigIssue {
    ConfigIssue::warning(
        ConfigIssueCode::InvalidEnumValue {
            field: field.clone(),
            value: value.to_string(),
            valid_values: valid.iter().map(|v| v.to_string()).collect(),
        },
        format!(
            "{}: unknown value '{}', falling back to '{}'",
            field, value, fallback
        ),
    )
}

fn out_of_range(field: String, value: impl ToString, expected: &str) -> ConfigIssue {
    let value = value.to_string();
    ConfigIssue::warning(
        ConfigIssueCode::OutOfRange {
            field: field.clone(),
            value: value.clone(),
        },
        format!("{}: {} is out of range ({}), using the default", field, value, expected),
    )
}

/// One `[[tools]]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileToolConfig {
    pub id: String,
    /// Display name (defaults to the id)
    pub name: Option<String>,
    pub description: String,
    pub version: Option<String>,
    pub driver: String,
    pub timeout_seconds: Option<f64>,
    pub permissions: Vec<String>,
    pub metrics_tags: BTreeMap<String, String>,
    pub parameters: Vec<FileParameterConfig>,
    /// Driver-specific settings (`url`, `method`, `table`, `engine`, ...)
    pub options: serde_json::Map<String, Value>,
    pub idempotency: FileIdempotencyConfig,
    pub idempotency_key: FileKeyStrategyConfig,
    pub retry: FileRetryConfig,
    pub circuit_breaker: FileCircuitBreakerConfig,
}

impl Default for FileToolConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: None,
            description: String::new(),
            version: None,
            driver: "function".to_string(),
            timeout_seconds: None,
            permissions: Vec::new(),
            metrics_tags: BTreeMap::new(),
            parameters: Vec::new(),
            options: serde_json::Map::new(),
            idempotency: FileIdempotencyConfig::default(),
            idempotency_key: FileKeyStrategyConfig::default(),
            retry: FileRetryConfig::default(),
            circuit_breaker: FileCircuitBreakerConfig::default(),
        }
    }
}

impl FileToolConfig {
    /// Build the tool spec for entry `index`.
    ///
    /// Returns `None` (with an error issue) when the entry has no id or no
    /// driver; every other problem is a warning and falls back to a default.
    pub fn to_tool_spec(&self, index: usize) -> (Option<ToolSpec>, Vec<ConfigIssue>) {
        let prefix = format!("tools[{}]", index);
        let mut issues = Vec::new();

        if self.id.trim().is_empty() {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::EmptyValue {
                    field: format!("{}.id", prefix),
                },
                format!("{}.id: tool id must not be empty, entry skipped", prefix),
            ));
            return (None, issues);
        }
        let prefix = format!("tools.{}", self.id);
        if self.driver.trim().is_empty() {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::EmptyValue {
                    field: format!("{}.driver", prefix),
                },
                format!("{}.driver: driver must not be empty, entry skipped", prefix),
            ));
            return (None, issues);
        }

        let mut spec = ToolSpec::new(self.id.trim(), self.driver.trim())
            .with_description(self.description.clone());
        if let Some(name) = self.name.as_ref().filter(|n| !n.trim().is_empty()) {
            spec = spec.with_name(name.clone());
        }
        if let Some(version) = &self.version {
            spec = spec.with_version(version.clone());
        }
        if let Some(secs) = self.timeout_seconds {
            match Duration::try_from_secs_f64(secs) {
                Ok(timeout) if !timeout.is_zero() => spec = spec.with_timeout(timeout),
                _ => issues.push(out_of_range(format!("{}.timeout_seconds", prefix), secs, "> 0")),
            }
        }
        for permission in &self.permissions {
            spec = spec.with_permission(permission.clone());
        }
        for (key, value) in &self.metrics_tags {
            spec = spec.with_metrics_tag(key.clone(), value.clone());
        }
        for (key, value) in &self.options {
            spec = spec.with_option(key.clone(), value.clone());
        }
        for (i, param) in self.parameters.iter().enumerate() {
            let (param, param_issues) = param.to_parameter(&format!("{}.parameters[{}]", prefix, i));
            issues.extend(param_issues);
            if let Some(param) = param {
                spec = spec.with_parameter(param);
            }
        }

        let (idempotency, found) = self.idempotency.to_config(&prefix);
        issues.extend(found);
        let (strategy, found) = self.idempotency_key.to_strategy(&prefix);
        issues.extend(found);
        let (retry, found) = self.retry.to_policy(&prefix);
        issues.extend(found);
        let (breaker, found) = self.circuit_breaker.to_breaker(&prefix);
        issues.extend(found);

        let spec = spec
            .with_idempotency(idempotency)
            .with_key_strategy(strategy)
            .with_retry_policy(retry)
            .with_circuit_breaker(breaker);
        (Some(spec), issues)
    }
}

/// One `[[tools.parameters]]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileParameterConfig {
    pub name: String,
    pub description: String,
    pub required: bool,
    #[serde(rename = "type")]
    pub param_type: String,
    #[serde(rename = "enum")]
    pub enum_values: Option<Vec<String>>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<String>,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub min_items: Option<usize>,
    pub max_items: Option<usize>,
    pub unique_items: bool,
}

impl Default for FileParameterConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            required: false,
            param_type: "string".to_string(),
            enum_values: None,
            min_length: None,
            max_length: None,
            pattern: None,
            minimum: None,
            maximum: None,
            min_items: None,
            max_items: None,
            unique_items: false,
        }
    }
}

impl FileParameterConfig {
    fn to_parameter(&self, field: &str) -> (Option<ToolParameter>, Vec<ConfigIssue>) {
        if self.name.trim().is_empty() {
            let issue = ConfigIssue::error(
                ConfigIssueCode::EmptyValue {
                    field: format!("{}.name", field),
                },
                format!("{}.name: parameter name must not be empty, parameter skipped", field),
            );
            return (None, vec![issue]);
        }

        let mut issues = Vec::new();
        let param_type = self.param_type.parse::<ParameterType>().unwrap_or_else(|_| {
            issues.push(invalid_enum(
                format!("{}.type", field),
                &self.param_type,
                &["string", "number", "integer", "boolean", "array", "object", "any"],
                "any",
            ));
            ParameterType::Any
        });

        let mut param = ToolParameter::new(self.name.trim(), self.description.clone(), self.required)
            .with_type(param_type)
            .with_length(self.min_length, self.max_length)
            .with_range(self.minimum, self.maximum)
            .with_items(self.min_items, self.max_items);
        if let Some(values) = &self.enum_values {
            param = param.with_enum(values.clone());
        }
        if let Some(pattern) = &self.pattern {
            param = param.with_pattern(pattern.clone());
        }
        if self.unique_items {
            param = param.unique();
        }
        (Some(param), issues)
    }
}

/// `[tools.idempotency]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileIdempotencyConfig {
    pub enabled: bool,
    /// Argument fields that make up the key (all fields when unset)
    pub key_fields: Option<Vec<String>>,
    pub ttl_seconds: u64,
    pub persist_result: bool,
}

impl Default for FileIdempotencyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            key_fields: None,
            ttl_seconds: DEFAULT_IDEMPOTENCY_TTL.as_secs(),
            persist_result: true,
        }
    }
}

impl FileIdempotencyConfig {
    pub fn to_config(&self, prefix: &str) -> (IdempotencyConfig, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        let max = MAX_IDEMPOTENCY_TTL.as_secs();
        let ttl = if (1..=max).contains(&self.ttl_seconds) {
            Duration::from_secs(self.ttl_seconds)
        } else {
            issues.push(out_of_range(
                format!("{}.idempotency.ttl_seconds", prefix),
                self.ttl_seconds,
                &format!("1 to {}", max),
            ));
            DEFAULT_IDEMPOTENCY_TTL
        };

        let mut config = IdempotencyConfig {
            enabled: self.enabled,
            key_fields: None,
            ttl,
            persist_result: self.persist_result,
        };
        if let Some(fields) = &self.key_fields {
            config = config.with_key_fields(fields.clone());
        }
        (config, issues)
    }
}

/// `[tools.idempotency_key]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileKeyStrategyConfig {
    /// `default`, `field` or `hash`
    pub strategy: String,
    /// Digest for the `hash` strategy
    pub algorithm: String,
    pub include_user: bool,
    pub include_session: bool,
}

impl Default for FileKeyStrategyConfig {
    fn default() -> Self {
        Self {
            strategy: "default".to_string(),
            algorithm: HashAlgorithm::default().as_str().to_string(),
            include_user: true,
            include_session: true,
        }
    }
}

impl FileKeyStrategyConfig {
    pub fn to_strategy(&self, prefix: &str) -> (IdempotencyKeyStrategy, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        let strategy = match self.strategy.to_lowercase().as_str() {
            "default" => IdempotencyKeyStrategy::Default,
            "field" | "field_based" => IdempotencyKeyStrategy::FieldBased,
            "hash" | "hash_based" => {
                let algorithm = self.algorithm.parse::<HashAlgorithm>().unwrap_or_else(|_| {
                    issues.push(invalid_enum(
                        format!("{}.idempotency_key.algorithm", prefix),
                        &self.algorithm,
                        &["sha256", "sha384", "sha512"],
                        "sha256",
                    ));
                    HashAlgorithm::default()
                });
                IdempotencyKeyStrategy::HashBased {
                    algorithm,
                    include_user: self.include_user,
                    include_session: self.include_session,
                }
            }
            _ => {
                issues.push(invalid_enum(
                    format!("{}.idempotency_key.strategy", prefix),
                    &self.strategy,
                    &["default", "field", "hash"],
                    "default",
                ));
                IdempotencyKeyStrategy::Default
            }
        };
        (strategy, issues)
    }
}

/// `[tools.retry]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRetryConfig {
    /// `none`, `fixed` or `exponential`
    pub policy: String,
    pub max_attempts: u32,
    /// Delay between attempts (`fixed`)
    pub delay_ms: u64,
    /// Jitter added or subtracted from the delay (`fixed`)
    pub jitter_ms: u64,
    /// First delay (`exponential`)
    pub base_delay_ms: u64,
    pub multiplier: f64,
    pub max_delay_ms: u64,
    /// Jitter as a fraction of the delay (`exponential`)
    pub jitter: f64,
}

impl Default for FileRetryConfig {
    fn default() -> Self {
        Self {
            policy: "none".to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay_ms: 1000,
            jitter_ms: 0,
            base_delay_ms: 1000,
            multiplier: DEFAULT_MULTIPLIER,
            max_delay_ms: DEFAULT_MAX_DELAY.as_millis() as u64,
            jitter: DEFAULT_EXPONENTIAL_JITTER,
        }
    }
}

impl FileRetryConfig {
    pub fn to_policy(&self, prefix: &str) -> (RetryPolicy, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        let field = |name: &str| format!("{}.retry.{}", prefix, name);

        let max_attempts = if self.max_attempts == 0 {
            issues.push(out_of_range(field("max_attempts"), 0, ">= 1"));
            DEFAULT_MAX_ATTEMPTS
        } else {
            self.max_attempts
        };

        let policy = match self.policy.to_lowercase().as_str() {
            "none" => RetryPolicy::None,
            "fixed" => RetryPolicy::Fixed(
                FixedRetry::new(max_attempts, Duration::from_millis(self.delay_ms))
                    .with_jitter(Duration::from_millis(self.jitter_ms)),
            ),
            "exponential" | "exponential_backoff" => {
                let mut backoff =
                    ExponentialBackoff::new(max_attempts, Duration::from_millis(self.base_delay_ms))
                        .with_max_delay(Duration::from_millis(self.max_delay_ms));
                if self.multiplier >= 1.0 {
                    backoff = backoff.with_multiplier(self.multiplier);
                } else {
                    issues.push(out_of_range(field("multiplier"), self.multiplier, ">= 1.0"));
                }
                if (0.0..=1.0).contains(&self.jitter) {
                    backoff = backoff.with_jitter(self.jitter);
                } else {
                    issues.push(out_of_range(field("jitter"), self.jitter, "0.0 to 1.0"));
                }
                RetryPolicy::ExponentialBackoff(backoff)
            }
            _ => {
                issues.push(invalid_enum(
                    field("policy"),
                    &self.policy,
                    &["none", "fixed", "exponential"],
                    "none",
                ));
                RetryPolicy::None
            }
        };
        (policy, issues)
    }
}

/// `[tools.circuit_breaker]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCircuitBreakerConfig {
    /// `disabled`, `standard` or `adaptive`
    pub policy: String,
    /// Consecutive failures before opening (base threshold for `adaptive`)
    pub failure_threshold: u32,
    pub recovery_timeout_seconds: u64,
    pub half_open_max_calls: u32,
    /// Upper threshold bound (`adaptive`)
    pub max_threshold: u32,
    /// Error rate above which the threshold tightens (`adaptive`)
    pub error_rate_threshold: f64,
    /// Outcomes kept for the error rate (`adaptive`)
    pub window_size: usize,
}

impl Default for FileCircuitBreakerConfig {
    fn default() -> Self {
        Self {
            policy: "disabled".to_string(),
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            recovery_timeout_seconds: DEFAULT_RECOVERY_TIMEOUT.as_secs(),
            half_open_max_calls: DEFAULT_HALF_OPEN_MAX_CALLS,
            max_threshold: DEFAULT_MAX_THRESHOLD,
            error_rate_threshold: DEFAULT_ERROR_RATE_THRESHOLD,
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }
}

impl FileCircuitBreakerConfig {
    pub fn to_breaker(&self, prefix: &str) -> (Arc<dyn CircuitBreaker>, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        let field = |name: &str| format!("{}.circuit_breaker.{}", prefix, name);

        let threshold = if self.failure_threshold == 0 {
            issues.push(out_of_range(field("failure_threshold"), 0, ">= 1"));
            DEFAULT_FAILURE_THRESHOLD
        } else {
            self.failure_threshold
        };
        let recovery = Duration::from_secs(self.recovery_timeout_seconds);
        let half_open = if self.half_open_max_calls == 0 {
            issues.push(out_of_range(field("half_open_max_calls"), 0, ">= 1"));
            DEFAULT_HALF_OPEN_MAX_CALLS
        } else {
            self.half_open_max_calls
        };

        let breaker: Arc<dyn CircuitBreaker> = match self.policy.to_lowercase().as_str() {
            "disabled" | "none" => Arc::new(DisabledCircuitBreaker),
            "standard" => Arc::new(
                StandardCircuitBreaker::new(threshold, recovery).with_half_open_max_calls(half_open),
            ),
            "adaptive" => {
                let max_threshold = if self.max_threshold < threshold {
                    issues.push(out_of_range(
                        field("max_threshold"),
                        self.max_threshold,
                        ">= failure_threshold",
                    ));
                    threshold.max(DEFAULT_MAX_THRESHOLD)
                } else {
                    self.max_threshold
                };
                let mut breaker = AdaptiveCircuitBreaker::new(threshold, max_threshold, recovery)
                    .with_half_open_max_calls(half_open);
                if (0.0..=1.0).contains(&self.error_rate_threshold) {
                    breaker = breaker.with_error_rate_threshold(self.error_rate_threshold);
                } else {
                    issues.push(out_of_range(
                        field("error_rate_threshold"),
                        self.error_rate_threshold,
                        "0.0 to 1.0",
                    ));
                }
                if self.window_size > 0 {
                    breaker = breaker.with_window_size(self.window_size);
                } else {
                    issues.push(out_of_range(field("window_size"), 0, ">= 1"));
                }
                Arc::new(breaker)
            }
            _ => {
                issues.push(invalid_enum(
                    field("policy"),
                    &self.policy,
                    &["disabled", "standard", "adaptive"],
                    "disabled",
                ));
                Arc::new(DisabledCircuitBreaker)
            }
        };
        (breaker, issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolgate_domain::Severity;

    fn entry(toml_str: &str) -> FileToolConfig {
        toml::from_str(toml_str).unwrap()
    }

    #[test]
    fn test_minimal_entry_uses_defaults() {
        let (spec, issues) = entry(r#"id = "add""#).to_tool_spec(0);
        let spec = spec.unwrap();

        assert!(issues.is_empty());
        assert_eq!(spec.name, "add");
        assert_eq!(spec.driver, "function");
        assert!(spec.idempotency.enabled);
        assert_eq!(spec.retry_policy.name(), "none");
        assert_eq!(spec.circuit_breaker.name(), "disabled");
        assert_eq!(spec.idempotency_key_strategy.name(), "default");
    }

    #[test]
    fn test_full_entry() {
        let config = entry(
            r#"
id = "search"
name = "Search"
driver = "http"
timeout_seconds = 2.5
permissions = ["search:read"]
metrics_tags = { team = "core" }
options = { url = "https://api.example.com/search", method = "GET" }

[[parameters]]
name = "q"
type = "string"
required = true
min_length = 1

[[parameters]]
name = "limit"
type = "integer"
minimum = 1
maximum = 50

[idempotency]
key_fields = ["q"]
ttl_seconds = 60

[idempotency_key]
strategy = "hash"
algorithm = "sha512"
include_session = false

[retry]
policy = "exponential"
max_attempts = 4
base_delay_ms = 100

[circuit_breaker]
policy = "standard"
failure_threshold = 3
recovery_timeout_seconds = 10
"#,
        );

        let (spec, issues) = config.to_tool_spec(0);
        let spec = spec.unwrap();
        assert!(issues.is_empty(), "{:?}", issues);
        assert_eq!(spec.name, "Search");
        assert_eq!(spec.timeout, Duration::from_millis(2500));
        assert_eq!(spec.permissions, vec!["search:read"]);
        assert_eq!(spec.metrics_tags.get("team").map(String::as_str), Some("core"));
        assert_eq!(spec.option_str("url"), Some("https://api.example.com/search"));
        assert_eq!(spec.parameters.len(), 2);
        assert_eq!(spec.parameter("limit").unwrap().param_type, ParameterType::Integer);
        assert_eq!(spec.idempotency.key_fields, Some(vec!["q".to_string()]));
        assert_eq!(spec.idempotency.ttl, Duration::from_secs(60));
        assert!(matches!(
            spec.idempotency_key_strategy,
            IdempotencyKeyStrategy::HashBased {
                algorithm: HashAlgorithm::Sha512,
                include_user: true,
                include_session: false,
            }
        ));
        assert_eq!(spec.retry_policy.max_attempts(), 4);
        assert_eq!(spec.retry_policy.name(), "exponential");
        assert_eq!(spec.circuit_breaker.name(), "standard");
        assert_eq!(spec.circuit_breaker.current_threshold("search"), 3);
    }

    #[test]
    fn test_empty_id_is_error() {
        let (spec, issues) = entry(r#"driver = "function""#).to_tool_spec(2);
        assert!(spec.is_none());
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Error);
        assert_eq!(
            issues[0].code,
            ConfigIssueCode::EmptyValue {
                field: "tools[2].id".into()
            }
        );
    }

    #[test]
    fn test_empty_driver_is_error() {
        let (spec, issues) = entry("id = \"x\"\ndriver = \"\"").to_tool_spec(0);
        assert!(spec.is_none());
        assert!(issues[0].is_error());
    }

    #[test]
    fn test_unknown_policy_falls_back() {
        let config = entry(
            r#"
id = "t"
[retry]
policy = "forever"
[circuit_breaker]
policy = "magic"
[idempotency_key]
strategy = "random"
"#,
        );
        let (spec, issues) = config.to_tool_spec(0);
        let spec = spec.unwrap();

        assert_eq!(spec.retry_policy.name(), "none");
        assert_eq!(spec.circuit_breaker.name(), "disabled");
        assert_eq!(spec.idempotency_key_strategy.name(), "default");
        assert_eq!(issues.len(), 3);
        assert!(issues.iter().all(|i| i.severity == Severity::Warning));
        assert!(matches!(
            &issues[0].code,
            ConfigIssueCode::InvalidEnumValue { field, value, .. }
                if field == "tools.t.idempotency_key.strategy" && value == "random"
        ));
    }

    #[test]
    fn test_out_of_range_values() {
        let config = entry(
            r#"
id = "t"
timeout_seconds = -1
[idempotency]
ttl_seconds = 0
[retry]
policy = "fixed"
max_attempts = 0
[circuit_breaker]
policy = "standard"
failure_threshold = 0
"#,
        );
        let (spec, issues) = config.to_tool_spec(0);
        let spec = spec.unwrap();

        let fields: Vec<&str> = issues
            .iter()
            .filter_map(|i| match &i.code {
                ConfigIssueCode::OutOfRange { field, .. } => Some(field.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(
            fields,
            vec![
                "tools.t.timeout_seconds",
                "tools.t.idempotency.ttl_seconds",
                "tools.t.retry.max_attempts",
                "tools.t.circuit_breaker.failure_threshold",
            ]
        );
        assert_eq!(spec.idempotency.ttl, DEFAULT_IDEMPOTENCY_TTL);
        assert_eq!(spec.retry_policy.max_attempts(), DEFAULT_MAX_ATTEMPTS);
        assert_eq!(spec.circuit_breaker.current_threshold("t"), DEFAULT_FAILURE_THRESHOLD);
    }

    #[test]
    fn test_oversized_durations_fall_back() {
        let config = entry(
            r#"
id = "t"
timeout_seconds = 1e30
[idempotency]
ttl_seconds = 9223372036854775807
"#,
        );
        let (spec, issues) = config.to_tool_spec(0);
        let spec = spec.unwrap();

        let fields: Vec<&str> = issues
            .iter()
            .filter_map(|i| match &i.code {
                ConfigIssueCode::OutOfRange { field, .. } => Some(field.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(
            fields,
            vec!["tools.t.timeout_seconds", "tools.t.idempotency.ttl_seconds"]
        );
        assert_eq!(spec.timeout, ToolSpec::new("t", "function").timeout);
        assert_eq!(spec.idempotency.ttl, DEFAULT_IDEMPOTENCY_TTL);
    }

    #[test]
    fn test_ttl_at_the_cap_is_kept() {
        let config = FileIdempotencyConfig {
            ttl_seconds: MAX_IDEMPOTENCY_TTL.as_secs(),
            ..Default::default()
        };
        let (config, issues) = config.to_config("tools.t");
        assert!(issues.is_empty());
        assert_eq!(config.ttl, MAX_IDEMPOTENCY_TTL);
    }

    #[test]
    fn test_adaptive_breaker() {
        let config = entry(
            r#"
id = "t"
[circuit_breaker]
policy = "adaptive"
failure_threshold = 4
max_threshold = 12
window_size = 20
"#,
        );
        let (spec, issues) = config.to_tool_spec(0);
        assert!(issues.is_empty());
        assert_eq!(spec.unwrap().circuit_breaker.name(), "adaptive");
    }

    #[test]
    fn test_unknown_parameter_type() {
        let config = entry(
            r#"
id = "t"
[[parameters]]
name = "x"
type = "uuid"
"#,
        );
        let (spec, issues) = config.to_tool_spec(0);
        assert_eq!(spec.unwrap().parameter("x").unwrap().param_type, ParameterType::Any);
        assert_eq!(issues.len(), 1);
    }
}
