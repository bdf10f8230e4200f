//! Tool specs as JSON
//!
//! A spec is written through its [`FileToolConfig`] form, so retry, breaker
//! and key strategy settings look the same as in a `[[tools]]` table. Reading
//! goes back through [`FileToolConfig::to_tool_spec`] with the same
//! validation and fallbacks.
//!
//! Custom retry strategies, custom key generators and third-party breakers
//! are code, not data, and cannot be written out.

use super::file_config::{
    FileCircuitBreakerConfig, FileIdempotencyConfig, FileKeyStrategyConfig, FileParameterConfig,
    FileRetryConfig, FileToolConfig,
};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use toolgate_domain::{CircuitBreaker, IdempotencyKeyStrategy, RetryPolicy, ToolParameter, ToolSpec};
use tracing::warn;

#[derive(Error, Debug)]
pub enum ToolSerializationError {
    #[error("Tool '{tool}' uses a custom {part}, which has no serialized form")]
    Unrepresentable { tool: String, part: &'static str },

    #[error("Invalid tool JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid tool definition: {0}")]
    Invalid(String),
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl FileToolConfig {
    /// Config entry that builds an equivalent spec
    pub fn from_tool_spec(spec: &ToolSpec) -> Result<Self, ToolSerializationError> {
        let unrepresentable = |part| ToolSerializationError::Unrepresentable {
            tool: spec.id.clone(),
            part,
        };

        let idempotency_key = match &spec.idempotency_key_strategy {
            IdempotencyKeyStrategy::Default => FileKeyStrategyConfig::default(),
            IdempotencyKeyStrategy::FieldBased => FileKeyStrategyConfig {
                strategy: "field".to_string(),
                ..Default::default()
            },
            IdempotencyKeyStrategy::HashBased {
                algorithm,
                include_user,
                include_session,
            } => FileKeyStrategyConfig {
                strategy: "hash".to_string(),
                algorithm: algorithm.as_str().to_string(),
                include_user: *include_user,
                include_session: *include_session,
            },
            IdempotencyKeyStrategy::Custom(_) => return Err(unrepresentable("key generator")),
        };

        let retry = match &spec.retry_policy {
            RetryPolicy::None => FileRetryConfig::default(),
            RetryPolicy::Fixed(fixed) => FileRetryConfig {
                policy: "fixed".to_string(),
                max_attempts: fixed.max_attempts,
                delay_ms: millis(fixed.delay),
                jitter_ms: millis(fixed.jitter),
                ..Default::default()
            },
            RetryPolicy::ExponentialBackoff(backoff) => FileRetryConfig {
                policy: "exponential".to_string(),
                max_attempts: backoff.max_attempts,
                base_delay_ms: millis(backoff.base_delay),
                multiplier: backoff.multiplier,
                max_delay_ms: millis(backoff.max_delay),
                jitter: backoff.jitter,
                ..Default::default()
            },
            RetryPolicy::Custom(_) => return Err(unrepresentable("retry strategy")),
        };

        let circuit_breaker = breaker_config(spec.circuit_breaker.as_ref())
            .ok_or_else(|| unrepresentable("circuit breaker"))?;

        Ok(Self {
            id: spec.id.clone(),
            name: (spec.name != spec.id).then(|| spec.name.clone()),
            description: spec.description.clone(),
            version: Some(spec.version.clone()),
            driver: spec.driver.clone(),
            timeout_seconds: Some(spec.timeout.as_secs_f64()),
            permissions: spec.permissions.clone(),
            metrics_tags: spec.metrics_tags.clone(),
            parameters: spec.parameters.iter().map(FileParameterConfig::from_parameter).collect(),
            options: spec.options.clone(),
            idempotency: FileIdempotencyConfig {
                enabled: spec.idempotency.enabled,
                key_fields: spec.idempotency.key_fields.clone(),
                ttl_seconds: spec.idempotency.ttl.as_secs(),
                persist_result: spec.idempotency.persist_result,
            },
            idempotency_key,
            retry,
            circuit_breaker,
        })
    }
}

impl FileParameterConfig {
    fn from_parameter(param: &ToolParameter) -> Self {
        Self {
            name: param.name.clone(),
            description: param.description.clone(),
            required: param.required,
            param_type: param.param_type.as_str().to_string(),
            enum_values: param.enum_values.clone(),
            min_length: param.min_length,
            max_length: param.max_length,
            pattern: param.pattern.clone(),
            minimum: param.minimum,
            maximum: param.maximum,
            min_items: param.min_items,
            max_items: param.max_items,
            unique_items: param.unique_items,
        }
    }
}

/// `None` for a breaker that reports no settings but is not the disabled one
fn breaker_config(breaker: &dyn CircuitBreaker) -> Option<FileCircuitBreakerConfig> {
    let Some(settings) = breaker.settings() else {
        return (breaker.name() == "disabled").then(FileCircuitBreakerConfig::default);
    };

    let mut config = FileCircuitBreakerConfig {
        policy: breaker.name().to_string(),
        failure_threshold: settings.failure_threshold,
        recovery_timeout_seconds: settings.recovery_timeout.as_secs(),
        half_open_max_calls: settings.half_open_max_calls,
        ..Default::default()
    };
    if let Some(adaptive) = settings.adaptive {
        config.max_threshold = adaptive.max_threshold;
        config.error_rate_threshold = adaptive.error_rate_threshold;
        config.window_size = adaptive.window_size;
    }
    Some(config)
}

pub fn tool_to_value(spec: &ToolSpec) -> Result<Value, ToolSerializationError> {
    Ok(serde_json::to_value(FileToolConfig::from_tool_spec(spec)?)?)
}

/// Pretty-printed JSON for `spec`
pub fn tool_to_json(spec: &ToolSpec) -> Result<String, ToolSerializationError> {
    Ok(serde_json::to_string_pretty(&FileToolConfig::from_tool_spec(spec)?)?)
}

/// Build a spec from its JSON form.
///
/// Missing fields take their config defaults. Out-of-range values fall back
/// with a logged warning; an entry with no id or driver is an error.
pub fn tool_from_value(value: Value) -> Result<ToolSpec, ToolSerializationError> {
    let config: FileToolConfig = serde_json::from_value(value)?;
    build(&config)
}

pub fn tool_from_json(json: &str) -> Result<ToolSpec, ToolSerializationError> {
    let config: FileToolConfig = serde_json::from_str(json)?;
    build(&config)
}

fn build(config: &FileToolConfig) -> Result<ToolSpec, ToolSerializationError> {
    let (spec, issues) = config.to_tool_spec(0);
    let Some(spec) = spec else {
        let messages: Vec<&str> = issues.iter().map(|i| i.message.as_str()).collect();
        return Err(ToolSerializationError::Invalid(messages.join("; ")));
    };
    for issue in issues.iter().filter(|i| !i.is_error()) {
        warn!(tool = %spec.id, "{}", issue.message);
    }
    Ok(spec)
}
