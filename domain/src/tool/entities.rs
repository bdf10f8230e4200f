//! Tool domain entities

use crate::policy::circuit_breaker::{CircuitBreaker, DisabledCircuitBreaker};
use crate::policy::idempotency::{IdempotencyConfig, IdempotencyKeyStrategy};
use crate::policy::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Arguments of a single invocation (a JSON object)
pub type ToolArgs = serde_json::Map<String, Value>;

/// Timeout applied when a spec does not set one
pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// Declared JSON type of a tool parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    #[default]
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    /// No type check
    Any,
}

impl ParameterType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterType::String => "string",
            ParameterType::Number => "number",
            ParameterType::Integer => "integer",
            ParameterType::Boolean => "boolean",
            ParameterType::Array => "array",
            ParameterType::Object => "object",
            ParameterType::Any => "any",
        }
    }

    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ParameterType::String => value.is_string(),
            ParameterType::Number => value.is_number(),
            ParameterType::Integer => value.is_i64() || value.is_u64(),
            ParameterType::Boolean => value.is_boolean(),
            ParameterType::Array => value.is_array(),
            ParameterType::Object => value.is_object(),
            ParameterType::Any => true,
        }
    }
}

impl std::fmt::Display for ParameterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ParameterType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "string" | "str" => Ok(ParameterType::String),
            "number" | "float" => Ok(ParameterType::Number),
            "integer" | "int" => Ok(ParameterType::Integer),
            "boolean" | "bool" => Ok(ParameterType::Boolean),
            "array" | "list" => Ok(ParameterType::Array),
            "object" | "dict" => Ok(ParameterType::Object),
            "any" => Ok(ParameterType::Any),
            other => Err(format!("Unknown parameter type: {}", other)),
        }
    }
}

/// Parameter specification for a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    /// Parameter name
    pub name: String,
    /// Parameter description
    #[serde(default)]
    pub description: String,
    /// Whether this parameter is required
    #[serde(default)]
    pub required: bool,
    #[serde(default, rename = "type")]
    pub param_type: ParameterType,
    /// Allowed values for string parameters
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Regex the whole string value must match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    #[serde(default)]
    pub unique_items: bool,
}

impl ToolParameter {
    pub fn new(name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required,
            param_type: ParameterType::String,
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

    pub fn with_type(mut self, param_type: ParameterType) -> Self {
        self.param_type = param_type;
        self
    }

    pub fn with_enum<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_length(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn with_range(mut self, minimum: Option<f64>, maximum: Option<f64>) -> Self {
        self.minimum = minimum;
        self.maximum = maximum;
        self
    }

    pub fn with_items(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_items = min;
        self.max_items = max;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique_items = true;
        self
    }
}

/// Immutable per-tool configuration.
///
/// A spec is built once with the `with_*` builders and then shared
/// (`Arc<ToolSpec>`) by every call to the tool. Policy slots that are never
/// set keep working defaults: no retries, a disabled breaker, the default
/// key strategy and [`IdempotencyConfig::default`].
#[derive(Debug, Clone)]
pub struct ToolSpec {
    /// Unique tool identifier
    pub id: String,
    pub name: String,
    pub description: String,
    pub version: String,
    /// Backend driver name (e.g. "function", "http", "database")
    pub driver: String,
    pub parameters: Vec<ToolParameter>,
    /// Per-attempt backend timeout
    pub timeout: Duration,
    /// Permissions a caller must hold
    pub permissions: Vec<String>,
    /// Driver-specific options (url, method, headers, table, ...)
    pub options: serde_json::Map<String, Value>,
    pub metrics_tags: BTreeMap<String, String>,
    pub idempotency: IdempotencyConfig,
    pub idempotency_key_strategy: IdempotencyKeyStrategy,
    /// Shared breaker instance; state survives across calls
    pub circuit_breaker: Arc<dyn CircuitBreaker>,
    pub retry_policy: RetryPolicy,
}

impl ToolSpec {
    pub fn new(id: impl Into<String>, driver: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            description: String::new(),
            version: "1.0.0".to_string(),
            driver: driver.into(),
            parameters: Vec::new(),
            timeout: DEFAULT_TOOL_TIMEOUT,
            permissions: Vec::new(),
            options: serde_json::Map::new(),
            metrics_tags: BTreeMap::new(),
            idempotency: IdempotencyConfig::default(),
            idempotency_key_strategy: IdempotencyKeyStrategy::default(),
            circuit_breaker: Arc::new(DisabledCircuitBreaker),
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_parameter(mut self, param: ToolParameter) -> Self {
        self.parameters.push(param);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.push(permission.into());
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn with_metrics_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metrics_tags.insert(key.into(), value.into());
        self
    }

    pub fn with_idempotency(mut self, config: IdempotencyConfig) -> Self {
        self.idempotency = config;
        self
    }

    pub fn without_idempotency(mut self) -> Self {
        self.idempotency.enabled = false;
        self
    }

    pub fn with_key_strategy(mut self, strategy: IdempotencyKeyStrategy) -> Self {
        self.idempotency_key_strategy = strategy;
        self
    }

    pub fn with_circuit_breaker(mut self, breaker: Arc<dyn CircuitBreaker>) -> Self {
        self.circuit_breaker = breaker;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&ToolParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn option_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(Value::as_str)
    }

    /// Target checked against the egress policy: the `url` option when
    /// present, otherwise the driver name.
    pub fn egress_target(&self) -> &str {
        self.option_str("url").unwrap_or(&self.driver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_spec_defaults() {
        let spec = ToolSpec::new("calculator", "function");

        assert_eq!(spec.name, "calculator");
        assert_eq!(spec.timeout, DEFAULT_TOOL_TIMEOUT);
        assert!(spec.idempotency.enabled);
        assert_eq!(spec.retry_policy.max_attempts(), 1);
        assert_eq!(spec.circuit_breaker.name(), "disabled");
        assert_eq!(spec.idempotency_key_strategy.name(), "default");
    }

    #[test]
    fn test_egress_target() {
        let spec = ToolSpec::new("fetch", "http");
        assert_eq!(spec.egress_target(), "http");

        let spec = spec.with_option("url", "https://api.example.com/v1");
        assert_eq!(spec.egress_target(), "https://api.example.com/v1");
    }

    #[test]
    fn test_parameter_lookup() {
        let spec = ToolSpec::new("add", "function")
            .with_parameter(
                ToolParameter::new("a", "first operand", true).with_type(ParameterType::Number),
            )
            .with_parameter(ToolParameter::new("b", "second operand", true));

        assert_eq!(
            spec.parameter("a").map(|p| p.param_type),
            Some(ParameterType::Number)
        );
        assert!(spec.parameter("c").is_none());
    }

    #[test]
    fn test_parameter_type_matches() {
        assert!(ParameterType::Integer.matches(&json!(3)));
        assert!(!ParameterType::Integer.matches(&json!(3.5)));
        assert!(ParameterType::Number.matches(&json!(3.5)));
        assert!(ParameterType::Any.matches(&json!(null)));
        assert!(!ParameterType::Boolean.matches(&json!("true")));
    }

    #[test]
    fn test_parameter_type_from_str() {
        assert_eq!("int".parse::<ParameterType>(), Ok(ParameterType::Integer));
        assert_eq!("Object".parse::<ParameterType>(), Ok(ParameterType::Object));
        assert!("decimal".parse::<ParameterType>().is_err());
    }

    #[test]
    fn test_parameter_deserializes_constraints() {
        let param: ToolParameter = serde_json::from_value(json!({
            "name": "mode",
            "required": true,
            "type": "string",
            "enum": ["fast", "slow"],
            "max_length": 4
        }))
        .unwrap();

        assert_eq!(param.param_type, ParameterType::String);
        assert_eq!(param.enum_values, Some(vec!["fast".into(), "slow".into()]));
        assert_eq!(param.max_length, Some(4));
        assert!(!param.unique_items);
    }
}
