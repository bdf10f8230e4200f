//! Declarative argument validation against a tool's parameter list.
//!
//! Checks, in order: unknown arguments, missing required arguments, then
//! per-argument type and constraints (enum, length, full-match pattern,
//! numeric range, item count, unique items). The first violation fails the
//! call with `ValidationFailed`.
//!
//! A tool that declares no parameters takes free-form arguments.

use regex::Regex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};
use toolgate_application::ports::validator::Validator;
use toolgate_domain::{InvocationError, ParameterType, ToolArgs, ToolParameter, ToolSpec};
use tracing::debug;

#[derive(Debug, Default)]
pub struct BasicValidator {
    allow_unknown: bool,
    /// Compiled patterns, keyed by source
    patterns: Mutex<HashMap<String, Regex>>,
}

impl BasicValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept arguments the tool does not declare
    pub fn allow_unknown(mut self) -> Self {
        self.allow_unknown = true;
        self
    }

    fn check_param(&self, value: &Value, param: &ToolParameter) -> Result<(), String> {
        if !param.param_type.matches(value) {
            return Err(format!(
                "expected {}, got {}",
                param.param_type,
                json_type(value)
            ));
        }

        if let Some(allowed) = &param.enum_values {
            let matches = value
                .as_str()
                .is_some_and(|s| allowed.iter().any(|a| a == s));
            if !matches {
                return Err(format!("must be one of [{}]", allowed.join(", ")));
            }
        }

        if let Some(s) = value.as_str() {
            let len = s.chars().count();
            if param.min_length.is_some_and(|min| len < min) {
                return Err(format!("shorter than {} characters", param.min_length.unwrap_or(0)));
            }
            if param.max_length.is_some_and(|max| len > max) {
                return Err(format!("longer than {} characters", param.max_length.unwrap_or(0)));
            }
            if let Some(pattern) = &param.pattern
                && !self.full_match(pattern, s)?
            {
                return Err(format!("does not match pattern '{}'", pattern));
            }
        }

        if let Some(n) = value.as_f64() {
            if param.minimum.is_some_and(|min| n < min) {
                return Err(format!("below minimum {}", param.minimum.unwrap_or_default()));
            }
            if param.maximum.is_some_and(|max| n > max) {
                return Err(format!("above maximum {}", param.maximum.unwrap_or_default()));
            }
        }

        if let Some(items) = value.as_array() {
            if param.min_items.is_some_and(|min| items.len() < min) {
                return Err(format!("fewer than {} items", param.min_items.unwrap_or(0)));
            }
            if param.max_items.is_some_and(|max| items.len() > max) {
                return Err(format!("more than {} items", param.max_items.unwrap_or(0)));
            }
            if param.unique_items {
                let distinct: HashSet<String> = items.iter().map(Value::to_string).collect();
                if distinct.len() != items.len() {
                    return Err("items are not unique".to_string());
                }
            }
        }

        Ok(())
    }

    fn full_match(&self, pattern: &str, value: &str) -> Result<bool, String> {
        let mut patterns = self.patterns.lock().unwrap_or_else(PoisonError::into_inner);
        if !patterns.contains_key(pattern) {
            let regex = Regex::new(&format!("^(?:{})$", pattern))
                .map_err(|e| format!("invalid pattern '{}': {}", pattern, e))?;
            patterns.insert(pattern.to_string(), regex);
        }
        Ok(patterns
            .get(pattern)
            .is_some_and(|regex| regex.is_match(value)))
    }
}

impl Validator for BasicValidator {
    fn validate(&self, args: &ToolArgs, spec: &ToolSpec) -> Result<(), InvocationError> {
        if !self.allow_unknown && !spec.parameters.is_empty() {
            let mut unknown: Vec<&str> = args
                .keys()
                .filter(|name| spec.parameter(name).is_none())
                .map(String::as_str)
                .collect();
            if !unknown.is_empty() {
                unknown.sort_unstable();
                debug!(tool = %spec.id, ?unknown, "Rejecting unknown arguments");
                return Err(InvocationError::validation(format!(
                    "Unknown parameter(s): {}",
                    unknown.join(", ")
                )));
            }
        }

        for param in &spec.parameters {
            match args.get(&param.name) {
                None if param.required => {
                    return Err(InvocationError::validation(format!(
                        "Missing required parameter: {}",
                        param.name
                    )));
                }
                None => {}
                // An explicit null counts as absent for optional parameters
                Some(Value::Null) if !param.required && param.param_type != ParameterType::Any => {}
                Some(value) => self.check_param(value, param).map_err(|reason| {
                    InvocationError::validation(format!(
                        "Parameter '{}' failed validation: {}",
                        param.name, reason
                    ))
                })?,
            }
        }
        Ok(())
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use toolgate_domain::ErrorKind;

    fn args(value: Value) -> ToolArgs {
        match value {
            Value::Object(map) => map,
            _ => panic!("args must be an object"),
        }
    }

    fn divide_spec() -> ToolSpec {
        ToolSpec::new("divide", "function")
            .with_parameter(ToolParameter::new("a", "Dividend", true).with_type(ParameterType::Number))
            .with_parameter(ToolParameter::new("b", "Divisor", true).with_type(ParameterType::Number))
    }

    fn message(result: Result<(), InvocationError>) -> String {
        let err = result.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValidationFailed);
        err.message
    }

    #[test]
    fn test_valid_arguments() {
        let validator = BasicValidator::new();
        assert!(validator.validate(&args(json!({"a": 10, "b": 2.5})), &divide_spec()).is_ok());
    }

    #[test]
    fn test_missing_required() {
        let validator = BasicValidator::new();
        let msg = message(validator.validate(&args(json!({"b": 1})), &divide_spec()));
        assert_eq!(msg, "Missing required parameter: a");
    }

    #[test]
    fn test_unknown_arguments() {
        let spec = divide_spec();
        let call_args = args(json!({"a": 1, "b": 2, "z": 0, "c": 0}));

        let msg = message(BasicValidator::new().validate(&call_args, &spec));
        assert_eq!(msg, "Unknown parameter(s): c, z");

        assert!(BasicValidator::new().allow_unknown().validate(&call_args, &spec).is_ok());
    }

    #[test]
    fn test_type_mismatch() {
        let msg = message(BasicValidator::new().validate(&args(json!({"a": "10", "b": 2})), &divide_spec()));
        assert_eq!(msg, "Parameter 'a' failed validation: expected number, got string");
    }

    #[test]
    fn test_integer_rejects_fraction() {
        let spec = ToolSpec::new("page", "function")
            .with_parameter(ToolParameter::new("n", "", true).with_type(ParameterType::Integer));
        let validator = BasicValidator::new();

        assert!(validator.validate(&args(json!({"n": 3})), &spec).is_ok());
        assert!(validator.validate(&args(json!({"n": 3.5})), &spec).is_err());
    }

    #[test]
    fn test_string_constraints() {
        let spec = ToolSpec::new("lookup", "function").with_parameter(
            ToolParameter::new("code", "", true)
                .with_length(Some(3), Some(5))
                .with_pattern("[A-Z]+"),
        );
        let validator = BasicValidator::new();

        assert!(validator.validate(&args(json!({"code": "ABCD"})), &spec).is_ok());
        assert!(message(validator.validate(&args(json!({"code": "AB"})), &spec)).contains("shorter"));
        assert!(message(validator.validate(&args(json!({"code": "ABCDEF"})), &spec)).contains("longer"));
        // Full match, not search
        assert!(message(validator.validate(&args(json!({"code": "ABc"})), &spec)).contains("pattern"));
    }

    #[test]
    fn test_invalid_pattern_fails_validation() {
        let spec = ToolSpec::new("t", "function")
            .with_parameter(ToolParameter::new("s", "", true).with_pattern("(unclosed"));
        let msg = message(BasicValidator::new().validate(&args(json!({"s": "x"})), &spec));
        assert!(msg.contains("invalid pattern"));
    }

    #[test]
    fn test_enum_values() {
        let spec = ToolSpec::new("t", "function").with_parameter(
            ToolParameter::new("unit", "", true).with_enum(["celsius", "fahrenheit"]),
        );
        let validator = BasicValidator::new();

        assert!(validator.validate(&args(json!({"unit": "celsius"})), &spec).is_ok());
        assert!(message(validator.validate(&args(json!({"unit": "kelvin"})), &spec))
            .contains("must be one of [celsius, fahrenheit]"));
    }

    #[test]
    fn test_numeric_range() {
        let spec = ToolSpec::new("t", "function").with_parameter(
            ToolParameter::new("pct", "", true)
                .with_type(ParameterType::Number)
                .with_range(Some(0.0), Some(100.0)),
        );
        let validator = BasicValidator::new();

        assert!(validator.validate(&args(json!({"pct": 100})), &spec).is_ok());
        assert!(validator.validate(&args(json!({"pct": -1})), &spec).is_err());
        assert!(validator.validate(&args(json!({"pct": 100.5})), &spec).is_err());
    }

    #[test]
    fn test_array_constraints() {
        let spec = ToolSpec::new("t", "function").with_parameter(
            ToolParameter::new("tags", "", true)
                .with_type(ParameterType::Array)
                .with_items(Some(1), Some(3))
                .unique(),
        );
        let validator = BasicValidator::new();

        assert!(validator.validate(&args(json!({"tags": ["a", "b"]})), &spec).is_ok());
        assert!(validator.validate(&args(json!({"tags": []})), &spec).is_err());
        assert!(validator.validate(&args(json!({"tags": [1, 2, 3, 4]})), &spec).is_err());
        assert!(message(validator.validate(&args(json!({"tags": ["a", "a"]})), &spec)).contains("unique"));
    }

    #[test]
    fn test_optional_null_is_absent() {
        let spec = ToolSpec::new("t", "function")
            .with_parameter(ToolParameter::new("limit", "", false).with_type(ParameterType::Integer));
        assert!(BasicValidator::new().validate(&args(json!({"limit": null})), &spec).is_ok());
    }

    #[test]
    fn test_free_form_when_no_parameters_declared() {
        let spec = ToolSpec::new("echo", "function");
        assert!(BasicValidator::new().validate(&args(json!({"anything": [1, 2]})), &spec).is_ok());
    }
}
