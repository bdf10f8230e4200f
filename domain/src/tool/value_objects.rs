//! Tool domain value objects: invocation results and usage
//!
//! Every call produces exactly one [`InvocationResult`], either built fresh
//! or replayed verbatim from the idempotency cache (which stores the
//! serialized form). Failures keep the same shape: `content` becomes
//! `{"error": message}` and [`InvocationResult::error`] records the kind.

use crate::core::error::{ErrorKind, InvocationError};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Resource accounting for one call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Size of the serialized arguments
    pub input_bytes: usize,
    /// Size of the serialized content
    pub output_bytes: usize,
    /// Backend attempts made
    pub attempts: u32,
    pub retries: u32,
    /// Call was rejected by an open circuit
    pub circuit_opened: bool,
}

/// Error summary embedded in a failed result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationFailure {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
}

impl From<&InvocationError> for InvocationFailure {
    fn from(err: &InvocationError) -> Self {
        Self {
            kind: err.kind,
            message: err.message.clone(),
            attempts: err.attempts,
        }
    }
}

/// Outcome of a single tool invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationResult {
    pub tool_id: String,
    pub content: Value,
    #[serde(default)]
    pub usage: Usage,
    #[serde(default)]
    pub latency_ms: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<InvocationFailure>,
}

impl InvocationResult {
    pub fn success(tool_id: impl Into<String>, content: Value) -> Self {
        Self {
            tool_id: tool_id.into(),
            content,
            usage: Usage::default(),
            latency_ms: 0,
            warnings: Vec::new(),
            idempotency_key: None,
            error: None,
        }
    }

    pub fn failure(tool_id: impl Into<String>, err: &InvocationError) -> Self {
        Self {
            tool_id: tool_id.into(),
            content: json!({ "error": err.message }),
            usage: Usage {
                attempts: err.attempts.unwrap_or(0),
                circuit_opened: err.kind == ErrorKind::CircuitOpen,
                ..Usage::default()
            },
            latency_ms: 0,
            warnings: vec![err.to_string()],
            idempotency_key: None,
            error: Some(InvocationFailure::from(err)),
        }
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = usage;
        self
    }

    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }

    /// Serialized size of the content, used for `usage.output_bytes`
    pub fn content_bytes(&self) -> usize {
        serde_json::to_vec(&self.content).map_or(0, |bytes| bytes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_result() {
        let result = InvocationResult::success("add", json!({"result": 5}))
            .with_latency_ms(12)
            .with_idempotency_key("abc");

        assert!(result.is_success());
        assert_eq!(result.error_kind(), None);
        assert_eq!(result.content_bytes(), r#"{"result":5}"#.len());
        assert_eq!(result.idempotency_key.as_deref(), Some("abc"));
    }

    #[test]
    fn test_failure_result_shape() {
        let err = InvocationError::backend("division by zero");
        let result = InvocationResult::failure("divide", &err);

        assert!(!result.is_success());
        assert_eq!(result.error_kind(), Some(ErrorKind::BackendError));
        assert_eq!(result.content, json!({"error": "division by zero"}));
        assert_eq!(result.warnings, vec!["[backend_error] division by zero"]);
    }

    #[test]
    fn test_circuit_open_failure_marks_usage() {
        let result = InvocationResult::failure("t", &InvocationError::circuit_open("t"));
        assert!(result.usage.circuit_opened);
        assert_eq!(result.usage.attempts, 0);
    }

    #[test]
    fn test_serialized_form_replays_identically() {
        let result = InvocationResult::success("echo", json!({"text": "hi"}))
            .with_usage(Usage {
                input_bytes: 13,
                output_bytes: 13,
                attempts: 1,
                ..Usage::default()
            })
            .with_warning("slow backend");

        let stored = serde_json::to_value(&result).unwrap();
        let replayed: InvocationResult = serde_json::from_value(stored).unwrap();
        assert_eq!(replayed, result);
    }
}
