//! Invocation error taxonomy
//!
//! Every failure that leaves the pipeline is an [`InvocationError`] tagged
//! with one [`ErrorKind`]. The kind alone decides how the rest of the system
//! reacts:
//!
//! | Kind | Retryable | Breaker failure | Terminal |
//! |------|:---:|:---:|:---:|
//! | `ValidationFailed` | - | - | yes |
//! | `AuthorizationDenied` | - | - | yes |
//! | `EgressDenied` | - | - | yes |
//! | `IdempotencyKeyGenerationFailed` | - | - | yes |
//! | `CircuitOpen` | - | - | yes |
//! | `RateLimited` | yes | yes | - |
//! | `BackendTimeout` | yes | yes | - |
//! | `BackendUnavailable` | yes | yes | - |
//! | `BackendError` | opt-in | - | unless marked retryable |
//! | `RetryExhausted` | - | - | yes (wraps last error) |
//! | `DeadlineExceeded` | - | - | yes (wraps last error) |

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Closed set of failure kinds produced by the invocation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ValidationFailed,
    AuthorizationDenied,
    EgressDenied,
    RateLimited,
    IdempotencyKeyGenerationFailed,
    CircuitOpen,
    BackendTimeout,
    BackendUnavailable,
    /// Opaque backend-specific failure (e.g. a domain error raised by a function)
    BackendError,
    DeadlineExceeded,
    RetryExhausted,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 11] = [
        ErrorKind::ValidationFailed,
        ErrorKind::AuthorizationDenied,
        ErrorKind::EgressDenied,
        ErrorKind::RateLimited,
        ErrorKind::IdempotencyKeyGenerationFailed,
        ErrorKind::CircuitOpen,
        ErrorKind::BackendTimeout,
        ErrorKind::BackendUnavailable,
        ErrorKind::BackendError,
        ErrorKind::DeadlineExceeded,
        ErrorKind::RetryExhausted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ValidationFailed => "validation_failed",
            ErrorKind::AuthorizationDenied => "authorization_denied",
            ErrorKind::EgressDenied => "egress_denied",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::IdempotencyKeyGenerationFailed => "idempotency_key_generation_failed",
            ErrorKind::CircuitOpen => "circuit_open",
            ErrorKind::BackendTimeout => "backend_timeout",
            ErrorKind::BackendUnavailable => "backend_unavailable",
            ErrorKind::BackendError => "backend_error",
            ErrorKind::DeadlineExceeded => "deadline_exceeded",
            ErrorKind::RetryExhausted => "retry_exhausted",
        }
    }

    /// Transient kinds that a retry policy may attempt again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::RateLimited | ErrorKind::BackendTimeout | ErrorKind::BackendUnavailable
        )
    }

    /// Kinds recorded as failures by the circuit breaker.
    pub fn counts_as_breaker_failure(&self) -> bool {
        self.is_retryable()
    }

    /// Kinds raised before the backend is ever touched.
    pub fn is_pre_dispatch(&self) -> bool {
        matches!(
            self,
            ErrorKind::ValidationFailed
                | ErrorKind::AuthorizationDenied
                | ErrorKind::EgressDenied
                | ErrorKind::IdempotencyKeyGenerationFailed
                | ErrorKind::CircuitOpen
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A failure raised anywhere in the invocation pipeline.
///
/// Wrapping kinds (`RetryExhausted`, `DeadlineExceeded`) keep the last
/// underlying error in [`cause`](Self::cause) and the number of backend
/// attempts made in [`attempts`](Self::attempts).
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[error("[{kind}] {message}")]
pub struct InvocationError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
    /// Explicit retryability override, honoured for `BackendError` only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[source]
    pub cause: Option<Box<InvocationError>>,
}

impl InvocationError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            attempts: None,
            retryable: None,
            cause: None,
        }
    }

    // Common error constructors
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ValidationFailed, message)
    }

    pub fn authorization_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::AuthorizationDenied, message)
    }

    pub fn egress_denied(target: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::EgressDenied,
            format!("Egress denied: {}", target.into()),
        )
    }

    pub fn rate_limited(tool_id: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::RateLimited,
            format!("Rate limit exceeded for tool '{}'", tool_id.into()),
        )
    }

    pub fn key_generation(message: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::IdempotencyKeyGenerationFailed,
            format!("Idempotency key generation failed: {}", message.into()),
        )
    }

    pub fn circuit_open(tool_id: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::CircuitOpen,
            format!("Circuit breaker is open for tool '{}'", tool_id.into()),
        )
    }

    pub fn backend_timeout(tool_id: impl Into<String>, timeout: std::time::Duration) -> Self {
        Self::new(
            ErrorKind::BackendTimeout,
            format!(
                "Backend call for tool '{}' timed out after {}ms",
                tool_id.into(),
                timeout.as_millis()
            ),
        )
    }

    pub fn backend_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BackendUnavailable, message)
    }

    pub fn backend(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BackendError, message)
    }

    pub fn retry_exhausted(last: InvocationError, attempts: u32) -> Self {
        Self {
            kind: ErrorKind::RetryExhausted,
            message: format!("Retries exhausted after {} attempts: {}", attempts, last.message),
            attempts: Some(attempts),
            retryable: None,
            cause: Some(Box::new(last)),
        }
    }

    pub fn deadline_exceeded(last: Option<InvocationError>, attempts: u32) -> Self {
        let message = match &last {
            Some(last) => format!(
                "Deadline exceeded after {} attempts: {}",
                attempts, last.message
            ),
            None => format!("Deadline exceeded after {} attempts", attempts),
        };
        Self {
            kind: ErrorKind::DeadlineExceeded,
            message,
            attempts: Some(attempts),
            retryable: None,
            cause: last.map(Box::new),
        }
    }

    /// Caller cancelled the call; reported as `DeadlineExceeded`
    pub fn cancelled(attempts: u32) -> Self {
        Self {
            kind: ErrorKind::DeadlineExceeded,
            message: format!("Invocation cancelled after {} attempts", attempts),
            attempts: Some(attempts),
            retryable: None,
            cause: None,
        }
    }

    /// Mark a `BackendError` as retryable (ignored for every other kind)
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = Some(retryable);
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = Some(attempts);
        self
    }

    pub fn is_retryable(&self) -> bool {
        match self.kind {
            ErrorKind::BackendError => self.retryable.unwrap_or(false),
            kind => kind.is_retryable(),
        }
    }

    /// The innermost wrapped error (`self` when nothing is wrapped)
    pub fn root_cause(&self) -> &InvocationError {
        let mut current = self;
        while let Some(cause) = &current.cause {
            current = cause;
        }
        current
    }

    /// Whether the circuit breaker should count this outcome as a failure.
    ///
    /// Wrapping kinds are judged by the error they wrap.
    pub fn counts_as_breaker_failure(&self) -> bool {
        self.root_cause().kind.counts_as_breaker_failure()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_retryable_kinds() {
        let retryable: Vec<_> = ErrorKind::ALL
            .iter()
            .filter(|k| k.is_retryable())
            .copied()
            .collect();
        assert_eq!(
            retryable,
            vec![
                ErrorKind::RateLimited,
                ErrorKind::BackendTimeout,
                ErrorKind::BackendUnavailable
            ]
        );
    }

    #[test]
    fn test_backend_error_retryable_override() {
        assert!(!InvocationError::backend("boom").is_retryable());
        assert!(InvocationError::backend("boom").with_retryable(true).is_retryable());
        // The override is ignored for terminal kinds
        assert!(
            !InvocationError::validation("bad")
                .with_retryable(true)
                .is_retryable()
        );
    }

    #[test]
    fn test_wrapping_preserves_cause() {
        let last = InvocationError::backend_timeout("search", Duration::from_millis(250));
        let err = InvocationError::retry_exhausted(last, 3);

        assert_eq!(err.kind, ErrorKind::RetryExhausted);
        assert_eq!(err.attempts, Some(3));
        assert!(!err.is_retryable());
        assert_eq!(err.root_cause().kind, ErrorKind::BackendTimeout);
        assert!(err.counts_as_breaker_failure());
        assert!(err.message.contains("250ms"));
    }

    #[test]
    fn test_deadline_exceeded_without_cause() {
        let err = InvocationError::deadline_exceeded(None, 0);
        assert_eq!(err.kind, ErrorKind::DeadlineExceeded);
        assert!(err.cause.is_none());
        assert!(!err.counts_as_breaker_failure());
    }

    #[test]
    fn test_error_display() {
        let err = InvocationError::circuit_open("payments");
        assert_eq!(
            err.to_string(),
            "[circuit_open] Circuit breaker is open for tool 'payments'"
        );
    }

    #[test]
    fn test_serde_roundtrip_keeps_kind() {
        let err = InvocationError::retry_exhausted(InvocationError::rate_limited("t"), 2);
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"retry_exhausted\""));
        let back: InvocationError = serde_json::from_str(&json).unwrap();
        assert_eq!(back.root_cause().kind, ErrorKind::RateLimited);
    }
}
