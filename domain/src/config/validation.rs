//! Configuration issues
//!
//! Loading a tool configuration never aborts on a bad value. Each problem is
//! reported as a [`ConfigIssue`] and the offending value falls back to its
//! default (or the entry is skipped), so callers can print every issue at
//! once and decide whether to continue.

/// Severity level of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fatal: the entry cannot be used at all.
    Error,
    /// Non-fatal: a default was substituted.
    Warning,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

/// Identifies a specific configuration issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssueCode {
    /// A string field holds a value outside its enumeration.
    InvalidEnumValue {
        field: String,
        value: String,
        valid_values: Vec<String>,
    },
    /// A required string field is empty.
    EmptyValue { field: String },
    /// Two tools share the same id.
    DuplicateToolId { id: String },
    /// A numeric field is outside its allowed range.
    OutOfRange { field: String, value: String },
    /// A tool names a driver that has no registered backend.
    UnknownDriver { tool: String, driver: String },
}

/// A detected issue in the configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub code: ConfigIssueCode,
    pub message: String,
}

impl ConfigIssue {
    pub fn warning(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }

    pub fn error(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_constructors() {
        let issue = ConfigIssue::error(
            ConfigIssueCode::DuplicateToolId { id: "add".into() },
            "tools: duplicate id 'add'",
        );
        assert!(issue.is_error());
        assert_eq!(issue.severity.as_str(), "error");

        let issue = ConfigIssue::warning(
            ConfigIssueCode::EmptyValue {
                field: "tools[0].name".into(),
            },
            "empty name",
        );
        assert!(!issue.is_error());
    }
}
