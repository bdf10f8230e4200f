//! Validator port
//!
//! Checks call arguments against the tool's declared parameters before
//! anything else happens.

use toolgate_domain::{InvocationError, ToolArgs, ToolSpec};

/// Port for argument validation
///
/// Implementations return a `ValidationFailed` error describing the first
/// problem found. Validation is synchronous and side-effect free.
pub trait Validator: Send + Sync {
    fn validate(&self, args: &ToolArgs, spec: &ToolSpec) -> Result<(), InvocationError>;
}

/// Accepts every argument set
#[derive(Debug, Clone, Copy, Default)]
pub struct NoValidation;

impl Validator for NoValidation {
    fn validate(&self, _args: &ToolArgs, _spec: &ToolSpec) -> Result<(), InvocationError> {
        Ok(())
    }
}
