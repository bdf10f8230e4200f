//! Demo functions for the `function` driver: `add`, `divide`, `echo`, `sleep`.

use super::function::{FUNCTION_DRIVER, FunctionBackend};
use serde_json::{Value, json};
use std::time::Duration;
use toolgate_domain::{
    IdempotencyConfig, InvocationError, ParameterType, RetryPolicy, ToolArgs, ToolParameter,
    ToolSpec,
};

pub const DEMO_FUNCTIONS: [&str; 4] = ["add", "divide", "echo", "sleep"];

/// Register every demo function on `backend`
pub fn register_demo_functions(backend: &FunctionBackend) {
    backend.register("add", add);
    backend.register("divide", divide);
    backend.register("echo", echo);
    backend.register("sleep", sleep);
}

/// Specs for the demo functions, used when no tools are configured
pub fn demo_tool_specs() -> Vec<ToolSpec> {
    let number = |name: &str| {
        ToolParameter::new(name, format!("Operand {}", name), true).with_type(ParameterType::Number)
    };
    vec![
        ToolSpec::new("add", FUNCTION_DRIVER)
            .with_description("Add two numbers")
            .with_parameter(number("a"))
            .with_parameter(number("b")),
        ToolSpec::new("divide", FUNCTION_DRIVER)
            .with_description("Divide a by b")
            .with_parameter(number("a"))
            .with_parameter(number("b")),
        ToolSpec::new("echo", FUNCTION_DRIVER)
            .with_description("Return the arguments unchanged")
            .with_idempotency(IdempotencyConfig::disabled()),
        ToolSpec::new("sleep", FUNCTION_DRIVER)
            .with_description("Sleep for `ms` milliseconds")
            .with_parameter(
                ToolParameter::new("ms", "Milliseconds to sleep", false)
                    .with_type(ParameterType::Integer)
                    .with_range(Some(0.0), Some(60_000.0)),
            )
            .with_timeout(Duration::from_secs(5))
            .with_retry_policy(RetryPolicy::exponential(3, Duration::from_millis(200))),
    ]
}

fn operand<'a>(args: &'a ToolArgs, name: &str) -> Result<&'a Value, InvocationError> {
    args.get(name)
        .filter(|v| v.is_number())
        .ok_or_else(|| InvocationError::backend(format!("Argument '{}' must be a number", name)))
}

async fn add(args: ToolArgs) -> Result<Value, InvocationError> {
    let (a, b) = (operand(&args, "a")?, operand(&args, "b")?);
    if let (Some(a), Some(b)) = (a.as_i64(), b.as_i64())
        && let Some(sum) = a.checked_add(b)
    {
        return Ok(json!(sum));
    }
    Ok(json!(a.as_f64().unwrap_or_default() + b.as_f64().unwrap_or_default()))
}

async fn divide(args: ToolArgs) -> Result<Value, InvocationError> {
    let a = operand(&args, "a")?.as_f64().unwrap_or_default();
    let b = operand(&args, "b")?.as_f64().unwrap_or_default();
    if b == 0.0 {
        return Err(InvocationError::backend("Division by zero"));
    }
    Ok(json!(a / b))
}

async fn echo(args: ToolArgs) -> Result<Value, InvocationError> {
    Ok(Value::Object(args))
}

async fn sleep(args: ToolArgs) -> Result<Value, InvocationError> {
    let ms = args.get("ms").and_then(Value::as_u64).unwrap_or(100);
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Ok(json!({ "slept_ms": ms }))
}
