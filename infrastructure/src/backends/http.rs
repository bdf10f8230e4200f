//! `http` driver (reqwest)
//!
//! Request shape comes from the tool options: `url` (required), `method`
//! (default `GET`), `headers` and `query` (objects of strings). For `GET`
//! and `DELETE` the call arguments are appended to the query string;
//! otherwise they are sent as a JSON body.
//!
//! Status mapping:
//!
//! | Response | Error kind |
//! |----------|-----------|
//! | 2xx | none; `{status_code, response}` with JSON or text body |
//! | 429 | `RateLimited` |
//! | 408, 504, client timeout | `BackendTimeout` |
//! | 502, 503, connect failure | `BackendUnavailable` |
//! | anything else | `BackendError` |

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde_json::{Value, json};
use std::time::Duration;
use toolgate_application::ports::backend::BackendStrategy;
use toolgate_domain::{ErrorKind, InvocationError, ToolArgs, ToolSpec};
use tracing::debug;

pub const HTTP_DRIVER: &str = "http";

const USER_AGENT: &str = concat!("toolgate/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
}

impl HttpBackend {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Default for HttpBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BackendStrategy for HttpBackend {
    fn driver(&self) -> &str {
        HTTP_DRIVER
    }

    async fn execute(
        &self,
        args: &ToolArgs,
        spec: &ToolSpec,
        timeout: Duration,
    ) -> Result<Value, InvocationError> {
        let url = spec
            .option_str("url")
            .ok_or_else(|| InvocationError::backend(format!("Tool '{}' has no 'url' option", spec.id)))?;
        let method = parse_method(spec.option_str("method").unwrap_or("GET"))?;

        let mut request = self
            .client
            .request(method.clone(), url)
            .timeout(timeout)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::ACCEPT, "application/json, */*;q=0.8");
        for (name, value) in string_pairs(spec.options.get("headers")) {
            request = request.header(name, value);
        }

        let mut query = string_pairs(spec.options.get("query"));
        if method == Method::GET || method == Method::DELETE {
            query.extend(string_pairs(Some(&Value::Object(args.clone()))));
        } else {
            request = request.json(args);
        }
        if !query.is_empty() {
            request = request.query(&query);
        }

        debug!(tool = %spec.id, %method, url, "Sending HTTP request");
        let response = request
            .send()
            .await
            .map_err(|e| classify_transport_error(&spec.id, timeout, &e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| classify_transport_error(&spec.id, timeout, &e))?;
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));

        match classify_status(status) {
            None => Ok(json!({ "status_code": status.as_u16(), "response": body })),
            Some(kind) => Err(InvocationError::new(
                kind,
                format!("HTTP {} from {}: {}", status.as_u16(), url, truncate(&body.to_string(), 200)),
            )),
        }
    }
}

fn parse_method(method: &str) -> Result<Method, InvocationError> {
    Method::from_bytes(method.to_uppercase().as_bytes())
        .map_err(|_| InvocationError::backend(format!("Invalid HTTP method '{}'", method)))
}

/// Error kind for a non-success status; `None` for 2xx
fn classify_status(status: StatusCode) -> Option<ErrorKind> {
    match status.as_u16() {
        200..=299 => None,
        429 => Some(ErrorKind::RateLimited),
        408 | 504 => Some(ErrorKind::BackendTimeout),
        502 | 503 => Some(ErrorKind::BackendUnavailable),
        _ => Some(ErrorKind::BackendError),
    }
}

fn classify_transport_error(tool_id: &str, timeout: Duration, err: &reqwest::Error) -> InvocationError {
    if err.is_timeout() {
        InvocationError::backend_timeout(tool_id, timeout)
    } else if err.is_connect() {
        InvocationError::backend_unavailable(format!("Connection failed: {}", err))
    } else {
        InvocationError::backend(format!("HTTP request failed: {}", err))
    }
}

/// Flatten a JSON object into string pairs; non-string values use their
/// JSON text
fn string_pairs(value: Option<&Value>) -> Vec<(String, String)> {
    let Some(Value::Object(map)) = value else {
        return Vec::new();
    };
    map.iter()
        .map(|(k, v)| {
            let v = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), v)
        })
        .collect()
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let cut: String = s.chars().take(max_chars).collect();
    format!("{}...", cut)
}
