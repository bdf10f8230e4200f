//! Idempotency configuration and key strategies
//!
//! A key strategy turns `(args, context, spec)` into a stable hex digest.
//! Equal inputs always give equal keys: arguments are canonicalized as JSON
//! with object keys sorted at every level before hashing, and the
//! components are hashed as a JSON array of strings so no choice of user or
//! session id can make two different component lists collide.
//!
//! | Strategy | Components |
//! |----------|------------|
//! | `Default` | tool id, user id, session id, args |
//! | `FieldBased` | tool id, args |
//! | `HashBased` | tool id, optional user id, optional session id, args |
//! | `Custom` | caller-defined |
//!
//! When [`IdempotencyConfig::key_fields`] is set, only those argument fields
//! participate in the built-in strategies.

use crate::core::error::InvocationError;
use crate::tool::context::CallContext;
use crate::tool::entities::{ToolArgs, ToolSpec};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256, Sha384, Sha512};
use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;

/// Prefix of every idempotency record in the cache
pub const IDEMPOTENCY_KEY_PREFIX: &str = "idempotency:";

/// Default lifetime of a cached result
pub const DEFAULT_IDEMPOTENCY_TTL: Duration = Duration::from_secs(3600);

/// Longest lifetime a cached result may be given (one year)
pub const MAX_IDEMPOTENCY_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Per-tool idempotency settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotencyConfig {
    pub enabled: bool,
    /// Argument fields that make up the key (`None` = all fields)
    pub key_fields: Option<Vec<String>>,
    pub ttl: Duration,
    /// Store successful results for replay
    pub persist_result: bool,
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            key_fields: None,
            ttl: DEFAULT_IDEMPOTENCY_TTL,
            persist_result: true,
        }
    }
}

impl IdempotencyConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_key_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_persist_result(mut self, persist: bool) -> Self {
        self.persist_result = persist;
        self
    }
}

/// Cache key under which the result for `key` is stored
pub fn cache_key(key: &str) -> String {
    format!("{}{}", IDEMPOTENCY_KEY_PREFIX, key)
}

/// Digest algorithm for [`IdempotencyKeyStrategy::HashBased`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha384 => "sha384",
            HashAlgorithm::Sha512 => "sha512",
        }
    }

    pub fn digest_hex(&self, input: &[u8]) -> String {
        match self {
            HashAlgorithm::Sha256 => hex_encode(&Sha256::digest(input)),
            HashAlgorithm::Sha384 => hex_encode(&Sha384::digest(input)),
            HashAlgorithm::Sha512 => hex_encode(&Sha512::digest(input)),
        }
    }
}

impl std::str::FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "").as_str() {
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha384" => Ok(HashAlgorithm::Sha384),
            "sha512" => Ok(HashAlgorithm::Sha512),
            other => Err(format!("Unsupported hash algorithm: {}", other)),
        }
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Caller-supplied key generator.
///
/// Returning `Err` fails the call with `IdempotencyKeyGenerationFailed`.
pub trait KeyGenerator: Send + Sync + std::fmt::Debug {
    fn generate_key(
        &self,
        args: &ToolArgs,
        ctx: &CallContext,
        spec: &ToolSpec,
    ) -> Result<String, String>;
}

/// How the idempotency key of a call is derived
#[derive(Debug, Clone, Default)]
pub enum IdempotencyKeyStrategy {
    /// Tool id, user, session and arguments (SHA-256)
    #[default]
    Default,
    /// Tool id and arguments only (SHA-256); identical requests from
    /// different users share a key
    FieldBased,
    HashBased {
        algorithm: HashAlgorithm,
        include_user: bool,
        include_session: bool,
    },
    Custom(Arc<dyn KeyGenerator>),
}

impl IdempotencyKeyStrategy {
    /// Hash-based strategy including user and session
    pub fn hash_based(algorithm: HashAlgorithm) -> Self {
        IdempotencyKeyStrategy::HashBased {
            algorithm,
            include_user: true,
            include_session: true,
        }
    }

    pub fn custom(generator: impl KeyGenerator + 'static) -> Self {
        IdempotencyKeyStrategy::Custom(Arc::new(generator))
    }

    pub fn name(&self) -> &'static str {
        match self {
            IdempotencyKeyStrategy::Default => "default",
            IdempotencyKeyStrategy::FieldBased => "field",
            IdempotencyKeyStrategy::HashBased { .. } => "hash",
            IdempotencyKeyStrategy::Custom(_) => "custom",
        }
    }

    pub fn generate_key(
        &self,
        args: &ToolArgs,
        ctx: &CallContext,
        spec: &ToolSpec,
    ) -> Result<String, InvocationError> {
        let (algorithm, include_user, include_session) = match self {
            IdempotencyKeyStrategy::Default => (HashAlgorithm::Sha256, true, true),
            IdempotencyKeyStrategy::FieldBased => (HashAlgorithm::Sha256, false, false),
            IdempotencyKeyStrategy::HashBased {
                algorithm,
                include_user,
                include_session,
            } => (*algorithm, *include_user, *include_session),
            IdempotencyKeyStrategy::Custom(generator) => {
                return generator
                    .generate_key(args, ctx, spec)
                    .map_err(InvocationError::key_generation);
            }
        };

        let key_data = select_fields(args, spec.idempotency.key_fields.as_deref());
        let canonical = serde_json::to_string(&canonicalize(&Value::Object(key_data)))
            .map_err(|e| InvocationError::key_generation(e.to_string()))?;

        let mut components: Vec<&str> = vec![spec.id.as_str()];
        if include_user {
            components.push(ctx.user_id.as_deref().unwrap_or_default());
        }
        if include_session {
            components.push(ctx.session_id.as_deref().unwrap_or_default());
        }
        components.push(&canonical);

        let encoded = serde_json::to_string(&components)
            .map_err(|e| InvocationError::key_generation(e.to_string()))?;
        Ok(algorithm.digest_hex(encoded.as_bytes()))
    }
}

/// Subset of `args` named by `fields` (all of `args` when `None`).
/// Fields missing from `args` are skipped.
fn select_fields(args: &ToolArgs, fields: Option<&[String]>) -> ToolArgs {
    match fields {
        Some(fields) if !fields.is_empty() => fields
            .iter()
            .filter_map(|field| args.get(field).map(|v| (field.clone(), v.clone())))
            .collect(),
        _ => args.clone(),
    }
}

/// Copy of `value` with object keys sorted at every nesting level
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), canonicalize(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> ToolArgs {
        match value {
            Value::Object(map) => map,
            _ => panic!("args must be an object"),
        }
    }

    fn spec() -> ToolSpec {
        ToolSpec::new("payments", "function")
    }

    fn ctx(user: &str, session: &str) -> CallContext {
        CallContext::new().with_user(user).with_session(session)
    }

    #[derive(Debug)]
    struct FailingGenerator;

    impl KeyGenerator for FailingGenerator {
        fn generate_key(&self, _: &ToolArgs, _: &CallContext, _: &ToolSpec) -> Result<String, String> {
            Err("missing order id".to_string())
        }
    }

    #[derive(Debug)]
    struct OrderIdGenerator;

    impl KeyGenerator for OrderIdGenerator {
        fn generate_key(&self, args: &ToolArgs, _: &CallContext, _: &ToolSpec) -> Result<String, String> {
            args.get("order_id")
                .and_then(Value::as_str)
                .map(|id| format!("order-{}", id))
                .ok_or_else(|| "missing order id".to_string())
        }
    }

    #[test]
    fn test_default_key_is_deterministic_and_order_insensitive() {
        let strategy = IdempotencyKeyStrategy::Default;
        let a = args(json!({"b": 1, "a": {"y": 2, "x": [1, {"k": 1, "j": 2}]}}));
        let b = args(json!({"a": {"x": [1, {"j": 2, "k": 1}], "y": 2}, "b": 1}));

        let k1 = strategy.generate_key(&a, &ctx("u", "s"), &spec()).unwrap();
        let k2 = strategy.generate_key(&b, &ctx("u", "s"), &spec()).unwrap();

        assert_eq!(k1, k2);
        assert_eq!(k1.len(), 64);
    }

    #[test]
    fn test_default_key_matches_reference_digest() {
        let key = IdempotencyKeyStrategy::Default
            .generate_key(&args(json!({"b": 2, "a": 1})), &ctx("u1", "s1"), &spec())
            .unwrap();
        let expected =
            HashAlgorithm::Sha256.digest_hex(br#"["payments","u1","s1","{\"a\":1,\"b\":2}"]"#);
        assert_eq!(key, expected);
    }

    #[test]
    fn test_ids_containing_separators_do_not_collide() {
        let strategy = IdempotencyKeyStrategy::Default;
        let a = args(json!({"amount": 10}));

        let joined_user = CallContext::new().with_user("a|b");
        let split_ids = ctx("a", "b|");

        assert_ne!(
            strategy.generate_key(&a, &joined_user, &spec()).unwrap(),
            strategy.generate_key(&a, &split_ids, &spec()).unwrap()
        );
    }

    #[test]
    fn test_default_key_varies_by_user_and_session() {
        let strategy = IdempotencyKeyStrategy::Default;
        let a = args(json!({"amount": 10}));

        let base = strategy.generate_key(&a, &ctx("u1", "s1"), &spec()).unwrap();
        assert_ne!(base, strategy.generate_key(&a, &ctx("u2", "s1"), &spec()).unwrap());
        assert_ne!(base, strategy.generate_key(&a, &ctx("u1", "s2"), &spec()).unwrap());
    }

    #[test]
    fn test_field_based_key_ignores_other_fields_and_users() {
        let spec = spec().with_idempotency(IdempotencyConfig::default().with_key_fields(["order_id"]));
        let strategy = IdempotencyKeyStrategy::FieldBased;

        let k1 = strategy
            .generate_key(&args(json!({"order_id": "o-1", "note": "a"})), &ctx("u1", "s1"), &spec)
            .unwrap();
        let k2 = strategy
            .generate_key(&args(json!({"order_id": "o-1", "note": "b"})), &ctx("u2", "s2"), &spec)
            .unwrap();
        let k3 = strategy
            .generate_key(&args(json!({"order_id": "o-2", "note": "a"})), &ctx("u1", "s1"), &spec)
            .unwrap();

        assert_eq!(k1, k2);
        assert_ne!(k1, k3);
    }

    #[test]
    fn test_field_based_without_key_fields_uses_all_args() {
        let strategy = IdempotencyKeyStrategy::FieldBased;
        let k1 = strategy
            .generate_key(&args(json!({"a": 1, "b": 1})), &ctx("u", "s"), &spec())
            .unwrap();
        let k2 = strategy
            .generate_key(&args(json!({"a": 1, "b": 2})), &ctx("u", "s"), &spec())
            .unwrap();
        assert_ne!(k1, k2);
    }

    #[test]
    fn test_hash_based_algorithms_and_toggles() {
        let a = args(json!({"q": "rust"}));
        let sha512 = IdempotencyKeyStrategy::hash_based(HashAlgorithm::Sha512);
        assert_eq!(sha512.generate_key(&a, &ctx("u", "s"), &spec()).unwrap().len(), 128);

        let sha384 = IdempotencyKeyStrategy::hash_based(HashAlgorithm::Sha384);
        assert_eq!(sha384.generate_key(&a, &ctx("u", "s"), &spec()).unwrap().len(), 96);

        let user_only = IdempotencyKeyStrategy::HashBased {
            algorithm: HashAlgorithm::Sha256,
            include_user: true,
            include_session: false,
        };
        assert_eq!(
            user_only.generate_key(&a, &ctx("u", "s1"), &spec()).unwrap(),
            user_only.generate_key(&a, &ctx("u", "s2"), &spec()).unwrap()
        );
        assert_ne!(
            user_only.generate_key(&a, &ctx("u1", "s"), &spec()).unwrap(),
            user_only.generate_key(&a, &ctx("u2", "s"), &spec()).unwrap()
        );
    }

    #[test]
    fn test_custom_generator() {
        let strategy = IdempotencyKeyStrategy::custom(OrderIdGenerator);
        let key = strategy
            .generate_key(&args(json!({"order_id": "42"})), &CallContext::new(), &spec())
            .unwrap();
        assert_eq!(key, "order-42");
    }

    #[test]
    fn test_custom_generator_failure_maps_to_key_generation_error() {
        let strategy = IdempotencyKeyStrategy::custom(FailingGenerator);
        let err = strategy
            .generate_key(&ToolArgs::new(), &CallContext::new(), &spec())
            .unwrap_err();

        assert_eq!(err.kind, crate::ErrorKind::IdempotencyKeyGenerationFailed);
        assert!(!err.is_retryable());
        assert!(!err.counts_as_breaker_failure());
    }

    #[test]
    fn test_hash_algorithm_from_str() {
        assert_eq!("SHA-512".parse::<HashAlgorithm>(), Ok(HashAlgorithm::Sha512));
        assert!("md5".parse::<HashAlgorithm>().is_err());
    }

    #[test]
    fn test_cache_key_prefix() {
        assert_eq!(cache_key("abc"), "idempotency:abc");
    }
}
