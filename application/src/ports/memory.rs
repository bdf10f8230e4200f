//! Memory port
//!
//! Key/value storage with TTLs plus per-key mutual exclusion. The pipeline
//! stores idempotency records here and serializes concurrent calls that
//! share a key through [`Memory::lock`].

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by memory adapters
#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Timed out waiting for lock '{0}'")]
    LockTimeout(String),
}

/// Held lock on a key; dropping it releases the lock
pub trait LockGuard: Send {}

#[async_trait]
pub trait Memory: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, MemoryError>;

    /// Store `value`; `None` TTL keeps it until deleted
    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<(), MemoryError>;

    async fn delete(&self, key: &str) -> Result<(), MemoryError>;

    /// Wait for exclusive access to `key`.
    ///
    /// `ttl` bounds how long the caller waits for a holder that never
    /// releases.
    async fn lock(&self, key: &str, ttl: Duration) -> Result<Box<dyn LockGuard>, MemoryError>;
}

/// Stores nothing; locks are granted immediately
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMemory;

struct NoLock;

impl LockGuard for NoLock {}

#[async_trait]
impl Memory for NoMemory {
    async fn get(&self, _key: &str) -> Result<Option<Value>, MemoryError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: Value, _ttl: Option<Duration>) -> Result<(), MemoryError> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> Result<(), MemoryError> {
        Ok(())
    }

    async fn lock(&self, _key: &str, _ttl: Duration) -> Result<Box<dyn LockGuard>, MemoryError> {
        Ok(Box::new(NoLock))
    }
}
