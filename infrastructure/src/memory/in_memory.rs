//! Process-local memory with per-entry TTLs and per-key async locks.
//!
//! Entries live in a bounded `moka` cache that expires each one after the TTL
//! given to [`Memory::set`]. Lock slots exist only while someone holds or
//! waits on them.

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::OwnedMutexGuard;
use toolgate_application::ports::memory::{LockGuard, Memory, MemoryError};
use tracing::trace;

/// Default entry bound
pub const DEFAULT_MAX_ENTRIES: u64 = 10_000;

/// TTLs at or above this are stored without expiry
pub const MAX_ENTRY_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

#[derive(Clone)]
struct Stored {
    value: Value,
    ttl: Option<Duration>,
}

/// Expires each entry after the TTL it was stored with
struct PerEntryTtl;

impl Expiry<String, Stored> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, value: &Stored, _created_at: Instant) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Stored,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl
    }
}

type Slot = Arc<tokio::sync::Mutex<()>>;
type Slots = Arc<Mutex<HashMap<String, Slot>>>;

/// Remove `key`'s slot when the map and `slot` are its only owners
fn release_slot(slots: &Slots, key: &str, slot: &Slot) {
    let mut slots = slots.lock().unwrap_or_else(PoisonError::into_inner);
    let idle = slots.get(key).is_some_and(|held| Arc::ptr_eq(held, slot)) && Arc::strong_count(slot) == 2;
    if idle {
        slots.remove(key);
    }
}

/// Held key lock; released on drop
struct KeyLock {
    guard: Option<OwnedMutexGuard<()>>,
    key: String,
    slot: Slot,
    slots: Slots,
}

impl LockGuard for KeyLock {}

impl Drop for KeyLock {
    fn drop(&mut self) {
        self.guard.take();
        release_slot(&self.slots, &self.key, &self.slot);
    }
}

pub struct InMemoryMemory {
    entries: Cache<String, Stored>,
    locks: Slots,
}

impl Default for InMemoryMemory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_ENTRIES)
    }
}

impl InMemoryMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Memory holding at most `max_entries` values; the least used go first
    pub fn with_capacity(max_entries: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_entries.max(1))
            .expire_after(PerEntryTtl)
            .build();
        Self {
            entries,
            locks: Arc::default(),
        }
    }

    /// Live entry count after pending evictions have run
    pub async fn len(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Keys with a lock held or awaited
    pub fn lock_slots(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn lock_slot(&self, key: &str) -> Slot {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(key.to_string()).or_default())
    }
}

#[async_trait]
impl Memory for InMemoryMemory {
    async fn get(&self, key: &str) -> Result<Option<Value>, MemoryError> {
        Ok(self.entries.get(key).await.map(|stored| stored.value))
    }

    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<(), MemoryError> {
        let ttl = ttl.filter(|ttl| *ttl < MAX_ENTRY_TTL);
        trace!(key, ttl_ms = ttl.map(|t| t.as_millis() as u64), "Memory set");
        self.entries.insert(key.to_string(), Stored { value, ttl }).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), MemoryError> {
        self.entries.invalidate(key).await;
        Ok(())
    }

    async fn lock(&self, key: &str, ttl: Duration) -> Result<Box<dyn LockGuard>, MemoryError> {
        let slot = self.lock_slot(key);
        trace!(key, "Waiting for key lock");
        match tokio::time::timeout(ttl, Arc::clone(&slot).lock_owned()).await {
            Ok(guard) => Ok(Box::new(KeyLock {
                guard: Some(guard),
                key: key.to_string(),
                slot,
                slots: Arc::clone(&self.locks),
            })),
            Err(_) => {
                release_slot(&self.locks, key, &slot);
                Err(MemoryError::LockTimeout(key.to_string()))
            }
        }
    }
}

impl std::fmt::Debug for InMemoryMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryMemory")
            .field("entries", &self.entries.entry_count())
            .field("lock_slots", &self.lock_slots())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_get_delete() {
        let memory = InMemoryMemory::new();
        memory.set("k", json!({"v": 1}), None).await.unwrap();

        assert_eq!(memory.get("k").await.unwrap(), Some(json!({"v": 1})));
        assert_eq!(memory.len().await, 1);

        memory.delete("k").await.unwrap();
        assert_eq!(memory.get("k").await.unwrap(), None);
        assert!(memory.is_empty().await);
    }

    // The cache expires on the system clock, so this one sleeps for real
    #[tokio::test]
    async fn test_entries_expire() {
        let memory = InMemoryMemory::new();
        memory
            .set("short", json!(1), Some(Duration::from_millis(50)))
            .await
            .unwrap();
        memory.set("forever", json!(2), None).await.unwrap();
        assert_eq!(memory.get("short").await.unwrap(), Some(json!(1)));

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(memory.get("short").await.unwrap(), None);
        assert_eq!(memory.get("forever").await.unwrap(), Some(json!(2)));
        assert_eq!(memory.len().await, 1);
    }

    #[tokio::test]
    async fn test_overwrite_takes_new_ttl() {
        let memory = InMemoryMemory::new();
        memory
            .set("k", json!("old"), Some(Duration::from_millis(50)))
            .await
            .unwrap();
        memory.set("k", json!("new"), None).await.unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(memory.get("k").await.unwrap(), Some(json!("new")));
    }

    #[tokio::test]
    async fn test_huge_ttl_is_kept_without_expiry() {
        let memory = InMemoryMemory::new();
        memory
            .set("k", json!(1), Some(Duration::from_secs(i64::MAX as u64)))
            .await
            .unwrap();
        memory.set("max", json!(2), Some(Duration::MAX)).await.unwrap();

        assert_eq!(memory.get("k").await.unwrap(), Some(json!(1)));
        assert_eq!(memory.get("max").await.unwrap(), Some(json!(2)));
    }

    #[tokio::test]
    async fn test_capacity_is_bounded() {
        let memory = InMemoryMemory::with_capacity(2);
        for i in 0..10 {
            memory.set(&format!("k{i}"), json!(i), None).await.unwrap();
        }

        assert!(memory.len().await <= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lock_is_exclusive_per_key() {
        let memory = InMemoryMemory::new();
        let held = memory.lock("a", Duration::from_secs(1)).await.unwrap();

        // Same key waits out its TTL
        let err = memory.lock("a", Duration::from_millis(100)).await.err().unwrap();
        assert!(matches!(err, MemoryError::LockTimeout(ref key) if key == "a"));

        // Other keys are independent
        assert!(memory.lock("b", Duration::from_millis(100)).await.is_ok());

        drop(held);
        assert!(memory.lock("a", Duration::from_millis(100)).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiter_gets_lock_after_release() {
        let memory = Arc::new(InMemoryMemory::new());
        let held = memory.lock("a", Duration::from_secs(1)).await.unwrap();

        let waiter = {
            let memory = Arc::clone(&memory);
            tokio::spawn(async move { memory.lock("a", Duration::from_secs(5)).await.is_ok() })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(held);

        assert!(waiter.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_released_locks_leave_no_slots() {
        let memory = Arc::new(InMemoryMemory::new());
        for i in 0..5 {
            let guard = memory.lock(&format!("k{i}"), Duration::from_secs(1)).await.unwrap();
            assert_eq!(memory.lock_slots(), 1);
            drop(guard);
        }
        assert_eq!(memory.lock_slots(), 0);

        // A slot survives while someone still waits on it
        let held = memory.lock("a", Duration::from_secs(1)).await.unwrap();
        let waiter = {
            let memory = Arc::clone(&memory);
            tokio::spawn(async move { memory.lock("a", Duration::from_secs(5)).await.map(drop).is_ok() })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(held);
        assert!(waiter.await.unwrap());
        assert_eq!(memory.lock_slots(), 0);

        // Timed out waiters clean up too
        let held = memory.lock("b", Duration::from_secs(1)).await.unwrap();
        assert!(memory.lock("b", Duration::from_millis(10)).await.is_err());
        assert_eq!(memory.lock_slots(), 1);
        drop(held);
        assert_eq!(memory.lock_slots(), 0);
    }
}
