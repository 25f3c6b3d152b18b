// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Mock Implementations
//!
//! A document store that forwards to [`MemoryDocumentStore`] and can be told
//! to reject writes, so rollback paths can be exercised while reads and
//! subscriptions keep working. An optional latency makes reads and writes
//! yield, like a remote store, so concurrent callers interleave.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use warden_core::memory::MemoryDocumentStore;
use warden_core::{
    DocPath, Document, DocumentStore, DocumentSubscription, SetOptions, StoreError, StoreResult,
    WriteOp,
};

// =============================================================================
// Flaky Document Store
// =============================================================================

/// A document store with write fault injection.
#[derive(Debug, Clone, Default)]
pub struct FlakyDocumentStore {
    inner: MemoryDocumentStore,
    fail_next_writes: Arc<AtomicU32>,
    fail_all_writes: Arc<AtomicBool>,
    rejected: Arc<AtomicU64>,
    history: Arc<Mutex<Vec<DocPath>>>,
    latency: Arc<Mutex<Duration>>,
}

impl FlakyDocumentStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the wrapped store.
    pub fn memory(&self) -> &MemoryDocumentStore {
        &self.inner
    }

    /// Rejects the next `count` writes.
    pub fn fail_next_writes(&self, count: u32) {
        self.fail_next_writes.store(count, Ordering::SeqCst);
    }

    /// Rejects every write until switched off.
    pub fn fail_all_writes(&self, fail: bool) {
        self.fail_all_writes.store(fail, Ordering::SeqCst);
    }

    /// Delays every read and write by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    /// Number of writes rejected so far.
    pub fn rejected_count(&self) -> u64 {
        self.rejected.load(Ordering::SeqCst)
    }

    /// Paths of accepted writes, in order. A batch records each operation.
    pub fn write_history(&self) -> Vec<DocPath> {
        self.history.lock().clone()
    }

    /// Clears the write history.
    pub fn clear_history(&self) {
        self.history.lock().clear();
    }

    /// Returns a document body without going through the async API.
    pub fn peek(&self, path: &DocPath) -> Option<Value> {
        self.inner.peek(path)
    }

    async fn delay(&self) {
        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }

    fn check_write(&self) -> StoreResult<()> {
        let scheduled = self
            .fail_next_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if scheduled || self.fail_all_writes.load(Ordering::SeqCst) {
            self.rejected.fetch_add(1, Ordering::SeqCst);
            return Err(StoreError::unavailable("injected write failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FlakyDocumentStore {
    async fn get(&self, path: &DocPath) -> StoreResult<Option<Document>> {
        self.delay().await;
        self.inner.get(path).await
    }

    async fn set(&self, path: &DocPath, data: Value, options: SetOptions) -> StoreResult<()> {
        self.delay().await;
        self.check_write()?;
        self.inner.set(path, data, options).await?;
        self.history.lock().push(path.clone());
        Ok(())
    }

    async fn delete(&self, path: &DocPath) -> StoreResult<()> {
        self.delay().await;
        self.check_write()?;
        self.inner.delete(path).await?;
        self.history.lock().push(path.clone());
        Ok(())
    }

    async fn list_collection(&self, collection: &str) -> StoreResult<Vec<Document>> {
        self.inner.list_collection(collection).await
    }

    async fn batch_write(&self, ops: Vec<WriteOp>) -> StoreResult<()> {
        self.check_write()?;
        let paths: Vec<DocPath> = ops.iter().map(|op| op.path().clone()).collect();
        self.inner.batch_write(ops).await?;
        self.history.lock().extend(paths);
        Ok(())
    }

    async fn subscribe(&self, path: &DocPath) -> StoreResult<DocumentSubscription> {
        self.inner.subscribe(path).await
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_fail_next_writes_counts_down() {
        let store = FlakyDocumentStore::new();
        let path = DocPath::new("things", "a");
        store.fail_next_writes(2);

        for _ in 0..2 {
            let err = store
                .set(&path, json!({ "n": 1 }), SetOptions::replace())
                .await
                .unwrap_err();
            assert!(err.is_retryable());
        }
        store
            .set(&path, json!({ "n": 1 }), SetOptions::replace())
            .await
            .unwrap();

        assert_eq!(store.rejected_count(), 2);
        assert_eq!(store.write_history(), vec![path.clone()]);
        assert_eq!(store.peek(&path), Some(json!({ "n": 1 })));
    }

    #[tokio::test]
    async fn test_reads_survive_write_failures() {
        let store = FlakyDocumentStore::new();
        let path = DocPath::new("things", "b");
        store
            .set(&path, json!({ "v": true }), SetOptions::replace())
            .await
            .unwrap();

        store.fail_all_writes(true);
        assert!(store.delete(&path).await.is_err());
        assert!(store.get(&path).await.unwrap().is_some());
        store.fail_all_writes(false);
        store.delete(&path).await.unwrap();
        assert!(store.get(&path).await.unwrap().is_none());
    }
}
