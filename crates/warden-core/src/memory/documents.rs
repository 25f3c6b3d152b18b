// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! In-memory document store.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::store::{
    DocPath, Document, DocumentStore, DocumentSubscription, SetOptions, SnapshotEvent,
    SubscriptionId, WriteOp,
};

// =============================================================================
// Merge
// =============================================================================

/// Merges `patch` into `target`.
///
/// Objects merge key by key, recursively. Any other value replaces the target.
pub fn merge_value(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(&key) {
                    Some(existing) => merge_value(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, patch) => *target = patch,
    }
}

// =============================================================================
// State
// =============================================================================

#[derive(Debug)]
struct Watcher {
    id: SubscriptionId,
    sender: mpsc::UnboundedSender<SnapshotEvent>,
}

#[derive(Debug, Default)]
struct StoreState {
    collections: HashMap<String, BTreeMap<String, Value>>,
    watchers: HashMap<DocPath, Vec<Watcher>>,
}

impl StoreState {
    fn read(&self, path: &DocPath) -> Option<Document> {
        self.collections
            .get(&path.collection)
            .and_then(|docs| docs.get(&path.key))
            .map(|data| Document::new(&path.key, data.clone()))
    }

    fn apply(&mut self, op: WriteOp) -> DocPath {
        match op {
            WriteOp::Set {
                path,
                data,
                options,
            } => {
                let docs = self.collections.entry(path.collection.clone()).or_default();
                match docs.get_mut(&path.key) {
                    Some(existing) if options.merge => merge_value(existing, data),
                    _ => {
                        docs.insert(path.key.clone(), data);
                    }
                }
                path
            }
            WriteOp::Delete { path } => {
                if let Some(docs) = self.collections.get_mut(&path.collection) {
                    docs.remove(&path.key);
                }
                path
            }
        }
    }

    fn notify(&mut self, path: &DocPath) {
        let snapshot = self.read(path);
        if let Some(watchers) = self.watchers.get_mut(path) {
            watchers.retain(|w| {
                w.sender
                    .send(SnapshotEvent::Snapshot(snapshot.clone()))
                    .is_ok()
            });
        }
    }
}

// =============================================================================
// Memory Document Store
// =============================================================================

/// An in-memory [`DocumentStore`].
///
/// # Thread Safety
///
/// State is protected by a `parking_lot::RwLock`; counters are atomic.
/// Subscribers are notified while the write lock is held, so every
/// subscriber observes writes in commit order.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
    state: Arc<RwLock<StoreState>>,
    offline: Arc<AtomicBool>,
    reads: Arc<AtomicU64>,
    writes: Arc<AtomicU64>,
}

impl MemoryDocumentStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Switches the store offline; every call fails with `Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Returns `true` if the store is offline.
    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    /// Number of read calls served.
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Number of committed write calls (a batch counts once).
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Number of live subscriptions on a document.
    pub fn subscriber_count(&self, path: &DocPath) -> usize {
        self.state
            .read()
            .watchers
            .get(path)
            .map(|w| w.iter().filter(|w| !w.sender.is_closed()).count())
            .unwrap_or(0)
    }

    /// Delivers an error event to every subscriber of a document.
    pub fn fail_subscribers(&self, path: &DocPath, error: StoreError) {
        if let Some(watchers) = self.state.write().watchers.get_mut(path) {
            watchers.retain(|w| w.sender.send(SnapshotEvent::Error(error.clone())).is_ok());
        }
    }

    /// Returns a document body without going through the async API.
    pub fn peek(&self, path: &DocPath) -> Option<Value> {
        self.state.read().read(path).map(|d| d.data)
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.is_offline() {
            Err(StoreError::unavailable("document store is offline"))
        } else {
            Ok(())
        }
    }

    fn commit(&self, ops: Vec<WriteOp>) {
        let mut state = self.state.write();
        let mut touched = Vec::with_capacity(ops.len());
        for op in ops {
            let path = state.apply(op);
            if !touched.contains(&path) {
                touched.push(path);
            }
        }
        for path in &touched {
            state.notify(path);
        }
        self.writes.fetch_add(1, Ordering::Relaxed);
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, path: &DocPath) -> StoreResult<Option<Document>> {
        self.check_online()?;
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(self.state.read().read(path))
    }

    async fn set(&self, path: &DocPath, data: Value, options: SetOptions) -> StoreResult<()> {
        self.check_online()?;
        if !data.is_object() {
            return Err(StoreError::rejected(format!(
                "document body for '{}' must be an object",
                path
            )));
        }
        self.commit(vec![WriteOp::Set {
            path: path.clone(),
            data,
            options,
        }]);
        Ok(())
    }

    async fn delete(&self, path: &DocPath) -> StoreResult<()> {
        self.check_online()?;
        self.commit(vec![WriteOp::delete(path.clone())]);
        Ok(())
    }

    async fn list_collection(&self, collection: &str) -> StoreResult<Vec<Document>> {
        self.check_online()?;
        self.reads.fetch_add(1, Ordering::Relaxed);
        let state = self.state.read();
        Ok(state
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(key, data)| Document::new(key, data.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn batch_write(&self, ops: Vec<WriteOp>) -> StoreResult<()> {
        self.check_online()?;
        for op in &ops {
            if let WriteOp::Set { path, data, .. } = op {
                if !data.is_object() {
                    return Err(StoreError::rejected(format!(
                        "document body for '{}' must be an object",
                        path
                    )));
                }
            }
        }
        debug!(ops = ops.len(), "Committing batch");
        self.commit(ops);
        Ok(())
    }

    async fn subscribe(&self, path: &DocPath) -> StoreResult<DocumentSubscription> {
        self.check_online()?;
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = Uuid::now_v7();

        {
            let mut state = self.state.write();
            let _ = sender.send(SnapshotEvent::Snapshot(state.read(path)));
            state
                .watchers
                .entry(path.clone())
                .or_default()
                .push(Watcher { id, sender });
        }

        let state = self.state.clone();
        let watched = path.clone();
        Ok(DocumentSubscription::new(id, path.clone(), receiver, move || {
            let mut state = state.write();
            if let Some(watchers) = state.watchers.get_mut(&watched) {
                watchers.retain(|w| w.id != id);
                if watchers.is_empty() {
                    state.watchers.remove(&watched);
                }
            }
        }))
    }
}

// =============================================================================
// Tests
// =============================================================================
