// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! In-memory blob store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::store::{BlobRef, BlobStore};

/// An in-memory [`BlobStore`]. URLs use the `memory://` scheme.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
    offline: Arc<AtomicBool>,
}

impl MemoryBlobStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Switches the store offline.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    /// Returns `true` if no blobs are stored.
    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }

    /// Returns the bytes of a blob.
    pub fn bytes(&self, key: &str) -> Option<Vec<u8>> {
        self.blobs.read().get(key).cloned()
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::unavailable("blob store is offline"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, key: &str, bytes: Vec<u8>) -> StoreResult<BlobRef> {
        self.check_online()?;
        self.blobs.write().insert(key.to_string(), bytes);
        Ok(BlobRef::new(key))
    }

    async fn url(&self, blob: &BlobRef) -> StoreResult<String> {
        self.check_online()?;
        if !self.blobs.read().contains_key(blob.key()) {
            return Err(StoreError::not_found(blob.key()));
        }
        Ok(format!("memory://{}", blob.key()))
    }

    async fn list(&self, prefix: &str) -> StoreResult<Vec<BlobRef>> {
        self.check_online()?;
        Ok(self
            .blobs
            .read()
            .keys()
            .filter(|key| key.starts_with(prefix))
            .map(BlobRef::new)
            .collect())
    }

    async fn delete(&self, blob: &BlobRef) -> StoreResult<()> {
        self.check_online()?;
        self.blobs.write().remove(blob.key());
        Ok(())
    }
}
