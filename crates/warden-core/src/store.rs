// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Contracts for the hosted collaborators.
//!
//! warden never talks to a backend directly. It consumes three services
//! through these traits:
//!
//! - [`AuthProvider`]: sign-in/up/out, identity changes, password reset
//! - [`DocumentStore`]: keyed documents with merge writes and live snapshots
//! - [`BlobStore`]: keyed binary objects
//!
//! The contracts are behavioral; the in-memory implementations in
//! [`crate::memory`] are the reference.
//!
//! [`SessionListener`] is the reverse direction: components holding
//! per-identity state register one to be told when a session ends.

use std::fmt;
use std::fmt::Debug;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use crate::error::{AuthError, StoreError, StoreResult};
use crate::types::{Identity, UserId};

// =============================================================================
// Auth Provider
// =============================================================================

/// Email/password credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Sign-in email.
    pub email: String,
    /// Plaintext password.
    pub password: String,
}

impl Credentials {
    /// Creates a credential pair.
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// The hosted authentication service.
#[async_trait]
pub trait AuthProvider: Send + Sync + Debug {
    /// Signs in with email and password.
    async fn sign_in(&self, credentials: &Credentials) -> Result<Identity, AuthError>;

    /// Creates an account and signs it in.
    async fn sign_up(&self, credentials: &Credentials) -> Result<Identity, AuthError>;

    /// Ends the current session.
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Returns the currently signed-in identity.
    fn current_identity(&self) -> Option<Identity>;

    /// Returns a receiver notified on every identity change.
    fn watch_identity(&self) -> watch::Receiver<Option<Identity>>;

    /// Sends a password reset email.
    async fn send_password_reset(&self, email: &str) -> Result<(), AuthError>;

    /// Re-authenticates the current identity, refreshing its login time.
    async fn reauthenticate(&self, credentials: &Credentials) -> Result<(), AuthError>;

    /// Updates the password of the current identity.
    async fn update_password(&self, new_password: &str) -> Result<(), AuthError>;

    /// Sends a verification email to the current identity.
    async fn send_email_verification(&self) -> Result<(), AuthError>;

    /// Deletes the current identity's account.
    async fn delete_current_user(&self) -> Result<(), AuthError>;
}

// =============================================================================
// Document Store
// =============================================================================

/// Location of a document: a collection path and a key.
///
/// Nested collections are plain paths, e.g. `users/u1/settings`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocPath {
    /// Collection path.
    pub collection: String,
    /// Document key.
    pub key: String,
}

impl DocPath {
    /// Creates a document path.
    pub fn new(collection: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.key)
    }
}

/// A stored document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document key.
    pub key: String,
    /// Document body.
    pub data: Value,
}

impl Document {
    /// Creates a document.
    pub fn new(key: impl Into<String>, data: Value) -> Self {
        Self {
            key: key.into(),
            data,
        }
    }

    /// Decodes the body into a typed value.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> StoreResult<T> {
        serde_json::from_value(self.data.clone()).map_err(StoreError::from)
    }
}

/// Options for [`DocumentStore::set`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Merge into the existing document instead of replacing it.
    pub merge: bool,
}

impl SetOptions {
    /// Replace the whole document.
    pub fn replace() -> Self {
        Self { merge: false }
    }

    /// Merge provided fields, leaving the rest intact.
    pub fn merge() -> Self {
        Self { merge: true }
    }
}

/// One operation of an atomic batch.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Write a document.
    Set {
        /// Target document.
        path: DocPath,
        /// Document body.
        data: Value,
        /// Write options.
        options: SetOptions,
    },
    /// Delete a document.
    Delete {
        /// Target document.
        path: DocPath,
    },
}

impl WriteOp {
    /// Creates a replacing set operation.
    pub fn set(path: DocPath, data: Value) -> Self {
        Self::Set {
            path,
            data,
            options: SetOptions::replace(),
        }
    }

    /// Creates a delete operation.
    pub fn delete(path: DocPath) -> Self {
        Self::Delete { path }
    }

    /// Returns the target document.
    pub fn path(&self) -> &DocPath {
        match self {
            WriteOp::Set { path, .. } | WriteOp::Delete { path } => path,
        }
    }
}

/// Unique identifier for a live subscription.
pub type SubscriptionId = Uuid;

/// An event delivered to a live document subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotEvent {
    /// Current document state; `None` when the document does not exist.
    Snapshot(Option<Document>),
    /// The backend reported an error for this subscription.
    Error(StoreError),
}

/// A cancellable handle to a live document subscription.
///
/// Dropping the handle unsubscribes.
pub struct DocumentSubscription {
    id: SubscriptionId,
    path: DocPath,
    receiver: mpsc::UnboundedReceiver<SnapshotEvent>,
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl DocumentSubscription {
    /// Creates a subscription handle.
    ///
    /// `cancel` runs exactly once, on `unsubscribe` or drop.
    pub fn new(
        id: SubscriptionId,
        path: DocPath,
        receiver: mpsc::UnboundedReceiver<SnapshotEvent>,
        cancel: impl FnOnce() + Send + Sync + 'static,
    ) -> Self {
        Self {
            id,
            path,
            receiver,
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Returns the subscription ID.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns the subscribed document path.
    pub fn path(&self) -> &DocPath {
        &self.path
    }

    /// Waits for the next event. Returns `None` once the store closed the feed.
    pub async fn next(&mut self) -> Option<SnapshotEvent> {
        self.receiver.recv().await
    }

    /// Returns the next event if one is already queued.
    pub fn try_next(&mut self) -> Option<SnapshotEvent> {
        self.receiver.try_recv().ok()
    }

    /// Stops the subscription.
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
        self.receiver.close();
    }
}

impl Drop for DocumentSubscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl Debug for DocumentSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentSubscription")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// The hosted document database.
#[async_trait]
pub trait DocumentStore: Send + Sync + Debug {
    /// Reads a document. Returns `Ok(None)` when it does not exist.
    async fn get(&self, path: &DocPath) -> StoreResult<Option<Document>>;

    /// Writes a document.
    async fn set(&self, path: &DocPath, data: Value, options: SetOptions) -> StoreResult<()>;

    /// Deletes a document. Deleting a missing document is not an error.
    async fn delete(&self, path: &DocPath) -> StoreResult<()>;

    /// Lists every document of a collection.
    async fn list_collection(&self, collection: &str) -> StoreResult<Vec<Document>>;

    /// Applies all operations atomically, or none of them.
    async fn batch_write(&self, ops: Vec<WriteOp>) -> StoreResult<()>;

    /// Opens a live subscription on one document.
    ///
    /// The current state is delivered first, then every change.
    async fn subscribe(&self, path: &DocPath) -> StoreResult<DocumentSubscription>;
}

// =============================================================================
// Blob Store
// =============================================================================

/// Reference to a stored blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobRef(String);

impl BlobRef {
    /// Creates a blob reference from its key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the blob key.
    pub fn key(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The hosted file storage.
#[async_trait]
pub trait BlobStore: Send + Sync + Debug {
    /// Uploads bytes under a key, replacing any existing blob.
    async fn upload(&self, key: &str, bytes: Vec<u8>) -> StoreResult<BlobRef>;

    /// Returns a download URL.
    async fn url(&self, blob: &BlobRef) -> StoreResult<String>;

    /// Lists blobs whose key starts with `prefix`.
    async fn list(&self, prefix: &str) -> StoreResult<Vec<BlobRef>>;

    /// Deletes a blob.
    async fn delete(&self, blob: &BlobRef) -> StoreResult<()>;
}

// =============================================================================
// Session Listener
// =============================================================================

/// Notified before an identity's session ends.
///
/// Called on sign-out, on a forced sign-out and before an account's data is
/// deleted. When the call returns, the listener must hold no state for
/// `user_id` and must have no write for it in flight.
#[async_trait]
pub trait SessionListener: Send + Sync + Debug {
    /// Drops everything held for `user_id`.
    async fn session_ending(&self, user_id: &UserId);
}

// =============================================================================
// Tests
// =============================================================================
