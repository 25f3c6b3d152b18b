// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! In-memory collaborator backends.
//!
//! These implement the [`crate::store`] contracts without a network. They are
//! used by tests, by the `simulate` command and during local development.
//!
//! # Features
//!
//! - **Live snapshots**: subscriptions receive the current state, then every change
//! - **Merge writes**: nested objects merge field by field
//! - **Fault injection**: stores can be switched offline to simulate transport loss
//! - **No Persistence**: data is lost when the backend is dropped

mod auth;
mod blobs;
mod documents;

pub use auth::{
    MemoryAuthProvider, SentEmail, MAX_FAILED_ATTEMPTS, MIN_PASSWORD_LENGTH,
    RECENT_LOGIN_WINDOW_SECS,
};
pub use blobs::MemoryBlobStore;
pub use documents::{merge_value, MemoryDocumentStore};
