// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # warden-core
//!
//! Core abstractions and shared types for the warden access console.
//!
//! This crate provides the foundational types, traits, and utilities used across
//! all warden components including:
//!
//! - **Types**: `UserId`, `RoleId`, `Identity`, `Profile`, `AccountStatus`
//! - **Error**: Unified error hierarchy with a category per failure class
//! - **Store**: Contracts for the hosted collaborators (auth, documents, blobs)
//! - **Bus**: Typed broadcast bus for internal events
//! - **Repository**: Profile persistence on top of the document store
//! - **Audit**: Audit trail for administrative and session actions
//! - **Notice**: Dismissible user-facing notices
//! - **Memory**: In-memory collaborator backends for development and tests
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use warden_core::memory::MemoryDocumentStore;
//! use warden_core::repository::{ProfileRepository, StorageLayout};
//!
//! let store = Arc::new(MemoryDocumentStore::new());
//! let profiles = ProfileRepository::new(store, StorageLayout::default());
//! let profile = profiles.ensure(&identity).await?;
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Core Modules
// =============================================================================

pub mod error;
pub mod types;

// =============================================================================
// Collaborator Modules
// =============================================================================

pub mod store;
pub mod memory;
pub mod repository;

// =============================================================================
// Event & Audit Modules
// =============================================================================

pub mod bus;
pub mod audit;
pub mod notice;

// =============================================================================
// Re-exports for convenience
// =============================================================================

pub use error::*;
pub use types::*;

pub use store::{
    AuthProvider, BlobRef, BlobStore, Credentials, DocPath, Document, DocumentStore,
    DocumentSubscription, SessionListener, SetOptions, SnapshotEvent, SubscriptionId, WriteOp,
};

pub use bus::{BusStats, EventBus, EventSubscriber};

pub use repository::{ProfileRepository, StorageLayout};

pub use audit::{
    AuditAction, AuditLog, AuditLogger, AuditOutcome, InMemoryAuditLogger, NoOpAuditLogger,
    TracingAuditLogger,
};

pub use notice::{Notice, NoticeCenter, NoticeSeverity};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
