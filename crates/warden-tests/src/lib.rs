// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Warden Integration Tests
//!
//! Integration tests for the warden access console, plus the shared
//! utilities they are built on.
//!
//! ## Module Structure
//!
//! - [`common`]: Shared test utilities
//!   - `fixtures`: Pre-built identities, roles and configuration documents
//!   - `builders`: Builders for profiles and role definitions
//!   - `assertions`: Assertions on gate decisions and error kinds
//!   - `mocks`: A document store with write fault injection
//!   - `harness`: Every component wired over in-memory backends
//!
//! ## Running Tests
//!
//! ```bash
//! # Run all integration tests
//! cargo test -p warden-tests
//!
//! # Run one suite
//! cargo test -p warden-tests --test integration_rbac
//! cargo test -p warden-tests --test integration_session
//! cargo test -p warden-tests --test integration_gate
//! cargo test -p warden-tests --test integration_settings
//! cargo test -p warden-tests --test integration_config
//! ```
//!
//! ## Test Categories
//!
//! ### RBAC (`integration_rbac.rs`)
//! - Bootstrap on first load, persisted versus in-memory
//! - Role mutations and their authorization
//! - System role protection
//!
//! ### Session (`integration_session.rs`)
//! - Sign-up, sign-in and sign-out through the live access context
//! - Identity switches and stale snapshots
//! - Forced sign-out of disabled accounts
//!
//! ### Gate (`integration_gate.rs`)
//! - Route decisions as the context changes
//! - Menu visibility per role
//!
//! ### Settings (`integration_settings.rs`)
//! - Load with defaults, optimistic saves and rollback
//! - Preview, commit and debounced commit
//!
//! ### Config (`integration_config.rs`)
//! - Loading files in every supported format
//! - Environment overrides and validation
//!
//! ## Using the Harness
//!
//! ```rust,ignore
//! use warden_tests::common::harness::TestHarness;
//!
//! #[tokio::test]
//! async fn test_something() {
//!     TestHarness::with_name("something")
//!         .run(|h| async move {
//!             let identity = h.sign_up("ada@example.com").await;
//!             let ctx = h.settle(|c| c.profile().is_some()).await;
//!             assert!(ctx.has_permission("read"));
//!         })
//!         .await;
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod common;

/// Re-export commonly used items for convenience.
pub mod prelude {
    pub use crate::common::assertions::*;
    pub use crate::common::builders::*;
    pub use crate::common::fixtures::*;
    pub use crate::common::harness::*;
    pub use crate::common::mocks::*;
}
