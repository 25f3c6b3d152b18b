// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # warden-auth
//!
//! Who may see what.
//!
//! - **Session**: [`SessionStore`] wraps the auth provider, creates profiles
//!   at sign-up and carries the account security operations
//! - **Subscriber**: [`ProfileSubscriber`] keeps one live profile
//!   subscription and signs disabled accounts out
//! - **Registry**: [`RoleRegistry`] maps role tags to [`RoleDefinition`]s
//! - **Context**: [`AccessContext`] is the resolved identity, role and
//!   permission set
//! - **Gate**: [`Gate`] decides between render, redirect and deny
//! - **Directory**: [`UserDirectory`] for administrative profile changes
//! - **Coordinator**: [`AccessCoordinator`] publishes the live context
//!
//! ## Example
//!
//! ```rust,ignore
//! let registry = Arc::new(RoleRegistry::builder(store.clone()).build());
//! registry.load().await?;
//!
//! let subscriber = ProfileSubscriber::new(session.clone(), notices.clone());
//! let coordinator = AccessCoordinator::new(session, subscriber, registry, notices);
//! coordinator.start();
//!
//! let gate = Gate::new("/management/users").require_permission("manage_users");
//! let mut watcher = coordinator.watch_gate(gate);
//! println!("{}", watcher.decision());
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Permission Model
// =============================================================================

pub mod permission;
pub mod rbac;
pub mod registry;
pub mod context;

// =============================================================================
// Session & Profile
// =============================================================================

pub mod password;
pub mod session;
pub mod subscriber;

// =============================================================================
// Gating
// =============================================================================

pub mod gate;
pub mod navigation;
pub mod directory;
pub mod coordinator;

// =============================================================================
// Re-exports
// =============================================================================

pub use context::AccessContext;
pub use coordinator::AccessCoordinator;
pub use directory::UserDirectory;
pub use gate::{Denial, Gate, GateDecision, GateWatcher, Requirement};
pub use navigation::{default_menu, visible_menu, MenuItem, RouteTable};
pub use password::{strength, PasswordPolicy, PasswordStrength, StrengthLabel};
pub use permission::{PermissionSet, PermissionTag};
pub use rbac::{bootstrap_roles, check_capability, CapabilityGrant, RoleDefinition};
pub use registry::{RegistryEvent, RegistrySource, RoleRegistry, RoleRegistryBuilder, RoleUpdate};
pub use session::SessionStore;
pub use subscriber::{ProfileEvent, ProfileSubscriber, SnapshotOutcome, SubscriptionTicket};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
