// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Console runtime wiring.
//!
//! Builds every component from a [`WardenConfig`] on top of the in-memory
//! backends, in dependency order:
//!
//! ```text
//! documents ─┬─ ProfileRepository ─┬─ SessionStore ─── ProfileSubscriber ─┐
//!            │                     ├─ SettingsSynchronizer                │
//!            │                     └─ UserDirectory                       │
//!            └─ RoleRegistry ──────────────────────────── AccessCoordinator
//! ```

use std::sync::Arc;

use tracing::{debug, info};

use warden_auth::{
    default_menu, AccessCoordinator, MenuItem, PasswordPolicy, ProfileSubscriber, RoleDefinition,
    RoleRegistry, RouteTable, SessionStore, UserDirectory,
};
use warden_config::{RoleSeed, SettingsConfig, StorageConfig, WardenConfig};
use warden_core::memory::{MemoryAuthProvider, MemoryBlobStore, MemoryDocumentStore};
use warden_core::{InMemoryAuditLogger, NoticeCenter, ProfileRepository, StorageLayout};
use warden_settings::{PreferenceSet, SettingsSynchronizer};

use crate::error::{BinError, BinResult};

// =============================================================================
// Config Conversion
// =============================================================================

/// Converts the storage section into a layout.
pub fn storage_layout(storage: &StorageConfig) -> StorageLayout {
    StorageLayout {
        users_collection: storage.users_collection.clone(),
        roles_collection: storage.roles_collection.clone(),
        settings_collection: storage.settings_collection.clone(),
        preferences_key: storage.preferences_key.clone(),
        avatars_prefix: storage.avatars_prefix.clone(),
    }
}

/// Converts configured role seeds into validated role definitions.
pub fn role_definitions(seeds: &[RoleSeed]) -> BinResult<Vec<RoleDefinition>> {
    seeds
        .iter()
        .map(|seed| {
            let mut role = RoleDefinition::new(seed.id.as_str(), seed.name.as_str())
                .with_description(seed.description.as_str())
                .with_permissions(seed.permissions.iter().map(String::as_str));
            if seed.system {
                role = role.system();
            }
            if let Some(ref color) = seed.color {
                role = role.with_color(color.as_str());
            }
            role.validate()
                .map_err(|e| BinError::config(format!("role '{}': {}", seed.id, e)))?;
            Ok(role)
        })
        .collect()
}

/// Converts the settings section into default preferences.
pub fn preference_defaults(settings: &SettingsConfig) -> BinResult<PreferenceSet> {
    Ok(PreferenceSet {
        mode: settings.mode.parse()?,
        color_scheme: settings.color_scheme.parse()?,
        font_scale: settings.font_size.parse()?,
        sidebar_open: settings.sidebar_open,
    })
}

// =============================================================================
// ConsoleRuntime
// =============================================================================

/// Every access component, wired over in-memory backends.
#[derive(Debug, Clone)]
pub struct ConsoleRuntime {
    /// Loaded configuration.
    pub config: Arc<WardenConfig>,
    /// Document store shared by every component.
    pub documents: Arc<MemoryDocumentStore>,
    /// Identity provider.
    pub auth: Arc<MemoryAuthProvider>,
    /// Blob store for avatars.
    pub blobs: Arc<MemoryBlobStore>,
    /// Audit sink.
    pub audit: Arc<InMemoryAuditLogger>,
    /// User-facing notices.
    pub notices: NoticeCenter,
    /// Session store.
    pub session: SessionStore,
    /// Role registry.
    pub registry: Arc<RoleRegistry>,
    /// Live access context.
    pub coordinator: AccessCoordinator,
    /// Administrative user operations.
    pub directory: UserDirectory,
    /// Preference synchronization.
    pub settings: SettingsSynchronizer,
    /// Route gates.
    pub routes: RouteTable,
    /// Navigation menu.
    pub menu: Vec<MenuItem>,
}

impl ConsoleRuntime {
    /// Starts following the session.
    pub fn start(&self) {
        self.coordinator.start();
    }

    /// Stops the coordinator and tears subscriptions down.
    pub async fn shutdown(&self) {
        self.coordinator.stop().await;
        info!("Console runtime stopped");
    }

    /// Returns the profile repository.
    pub fn profiles(&self) -> &ProfileRepository {
        self.session.profiles()
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for [`ConsoleRuntime`].
#[derive(Debug, Default)]
pub struct RuntimeBuilder {
    config: Option<WardenConfig>,
    documents: Option<Arc<MemoryDocumentStore>>,
}

impl RuntimeBuilder {
    /// Creates a builder using the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration.
    pub fn config(mut self, config: WardenConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Uses an existing document store instead of a fresh one.
    pub fn documents(mut self, documents: Arc<MemoryDocumentStore>) -> Self {
        self.documents = Some(documents);
        self
    }

    /// Builds the runtime and loads the role registry.
    pub async fn build(self) -> BinResult<ConsoleRuntime> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let layout = storage_layout(&config.storage);
        let defaults = preference_defaults(&config.settings)?;

        let documents = self
            .documents
            .unwrap_or_else(|| Arc::new(MemoryDocumentStore::new()));
        let auth = Arc::new(MemoryAuthProvider::new());
        let blobs = Arc::new(MemoryBlobStore::new());
        let audit = Arc::new(InMemoryAuditLogger::new());
        let notices = NoticeCenter::default();

        let profiles = ProfileRepository::new(documents.clone(), layout.clone())
            .with_default_role(config.auth.default_role.as_str());

        let settings = SettingsSynchronizer::with_options(
            profiles.clone(),
            defaults,
            config.settings.commit_debounce,
        );
        let session = SessionStore::new(auth.clone(), profiles.clone(), blobs.clone())
            .with_audit(audit.clone())
            .with_policy(PasswordPolicy::new(config.auth.min_password_length))
            .with_listener(Arc::new(settings.clone()));

        let mut registry = RoleRegistry::builder(documents.clone())
            .layout(layout)
            .audit(audit.clone())
            .persist_bootstrap(config.roles.persist_bootstrap)
            .super_admin(config.auth.super_admin_role.as_str());
        if let Some(ref seeds) = config.roles.bootstrap {
            registry = registry.bootstrap(role_definitions(seeds)?);
        }
        let registry = Arc::new(registry.build());
        registry
            .load()
            .await
            .map_err(|e| BinError::from(e).with_context("Failed to load role registry"))?;

        let subscriber = ProfileSubscriber::new(session.clone(), notices.clone());
        let coordinator = AccessCoordinator::new(
            session.clone(),
            subscriber,
            registry.clone(),
            notices.clone(),
        );
        let directory =
            UserDirectory::new(profiles.clone(), registry.clone()).with_audit(audit.clone());
        let routes = RouteTable::dashboard(&config.app.sign_in_path, &config.app.home_path);

        debug!(
            roles = registry.len(),
            source = ?registry.source(),
            super_admin = %registry.super_admin_tag(),
            "Console runtime assembled"
        );

        Ok(ConsoleRuntime {
            config: Arc::new(config),
            documents,
            auth,
            blobs,
            audit,
            notices,
            session,
            registry,
            coordinator,
            directory,
            settings,
            routes,
            menu: default_menu(),
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
