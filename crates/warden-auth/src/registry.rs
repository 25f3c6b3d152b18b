// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Role registry.
//!
//! The registry maps role tags to [`RoleDefinition`]s. It is loaded once at
//! startup and afterwards read synchronously by every gate.
//!
//! # First Run
//!
//! When the persisted registry is empty the bootstrap set is installed. It
//! is persisted immediately when `persist_bootstrap` is set; otherwise it
//! lives in memory until the first mutation, which writes the whole
//! registry in one batch. From then on the persisted registry is
//! authoritative and the bootstrap set is never applied again, even if
//! roles are later deleted.
//!
//! # Mutations
//!
//! `create_role`, `update_role` and `delete_role` require `manage_roles`,
//! are serialized, persist before updating the in-memory view, are audited
//! and are announced on the registry event bus.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use warden_core::audit::{self, AuditAction, AuditLog, AuditLogger, NoOpAuditLogger};
use warden_core::{
    AccessError, DocumentStore, EventBus, EventSubscriber, RoleError, RoleId, StorageLayout,
    StoreError, WardenResult, WriteOp,
};

use crate::context::AccessContext;
use crate::permission::{PermissionSet, PermissionTag};
use crate::rbac::{bootstrap_roles, RoleDefinition};

// =============================================================================
// Types
// =============================================================================

/// Where the in-memory view came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrySource {
    /// `load` has not completed.
    Unloaded,
    /// The bootstrap set, not yet persisted.
    Bootstrap,
    /// The persisted registry.
    Persisted,
}

/// A change to the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    /// The registry was loaded.
    Loaded {
        /// Number of roles.
        roles: usize,
    },
    /// A role was created.
    Created(RoleId),
    /// A role was updated; `previous` is set when its tag changed.
    Updated {
        /// Current tag.
        role: RoleId,
        /// Tag before a rename.
        previous: Option<RoleId>,
    },
    /// A role was deleted.
    Deleted(RoleId),
}

/// A partial update of a role definition. `None` fields are left as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleUpdate {
    /// New role tag. Rejected for system roles.
    pub id: Option<RoleId>,
    /// New display name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// Replacement permission list.
    pub permissions: Option<Vec<PermissionTag>>,
    /// New colour.
    pub color: Option<String>,
}

impl RoleUpdate {
    /// Creates an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Renames the role tag.
    pub fn rename(mut self, id: impl Into<RoleId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the display name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Replaces the permission list.
    pub fn permissions<I, T>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<PermissionTag>,
    {
        self.permissions = Some(permissions.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the colour.
    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    fn apply(&self, role: &RoleDefinition) -> RoleDefinition {
        let mut updated = role.clone();
        if let Some(id) = &self.id {
            updated.id = id.clone();
        }
        if let Some(name) = &self.name {
            updated.name = name.clone();
        }
        if let Some(description) = &self.description {
            updated.description = description.clone();
        }
        if let Some(permissions) = &self.permissions {
            updated.permissions = Vec::new();
            updated = updated.with_permissions(permissions.iter().cloned());
        }
        if let Some(color) = &self.color {
            updated.color = color.clone();
        }
        updated
    }
}

#[derive(Debug)]
struct RegistryState {
    roles: BTreeMap<RoleId, RoleDefinition>,
    source: RegistrySource,
}

// =============================================================================
// Role Registry
// =============================================================================

/// The role registry.
///
/// # Thread Safety
///
/// Reads take a short `parking_lot` read lock and never await. Mutations
/// are serialized by an async mutex held across the store round-trip.
#[derive(Debug)]
pub struct RoleRegistry {
    store: Arc<dyn DocumentStore>,
    layout: StorageLayout,
    audit: Arc<dyn AuditLogger>,
    bootstrap: Vec<RoleDefinition>,
    persist_bootstrap: bool,
    super_admin: RoleId,
    state: RwLock<RegistryState>,
    write_lock: Mutex<()>,
    events: EventBus<RegistryEvent>,
}

impl RoleRegistry {
    /// Creates a registry builder.
    pub fn builder(store: Arc<dyn DocumentStore>) -> RoleRegistryBuilder {
        RoleRegistryBuilder::new(store)
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Loads the registry, installing the bootstrap set on first run.
    ///
    /// Only the first successful call reads the store; later calls return
    /// immediately.
    pub async fn load(&self) -> WardenResult<()> {
        let _guard = self.write_lock.lock().await;
        if self.source() != RegistrySource::Unloaded {
            return Ok(());
        }

        let documents = self
            .store
            .list_collection(&self.layout.roles_collection)
            .await?;

        let mut roles = BTreeMap::new();
        for document in &documents {
            match document.decode::<RoleDefinition>() {
                Ok(mut role) => {
                    role.id = RoleId::new(&document.key);
                    roles.insert(role.id.clone(), role);
                }
                Err(e) => {
                    warn!(role = %document.key, error = %e, "Skipping malformed role definition");
                }
            }
        }

        let source = if !documents.is_empty() {
            RegistrySource::Persisted
        } else {
            roles = self
                .bootstrap
                .iter()
                .map(|r| (r.id.clone(), r.clone()))
                .collect();

            if self.persist_bootstrap {
                self.store.batch_write(self.full_write(&roles)?).await?;
                info!(roles = roles.len(), "Registry empty, bootstrap roles persisted");
                RegistrySource::Persisted
            } else {
                info!(roles = roles.len(), "Registry empty, using bootstrap roles in memory");
                RegistrySource::Bootstrap
            }
        };

        let count = roles.len();
        {
            let mut state = self.state.write();
            state.roles = roles;
            state.source = source;
        }

        debug!(roles = count, source = ?source, "Role registry loaded");
        self.events.publish(RegistryEvent::Loaded { roles: count });
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Returns where the in-memory view came from.
    pub fn source(&self) -> RegistrySource {
        self.state.read().source
    }

    /// Returns `true` once `load` has completed.
    pub fn is_loaded(&self) -> bool {
        self.source() != RegistrySource::Unloaded
    }

    /// Returns the configured super-admin tag.
    pub fn super_admin_tag(&self) -> &RoleId {
        &self.super_admin
    }

    /// Returns the storage layout.
    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Resolves a role tag. Unknown tags resolve to a role with no permissions.
    pub fn resolve_role(&self, id: &RoleId) -> RoleDefinition {
        match self.state.read().roles.get(id) {
            Some(role) => role.clone(),
            None => {
                debug!(role = %id, "Unknown role, resolving to no permissions");
                RoleDefinition::unknown(id)
            }
        }
    }

    /// Returns the definition of a role, if registered.
    pub fn get(&self, id: &RoleId) -> Option<RoleDefinition> {
        self.state.read().roles.get(id).cloned()
    }

    /// Returns `true` if the role is registered.
    pub fn contains(&self, id: &RoleId) -> bool {
        self.state.read().roles.contains_key(id)
    }

    /// Returns the permission set of a role.
    pub fn permissions_for(&self, id: &RoleId) -> PermissionSet {
        self.resolve_role(id).permission_set()
    }

    /// Returns every role, ordered by tag.
    pub fn roles(&self) -> Vec<RoleDefinition> {
        self.state.read().roles.values().cloned().collect()
    }

    /// Returns the number of roles.
    pub fn len(&self) -> usize {
        self.state.read().roles.len()
    }

    /// Returns `true` if no roles are registered.
    pub fn is_empty(&self) -> bool {
        self.state.read().roles.is_empty()
    }

    /// Returns `true` if a profile with this role has the permission.
    pub fn has_permission(&self, profile: &warden_core::Profile, tag: &str) -> bool {
        let identity = warden_core::Identity::new(profile.user_id.clone(), profile.email.clone());
        AccessContext::resolve(identity, Some(profile.clone()), self).has_permission(tag)
    }

    /// Subscribes to registry changes.
    pub fn subscribe(&self) -> EventSubscriber<RegistryEvent> {
        self.events.subscribe()
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Creates a role.
    pub async fn create_role(
        &self,
        actor: &AccessContext,
        role: RoleDefinition,
    ) -> WardenResult<RoleDefinition> {
        self.authorize(actor, AuditAction::RoleCreated, role.id.as_str())
            .await?;
        role.validate()?;
        if role.system {
            return Err(RoleError::invalid("system roles cannot be created at runtime").into());
        }

        let _guard = self.write_lock.lock().await;
        let mut next = self.snapshot()?;
        if next.contains_key(&role.id) {
            return Err(RoleError::already_exists(role.id.as_str()).into());
        }
        next.insert(role.id.clone(), role.clone());

        let ops = vec![WriteOp::set(
            self.layout.role_path(&role.id),
            serde_json::to_value(&role).map_err(StoreError::from)?,
        )];
        self.commit(next, ops).await?;

        info!(role = %role.id, actor = %actor.display_label(), "Role created");
        self.record(actor, AuditAction::RoleCreated, role.id.as_str()).await;
        self.events.publish(RegistryEvent::Created(role.id.clone()));
        Ok(role)
    }

    /// Updates a role.
    ///
    /// The tag of a system role cannot change.
    pub async fn update_role(
        &self,
        actor: &AccessContext,
        id: &RoleId,
        update: RoleUpdate,
    ) -> WardenResult<RoleDefinition> {
        self.authorize(actor, AuditAction::RoleUpdated, id.as_str())
            .await?;

        let _guard = self.write_lock.lock().await;
        let mut next = self.snapshot()?;
        let current = next
            .get(id)
            .cloned()
            .ok_or_else(|| RoleError::not_found(id.as_str()))?;

        let renamed = update.id.as_ref().filter(|new_id| *new_id != id).cloned();
        if renamed.is_some() && current.system {
            return Err(RoleError::system_protected(id.as_str(), "renamed").into());
        }
        if let Some(new_id) = &renamed {
            if next.contains_key(new_id) {
                return Err(RoleError::already_exists(new_id.as_str()).into());
            }
        }

        let updated = update.apply(&current);
        updated.validate()?;

        let mut ops = Vec::with_capacity(2);
        if renamed.is_some() {
            next.remove(id);
            ops.push(WriteOp::delete(self.layout.role_path(id)));
        }
        next.insert(updated.id.clone(), updated.clone());
        ops.push(WriteOp::set(
            self.layout.role_path(&updated.id),
            serde_json::to_value(&updated).map_err(StoreError::from)?,
        ));
        self.commit(next, ops).await?;

        if let Some(new_id) = &renamed {
            warn!(from = %id, to = %new_id, "Role renamed; profiles holding the old tag lose its permissions");
        }
        info!(role = %updated.id, actor = %actor.display_label(), "Role updated");
        self.record(actor, AuditAction::RoleUpdated, updated.id.as_str())
            .await;
        self.events.publish(RegistryEvent::Updated {
            role: updated.id.clone(),
            previous: renamed.map(|_| id.clone()),
        });
        Ok(updated)
    }

    /// Deletes a non-system role.
    ///
    /// Profiles still holding the tag resolve to no permissions afterwards.
    pub async fn delete_role(&self, actor: &AccessContext, id: &RoleId) -> WardenResult<()> {
        self.authorize(actor, AuditAction::RoleDeleted, id.as_str())
            .await?;

        let _guard = self.write_lock.lock().await;
        let mut next = self.snapshot()?;
        let current = next
            .get(id)
            .ok_or_else(|| RoleError::not_found(id.as_str()))?;
        if current.system {
            return Err(RoleError::system_protected(id.as_str(), "deleted").into());
        }
        next.remove(id);

        self.commit(next, vec![WriteOp::delete(self.layout.role_path(id))])
            .await?;

        info!(role = %id, actor = %actor.display_label(), "Role deleted");
        self.record(actor, AuditAction::RoleDeleted, id.as_str()).await;
        self.events.publish(RegistryEvent::Deleted(id.clone()));
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn authorize(
        &self,
        actor: &AccessContext,
        action: AuditAction,
        target: &str,
    ) -> WardenResult<()> {
        if !actor.is_authenticated() {
            return Err(AccessError::Unauthenticated.into());
        }
        if actor.has_permission(PermissionTag::MANAGE_ROLES) {
            return Ok(());
        }

        warn!(
            user = %actor.display_label(),
            action = %action,
            role = target,
            "Registry mutation denied"
        );
        let mut entry = AuditLog::new(action)
            .target(target)
            .denied(format!("requires {}", PermissionTag::MANAGE_ROLES));
        if let Some(user_id) = actor.user_id() {
            entry = entry.actor(user_id);
        }
        audit::record(&self.audit, entry).await;

        Err(AccessError::forbidden(PermissionTag::MANAGE_ROLES, actor.display_label()).into())
    }

    fn snapshot(&self) -> WardenResult<BTreeMap<RoleId, RoleDefinition>> {
        let state = self.state.read();
        if state.source == RegistrySource::Unloaded {
            return Err(RoleError::invalid("role registry is not loaded").into());
        }
        Ok(state.roles.clone())
    }

    fn full_write(&self, roles: &BTreeMap<RoleId, RoleDefinition>) -> WardenResult<Vec<WriteOp>> {
        roles
            .values()
            .map(|role| {
                let data: Value = serde_json::to_value(role).map_err(StoreError::from)?;
                Ok(WriteOp::set(self.layout.role_path(&role.id), data))
            })
            .collect()
    }

    /// Persists `ops` and installs `next` as the in-memory view.
    ///
    /// While the view is the unpersisted bootstrap set, the whole registry
    /// is written instead so the store becomes authoritative.
    async fn commit(
        &self,
        next: BTreeMap<RoleId, RoleDefinition>,
        ops: Vec<WriteOp>,
    ) -> WardenResult<()> {
        let first_write = self.source() == RegistrySource::Bootstrap;
        let ops = if first_write {
            let mut all = self.full_write(&next)?;
            all.extend(ops.into_iter().filter(|op| matches!(op, WriteOp::Delete { .. })));
            all
        } else {
            ops
        };

        self.store.batch_write(ops).await?;
        if first_write {
            info!(roles = next.len(), "Bootstrap roles persisted with first registry change");
        }

        let mut state = self.state.write();
        state.roles = next;
        state.source = RegistrySource::Persisted;
        Ok(())
    }

    async fn record(&self, actor: &AccessContext, action: AuditAction, target: &str) {
        let mut entry = AuditLog::new(action).target(target);
        if let Some(user_id) = actor.user_id() {
            entry = entry.actor(user_id);
        }
        audit::record(&self.audit, entry).await;
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`RoleRegistry`].
#[derive(Debug)]
pub struct RoleRegistryBuilder {
    store: Arc<dyn DocumentStore>,
    layout: StorageLayout,
    audit: Arc<dyn AuditLogger>,
    bootstrap: Vec<RoleDefinition>,
    persist_bootstrap: bool,
    super_admin: RoleId,
    event_capacity: usize,
}

impl RoleRegistryBuilder {
    /// Creates a builder with the default bootstrap set.
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            layout: StorageLayout::default(),
            audit: Arc::new(NoOpAuditLogger::new()),
            bootstrap: bootstrap_roles(),
            persist_bootstrap: false,
            super_admin: RoleId::super_admin(),
            event_capacity: 64,
        }
    }

    /// Sets the storage layout.
    pub fn layout(mut self, layout: StorageLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Sets the audit sink.
    pub fn audit(mut self, audit: Arc<dyn AuditLogger>) -> Self {
        self.audit = audit;
        self
    }

    /// Replaces the bootstrap set.
    pub fn bootstrap(mut self, roles: Vec<RoleDefinition>) -> Self {
        self.bootstrap = roles;
        self
    }

    /// Persists the bootstrap set as soon as it is installed.
    pub fn persist_bootstrap(mut self, persist: bool) -> Self {
        self.persist_bootstrap = persist;
        self
    }

    /// Sets the super-admin role tag.
    pub fn super_admin(mut self, role: impl Into<RoleId>) -> Self {
        self.super_admin = role.into();
        self
    }

    /// Sets the event bus capacity.
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Builds the registry. Call [`RoleRegistry::load`] before use.
    pub fn build(self) -> RoleRegistry {
        RoleRegistry {
            store: self.store,
            layout: self.layout,
            audit: self.audit,
            bootstrap: self.bootstrap,
            persist_bootstrap: self.persist_bootstrap,
            super_admin: self.super_admin,
            state: RwLock::new(RegistryState {
                roles: BTreeMap::new(),
                source: RegistrySource::Unloaded,
            }),
            write_lock: Mutex::new(()),
            events: EventBus::new(self.event_capacity),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
