// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! User directory: administrative operations on other users' profiles.
//!
//! Every operation requires `manage_users`. Only a super-admin may grant or
//! revoke the super-admin role, and nobody may disable their own account.
//! Mutations and denials are written to the audit trail.

use std::sync::Arc;

use serde_json::json;
use tracing::{info, warn};
use warden_core::audit::{self, AuditAction, AuditLog, AuditLogger, NoOpAuditLogger};
use warden_core::{
    AccessError, AccountStatus, Profile, ProfileRepository, RoleError, RoleId, StoreError,
    UserId, WardenError, WardenResult,
};

use crate::context::AccessContext;
use crate::permission::PermissionTag;
use crate::registry::RoleRegistry;

/// Administrative access to user profiles.
#[derive(Debug, Clone)]
pub struct UserDirectory {
    profiles: ProfileRepository,
    registry: Arc<RoleRegistry>,
    audit: Arc<dyn AuditLogger>,
}

impl UserDirectory {
    /// Creates a directory.
    pub fn new(profiles: ProfileRepository, registry: Arc<RoleRegistry>) -> Self {
        Self {
            profiles,
            registry,
            audit: Arc::new(NoOpAuditLogger::new()),
        }
    }

    /// Sets the audit logger.
    pub fn with_audit(mut self, audit: Arc<dyn AuditLogger>) -> Self {
        self.audit = audit;
        self
    }

    /// Lists every profile, ordered by email.
    pub async fn list_users(&self, actor: &AccessContext) -> WardenResult<Vec<Profile>> {
        Self::require_manage_users(actor)?;
        let mut profiles = self.profiles.list().await?;
        profiles.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(profiles)
    }

    /// Assigns a role to a user.
    pub async fn set_role(
        &self,
        actor: &AccessContext,
        user_id: &UserId,
        role: &RoleId,
    ) -> WardenResult<()> {
        let result = self.try_set_role(actor, user_id, role).await;
        self.record(
            actor,
            AuditAction::UserRoleChanged,
            user_id,
            json!({ "role": role.as_str() }),
            &result,
        )
        .await;
        result
    }

    /// Changes a user's account status.
    pub async fn set_status(
        &self,
        actor: &AccessContext,
        user_id: &UserId,
        status: AccountStatus,
    ) -> WardenResult<()> {
        let result = self.try_set_status(actor, user_id, status).await;
        self.record(
            actor,
            AuditAction::UserStatusChanged,
            user_id,
            json!({ "status": status.as_str() }),
            &result,
        )
        .await;
        result
    }

    async fn try_set_role(
        &self,
        actor: &AccessContext,
        user_id: &UserId,
        role: &RoleId,
    ) -> WardenResult<()> {
        Self::require_manage_users(actor)?;
        if !self.registry.contains(role) {
            return Err(RoleError::not_found(role.as_str()).into());
        }

        let target = self.load_profile(user_id).await?;
        let super_admin = self.registry.super_admin_tag();
        let touches_super_admin = role == super_admin || &target.role == super_admin;
        if touches_super_admin && !actor.is_super_admin() {
            return Err(AccessError::forbidden(
                format!("role:{}", super_admin),
                actor.display_label(),
            )
            .into());
        }
        if target.role == *role {
            return Ok(());
        }

        self.profiles.set_role(user_id, role).await?;
        info!(
            user_id = %user_id,
            from = %target.role,
            to = %role,
            actor = %actor.display_label(),
            "User role changed"
        );
        Ok(())
    }

    async fn try_set_status(
        &self,
        actor: &AccessContext,
        user_id: &UserId,
        status: AccountStatus,
    ) -> WardenResult<()> {
        Self::require_manage_users(actor)?;
        if status.is_disabled() && actor.user_id() == Some(user_id) {
            return Err(AccessError::not_allowed("you cannot disable your own account").into());
        }

        let target = self.load_profile(user_id).await?;
        if target.role == *self.registry.super_admin_tag() && !actor.is_super_admin() {
            return Err(AccessError::forbidden(
                format!("role:{}", self.registry.super_admin_tag()),
                actor.display_label(),
            )
            .into());
        }

        self.profiles.set_status(user_id, status).await?;
        info!(
            user_id = %user_id,
            status = %status,
            actor = %actor.display_label(),
            "User status changed"
        );
        Ok(())
    }

    async fn load_profile(&self, user_id: &UserId) -> WardenResult<Profile> {
        self.profiles
            .get(user_id)
            .await?
            .ok_or_else(|| StoreError::not_found(user_id.as_str()).into())
    }

    fn require_manage_users(actor: &AccessContext) -> WardenResult<()> {
        if !actor.is_authenticated() {
            return Err(AccessError::Unauthenticated.into());
        }
        if !actor.has_permission(PermissionTag::MANAGE_USERS) {
            return Err(
                AccessError::forbidden(PermissionTag::MANAGE_USERS, actor.display_label()).into(),
            );
        }
        Ok(())
    }

    async fn record(
        &self,
        actor: &AccessContext,
        action: AuditAction,
        target: &UserId,
        detail: serde_json::Value,
        result: &WardenResult<()>,
    ) {
        let mut entry = AuditLog::new(action).target(target.as_str()).detail(detail);
        if let Some(user_id) = actor.user_id() {
            entry = entry.actor(user_id);
        }
        entry = match result {
            Ok(()) => entry,
            Err(WardenError::Access(e)) => {
                warn!(
                    user = %actor.display_label(),
                    action = %action,
                    target = %target,
                    "Directory operation denied"
                );
                entry.denied(e.to_string())
            }
            Err(e) => entry.failed(e),
        };
        audit::record(&self.audit, entry).await;
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::audit::{AuditOutcome, InMemoryAuditLogger};
    use warden_core::memory::MemoryDocumentStore;
    use warden_core::{Identity, StorageLayout};

    struct Fixture {
        directory: UserDirectory,
        profiles: ProfileRepository,
        registry: Arc<RoleRegistry>,
        audit: Arc<InMemoryAuditLogger>,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryDocumentStore::new());
        let profiles = ProfileRepository::new(store.clone(), StorageLayout::default());
        let registry = Arc::new(RoleRegistry::builder(store).build());
        registry.load().await.unwrap();
        let audit = Arc::new(InMemoryAuditLogger::new());
        Fixture {
            directory: UserDirectory::new(profiles.clone(), registry.clone())
                .with_audit(audit.clone()),
            profiles,
            registry,
            audit,
        }
    }

    async fn member(f: &Fixture, id: &str, role: &str) -> AccessContext {
        let identity = Identity::new(id, format!("{id}@example.com"));
        f.profiles.create_default(&identity).await.unwrap();
        f.profiles.set_role(&identity.id, &RoleId::new(role)).await.unwrap();
        let profile = f.profiles.get(&identity.id).await.unwrap().unwrap();
        AccessContext::resolve(identity, Some(profile), &f.registry)
    }

    #[tokio::test]
    async fn test_list_requires_manage_users() {
        let f = fixture().await;
        let admin = member(&f, "ada", "admin").await;
        let user = member(&f, "bob", "user").await;

        let users = f.directory.list_users(&admin).await.unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].email, "ada@example.com");

        let err = f.directory.list_users(&user).await.unwrap_err();
        assert!(matches!(err, WardenError::Access(AccessError::Forbidden { .. })));
    }

    #[tokio::test]
    async fn test_admin_changes_role() {
        let f = fixture().await;
        let admin = member(&f, "ada", "admin").await;
        let bob = member(&f, "bob", "user").await;
        let bob_id = bob.user_id().unwrap().clone();

        f.directory.set_role(&admin, &bob_id, &RoleId::new("editor")).await.unwrap();

        let stored = f.profiles.get(&bob_id).await.unwrap().unwrap();
        assert_eq!(stored.role.as_str(), "editor");
        let entries = f.audit.entries_for_action(AuditAction::UserRoleChanged);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].outcome, AuditOutcome::Success);
    }

    #[tokio::test]
    async fn test_unknown_role_rejected() {
        let f = fixture().await;
        let admin = member(&f, "ada", "admin").await;
        let bob = member(&f, "bob", "user").await;

        let err = f
            .directory
            .set_role(&admin, bob.user_id().unwrap(), &RoleId::new("ghost"))
            .await
            .unwrap_err();
        assert!(matches!(err, WardenError::Role(RoleError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_only_super_admin_grants_super_admin() {
        let f = fixture().await;
        let admin = member(&f, "ada", "admin").await;
        let root = member(&f, "root", "super_admin").await;
        let bob = member(&f, "bob", "user").await;
        let bob_id = bob.user_id().unwrap().clone();

        let err = f
            .directory
            .set_role(&admin, &bob_id, &RoleId::super_admin())
            .await
            .unwrap_err();
        assert!(matches!(err, WardenError::Access(AccessError::Forbidden { .. })));

        let root_id = root.user_id().unwrap().clone();
        assert!(f.directory.set_role(&admin, &root_id, &RoleId::user()).await.is_err());

        f.directory.set_role(&root, &bob_id, &RoleId::super_admin()).await.unwrap();
        let denied = f.audit.entries_where(|e| matches!(e.outcome, AuditOutcome::Denied { .. }));
        assert_eq!(denied.len(), 2);
    }

    #[tokio::test]
    async fn test_cannot_disable_self() {
        let f = fixture().await;
        let admin = member(&f, "ada", "admin").await;
        let bob = member(&f, "bob", "user").await;

        let err = f
            .directory
            .set_status(&admin, admin.user_id().unwrap(), AccountStatus::Disabled)
            .await
            .unwrap_err();
        assert!(matches!(err, WardenError::Access(AccessError::NotAllowed { .. })));

        f.directory
            .set_status(&admin, bob.user_id().unwrap(), AccountStatus::Disabled)
            .await
            .unwrap();
        let stored = f.profiles.get(bob.user_id().unwrap()).await.unwrap().unwrap();
        assert!(stored.is_disabled());
    }

    #[tokio::test]
    async fn test_missing_target() {
        let f = fixture().await;
        let admin = member(&f, "ada", "admin").await;
        let err = f
            .directory
            .set_status(&admin, &UserId::new("nobody"), AccountStatus::Disabled)
            .await
            .unwrap_err();
        assert!(matches!(err, WardenError::Store(StoreError::NotFound { .. })));
        assert_eq!(f.audit.entries_where(|e| !e.outcome.is_success()).len(), 1);
    }
}
