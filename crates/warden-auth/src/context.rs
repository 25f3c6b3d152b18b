// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Access context.

use serde::Serialize;
use warden_core::{Identity, Profile, RoleId, UserId};

use crate::permission::PermissionSet;
use crate::rbac::{check_capability, CapabilityGrant, RoleDefinition};
use crate::registry::RoleRegistry;

/// Everything the access gate needs to decide, resolved ahead of time.
///
/// A context is an immutable snapshot: identity, profile, the resolved role
/// and the effective permission set (role permissions plus the profile's
/// additive overrides). Evaluating it never touches the network.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessContext {
    identity: Option<Identity>,
    #[serde(skip)]
    profile: Option<Profile>,
    profile_loaded: bool,
    #[serde(skip)]
    role: Option<RoleDefinition>,
    permissions: PermissionSet,
    super_admin: RoleId,
}

impl AccessContext {
    /// The signed-out context.
    pub fn anonymous() -> Self {
        Self {
            identity: None,
            profile: None,
            profile_loaded: false,
            role: None,
            permissions: PermissionSet::new(),
            super_admin: RoleId::super_admin(),
        }
    }

    /// A signed-in context whose profile has not arrived yet.
    pub fn pending(identity: Identity) -> Self {
        Self {
            identity: Some(identity),
            ..Self::anonymous()
        }
    }

    /// Resolves a signed-in context against the registry.
    ///
    /// A missing profile yields an authenticated context with no role and no
    /// permissions.
    pub fn resolve(identity: Identity, profile: Option<Profile>, registry: &RoleRegistry) -> Self {
        let super_admin = registry.super_admin_tag().clone();
        let Some(profile) = profile else {
            return Self {
                identity: Some(identity),
                profile_loaded: true,
                super_admin,
                ..Self::anonymous()
            };
        };

        let role = registry.resolve_role(&profile.role);
        let mut permissions = role.permission_set();
        if let Some(overrides) = &profile.permissions {
            permissions.merge(&overrides.iter().map(String::as_str).collect());
        }

        Self {
            identity: Some(identity),
            profile: Some(profile),
            profile_loaded: true,
            role: Some(role),
            permissions,
            super_admin,
        }
    }

    /// Resolves a context for a stored profile, deriving the identity from it.
    pub fn for_profile(profile: Profile, registry: &RoleRegistry) -> Self {
        let identity = Identity::new(profile.user_id.clone(), profile.email.clone())
            .with_display_name(profile.display_name.clone());
        Self::resolve(identity, Some(profile), registry)
    }

    /// Returns `true` when an identity is signed in.
    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// Returns `true` while the profile of a signed-in identity is loading.
    pub fn is_pending(&self) -> bool {
        self.identity.is_some() && !self.profile_loaded
    }

    /// Returns the signed-in identity.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Returns the signed-in user ID.
    pub fn user_id(&self) -> Option<&UserId> {
        self.identity.as_ref().map(|i| &i.id)
    }

    /// Returns the profile, if loaded and present.
    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    /// Returns the role tag of the profile.
    pub fn role_id(&self) -> Option<&RoleId> {
        self.profile.as_ref().map(|p| &p.role)
    }

    /// Returns the resolved role definition.
    pub fn role(&self) -> Option<&RoleDefinition> {
        self.role.as_ref()
    }

    /// Returns the effective permission set.
    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    /// Resolves a capability and reports how it was granted.
    pub fn capability(&self, tag: &str) -> CapabilityGrant {
        if !self.is_authenticated() {
            return CapabilityGrant::Denied;
        }
        check_capability(&self.permissions, self.role_id(), &self.super_admin, tag)
    }

    /// Returns `true` if the context has the given permission.
    pub fn has_permission(&self, tag: &str) -> bool {
        self.capability(tag).is_granted()
    }

    /// Returns `true` if the context has all of the given permissions.
    pub fn has_all_permissions(&self, tags: &[&str]) -> bool {
        tags.iter().all(|t| self.has_permission(t))
    }

    /// Returns `true` if the context has any of the given permissions.
    pub fn has_any_permission(&self, tags: &[&str]) -> bool {
        tags.iter().any(|t| self.has_permission(t))
    }

    /// Returns `true` if the context has the given role tag.
    pub fn has_role(&self, role: &str) -> bool {
        self.role_id().map(|r| r.as_str() == role).unwrap_or(false)
    }

    /// Returns `true` for the super-admin role tag.
    pub fn is_super_admin(&self) -> bool {
        self.role_id() == Some(&self.super_admin)
    }

    /// Returns `true` for the admin or super-admin role.
    pub fn is_admin(&self) -> bool {
        self.has_role(RoleId::ADMIN) || self.is_super_admin()
    }

    /// Returns `true` if the profile is disabled.
    pub fn is_disabled(&self) -> bool {
        self.profile.as_ref().map(Profile::is_disabled).unwrap_or(false)
    }

    /// Label identifying the current user in denial views and logs.
    pub fn display_label(&self) -> String {
        match &self.identity {
            Some(identity) => identity.email.clone(),
            None => "anonymous".to_string(),
        }
    }
}

impl Default for AccessContext {
    fn default() -> Self {
        Self::anonymous()
    }
}

// =============================================================================
// Tests
// =============================================================================
