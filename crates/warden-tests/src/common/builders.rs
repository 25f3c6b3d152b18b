// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Builders
//!
//! Builders for objects whose full constructors are noisy in tests.

use warden_auth::{AccessContext, RoleDefinition, RoleRegistry};
use warden_core::{AccountStatus, Identity, Profile, RoleId};

// =============================================================================
// Profile Builder
// =============================================================================

/// Builds profiles and the access contexts resolved from them.
#[derive(Debug, Clone)]
pub struct ProfileBuilder {
    identity: Identity,
    role: RoleId,
    status: AccountStatus,
    permissions: Option<Vec<String>>,
}

impl Default for ProfileBuilder {
    fn default() -> Self {
        Self::new("uid-built", "built@example.com")
    }
}

impl ProfileBuilder {
    /// Starts from a fresh identity with the `user` role.
    pub fn new(id: &str, email: &str) -> Self {
        Self {
            identity: Identity::new(id, email),
            role: RoleId::user(),
            status: AccountStatus::Active,
            permissions: None,
        }
    }

    /// Starts from an existing identity.
    pub fn for_identity(identity: &Identity) -> Self {
        Self {
            identity: identity.clone(),
            ..Self::default()
        }
    }

    /// Sets the role.
    pub fn role(mut self, role: &str) -> Self {
        self.role = RoleId::new(role);
        self
    }

    /// Marks the account disabled.
    pub fn disabled(mut self) -> Self {
        self.status = AccountStatus::Disabled;
        self
    }

    /// Adds a permission override.
    pub fn grant(mut self, tag: &str) -> Self {
        self.permissions
            .get_or_insert_with(Vec::new)
            .push(tag.to_string());
        self
    }

    /// Builds the profile.
    pub fn build(&self) -> Profile {
        let mut profile = Profile::default_for(&self.identity)
            .with_role(self.role.clone())
            .with_status(self.status);
        if let Some(ref permissions) = self.permissions {
            profile = profile.with_permissions(permissions.clone());
        }
        profile
    }

    /// Builds the profile and resolves it against `registry`.
    pub fn context(&self, registry: &RoleRegistry) -> AccessContext {
        AccessContext::resolve(self.identity.clone(), Some(self.build()), registry)
    }
}

// =============================================================================
// Role Builder
// =============================================================================

/// Builds role definitions.
#[derive(Debug, Clone)]
pub struct RoleBuilder {
    id: String,
    name: Option<String>,
    permissions: Vec<String>,
    system: bool,
    color: Option<String>,
}

impl RoleBuilder {
    /// Starts a role with no permissions.
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: None,
            permissions: Vec::new(),
            system: false,
            color: None,
        }
    }

    /// Sets the display name. Defaults to the tag.
    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Adds a permission.
    pub fn permission(mut self, tag: &str) -> Self {
        self.permissions.push(tag.to_string());
        self
    }

    /// Adds several permissions.
    pub fn permissions(mut self, tags: &[&str]) -> Self {
        self.permissions.extend(tags.iter().map(|t| t.to_string()));
        self
    }

    /// Marks the role as a system role.
    pub fn system(mut self) -> Self {
        self.system = true;
        self
    }

    /// Sets the colour.
    pub fn color(mut self, color: &str) -> Self {
        self.color = Some(color.to_string());
        self
    }

    /// Builds the definition.
    pub fn build(self) -> RoleDefinition {
        let name = self.name.unwrap_or_else(|| self.id.clone());
        let mut role = RoleDefinition::new(self.id.as_str(), name)
            .with_permissions(self.permissions.iter().map(String::as_str));
        if self.system {
            role = role.system();
        }
        if let Some(color) = self.color {
            role = role.with_color(color);
        }
        role
    }
}
