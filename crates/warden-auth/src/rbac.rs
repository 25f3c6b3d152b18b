// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Role definitions and capability resolution.

use serde::{Deserialize, Serialize};
use tracing::debug;
use warden_core::{RoleError, RoleId};

use crate::permission::{PermissionSet, PermissionTag};

/// Colour used when a definition does not carry one.
pub const DEFAULT_ROLE_COLOR: &str = "#757575";

// =============================================================================
// Role Definition
// =============================================================================

/// A named bundle of permission tags.
///
/// Stored under `roles/{id}`. The ID is the document key and is not part of
/// the serialized body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleDefinition {
    /// Role tag (document key).
    #[serde(skip)]
    pub id: RoleId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Permission tags in display order.
    #[serde(default)]
    pub permissions: Vec<PermissionTag>,
    /// System roles cannot be deleted or have their tag changed.
    #[serde(default, rename = "isSystem")]
    pub system: bool,
    /// Display colour.
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_color() -> String {
    DEFAULT_ROLE_COLOR.to_string()
}

impl RoleDefinition {
    /// Creates a non-system role without permissions.
    pub fn new(id: impl Into<RoleId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            permissions: Vec::new(),
            system: false,
            color: default_color(),
        }
    }

    /// The definition an unknown role tag resolves to: no permissions.
    pub fn unknown(id: &RoleId) -> Self {
        Self::new(id.clone(), id.as_str())
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Appends permission tags, skipping duplicates.
    pub fn with_permissions<I, T>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<PermissionTag>,
    {
        for tag in permissions {
            let tag = tag.into();
            if !self.permissions.contains(&tag) {
                self.permissions.push(tag);
            }
        }
        self
    }

    /// Marks the role as a system role.
    pub fn system(mut self) -> Self {
        self.system = true;
        self
    }

    /// Sets the display colour.
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    /// Returns the permissions as a set.
    pub fn permission_set(&self) -> PermissionSet {
        self.permissions.iter().cloned().collect()
    }

    /// Returns `true` if the exact tag is listed.
    pub fn lists(&self, tag: &str) -> bool {
        self.permissions.iter().any(|p| p.as_str() == tag)
    }

    /// Checks the definition is well formed.
    pub fn validate(&self) -> Result<(), RoleError> {
        let id = self.id.as_str();
        if id.is_empty() {
            return Err(RoleError::invalid("role id cannot be empty"));
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
        {
            return Err(RoleError::invalid(format!(
                "role id '{}' may only contain lowercase letters, digits, '_' and '-'",
                id
            )));
        }
        if self.name.trim().is_empty() {
            return Err(RoleError::invalid(format!("role '{}' needs a name", id)));
        }
        if let Some(tag) = self.permissions.iter().find(|t| !t.is_valid()) {
            return Err(RoleError::invalid(format!(
                "role '{}' has malformed permission '{}'",
                id, tag
            )));
        }
        Ok(())
    }
}

/// The roles used when the registry is empty on first run.
///
/// `super_admin`, `admin` and `user` are system roles; `editor` is an
/// ordinary custom role.
pub fn bootstrap_roles() -> Vec<RoleDefinition> {
    vec![
        RoleDefinition::new(RoleId::SUPER_ADMIN, "Super Administrator")
            .with_description("Unrestricted access to every area")
            .with_permissions([PermissionTag::ALL])
            .with_color("#e53935")
            .system(),
        RoleDefinition::new(RoleId::ADMIN, "Administrator")
            .with_description("Manages users, roles and content")
            .with_permissions([
                PermissionTag::READ,
                PermissionTag::WRITE,
                PermissionTag::DELETE,
                PermissionTag::MANAGE_USERS,
                PermissionTag::MANAGE_ROLES,
                PermissionTag::BOND_ACCESS,
            ])
            .with_color("#1976d2")
            .system(),
        RoleDefinition::new(RoleId::USER, "Standard User")
            .with_description("Read-only access to the dashboard")
            .with_permissions([PermissionTag::READ])
            .with_color(DEFAULT_ROLE_COLOR)
            .system(),
        RoleDefinition::new("editor", "Editor")
            .with_description("Creates and edits content")
            .with_permissions([
                PermissionTag::READ,
                PermissionTag::WRITE,
                PermissionTag::BOND_ACCESS,
            ])
            .with_color("#43a047"),
    ]
}

// =============================================================================
// Capability Resolution
// =============================================================================

/// Why a capability check succeeded or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityGrant {
    /// The tag is listed by the role or the profile overrides.
    Exact,
    /// The `all` wildcard is present.
    Wildcard,
    /// The role tag is the hardcoded super-admin tag.
    Bypass,
    /// None of the above.
    Denied,
}

impl CapabilityGrant {
    /// Returns `true` unless denied.
    pub fn is_granted(&self) -> bool {
        !matches!(self, CapabilityGrant::Denied)
    }
}

/// Resolves one capability check.
///
/// Order: exact tag in `granted`, then the `all` wildcard, then the
/// super-admin bypass. The bypass does not consult the registry, so an
/// empty or corrupted registry cannot lock out the super-admin role.
pub fn check_capability(
    granted: &PermissionSet,
    role: Option<&RoleId>,
    super_admin: &RoleId,
    tag: &str,
) -> CapabilityGrant {
    if granted.contains(tag) {
        return CapabilityGrant::Exact;
    }
    if granted.has_wildcard() {
        return CapabilityGrant::Wildcard;
    }
    if let Some(role) = role {
        if role == super_admin {
            debug!(role = %role, permission = tag, bypass = true, "Capability granted by super-admin bypass");
            return CapabilityGrant::Bypass;
        }
    }
    CapabilityGrant::Denied
}

// =============================================================================
// Tests
// =============================================================================
