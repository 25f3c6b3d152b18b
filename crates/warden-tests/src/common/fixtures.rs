// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Fixtures
//!
//! Pre-built identities, roles and configuration documents.

use warden_auth::{PermissionTag, RoleDefinition};
use warden_core::{Identity, Profile, RoleId};

// =============================================================================
// Identity Fixtures
// =============================================================================

/// Standard identities. None of them is registered with a provider.
pub struct IdentityFixtures;

impl IdentityFixtures {
    /// Password accepted by the default policy.
    pub const PASSWORD: &'static str = "correct-horse";

    /// An ordinary operator.
    pub fn operator() -> Identity {
        Identity::new("uid-operator", "operator@example.com").with_display_name("Operator")
    }

    /// A second ordinary identity.
    pub fn analyst() -> Identity {
        Identity::new("uid-analyst", "analyst@example.com")
    }

    /// The identity acting as administrator.
    pub fn root() -> Identity {
        Identity::new("uid-root", "root@example.com").with_display_name("Root")
    }
}

// =============================================================================
// Profile Fixtures
// =============================================================================

/// Standard profiles.
pub struct ProfileFixtures;

impl ProfileFixtures {
    /// A profile with the given role.
    pub fn with_role(identity: &Identity, role: &str) -> Profile {
        Profile::default_for(identity).with_role(role)
    }

    /// A super-admin profile.
    pub fn super_admin(identity: &Identity) -> Profile {
        Self::with_role(identity, RoleId::SUPER_ADMIN)
    }
}

// =============================================================================
// Role Fixtures
// =============================================================================

/// Custom role definitions.
pub struct RoleFixtures;

impl RoleFixtures {
    /// Read-only viewer with bond access.
    pub fn viewer() -> RoleDefinition {
        RoleDefinition::new("viewer", "Viewer")
            .with_description("Reads reports and bonds")
            .with_permissions([PermissionTag::READ, PermissionTag::BOND_ACCESS])
            .with_color("#8e24aa")
    }

    /// Manages users but not roles.
    pub fn support() -> RoleDefinition {
        RoleDefinition::new("support", "Support")
            .with_permissions([PermissionTag::READ, PermissionTag::MANAGE_USERS])
    }

    /// A minimal registry: super-admin and one ordinary role.
    pub fn minimal_set() -> Vec<RoleDefinition> {
        vec![
            RoleDefinition::new(RoleId::SUPER_ADMIN, "Root")
                .with_permissions([PermissionTag::ALL])
                .system(),
            RoleDefinition::new("member", "Member").with_permissions([PermissionTag::READ]),
        ]
    }
}

// =============================================================================
// Config Fixtures
// =============================================================================

/// Configuration documents.
pub struct ConfigFixtures;

impl ConfigFixtures {
    /// Smallest valid YAML document.
    pub fn minimal_yaml() -> &'static str {
        r#"
app:
  name: "Minimal Console"
"#
    }

    /// YAML document touching every section.
    pub fn full_yaml() -> &'static str {
        r##"
app:
  name: "Operations Console"
  sign_in_path: "/signin"
  home_path: "/overview"

auth:
  min_password_length: 10
  default_role: "member"
  super_admin_role: "super_admin"

roles:
  persist_bootstrap: false
  bootstrap:
    - id: "super_admin"
      name: "Root"
      permissions: ["all"]
      system: true
    - id: "member"
      name: "Member"
      description: "Reads reports"
      permissions: ["read"]
      color: "#00897b"

storage:
  users_collection: "accounts"
  roles_collection: "access_roles"

settings:
  mode: "dark"
  color_scheme: "green"
  font_size: "large"
  sidebar_open: false
  commit_debounce: "250ms"

logging:
  level: debug
  format: json
"##
    }

    /// TOML document.
    pub fn toml() -> &'static str {
        r#"
[app]
name = "Toml Console"

[auth]
min_password_length = 8

[settings]
color_scheme = "orange"
commit_debounce = "1s"
"#
    }

    /// JSON document.
    pub fn json() -> &'static str {
        r#"{
  "app": { "name": "Json Console", "home_path": "/home" },
  "settings": { "font_size": "small" }
}"#
    }
}
