// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Core data types for warden.
//!
//! Identities are owned by the session layer; profiles are the persisted,
//! mutable records that carry role and status for an identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

// =============================================================================
// Identifiers
// =============================================================================

/// A unique identifier for an authenticated principal.
///
/// # Examples
///
/// ```
/// use warden_core::types::UserId;
///
/// let id = UserId::new("u-001");
/// assert_eq!(id.as_str(), "u-001");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a new user ID.
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the ID and returns the inner string.
    #[inline]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A role tag, the key of a role definition in the registry.
///
/// # Examples
///
/// ```
/// use warden_core::types::RoleId;
///
/// let role = RoleId::new("admin");
/// assert_eq!(role.as_str(), "admin");
/// assert!(RoleId::super_admin().is_super_admin());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(String);

impl RoleId {
    /// Tag of the highest-privilege role.
    pub const SUPER_ADMIN: &'static str = "super_admin";
    /// Tag of the administrator role.
    pub const ADMIN: &'static str = "admin";
    /// Tag assigned to new accounts.
    pub const USER: &'static str = "user";

    /// Creates a new role ID.
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The super-admin role tag.
    pub fn super_admin() -> Self {
        Self::new(Self::SUPER_ADMIN)
    }

    /// The admin role tag.
    pub fn admin() -> Self {
        Self::new(Self::ADMIN)
    }

    /// The default role tag for new accounts.
    pub fn user() -> Self {
        Self::new(Self::USER)
    }

    /// Returns the ID as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for the hardcoded super-admin tag.
    pub fn is_super_admin(&self) -> bool {
        self.0 == Self::SUPER_ADMIN
    }
}

impl Default for RoleId {
    fn default() -> Self {
        Self::user()
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RoleId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RoleId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for RoleId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Identity
// =============================================================================

/// An authenticated session principal.
///
/// Created on successful sign-in or sign-up and dropped on sign-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Unique, stable user ID.
    pub id: UserId,
    /// Sign-in email.
    pub email: String,
    /// Display name reported by the auth provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Whether the email address has been verified.
    #[serde(default)]
    pub email_verified: bool,
}

impl Identity {
    /// Creates an unverified identity.
    pub fn new(id: impl Into<UserId>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            display_name: None,
            email_verified: false,
        }
    }

    /// Sets the display name.
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Marks the email as verified.
    pub fn verified(mut self) -> Self {
        self.email_verified = true;
        self
    }

    /// The part of the email before `@`.
    pub fn email_local_part(&self) -> &str {
        self.email.split('@').next().unwrap_or(&self.email)
    }
}

// =============================================================================
// Account Status
// =============================================================================

/// Lifecycle status of an account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    /// The account may sign in and act.
    #[default]
    Active,
    /// The account is locked out; any live session is forcibly ended.
    Disabled,
    /// The account awaits approval.
    Pending,
}

impl AccountStatus {
    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Disabled => "disabled",
            AccountStatus::Pending => "pending",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(AccountStatus::Active),
            "disabled" => Some(AccountStatus::Disabled),
            "pending" => Some(AccountStatus::Pending),
            _ => None,
        }
    }

    /// Returns `true` if the account is disabled.
    pub fn is_disabled(&self) -> bool {
        matches!(self, AccountStatus::Disabled)
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Profile
// =============================================================================

/// The persisted record of role, status and display data for an identity.
///
/// Stored under `users/{uid}`. The user ID is the document key and is not
/// part of the serialized body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Owner of this profile (document key).
    #[serde(skip)]
    pub user_id: UserId,
    /// Email at creation time.
    #[serde(default)]
    pub email: String,
    /// Display name.
    #[serde(default)]
    pub display_name: String,
    /// Avatar URL.
    #[serde(default, rename = "photoURL")]
    pub photo_url: Option<String>,
    /// Role tag.
    #[serde(default)]
    pub role: RoleId,
    /// Account status.
    #[serde(default)]
    pub status: AccountStatus,
    /// Extra permission tags granted on top of the role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,
    /// Creation time.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// Last update time.
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Creates the default profile for a freshly signed-up identity.
    ///
    /// Role `user`, status `active`, display name from the provider or the
    /// local part of the email.
    pub fn default_for(identity: &Identity) -> Self {
        let now = Utc::now();
        let display_name = identity
            .display_name
            .clone()
            .unwrap_or_else(|| identity.email_local_part().to_string());

        Self {
            user_id: identity.id.clone(),
            email: identity.email.clone(),
            display_name,
            photo_url: None,
            role: RoleId::user(),
            status: AccountStatus::Active,
            permissions: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the role.
    pub fn with_role(mut self, role: impl Into<RoleId>) -> Self {
        self.role = role.into();
        self
    }

    /// Sets the status.
    pub fn with_status(mut self, status: AccountStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the permission override list.
    pub fn with_permissions(mut self, permissions: Vec<String>) -> Self {
        self.permissions = Some(permissions);
        self
    }

    /// Returns `true` if the account is disabled.
    pub fn is_disabled(&self) -> bool {
        self.status.is_disabled()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_id_super_admin() {
        assert!(RoleId::super_admin().is_super_admin());
        assert!(!RoleId::admin().is_super_admin());
        assert_eq!(RoleId::default(), RoleId::user());
    }

    #[test]
    fn test_account_status_parse() {
        assert_eq!(AccountStatus::parse("DISABLED"), Some(AccountStatus::Disabled));
        assert_eq!(AccountStatus::parse("pending"), Some(AccountStatus::Pending));
        assert_eq!(AccountStatus::parse("banned"), None);
        assert_eq!(AccountStatus::default(), AccountStatus::Active);
    }

    #[test]
    fn test_default_profile() {
        let identity = Identity::new("u1", "alice@example.com");
        let profile = Profile::default_for(&identity);

        assert_eq!(profile.user_id.as_str(), "u1");
        assert_eq!(profile.display_name, "alice");
        assert_eq!(profile.role, RoleId::user());
        assert_eq!(profile.status, AccountStatus::Active);
        assert!(profile.permissions.is_none());
    }

    #[test]
    fn test_profile_document_shape() {
        let identity = Identity::new("u1", "bob@example.com").with_display_name("Bob");
        let profile = Profile::default_for(&identity).with_role("admin");
        let json = serde_json::to_value(&profile).unwrap();

        assert_eq!(json["displayName"], "Bob");
        assert_eq!(json["role"], "admin");
        assert_eq!(json["status"], "active");
        assert!(json.get("userId").is_none());
        assert!(json.get("permissions").is_none());
    }

    #[test]
    fn test_profile_missing_fields_fall_back() {
        let json = serde_json::json!({ "email": "c@example.com" });
        let profile: Profile = serde_json::from_value(json).unwrap();

        assert_eq!(profile.role, RoleId::user());
        assert_eq!(profile.status, AccountStatus::Active);
    }
}
