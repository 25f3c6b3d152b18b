// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Profile persistence on top of the document store.
//!
//! A profile must exist for every valid identity. Sign-up creates it, but
//! if that write is lost the next [`ProfileRepository::ensure`] recreates it
//! with the same defaults.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::store::{DocPath, Document, DocumentStore, SetOptions};
use crate::types::{AccountStatus, Identity, Profile, RoleId, UserId};

// =============================================================================
// Storage Layout
// =============================================================================

/// Names of the collections and prefixes used in the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageLayout {
    /// Collection holding one profile per user.
    pub users_collection: String,
    /// Collection holding role definitions.
    pub roles_collection: String,
    /// Per-user sub-collection holding settings documents.
    pub settings_collection: String,
    /// Key of the preferences document.
    pub preferences_key: String,
    /// Blob prefix for avatars.
    pub avatars_prefix: String,
}

impl Default for StorageLayout {
    fn default() -> Self {
        Self {
            users_collection: "users".to_string(),
            roles_collection: "roles".to_string(),
            settings_collection: "settings".to_string(),
            preferences_key: "preferences".to_string(),
            avatars_prefix: "avatars".to_string(),
        }
    }
}

impl StorageLayout {
    /// Path of a user's profile document.
    pub fn profile_path(&self, user_id: &UserId) -> DocPath {
        DocPath::new(&self.users_collection, user_id.as_str())
    }

    /// Path of a role definition document.
    pub fn role_path(&self, role: &RoleId) -> DocPath {
        DocPath::new(&self.roles_collection, role.as_str())
    }

    /// Path of a user's preferences document.
    pub fn preferences_path(&self, user_id: &UserId) -> DocPath {
        DocPath::new(
            format!(
                "{}/{}/{}",
                self.users_collection,
                user_id.as_str(),
                self.settings_collection
            ),
            &self.preferences_key,
        )
    }

    /// Blob prefix for a user's avatars, with trailing slash.
    pub fn avatar_prefix(&self, user_id: &UserId) -> String {
        format!("{}/{}/", self.avatars_prefix, user_id.as_str())
    }
}

// =============================================================================
// Profile Repository
// =============================================================================

/// Reads and writes profile documents.
#[derive(Debug, Clone)]
pub struct ProfileRepository {
    store: Arc<dyn DocumentStore>,
    layout: StorageLayout,
    default_role: RoleId,
}

impl ProfileRepository {
    /// Creates a repository over the given store.
    pub fn new(store: Arc<dyn DocumentStore>, layout: StorageLayout) -> Self {
        Self {
            store,
            layout,
            default_role: RoleId::user(),
        }
    }

    /// Sets the role given to newly created profiles.
    pub fn with_default_role(mut self, role: impl Into<RoleId>) -> Self {
        self.default_role = role.into();
        self
    }

    /// Returns the role given to newly created profiles.
    pub fn default_role(&self) -> &RoleId {
        &self.default_role
    }

    /// Returns the storage layout.
    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Returns the underlying document store.
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Decodes a profile document, taking the user ID from its key.
    pub fn decode(document: &Document) -> StoreResult<Profile> {
        let mut profile: Profile = document.decode()?;
        profile.user_id = UserId::new(&document.key);
        Ok(profile)
    }

    /// Reads a profile. Returns `Ok(None)` when it does not exist.
    pub async fn get(&self, user_id: &UserId) -> StoreResult<Option<Profile>> {
        let path = self.layout.profile_path(user_id);
        match self.store.get(&path).await? {
            Some(document) => Self::decode(&document).map(Some),
            None => Ok(None),
        }
    }

    /// Writes the default profile for an identity, replacing any existing one.
    pub async fn create_default(&self, identity: &Identity) -> StoreResult<Profile> {
        let profile = Profile::default_for(identity).with_role(self.default_role.clone());
        let data = serde_json::to_value(&profile)?;
        self.store
            .set(&self.layout.profile_path(&identity.id), data, SetOptions::replace())
            .await?;

        debug!(user_id = %identity.id, role = %profile.role, "Profile created");
        Ok(profile)
    }

    /// Returns the identity's profile, recreating it with defaults if missing.
    pub async fn ensure(&self, identity: &Identity) -> StoreResult<Profile> {
        if let Some(profile) = self.get(&identity.id).await? {
            return Ok(profile);
        }

        info!(user_id = %identity.id, "Profile missing, recreating with defaults");
        self.create_default(identity).await
    }

    /// Lists every profile.
    pub async fn list(&self) -> StoreResult<Vec<Profile>> {
        let documents = self.store.list_collection(&self.layout.users_collection).await?;
        documents.iter().map(Self::decode).collect()
    }

    /// Merges fields into a profile and bumps `updatedAt`.
    pub async fn update_fields(&self, user_id: &UserId, mut fields: Value) -> StoreResult<()> {
        let object = fields
            .as_object_mut()
            .ok_or_else(|| StoreError::serialization("profile update must be an object"))?;
        object.insert("updatedAt".to_string(), serde_json::to_value(Utc::now())?);

        self.store
            .set(&self.layout.profile_path(user_id), fields, SetOptions::merge())
            .await
    }

    /// Sets the role tag.
    pub async fn set_role(&self, user_id: &UserId, role: &RoleId) -> StoreResult<()> {
        self.update_fields(user_id, json!({ "role": role.as_str() })).await
    }

    /// Sets the account status.
    pub async fn set_status(&self, user_id: &UserId, status: AccountStatus) -> StoreResult<()> {
        self.update_fields(user_id, json!({ "status": status.as_str() })).await
    }

    /// Sets the display name.
    pub async fn set_display_name(&self, user_id: &UserId, name: &str) -> StoreResult<()> {
        self.update_fields(user_id, json!({ "displayName": name })).await
    }

    /// Sets or clears the avatar URL.
    pub async fn set_photo_url(&self, user_id: &UserId, url: Option<&str>) -> StoreResult<()> {
        self.update_fields(user_id, json!({ "photoURL": url })).await
    }

    /// Deletes a profile.
    pub async fn delete(&self, user_id: &UserId) -> StoreResult<()> {
        self.store.delete(&self.layout.profile_path(user_id)).await
    }
}

// =============================================================================
// Tests
// =============================================================================
