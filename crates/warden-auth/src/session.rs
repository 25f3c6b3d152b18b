// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Session store.
//!
//! Owns the authenticated identity for its lifetime and republishes the
//! provider's identity changes. Sign-up also creates the profile; if that
//! write fails the identity stays valid and the profile is recreated lazily
//! by [`ProfileRepository::ensure`].
//!
//! Registered [`SessionListener`]s are told before a session ends, and
//! before an account's documents are deleted, so per-identity caches are
//! gone by the time the identity is.

use std::sync::Arc;

use serde_json::json;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use warden_core::audit::{self, AuditAction, AuditLog, AuditLogger, NoOpAuditLogger};
use warden_core::{
    AuthError, AuthProvider, BlobStore, Credentials, Identity, ProfileRepository,
    SessionListener, UserId, WardenResult,
};

use crate::password::PasswordPolicy;

/// The session store.
#[derive(Debug, Clone)]
pub struct SessionStore {
    provider: Arc<dyn AuthProvider>,
    profiles: ProfileRepository,
    blobs: Arc<dyn BlobStore>,
    audit: Arc<dyn AuditLogger>,
    policy: PasswordPolicy,
    listeners: Vec<Arc<dyn SessionListener>>,
}

impl SessionStore {
    /// Creates a session store.
    pub fn new(
        provider: Arc<dyn AuthProvider>,
        profiles: ProfileRepository,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            provider,
            profiles,
            blobs,
            audit: Arc::new(NoOpAuditLogger::new()),
            policy: PasswordPolicy::default(),
            listeners: Vec::new(),
        }
    }

    /// Sets the audit sink.
    pub fn with_audit(mut self, audit: Arc<dyn AuditLogger>) -> Self {
        self.audit = audit;
        self
    }

    /// Sets the password policy.
    pub fn with_policy(mut self, policy: PasswordPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Registers a listener told before each session ends.
    pub fn with_listener(mut self, listener: Arc<dyn SessionListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Returns the profile repository.
    pub fn profiles(&self) -> &ProfileRepository {
        &self.profiles
    }

    /// Returns the password policy.
    pub fn policy(&self) -> &PasswordPolicy {
        &self.policy
    }

    // =========================================================================
    // Identity
    // =========================================================================

    /// Returns the signed-in identity.
    pub fn current_identity(&self) -> Option<Identity> {
        self.provider.current_identity()
    }

    /// Returns a receiver notified on every identity change.
    pub fn watch(&self) -> watch::Receiver<Option<Identity>> {
        self.provider.watch_identity()
    }

    fn require_identity(&self) -> Result<Identity, AuthError> {
        self.provider.current_identity().ok_or(AuthError::NotSignedIn)
    }

    /// Creates an account, signs it in and writes its default profile.
    pub async fn sign_up(&self, email: &str, password: &str) -> WardenResult<Identity> {
        self.policy.check(password)?;
        let identity = self
            .provider
            .sign_up(&Credentials::new(email, password))
            .await?;

        match self.profiles.create_default(&identity).await {
            Ok(_) => info!(user_id = %identity.id, "Account created"),
            Err(e) => warn!(
                user_id = %identity.id,
                error = %e,
                "Profile creation failed after sign-up; it will be recreated on next load"
            ),
        }

        self.record(
            AuditLog::new(AuditAction::SignIn)
                .actor(&identity.id)
                .detail(json!({ "signUp": true })),
        )
        .await;
        Ok(identity)
    }

    /// Signs in with email and password.
    pub async fn sign_in(&self, email: &str, password: &str) -> WardenResult<Identity> {
        match self
            .provider
            .sign_in(&Credentials::new(email, password))
            .await
        {
            Ok(identity) => {
                info!(user_id = %identity.id, "Signed in");
                self.record(AuditLog::new(AuditAction::SignIn).actor(&identity.id))
                    .await;
                Ok(identity)
            }
            Err(e) => {
                debug!(error_type = e.error_type(), "Sign-in failed");
                self.record(AuditLog::new(AuditAction::SignIn).target(email).failed(&e))
                    .await;
                Err(e.into())
            }
        }
    }

    /// Signs out the current identity.
    pub async fn sign_out(&self) -> WardenResult<()> {
        let previous = self.provider.current_identity();
        if let Some(ref identity) = previous {
            self.end_session(&identity.id).await;
        }
        self.provider.sign_out().await?;

        if let Some(identity) = previous {
            info!(user_id = %identity.id, "Signed out");
            self.record(AuditLog::new(AuditAction::SignOut).actor(&identity.id))
                .await;
        }
        Ok(())
    }

    /// Ends the session of a disabled account.
    ///
    /// Only acts while `user_id` is still the signed-in identity.
    pub async fn force_sign_out(&self, user_id: &UserId) -> WardenResult<bool> {
        let current = self.provider.current_identity();
        if current.as_ref().map(|i| &i.id) != Some(user_id) {
            return Ok(false);
        }

        self.end_session(user_id).await;
        self.provider.sign_out().await?;
        warn!(user_id = %user_id, "Account disabled, session ended");
        self.record(
            AuditLog::new(AuditAction::ForcedSignOut)
                .target(user_id.as_str())
                .detail(json!({ "reason": "account_disabled" })),
        )
        .await;
        Ok(true)
    }

    /// Sends a password reset email.
    pub async fn request_password_reset(&self, email: &str) -> WardenResult<()> {
        self.provider.send_password_reset(email).await?;
        debug!("Password reset email requested");
        Ok(())
    }

    // =========================================================================
    // Account Security
    // =========================================================================

    /// Changes the password after re-authenticating with the current one.
    pub async fn change_password(
        &self,
        current: &str,
        new_password: &str,
        confirm: &str,
    ) -> WardenResult<()> {
        let identity = self.require_identity()?;
        self.policy.check_new(new_password, confirm)?;

        self.provider
            .reauthenticate(&Credentials::new(&identity.email, current))
            .await?;
        self.provider.update_password(new_password).await?;

        info!(user_id = %identity.id, "Password changed");
        Ok(())
    }

    /// Sends a verification email to the signed-in identity.
    pub async fn send_verification_email(&self) -> WardenResult<()> {
        let identity = self.require_identity()?;
        if identity.email_verified {
            return Err(AuthError::AlreadyVerified.into());
        }
        self.provider.send_email_verification().await?;
        debug!(user_id = %identity.id, "Verification email sent");
        Ok(())
    }

    /// Deletes the signed-in account and everything stored for it.
    ///
    /// Listeners are told first. Then the order is preferences, avatars,
    /// profile and finally the provider account.
    pub async fn delete_account(&self, password: &str) -> WardenResult<()> {
        let identity = self.require_identity()?;
        self.provider
            .reauthenticate(&Credentials::new(&identity.email, password))
            .await?;
        self.end_session(&identity.id).await;

        let layout = self.profiles.layout();
        let store = self.profiles.store();
        store.delete(&layout.preferences_path(&identity.id)).await?;

        for blob in self.blobs.list(&layout.avatar_prefix(&identity.id)).await? {
            self.blobs.delete(&blob).await?;
        }

        self.profiles.delete(&identity.id).await?;
        self.provider.delete_current_user().await?;

        info!(user_id = %identity.id, "Account deleted");
        self.record(
            AuditLog::new(AuditAction::AccountDeleted)
                .actor(&identity.id)
                .target(identity.id.as_str()),
        )
        .await;
        Ok(())
    }

    // =========================================================================
    // Profile Maintenance
    // =========================================================================

    /// Updates the display name of the signed-in identity.
    pub async fn update_display_name(&self, name: &str) -> WardenResult<()> {
        let identity = self.require_identity()?;
        let name = name.trim();
        if name.is_empty() {
            return Err(warden_core::StoreError::rejected("display name cannot be empty").into());
        }
        self.profiles.set_display_name(&identity.id, name).await?;
        Ok(())
    }

    /// Uploads an avatar and stores its URL on the profile.
    ///
    /// Previous avatars of the identity are deleted afterwards.
    pub async fn upload_avatar(&self, file_name: &str, bytes: Vec<u8>) -> WardenResult<String> {
        let identity = self.require_identity()?;
        let prefix = self.profiles.layout().avatar_prefix(&identity.id);
        let key = format!("{}{}", prefix, sanitize_file_name(file_name));

        let blob = self.blobs.upload(&key, bytes).await?;
        let url = self.blobs.url(&blob).await?;
        self.profiles.set_photo_url(&identity.id, Some(&url)).await?;

        for old in self.blobs.list(&prefix).await? {
            if old != blob {
                if let Err(e) = self.blobs.delete(&old).await {
                    warn!(blob = %old, error = %e, "Failed to delete previous avatar");
                }
            }
        }

        debug!(user_id = %identity.id, blob = %blob, "Avatar updated");
        Ok(url)
    }

    /// Removes every avatar and clears the profile URL.
    pub async fn remove_avatar(&self) -> WardenResult<()> {
        let identity = self.require_identity()?;
        let prefix = self.profiles.layout().avatar_prefix(&identity.id);
        for blob in self.blobs.list(&prefix).await? {
            self.blobs.delete(&blob).await?;
        }
        self.profiles.set_photo_url(&identity.id, None).await?;
        Ok(())
    }

    async fn end_session(&self, user_id: &UserId) {
        for listener in &self.listeners {
            listener.session_ending(user_id).await;
        }
    }

    async fn record(&self, entry: AuditLog) {
        audit::record(&self.audit, entry).await;
    }
}

fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "avatar".to_string()
    } else {
        cleaned
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::memory::{MemoryAuthProvider, MemoryBlobStore, MemoryDocumentStore};
    use warden_core::{
        AccountStatus, DocumentStore, InMemoryAuditLogger, RoleId, SetOptions, StorageLayout,
        WardenError,
    };

    struct Fixture {
        session: SessionStore,
        provider: MemoryAuthProvider,
        documents: MemoryDocumentStore,
        blobs: MemoryBlobStore,
        audit: InMemoryAuditLogger,
    }

    fn fixture() -> Fixture {
        let provider = MemoryAuthProvider::new();
        let documents = MemoryDocumentStore::new();
        let blobs = MemoryBlobStore::new();
        let audit = InMemoryAuditLogger::new();
        let profiles = ProfileRepository::new(Arc::new(documents.clone()), StorageLayout::default());
        let session = SessionStore::new(Arc::new(provider.clone()), profiles, Arc::new(blobs.clone()))
            .with_audit(Arc::new(audit.clone()));
        Fixture {
            session,
            provider,
            documents,
            blobs,
            audit,
        }
    }

    #[tokio::test]
    async fn test_sign_up_creates_profile() {
        let f = fixture();
        let identity = f.session.sign_up("gil@example.com", "secret1").await.unwrap();

        let profile = f.session.profiles().get(&identity.id).await.unwrap().unwrap();
        assert_eq!(profile.role, RoleId::user());
        assert_eq!(profile.status, AccountStatus::Active);
        assert_eq!(f.session.current_identity(), Some(identity));
    }

    #[tokio::test]
    async fn test_sign_up_weak_password_never_reaches_provider() {
        let f = fixture();
        let err = f.session.sign_up("gil@example.com", "123").await.unwrap_err();

        assert!(matches!(err, WardenError::Auth(AuthError::WeakSecret { .. })));
        assert!(!f.provider.has_account("gil@example.com"));
    }

    #[tokio::test]
    async fn test_sign_up_survives_profile_write_failure() {
        let f = fixture();
        f.documents.set_offline(true);

        let identity = f.session.sign_up("hal@example.com", "secret1").await.unwrap();
        f.documents.set_offline(false);
        assert!(f.session.profiles().get(&identity.id).await.unwrap().is_none());

        let healed = f.session.profiles().ensure(&identity).await.unwrap();
        assert_eq!(healed.role, RoleId::user());
        assert_eq!(healed.status, AccountStatus::Active);
    }

    #[tokio::test]
    async fn test_distinct_credential_errors() {
        let f = fixture();
        f.session.sign_up("ivy@example.com", "secret1").await.unwrap();
        f.session.sign_out().await.unwrap();

        let wrong = f.session.sign_in("ivy@example.com", "nope").await.unwrap_err();
        assert!(matches!(wrong, WardenError::Auth(AuthError::InvalidCredential)));

        let taken = f.session.sign_up("ivy@example.com", "secret1").await.unwrap_err();
        assert!(matches!(taken, WardenError::Auth(AuthError::EmailInUse { .. })));

        assert_eq!(f.audit.entries_for_action(AuditAction::SignOut).len(), 1);
    }

    #[tokio::test]
    async fn test_change_password() {
        let f = fixture();
        f.session.sign_up("jo@example.com", "secret1").await.unwrap();

        let err = f.session.change_password("secret1", "secret2", "secret3").await.unwrap_err();
        assert!(matches!(err, WardenError::Auth(AuthError::PasswordMismatch)));

        let err = f.session.change_password("wrong!", "secret2", "secret2").await.unwrap_err();
        assert!(matches!(err, WardenError::Auth(AuthError::InvalidCredential)));

        f.session.change_password("secret1", "secret2", "secret2").await.unwrap();
        f.session.sign_out().await.unwrap();
        assert!(f.session.sign_in("jo@example.com", "secret2").await.is_ok());
    }

    #[tokio::test]
    async fn test_verification_email() {
        let f = fixture();
        f.session.sign_up("kai@example.com", "secret1").await.unwrap();
        f.session.send_verification_email().await.unwrap();
        assert_eq!(f.provider.outbox().len(), 1);

        f.provider.verify_email("kai@example.com");
        let err = f.session.send_verification_email().await.unwrap_err();
        assert!(matches!(err, WardenError::Auth(AuthError::AlreadyVerified)));
    }

    #[tokio::test]
    async fn test_avatar_replacement() {
        let f = fixture();
        let identity = f.session.sign_up("lu@example.com", "secret1").await.unwrap();

        f.session.upload_avatar("first.png", vec![1]).await.unwrap();
        let url = f.session.upload_avatar("../second photo.png", vec![2]).await.unwrap();

        assert_eq!(url, format!("memory://avatars/{}/second_photo.png", identity.id));
        assert_eq!(f.blobs.len(), 1);
        let profile = f.session.profiles().get(&identity.id).await.unwrap().unwrap();
        assert_eq!(profile.photo_url.as_deref(), Some(url.as_str()));
    }

    #[tokio::test]
    async fn test_delete_account_removes_everything() {
        let f = fixture();
        let identity = f.session.sign_up("mo@example.com", "secret1").await.unwrap();
        let layout = StorageLayout::default();
        f.documents
            .set(
                &layout.preferences_path(&identity.id),
                serde_json::json!({ "theme": { "mode": "dark" } }),
                SetOptions::replace(),
            )
            .await
            .unwrap();
        f.session.upload_avatar("me.png", vec![9]).await.unwrap();

        f.session.delete_account("secret1").await.unwrap();

        assert!(f.documents.peek(&layout.preferences_path(&identity.id)).is_none());
        assert!(f.documents.peek(&layout.profile_path(&identity.id)).is_none());
        assert!(f.blobs.is_empty());
        assert!(!f.provider.has_account("mo@example.com"));
        assert!(f.session.current_identity().is_none());
        assert_eq!(f.audit.entries_for_action(AuditAction::AccountDeleted).len(), 1);
    }

    #[tokio::test]
    async fn test_force_sign_out_only_for_current_identity() {
        let f = fixture();
        let identity = f.session.sign_up("ned@example.com", "secret1").await.unwrap();

        assert!(!f.session.force_sign_out(&UserId::new("someone-else")).await.unwrap());
        assert!(f.session.current_identity().is_some());

        assert!(f.session.force_sign_out(&identity.id).await.unwrap());
        assert!(f.session.current_identity().is_none());
        assert_eq!(f.audit.entries_for_action(AuditAction::ForcedSignOut).len(), 1);
    }

    #[derive(Debug, Default)]
    struct RecordingListener {
        ended: parking_lot::Mutex<Vec<UserId>>,
    }

    #[async_trait::async_trait]
    impl SessionListener for RecordingListener {
        async fn session_ending(&self, user_id: &UserId) {
            self.ended.lock().push(user_id.clone());
        }
    }

    #[tokio::test]
    async fn test_listeners_told_before_session_ends() {
        let f = fixture();
        let listener = Arc::new(RecordingListener::default());
        let session = f.session.clone().with_listener(listener.clone());

        let first = session.sign_up("ola@example.com", "secret1").await.unwrap();
        session.sign_out().await.unwrap();
        session.sign_out().await.unwrap();

        let second = session.sign_up("pia@example.com", "secret1").await.unwrap();
        session.force_sign_out(&first.id).await.unwrap();
        session.force_sign_out(&second.id).await.unwrap();

        let third = session.sign_up("quin@example.com", "secret1").await.unwrap();
        session.delete_account("wrong!").await.unwrap_err();
        session.delete_account("secret1").await.unwrap();

        assert_eq!(
            *listener.ended.lock(),
            vec![first.id, second.id, third.id]
        );
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("a/b/c.png"), "c.png");
        assert_eq!(sanitize_file_name("my pic.jpg"), "my_pic.jpg");
        assert_eq!(sanitize_file_name("dir/"), "avatar");
    }
}
