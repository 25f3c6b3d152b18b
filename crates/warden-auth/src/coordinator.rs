// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Access coordinator.
//!
//! Drives the chain session → profile subscription → registry and publishes
//! the resulting [`AccessContext`] on a `watch` channel. Gates bound to that
//! channel re-evaluate on every change.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use warden_core::{Identity, NoticeCenter, Profile, UserId, WardenError};

use crate::context::AccessContext;
use crate::gate::{Gate, GateWatcher};
use crate::registry::RoleRegistry;
use crate::session::SessionStore;
use crate::subscriber::{ProfileEvent, ProfileSubscriber};

/// Publishes the live access context.
#[derive(Debug, Clone)]
pub struct AccessCoordinator {
    session: SessionStore,
    subscriber: ProfileSubscriber,
    registry: Arc<RoleRegistry>,
    notices: NoticeCenter,
    contexts: Arc<watch::Sender<Arc<AccessContext>>>,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl AccessCoordinator {
    /// Creates a coordinator. Nothing happens until [`start`](Self::start).
    pub fn new(
        session: SessionStore,
        subscriber: ProfileSubscriber,
        registry: Arc<RoleRegistry>,
        notices: NoticeCenter,
    ) -> Self {
        let (tx, _) = watch::channel(Arc::new(AccessContext::anonymous()));
        Self {
            session,
            subscriber,
            registry,
            notices,
            contexts: Arc::new(tx),
            task: Arc::new(Mutex::new(None)),
        }
    }

    /// Starts following the session. Calling it twice has no effect.
    pub fn start(&self) {
        let mut task = self.task.lock();
        if task.is_some() {
            return;
        }
        let driver = self.clone();
        *task = Some(tokio::spawn(async move { driver.run().await }));
        info!("Access coordinator started");
    }

    /// Stops following the session and tears the profile subscription down.
    pub async fn stop(&self) {
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            handle.abort();
            let _ = handle.await;
        }
        if let Err(e) = self.subscriber.switch_identity(None).await {
            warn!(error = %e, "Failed to tear down profile subscription");
        }
        self.publish(AccessContext::anonymous());
        info!("Access coordinator stopped");
    }

    /// Returns the current context.
    pub fn current(&self) -> Arc<AccessContext> {
        self.contexts.borrow().clone()
    }

    /// Returns a receiver for context changes.
    pub fn contexts(&self) -> watch::Receiver<Arc<AccessContext>> {
        self.contexts.subscribe()
    }

    /// Binds a gate to the live context.
    pub fn watch_gate(&self, gate: Gate) -> GateWatcher {
        gate.watch(self.contexts())
    }

    /// Waits until the context satisfies `predicate` and returns it.
    ///
    /// Returns `None` if the coordinator is dropped first.
    pub async fn wait_for<F>(&self, predicate: F) -> Option<Arc<AccessContext>>
    where
        F: Fn(&AccessContext) -> bool,
    {
        let mut rx = self.contexts();
        loop {
            let ctx = rx.borrow_and_update().clone();
            if predicate(&ctx) {
                return Some(ctx);
            }
            rx.changed().await.ok()?;
        }
    }

    // =========================================================================
    // Driver
    // =========================================================================

    async fn run(self) {
        let mut identities = self.session.watch();
        let mut profiles = self.subscriber.subscribe();
        let mut roles = self.registry.subscribe();

        let initial = identities.borrow_and_update().clone();
        self.on_identity(initial).await;

        loop {
            tokio::select! {
                changed = identities.changed() => {
                    if changed.is_err() {
                        debug!("Identity source closed");
                        break;
                    }
                    let identity = identities.borrow_and_update().clone();
                    self.on_identity(identity).await;
                }
                event = profiles.recv() => match event {
                    Ok(event) => self.on_profile_event(event),
                    Err(_) => break,
                },
                event = roles.recv() => match event {
                    Ok(event) => {
                        debug!(event = ?event, "Registry changed, re-resolving access");
                        self.refresh();
                    }
                    Err(_) => break,
                },
            }
        }
    }

    async fn on_identity(&self, identity: Option<Identity>) {
        match identity {
            Some(identity) => {
                info!(user_id = %identity.id, "Identity changed, resolving access");
                self.notices.clear_fatal();
                self.publish(AccessContext::pending(identity.clone()));
                if let Err(e) = self.subscriber.switch_identity(Some(&identity)).await {
                    warn!(user_id = %identity.id, error = %e, "Profile subscription failed");
                    self.notices.from_error(&e);
                }
            }
            None => {
                if let Err(e) = self.subscriber.switch_identity(None).await {
                    warn!(error = %e, "Failed to tear down profile subscription");
                }
                info!("Signed out, access cleared");
                self.publish(AccessContext::anonymous());
            }
        }
    }

    fn on_profile_event(&self, event: ProfileEvent) {
        match event {
            ProfileEvent::Loaded { user_id, profile } => self.resolve_for(&user_id, profile),
            ProfileEvent::Disabled { user_id } => {
                debug!(user_id = %user_id, "Profile disabled, waiting for sign-out");
            }
            ProfileEvent::Failed { user_id, error } => {
                debug!(user_id = %user_id, error = %WardenError::from(error), "Profile feed error");
            }
            ProfileEvent::Cleared { .. } => {}
        }
    }

    fn resolve_for(&self, user_id: &UserId, profile: Option<Profile>) {
        let Some(identity) = self.session.current_identity() else {
            debug!(user_id = %user_id, "Profile arrived after sign-out, ignored");
            return;
        };
        if &identity.id != user_id {
            debug!(user_id = %user_id, current = %identity.id, "Profile for another identity, ignored");
            return;
        }
        let ctx = AccessContext::resolve(identity, profile, &self.registry);
        debug!(
            user_id = %user_id,
            role = ?ctx.role_id().map(|r| r.as_str()),
            permissions = ctx.permissions().len(),
            "Access resolved"
        );
        self.publish(ctx);
    }

    fn refresh(&self) {
        let current = self.current();
        let Some(identity) = current.identity().cloned() else {
            return;
        };
        if current.is_pending() {
            return;
        }
        self.resolve_for(&identity.id, self.subscriber.current_profile());
    }

    fn publish(&self, ctx: AccessContext) {
        self.contexts.send_replace(Arc::new(ctx));
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use warden_core::memory::{MemoryAuthProvider, MemoryBlobStore, MemoryDocumentStore};
    use warden_core::{
        AccountStatus, AuditLog, AuditLogger, NoOpAuditLogger, ProfileRepository, StorageLayout,
        StoreResult,
    };

    use crate::gate::GateDecision;
    use crate::registry::RoleUpdate;

    struct Fixture {
        coordinator: AccessCoordinator,
        session: SessionStore,
        registry: Arc<RoleRegistry>,
        notices: NoticeCenter,
    }

    /// Audit sink that yields before every entry, like a remote one.
    #[derive(Debug)]
    struct YieldingAudit;

    #[async_trait::async_trait]
    impl AuditLogger for YieldingAudit {
        async fn log(&self, _entry: AuditLog) -> StoreResult<()> {
            tokio::task::yield_now().await;
            Ok(())
        }
    }

    async fn fixture() -> Fixture {
        fixture_with_audit(Arc::new(NoOpAuditLogger::new())).await
    }

    async fn fixture_with_audit(audit: Arc<dyn AuditLogger>) -> Fixture {
        let documents = Arc::new(MemoryDocumentStore::new());
        let profiles = ProfileRepository::new(documents.clone(), StorageLayout::default());
        let session = SessionStore::new(
            Arc::new(MemoryAuthProvider::new()),
            profiles,
            Arc::new(MemoryBlobStore::new()),
        )
        .with_audit(audit);
        let registry = Arc::new(RoleRegistry::builder(documents).build());
        registry.load().await.unwrap();
        let notices = NoticeCenter::default();
        let subscriber = ProfileSubscriber::new(session.clone(), notices.clone());
        let coordinator =
            AccessCoordinator::new(session.clone(), subscriber, registry.clone(), notices.clone());
        coordinator.start();
        Fixture {
            coordinator,
            session,
            registry,
            notices,
        }
    }

    async fn settle<F>(f: &Fixture, predicate: F) -> Arc<AccessContext>
    where
        F: Fn(&AccessContext) -> bool,
    {
        tokio::time::timeout(Duration::from_secs(2), f.coordinator.wait_for(predicate))
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_sign_in_resolves_context() {
        let f = fixture().await;
        f.session.sign_up("ivy@example.com", "secret1").await.unwrap();

        let ctx = settle(&f, |c| c.profile().is_some()).await;
        assert!(ctx.has_permission("read"));
        assert!(!ctx.has_permission("write"));

        f.session.sign_out().await.unwrap();
        let ctx = settle(&f, |c| !c.is_authenticated()).await;
        assert!(!ctx.has_permission("read"));
    }

    #[tokio::test]
    async fn test_role_change_propagates_to_gate() {
        let f = fixture().await;
        let identity = f.session.sign_up("jo@example.com", "secret1").await.unwrap();
        let mut watcher = f
            .coordinator
            .watch_gate(Gate::new("/management/users").require_permission("manage_users"));
        settle(&f, |c| c.profile().is_some()).await;
        assert!(watcher.decision().is_deny());

        f.session
            .profiles()
            .set_role(&identity.id, &warden_core::RoleId::admin())
            .await
            .unwrap();
        let current = watcher.decision();
        let next = tokio::time::timeout(Duration::from_secs(2), watcher.transition_from(&current))
        .await
        .unwrap()
        .unwrap();
        assert_eq!(next, GateDecision::Render);
    }

    #[tokio::test]
    async fn test_registry_change_re_resolves() {
        let f = fixture().await;
        let identity = f.session.sign_up("kim@example.com", "secret1").await.unwrap();
        f.session
            .profiles()
            .set_role(&identity.id, &warden_core::RoleId::new("editor"))
            .await
            .unwrap();
        settle(&f, |c| c.has_role("editor")).await;

        let profile = f.session.profiles().get(&identity.id).await.unwrap().unwrap();
        let root = AccessContext::for_profile(profile.with_role("super_admin"), &f.registry);
        f.registry
            .update_role(&root, &"editor".into(), RoleUpdate::new().permissions(["read", "delete"]))
            .await
            .unwrap();

        let ctx = settle(&f, |c| c.has_permission("delete")).await;
        assert!(!ctx.has_permission("write"));
    }

    #[tokio::test]
    async fn test_disablement_signs_out() {
        let f = fixture().await;
        let identity = f.session.sign_up("lee@example.com", "secret1").await.unwrap();
        settle(&f, |c| c.profile().is_some()).await;

        f.session
            .profiles()
            .set_status(&identity.id, AccountStatus::Disabled)
            .await
            .unwrap();

        settle(&f, |c| !c.is_authenticated()).await;
        assert!(f.session.current_identity().is_none());
        assert!(f.notices.has_fatal());

        f.session
            .profiles()
            .set_status(&identity.id, AccountStatus::Active)
            .await
            .unwrap();
        f.session.sign_in("lee@example.com", "secret1").await.unwrap();
        settle(&f, |c| c.profile().is_some()).await;
        assert!(!f.notices.has_fatal());
    }

    #[tokio::test]
    async fn test_disablement_notice_survives_slow_audit() {
        let f = fixture_with_audit(Arc::new(YieldingAudit)).await;
        let identity = f.session.sign_up("ned@example.com", "secret1").await.unwrap();
        settle(&f, |c| c.profile().is_some()).await;

        f.session
            .profiles()
            .set_status(&identity.id, AccountStatus::Disabled)
            .await
            .unwrap();

        settle(&f, |c| !c.is_authenticated()).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(f.session.current_identity().is_none());
        assert!(f.notices.has_fatal());
    }

    #[tokio::test]
    async fn test_stop_clears_context() {
        let f = fixture().await;
        f.session.sign_up("max@example.com", "secret1").await.unwrap();
        settle(&f, |c| c.profile().is_some()).await;

        f.coordinator.stop().await;
        assert!(!f.coordinator.current().is_authenticated());
    }
}
