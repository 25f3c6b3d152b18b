// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Profile subscriber.
//!
//! Keeps one live subscription on the signed-in identity's profile and
//! republishes every change as a [`ProfileEvent`].
//!
//! # Ordering
//!
//! Switching identity always tears the old subscription down, waiting for
//! its pump task to finish, before the new one is opened. Each subscription
//! carries a [`SubscriptionTicket`]; snapshots applied with a ticket that is
//! no longer current are discarded, so a late callback for a superseded
//! identity can never act.
//!
//! # Disabled Accounts
//!
//! A snapshot with `status == disabled` invalidates the ticket, raises a
//! fatal notice and ends the session, in that order. Ending the session
//! tears this subscription down, so the sign-out runs on its own task.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use warden_core::{
    AuthError, DocumentStore, EventBus, EventSubscriber, Identity, NoticeCenter, Profile,
    ProfileRepository, SnapshotEvent, StorageLayout, StoreError, UserId, WardenError,
    WardenResult,
};

use crate::session::SessionStore;

// =============================================================================
// Types
// =============================================================================

/// Identifies one subscription: the identity it was opened for and the
/// generation current at that time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionTicket {
    /// Identity the subscription belongs to.
    pub user_id: UserId,
    /// Generation at subscribe time.
    pub generation: u64,
}

/// What happened to a snapshot handed to [`ProfileSubscriber::apply_snapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOutcome {
    /// The snapshot updated the cached profile.
    Applied,
    /// The ticket was stale; nothing changed.
    Discarded,
    /// The profile is disabled and the session was ended.
    ForcedSignOut,
}

/// A profile change.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileEvent {
    /// A snapshot arrived. `None` when the profile document does not exist.
    Loaded {
        /// Owner of the profile.
        user_id: UserId,
        /// Current profile.
        profile: Option<Profile>,
    },
    /// The account was found disabled and signed out.
    Disabled {
        /// Owner of the profile.
        user_id: UserId,
    },
    /// The subscription reported an error. The cached profile is unchanged.
    Failed {
        /// Owner of the profile.
        user_id: UserId,
        /// Reported error.
        error: StoreError,
    },
    /// The subscription was torn down.
    Cleared {
        /// Owner of the torn-down subscription.
        user_id: UserId,
    },
}

#[derive(Debug, Default)]
struct SubscriberState {
    generation: u64,
    ticket: Option<SubscriptionTicket>,
    profile: Option<Profile>,
    loaded: bool,
}

impl SubscriberState {
    fn is_current(&self, ticket: &SubscriptionTicket) -> bool {
        self.generation == ticket.generation
            && self.ticket.as_ref().map(|t| &t.user_id) == Some(&ticket.user_id)
    }
}

#[derive(Debug)]
struct Inner {
    store: Arc<dyn DocumentStore>,
    layout: StorageLayout,
    session: SessionStore,
    notices: NoticeCenter,
    state: Mutex<SubscriberState>,
    pump: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    events: EventBus<ProfileEvent>,
}

// =============================================================================
// Profile Subscriber
// =============================================================================

/// Maintains the live profile subscription of the signed-in identity.
#[derive(Debug, Clone)]
pub struct ProfileSubscriber {
    inner: Arc<Inner>,
}

impl ProfileSubscriber {
    /// Creates a subscriber.
    pub fn new(session: SessionStore, notices: NoticeCenter) -> Self {
        let profiles: &ProfileRepository = session.profiles();
        Self {
            inner: Arc::new(Inner {
                store: profiles.store().clone(),
                layout: profiles.layout().clone(),
                session,
                notices,
                state: Mutex::new(SubscriberState::default()),
                pump: tokio::sync::Mutex::new(None),
                events: EventBus::new(64),
            }),
        }
    }

    /// Subscribes to profile events.
    pub fn subscribe(&self) -> EventSubscriber<ProfileEvent> {
        self.inner.events.subscribe()
    }

    /// Returns the cached profile.
    pub fn current_profile(&self) -> Option<Profile> {
        self.inner.state.lock().profile.clone()
    }

    /// Returns `true` once the first snapshot of the current subscription arrived.
    pub fn is_loaded(&self) -> bool {
        self.inner.state.lock().loaded
    }

    /// Returns the ticket of the current subscription.
    pub fn active_ticket(&self) -> Option<SubscriptionTicket> {
        let state = self.inner.state.lock();
        state
            .ticket
            .clone()
            .filter(|t| t.generation == state.generation)
    }

    /// Points the subscription at a new identity, or at none.
    ///
    /// The previous subscription is fully torn down first.
    pub async fn switch_identity(
        &self,
        identity: Option<&Identity>,
    ) -> WardenResult<Option<SubscriptionTicket>> {
        let mut pump = self.inner.pump.lock().await;

        let previous = {
            let mut state = self.inner.state.lock();
            state.generation += 1;
            state.profile = None;
            state.loaded = false;
            state.ticket.take()
        };
        if let Some(handle) = pump.take() {
            handle.abort();
            let _ = handle.await;
        }
        if let Some(previous) = previous {
            debug!(user_id = %previous.user_id, "Profile subscription torn down");
            self.inner.events.publish(ProfileEvent::Cleared {
                user_id: previous.user_id,
            });
        }

        let Some(identity) = identity else {
            return Ok(None);
        };

        let path = self.inner.layout.profile_path(&identity.id);
        let mut subscription = self.inner.store.subscribe(&path).await?;

        let ticket = {
            let mut state = self.inner.state.lock();
            let ticket = SubscriptionTicket {
                user_id: identity.id.clone(),
                generation: state.generation,
            };
            state.ticket = Some(ticket.clone());
            ticket
        };
        info!(user_id = %identity.id, generation = ticket.generation, "Profile subscription established");

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let pump_ticket = ticket.clone();
        *pump = Some(tokio::spawn(async move {
            while let Some(event) = subscription.next().await {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                ProfileSubscriber { inner }
                    .apply_snapshot(&pump_ticket, event)
                    .await;
            }
            debug!(user_id = %pump_ticket.user_id, "Profile feed ended");
        }));

        Ok(Some(ticket))
    }

    /// Applies one snapshot delivered for `ticket`.
    ///
    /// Stale tickets are discarded without side effects.
    pub async fn apply_snapshot(
        &self,
        ticket: &SubscriptionTicket,
        event: SnapshotEvent,
    ) -> SnapshotOutcome {
        {
            let mut state = self.inner.state.lock();
            if !state.is_current(ticket) {
                debug!(
                    user_id = %ticket.user_id,
                    generation = ticket.generation,
                    current = state.generation,
                    "Discarding stale profile snapshot"
                );
                return SnapshotOutcome::Discarded;
            }

            match event {
                SnapshotEvent::Snapshot(None) => {
                    debug!(user_id = %ticket.user_id, "Profile document absent");
                    state.profile = None;
                    state.loaded = true;
                    self.inner.events.publish(ProfileEvent::Loaded {
                        user_id: ticket.user_id.clone(),
                        profile: None,
                    });
                    return SnapshotOutcome::Applied;
                }
                SnapshotEvent::Snapshot(Some(document)) => {
                    match ProfileRepository::decode(&document) {
                        Ok(profile) => {
                            let disabled = profile.is_disabled();
                            state.profile = Some(profile.clone());
                            state.loaded = true;
                            if disabled {
                                state.generation += 1;
                            }
                            self.inner.events.publish(ProfileEvent::Loaded {
                                user_id: ticket.user_id.clone(),
                                profile: Some(profile),
                            });
                            if !disabled {
                                return SnapshotOutcome::Applied;
                            }
                        }
                        Err(e) => {
                            drop(state);
                            self.report(ticket, e);
                            return SnapshotOutcome::Applied;
                        }
                    }
                }
                SnapshotEvent::Error(e) => {
                    drop(state);
                    self.report(ticket, e);
                    return SnapshotOutcome::Applied;
                }
            }
        }

        self.force_sign_out(ticket).await;
        SnapshotOutcome::ForcedSignOut
    }

    fn report(&self, ticket: &SubscriptionTicket, error: StoreError) {
        warn!(user_id = %ticket.user_id, error = %error, "Profile subscription error");
        self.inner
            .notices
            .from_error(&WardenError::from(error.clone()));
        self.inner.events.publish(ProfileEvent::Failed {
            user_id: ticket.user_id.clone(),
            error,
        });
    }

    async fn force_sign_out(&self, ticket: &SubscriptionTicket) {
        warn!(user_id = %ticket.user_id, "Profile disabled, forcing sign-out");
        self.inner
            .notices
            .fatal("Account disabled", &AuthError::AccountDisabled.user_message());
        self.inner.events.publish(ProfileEvent::Disabled {
            user_id: ticket.user_id.clone(),
        });

        // Must outlive this pump, which the sign-out aborts.
        let session = self.inner.session.clone();
        let user_id = ticket.user_id.clone();
        let sign_out = tokio::spawn(async move { session.force_sign_out(&user_id).await });
        match sign_out.await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!(user_id = %ticket.user_id, error = %e, "Forced sign-out failed"),
            Err(e) => warn!(user_id = %ticket.user_id, error = %e, "Forced sign-out task failed"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use warden_core::memory::{MemoryAuthProvider, MemoryBlobStore, MemoryDocumentStore};
    use warden_core::{AccountStatus, Document, SetOptions};

    struct Fixture {
        subscriber: ProfileSubscriber,
        session: SessionStore,
        documents: MemoryDocumentStore,
        notices: NoticeCenter,
    }

    fn fixture() -> Fixture {
        let documents = MemoryDocumentStore::new();
        let profiles = ProfileRepository::new(Arc::new(documents.clone()), StorageLayout::default());
        let session = SessionStore::new(
            Arc::new(MemoryAuthProvider::new()),
            profiles,
            Arc::new(MemoryBlobStore::new()),
        );
        let notices = NoticeCenter::default();
        Fixture {
            subscriber: ProfileSubscriber::new(session.clone(), notices.clone()),
            session,
            documents,
            notices,
        }
    }

    async fn next_loaded(events: &mut EventSubscriber<ProfileEvent>) -> Option<Profile> {
        loop {
            if let ProfileEvent::Loaded { profile, .. } = events.recv().await.unwrap() {
                return profile;
            }
        }
    }

    #[tokio::test]
    async fn test_missing_profile_is_not_an_error() {
        let f = fixture();
        let mut events = f.subscriber.subscribe();
        let identity = Identity::new("u1", "a@example.com");

        f.subscriber.switch_identity(Some(&identity)).await.unwrap();

        assert_eq!(next_loaded(&mut events).await, None);
        assert!(f.subscriber.is_loaded());
        assert!(f.subscriber.current_profile().is_none());
    }

    #[tokio::test]
    async fn test_profile_changes_republished() {
        let f = fixture();
        let identity = f.session.sign_up("b@example.com", "secret1").await.unwrap();
        let mut events = f.subscriber.subscribe();

        f.subscriber.switch_identity(Some(&identity)).await.unwrap();
        assert!(next_loaded(&mut events).await.is_some());

        f.session.profiles().set_display_name(&identity.id, "Bea").await.unwrap();
        let profile = next_loaded(&mut events).await.unwrap();
        assert_eq!(profile.display_name, "Bea");
    }

    #[tokio::test]
    async fn test_switch_tears_down_before_resubscribing() {
        let f = fixture();
        let layout = StorageLayout::default();
        let a = Identity::new("a", "a@example.com");
        let b = Identity::new("b", "b@example.com");

        f.subscriber.switch_identity(Some(&a)).await.unwrap();
        assert_eq!(f.documents.subscriber_count(&layout.profile_path(&a.id)), 1);

        f.subscriber.switch_identity(Some(&b)).await.unwrap();
        assert_eq!(f.documents.subscriber_count(&layout.profile_path(&a.id)), 0);
        assert_eq!(f.documents.subscriber_count(&layout.profile_path(&b.id)), 1);

        f.subscriber.switch_identity(None).await.unwrap();
        assert_eq!(f.documents.subscriber_count(&layout.profile_path(&b.id)), 0);
        assert!(f.subscriber.active_ticket().is_none());
    }

    #[tokio::test]
    async fn test_stale_snapshot_discarded() {
        let f = fixture();
        let a = Identity::new("a", "a@example.com");
        let b = Identity::new("b", "b@example.com");

        let ticket_a = f.subscriber.switch_identity(Some(&a)).await.unwrap().unwrap();
        f.subscriber.switch_identity(Some(&b)).await.unwrap();

        let late = SnapshotEvent::Snapshot(Some(Document::new(
            "a",
            json!({ "email": "a@example.com", "status": "disabled" }),
        )));
        let outcome = f.subscriber.apply_snapshot(&ticket_a, late).await;

        assert_eq!(outcome, SnapshotOutcome::Discarded);
        assert!(!f.notices.has_fatal());
        assert_eq!(f.subscriber.active_ticket().map(|t| t.user_id), Some(b.id));
    }

    #[tokio::test]
    async fn test_disabled_profile_forces_sign_out() {
        let f = fixture();
        let identity = f.session.sign_up("c@example.com", "secret1").await.unwrap();
        let mut events = f.subscriber.subscribe();
        f.subscriber.switch_identity(Some(&identity)).await.unwrap();
        next_loaded(&mut events).await;

        f.session
            .profiles()
            .set_status(&identity.id, AccountStatus::Disabled)
            .await
            .unwrap();

        loop {
            if let ProfileEvent::Disabled { user_id } = events.recv().await.unwrap() {
                assert_eq!(user_id, identity.id);
                break;
            }
        }
        assert!(f.notices.has_fatal());
        assert!(f.subscriber.active_ticket().is_none());

        let mut identities = f.session.watch();
        tokio::time::timeout(std::time::Duration::from_secs(2), async {
            while identities.borrow_and_update().is_some() {
                identities.changed().await.unwrap();
            }
        })
        .await
        .unwrap();
        assert!(f.session.current_identity().is_none());
    }

    #[tokio::test]
    async fn test_subscription_error_keeps_profile() {
        let f = fixture();
        let identity = f.session.sign_up("d@example.com", "secret1").await.unwrap();
        let ticket = f.subscriber.switch_identity(Some(&identity)).await.unwrap().unwrap();
        let mut events = f.subscriber.subscribe();

        f.documents
            .set(
                &StorageLayout::default().profile_path(&identity.id),
                json!({ "email": "d@example.com", "role": "user" }),
                SetOptions::replace(),
            )
            .await
            .unwrap();
        next_loaded(&mut events).await;

        let outcome = f
            .subscriber
            .apply_snapshot(&ticket, SnapshotEvent::Error(StoreError::unavailable("reset")))
            .await;
        assert_eq!(outcome, SnapshotOutcome::Applied);
        assert!(f.subscriber.current_profile().is_some());
        assert_eq!(f.notices.list().len(), 1);
    }
}
