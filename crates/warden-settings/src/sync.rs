// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Settings synchronizer.
//!
//! Keeps a local copy of each identity's [`PreferenceSet`] and persists
//! changes to `users/{uid}/settings/preferences`.
//!
//! # Writes
//!
//! - `save` applies the change locally first, then merge-writes only the
//!   changed fields. Writes of one identity are serialized, so the stored
//!   document always reflects the last committed value of each field.
//! - Every in-flight field carries a pending generation. A failed write
//!   rolls a field back to its last confirmed value unless a newer change
//!   to that field has been made in the meantime.
//! - `preview` changes the local copy only. `commit` persists everything
//!   previewed; `schedule_commit` does so after the debounce interval, and
//!   each call restarts the interval.
//!
//! # Lifecycle
//!
//! Loads of one identity are serialized, so the defaults are written at
//! most once and never over a document a finished load already saved to.
//! Registered as a [`SessionListener`], the synchronizer drops an identity's
//! entry when its session ends: the debounced commit is cancelled, an
//! in-flight write is waited for, and writes queued behind it are dropped.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use warden_core::{
    DocPath, EventBus, EventSubscriber, Identity, ProfileRepository, SessionListener,
    SetOptions, UserId,
};

use crate::error::{SettingsError, SettingsResult};
use crate::preferences::{PreferenceField, PreferenceSet, PreferenceUpdate};

/// Default debounce interval for [`SettingsSynchronizer::schedule_commit`].
pub const DEFAULT_COMMIT_DEBOUNCE: Duration = Duration::from_millis(500);

// =============================================================================
// Events
// =============================================================================

/// A preference change.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsEvent {
    /// Preferences were loaded (or created with defaults).
    Loaded {
        /// The identity.
        user_id: UserId,
        /// Loaded preferences.
        prefs: PreferenceSet,
    },
    /// The local copy changed.
    Changed {
        /// The identity.
        user_id: UserId,
        /// Local preferences.
        prefs: PreferenceSet,
    },
    /// A write was confirmed.
    Persisted {
        /// The identity.
        user_id: UserId,
        /// Persisted fields.
        fields: Vec<PreferenceField>,
    },
    /// A write failed and fields were restored.
    RolledBack {
        /// The identity.
        user_id: UserId,
        /// Restored fields.
        fields: Vec<PreferenceField>,
        /// Cause.
        error: SettingsError,
    },
}

// =============================================================================
// Per-identity state
// =============================================================================

#[derive(Debug)]
struct EntryState {
    confirmed: PreferenceSet,
    local: PreferenceSet,
    pending: HashMap<PreferenceField, u64>,
    previewed: BTreeSet<PreferenceField>,
    generation: u64,
}

#[derive(Debug)]
struct Entry {
    state: Mutex<EntryState>,
    write_lock: tokio::sync::Mutex<()>,
    debounce: Mutex<Option<JoinHandle<()>>>,
}

impl Entry {
    fn new(prefs: PreferenceSet) -> Self {
        Self {
            state: Mutex::new(EntryState {
                confirmed: prefs,
                local: prefs,
                pending: HashMap::new(),
                previewed: BTreeSet::new(),
                generation: 0,
            }),
            write_lock: tokio::sync::Mutex::new(()),
            debounce: Mutex::new(None),
        }
    }

    fn cancel_debounce(&self) {
        if let Some(handle) = self.debounce.lock().take() {
            handle.abort();
        }
    }
}

#[derive(Debug)]
struct Inner {
    profiles: ProfileRepository,
    defaults: PreferenceSet,
    debounce: Duration,
    entries: Mutex<HashMap<UserId, Arc<Entry>>>,
    loads: Mutex<HashMap<UserId, Arc<tokio::sync::Mutex<()>>>>,
    events: EventBus<SettingsEvent>,
}

// =============================================================================
// Settings Synchronizer
// =============================================================================

/// Loads, previews and persists per-identity preferences.
#[derive(Debug, Clone)]
pub struct SettingsSynchronizer {
    inner: Arc<Inner>,
}

impl SettingsSynchronizer {
    /// Creates a synchronizer on top of the profile repository's store.
    pub fn new(profiles: ProfileRepository) -> Self {
        Self::with_options(profiles, PreferenceSet::default(), DEFAULT_COMMIT_DEBOUNCE)
    }

    /// Creates a synchronizer with explicit defaults and debounce interval.
    pub fn with_options(
        profiles: ProfileRepository,
        defaults: PreferenceSet,
        debounce: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                profiles,
                defaults,
                debounce,
                entries: Mutex::new(HashMap::new()),
                loads: Mutex::new(HashMap::new()),
                events: EventBus::new(64),
            }),
        }
    }

    /// Returns the defaults written for new identities.
    pub fn defaults(&self) -> &PreferenceSet {
        &self.inner.defaults
    }

    /// Subscribes to settings events.
    pub fn subscribe(&self) -> EventSubscriber<SettingsEvent> {
        self.inner.events.subscribe()
    }

    /// Returns the local preferences, if loaded.
    pub fn current(&self, user_id: &UserId) -> Option<PreferenceSet> {
        self.entry(user_id).map(|e| e.state.lock().local)
    }

    /// Returns the last confirmed preferences, if loaded.
    pub fn confirmed(&self, user_id: &UserId) -> Option<PreferenceSet> {
        self.entry(user_id).map(|e| e.state.lock().confirmed)
    }

    /// Returns the fields with a write in flight.
    pub fn pending_fields(&self, user_id: &UserId) -> Vec<PreferenceField> {
        let Some(entry) = self.entry(user_id) else {
            return Vec::new();
        };
        let state = entry.state.lock();
        let mut fields: Vec<_> = state.pending.keys().copied().collect();
        fields.sort();
        fields
    }

    /// Returns the fields changed by `preview` and not yet committed.
    pub fn previewed_fields(&self, user_id: &UserId) -> Vec<PreferenceField> {
        self.entry(user_id)
            .map(|e| e.state.lock().previewed.iter().copied().collect())
            .unwrap_or_default()
    }

    // =========================================================================
    // Load
    // =========================================================================

    /// Loads the preferences of `identity`.
    ///
    /// A cached copy is returned as is. Otherwise the profile is self-healed,
    /// the stored document is read and, if absent, the defaults are written
    /// and returned.
    pub async fn load(&self, identity: &Identity) -> SettingsResult<PreferenceSet> {
        if let Some(prefs) = self.current(&identity.id) {
            return Ok(prefs);
        }

        let load_lock = self.load_lock(&identity.id);
        let _loading = load_lock.lock().await;
        if let Some(prefs) = self.current(&identity.id) {
            return Ok(prefs);
        }

        if let Err(e) = self.inner.profiles.ensure(identity).await {
            warn!(user_id = %identity.id, error = %e, "Profile self-heal failed");
            return Err(e.into());
        }

        let path = self.path(&identity.id);
        let store = self.inner.profiles.store();
        let prefs = match store.get(&path).await? {
            Some(doc) => PreferenceSet::from_document(&doc.data, &self.inner.defaults),
            None => {
                let prefs = self.inner.defaults;
                store
                    .set(&path, prefs.to_document(), SetOptions::replace())
                    .await?;
                info!(user_id = %identity.id, "Default preferences created");
                prefs
            }
        };

        self.inner
            .entries
            .lock()
            .insert(identity.id.clone(), Arc::new(Entry::new(prefs)));
        debug!(user_id = %identity.id, mode = %prefs.mode, scheme = %prefs.color_scheme, "Preferences loaded");
        self.inner.events.publish(SettingsEvent::Loaded {
            user_id: identity.id.clone(),
            prefs,
        });
        Ok(prefs)
    }

    /// Drops the cached preferences of `user_id` and cancels a pending commit.
    pub fn evict(&self, user_id: &UserId) {
        self.take_entry(user_id);
    }

    /// Evicts `user_id` once no load of it is running, then waits for its
    /// in-flight write. No write for `user_id` starts after this returns.
    pub async fn release(&self, user_id: &UserId) {
        let load_lock = self.load_lock(user_id);
        let entry = {
            let _loading = load_lock.lock().await;
            self.take_entry(user_id)
        };
        if let Some(entry) = entry {
            let _drained = entry.write_lock.lock().await;
            debug!(user_id = %user_id, "Preferences released");
        }
    }

    fn take_entry(&self, user_id: &UserId) -> Option<Arc<Entry>> {
        let entry = self.inner.entries.lock().remove(user_id)?;
        entry.cancel_debounce();
        debug!(user_id = %user_id, "Preferences evicted");
        Some(entry)
    }

    // =========================================================================
    // Save
    // =========================================================================

    /// Applies `update` locally and persists the changed fields.
    ///
    /// On failure the fields are rolled back and the error is returned.
    pub async fn save(&self, user_id: &UserId, update: PreferenceUpdate) -> SettingsResult<()> {
        if update.is_empty() {
            return Ok(());
        }
        let entry = self.require(user_id)?;

        let (generation, prefs) = {
            let mut state = entry.state.lock();
            state.generation += 1;
            let generation = state.generation;
            update.apply_to(&mut state.local);
            for field in update.fields() {
                state.pending.insert(field, generation);
                state.previewed.remove(&field);
            }
            (generation, state.local)
        };
        self.inner.events.publish(SettingsEvent::Changed {
            user_id: user_id.clone(),
            prefs,
        });

        self.persist(user_id, &entry, update, generation).await
    }

    /// Starts a save without waiting for it.
    ///
    /// Failures are rolled back and reported on the event bus.
    pub fn save_in_background(&self, user_id: &UserId, update: PreferenceUpdate) -> JoinHandle<()> {
        let sync = self.clone();
        let user_id = user_id.clone();
        tokio::spawn(async move {
            if let Err(e) = sync.save(&user_id, update).await {
                debug!(user_id = %user_id, error = %e, "Background save failed");
            }
        })
    }

    /// Flips between light and dark and persists the result.
    pub async fn toggle_mode(&self, user_id: &UserId) -> SettingsResult<()> {
        let mode = self.require(user_id)?.state.lock().local.mode.toggled();
        self.save(user_id, PreferenceUpdate::new().mode(mode)).await
    }

    // =========================================================================
    // Preview / Commit
    // =========================================================================

    /// Changes the local copy only.
    pub fn preview(&self, user_id: &UserId, update: PreferenceUpdate) -> SettingsResult<PreferenceSet> {
        let entry = self.require(user_id)?;
        let prefs = {
            let mut state = entry.state.lock();
            update.apply_to(&mut state.local);
            state.previewed.extend(update.fields());
            state.local
        };
        self.inner.events.publish(SettingsEvent::Changed {
            user_id: user_id.clone(),
            prefs,
        });
        Ok(prefs)
    }

    /// Persists every previewed field. Does nothing if nothing was previewed.
    pub async fn commit(&self, user_id: &UserId) -> SettingsResult<()> {
        let entry = self.require(user_id)?;
        entry.cancel_debounce();

        let update = {
            let state = entry.state.lock();
            let fields: Vec<_> = state.previewed.iter().copied().collect();
            state.local.select(&fields)
        };
        if update.is_empty() {
            return Ok(());
        }
        self.save(user_id, update).await
    }

    /// Commits after the debounce interval. Each call restarts the interval.
    pub fn schedule_commit(&self, user_id: &UserId) -> SettingsResult<()> {
        let entry = self.require(user_id)?;
        let sync = self.clone();
        let owner = user_id.clone();
        let delay = self.inner.debounce;

        let mut slot = entry.debounce.lock();
        if let Some(previous) = slot.take() {
            previous.abort();
        }
        *slot = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(entry) = sync.entry(&owner) {
                entry.debounce.lock().take();
            }
            if let Err(e) = sync.commit_previewed(&owner).await {
                debug!(user_id = %owner, error = %e, "Debounced commit failed");
            }
        }));
        Ok(())
    }

    /// Restores every previewed field to its last confirmed value.
    pub fn discard_preview(&self, user_id: &UserId) -> SettingsResult<PreferenceSet> {
        let entry = self.require(user_id)?;
        entry.cancel_debounce();
        let prefs = {
            let mut state = entry.state.lock();
            let fields: Vec<_> = std::mem::take(&mut state.previewed).into_iter().collect();
            let confirmed = state.confirmed;
            for field in fields {
                if !state.pending.contains_key(&field) {
                    state.local.copy_field(field, &confirmed);
                }
            }
            state.local
        };
        self.inner.events.publish(SettingsEvent::Changed {
            user_id: user_id.clone(),
            prefs,
        });
        Ok(prefs)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Commit without cancelling the debounce slot, which the debounce task
    /// itself occupies.
    async fn commit_previewed(&self, user_id: &UserId) -> SettingsResult<()> {
        let entry = self.require(user_id)?;
        let update = {
            let state = entry.state.lock();
            let fields: Vec<_> = state.previewed.iter().copied().collect();
            state.local.select(&fields)
        };
        if update.is_empty() {
            return Ok(());
        }
        self.save(user_id, update).await
    }

    async fn persist(
        &self,
        user_id: &UserId,
        entry: &Arc<Entry>,
        update: PreferenceUpdate,
        generation: u64,
    ) -> SettingsResult<()> {
        let _write = entry.write_lock.lock().await;
        if !self.is_cached(user_id, entry) {
            debug!(user_id = %user_id, "Preferences evicted, write dropped");
            return Err(SettingsError::not_loaded(user_id));
        }
        let fields = update.fields();
        let result = self
            .inner
            .profiles
            .store()
            .set(&self.path(user_id), update.to_document(), SetOptions::merge())
            .await;

        match result {
            Ok(()) => {
                {
                    let mut state = entry.state.lock();
                    update.apply_to(&mut state.confirmed);
                    for field in &fields {
                        if state.pending.get(field) == Some(&generation) {
                            state.pending.remove(field);
                        }
                    }
                }
                debug!(user_id = %user_id, fields = ?fields, "Preferences persisted");
                self.inner.events.publish(SettingsEvent::Persisted {
                    user_id: user_id.clone(),
                    fields,
                });
                Ok(())
            }
            Err(e) => {
                let error = SettingsError::from(e);
                let (restored, prefs) = {
                    let mut state = entry.state.lock();
                    let confirmed = state.confirmed;
                    let mut restored = Vec::new();
                    for field in &fields {
                        if state.pending.get(field) == Some(&generation) {
                            state.pending.remove(field);
                            state.local.copy_field(*field, &confirmed);
                            restored.push(*field);
                        }
                    }
                    (restored, state.local)
                };
                warn!(
                    user_id = %user_id,
                    fields = ?restored,
                    error = %error,
                    "Preference write failed, rolled back"
                );
                self.inner.events.publish(SettingsEvent::Changed {
                    user_id: user_id.clone(),
                    prefs,
                });
                self.inner.events.publish(SettingsEvent::RolledBack {
                    user_id: user_id.clone(),
                    fields: restored,
                    error: error.clone(),
                });
                Err(error)
            }
        }
    }

    fn entry(&self, user_id: &UserId) -> Option<Arc<Entry>> {
        self.inner.entries.lock().get(user_id).cloned()
    }

    fn is_cached(&self, user_id: &UserId, entry: &Arc<Entry>) -> bool {
        self.entry(user_id)
            .is_some_and(|cached| Arc::ptr_eq(&cached, entry))
    }

    fn load_lock(&self, user_id: &UserId) -> Arc<tokio::sync::Mutex<()>> {
        self.inner
            .loads
            .lock()
            .entry(user_id.clone())
            .or_default()
            .clone()
    }

    fn require(&self, user_id: &UserId) -> SettingsResult<Arc<Entry>> {
        self.entry(user_id)
            .ok_or_else(|| SettingsError::not_loaded(user_id))
    }

    fn path(&self, user_id: &UserId) -> DocPath {
        self.inner.profiles.layout().preferences_path(user_id)
    }
}

#[async_trait]
impl SessionListener for SettingsSynchronizer {
    async fn session_ending(&self, user_id: &UserId) {
        self.release(user_id).await;
    }
}

// =============================================================================
// Tests
// =============================================================================
